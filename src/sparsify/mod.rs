//! Edge-thinning passes that keep only the strongest similarities.

mod mutual;
mod topk;

pub use mutual::{
    mutual_sparsify, mutual_sparsify_with_stats, MutualSparsifyConfig, MutualSparsifyResult,
};
pub use topk::top_k_similarity;
