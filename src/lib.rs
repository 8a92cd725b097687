//! Habitat Network Construction Library
//!
//! This library builds a taxon-taxon similarity network from strain
//! habitat annotations: tab-delimited records relating strains to
//! taxonomic lineages and habitat codes become a sparse taxon-habitat
//! profile, pairwise similarities, and finally an undirected weighted
//! graph with community and centrality analytics.
//!
//! # Overview
//!
//! The library is organized into composable modules:
//!
//! - **data**: Record parsing and core structures (StrainTable, ProfileMatrix)
//! - **profile**: Support counting, filtering, and profile assembly
//! - **similarity**: Pairwise similarity kernels over the profile
//! - **sparsify**: Top-k and mutual edge thinning
//! - **graph**: The similarity graph and its analytics (Louvain, betweenness, clustering)
//! - **pipeline**: Fixed-sequence pipeline execution and artifact output
//!
//! # Example
//!
//! ```no_run
//! use habnet::prelude::*;
//!
//! let pipeline = Pipeline::new();
//! let output = pipeline.run_file("strain_relations.tsv").unwrap();
//! output.write_artifacts("staging").unwrap();
//! ```

pub mod data;
pub mod error;
pub mod graph;
pub mod pipeline;
pub mod profile;
pub mod similarity;
pub mod sparsify;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::data::{
        LabelConfig, LabelIndex, ParseSummary, ProfileMatrix, RecordSchema, Strain, StrainRecord,
        StrainTable,
    };
    pub use crate::error::{HabnetError, Result};
    pub use crate::graph::{
        betweenness_approx, clustering_coefficients, louvain_communities, weighted_degrees,
        CommunityStructure, GraphArtifact, NodeMetricsTable, SimilarityGraph,
    };
    pub use crate::pipeline::{Pipeline, PipelineConfig, PipelineOutput};
    pub use crate::profile::{
        build_profile, count_support, filter_by_support, summarize_profile, Axis, Normalization,
        ProfileSummary, SupportFilterResult,
    };
    pub use crate::similarity::{
        compute_similarity, count_dissimilarity, fraction_similarity, DissimilarityMatrix,
        SimilarityMatrix, SimilarityMode,
    };
    pub use crate::sparsify::{mutual_sparsify, top_k_similarity, MutualSparsifyConfig};
}
