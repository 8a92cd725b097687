//! Exponential decay transform mapping dissimilarity to similarity.

use crate::error::{HabnetError, Result};
use crate::similarity::{DissimilarityMatrix, PairwiseStats, SimilarityMatrix};
use rayon::prelude::*;

/// Decay rate calibrated so the median dissimilarity maps to similarity 0.5.
///
/// `lambda = ln 2 / median`. Fails when the median is zero, which happens
/// only for degenerate inputs where at least half of all pairs have
/// identical profiles; the decay is undefined there.
pub fn decay_rate(stats: &PairwiseStats) -> Result<f64> {
    if stats.median <= 0.0 {
        return Err(HabnetError::Numerical(
            "median dissimilarity is zero, decay rate undefined".to_string(),
        ));
    }
    Ok(std::f64::consts::LN_2 / stats.median)
}

/// Map dissimilarities to similarities via `S = exp(-lambda * D)`.
///
/// Every pair is transformed, including absent entries, which have zero
/// distance and map to similarity 1.0: identical profiles are maximally
/// similar and the diagonal becomes the self-similarity 1.0. Entries below
/// `min_similarity` are dropped, which is what makes the result sparse.
pub fn exp_transform(
    dissimilarity: &DissimilarityMatrix,
    lambda: f64,
    min_similarity: f64,
) -> SimilarityMatrix {
    let n = dissimilarity.n_nodes();
    let rows: Vec<Vec<(usize, f64)>> = (0..n)
        .into_par_iter()
        .map(|i| {
            let stored = dissimilarity.row(i);
            let mut p = 0;
            let mut out = Vec::new();
            for j in 0..n {
                let s = if p < stored.len() && stored[p].0 == j {
                    let v = (-lambda * stored[p].1).exp();
                    p += 1;
                    v
                } else {
                    // absent pair: zero distance
                    1.0
                };
                if s >= min_similarity {
                    out.push((j, s));
                }
            }
            out
        })
        .collect();

    SimilarityMatrix::from_rows(rows)
}
