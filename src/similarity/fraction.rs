//! Dot-product similarity over the fraction-normalized profile.

use crate::data::ProfileMatrix;
use crate::similarity::SimilarityMatrix;

/// Compute `S = F * F^T` over a fraction-normalized profile.
///
/// Two taxa are similar to the extent their habitat fractions overlap; the
/// diagonal is the squared norm of each row (self-similarity). The sparse
/// product only touches overlapping structure, so absent pairs are simply
/// never stored.
pub fn fraction_similarity(profile: &ProfileMatrix) -> SimilarityMatrix {
    let f = profile.data();
    let ft = f.transpose_view().to_csr();
    let product = f * &ft;

    let n = profile.n_rows();
    let mut rows: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
    for (i, row_vec) in product.outer_iterator().enumerate() {
        rows[i] = row_vec.iter().map(|(j, &v)| (j, v)).collect();
    }
    SimilarityMatrix::from_rows(rows)
}
