//! Per-row top-k sparsification of a similarity matrix.

use crate::error::{HabnetError, Result};
use crate::similarity::SimilarityMatrix;
use log::info;
use rayon::prelude::*;

/// Keep the k strongest entries of every similarity row.
///
/// Selection is a partial select, not a full sort, with a deterministic
/// tie-break: larger value first, then smaller column index. Because the
/// result feeds an undirected graph, retention is symmetrized by union:
/// an entry (i, j) survives when row i kept j or row j kept i. Rows with
/// at most k entries pass through unchanged.
pub fn top_k_similarity(sim: &SimilarityMatrix, k: usize) -> Result<SimilarityMatrix> {
    if k == 0 {
        return Err(HabnetError::InvalidParameter(
            "top_k must be at least 1".to_string(),
        ));
    }

    let n = sim.n_nodes();

    // Column indices each row keeps, sorted for binary search.
    let retained: Vec<Vec<usize>> = (0..n)
        .into_par_iter()
        .map(|i| {
            let row = sim.row(i);
            let mut cols: Vec<usize> = if row.len() <= k {
                row.iter().map(|&(j, _)| j).collect()
            } else {
                let mut entries = row.to_vec();
                entries.select_nth_unstable_by(k - 1, |a, b| {
                    b.1.partial_cmp(&a.1).unwrap().then(a.0.cmp(&b.0))
                });
                entries.truncate(k);
                entries.into_iter().map(|(j, _)| j).collect()
            };
            cols.sort_unstable();
            cols
        })
        .collect();

    let rows: Vec<Vec<(usize, f64)>> = (0..n)
        .into_par_iter()
        .map(|i| {
            sim.row(i)
                .iter()
                .copied()
                .filter(|&(j, _)| {
                    retained[i].binary_search(&j).is_ok()
                        || retained[j].binary_search(&i).is_ok()
                })
                .collect()
        })
        .collect();

    let sparsified = SimilarityMatrix::from_rows(rows);
    info!(
        "top-k sparsify (k={}): {} -> {} stored entries",
        k,
        sim.nnz(),
        sparsified.nnz()
    );
    Ok(sparsified)
}
