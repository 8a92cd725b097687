//! Pairwise count dissimilarity between taxon profiles.

use crate::data::ProfileMatrix;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Values with magnitude below this are float noise and snap to zero.
const NOISE_EPS: f64 = 1e-12;

/// Symmetric pairwise dissimilarities in sparse row storage.
///
/// `D(i, j) = rowsum(i) + rowsum(j) - 2 * sum_k min(c_ik, c_jk)`, the L1
/// distance between count rows. Absent entries are exact zeros: the diagonal
/// and pairs with identical profiles. Rows are sorted by column.
#[derive(Debug, Clone, PartialEq)]
pub struct DissimilarityMatrix {
    rows: Vec<Vec<(usize, f64)>>,
}

impl DissimilarityMatrix {
    /// Number of taxa (matrix side length).
    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.rows.len()
    }

    /// Number of stored (nonzero) entries.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    /// Stored entries of one row.
    #[inline]
    pub fn row(&self, i: usize) -> &[(usize, f64)] {
        &self.rows[i]
    }

    /// Value at (i, j), 0.0 for absent entries.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        match self.rows[i].binary_search_by_key(&j, |&(col, _)| col) {
            Ok(pos) => self.rows[i][pos].1,
            Err(_) => 0.0,
        }
    }

    /// Distribution statistics over all `n * n` pairs.
    ///
    /// Absent entries count as zeros, matching statistics taken over a dense
    /// rendering of the matrix. The median in particular feeds the decay
    /// calibration and must include the zero mass.
    pub fn stats(&self) -> PairwiseStats {
        let n = self.n_nodes();
        let total = n * n;
        let mut values: Vec<f64> = self
            .rows
            .iter()
            .flat_map(|row| row.iter().map(|&(_, v)| v))
            .collect();
        let nnz = values.len();
        let zeros = total - nnz;

        let max = values.iter().cloned().fold(0.0f64, f64::max);
        let min = if zeros > 0 {
            0.0
        } else {
            values.iter().cloned().fold(f64::INFINITY, f64::min)
        };
        let mean = if total > 0 {
            values.iter().sum::<f64>() / total as f64
        } else {
            0.0
        };

        let median = if total == 0 {
            0.0
        } else if total % 2 == 1 {
            order_stat(&mut values, zeros, total / 2)
        } else {
            let lo = order_stat(&mut values, zeros, total / 2 - 1);
            let hi = order_stat(&mut values, zeros, total / 2);
            (lo + hi) / 2.0
        };

        PairwiseStats {
            min,
            max,
            mean,
            median,
            nnz,
            total,
        }
    }
}

/// The k-th order statistic of the multiset {0.0 × zeros} ∪ values.
///
/// Dissimilarities are non-negative, so the zero mass occupies the lowest
/// ranks and stored values only need a partial selection.
fn order_stat(values: &mut [f64], zeros: usize, k: usize) -> f64 {
    if k < zeros {
        return 0.0;
    }
    let idx = k - zeros;
    let (_, kth, _) =
        values.select_nth_unstable_by(idx, |a, b| a.partial_cmp(b).unwrap());
    *kth
}

/// Distribution summary of a pairwise matrix, zeros included.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairwiseStats {
    /// Smallest value (0.0 whenever any pair is absent).
    pub min: f64,
    /// Largest value.
    pub max: f64,
    /// Mean over all pairs.
    pub mean: f64,
    /// Median over all pairs.
    pub median: f64,
    /// Stored entries.
    pub nnz: usize,
    /// Total pairs (`n * n`).
    pub total: usize,
}

/// Compute pairwise dissimilarities between all profile rows.
///
/// Works row by row: a dense scratch row starts at `rowsum(i) + rowsum(j)`
/// for every j, then for each stored entry of row i the matching column of
/// the CSC view pays back `2 * min(c_ik, c_jk)` to every row sharing that
/// column. Only nonzero results are stored, the diagonal is forced to zero,
/// and magnitudes below 1e-12 are snapped to zero. Rows are independent and
/// computed in parallel; no dense matrix is ever materialized.
pub fn count_dissimilarity(profile: &ProfileMatrix) -> DissimilarityMatrix {
    let n = profile.n_rows();
    let csr = profile.data();
    let csc = csr.to_csc();
    let row_sums = profile.row_sums();

    let rows: Vec<Vec<(usize, f64)>> = (0..n)
        .into_par_iter()
        .map(|i| {
            let base = row_sums[i];
            let mut buf: Vec<f64> = row_sums.iter().map(|&rs| base + rs).collect();

            if let Some(row_vec) = csr.outer_view(i) {
                for (k, &vik) in row_vec.iter() {
                    if let Some(col_vec) = csc.outer_view(k) {
                        for (j, &vjk) in col_vec.iter() {
                            buf[j] -= 2.0 * vik.min(vjk);
                        }
                    }
                }
            }

            buf[i] = 0.0;
            buf.iter()
                .enumerate()
                .filter_map(|(j, &v)| {
                    if v.abs() < NOISE_EPS {
                        None
                    } else {
                        Some((j, v))
                    }
                })
                .collect()
        })
        .collect();

    DissimilarityMatrix { rows }
}
