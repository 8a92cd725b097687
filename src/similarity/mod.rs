//! Taxon-taxon similarity kernels over the profile matrix.
//!
//! Two modes are supported. [`SimilarityMode::Fraction`] multiplies the
//! fraction-normalized profile with its transpose, giving a dot-product
//! kernel. [`SimilarityMode::ExpDissimilarity`] computes pairwise count
//! dissimilarities and maps them through a calibrated exponential decay,
//! which is the mode the production network is built from.

mod dissimilarity;
mod fraction;
mod transform;

pub use dissimilarity::{count_dissimilarity, DissimilarityMatrix, PairwiseStats};
pub use fraction::fraction_similarity;
pub use transform::{decay_rate, exp_transform};

use crate::data::ProfileMatrix;
use crate::error::{HabnetError, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Which similarity kernel to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SimilarityMode {
    /// Dot product of the fraction-normalized profile with its transpose.
    Fraction,
    /// Count dissimilarity mapped through `exp(-lambda * D)`.
    #[default]
    ExpDissimilarity,
}

/// Symmetric pairwise similarity values in sparse row storage.
///
/// Rows are kept sorted by column. Symmetry holds by construction in both
/// kernels; the diagonal carries self-similarity and is dropped when the
/// graph is built.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    rows: Vec<Vec<(usize, f64)>>,
}

impl SimilarityMatrix {
    /// Wrap per-row `(column, value)` entries, each row sorted by column.
    pub fn from_rows(rows: Vec<Vec<(usize, f64)>>) -> Self {
        debug_assert!(rows
            .iter()
            .all(|r| r.windows(2).all(|w| w[0].0 < w[1].0)));
        Self { rows }
    }

    /// Number of taxa (matrix side length).
    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.rows.len()
    }

    /// Number of stored entries.
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

    /// Iterate over all stored entries in row-major order.
    pub fn iter_entries(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.rows
            .iter()
            .enumerate()
            .flat_map(|(i, row)| row.iter().map(move |&(j, v)| (i, j, v)))
    }

    /// Write the matrix as coordinate triples (`row\tcol\tvalue` header).
    pub fn to_coo_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "row\tcol\tvalue")?;
        for (i, j, v) in self.iter_entries() {
            writeln!(writer, "{}\t{}\t{:.12e}", i, j, v)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Load a matrix from coordinate triples written by [`to_coo_tsv`].
    ///
    /// `n_nodes` supplies the side length; out-of-bounds coordinates are a
    /// hard error since the triples are our own artifact, not raw input.
    ///
    /// [`to_coo_tsv`]: SimilarityMatrix::to_coo_tsv
    pub fn from_coo_tsv<P: AsRef<Path>>(path: P, n_nodes: usize) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        let header = lines
            .next()
            .ok_or_else(|| HabnetError::EmptyData("empty matrix file".to_string()))??;
        if header.trim() != "row\tcol\tvalue" {
            return Err(HabnetError::MalformedRecord {
                line: 1,
                reason: format!("unexpected header '{}'", header.trim()),
            });
        }

        let mut rows: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n_nodes];
        for (i, line_result) in lines.enumerate() {
            let line = line_result?;
            if line.trim().is_empty() {
                continue;
            }
            let line_no = i + 2;
            let mut fields = line.split('\t');
            let (row, col, val) = match (fields.next(), fields.next(), fields.next()) {
                (Some(r), Some(c), Some(v)) => {
                    let parse = || -> Option<(usize, usize, f64)> {
                        Some((
                            r.trim().parse().ok()?,
                            c.trim().parse().ok()?,
                            v.trim().parse().ok()?,
                        ))
                    };
                    parse().ok_or_else(|| HabnetError::MalformedRecord {
                        line: line_no,
                        reason: format!("unparseable triple '{}'", line),
                    })?
                }
                _ => {
                    return Err(HabnetError::MalformedRecord {
                        line: line_no,
                        reason: "expected three tab-separated fields".to_string(),
                    })
                }
            };
            if row >= n_nodes || col >= n_nodes {
                return Err(HabnetError::MalformedRecord {
                    line: line_no,
                    reason: format!("coordinate ({}, {}) out of bounds", row, col),
                });
            }
            rows[row].push((col, val));
        }
        for row in &mut rows {
            row.sort_unstable_by_key(|&(col, _)| col);
        }
        Ok(Self::from_rows(rows))
    }
}

/// Compute the similarity matrix for a profile in the requested mode.
///
/// `min_similarity` applies only to the exponential-decay mode, where
/// entries below it are dropped; the fraction kernel keeps everything its
/// sparse product yields.
pub fn compute_similarity(
    profile: &ProfileMatrix,
    mode: SimilarityMode,
    min_similarity: f64,
) -> Result<SimilarityMatrix> {
    match mode {
        SimilarityMode::Fraction => {
            let sim = fraction_similarity(profile);
            info!(
                "fraction similarity: {} taxa, {} stored entries",
                sim.n_nodes(),
                sim.nnz()
            );
            Ok(sim)
        }
        SimilarityMode::ExpDissimilarity => {
            let dis = count_dissimilarity(profile);
            let stats = dis.stats();
            debug!(
                "dissimilarity: min {:.3} max {:.3} mean {:.3} median {:.3}",
                stats.min, stats.max, stats.mean, stats.median
            );
            let lambda = decay_rate(&stats)?;
            let sim = exp_transform(&dis, lambda, min_similarity);
            info!(
                "exp similarity: lambda {:.6}, threshold {}, {} stored entries",
                lambda,
                min_similarity,
                sim.nnz()
            );
            Ok(sim)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_get_and_nnz() {
        let sim = SimilarityMatrix::from_rows(vec![
            vec![(0, 1.0), (1, 0.5)],
            vec![(0, 0.5), (1, 1.0)],
        ]);
        assert_eq!(sim.n_nodes(), 2);
        assert_eq!(sim.nnz(), 4);
        assert_relative_eq!(sim.get(0, 1), 0.5);
        assert_relative_eq!(sim.get(1, 1), 1.0);
    }

    #[test]
    fn test_get_absent_is_zero() {
        let sim = SimilarityMatrix::from_rows(vec![vec![(1, 0.3)], vec![(0, 0.3)]]);
        assert_relative_eq!(sim.get(0, 0), 0.0);
    }

    #[test]
    fn test_iter_entries_row_major() {
        let sim = SimilarityMatrix::from_rows(vec![vec![(1, 0.3)], vec![(0, 0.3)]]);
        let entries: Vec<_> = sim.iter_entries().collect();
        assert_eq!(entries, vec![(0, 1, 0.3), (1, 0, 0.3)]);
    }

    #[test]
    fn test_coo_tsv_roundtrip() {
        // Dyadic values survive the scientific-notation format exactly.
        let sim = SimilarityMatrix::from_rows(vec![
            vec![(0, 1.0), (1, 0.5)],
            vec![(0, 0.5), (1, 1.0), (2, 0.25)],
            vec![(1, 0.25), (2, 1.0)],
        ]);

        let file = tempfile::NamedTempFile::new().unwrap();
        sim.to_coo_tsv(file.path()).unwrap();
        let loaded = SimilarityMatrix::from_coo_tsv(file.path(), 3).unwrap();
        assert_eq!(loaded, sim);
    }

    #[test]
    fn test_coo_tsv_bad_header_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "not\ta\theader\n0\t1\t0.5\n").unwrap();
        assert!(SimilarityMatrix::from_coo_tsv(file.path(), 2).is_err());
    }
}
