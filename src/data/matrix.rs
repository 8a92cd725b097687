//! Sparse taxon-by-habitat profile matrix.

use crate::data::labels::LabelIndex;
use crate::error::{HabnetError, Result};
use rayon::prelude::*;
use sprs::{CsMat, TriMat};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// A sparse occurrence-profile matrix with labelled axes.
///
/// Rows are filtered taxa, columns are filtered habitats. Cell values are
/// strain counts or support fractions depending on the normalization the
/// builder applied. Stored CSR for row-wise similarity computation.
#[derive(Debug, Clone)]
pub struct ProfileMatrix {
    /// Sparse matrix in CSR format (taxa × habitats).
    data: CsMat<f64>,
    /// Row axis (taxon identifiers).
    rows: LabelIndex,
    /// Column axis (habitat identifiers).
    cols: LabelIndex,
}

impl ProfileMatrix {
    /// Create a matrix from sparse data and its axis indices.
    pub fn new(data: CsMat<f64>, rows: LabelIndex, cols: LabelIndex) -> Result<Self> {
        let (nrows, ncols) = data.shape();
        if nrows != rows.len() {
            return Err(HabnetError::DimensionMismatch {
                expected: nrows,
                actual: rows.len(),
            });
        }
        if ncols != cols.len() {
            return Err(HabnetError::DimensionMismatch {
                expected: ncols,
                actual: cols.len(),
            });
        }
        Ok(Self { data, rows, cols })
    }

    /// Value at (row, col), 0.0 for absent entries.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data.get(row, col).copied().unwrap_or(0.0)
    }

    /// Number of taxa (rows).
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.data.rows()
    }

    /// Number of habitats (columns).
    #[inline]
    pub fn n_cols(&self) -> usize {
        self.data.cols()
    }

    /// Number of stored entries.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.data.nnz()
    }

    /// Taxon labels in row order.
    #[inline]
    pub fn row_labels(&self) -> &[String] {
        self.rows.labels()
    }

    /// Habitat labels in column order.
    #[inline]
    pub fn col_labels(&self) -> &[String] {
        self.cols.labels()
    }

    /// Row axis index.
    #[inline]
    pub fn row_index(&self) -> &LabelIndex {
        &self.rows
    }

    /// Column axis index.
    #[inline]
    pub fn col_index(&self) -> &LabelIndex {
        &self.cols
    }

    /// Underlying sparse matrix.
    #[inline]
    pub fn data(&self) -> &CsMat<f64> {
        &self.data
    }

    /// Row sums (total profile mass per taxon).
    pub fn row_sums(&self) -> Vec<f64> {
        (0..self.n_rows())
            .into_par_iter()
            .map(|row| {
                self.data
                    .outer_view(row)
                    .map(|v| v.iter().map(|(_, &val)| val).sum())
                    .unwrap_or(0.0)
            })
            .collect()
    }

    /// Write the matrix as coordinate triples.
    ///
    /// Format: a `row\tcol\tvalue` header followed by one stored entry per
    /// line in row-major order, values in scientific notation.
    pub fn to_coo_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        writeln!(writer, "row\tcol\tvalue")?;
        for (row, row_vec) in self.data.outer_iterator().enumerate() {
            for (col, &val) in row_vec.iter() {
                writeln!(writer, "{}\t{}\t{:.12e}", row, col, val)?;
            }
        }
        writer.flush()?;
        Ok(())
    }

    /// Load a matrix from coordinate triples written by [`to_coo_tsv`].
    ///
    /// The axis indices supply the shape; out-of-bounds coordinates are a
    /// hard error since the triples are our own artifact, not raw input.
    ///
    /// [`to_coo_tsv`]: ProfileMatrix::to_coo_tsv
    pub fn from_coo_tsv<P: AsRef<Path>>(
        path: P,
        rows: LabelIndex,
        cols: LabelIndex,
    ) -> Result<Self> {
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

        let mut tri = TriMat::new((rows.len(), cols.len()));
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
            if row >= rows.len() || col >= cols.len() {
                return Err(HabnetError::MalformedRecord {
                    line: line_no,
                    reason: format!("coordinate ({}, {}) out of bounds", row, col),
                });
            }
            tri.add_triplet(row, col, val);
        }

        Self::new(tri.to_csr(), rows, cols)
    }
}
