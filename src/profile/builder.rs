//! Construction of the taxon-by-habitat profile matrix.

use crate::data::{LabelIndex, ProfileMatrix, StrainTable};
use crate::error::Result;
use log::debug;
use serde::{Deserialize, Serialize};
use sprs::TriMat;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// How cell values of the profile matrix are realized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Normalization {
    /// Cell = number of strains in the cell's bucket.
    Count,
    /// Cell = bucket size over the number of distinct strains in the row.
    Fraction,
}

/// Build the profile matrix from filtered axis identifiers.
///
/// For every strain, the lineage is intersected with the row identifiers and
/// the habitat set with the column identifiers; the strain is then added to
/// the bucket of each (taxon, habitat) cell it hits. Buckets have set
/// semantics, so a strain counts once per cell no matter how often a token
/// repeats. Axis identifiers are sorted before index assignment, making the
/// matrix layout reproducible.
///
/// A taxon whose supporting strains all lack filtered habitats keeps its row
/// with no stored entries; the original export contains such taxa and they
/// must not shift the indices of the rest.
pub fn build_profile(
    strains: &StrainTable,
    row_ids: Vec<String>,
    col_ids: Vec<String>,
    normalization: Normalization,
) -> Result<ProfileMatrix> {
    let rows = LabelIndex::from_labels(row_ids);
    let cols = LabelIndex::from_labels(col_ids);

    // explicit get-or-insert per cell, no blanket allocation
    let mut buckets: HashMap<(usize, usize), BTreeSet<&str>> = HashMap::new();
    // distinct strains per row across all of its cells (fraction denominator)
    let mut row_strains: HashMap<usize, BTreeSet<&str>> = HashMap::new();

    for strain in strains.iter() {
        let row_hits: BTreeSet<usize> = strain
            .lineage
            .iter()
            .filter_map(|t| rows.get(t))
            .collect();
        let col_hits: Vec<usize> = strain
            .habitats
            .iter()
            .filter_map(|h| cols.get(h))
            .collect();
        if row_hits.is_empty() || col_hits.is_empty() {
            continue;
        }
        for &r in &row_hits {
            row_strains.entry(r).or_default().insert(&strain.id);
            for &c in &col_hits {
                buckets.entry((r, c)).or_default().insert(&strain.id);
            }
        }
    }

    debug!(
        "profile: {} taxa x {} habitats, {} populated cells",
        rows.len(),
        cols.len(),
        buckets.len()
    );

    let mut tri = TriMat::new((rows.len(), cols.len()));
    for (&(r, c), bucket) in &buckets {
        let value = match normalization {
            Normalization::Count => bucket.len() as f64,
            Normalization::Fraction => {
                let denom = row_strains.get(&r).map(|s| s.len()).unwrap_or(0);
                // a populated cell implies the row union is populated
                debug_assert!(denom > 0);
                bucket.len() as f64 / denom as f64
            }
        };
        tri.add_triplet(r, c, value);
    }

    ProfileMatrix::new(tri.to_csr(), rows, cols)
}

/// Shape and occupancy summary of a profile matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSummary {
    /// Number of taxa (rows).
    pub n_taxa: usize,
    /// Number of habitats (columns).
    pub n_habitats: usize,
    /// Number of populated cells.
    pub nnz: usize,
    /// Fraction of cells populated.
    pub density: f64,
    /// Largest cell value.
    pub max_cell: f64,
    /// Mean of populated cell values.
    pub mean_cell: f64,
}

impl fmt::Display for ProfileSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Profile Summary")?;
        writeln!(f, "  Taxa:      {}", self.n_taxa)?;
        writeln!(f, "  Habitats:  {}", self.n_habitats)?;
        writeln!(f, "  Cells:     {} ({:.2}% dense)", self.nnz, self.density * 100.0)?;
        writeln!(f, "  Max cell:  {:.3}", self.max_cell)?;
        writeln!(f, "  Mean cell: {:.3}", self.mean_cell)?;
        Ok(())
    }
}

/// Summarize shape and occupancy of a profile matrix.
pub fn summarize_profile(matrix: &ProfileMatrix) -> ProfileSummary {
    let n_taxa = matrix.n_rows();
    let n_habitats = matrix.n_cols();
    let nnz = matrix.nnz();
    let total = n_taxa * n_habitats;

    let mut max_cell = 0.0f64;
    let mut sum = 0.0f64;
    for row in matrix.data().outer_iterator() {
        for (_, &val) in row.iter() {
            max_cell = max_cell.max(val);
            sum += val;
        }
    }

    ProfileSummary {
        n_taxa,
        n_habitats,
        nnz,
        density: if total > 0 { nnz as f64 / total as f64 } else { 0.0 },
        max_cell,
        mean_cell: if nnz > 0 { sum / nnz as f64 } else { 0.0 },
    }
}
