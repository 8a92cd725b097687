//! Support counting and min-support filtering for profile axes.

use crate::data::StrainTable;
use crate::error::{HabnetError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Which profile axis a support tally refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    /// Taxon identifiers drawn from strain lineages (matrix rows).
    Taxon,
    /// Habitat identifiers (matrix columns).
    Habitat,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Taxon => write!(f, "taxon"),
            Axis::Habitat => write!(f, "habitat"),
        }
    }
}

/// Count how many distinct strains support each identifier on an axis.
///
/// A strain supports a taxon when the taxon appears anywhere in its lineage,
/// and a habitat when the habitat is in its habitat set. Each strain counts
/// at most once per identifier.
pub fn count_support(strains: &StrainTable, axis: Axis) -> HashMap<String, usize> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for strain in strains.iter() {
        match axis {
            Axis::Taxon => {
                // a lineage may repeat a token; count the strain once
                let distinct: BTreeSet<&String> = strain.lineage.iter().collect();
                for token in distinct {
                    *counts.entry(token.clone()).or_insert(0) += 1;
                }
            }
            Axis::Habitat => {
                for token in &strain.habitats {
                    *counts.entry(token.clone()).or_insert(0) += 1;
                }
            }
        }
    }
    counts
}

/// Filter axis identifiers by minimum support and an exclusion list.
///
/// Keeps identifiers supported by at least `min_support` strains that are
/// not in `excluded` (used to drop the taxonomy root and near-universal
/// habitat buckets that would connect everything to everything).
///
/// # Returns
/// The kept identifiers, in no particular order. Fails when nothing passes,
/// since an empty axis cannot produce a profile matrix.
pub fn filter_by_support(
    counts: &HashMap<String, usize>,
    axis: Axis,
    min_support: usize,
    excluded: &BTreeSet<String>,
) -> Result<Vec<String>> {
    let kept: Vec<String> = counts
        .iter()
        .filter(|(id, &count)| count >= min_support && !excluded.contains(*id))
        .map(|(id, _)| id.clone())
        .collect();

    if kept.is_empty() {
        return Err(HabnetError::EmptyProfile {
            axis: axis.to_string(),
            min_support,
        });
    }
    Ok(kept)
}

/// Statistics from a support filter pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportFilterResult {
    /// Axis the filter ran on.
    pub axis: Axis,
    /// Identifiers before filtering.
    pub n_before: usize,
    /// Identifiers after filtering.
    pub n_after: usize,
    /// Identifiers dropped for low support.
    pub n_below_min: usize,
    /// Identifiers dropped by the exclusion list.
    pub n_excluded: usize,
    /// Proportion of identifiers retained.
    pub retention_rate: f64,
}

impl fmt::Display for SupportFilterResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Support Filter ({} axis)", self.axis)?;
        writeln!(f, "  Before:      {} identifiers", self.n_before)?;
        writeln!(f, "  After:       {} identifiers", self.n_after)?;
        writeln!(f, "  Low support: {} removed", self.n_below_min)?;
        writeln!(f, "  Excluded:    {} removed", self.n_excluded)?;
        writeln!(f, "  Retained:    {:.1}%", self.retention_rate * 100.0)?;
        Ok(())
    }
}

/// Filter with statistics about what was removed.
pub fn filter_by_support_with_stats(
    counts: &HashMap<String, usize>,
    axis: Axis,
    min_support: usize,
    excluded: &BTreeSet<String>,
) -> Result<(Vec<String>, SupportFilterResult)> {
    let n_before = counts.len();
    let n_excluded = counts.keys().filter(|id| excluded.contains(*id)).count();
    let kept = filter_by_support(counts, axis, min_support, excluded)?;
    let n_after = kept.len();

    let result = SupportFilterResult {
        axis,
        n_before,
        n_after,
        n_below_min: n_before - n_after - n_excluded,
        n_excluded,
        retention_rate: n_after as f64 / n_before as f64,
    };
    Ok((kept, result))
}
