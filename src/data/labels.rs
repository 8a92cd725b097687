//! Label-to-index bijections for matrix axes and their JSON artifact.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// A bijection between axis labels and dense matrix indices.
///
/// Labels are sorted before index assignment so the mapping is reproducible
/// across runs regardless of the order identifiers were collected in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelIndex {
    labels: Vec<String>,
    positions: HashMap<String, usize>,
}

impl LabelIndex {
    /// Build an index from a set of labels, sorting them first.
    pub fn from_labels<I>(labels: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut labels: Vec<String> = labels.into_iter().collect();
        labels.sort_unstable();
        labels.dedup();
        let positions = labels
            .iter()
            .enumerate()
            .map(|(i, l)| (l.clone(), i))
            .collect();
        Self { labels, positions }
    }

    /// Index of a label, if present.
    #[inline]
    pub fn get(&self, label: &str) -> Option<usize> {
        self.positions.get(label).copied()
    }

    /// Label at an index.
    #[inline]
    pub fn label(&self, index: usize) -> &str {
        &self.labels[index]
    }

    /// All labels in index order.
    #[inline]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Number of labels.
    #[inline]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the index is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Serializable axis configuration of a profile matrix.
///
/// Written as JSON with four keys: `row_labels`, `column_labels`,
/// `row_index`, `col_index`. Downstream consumers use it to map matrix
/// coordinates back to taxon and habitat identifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelConfig {
    /// Taxon labels in row order.
    pub row_labels: Vec<String>,
    /// Habitat labels in column order.
    pub column_labels: Vec<String>,
    /// Taxon label to row index.
    pub row_index: BTreeMap<String, usize>,
    /// Habitat label to column index.
    pub col_index: BTreeMap<String, usize>,
}

impl LabelConfig {
    /// Build the artifact from the two axis indices.
    pub fn new(rows: &LabelIndex, cols: &LabelIndex) -> Self {
        Self {
            row_labels: rows.labels().to_vec(),
            column_labels: cols.labels().to_vec(),
            row_index: rows
                .labels()
                .iter()
                .enumerate()
                .map(|(i, l)| (l.clone(), i))
                .collect(),
            col_index: cols
                .labels()
                .iter()
                .enumerate()
                .map(|(i, l)| (l.clone(), i))
                .collect(),
        }
    }

    /// Write the configuration to a JSON file.
    pub fn to_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Load a configuration from a JSON file.
    pub fn from_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_sorted_assignment() {
        let index = LabelIndex::from_labels(
            ["zeta", "alpha", "mid"].iter().map(|s| s.to_string()),
        );
        assert_eq!(index.labels(), &["alpha", "mid", "zeta"]);
        assert_eq!(index.get("alpha"), Some(0));
        assert_eq!(index.get("zeta"), Some(2));
        assert_eq!(index.get("missing"), None);
    }

    #[test]
    fn test_duplicates_collapse() {
        let index =
            LabelIndex::from_labels(["a", "b", "a"].iter().map(|s| s.to_string()));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_bijection() {
        let index = LabelIndex::from_labels(
            ["10", "2", "30"].iter().map(|s| s.to_string()),
        );
        for i in 0..index.len() {
            assert_eq!(index.get(index.label(i)), Some(i));
        }
    }

    #[test]
    fn test_label_config_roundtrip() {
        let rows =
            LabelIndex::from_labels(["t2", "t1"].iter().map(|s| s.to_string()));
        let cols = LabelIndex::from_labels(
            ["h1", "h3", "h2"].iter().map(|s| s.to_string()),
        );
        let config = LabelConfig::new(&rows, &cols);

        let temp = NamedTempFile::new().unwrap();
        config.to_json(temp.path()).unwrap();
        let loaded = LabelConfig::from_json(temp.path()).unwrap();

        assert_eq!(loaded.row_labels, vec!["t1", "t2"]);
        assert_eq!(loaded.column_labels, vec!["h1", "h2", "h3"]);
        assert_eq!(loaded.row_index["t2"], 1);
        assert_eq!(loaded.col_index["h3"], 2);
    }
}
