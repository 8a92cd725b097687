//! Strain table accumulated from parsed export records.

use crate::data::record::{parse_line, RecordSchema, StrainRecord};
use crate::error::Result;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// One strain with its taxonomic lineage and the union of its habitats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Strain {
    /// Strain identifier.
    pub id: String,
    /// Taxon identifiers from root to leaf.
    pub lineage: Vec<String>,
    /// Habitat identifiers across all records of this strain.
    pub habitats: BTreeSet<String>,
}

/// Summary statistics from parsing an export file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseSummary {
    /// Lines read from the input.
    pub lines_read: usize,
    /// Lines that produced a record.
    pub records_parsed: usize,
    /// Lines skipped as malformed.
    pub lines_skipped: usize,
    /// Records merged into an already-seen strain.
    pub records_merged: usize,
    /// Distinct strains in the table.
    pub n_strains: usize,
}

impl fmt::Display for ParseSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Parsed {} records from {} lines into {} strains ({} merged, {} skipped)",
            self.records_parsed,
            self.lines_read,
            self.n_strains,
            self.records_merged,
            self.lines_skipped
        )
    }
}

/// Collection of strains keyed by identifier.
///
/// Records with an already-seen identifier merge their habitats into the
/// existing strain; the lineage of the first record wins. Insertion order is
/// preserved for iteration.
#[derive(Debug, Clone, Default)]
pub struct StrainTable {
    strains: Vec<Strain>,
    index: HashMap<String, usize>,
}

impl StrainTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, merging habitats when the strain is already present.
    pub fn insert(&mut self, record: StrainRecord) {
        match self.index.get(&record.id) {
            Some(&i) => {
                self.strains[i].habitats.extend(record.habitats);
            }
            None => {
                self.index.insert(record.id.clone(), self.strains.len());
                self.strains.push(Strain {
                    id: record.id,
                    lineage: record.lineage,
                    habitats: record.habitats,
                });
            }
        }
    }

    /// Parse all lines from a reader into a table.
    pub fn from_reader<R: BufRead>(reader: R, schema: &RecordSchema) -> Result<Self> {
        let (table, _) = Self::from_reader_with_stats(reader, schema)?;
        Ok(table)
    }

    /// Parse all lines from a reader, returning the table and parse statistics.
    ///
    /// I/O failures propagate; malformed lines are counted and skipped.
    pub fn from_reader_with_stats<R: BufRead>(
        reader: R,
        schema: &RecordSchema,
    ) -> Result<(Self, ParseSummary)> {
        let mut table = Self::new();
        let mut lines_read = 0;
        let mut records_parsed = 0;
        let mut records_merged = 0;

        for (line_no, line_result) in reader.lines().enumerate() {
            let line = line_result?;
            lines_read += 1;
            if line.trim().is_empty() {
                continue;
            }
            if let Some(record) = parse_line(&line, line_no + 1, schema) {
                records_parsed += 1;
                if table.contains(&record.id) {
                    records_merged += 1;
                }
                table.insert(record);
            }
        }

        let summary = ParseSummary {
            lines_read,
            records_parsed,
            lines_skipped: lines_read - records_parsed,
            records_merged,
            n_strains: table.len(),
        };
        info!("{}", summary);
        Ok((table, summary))
    }

    /// Load a table from a tab-delimited export file.
    pub fn from_tsv<P: AsRef<Path>>(path: P, schema: &RecordSchema) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), schema)
    }

    /// Remove strains whose lineage contains any of the given taxon markers.
    ///
    /// Returns the number of strains removed. Used to drop records from a
    /// foreign clade that the export interleaves (e.g. fungal taxa).
    pub fn exclude_by_lineage(&mut self, markers: &BTreeSet<String>) -> usize {
        if markers.is_empty() {
            return 0;
        }
        let before = self.strains.len();
        self.strains
            .retain(|s| !s.lineage.iter().any(|t| markers.contains(t)));
        self.index = self
            .strains
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.clone(), i))
            .collect();
        let removed = before - self.strains.len();
        if removed > 0 {
            debug!("excluded {} strains by lineage marker", removed);
        }
        removed
    }

    /// Number of distinct strains.
    #[inline]
    pub fn len(&self) -> usize {
        self.strains.len()
    }

    /// Whether the table holds no strains.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.strains.is_empty()
    }

    /// Whether a strain with this identifier is present.
    #[inline]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Look up a strain by identifier.
    pub fn get(&self, id: &str) -> Option<&Strain> {
        self.index.get(id).map(|&i| &self.strains[i])
    }

    /// Iterate over strains in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Strain> {
        self.strains.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::record::RecordSchema;
    use std::io::Cursor;

    fn record(id: &str, lineage: &[&str], habitats: &[&str]) -> StrainRecord {
        StrainRecord {
            id: id.to_string(),
            lineage: lineage.iter().map(|s| s.to_string()).collect(),
            habitats: habitats.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_insert_and_get() {
        let mut table = StrainTable::new();
        table.insert(record("A", &["2", "1224"], &["h1"]));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("A").unwrap().lineage, vec!["2", "1224"]);
    }

    #[test]
    fn test_duplicate_merges_habitats() {
        let mut table = StrainTable::new();
        table.insert(record("A", &["2", "1224"], &["h1"]));
        table.insert(record("A", &["999"], &["h2", "h3"]));

        assert_eq!(table.len(), 1);
        let strain = table.get("A").unwrap();
        // lineage from first occurrence, habitats unioned
        assert_eq!(strain.lineage, vec!["2", "1224"]);
        assert_eq!(strain.habitats.len(), 3);
    }

    #[test]
    fn test_exclude_by_lineage() {
        let mut table = StrainTable::new();
        table.insert(record("A", &["2", "1224"], &["h1"]));
        table.insert(record("B", &["2759", "4751"], &["h1"]));
        table.insert(record("C", &["2", "1239"], &["h2"]));

        let markers: BTreeSet<String> = ["4751".to_string()].into_iter().collect();
        let removed = table.exclude_by_lineage(&markers);

        assert_eq!(removed, 1);
        assert_eq!(table.len(), 2);
        assert!(!table.contains("B"));
        // index stays consistent after removal
        assert_eq!(table.get("C").unwrap().id, "C");
    }

    #[test]
    fn test_from_reader() {
        let lines = "\
f0\tf1\tf2\tncbi:131567/ncbi:2\tf4\tf5\tf6\t#Env/OBT:1/OBT:40\tA
short line
f0\tf1\tf2\tncbi:131567/ncbi:2/ncbi:1224\tf4\tf5\tf6\t#Env/OBT:1/OBT:41\tB
f0\tf1\tf2\tncbi:131567/ncbi:9999\tf4\tf5\tf6\t#Env/OBT:1/OBT:42\tA
";
        let (table, summary) =
            StrainTable::from_reader_with_stats(Cursor::new(lines), &RecordSchema::default())
                .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(summary.records_parsed, 3);
        assert_eq!(summary.lines_skipped, 1);
        assert_eq!(summary.records_merged, 1);

        let a = table.get("A").unwrap();
        assert_eq!(a.lineage, vec!["2"]); // first record wins
        assert_eq!(a.habitats.len(), 2); // 40 and 42 merged
    }
}
