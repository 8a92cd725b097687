//! Parsing of tab-delimited habitat export records.
//!
//! Each line of the export describes one strain observation: a taxonomic
//! lineage path, a comma-separated list of habitat ontology paths, and the
//! strain identifier. Field positions follow the BacDive habitat export
//! layout and are configurable through [`RecordSchema`].

use log::warn;
use std::collections::BTreeSet;

/// Namespace prefix carried by lineage path segments.
const LINEAGE_NS: &str = "ncbi:";
/// Namespace prefix carried by habitat ontology path segments.
const HABITAT_NS: &str = "OBT:";
/// Prefix marking alternate-coding segments that are not taxon identifiers.
const ALT_CODING_PREFIX: &str = "bd:";

/// Field positions and path-slicing depths for the tab-delimited export.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RecordSchema {
    /// Zero-based field holding the strain identifier.
    pub id_field: usize,
    /// Zero-based field holding the lineage path.
    pub lineage_field: usize,
    /// Zero-based field holding the comma-separated habitat paths.
    pub habitat_field: usize,
    /// Leading lineage segments to drop (the namespace root).
    pub lineage_skip: usize,
    /// Leading segments to drop from each habitat path.
    pub habitat_path_skip: usize,
}

impl Default for RecordSchema {
    fn default() -> Self {
        Self {
            id_field: 8,
            lineage_field: 3,
            habitat_field: 7,
            lineage_skip: 1,
            habitat_path_skip: 2,
        }
    }
}

/// One parsed strain observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrainRecord {
    /// Strain identifier.
    pub id: String,
    /// Taxon identifiers from root to leaf, namespace stripped.
    pub lineage: Vec<String>,
    /// Habitat identifiers, deduplicated across all paths of the record.
    pub habitats: BTreeSet<String>,
}

/// Parse a single export line into a [`StrainRecord`].
///
/// Returns `None` when the line is too short to hold the configured fields;
/// the caller is expected to keep going. Malformed path segments inside an
/// otherwise valid line are skipped, never fatal.
pub fn parse_line(line: &str, line_no: usize, schema: &RecordSchema) -> Option<StrainRecord> {
    let fields: Vec<&str> = line.split('\t').collect();
    let needed = schema
        .id_field
        .max(schema.lineage_field)
        .max(schema.habitat_field);
    if fields.len() <= needed {
        warn!(
            "line {}: expected at least {} fields, found {}; skipping",
            line_no,
            needed + 1,
            fields.len()
        );
        return None;
    }

    let id = fields[schema.id_field].trim();
    if id.is_empty() {
        warn!("line {}: empty strain identifier; skipping", line_no);
        return None;
    }

    let lineage = lineage_tokens(fields[schema.lineage_field], schema.lineage_skip);
    let habitats = habitat_tokens(fields[schema.habitat_field], schema.habitat_path_skip);

    Some(StrainRecord {
        id: id.to_string(),
        lineage,
        habitats,
    })
}

/// Split a lineage path into taxon identifiers.
///
/// Segments are separated by `/`, each stripped of its `ncbi:` namespace
/// prefix. The first `skip` segments (the namespace root) are dropped, and
/// alternate-coding segments (`bd:` prefix) are excluded.
pub fn lineage_tokens(path: &str, skip: usize) -> Vec<String> {
    path.split('/')
        .map(|seg| seg.strip_prefix(LINEAGE_NS).unwrap_or(seg))
        .skip(skip)
        .filter(|seg| !seg.is_empty() && !seg.starts_with(ALT_CODING_PREFIX))
        .map(str::to_string)
        .collect()
}

/// Split a comma-separated list of habitat paths into habitat identifiers.
///
/// Each path is split on `/` with the `OBT:` namespace prefix stripped; the
/// first `skip` segments of every path (root category and top-level bucket)
/// are dropped. Identifiers from all paths are unioned.
pub fn habitat_tokens(paths: &str, skip: usize) -> BTreeSet<String> {
    let mut tokens = BTreeSet::new();
    for path in paths.split(',') {
        for seg in path
            .split('/')
            .map(|seg| seg.strip_prefix(HABITAT_NS).unwrap_or(seg))
            .skip(skip)
        {
            if !seg.is_empty() {
                tokens.insert(seg.to_string());
            }
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example_line() -> String {
        // 9 tab-separated fields; only 3, 7, 8 carry payload here
        let lineage = "ncbi:131567/ncbi:2/bd:extra/ncbi:1224/ncbi:28211";
        let habitats = "#Environment/OBT:000001/OBT:000245,#Environment/OBT:000001/OBT:000246/OBT:000300";
        format!(
            "f0\tf1\tf2\t{}\tf4\tf5\tf6\t{}\tBD-123",
            lineage, habitats
        )
    }

    #[test]
    fn test_parse_line() {
        let rec = parse_line(&example_line(), 1, &RecordSchema::default()).unwrap();
        assert_eq!(rec.id, "BD-123");
        // root token dropped, bd: segment excluded
        assert_eq!(rec.lineage, vec!["2", "1224", "28211"]);
        // first two segments of each habitat path dropped, union over paths
        let expected: BTreeSet<String> = ["000245", "000246", "000300"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(rec.habitats, expected);
    }

    #[test]
    fn test_short_line_skipped() {
        assert!(parse_line("a\tb\tc", 1, &RecordSchema::default()).is_none());
    }

    #[test]
    fn test_empty_id_skipped() {
        let line = "f0\tf1\tf2\tncbi:131567/ncbi:2\tf4\tf5\tf6\t#Env/OBT:1/OBT:2\t";
        assert!(parse_line(line, 1, &RecordSchema::default()).is_none());
    }

    #[test]
    fn test_lineage_tokens_root_dropped() {
        let toks = lineage_tokens("ncbi:131567/ncbi:2/ncbi:1224", 1);
        assert_eq!(toks, vec!["2", "1224"]);
    }

    #[test]
    fn test_lineage_tokens_alt_coding_excluded() {
        let toks = lineage_tokens("ncbi:131567/bd:99/ncbi:2", 1);
        assert_eq!(toks, vec!["2"]);
    }

    #[test]
    fn test_habitat_tokens_short_path() {
        // a path shorter than the skip depth contributes nothing
        let toks = habitat_tokens("#Env/OBT:000001", 2);
        assert!(toks.is_empty());
    }

    #[test]
    fn test_habitat_tokens_deduplicated() {
        let toks = habitat_tokens("#Env/OBT:1/OBT:5,#Env/OBT:2/OBT:5", 2);
        assert_eq!(toks.len(), 1);
        assert!(toks.contains("5"));
    }

    #[test]
    fn test_empty_habitat_field() {
        let rec_line = "f0\tf1\tf2\tncbi:131567/ncbi:2\tf4\tf5\tf6\t\tBD-9";
        let rec = parse_line(rec_line, 1, &RecordSchema::default()).unwrap();
        assert!(rec.habitats.is_empty());
        assert_eq!(rec.lineage, vec!["2"]);
    }
}
