//! Data structures for habitat profile analysis.

mod labels;
mod matrix;
mod record;
mod strains;

pub use labels::{LabelConfig, LabelIndex};
pub use matrix::ProfileMatrix;
pub use record::{habitat_tokens, lineage_tokens, parse_line, RecordSchema, StrainRecord};
pub use strains::{ParseSummary, Strain, StrainTable};
