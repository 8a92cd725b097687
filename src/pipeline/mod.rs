//! Pipeline composition and execution for habitat network construction.

mod runner;

pub use runner::{Pipeline, PipelineConfig, PipelineOutput};
