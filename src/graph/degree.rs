//! Weighted degree computation and export.

use crate::error::Result;
use crate::graph::SimilarityGraph;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Sum of incident edge weights per node, in node order.
pub fn weighted_degrees(graph: &SimilarityGraph) -> Vec<f64> {
    (0..graph.n_nodes())
        .map(|u| graph.neighbors(u).iter().map(|&(_, w)| w).sum())
        .collect()
}

/// Write degrees as a single-column CSV with a `weighted_degree` header.
pub fn write_degrees_csv<P: AsRef<Path>>(degrees: &[f64], path: P) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writeln!(writer, "weighted_degree")?;
    for degree in degrees {
        writeln!(writer, "{}", degree)?;
    }
    writer.flush()?;
    Ok(())
}
