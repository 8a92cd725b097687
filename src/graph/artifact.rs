//! Serializable graph artifacts: layout/community JSON, node metrics,
//! community size tables.

use crate::error::{HabnetError, Result};
use crate::graph::{CommunityStructure, SimilarityGraph};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Node labels, positions, and community assignment for one graph.
///
/// Positions are filled by an external layout tool; until then every
/// node sits at the origin. Serialized as JSON with the fields
/// `labels`, `pos3`, `communities`, `unique_comms`, `n_communities`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphArtifact {
    pub labels: Vec<String>,
    pub pos3: Vec<[f64; 3]>,
    pub communities: Vec<usize>,
    pub unique_comms: Vec<usize>,
    pub n_communities: usize,
}

impl GraphArtifact {
    /// Combine a graph's labels with a community partition.
    pub fn new(graph: &SimilarityGraph, structure: &CommunityStructure) -> Result<Self> {
        if graph.n_nodes() != structure.assignments.len() {
            return Err(HabnetError::DimensionMismatch {
                expected: graph.n_nodes(),
                actual: structure.assignments.len(),
            });
        }
        let unique_comms: Vec<usize> = structure
            .assignments
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        Ok(Self {
            labels: graph.labels().to_vec(),
            pos3: vec![[0.0; 3]; graph.n_nodes()],
            communities: structure.assignments.clone(),
            unique_comms,
            n_communities: structure.n_communities,
        })
    }

    /// Install externally computed node positions.
    pub fn set_positions(&mut self, positions: Vec<[f64; 3]>) -> Result<()> {
        if positions.len() != self.labels.len() {
            return Err(HabnetError::DimensionMismatch {
                expected: self.labels.len(),
                actual: positions.len(),
            });
        }
        self.pos3 = positions;
        Ok(())
    }

    /// Write the artifact as pretty-printed JSON.
    pub fn to_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Load an artifact written by [`GraphArtifact::to_json`].
    pub fn from_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

/// One row of the per-node metrics table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeMetricsRow {
    pub node: String,
    pub betweenness: f64,
    pub clustering: f64,
}

/// Betweenness and clustering per node, sorted by node label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeMetricsTable {
    rows: Vec<NodeMetricsRow>,
}

impl NodeMetricsTable {
    /// Merge metric vectors indexed by node into one label-sorted table.
    pub fn new(labels: &[String], betweenness: &[f64], clustering: &[f64]) -> Result<Self> {
        if betweenness.len() != labels.len() {
            return Err(HabnetError::DimensionMismatch {
                expected: labels.len(),
                actual: betweenness.len(),
            });
        }
        if clustering.len() != labels.len() {
            return Err(HabnetError::DimensionMismatch {
                expected: labels.len(),
                actual: clustering.len(),
            });
        }
        let mut rows: Vec<NodeMetricsRow> = labels
            .iter()
            .enumerate()
            .map(|(i, label)| NodeMetricsRow {
                node: label.clone(),
                betweenness: betweenness[i],
                clustering: clustering[i],
            })
            .collect();
        rows.sort_by(|a, b| a.node.cmp(&b.node));
        Ok(Self { rows })
    }

    #[inline]
    pub fn rows(&self) -> &[NodeMetricsRow] {
        &self.rows
    }

    /// Write as TSV with a `node\tbetweenness\tclustering` header.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "node\tbetweenness\tclustering")?;
        for row in &self.rows {
            writeln!(
                writer,
                "{}\t{}\t{}",
                row.node, row.betweenness, row.clustering
            )?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Write community sizes as CSV (`community_id,size`), largest first.
///
/// Communities below `min_size` are left out of the report; ties break
/// toward the smaller community id.
pub fn write_community_sizes<P: AsRef<Path>>(
    structure: &CommunityStructure,
    min_size: usize,
    path: P,
) -> Result<()> {
    let sizes = structure.community_sizes();
    let mut entries: Vec<(usize, usize)> = sizes
        .into_iter()
        .enumerate()
        .filter(|&(_, size)| size >= min_size)
        .collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writeln!(writer, "community_id,size")?;
    for (community_id, size) in entries {
        writeln!(writer, "{},{}", community_id, size)?;
    }
    writer.flush()?;
    Ok(())
}
