//! Undirected weighted similarity graph and its analytics.

mod artifact;
mod betweenness;
mod clustering;
mod community;
mod degree;

pub use artifact::{write_community_sizes, GraphArtifact, NodeMetricsRow, NodeMetricsTable};
pub use betweenness::betweenness_approx;
pub use clustering::clustering_coefficients;
pub use community::{louvain_communities, CommunityStructure};
pub use degree::{weighted_degrees, write_degrees_csv};

use crate::error::{HabnetError, Result};
use crate::similarity::SimilarityMatrix;
use log::info;

/// Undirected weighted graph over taxon labels.
///
/// Node order equals row-label order, so graph indices and matrix rows agree.
/// Adjacency lists are sorted by neighbor index and every edge appears in
/// both endpoint lists. Self-loops are never materialized: the similarity
/// diagonal is self-affinity, not connectivity.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityGraph {
    labels: Vec<String>,
    adjacency: Vec<Vec<(usize, f64)>>,
}

impl SimilarityGraph {
    /// Build a graph from a symmetric similarity matrix and node labels.
    ///
    /// Only entries with positive weight become edges; the diagonal and the
    /// lower triangle are skipped (the upper triangle is mirrored into both
    /// adjacency lists, so a symmetric input yields a symmetric graph).
    pub fn from_similarity(sim: &SimilarityMatrix, labels: Vec<String>) -> Result<Self> {
        if sim.n_nodes() != labels.len() {
            return Err(HabnetError::DimensionMismatch {
                expected: sim.n_nodes(),
                actual: labels.len(),
            });
        }

        let n = labels.len();
        let mut adjacency: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
        for (i, j, w) in sim.iter_entries() {
            if i < j && w > 0.0 {
                adjacency[i].push((j, w));
                adjacency[j].push((i, w));
            }
        }

        let graph = Self { labels, adjacency };
        info!(
            "graph: {} nodes, {} edges",
            graph.n_nodes(),
            graph.n_edges()
        );
        Ok(graph)
    }

    /// Assemble a graph directly from adjacency lists.
    ///
    /// Callers must supply symmetric, self-loop-free lists sorted by
    /// neighbor index; the sparsifier uses this after cutting edges.
    pub(crate) fn from_parts(labels: Vec<String>, adjacency: Vec<Vec<(usize, f64)>>) -> Self {
        debug_assert_eq!(labels.len(), adjacency.len());
        Self { labels, adjacency }
    }

    /// Number of nodes.
    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.labels.len()
    }

    /// Number of edges (each counted once).
    #[inline]
    pub fn n_edges(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum::<usize>() / 2
    }

    /// Node labels in index order.
    #[inline]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Label of one node.
    #[inline]
    pub fn label(&self, node: usize) -> &str {
        &self.labels[node]
    }

    /// Neighbors of a node with edge weights, sorted by neighbor index.
    #[inline]
    pub fn neighbors(&self, node: usize) -> &[(usize, f64)] {
        &self.adjacency[node]
    }

    /// Number of neighbors of a node.
    #[inline]
    pub fn degree(&self, node: usize) -> usize {
        self.adjacency[node].len()
    }

    /// Weight of the edge (u, v), if present.
    pub fn edge_weight(&self, u: usize, v: usize) -> Option<f64> {
        self.adjacency[u]
            .binary_search_by_key(&v, |&(nb, _)| nb)
            .ok()
            .map(|pos| self.adjacency[u][pos].1)
    }

    /// Iterate over edges as (u, v, weight) with u < v, in stable order.
    pub fn edge_iter(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.adjacency.iter().enumerate().flat_map(|(u, nbrs)| {
            nbrs.iter()
                .filter(move |&&(v, _)| u < v)
                .map(move |&(v, w)| (u, v, w))
        })
    }

    /// Total edge weight (each edge counted once).
    pub fn total_weight(&self) -> f64 {
        self.edge_iter().map(|(_, _, w)| w).sum()
    }
}
