//! Mutual top-percent sparsification of a similarity graph.

use crate::error::{HabnetError, Result};
use crate::graph::SimilarityGraph;
use log::info;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Parameters for mutual sparsification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutualSparsifyConfig {
    /// Fraction of each node's neighbors it nominates (0, 1].
    pub percent: f64,
    /// Hard cap on nominations per node.
    pub max_neighbors: usize,
}

impl Default for MutualSparsifyConfig {
    fn default() -> Self {
        Self {
            percent: 0.70,
            max_neighbors: 2000,
        }
    }
}

/// Summary of a mutual sparsification pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutualSparsifyResult {
    pub n_edges_before: usize,
    pub n_edges_after: usize,
    pub n_edges_removed: usize,
    pub percent: f64,
    pub max_neighbors: usize,
}

impl fmt::Display for MutualSparsifyResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Mutual Sparsify Result")?;
        writeln!(
            f,
            "  Nominations: top {:.0}% of neighbors, at most {}",
            self.percent * 100.0,
            self.max_neighbors
        )?;
        writeln!(f, "  Edges before: {}", self.n_edges_before)?;
        writeln!(f, "  Edges after: {}", self.n_edges_after)?;
        writeln!(f, "  Removed: {}", self.n_edges_removed)
    }
}

/// Keep only edges that both endpoints nominate.
///
/// Each node nominates its `M` heaviest neighbors, where
/// `M = clamp(round(percent * degree), 1, max_neighbors)`; nodes whose
/// degree is within the allowance nominate everyone. Selection breaks
/// weight ties toward the smaller neighbor index. An edge survives only
/// when it is nominated from both sides, so the output stays symmetric
/// by construction.
pub fn mutual_sparsify(
    graph: &SimilarityGraph,
    config: &MutualSparsifyConfig,
) -> Result<SimilarityGraph> {
    let (sparsified, _) = mutual_sparsify_with_stats(graph, config)?;
    Ok(sparsified)
}

/// Like [`mutual_sparsify`] but also returns edge-count statistics.
pub fn mutual_sparsify_with_stats(
    graph: &SimilarityGraph,
    config: &MutualSparsifyConfig,
) -> Result<(SimilarityGraph, MutualSparsifyResult)> {
    if !(config.percent > 0.0 && config.percent <= 1.0) {
        return Err(HabnetError::InvalidParameter(format!(
            "percent must be in (0, 1], got {}",
            config.percent
        )));
    }
    if config.max_neighbors == 0 {
        return Err(HabnetError::InvalidParameter(
            "max_neighbors must be at least 1".to_string(),
        ));
    }

    let n = graph.n_nodes();

    // Neighbor indices each node nominates, sorted for binary search.
    let nominated: Vec<Vec<usize>> = (0..n)
        .into_par_iter()
        .map(|u| {
            let nbrs = graph.neighbors(u);
            let degree = nbrs.len();
            if degree == 0 {
                return Vec::new();
            }
            let allowance = ((config.percent * degree as f64).round() as usize)
                .clamp(1, config.max_neighbors);
            let mut picks: Vec<usize> = if degree <= allowance {
                nbrs.iter().map(|&(v, _)| v).collect()
            } else {
                let mut entries = nbrs.to_vec();
                entries.select_nth_unstable_by(allowance - 1, |a, b| {
                    b.1.partial_cmp(&a.1).unwrap().then(a.0.cmp(&b.0))
                });
                entries.truncate(allowance);
                entries.into_iter().map(|(v, _)| v).collect()
            };
            picks.sort_unstable();
            picks
        })
        .collect();

    let adjacency: Vec<Vec<(usize, f64)>> = (0..n)
        .into_par_iter()
        .map(|u| {
            graph
                .neighbors(u)
                .iter()
                .copied()
                .filter(|&(v, _)| {
                    nominated[u].binary_search(&v).is_ok()
                        && nominated[v].binary_search(&u).is_ok()
                })
                .collect()
        })
        .collect();

    let sparsified = SimilarityGraph::from_parts(graph.labels().to_vec(), adjacency);
    let result = MutualSparsifyResult {
        n_edges_before: graph.n_edges(),
        n_edges_after: sparsified.n_edges(),
        n_edges_removed: graph.n_edges() - sparsified.n_edges(),
        percent: config.percent,
        max_neighbors: config.max_neighbors,
    };
    info!(
        "mutual sparsify: {} -> {} edges",
        result.n_edges_before, result.n_edges_after
    );
    Ok((sparsified, result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::SimilarityMatrix;

    fn star_graph() -> SimilarityGraph {
        // Node 0 is the hub; leaves 1..3 see only the hub.
        let sim = SimilarityMatrix::from_rows(vec![
            vec![(1, 0.9), (2, 0.8), (3, 0.7)],
            vec![(0, 0.9)],
            vec![(0, 0.8)],
            vec![(0, 0.7)],
        ]);
        let labels = (0..4).map(|i| format!("n{}", i)).collect();
        SimilarityGraph::from_similarity(&sim, labels).unwrap()
    }

    #[test]
    fn test_asymmetric_nominations_dropped() {
        let config = MutualSparsifyConfig {
            percent: 0.5,
            max_neighbors: 2000,
        };
        // Hub allowance: round(0.5 * 3) = 2, so it nominates 1 and 2.
        // Leaf 3 nominates the hub, but not mutually: edge (0, 3) dies.
        let (sparsified, stats) = mutual_sparsify_with_stats(&star_graph(), &config).unwrap();
        assert_eq!(stats.n_edges_before, 3);
        assert_eq!(stats.n_edges_after, 2);
        assert!(sparsified.edge_weight(0, 1).is_some());
        assert!(sparsified.edge_weight(0, 2).is_some());
        assert_eq!(sparsified.edge_weight(0, 3), None);
        assert_eq!(sparsified.degree(3), 0);
    }

    #[test]
    fn test_full_percent_keeps_everything() {
        let graph = star_graph();
        let config = MutualSparsifyConfig {
            percent: 1.0,
            max_neighbors: 2000,
        };
        let sparsified = mutual_sparsify(&graph, &config).unwrap();
        assert_eq!(sparsified, graph);
    }

    #[test]
    fn test_allowance_floor_is_one() {
        // round(0.1 * 3) = 0 would nominate no one; the floor keeps the
        // hub's heaviest edge alive.
        let config = MutualSparsifyConfig {
            percent: 0.1,
            max_neighbors: 2000,
        };
        let sparsified = mutual_sparsify(&star_graph(), &config).unwrap();
        assert_eq!(sparsified.n_edges(), 1);
        assert!(sparsified.edge_weight(0, 1).is_some());
    }

    #[test]
    fn test_max_neighbors_cap() {
        let config = MutualSparsifyConfig {
            percent: 1.0,
            max_neighbors: 1,
        };
        let sparsified = mutual_sparsify(&star_graph(), &config).unwrap();
        // The hub may nominate only its strongest neighbor.
        assert_eq!(sparsified.n_edges(), 1);
        assert!(sparsified.edge_weight(0, 1).is_some());
    }

    #[test]
    fn test_output_symmetric() {
        let config = MutualSparsifyConfig {
            percent: 0.5,
            max_neighbors: 2000,
        };
        let sparsified = mutual_sparsify(&star_graph(), &config).unwrap();
        for (u, v, w) in sparsified.edge_iter() {
            assert_eq!(sparsified.edge_weight(v, u), Some(w));
        }
    }

    #[test]
    fn test_invalid_percent_rejected() {
        let graph = star_graph();
        for percent in [0.0, -0.2, 1.5] {
            let config = MutualSparsifyConfig {
                percent,
                max_neighbors: 2000,
            };
            assert!(mutual_sparsify(&graph, &config).is_err());
        }
    }
}
