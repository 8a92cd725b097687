//! Weighted clustering coefficients.

use crate::graph::SimilarityGraph;
use rayon::prelude::*;

/// Weighted clustering coefficient per node, in node order.
///
/// Geometric-mean triangle form: each triangle at node u contributes
/// the cube root of the product of its three edge weights, normalized
/// by the largest weight in the graph, and the sum is scaled by
/// 2 / (deg(u) * (deg(u) - 1)). Nodes with fewer than two neighbors
/// score 0.
pub fn clustering_coefficients(graph: &SimilarityGraph) -> Vec<f64> {
    let n = graph.n_nodes();
    let max_weight = graph
        .edge_iter()
        .map(|(_, _, w)| w)
        .fold(0.0f64, f64::max);
    if max_weight <= 0.0 {
        return vec![0.0; n];
    }

    (0..n)
        .into_par_iter()
        .map(|u| {
            let nbrs = graph.neighbors(u);
            let degree = nbrs.len();
            if degree < 2 {
                return 0.0;
            }
            let mut triangle_sum = 0.0;
            for (a, &(j, w_uj)) in nbrs.iter().enumerate() {
                for &(k, w_uk) in &nbrs[a + 1..] {
                    if let Some(w_jk) = graph.edge_weight(j, k) {
                        let product =
                            (w_uj / max_weight) * (w_jk / max_weight) * (w_uk / max_weight);
                        triangle_sum += product.cbrt();
                    }
                }
            }
            2.0 * triangle_sum / (degree as f64 * (degree - 1) as f64)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::SimilarityMatrix;
    use approx::assert_relative_eq;

    fn graph_from_edges(n: usize, edges: &[(usize, usize, f64)]) -> SimilarityGraph {
        let mut rows = vec![Vec::new(); n];
        for &(u, v, w) in edges {
            rows[u].push((v, w));
            rows[v].push((u, w));
        }
        for row in rows.iter_mut() {
            row.sort_unstable_by_key(|&(j, _)| j);
        }
        let labels = (0..n).map(|i| format!("n{}", i)).collect();
        SimilarityGraph::from_similarity(&SimilarityMatrix::from_rows(rows), labels).unwrap()
    }

    #[test]
    fn test_uniform_triangle_is_one() {
        let graph = graph_from_edges(3, &[(0, 1, 1.0), (1, 2, 1.0), (0, 2, 1.0)]);
        for c in clustering_coefficients(&graph) {
            assert_relative_eq!(c, 1.0);
        }
    }

    #[test]
    fn test_scale_invariance() {
        // Uniform weights normalize to 1 regardless of magnitude.
        let graph = graph_from_edges(3, &[(0, 1, 0.2), (1, 2, 0.2), (0, 2, 0.2)]);
        for c in clustering_coefficients(&graph) {
            assert_relative_eq!(c, 1.0);
        }
    }

    #[test]
    fn test_geometric_mean_weights() {
        let graph = graph_from_edges(3, &[(0, 1, 1.0), (1, 2, 0.5), (0, 2, 0.25)]);
        let coefficients = clustering_coefficients(&graph);
        // cbrt(1.0 * 0.5 * 0.25) = 0.5 for every corner.
        for c in coefficients {
            assert_relative_eq!(c, 0.5, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_low_degree_scores_zero() {
        let graph = graph_from_edges(3, &[(0, 1, 1.0), (1, 2, 1.0)]);
        let coefficients = clustering_coefficients(&graph);
        assert_relative_eq!(coefficients[0], 0.0);
        // The middle node has degree 2 but no closing edge.
        assert_relative_eq!(coefficients[1], 0.0);
    }

    #[test]
    fn test_pendant_dilutes_coefficient() {
        let graph = graph_from_edges(
            4,
            &[(0, 1, 1.0), (0, 2, 1.0), (1, 2, 1.0), (0, 3, 1.0)],
        );
        let coefficients = clustering_coefficients(&graph);
        // Node 0 has one triangle over three neighbor pairs.
        assert_relative_eq!(coefficients[0], 1.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(coefficients[1], 1.0);
        assert_relative_eq!(coefficients[3], 0.0);
    }

    #[test]
    fn test_triangle_free_graph() {
        let graph = graph_from_edges(
            4,
            &[(0, 1, 1.0), (1, 3, 1.0), (3, 2, 1.0), (2, 0, 1.0)],
        );
        assert!(clustering_coefficients(&graph).iter().all(|&c| c == 0.0));
    }
}
