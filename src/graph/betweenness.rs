//! Approximate weighted betweenness centrality.

use crate::error::{HabnetError, Result};
use crate::graph::SimilarityGraph;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Min-heap entry for Dijkstra; orders by distance, then node index.
#[derive(Debug, Clone, Copy, PartialEq)]
struct HeapEntry {
    dist: f64,
    node: usize,
}

impl Eq for HeapEntry {}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so BinaryHeap pops the smallest distance first.
        other
            .dist
            .total_cmp(&self.dist)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Approximate betweenness centrality from `k` sampled source nodes.
///
/// Brandes accumulation over weighted shortest paths, treating edge
/// weight as path cost. Sources are sampled without replacement using
/// the seed; `k` larger than the node count falls back to the exact
/// computation. Values carry the undirected pair normalization
/// 2/((n-1)(n-2)) and the n/k sample correction; graphs with fewer
/// than three nodes have no intermediate pairs and score all zeros.
pub fn betweenness_approx(graph: &SimilarityGraph, k: usize, seed: u64) -> Result<Vec<f64>> {
    if k == 0 {
        return Err(HabnetError::InvalidParameter(
            "betweenness sample count must be at least 1".to_string(),
        ));
    }

    let n = graph.n_nodes();
    if n <= 2 {
        return Ok(vec![0.0; n]);
    }

    let k_used = k.min(n);
    if k_used < k {
        debug!("betweenness: clamping {} samples to {} nodes", k, n);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut sources: Vec<usize> = (0..n).collect();
    sources.shuffle(&mut rng);
    sources.truncate(k_used);

    // Per-source contributions are collected in sample order and summed
    // sequentially, so the float total does not depend on scheduling.
    let contributions: Vec<Vec<f64>> = sources
        .par_iter()
        .map(|&s| single_source_delta(graph, s))
        .collect();

    let mut centrality = vec![0.0; n];
    for contribution in contributions {
        for (total, delta) in centrality.iter_mut().zip(contribution) {
            *total += delta;
        }
    }

    let scale = n as f64 / (k_used as f64 * (n - 1) as f64 * (n - 2) as f64);
    for value in centrality.iter_mut() {
        *value *= scale;
    }

    info!(
        "betweenness: {} of {} sources sampled (seed {})",
        k_used, n, seed
    );
    Ok(centrality)
}

/// Dependency of one source on every other node (Brandes delta pass).
fn single_source_delta(graph: &SimilarityGraph, source: usize) -> Vec<f64> {
    let n = graph.n_nodes();
    let mut dist = vec![f64::INFINITY; n];
    let mut sigma = vec![0.0f64; n];
    let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut settled = vec![false; n];
    let mut order = Vec::with_capacity(n);

    let mut heap = BinaryHeap::new();
    dist[source] = 0.0;
    sigma[source] = 1.0;
    heap.push(HeapEntry {
        dist: 0.0,
        node: source,
    });

    while let Some(HeapEntry { dist: d, node: v }) = heap.pop() {
        if settled[v] {
            continue;
        }
        settled[v] = true;
        order.push(v);

        // v is settled, so sigma[v] is final before any relaxation.
        for &(w, weight) in graph.neighbors(v) {
            if settled[w] {
                continue;
            }
            let candidate = d + weight;
            if candidate < dist[w] {
                dist[w] = candidate;
                sigma[w] = sigma[v];
                preds[w].clear();
                preds[w].push(v);
                heap.push(HeapEntry {
                    dist: candidate,
                    node: w,
                });
            } else if candidate == dist[w] {
                sigma[w] += sigma[v];
                preds[w].push(v);
            }
        }
    }

    let mut delta = vec![0.0f64; n];
    let mut contribution = vec![0.0f64; n];
    for &w in order.iter().rev() {
        for &v in &preds[w] {
            delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
        }
        if w != source {
            contribution[w] = delta[w];
        }
    }
    contribution
}
