//! Seeded Louvain community detection.

use crate::graph::SimilarityGraph;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Below this modularity gain a pass or a level is considered converged.
const MIN_MODULARITY_GAIN: f64 = 1e-7;

/// A total partition of graph nodes into communities.
///
/// Community ids are contiguous and renumbered by discovery order: the
/// community of the lowest-indexed node is 0, the next new community
/// seen while scanning nodes in index order is 1, and so on.
#[derive(Debug, Clone, Serialize)]
pub struct CommunityStructure {
    /// Community id per node, in node order.
    pub assignments: Vec<usize>,
    /// Number of distinct communities.
    pub n_communities: usize,
    /// Modularity of the partition.
    pub modularity: f64,
}

impl CommunityStructure {
    /// Number of member nodes per community, indexed by community id.
    pub fn community_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0usize; self.n_communities];
        for &community in &self.assignments {
            sizes[community] += 1;
        }
        sizes
    }
}

impl fmt::Display for CommunityStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Community Structure")?;
        writeln!(f, "  Nodes: {}", self.assignments.len())?;
        writeln!(f, "  Communities: {}", self.n_communities)?;
        writeln!(f, "  Modularity: {:.4}", self.modularity)
    }
}

/// Working graph for one Louvain level.
///
/// Inter-node edges live in mirrored adjacency lists; self-loop weight
/// (intra-community weight folded in by aggregation) is stored once per
/// node. Total weight counts every edge once and every loop once, while
/// a node's degree counts its loop twice.
struct LevelGraph {
    adjacency: Vec<Vec<(usize, f64)>>,
    loops: Vec<f64>,
}

impl LevelGraph {
    fn from_graph(graph: &SimilarityGraph) -> Self {
        let adjacency = (0..graph.n_nodes())
            .map(|u| graph.neighbors(u).to_vec())
            .collect();
        Self {
            adjacency,
            loops: vec![0.0; graph.n_nodes()],
        }
    }

    fn n_nodes(&self) -> usize {
        self.loops.len()
    }

    fn total_weight(&self) -> f64 {
        let edges: f64 = self
            .adjacency
            .iter()
            .enumerate()
            .flat_map(|(u, nbrs)| nbrs.iter().filter(move |&&(v, _)| u < v))
            .map(|&(_, w)| w)
            .sum();
        edges + self.loops.iter().sum::<f64>()
    }

    fn node_degree(&self, u: usize) -> f64 {
        let adjacent: f64 = self.adjacency[u].iter().map(|&(_, w)| w).sum();
        adjacent + 2.0 * self.loops[u]
    }
}

/// Detect communities by seeded Louvain.
///
/// Runs shuffled local-move passes until a pass moves nothing or gains
/// less than 1e-7 modularity, aggregates communities into a coarser
/// graph, and repeats while a level still improves modularity. The same
/// seed always yields the same partition.
pub fn louvain_communities(graph: &SimilarityGraph, seed: u64) -> CommunityStructure {
    let n = graph.n_nodes();
    let mut level = LevelGraph::from_graph(graph);

    if n == 0 || level.total_weight() <= 0.0 {
        warn!("louvain: no positive edge weight, every node is its own community");
        return CommunityStructure {
            assignments: (0..n).collect(),
            n_communities: n,
            modularity: 0.0,
        };
    }

    let mut rng = StdRng::seed_from_u64(seed);

    // First level is unconditional; afterwards aggregate while a level
    // still gains modularity.
    let (node_comm, mut best_mod) = one_level(&level, &mut rng);
    let (mut partition, mut n_comms) = renumber(&node_comm);
    let mut membership = partition.clone();
    let mut n_levels = 1;

    loop {
        level = aggregate(&level, &partition, n_comms);
        let (node_comm, new_mod) = one_level(&level, &mut rng);
        if new_mod - best_mod < MIN_MODULARITY_GAIN {
            break;
        }
        let (next_partition, next_n) = renumber(&node_comm);
        for slot in membership.iter_mut() {
            *slot = next_partition[*slot];
        }
        partition = next_partition;
        n_comms = next_n;
        best_mod = new_mod;
        n_levels += 1;
    }

    // Composition of first-appearance renumberings is already in
    // discovery order; renumber once more to make that explicit.
    let (assignments, n_communities) = renumber(&membership);
    info!(
        "louvain: {} levels, {} communities, modularity {:.4}",
        n_levels, n_communities, best_mod
    );
    CommunityStructure {
        assignments,
        n_communities,
        modularity: best_mod,
    }
}

/// One level of local moves. Returns the raw node-to-community map and
/// the modularity it reached.
fn one_level(graph: &LevelGraph, rng: &mut StdRng) -> (Vec<usize>, f64) {
    let n = graph.n_nodes();
    let m = graph.total_weight();
    let degrees: Vec<f64> = (0..n).map(|u| graph.node_degree(u)).collect();

    let mut node_comm: Vec<usize> = (0..n).collect();
    let mut sigma_tot = degrees.clone();
    let mut internals = graph.loops.clone();
    let mut order: Vec<usize> = (0..n).collect();

    let mut cur_mod = modularity_from(&internals, &sigma_tot, m);
    loop {
        order.shuffle(rng);
        let mut moved = false;

        for &u in &order {
            let cur = node_comm[u];
            let k_u = degrees[u];

            // Edge weight from u into each adjacent community.
            let mut neigh: HashMap<usize, f64> = HashMap::new();
            for &(v, w) in &graph.adjacency[u] {
                *neigh.entry(node_comm[v]).or_insert(0.0) += w;
            }
            let w_cur = neigh.get(&cur).copied().unwrap_or(0.0);

            // Detach u, then compare staying against every adjacent
            // community; candidates in sorted id order so equal gains
            // resolve the same way every run.
            sigma_tot[cur] -= k_u;
            internals[cur] -= w_cur + graph.loops[u];

            let mut best_comm = cur;
            let mut best_gain = w_cur - sigma_tot[cur] * k_u / (2.0 * m);
            let mut candidates: Vec<usize> = neigh.keys().copied().collect();
            candidates.sort_unstable();
            for c in candidates {
                if c == cur {
                    continue;
                }
                let gain = neigh[&c] - sigma_tot[c] * k_u / (2.0 * m);
                if gain > best_gain {
                    best_gain = gain;
                    best_comm = c;
                }
            }

            node_comm[u] = best_comm;
            sigma_tot[best_comm] += k_u;
            internals[best_comm] += neigh.get(&best_comm).copied().unwrap_or(0.0) + graph.loops[u];
            if best_comm != cur {
                moved = true;
            }
        }

        let new_mod = modularity_from(&internals, &sigma_tot, m);
        if !moved || new_mod - cur_mod < MIN_MODULARITY_GAIN {
            return (node_comm, new_mod);
        }
        cur_mod = new_mod;
    }
}

fn modularity_from(internals: &[f64], sigma_tot: &[f64], m: f64) -> f64 {
    internals
        .iter()
        .zip(sigma_tot)
        .map(|(&inc, &tot)| inc / m - (tot / (2.0 * m)).powi(2))
        .sum()
}

/// Remap community ids to 0..k-1 by first appearance in node order.
fn renumber(assignments: &[usize]) -> (Vec<usize>, usize) {
    let mut remap: HashMap<usize, usize> = HashMap::new();
    let mut result = Vec::with_capacity(assignments.len());
    for &community in assignments {
        let next = remap.len();
        result.push(*remap.entry(community).or_insert(next));
    }
    (result, remap.len())
}

/// Collapse every community into a single node. Intra-community weight
/// (including member loops) becomes the new node's loop; inter-community
/// weight is summed into one edge.
fn aggregate(graph: &LevelGraph, partition: &[usize], n_comms: usize) -> LevelGraph {
    let mut loops = vec![0.0; n_comms];
    let mut edges: Vec<HashMap<usize, f64>> = vec![HashMap::new(); n_comms];

    for u in 0..graph.n_nodes() {
        let cu = partition[u];
        loops[cu] += graph.loops[u];
        for &(v, w) in &graph.adjacency[u] {
            if v < u {
                continue;
            }
            let cv = partition[v];
            if cu == cv {
                loops[cu] += w;
            } else {
                *edges[cu].entry(cv).or_insert(0.0) += w;
                *edges[cv].entry(cu).or_insert(0.0) += w;
            }
        }
    }

    let adjacency = edges
        .into_iter()
        .map(|map| {
            let mut list: Vec<(usize, f64)> = map.into_iter().collect();
            list.sort_unstable_by_key(|&(c, _)| c);
            list
        })
        .collect();
    LevelGraph { adjacency, loops }
}
