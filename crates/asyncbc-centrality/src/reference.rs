//! Sequential Brandes (2001) reference over petgraph.
//!
//! Used by `--verify` and the test suite as ground truth for the
//! asynchronous engine. Parallel edges each count as a distinct path and
//! self-loops never lie on a shortest path, matching the engine.
//!
//! Complexity: O(V * E) per full run over all sources.

use std::collections::VecDeque;
use std::ops::Range;

use asyncbc_core::graph::{CsrGraph, NodeId};
use petgraph::{Direction, graph::NodeIndex, visit::NodeIndexable};
use tracing::instrument;

use crate::record::UNREACHED;
use crate::report::CentralityScores;

/// Betweenness contribution of every source in `sources`, unnormalized.
#[must_use]
#[instrument(skip(graph), fields(nodes = graph.node_count()))]
pub fn brandes(graph: &CsrGraph, sources: Range<NodeId>) -> CentralityScores {
    let g = graph.to_petgraph();
    let n = g.node_count();
    let mut cb = vec![0.0_f64; n];

    for s in sources {
        let s = NodeIndex::new(s as usize);
        let si = g.to_index(s);

        // Nodes in order of discovery; popped farthest first.
        let mut stack: Vec<NodeIndex> = Vec::with_capacity(n);
        let mut predecessors: Vec<Vec<NodeIndex>> = vec![Vec::new(); n];
        let mut sigma = vec![0.0_f64; n];
        let mut dist = vec![-1_i64; n];
        sigma[si] = 1.0;
        dist[si] = 0;

        let mut queue = VecDeque::from([s]);
        while let Some(v) = queue.pop_front() {
            let vi = g.to_index(v);
            stack.push(v);

            for w in g.neighbors_directed(v, Direction::Outgoing) {
                let wi = g.to_index(w);
                if dist[wi] < 0 {
                    dist[wi] = dist[vi] + 1;
                    queue.push_back(w);
                }
                if dist[wi] == dist[vi] + 1 {
                    sigma[wi] += sigma[vi];
                    predecessors[wi].push(v);
                }
            }
        }

        let mut delta = vec![0.0_f64; n];
        while let Some(w) = stack.pop() {
            let wi = g.to_index(w);
            for &v in &predecessors[wi] {
                let vi = g.to_index(v);
                delta[vi] += (sigma[vi] / sigma[wi]) * (1.0 + delta[wi]);
            }
            if wi != si {
                cb[wi] += delta[wi];
            }
        }
    }

    CentralityScores::new(cb)
}

/// BFS distance and saturating shortest-path count from `source`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathCounts {
    /// Hop count per node, [`UNREACHED`] when unreachable.
    pub distance: Vec<u32>,
    pub sigma: Vec<u64>,
}

#[must_use]
pub fn shortest_path_counts(graph: &CsrGraph, source: NodeId) -> PathCounts {
    let n = graph.node_count();
    let mut distance = vec![UNREACHED; n];
    let mut sigma = vec![0_u64; n];
    distance[source as usize] = 0;
    sigma[source as usize] = 1;

    let mut queue = VecDeque::from([source]);
    while let Some(v) = queue.pop_front() {
        let vd = distance[v as usize];
        for w in graph.successors(v) {
            let wi = w as usize;
            if distance[wi] == UNREACHED {
                distance[wi] = vd + 1;
                queue.push_back(w);
            }
            if distance[wi] == vd + 1 {
                sigma[wi] = sigma[wi].saturating_add(sigma[v as usize]);
            }
        }
    }

    PathCounts { distance, sigma }
}
