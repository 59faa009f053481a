//! Synthetic topologies for tests, benchmarks and `--generate` style tooling.
//!
//! Undirected variants emit both directions of every edge.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::graph::csr::{CsrGraph, NodeId};

fn push_edge(edges: &mut Vec<(NodeId, NodeId)>, a: NodeId, b: NodeId, undirected: bool) {
    edges.push((a, b));
    if undirected {
        edges.push((b, a));
    }
}

/// `0 - 1 - ... - (n-1)`.
#[must_use]
pub fn path(n: NodeId, undirected: bool) -> CsrGraph {
    let mut edges = Vec::new();
    for v in 1..n {
        push_edge(&mut edges, v - 1, v, undirected);
    }
    CsrGraph::build(n, &edges)
}

/// A path closed back onto node 0. Fewer than three nodes degrade to a path.
#[must_use]
pub fn cycle(n: NodeId, undirected: bool) -> CsrGraph {
    let mut edges = Vec::new();
    for v in 1..n {
        push_edge(&mut edges, v - 1, v, undirected);
    }
    if n >= 3 {
        push_edge(&mut edges, n - 1, 0, undirected);
    }
    CsrGraph::build(n, &edges)
}

/// Undirected `rows x cols` lattice, node `r * cols + c`.
#[must_use]
pub fn grid(rows: NodeId, cols: NodeId) -> CsrGraph {
    let mut edges = Vec::new();
    for r in 0..rows {
        for c in 0..cols {
            let v = r * cols + c;
            if c + 1 < cols {
                push_edge(&mut edges, v, v + 1, true);
            }
            if r + 1 < rows {
                push_edge(&mut edges, v, v + cols, true);
            }
        }
    }
    CsrGraph::build(rows * cols, &edges)
}

/// Every ordered pair of distinct nodes.
#[must_use]
pub fn complete(n: NodeId) -> CsrGraph {
    let mut edges = Vec::new();
    for a in 0..n {
        for b in 0..n {
            if a != b {
                edges.push((a, b));
            }
        }
    }
    CsrGraph::build(n, &edges)
}

/// Directed G(n, p): each ordered pair of distinct nodes is an edge with
/// probability `p`. Deterministic for a given `seed`.
#[must_use]
pub fn erdos_renyi(n: NodeId, p: f64, seed: u64) -> CsrGraph {
    let mut rng = StdRng::seed_from_u64(seed);
    let p = p.clamp(0.0, 1.0);
    let mut edges = Vec::new();
    for a in 0..n {
        for b in 0..n {
            if a != b && rng.gen_bool(p) {
                edges.push((a, b));
            }
        }
    }
    CsrGraph::build(n, &edges)
}
