//! Compressed sparse row storage with a mirrored in-edge view.
//!
//! Out-edges of node `v` occupy the contiguous id range
//! `out_offsets[v]..out_offsets[v + 1]`, kept in input order. The in-edge
//! index stores, per destination, `(src, edge_id)` pairs in ascending edge
//! id order.

use std::collections::HashSet;
use std::ops::Range;

use petgraph::graph::DiGraph;

use crate::error::GraphError;

pub type NodeId = u32;
pub type EdgeId = usize;

/// One entry of the incoming adjacency: the edge `src -> (this node)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InEdge {
    pub src: NodeId,
    pub edge: EdgeId,
}

#[derive(Debug, Clone)]
pub struct CsrGraph {
    out_offsets: Vec<usize>,
    out_dst: Vec<NodeId>,
    edge_src: Vec<NodeId>,
    in_offsets: Vec<usize>,
    in_edges: Vec<InEdge>,
    fingerprint: String,
}

impl CsrGraph {
    /// Build a graph over nodes `0..node_count` from `(src, dst)` pairs.
    ///
    /// Self-loops and parallel edges are kept as given.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::TooManyNodes`] if `node_count` does not fit a
    /// [`NodeId`], or [`GraphError::EndpointOutOfRange`] for an edge that
    /// names a node outside the graph.
    pub fn from_edges(node_count: usize, edges: &[(NodeId, NodeId)]) -> Result<Self, GraphError> {
        let n = NodeId::try_from(node_count)
            .map_err(|_| GraphError::TooManyNodes(node_count as u64))?;

        if let Some(&(src, dst)) = edges.iter().find(|(s, d)| *s >= n || *d >= n) {
            return Err(GraphError::EndpointOutOfRange {
                src: u64::from(src),
                dst: u64::from(dst),
                node_count: u64::from(n),
            });
        }

        Ok(Self::build(n, edges))
    }

    /// Infallible constructor for callers that produce in-range edges.
    pub(crate) fn build(node_count: NodeId, edges: &[(NodeId, NodeId)]) -> Self {
        let n = node_count as usize;
        let m = edges.len();

        // Stable counting sort by source keeps per-node input order.
        let mut out_offsets = vec![0_usize; n + 1];
        for &(src, _) in edges {
            out_offsets[src as usize + 1] += 1;
        }
        for v in 0..n {
            out_offsets[v + 1] += out_offsets[v];
        }

        let mut cursor = out_offsets.clone();
        let mut out_dst = vec![0; m];
        let mut edge_src = vec![0; m];
        for &(src, dst) in edges {
            let slot = cursor[src as usize];
            out_dst[slot] = dst;
            edge_src[slot] = src;
            cursor[src as usize] += 1;
        }

        let mut in_offsets = vec![0_usize; n + 1];
        for &dst in &out_dst {
            in_offsets[dst as usize + 1] += 1;
        }
        for v in 0..n {
            in_offsets[v + 1] += in_offsets[v];
        }

        let mut cursor = in_offsets.clone();
        let mut in_edges = vec![InEdge { src: 0, edge: 0 }; m];
        for (edge, (&src, &dst)) in edge_src.iter().zip(&out_dst).enumerate() {
            in_edges[cursor[dst as usize]] = InEdge { src, edge };
            cursor[dst as usize] += 1;
        }

        let fingerprint = compute_fingerprint(node_count, &edge_src, &out_dst);

        Self {
            out_offsets,
            out_dst,
            edge_src,
            in_offsets,
            in_edges,
            fingerprint,
        }
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.out_offsets.len() - 1
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.out_dst.len()
    }

    /// Ids of all nodes, ascending.
    #[must_use]
    pub fn nodes(&self) -> Range<NodeId> {
        0..self.node_count() as NodeId
    }

    /// Edge ids of the out-edges of `node`, in input order.
    #[must_use]
    pub fn outgoing_edges(&self, node: NodeId) -> Range<EdgeId> {
        let v = node as usize;
        self.out_offsets[v]..self.out_offsets[v + 1]
    }

    /// In-edges of `node`, each naming its source and the shared edge id.
    #[must_use]
    pub fn incoming_edges(&self, node: NodeId) -> &[InEdge] {
        let v = node as usize;
        &self.in_edges[self.in_offsets[v]..self.in_offsets[v + 1]]
    }

    #[must_use]
    pub fn edge_dst(&self, edge: EdgeId) -> NodeId {
        self.out_dst[edge]
    }

    #[must_use]
    pub fn edge_src(&self, edge: EdgeId) -> NodeId {
        self.edge_src[edge]
    }

    #[must_use]
    pub fn edge_endpoints(&self, edge: EdgeId) -> (NodeId, NodeId) {
        (self.edge_src[edge], self.out_dst[edge])
    }

    #[must_use]
    pub fn out_degree(&self, node: NodeId) -> usize {
        self.outgoing_edges(node).len()
    }

    #[must_use]
    pub fn in_degree(&self, node: NodeId) -> usize {
        self.incoming_edges(node).len()
    }

    /// Destinations of the out-edges of `node`.
    pub fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.outgoing_edges(node).map(|e| self.out_dst[e])
    }

    /// All edges as `(src, dst)` in edge id order.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.edge_src.iter().copied().zip(self.out_dst.iter().copied())
    }

    /// BLAKE3 digest of node count and edge list, `blake3:<hex>`.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Add the reverse of every non-self-loop edge whose reverse is missing.
    #[must_use]
    pub fn symmetrized(&self) -> Self {
        let present: HashSet<(NodeId, NodeId)> = self.edges().collect();
        let mut edges: Vec<(NodeId, NodeId)> = self.edges().collect();
        let mut added = HashSet::new();
        for (src, dst) in self.edges() {
            if src != dst && !present.contains(&(dst, src)) && added.insert((dst, src)) {
                edges.push((dst, src));
            }
        }
        Self::build(self.node_count() as NodeId, &edges)
    }

    /// Copy the topology into a petgraph `DiGraph` whose node weights are
    /// the original ids and whose node indices coincide with them.
    #[must_use]
    pub fn to_petgraph(&self) -> DiGraph<NodeId, ()> {
        let mut graph = DiGraph::with_capacity(self.node_count(), self.edge_count());
        for v in self.nodes() {
            graph.add_node(v);
        }
        for (src, dst) in self.edges() {
            graph.add_edge(src.into(), dst.into(), ());
        }
        graph
    }
}

fn compute_fingerprint(node_count: NodeId, edge_src: &[NodeId], out_dst: &[NodeId]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&u64::from(node_count).to_le_bytes());
    for (src, dst) in edge_src.iter().zip(out_dst) {
        hasher.update(&src.to_le_bytes());
        hasher.update(&dst.to_le_bytes());
    }
    format!("blake3:{}", hasher.finalize())
}
