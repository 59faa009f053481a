use serde::Serialize;

use crate::graph::csr::CsrGraph;

/// Summary counts logged after load and included in JSON output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub self_loops: usize,
    pub max_out_degree: usize,
    pub max_in_degree: usize,
    /// Nodes with no out-edges. These are skipped as sources.
    pub sinks: usize,
    /// Nodes with neither in- nor out-edges.
    pub isolated: usize,
    pub fingerprint: String,
}

impl GraphStats {
    #[must_use]
    pub fn from_graph(graph: &CsrGraph) -> Self {
        let mut stats = Self {
            node_count: graph.node_count(),
            edge_count: graph.edge_count(),
            self_loops: graph.edges().filter(|(src, dst)| src == dst).count(),
            max_out_degree: 0,
            max_in_degree: 0,
            sinks: 0,
            isolated: 0,
            fingerprint: graph.fingerprint().to_string(),
        };

        for v in graph.nodes() {
            let out = graph.out_degree(v);
            let inc = graph.in_degree(v);
            stats.max_out_degree = stats.max_out_degree.max(out);
            stats.max_in_degree = stats.max_in_degree.max(inc);
            if out == 0 {
                stats.sinks += 1;
                if inc == 0 {
                    stats.isolated += 1;
                }
            }
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_sinks_loops_and_isolated_nodes() {
        // 0 → 1, 0 → 2, 2 → 2, node 3 isolated.
        let g = CsrGraph::from_edges(4, &[(0, 1), (0, 2), (2, 2)]).expect("valid");
        let stats = GraphStats::from_graph(&g);
        assert_eq!(stats.node_count, 4);
        assert_eq!(stats.edge_count, 3);
        assert_eq!(stats.self_loops, 1);
        assert_eq!(stats.max_out_degree, 2);
        assert_eq!(stats.max_in_degree, 1);
        assert_eq!(stats.sinks, 2);
        assert_eq!(stats.isolated, 1);
        assert_eq!(stats.fingerprint, g.fingerprint());
    }
}
