//! Backward phase: dependency accumulation from the DAG leaves to the root.
//!
//! A node becomes ready once every DAG successor has pushed its dependency
//! term into it (`nsuccs` reaching zero). The last successor to finish is the
//! one that enqueues it, so each reached node is processed exactly once.

use asyncbc_core::graph::NodeId;
use asyncbc_core::worklist::Pusher;

use crate::counters::Action;
use crate::driver::EngineState;

/// Every reached node with no unresolved successors, ascending.
pub(crate) fn find_leaves(state: &EngineState<'_>) -> Vec<NodeId> {
    let leaves: Vec<NodeId> = state
        .pool
        .collect_bulk(0..state.nodes.len(), |v| {
            let node = state.nodes.lock(v as NodeId);
            node.nsuccs == 0 && node.is_reached()
        })
        .into_iter()
        .map(|v| v as NodeId)
        .collect();
    state.counters.record_n(Action::Leaf, leaves.len() as u64);
    leaves
}

/// Settle one ready node and credit its predecessors.
pub(crate) fn settle_node(
    state: &EngineState<'_>,
    source: NodeId,
    node: NodeId,
    pusher: &Pusher<'_, NodeId>,
) {
    let (delta, sigma, preds) = {
        let mut n = state.nodes.lock(node);
        if n.nsuccs != 0 {
            return;
        }
        if node != source {
            n.bc += n.delta;
        }
        (n.delta, n.sigma, n.preds.clone())
    };

    let share = (1.0 + delta) / sigma as f64;
    for pred in preds {
        let ready = {
            let mut p = state.nodes.lock(pred);
            p.delta += p.sigma as f64 * share;
            debug_assert!(p.nsuccs > 0, "successor count underflow on node {pred}");
            let before = p.nsuccs;
            p.nsuccs = before.saturating_sub(1);
            before == 1
        };
        if ready {
            pusher.push(pred);
        }
    }
}
