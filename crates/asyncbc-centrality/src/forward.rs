//! Forward phase: concurrent construction of the shortest-path DAG.
//!
//! Every worker pops a node `A` and relaxes each out-edge `A -> B` under the
//! pair lock of `A` and `B`. Exactly one rule applies per edge, decided from
//! `ADist`, `BDist` and the edge level `L`:
//!
//! | rule              | condition                               |
//! |-------------------|-----------------------------------------|
//! | new shortest path | `BDist - ADist > 1`                     |
//! | sigma refresh     | `L == ADist && BDist == ADist + 1`      |
//! | first validation  | `BDist == ADist + 1 && L != ADist`      |
//! | no action         | otherwise                               |
//!
//! A new shortest path to a node that already had predecessors invalidates
//! every in-edge that no longer lies on a shortest path (correction).

use asyncbc_core::graph::{EdgeId, NodeId};
use asyncbc_core::worklist::Pusher;
use tracing::debug;

use crate::counters::Action;
use crate::driver::EngineState;
use crate::record::{PairGuard, UNVALIDATED};

/// Follow-up work decided while the pair lock was held.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Followup {
    enqueue: bool,
    correct: bool,
}

/// Process one frontier node: clear its queued flag and relax its out-edges.
pub(crate) fn relax_node(state: &EngineState<'_>, a: NodeId, pusher: &Pusher<'_, NodeId>) {
    state.nodes.lock(a).queued = false;

    for edge in state.graph.outgoing_edges(a) {
        let b = state.graph.edge_dst(edge);
        if b == a {
            continue;
        }

        let followup = relax_edge(state, a, b, edge);
        if followup.enqueue {
            pusher.push(b);
        }
        if followup.correct {
            correct_in_edges(state, b);
        }
    }
}

fn relax_edge(state: &EngineState<'_>, a: NodeId, b: NodeId, edge: EdgeId) -> Followup {
    let Some(mut pair) = state.nodes.lock_pair(a, b) else {
        return Followup::default();
    };

    let a_dist = u64::from(pair.a().distance);
    let b_dist = u64::from(pair.b().distance);
    let level = state.edges.get(edge, &pair).level;

    if b_dist > a_dist + 1 {
        return new_shortest_path(state, &mut pair, edge);
    }

    if b_dist == a_dist + 1 {
        if u64::from(level) == a_dist {
            return sigma_refresh(state, &mut pair, edge);
        }
        return first_validation(state, &mut pair, edge);
    }

    state.counters.record(Action::NoAction);
    Followup::default()
}

fn new_shortest_path(state: &EngineState<'_>, pair: &mut PairGuard<'_>, edge: EdgeId) -> Followup {
    let (a_id, _) = pair.ids();
    let (a, b) = pair.both_mut();

    let a_dist = a.distance;
    let a_sigma = a.sigma;
    let had_preds = !b.preds.is_empty();

    b.preds.clear();
    b.preds.push(a_id);
    b.distance = a_dist + 1;
    b.nsuccs = 0;
    b.sigma = a_sigma;
    a.nsuccs += 1;
    let enqueue = !std::mem::replace(&mut b.queued, true);

    state.edges.validate(edge, pair, a_sigma, a_dist);
    state.counters.record(Action::ShortestPath);
    state.counters.observe_distance(a_dist + 1);

    Followup {
        enqueue,
        correct: had_preds,
    }
}

fn sigma_refresh(state: &EngineState<'_>, pair: &mut PairGuard<'_>, edge: EdgeId) -> Followup {
    state.counters.record(Action::SigmaRefreshChecked);

    let a_sigma = pair.a().sigma;
    let seen = state.edges.get(edge, pair).val;
    let Some(diff) = a_sigma.checked_sub(seen).filter(|&d| d > 0) else {
        return Followup::default();
    };

    let b = pair.b_mut();
    if b.add_sigma(diff) {
        note_saturation(state, pair.ids().1);
    }
    let b = pair.b_mut();
    let enqueue = b.nsuccs > 0 && !std::mem::replace(&mut b.queued, true);

    state.edges.set_val(edge, pair, a_sigma);
    state.counters.record(Action::SigmaRefreshApplied);

    Followup {
        enqueue,
        correct: false,
    }
}

fn first_validation(state: &EngineState<'_>, pair: &mut PairGuard<'_>, edge: EdgeId) -> Followup {
    let (a_id, b_id) = pair.ids();
    let (a, b) = pair.both_mut();

    let a_dist = a.distance;
    let a_sigma = a.sigma;

    b.preds.push(a_id);
    let saturated = b.add_sigma(a_sigma);
    a.nsuccs += 1;
    let enqueue = b.nsuccs > 0 && !std::mem::replace(&mut b.queued, true);

    if saturated {
        note_saturation(state, b_id);
    }
    state.edges.validate(edge, pair, a_sigma, a_dist);
    state.counters.record(Action::FirstValidation);

    Followup {
        enqueue,
        correct: false,
    }
}

/// Invalidate each in-edge `(U, B)` whose source no longer sits one level
/// above `b`, releasing the successor slot it held on `U`.
pub(crate) fn correct_in_edges(state: &EngineState<'_>, b: NodeId) {
    for in_edge in state.graph.incoming_edges(b) {
        let Some(mut pair) = state.nodes.lock_pair(in_edge.src, b) else {
            continue;
        };
        state.counters.record(Action::CorrectionChecked);

        let u_dist = pair.a().distance;
        if u_dist < pair.b().distance {
            continue;
        }
        if !state.edges.get(in_edge.edge, &pair).is_validated() {
            continue;
        }

        let old_level = state.edges.invalidate(in_edge.edge, &pair);
        debug_assert_ne!(old_level, UNVALIDATED);
        if old_level == u_dist {
            let u = pair.a_mut();
            debug_assert!(u.nsuccs > 0, "successor count underflow on node {}", in_edge.src);
            u.nsuccs = u.nsuccs.saturating_sub(1);
        }
        state.counters.record(Action::CorrectionApplied);
    }
}

fn note_saturation(state: &EngineState<'_>, node: NodeId) {
    state.counters.record_saturation();
    debug!(node, "shortest-path count saturated at u64::MAX");
}
