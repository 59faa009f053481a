//! Per-node and per-edge state arenas.
//!
//! # Locking
//!
//! Each node owns a `parking_lot::Mutex` over its [`NodeState`]. Edges carry
//! no lock: an edge record may only be read or written while both endpoint
//! locks are held, and the accessors on [`EdgeStore`] take the
//! [`PairGuard`] returned by [`NodeStore::lock_pair`] as proof.
//!
//! `lock_pair` always acquires the lower node id first, so any two threads
//! locking overlapping pairs agree on the order and cannot deadlock.
//!
//! Edge fields are atomics only so that the arena is `Sync`; every access
//! happens under the pair of node mutexes, which provide the ordering, hence
//! `Ordering::Relaxed` throughout.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use asyncbc_core::graph::{EdgeId, NodeId};
use parking_lot::{Mutex, MutexGuard};
use serde::Serialize;

/// Distance of a node not reached from the current source.
pub const UNREACHED: u32 = u32::MAX;

/// Level of an edge that is not part of the current shortest-path DAG.
pub const UNVALIDATED: u32 = u32::MAX;

/// Mutable betweenness state of one node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeState {
    /// Hop count from the current source, or [`UNREACHED`].
    pub distance: u32,
    /// Number of shortest paths from the current source; saturates.
    pub sigma: u64,
    pub delta: f64,
    /// Accumulated score across all processed sources.
    pub bc: f64,
    /// DAG successors not yet resolved by the backward pass.
    pub nsuccs: u32,
    pub preds: Vec<NodeId>,
    pub queued: bool,
}

/// Point-in-time copy of a node, for tests and tooling.
pub type NodeSnapshot = NodeState;

impl Default for NodeState {
    fn default() -> Self {
        Self {
            distance: UNREACHED,
            sigma: 0,
            delta: 0.0,
            bc: 0.0,
            nsuccs: 0,
            preds: Vec::new(),
            queued: false,
        }
    }
}

impl NodeState {
    #[must_use]
    pub const fn is_reached(&self) -> bool {
        self.distance != UNREACHED
    }

    /// Clear everything except `bc`.
    pub fn reset_transient(&mut self) {
        self.distance = UNREACHED;
        self.sigma = 0;
        self.delta = 0.0;
        self.nsuccs = 0;
        self.preds.clear();
        self.queued = false;
    }

    /// Add `paths` to `sigma`, capping at `u64::MAX`. Returns `true` if the
    /// sum saturated.
    pub fn add_sigma(&mut self, paths: u64) -> bool {
        match self.sigma.checked_add(paths) {
            Some(sum) => {
                self.sigma = sum;
                false
            }
            None => {
                self.sigma = u64::MAX;
                true
            }
        }
    }
}

/// Both endpoint locks of a node pair, held in ascending id order.
///
/// [`PairGuard::a`] and [`PairGuard::b`] refer to the nodes in the order
/// they were passed to [`NodeStore::lock_pair`], independent of lock order.
pub struct PairGuard<'a> {
    a_id: NodeId,
    b_id: NodeId,
    a: MutexGuard<'a, NodeState>,
    b: MutexGuard<'a, NodeState>,
}

impl PairGuard<'_> {
    #[must_use]
    pub const fn ids(&self) -> (NodeId, NodeId) {
        (self.a_id, self.b_id)
    }

    #[must_use]
    pub fn a(&self) -> &NodeState {
        &self.a
    }

    #[must_use]
    pub fn b(&self) -> &NodeState {
        &self.b
    }

    pub fn a_mut(&mut self) -> &mut NodeState {
        &mut self.a
    }

    pub fn b_mut(&mut self) -> &mut NodeState {
        &mut self.b
    }

    /// Mutable access to both nodes at once.
    pub fn both_mut(&mut self) -> (&mut NodeState, &mut NodeState) {
        (&mut *self.a, &mut *self.b)
    }
}

#[derive(Debug)]
pub struct NodeStore {
    nodes: Vec<Mutex<NodeState>>,
}

impl NodeStore {
    #[must_use]
    pub fn new(node_count: usize) -> Self {
        Self {
            nodes: (0..node_count)
                .map(|_| Mutex::new(NodeState::default()))
                .collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Lock a single node.
    pub fn lock(&self, node: NodeId) -> MutexGuard<'_, NodeState> {
        self.nodes[node as usize].lock()
    }

    /// Lock `a` and `b` in ascending id order. Returns `None` for `a == b`,
    /// which would otherwise self-deadlock.
    #[must_use]
    pub fn lock_pair(&self, a: NodeId, b: NodeId) -> Option<PairGuard<'_>> {
        if a == b {
            return None;
        }
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let lo_guard = self.nodes[lo as usize].lock();
        let hi_guard = self.nodes[hi as usize].lock();
        let (a_guard, b_guard) = if a < b {
            (lo_guard, hi_guard)
        } else {
            (hi_guard, lo_guard)
        };
        Some(PairGuard {
            a_id: a,
            b_id: b,
            a: a_guard,
            b: b_guard,
        })
    }

    #[must_use]
    pub fn snapshot(&self, node: NodeId) -> NodeSnapshot {
        self.lock(node).clone()
    }
}

#[derive(Debug)]
struct EdgeRecord {
    val: AtomicU64,
    level: AtomicU32,
}

impl Default for EdgeRecord {
    fn default() -> Self {
        Self {
            val: AtomicU64::new(0),
            level: AtomicU32::new(UNVALIDATED),
        }
    }
}

/// Validation snapshot of one edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EdgeSnapshot {
    /// Source endpoint's `sigma` at last validation.
    pub val: u64,
    /// Source endpoint's `distance` at last validation, or [`UNVALIDATED`].
    pub level: u32,
}

impl EdgeSnapshot {
    #[must_use]
    pub const fn is_validated(&self) -> bool {
        self.level != UNVALIDATED
    }
}

#[derive(Debug)]
pub struct EdgeStore {
    edges: Vec<EdgeRecord>,
}

impl EdgeStore {
    #[must_use]
    pub fn new(edge_count: usize) -> Self {
        Self {
            edges: (0..edge_count).map(|_| EdgeRecord::default()).collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    #[must_use]
    pub fn get(&self, edge: EdgeId, _held: &PairGuard<'_>) -> EdgeSnapshot {
        self.load(edge)
    }

    /// Record `val` and `level` as the edge's validation snapshot.
    pub fn validate(&self, edge: EdgeId, _held: &PairGuard<'_>, val: u64, level: u32) {
        let record = &self.edges[edge];
        record.val.store(val, Ordering::Relaxed);
        record.level.store(level, Ordering::Relaxed);
    }

    pub fn set_val(&self, edge: EdgeId, _held: &PairGuard<'_>, val: u64) {
        self.edges[edge].val.store(val, Ordering::Relaxed);
    }

    /// Mark the edge [`UNVALIDATED`], returning the level it had.
    pub fn invalidate(&self, edge: EdgeId, _held: &PairGuard<'_>) -> u32 {
        self.edges[edge].level.swap(UNVALIDATED, Ordering::Relaxed)
    }

    /// Reset outside any pair lock. Only valid while no phase is running.
    pub(crate) fn reset(&self, edge: EdgeId) {
        let record = &self.edges[edge];
        record.val.store(0, Ordering::Relaxed);
        record.level.store(UNVALIDATED, Ordering::Relaxed);
    }

    /// Read outside any pair lock. Only meaningful between phases.
    #[must_use]
    pub fn snapshot(&self, edge: EdgeId) -> EdgeSnapshot {
        self.load(edge)
    }

    fn load(&self, edge: EdgeId) -> EdgeSnapshot {
        let record = &self.edges[edge];
        EdgeSnapshot {
            val: record.val.load(Ordering::Relaxed),
            level: record.level.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_node_is_unreached() {
        let node = NodeState::default();
        assert!(!node.is_reached());
        assert_eq!(node.sigma, 0);
        assert!(node.preds.is_empty());
    }

    #[test]
    fn reset_keeps_bc() {
        let mut node = NodeState {
            distance: 3,
            sigma: 9,
            delta: 1.5,
            bc: 4.25,
            nsuccs: 2,
            preds: vec![1, 2],
            queued: true,
        };
        node.reset_transient();
        assert_eq!(
            node,
            NodeState {
                bc: 4.25,
                ..NodeState::default()
            }
        );
    }

    #[test]
    fn sigma_saturates() {
        let mut node = NodeState {
            sigma: u64::MAX - 1,
            ..NodeState::default()
        };
        assert!(!node.add_sigma(1));
        assert_eq!(node.sigma, u64::MAX);
        assert!(node.add_sigma(5));
        assert_eq!(node.sigma, u64::MAX);
    }

    #[test]
    fn lock_pair_refuses_self_pair() {
        let store = NodeStore::new(3);
        assert!(store.lock_pair(1, 1).is_none());
    }

    #[test]
    fn lock_pair_maps_caller_order() {
        let store = NodeStore::new(4);
        {
            let mut pair = store.lock_pair(3, 1).expect("distinct nodes");
            assert_eq!(pair.ids(), (3, 1));
            pair.a_mut().nsuccs = 30;
            pair.b_mut().nsuccs = 10;
        }
        assert_eq!(store.snapshot(3).nsuccs, 30);
        assert_eq!(store.snapshot(1).nsuccs, 10);
    }

    #[test]
    fn opposite_pair_orders_do_not_deadlock() {
        let store = NodeStore::new(2);
        std::thread::scope(|scope| {
            scope.spawn(|| {
                for _ in 0..10_000 {
                    let mut pair = store.lock_pair(0, 1).expect("pair");
                    pair.a_mut().sigma += 1;
                }
            });
            scope.spawn(|| {
                for _ in 0..10_000 {
                    let mut pair = store.lock_pair(1, 0).expect("pair");
                    pair.b_mut().sigma += 1;
                }
            });
        });
        assert_eq!(store.snapshot(0).sigma, 20_000);
    }

    #[test]
    fn edge_invalidate_returns_old_level() {
        let nodes = NodeStore::new(2);
        let edges = EdgeStore::new(1);
        assert!(!edges.snapshot(0).is_validated());

        let pair = nodes.lock_pair(0, 1).expect("pair");
        edges.validate(0, &pair, 7, 2);
        assert_eq!(edges.get(0, &pair), EdgeSnapshot { val: 7, level: 2 });
        edges.set_val(0, &pair, 9);
        assert_eq!(edges.invalidate(0, &pair), 2);
        drop(pair);

        assert_eq!(
            edges.snapshot(0),
            EdgeSnapshot {
                val: 9,
                level: UNVALIDATED
            }
        );
        edges.reset(0);
        assert_eq!(edges.snapshot(0).val, 0);
    }
}
