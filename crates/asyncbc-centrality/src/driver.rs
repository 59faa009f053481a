//! Source driver: sequences forward, leaf scan and backward per source.
//!
//! ```text
//! for s in sources (skipping nodes with no out-edges):
//!     seed s                      distance 0, sigma 1, queued
//!     forward  → quiescence       DAG in node/edge records
//!     find_leaves                 nsuccs == 0 && reached
//!     snapshot s.bc
//!     backward → quiescence       delta into bc
//!     restore s.bc
//!     [consistency check]
//!     reset_transient             bulk, everything but bc
//! ```

use std::ops::Range;
use std::time::Instant;

use asyncbc_core::config::EngineConfig;
use asyncbc_core::graph::{CsrGraph, EdgeId, NodeId};
use asyncbc_core::timing::timed;
use asyncbc_core::worklist::{WorkerPool, WorklistOrder};
use serde::Serialize;
use tracing::{Level, debug, info, instrument};

use crate::backward;
use crate::counters::{ActionCounters, ActionReport};
use crate::error::CentralityError;
use crate::forward;
use crate::record::{EdgeSnapshot, EdgeStore, NodeSnapshot, NodeStore};
use crate::report::CentralityScores;

/// Shared state every phase operates on.
pub(crate) struct EngineState<'g> {
    pub(crate) graph: &'g CsrGraph,
    pub(crate) nodes: NodeStore,
    pub(crate) edges: EdgeStore,
    pub(crate) counters: ActionCounters,
    pub(crate) pool: WorkerPool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    pub threads: usize,
    pub order: WorklistOrder,
    pub count_actions: bool,
    /// Verify `nsuccs == 0` and a finite `delta` on every reached node after
    /// each backward pass.
    pub check_consistency: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for EngineOptions {
    fn from(config: &EngineConfig) -> Self {
        Self {
            threads: config.threads,
            order: config.worklist_order,
            count_actions: config.count_actions,
            check_consistency: config.check_consistency || cfg!(debug_assertions),
        }
    }
}

impl EngineOptions {
    #[must_use]
    pub fn with_threads(threads: usize) -> Self {
        Self {
            threads,
            ..Self::default()
        }
    }
}

/// `count` sources starting at `start`; `count == 0` means through the last
/// node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SourceRange {
    pub start: NodeId,
    pub count: usize,
}

impl SourceRange {
    #[must_use]
    pub const fn all() -> Self {
        Self { start: 0, count: 0 }
    }

    #[must_use]
    pub const fn single(source: NodeId) -> Self {
        Self {
            start: source,
            count: 1,
        }
    }

    /// Resolve against a graph of `node_count` nodes.
    ///
    /// An empty graph accepts only the default range and yields no sources.
    ///
    /// # Errors
    ///
    /// Returns [`CentralityError::SourceOutOfRange`] if `start` is not a node,
    /// or [`CentralityError::RangePastEnd`] if `start + count` exceeds the
    /// node count.
    pub fn resolve(self, node_count: usize) -> Result<Range<NodeId>, CentralityError> {
        let start = self.start as usize;
        if node_count == 0 && start == 0 && self.count == 0 {
            return Ok(0..0);
        }
        if start >= node_count {
            return Err(CentralityError::SourceOutOfRange {
                start: self.start,
                node_count,
            });
        }
        if self.count == 0 {
            return Ok(self.start..node_count as NodeId);
        }
        match start.checked_add(self.count) {
            Some(end) if end <= node_count => Ok(self.start..end as NodeId),
            _ => Err(CentralityError::RangePastEnd {
                start: self.start,
                count: self.count,
                node_count,
            }),
        }
    }
}

/// Outcome of one [`BetweennessEngine::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub range: SourceRange,
    pub sources_processed: usize,
    /// Sources with no out-edges contribute nothing and are not run.
    pub sources_skipped: usize,
    /// Nodes reached, summed over processed sources.
    pub reached: usize,
    pub leaves: usize,
    pub forward_items: usize,
    pub elapsed_ms: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counters: Option<ActionReport>,
}

#[derive(Debug, Clone, Copy, Default)]
struct SourceOutcome {
    forward_items: usize,
    leaves: usize,
    reached: usize,
}

/// Asynchronous multi-source betweenness engine over one graph.
///
/// Node and edge records are allocated once and reused for every source;
/// `bc` accumulates across [`run`](Self::run) calls until
/// [`clear_scores`](Self::clear_scores).
pub struct BetweennessEngine<'g> {
    state: EngineState<'g>,
    options: EngineOptions,
}

impl<'g> BetweennessEngine<'g> {
    /// Allocate records for `graph` and start the worker pool.
    ///
    /// # Errors
    ///
    /// Returns [`CentralityError::Pool`] for zero threads or if the bulk
    /// thread pool cannot be built.
    pub fn new(graph: &'g CsrGraph, options: EngineOptions) -> Result<Self, CentralityError> {
        let pool = WorkerPool::new(options.threads, options.order)?;
        Ok(Self {
            state: EngineState {
                graph,
                nodes: NodeStore::new(graph.node_count()),
                edges: EdgeStore::new(graph.edge_count()),
                counters: ActionCounters::new(options.count_actions),
                pool,
            },
            options,
        })
    }

    #[must_use]
    pub const fn options(&self) -> &EngineOptions {
        &self.options
    }

    #[must_use]
    pub const fn graph(&self) -> &'g CsrGraph {
        self.state.graph
    }

    /// Accumulate the contribution of every source in `range`.
    ///
    /// # Errors
    ///
    /// Returns a range error before any work if `range` does not fit the
    /// graph, or [`CentralityError::Inconsistent`] if the consistency check
    /// is enabled and fails.
    #[instrument(skip(self), fields(threads = self.options.threads, order = %self.options.order))]
    pub fn run(&mut self, range: SourceRange) -> Result<RunSummary, CentralityError> {
        let sources = range.resolve(self.state.graph.node_count())?;
        let started = Instant::now();
        info!(
            start = sources.start,
            end = sources.end,
            nodes = self.state.graph.node_count(),
            edges = self.state.graph.edge_count(),
            "running sources"
        );

        let mut summary = RunSummary {
            range,
            ..RunSummary::default()
        };
        for source in sources {
            if self.state.graph.out_degree(source) == 0 {
                summary.sources_skipped += 1;
                continue;
            }
            let outcome = self.process_source(source)?;
            summary.sources_processed += 1;
            summary.reached += outcome.reached;
            summary.leaves += outcome.leaves;
            summary.forward_items += outcome.forward_items;
        }

        summary.elapsed_ms = started.elapsed().as_millis();
        if self.state.counters.is_enabled() {
            summary.counters = Some(self.state.counters.report());
        }
        info!(
            processed = summary.sources_processed,
            skipped = summary.sources_skipped,
            elapsed_ms = summary.elapsed_ms,
            "run complete"
        );
        Ok(summary)
    }

    fn process_source(&self, source: NodeId) -> Result<SourceOutcome, CentralityError> {
        self.seed_source(source)?;
        let forward_items = timed("forward", || self.forward(source));
        let leaves = timed("leaf_scan", || self.find_leaves());
        let leaf_count = leaves.len();
        // The deepest reached node has no successors, so it is among the leaves.
        let max_distance = if tracing::enabled!(Level::DEBUG) {
            leaves
                .iter()
                .map(|&v| self.state.nodes.lock(v).distance)
                .max()
        } else {
            None
        };

        let saved_bc = self.state.nodes.lock(source).bc;
        let reached = timed("backward", || self.backward(source, leaves));
        self.state.nodes.lock(source).bc = saved_bc;

        let checked = if self.options.check_consistency {
            self.check_consistency(source)
        } else {
            Ok(())
        };
        timed("reset", || self.reset_transient());
        checked?;

        debug!(source, reached, leaves = leaf_count, ?max_distance, "source done");
        Ok(SourceOutcome {
            forward_items,
            leaves: leaf_count,
            reached,
        })
    }

    /// Mark `source` as the DAG root: distance 0, one path, queued.
    ///
    /// # Errors
    ///
    /// Returns [`CentralityError::SourceOutOfRange`] if `source` is not a node.
    pub fn seed_source(&self, source: NodeId) -> Result<(), CentralityError> {
        let node_count = self.state.graph.node_count();
        if source as usize >= node_count {
            return Err(CentralityError::SourceOutOfRange {
                start: source,
                node_count,
            });
        }
        let mut root = self.state.nodes.lock(source);
        root.distance = 0;
        root.sigma = 1;
        root.queued = true;
        Ok(())
    }

    /// Build the shortest-path DAG from a seeded `source`. Returns the number
    /// of frontier items processed.
    pub fn forward(&self, source: NodeId) -> usize {
        let state = &self.state;
        state
            .pool
            .run_to_quiescence([source], |node, pusher| forward::relax_node(state, node, pusher))
    }

    #[must_use]
    pub fn find_leaves(&self) -> Vec<NodeId> {
        backward::find_leaves(&self.state)
    }

    /// Accumulate dependencies from `leaves` up to `source`. Returns the
    /// number of nodes settled.
    pub fn backward(&self, source: NodeId, leaves: Vec<NodeId>) -> usize {
        let state = &self.state;
        state.pool.run_to_quiescence(leaves, |node, pusher| {
            backward::settle_node(state, source, node, pusher);
        })
    }

    /// Reset every node and edge field except `bc`.
    pub fn reset_transient(&self) {
        let state = &self.state;
        state
            .pool
            .apply_bulk(0..state.nodes.len(), |v| state.nodes.lock(v as NodeId).reset_transient());
        state.pool.apply_bulk(0..state.edges.len(), |e| state.edges.reset(e));
    }

    fn check_consistency(&self, source: NodeId) -> Result<(), CentralityError> {
        let state = &self.state;
        let bad = state.pool.collect_bulk(0..state.nodes.len(), |v| {
            let node = state.nodes.lock(v as NodeId);
            node.is_reached() && (node.nsuccs != 0 || !node.delta.is_finite())
        });
        match bad.first() {
            None => Ok(()),
            Some(&v) => {
                let node = state.nodes.snapshot(v as NodeId);
                Err(CentralityError::Inconsistent {
                    source_node: source,
                    node: v as NodeId,
                    nsuccs: node.nsuccs,
                    delta: node.delta,
                })
            }
        }
    }

    #[must_use]
    pub fn node_snapshot(&self, node: NodeId) -> NodeSnapshot {
        self.state.nodes.snapshot(node)
    }

    #[must_use]
    pub fn edge_snapshot(&self, edge: EdgeId) -> EdgeSnapshot {
        self.state.edges.snapshot(edge)
    }

    #[must_use]
    pub fn scores(&self) -> CentralityScores {
        let nodes = &self.state.nodes;
        CentralityScores::new((0..nodes.len()).map(|v| nodes.lock(v as NodeId).bc).collect())
    }

    /// Zero every `bc` and the action counters.
    pub fn clear_scores(&mut self) {
        let state = &self.state;
        state
            .pool
            .apply_bulk(0..state.nodes.len(), |v| state.nodes.lock(v as NodeId).bc = 0.0);
        state.counters.clear();
    }

    #[must_use]
    pub fn counters(&self) -> ActionReport {
        self.state.counters.report()
    }
}
