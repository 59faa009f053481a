//! Immutable graph store for the centrality engine.
//!
//! # Overview
//!
//! Topology is held in compressed sparse row form with a mirrored in-edge
//! index. Per-edge payloads live outside the graph (the engine keeps its own
//! record arenas); an in-edge carries the [`EdgeId`] of the out-edge it
//! mirrors, so both adjacency directions address the same payload slot.
//!
//! ## Pipeline
//!
//! ```text
//! graph file (.gr binary | text edge list)
//!        ↓  load::load_graph()
//! CsrGraph (out-CSR + in-CSR, fingerprint)
//!        ↓  stats::GraphStats::from_graph()
//! GraphStats (counts, degrees, self-loops, sinks)
//! ```
//!
//! `generate` builds small synthetic topologies for tests and benchmarks.

pub mod csr;
pub mod generate;
pub mod load;
pub mod stats;

pub use csr::{CsrGraph, EdgeId, InEdge, NodeId};
pub use load::{GraphFormat, load_graph, parse_edge_list, parse_gr, write_gr};
pub use stats::GraphStats;
