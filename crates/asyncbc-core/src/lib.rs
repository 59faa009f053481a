#![forbid(unsafe_code)]
//! asyncbc-core library.
//!
//! Shared plumbing for the asynchronous betweenness engine: the immutable CSR
//! graph store and its loaders, the quiescence-driven worklist scheduler, the
//! configuration layer, timing instrumentation and the error code table.
//!
//! # Conventions
//!
//! - **Errors**: typed `thiserror` enums per subsystem, each mapping to an
//!   [`error::ErrorCode`]. Binaries wrap them in `anyhow::Result`.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod config;
pub mod error;
pub mod graph;
pub mod timing;
pub mod worklist;

pub use graph::{CsrGraph, EdgeId, InEdge, NodeId};
pub use worklist::{Pusher, WorkerPool, WorklistOrder};
