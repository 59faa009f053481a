#![forbid(unsafe_code)]
//! asyncbc-centrality library.
//!
//! Multi-source betweenness centrality computed without phase barriers:
//! per source, a pool of workers races to build the shortest-path DAG under
//! ordered two-node locking, then drains a leaf-seeded frontier that pushes
//! dependencies back to the root.
//!
//! ```no_run
//! use asyncbc_centrality::{BetweennessEngine, EngineOptions, SourceRange};
//! use asyncbc_core::graph::generate;
//!
//! let graph = generate::grid(16, 16);
//! let mut engine = BetweennessEngine::new(&graph, EngineOptions::with_threads(4))?;
//! engine.run(SourceRange::all())?;
//! print!("{}", engine.scores().preview(10));
//! # Ok::<(), asyncbc_centrality::CentralityError>(())
//! ```
//!
//! # Conventions
//!
//! - **Errors**: [`CentralityError`], each variant mapping to an
//!   [`asyncbc_core::error::ErrorCode`].
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

mod backward;
pub mod counters;
pub mod driver;
pub mod error;
mod forward;
pub mod record;
pub mod reference;
pub mod report;

pub use counters::{ActionCounters, ActionReport};
pub use driver::{BetweennessEngine, EngineOptions, RunSummary, SourceRange};
pub use error::CentralityError;
pub use record::{EdgeSnapshot, NodeSnapshot, UNREACHED, UNVALIDATED};
pub use report::CentralityScores;
