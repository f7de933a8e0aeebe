//! Phase-graph executor
//!
//! Runs a statically declared DAG of asynchronous phases. It supports:
//! - Dependency table construction and validation (dangling references,
//!   cycles, overlapping shared-context writes)
//! - Readiness-driven waves: every phase whose prerequisites completed is
//!   launched together
//! - Fail-fast on the first failed wave, with stall detection when pending
//!   phases can never become ready
//! - Structured output through renderer plugins or `tracing`
//!
//! # Architecture
//!
//! ```text
//! PhaseGraphExecutor::builder().phase(id, deps, handler)...
//!   ↓
//! build() → PhaseGraph::from_table() → validate() → check_write_conflicts()
//!   ↓
//! run(): loop { ready_set() → execute_wave() → record_wave() }
//!   ↓
//! RunReport { success, results, waves, stalled }
//! ```

mod engine;
mod graph;
mod output;
mod progress;
mod scheduler;
pub mod traits;
pub mod types;

pub use engine::{PhaseGraphExecutor, PhaseGraphExecutorBuilder};
pub use graph::PhaseGraph;
pub use output::log_event;
pub use progress::ProgressMonitor;
pub use scheduler::execute_wave;
pub use traits::{handler_fn, FnHandler, OutputRendererPlugin, PhaseHandler, PhasePayload, RenderEvent};
pub use types::{ExecutorConfig, PhaseId, PhaseResult, RunReport};
