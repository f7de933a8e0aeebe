//! Phase-graph workflow engine.
//!
//! A run executes a statically declared DAG of named phases. Every phase whose
//! prerequisites have completed is launched in the same wave; waves repeat
//! until the graph is exhausted, a phase fails, or no pending phase can start.

pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod resilience;

pub use error::{CliError, ContextError, ExecutorError, HandlerError};
pub use executor::{PhaseGraph, PhaseGraphExecutor, PhaseResult, RunReport};
