use thiserror::Error;

/// Errors raised while constructing a phase graph executor.
///
/// Runtime failures never show up here: a failing handler or a stalled graph
/// is reported through the run report instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    #[error("Duplicate phase: {0}")]
    DuplicatePhase(String),

    #[error("Dependency not found: phase '{phase}' depends on '{missing}'")]
    DependencyNotFound { phase: String, missing: String },

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    #[error("Write conflict: phases '{first}' and '{second}' may run in the same wave and both write '{field}'")]
    WriteConflict {
        first: String,
        second: String,
        field: String,
    },
}

impl ExecutorError {
    /// Short machine-readable code, used by the JSONL renderer and CLI.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicatePhase(_) => "duplicate_phase",
            Self::DependencyNotFound { .. } => "dependency_not_found",
            Self::CircularDependency(_) => "circular_dependency",
            Self::WriteConflict { .. } => "write_conflict",
        }
    }
}
