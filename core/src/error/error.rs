use thiserror::Error;

use super::ExecutorError;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("config error: {0}")]
    Config(String),
    #[error("invalid phase graph: {0}")]
    Graph(#[from] ExecutorError),
    #[error("pipeline failed: {0}")]
    PipelineFailed(String),
    #[error("command failed: {0}")]
    Command(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

impl CliError {
    /// Process exit code for this error.
    ///
    /// 11: config error, 20: graph validation, 30: pipeline run failed,
    /// 50: internal/uncategorized.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 11,
            Self::Graph(_) => 20,
            Self::PipelineFailed(_) => 30,
            Self::Command(_) | Self::Io(_) | Self::Anyhow(_) => 50,
        }
    }
}
