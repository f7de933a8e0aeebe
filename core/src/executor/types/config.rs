use serde::{Deserialize, Serialize};

/// Executor settings (`[executor]` table).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Upper bound on phases in flight at once. Unset launches the whole wave.
    #[serde(default)]
    pub max_parallel: Option<usize>,

    /// Reject cyclic tables, dangling dependencies and overlapping writes at
    /// build time. When disabled a broken table is only caught by the runtime
    /// stall check.
    #[serde(default = "default_validate_graph")]
    pub validate_graph: bool,

    /// Enable the visual progress bar (ignored for jsonl output)
    #[serde(default)]
    pub progress_bar: bool,

    /// Render format: "log" (tracing only), "text" or "jsonl"
    #[serde(default = "default_output_format")]
    pub output: String,

    /// ASCII-only markers
    #[serde(default)]
    pub ascii: bool,
}

fn default_validate_graph() -> bool {
    true
}

fn default_output_format() -> String {
    "log".to_string()
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_parallel: None,
            validate_graph: default_validate_graph(),
            progress_bar: false,
            output: default_output_format(),
            ascii: false,
        }
    }
}

impl ExecutorConfig {
    pub fn progress_enabled(&self) -> bool {
        self.progress_bar && self.output != "jsonl"
    }
}
