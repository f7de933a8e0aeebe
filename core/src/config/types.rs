use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::resilience::CircuitBreaker;

pub use crate::executor::types::ExecutorConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub executor: ExecutorConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default)]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "countdown_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Optional directory for log files. If empty or unset, uses OS temp dir.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: false,
            level: default_logging_level(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_retry_strategy")]
    pub strategy: String,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_retry_strategy() -> String {
    "exponential-backoff".to_string()
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_max_attempts() -> u32 {
    3
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            strategy: default_retry_strategy(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_recovery_timeout_secs")]
    pub recovery_timeout_secs: u64,
    #[serde(default = "default_success_threshold")]
    pub success_threshold: u32,
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_recovery_timeout_secs() -> u64 {
    60
}

fn default_success_threshold() -> u32 {
    2
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            recovery_timeout_secs: default_recovery_timeout_secs(),
            success_threshold: default_success_threshold(),
        }
    }
}

impl CircuitBreakerConfig {
    pub fn breaker(&self, service: &str) -> CircuitBreaker {
        CircuitBreaker::new(
            service,
            self.failure_threshold,
            Duration::from_secs(self.recovery_timeout_secs),
            self.success_threshold,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Products featured in one countdown video
    #[serde(default = "default_products_per_video")]
    pub products_per_video: usize,

    /// Marketplace results considered before ranking
    #[serde(default = "default_candidate_limit")]
    pub candidate_limit: usize,

    /// Delay between render status polls
    #[serde(default = "default_render_poll_interval_ms")]
    pub render_poll_interval_ms: u64,

    /// Polls before a render job is abandoned
    #[serde(default = "default_render_max_polls")]
    pub render_max_polls: u32,

    /// Per-attempt timeout for outbound calls
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    /// Social platforms to cross-post to
    #[serde(default = "default_social_platforms")]
    pub social_platforms: Vec<String>,
}

fn default_products_per_video() -> usize {
    5
}

fn default_candidate_limit() -> usize {
    20
}

fn default_render_poll_interval_ms() -> u64 {
    10_000
}

fn default_render_max_polls() -> u32 {
    60
}

fn default_call_timeout_secs() -> u64 {
    60
}

fn default_social_platforms() -> Vec<String> {
    vec!["twitter".to_string(), "pinterest".to_string()]
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            products_per_video: default_products_per_video(),
            candidate_limit: default_candidate_limit(),
            render_poll_interval_ms: default_render_poll_interval_ms(),
            render_max_polls: default_render_max_polls(),
            call_timeout_secs: default_call_timeout_secs(),
            social_platforms: default_social_platforms(),
        }
    }
}

impl PipelineConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn render_poll_interval(&self) -> Duration {
        Duration::from_millis(self.render_poll_interval_ms)
    }
}
