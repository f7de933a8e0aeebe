use std::sync::Arc;

use countdown_core::config::{ExecutorConfig, RetryConfig};
use countdown_core::executor::OutputRendererPlugin;
use countdown_core::resilience::{NoRetry, RetryStrategyPlugin};

use crate::executor::{
    ExponentialBackoffPlugin, JsonlRendererPlugin, LinearRetryPlugin, TextRendererPlugin,
};

/// Renderer for `executor.output`; `None` leaves events to `tracing`.
pub fn build_renderer(cfg: &ExecutorConfig) -> Option<Arc<dyn OutputRendererPlugin>> {
    match cfg.output.as_str() {
        "text" => Some(Arc::new(TextRendererPlugin::new(cfg.ascii))),
        "jsonl" => Some(Arc::new(JsonlRendererPlugin::new(false))),
        _ => None,
    }
}

pub fn build_retry_strategy(cfg: &RetryConfig) -> Arc<dyn RetryStrategyPlugin> {
    match cfg.strategy.as_str() {
        "linear" => Arc::new(LinearRetryPlugin::new(cfg.clone())),
        "none" => Arc::new(NoRetry),
        "exponential-backoff" => Arc::new(ExponentialBackoffPlugin::new(cfg.clone())),
        other => {
            tracing::warn!(strategy = other, "unknown retry strategy; using exponential-backoff");
            Arc::new(ExponentialBackoffPlugin::new(cfg.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_renderer_by_output() {
        let mut cfg = ExecutorConfig::default();
        assert!(build_renderer(&cfg).is_none());

        cfg.output = "jsonl".to_string();
        let renderer = build_renderer(&cfg).unwrap();
        assert_eq!(renderer.format(), "jsonl");

        cfg.output = "text".to_string();
        let renderer = build_renderer(&cfg).unwrap();
        assert_eq!(renderer.format(), "text");
    }

    #[test]
    fn test_build_retry_strategy() {
        let mut cfg = RetryConfig::default();
        assert_eq!(build_retry_strategy(&cfg).name(), "exponential-backoff");

        cfg.strategy = "linear".to_string();
        assert_eq!(build_retry_strategy(&cfg).name(), "linear");

        cfg.strategy = "none".to_string();
        assert_eq!(build_retry_strategy(&cfg).max_attempts(), 1);

        cfg.strategy = "bogus".to_string();
        assert_eq!(build_retry_strategy(&cfg).name(), "exponential-backoff");
    }
}
