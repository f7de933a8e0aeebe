use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::PhaseId;

/// Outcome of one phase execution attempt.
#[derive(Debug, Clone, Serialize)]
pub struct PhaseResult<P> {
    /// Phase identifier
    pub phase: P,

    /// Whether the handler returned successfully
    pub success: bool,

    /// Structured payload returned by the handler
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// Error description (failed attempts only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

impl<P: PhaseId> PhaseResult<P> {
    pub fn succeeded(phase: P, data: Option<Value>, elapsed: Duration) -> Self {
        Self {
            phase,
            success: true,
            data,
            error: None,
            duration_ms: elapsed.as_millis() as u64,
        }
    }

    pub fn failed(phase: P, error: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            phase,
            success: false,
            data: None,
            error: Some(error.into()),
            duration_ms: elapsed.as_millis() as u64,
        }
    }
}

/// Result of one executor run.
#[derive(Debug, Clone, Serialize)]
#[serde(bound(serialize = "P: Serialize + PhaseId"))]
pub struct RunReport<P: PhaseId> {
    /// Run identifier (also used in render events)
    pub run_id: String,

    /// Wall-clock start of the run
    pub started_at: DateTime<Utc>,

    /// True iff every phase in the graph completed successfully
    pub success: bool,

    /// Number of phases in the graph
    pub total_phases: usize,

    /// One entry per attempted phase; never-reached phases are absent
    pub results: HashMap<P, PhaseResult<P>>,

    /// Phases launched together, in launch order
    pub waves: Vec<Vec<P>>,

    /// Pending phases left when the run stopped
    pub stalled: Vec<P>,

    /// Total run duration in milliseconds
    pub duration_ms: u64,
}

impl<P: PhaseId> RunReport<P> {
    pub fn result(&self, phase: P) -> Option<&PhaseResult<P>> {
        self.results.get(&phase)
    }

    pub fn attempted(&self, phase: P) -> bool {
        self.results.contains_key(&phase)
    }

    pub fn completed(&self) -> usize {
        self.results.values().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.results.values().filter(|r| !r.success).count()
    }

    /// The first failed phase in wave order.
    pub fn first_failure(&self) -> Option<&PhaseResult<P>> {
        self.waves
            .iter()
            .flatten()
            .filter_map(|p| self.results.get(p))
            .find(|r| !r.success)
    }

    /// Human-readable reason for an unsuccessful run.
    pub fn failure_reason(&self) -> Option<String> {
        if self.success {
            return None;
        }
        if let Some(failed) = self.first_failure() {
            return Some(format!(
                "phase {} failed: {}",
                failed.phase,
                failed.error.as_deref().unwrap_or("unknown error")
            ));
        }
        let stalled: Vec<String> = self.stalled.iter().map(|p| p.to_string()).collect();
        Some(format!(
            "no phase ready to run; pending: {}",
            stalled.join(", ")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(results: Vec<PhaseResult<&'static str>>, waves: Vec<Vec<&'static str>>) -> RunReport<&'static str> {
        RunReport {
            run_id: "run".to_string(),
            started_at: Utc::now(),
            success: results.iter().all(|r| r.success),
            total_phases: 4,
            results: results.into_iter().map(|r| (r.phase, r)).collect(),
            waves,
            stalled: vec!["C", "D"],
            duration_ms: 3,
        }
    }

    #[test]
    fn test_first_failure_follows_wave_order() {
        let r = report(
            vec![
                PhaseResult::succeeded("A", None, Duration::from_millis(1)),
                PhaseResult::failed("B", "boom", Duration::from_millis(2)),
            ],
            vec![vec!["A", "B"]],
        );

        assert_eq!(r.completed(), 1);
        assert_eq!(r.failed(), 1);
        assert_eq!(r.first_failure().map(|f| f.phase), Some("B"));
        assert_eq!(r.failure_reason().as_deref(), Some("phase B failed: boom"));
    }

    #[test]
    fn test_stall_reason_lists_pending() {
        let mut r = report(
            vec![PhaseResult::succeeded("A", None, Duration::ZERO)],
            vec![vec!["A"]],
        );
        r.success = false;

        assert_eq!(
            r.failure_reason().as_deref(),
            Some("no phase ready to run; pending: C, D")
        );
    }

    #[test]
    fn test_report_serializes_results() {
        let r = report(
            vec![PhaseResult::succeeded(
                "A",
                Some(serde_json::json!({"n": 1})),
                Duration::from_millis(5),
            )],
            vec![vec!["A"]],
        );

        let value = serde_json::to_value(&r).unwrap();
        assert_eq!(value["results"]["A"]["success"], true);
        assert_eq!(value["results"]["A"]["data"]["n"], 1);
        assert!(value["results"]["A"].get("error").is_none());
    }
}
