/// Output renderer plugin (controls how run progress is shown)
pub trait OutputRendererPlugin: Send + Sync {
    fn name(&self) -> &str;
    fn format(&self) -> &str;
    fn render(&self, event: &RenderEvent);
}

/// Executor lifecycle events.
///
/// Phases are carried by their display names so renderers stay independent
/// of the phase type.
#[derive(Debug, Clone)]
pub enum RenderEvent {
    RunStart {
        run_id: String,
        total_phases: usize,
    },
    Plan {
        run_id: String,
        waves: Vec<Vec<String>>,
    },
    WaveStart {
        run_id: String,
        wave_id: usize,
        phases: Vec<String>,
    },
    PhaseStart {
        run_id: String,
        wave_id: usize,
        phase: String,
    },
    PhaseComplete {
        run_id: String,
        phase: String,
        success: bool,
        duration_ms: u64,
        error: Option<String>,
    },
    WaveEnd {
        run_id: String,
        wave_id: usize,
        failed: usize,
    },
    Stall {
        run_id: String,
        pending: Vec<String>,
    },
    RunEnd {
        run_id: String,
        success: bool,
        completed: usize,
        failed: usize,
        total_phases: usize,
        duration_ms: u64,
    },
}
