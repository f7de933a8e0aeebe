use countdown_core::executor::{OutputRendererPlugin, RenderEvent};

pub struct TextRendererPlugin {
    ascii_only: bool,
}

impl TextRendererPlugin {
    pub fn new(ascii_only: bool) -> Self {
        Self { ascii_only }
    }

    fn status(&self, success: bool) -> &'static str {
        match (success, self.ascii_only) {
            (true, true) => "OK",
            (true, false) => "✅ SUCCESS",
            (false, true) => "FAIL",
            (false, false) => "❌ FAILED",
        }
    }

    fn format_event(&self, event: &RenderEvent) -> String {
        match event {
            RenderEvent::RunStart {
                run_id,
                total_phases,
            } => format!("RUN START {} (phases: {})", run_id, total_phases),
            RenderEvent::Plan { run_id, waves } => {
                let mut out = format!("PLAN {}:", run_id);
                for (idx, wave) in waves.iter().enumerate() {
                    out.push_str(&format!("\n  wave {}: {}", idx, wave.join(", ")));
                }
                out
            }
            RenderEvent::WaveStart {
                run_id,
                wave_id,
                phases,
            } => format!(
                "WAVE START {} (wave {}, phases: {})",
                run_id,
                wave_id,
                phases.join(", ")
            ),
            RenderEvent::PhaseStart {
                run_id,
                wave_id,
                phase,
            } => format!("PHASE START {} (wave {}, phase {})", run_id, wave_id, phase),
            RenderEvent::PhaseComplete {
                run_id,
                phase,
                success,
                duration_ms,
                error,
            } => {
                let mut line = format!(
                    "PHASE END {} (phase {}, status {}, duration {}ms)",
                    run_id,
                    phase,
                    self.status(*success),
                    duration_ms
                );
                if let Some(err) = error {
                    line.push_str(&format!(": {}", err));
                }
                line
            }
            RenderEvent::WaveEnd {
                run_id,
                wave_id,
                failed,
            } => format!("WAVE END {} (wave {}, failed {})", run_id, wave_id, failed),
            RenderEvent::Stall { run_id, pending } => format!(
                "STALL {} (no phase ready; pending: {})",
                run_id,
                pending.join(", ")
            ),
            RenderEvent::RunEnd {
                run_id,
                success,
                completed,
                failed,
                total_phases,
                duration_ms,
            } => format!(
                "RUN END {} (status {}, completed {}/{}, failed {}, duration {}ms)",
                run_id,
                self.status(*success),
                completed,
                total_phases,
                failed,
                duration_ms
            ),
        }
    }
}

impl OutputRendererPlugin for TextRendererPlugin {
    fn name(&self) -> &str {
        "text-renderer"
    }

    fn format(&self) -> &str {
        "text"
    }

    fn render(&self, event: &RenderEvent) {
        println!("{}", self.format_event(event));
    }
}
