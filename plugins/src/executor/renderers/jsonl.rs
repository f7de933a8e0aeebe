use chrono::Local;
use countdown_core::executor::{OutputRendererPlugin, RenderEvent};
use serde_json::{json, Value};

pub struct JsonlRendererPlugin {
    pretty_print: bool,
}

impl JsonlRendererPlugin {
    pub fn new(pretty_print: bool) -> Self {
        Self { pretty_print }
    }

    fn event_to_json(&self, event: &RenderEvent) -> Value {
        let ts = Local::now().to_rfc3339();
        match event {
            RenderEvent::RunStart {
                run_id,
                total_phases,
            } => json!({
                "v": 1,
                "event_type": "run.start",
                "ts": ts,
                "run_id": run_id,
                "metadata": {
                    "total_phases": total_phases,
                }
            }),
            RenderEvent::Plan { run_id, waves } => json!({
                "v": 1,
                "event_type": "executor.plan",
                "ts": ts,
                "run_id": run_id,
                "metadata": {
                    "waves": waves,
                }
            }),
            RenderEvent::WaveStart {
                run_id,
                wave_id,
                phases,
            } => json!({
                "v": 1,
                "event_type": "wave.start",
                "ts": ts,
                "run_id": run_id,
                "metadata": {
                    "wave_id": wave_id,
                    "phases": phases,
                }
            }),
            RenderEvent::PhaseStart {
                run_id,
                wave_id,
                phase,
            } => json!({
                "v": 1,
                "event_type": "phase.start",
                "ts": ts,
                "run_id": run_id,
                "phase": phase,
                "metadata": {
                    "wave_id": wave_id,
                }
            }),
            RenderEvent::PhaseComplete {
                run_id,
                phase,
                success,
                duration_ms,
                error,
            } => json!({
                "v": 1,
                "event_type": "phase.end",
                "ts": ts,
                "run_id": run_id,
                "phase": phase,
                "error": error,
                "metadata": {
                    "success": success,
                    "duration_ms": duration_ms,
                }
            }),
            RenderEvent::WaveEnd {
                run_id,
                wave_id,
                failed,
            } => json!({
                "v": 1,
                "event_type": "wave.end",
                "ts": ts,
                "run_id": run_id,
                "metadata": {
                    "wave_id": wave_id,
                    "failed": failed,
                }
            }),
            RenderEvent::Stall { run_id, pending } => json!({
                "v": 1,
                "event_type": "executor.stall",
                "ts": ts,
                "run_id": run_id,
                "metadata": {
                    "pending": pending,
                }
            }),
            RenderEvent::RunEnd {
                run_id,
                success,
                completed,
                failed,
                total_phases,
                duration_ms,
            } => json!({
                "v": 1,
                "event_type": "run.end",
                "ts": ts,
                "run_id": run_id,
                "metadata": {
                    "success": success,
                    "total_phases": total_phases,
                    "completed": completed,
                    "failed": failed,
                    "duration_ms": duration_ms,
                }
            }),
        }
    }
}

impl OutputRendererPlugin for JsonlRendererPlugin {
    fn name(&self) -> &str {
        "jsonl-renderer"
    }

    fn format(&self) -> &str {
        "jsonl"
    }

    fn render(&self, event: &RenderEvent) {
        let value = self.event_to_json(event);
        if self.pretty_print {
            println!("{}", serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".into()));
        } else {
            println!("{}", serde_json::to_string(&value).unwrap_or_else(|_| "{}".into()));
        }
    }
}
