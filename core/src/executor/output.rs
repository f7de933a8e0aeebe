use super::traits::RenderEvent;

/// Emit an executor event through `tracing` (used when no renderer is set).
pub fn log_event(event: &RenderEvent) {
    match event {
        RenderEvent::RunStart {
            run_id,
            total_phases,
        } => {
            tracing::info!(run_id = %run_id, total_phases, "workflow run started");
        }
        RenderEvent::Plan { run_id, waves } => {
            for (idx, wave) in waves.iter().enumerate() {
                tracing::debug!(run_id = %run_id, wave = idx, phases = %wave.join(", "), "planned wave");
            }
        }
        RenderEvent::WaveStart {
            run_id,
            wave_id,
            phases,
        } => {
            tracing::info!(run_id = %run_id, wave = wave_id, phases = %phases.join(", "), "wave started");
        }
        RenderEvent::PhaseStart {
            run_id,
            wave_id,
            phase,
        } => {
            tracing::debug!(run_id = %run_id, wave = wave_id, phase = %phase, "phase started");
        }
        RenderEvent::PhaseComplete {
            run_id,
            phase,
            success,
            duration_ms,
            error,
        } => {
            if *success {
                tracing::info!(run_id = %run_id, phase = %phase, duration_ms, "phase completed");
            } else {
                tracing::error!(
                    run_id = %run_id,
                    phase = %phase,
                    duration_ms,
                    error = error.as_deref().unwrap_or("unknown error"),
                    "phase failed"
                );
            }
        }
        RenderEvent::WaveEnd {
            run_id,
            wave_id,
            failed,
        } => {
            tracing::debug!(run_id = %run_id, wave = wave_id, failed, "wave finished");
        }
        RenderEvent::Stall { run_id, pending } => {
            tracing::warn!(
                run_id = %run_id,
                pending = %pending.join(", "),
                "no phase ready to run; stopping"
            );
        }
        RenderEvent::RunEnd {
            run_id,
            success,
            completed,
            failed,
            total_phases,
            duration_ms,
        } => {
            if *success {
                tracing::info!(run_id = %run_id, completed, total_phases, duration_ms, "workflow run succeeded");
            } else {
                tracing::error!(run_id = %run_id, completed, failed, total_phases, duration_ms, "workflow run failed");
            }
        }
    }
}
