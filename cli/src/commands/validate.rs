use std::time::Duration;

use countdown_core::config::AppConfig;
use countdown_core::CliError;
use countdown_plugins::pipeline::{SimulatedServices, VideoPipeline};

/// Build the full pipeline, running every build-time check.
pub fn run(cfg: &AppConfig) -> Result<i32, CliError> {
    let mut cfg = cfg.clone();
    if !cfg.executor.validate_graph {
        tracing::info!("validate forces graph validation on");
        cfg.executor.validate_graph = true;
    }

    let sim = SimulatedServices::new(Duration::ZERO);
    let pipeline = VideoPipeline::build(sim.services(), &cfg, None)?;
    let graph = pipeline.executor().graph();

    println!(
        "phase graph OK: {} phases, {} waves",
        graph.len(),
        graph.predicted_waves().len()
    );
    Ok(0)
}
