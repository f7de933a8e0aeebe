use std::time::Duration;

use countdown_core::config::AppConfig;
use countdown_core::CliError;
use countdown_plugins::factory::build_renderer;
use countdown_plugins::pipeline::{PipelineOutcome, SimulatedServices, VideoPipeline};

use super::cli::SimulateArgs;

pub async fn run(args: &SimulateArgs, cfg: &AppConfig) -> Result<i32, CliError> {
    let cfg = simulation_config(args, cfg);

    let latency = Duration::from_millis(args.latency_ms);
    let sim = match args.fail_phase {
        Some(phase) if !SimulatedServices::can_inject(phase) => {
            return Err(CliError::Command(format!(
                "{phase} has no collaborator to fail"
            )));
        }
        Some(phase) => SimulatedServices::failing(latency, phase),
        None => SimulatedServices::new(latency),
    };

    let renderer = build_renderer(&cfg.executor);
    let pipeline = VideoPipeline::build(sim.services(), &cfg, renderer)?;
    let outcome = pipeline.run().await;

    if cfg.executor.output != "jsonl" {
        print_summary(&outcome);
    }

    if outcome.report.success {
        Ok(0)
    } else {
        let reason = outcome
            .report
            .failure_reason()
            .unwrap_or_else(|| "run failed".to_string());
        Err(CliError::PipelineFailed(reason))
    }
}

/// Config for a simulated run: flags win over the loaded file.
///
/// The simulated renderer answers at once, so render polls are spaced by the
/// simulated latency rather than the production interval.
fn simulation_config(args: &SimulateArgs, cfg: &AppConfig) -> AppConfig {
    let mut cfg = cfg.clone();
    if let Some(format) = args.format {
        cfg.executor.output = format.as_str().to_string();
    }
    if let Some(n) = args.max_parallel {
        cfg.executor.max_parallel = Some(n.max(1));
    }
    if args.progress {
        cfg.executor.progress_bar = true;
    }
    cfg.pipeline.render_poll_interval_ms = args.latency_ms.max(1);
    cfg
}

fn print_summary(outcome: &PipelineOutcome) {
    let report = &outcome.report;
    let record = &outcome.record;

    println!(
        "run {}: {}/{} phases in {} waves ({}ms)",
        report.run_id,
        report.completed(),
        report.total_phases,
        report.waves.len(),
        report.duration_ms
    );
    if let Some(topic) = &record.topic {
        println!("topic: {} ({})", topic.title, topic.id);
    }
    if let Some(url) = &record.video_url {
        println!("video: {url}");
    }
    for post in record
        .video_post
        .iter()
        .chain(record.blog_post.iter())
        .chain(record.social_posts.iter())
    {
        println!("posted to {}: {}", post.platform, post.url);
    }
    if !report.stalled.is_empty() {
        let names: Vec<String> = report.stalled.iter().map(|p| p.to_string()).collect();
        println!("not started: {}", names.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::cli::OutputFormat;

    fn args() -> SimulateArgs {
        SimulateArgs {
            fail_phase: None,
            latency_ms: 0,
            format: None,
            max_parallel: None,
            progress: false,
        }
    }

    #[test]
    fn test_flags_override_config() {
        let mut a = args();
        a.format = Some(OutputFormat::Jsonl);
        a.max_parallel = Some(0);

        let cfg = simulation_config(&a, &AppConfig::default());
        assert_eq!(cfg.executor.output, "jsonl");
        assert_eq!(cfg.executor.max_parallel, Some(1));
        assert_eq!(cfg.pipeline.render_poll_interval_ms, 1);
    }

    #[tokio::test]
    async fn test_failed_run_maps_to_pipeline_error() {
        let mut a = args();
        a.fail_phase = Some(countdown_plugins::pipeline::VideoPhase::PublishBlog);
        a.format = Some(OutputFormat::Jsonl);

        let mut cfg = AppConfig::default();
        cfg.retry.strategy = "none".to_string();

        let err = run(&a, &cfg).await.unwrap_err();
        assert_eq!(err.exit_code(), 30);
        assert!(err.to_string().contains("PUBLISH_BLOG"));
    }

    #[tokio::test]
    async fn test_init_cannot_be_failed() {
        let mut a = args();
        a.fail_phase = Some(countdown_plugins::pipeline::VideoPhase::Init);

        let err = run(&a, &AppConfig::default()).await.unwrap_err();
        assert!(matches!(err, CliError::Command(_)));
    }
}
