//! Countdown video pipeline.
//!
//! Wires the [`VideoPhase`] dependency table to [`VideoPhaseHandler`]s over a
//! shared [`VideoRecord`] and runs it on the phase-graph executor.

mod handlers;
mod phase;
mod ranking;
mod record;
mod services;
mod simulated;

use std::sync::Arc;

use countdown_core::config::AppConfig;
use countdown_core::context::{FieldSet, SharedRecord};
use countdown_core::executor::OutputRendererPlugin;
use countdown_core::{ExecutorError, PhaseGraph, PhaseGraphExecutor, RunReport};

pub use handlers::{PhaseEnv, VideoPhaseHandler};
pub use phase::{video_dependencies, VideoPhase};
pub use ranking::{countdown_order, rank_products, score};
pub use record::{
    CountdownCopy, CountdownSegment, KeywordSet, Product, ProductImage, PublishedPost,
    RankedProduct, RecordField, RecordStatus, TopicRecord, VideoRecord, VoiceClip,
};
pub use services::{
    CopyWriter, CredentialCheck, ImageGenerator, Marketplace, PipelineServices, PublishRequest,
    PublishTarget, Publisher, RecordStore, RenderJob, RenderStatus, ServiceBreakers,
    SpeechSynth, VideoRenderer,
};
pub use simulated::SimulatedServices;

use crate::factory::build_retry_strategy;

/// Dependency graph of the pipeline, without handlers.
pub fn video_graph() -> Result<PhaseGraph<VideoPhase>, ExecutorError> {
    PhaseGraph::from_table(video_dependencies())
}

/// Report and final record of one pipeline run.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub report: RunReport<VideoPhase>,
    pub record: VideoRecord,
}

/// One production run: executor, shared record and the store to report back to.
pub struct VideoPipeline {
    executor: PhaseGraphExecutor<VideoPhase>,
    record: SharedRecord<VideoRecord>,
    services: PipelineServices,
}

impl VideoPipeline {
    pub fn build(
        services: PipelineServices,
        config: &AppConfig,
        renderer: Option<Arc<dyn OutputRendererPlugin>>,
    ) -> Result<Self, ExecutorError> {
        let env = Arc::new(PhaseEnv {
            services: services.clone(),
            breakers: ServiceBreakers::from_config(&config.circuit_breaker),
            retry: build_retry_strategy(&config.retry),
            config: config.pipeline.clone(),
        });
        let record = SharedRecord::new(VideoRecord::default());

        let mut builder = PhaseGraphExecutor::builder().config(config.executor.clone());
        if let Some(renderer) = renderer {
            builder = builder.renderer(renderer);
        }
        for (phase, deps) in video_dependencies() {
            let handler = VideoPhaseHandler::new(phase, env.clone(), record.view(phase.writes()));
            builder = builder.phase(phase, deps, handler);
        }

        Ok(Self {
            executor: builder.build()?,
            record,
            services,
        })
    }

    pub fn executor(&self) -> &PhaseGraphExecutor<VideoPhase> {
        &self.executor
    }

    /// Execute every phase; a failed run marks its topic failed in the store.
    pub async fn run(self) -> PipelineOutcome {
        let report = self.executor.run().await;
        if !report.success {
            self.mark_failed(&report).await;
        }
        let record = self.record.snapshot().await;
        PipelineOutcome { report, record }
    }

    async fn mark_failed(&self, report: &RunReport<VideoPhase>) {
        let status = self.record.view(FieldSet::of(&[RecordField::STATUS]));
        let topic = status.read().await.topic.clone();
        let Some(topic) = topic else {
            tracing::warn!("run failed before a topic was selected");
            return;
        };

        let reason = report
            .failure_reason()
            .unwrap_or_else(|| "run failed".to_string());
        match self.services.store.mark_failed(&topic.id, &reason).await {
            Ok(()) => tracing::info!(record = %topic.id, reason = %reason, "record marked failed"),
            Err(err) => {
                tracing::error!(record = %topic.id, error = %err, "could not mark record failed")
            }
        }

        if let Err(err) = status
            .write(RecordField::STATUS, |r| r.status = RecordStatus::Failed)
            .await
        {
            tracing::error!(error = %err, "could not update record status");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use pretty_assertions::assert_eq;

    fn fast_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.retry.strategy = "none".to_string();
        config.pipeline.render_poll_interval_ms = 1;
        config.pipeline.call_timeout_secs = 5;
        config
    }

    #[test]
    fn test_pipeline_builds_with_validation() {
        let sim = SimulatedServices::new(Duration::ZERO);
        let pipeline = VideoPipeline::build(sim.services(), &fast_config(), None).unwrap();
        assert_eq!(pipeline.executor().graph().len(), VideoPhase::ALL.len());
    }

    #[tokio::test]
    async fn test_simulated_run_completes() {
        let sim = SimulatedServices::new(Duration::ZERO);
        let pipeline = VideoPipeline::build(sim.services(), &fast_config(), None).unwrap();

        let outcome = pipeline.run().await;
        let report = &outcome.report;

        assert!(report.success, "{:?}", report.failure_reason());
        assert_eq!(report.completed(), VideoPhase::ALL.len());
        assert!(report.stalled.is_empty());
        assert_eq!(report.waves.len(), 10);

        let record = &outcome.record;
        assert_eq!(record.status, RecordStatus::Complete);
        assert_eq!(record.products.len(), 5);
        assert_eq!(record.images.len(), 5);
        assert!(record.video_url.is_some());
        assert_eq!(record.social_posts.len(), 2);
        assert_eq!(sim.status("rec-001"), Some(RecordStatus::Complete));
    }

    #[tokio::test]
    async fn test_render_failure_stops_downstream_and_marks_record() {
        let sim = SimulatedServices::failing(Duration::ZERO, VideoPhase::RenderVideo);
        let pipeline = VideoPipeline::build(sim.services(), &fast_config(), None).unwrap();

        let outcome = pipeline.run().await;
        let report = &outcome.report;

        assert!(!report.success);
        let failure = report.first_failure().unwrap();
        assert_eq!(failure.phase, VideoPhase::RenderVideo);
        assert!(failure
            .error
            .as_deref()
            .unwrap_or_default()
            .contains("simulated encoder crash"));

        assert!(!report.attempted(VideoPhase::PublishVideo));
        assert!(!report.attempted(VideoPhase::Finalize));
        assert!(report.stalled.contains(&VideoPhase::PublishSocial));

        assert_eq!(outcome.record.status, RecordStatus::Failed);
        assert_eq!(sim.status("rec-001"), Some(RecordStatus::Failed));
    }

    #[tokio::test]
    async fn test_wave_siblings_finish_before_stop() {
        let sim = SimulatedServices::failing(Duration::ZERO, VideoPhase::GenerateKeywords);
        let pipeline = VideoPipeline::build(sim.services(), &fast_config(), None).unwrap();

        let outcome = pipeline.run().await;
        let report = &outcome.report;

        assert!(!report.success);
        assert!(report.result(VideoPhase::GenerateCopy).unwrap().success);
        assert!(report.result(VideoPhase::GenerateImages).unwrap().success);
        assert!(!report.attempted(VideoPhase::SynthesizeVoice));
        assert!(outcome.record.copy.is_some());
        assert!(outcome.record.keywords.is_none());
    }

    #[tokio::test]
    async fn test_empty_store_fails_at_fetch_title() {
        let sim = SimulatedServices::with_topics(Duration::ZERO, None, Vec::new());
        let pipeline = VideoPipeline::build(sim.services(), &fast_config(), None).unwrap();

        let outcome = pipeline.run().await;
        let failure = outcome.report.first_failure().unwrap();

        assert_eq!(failure.phase, VideoPhase::FetchTitle);
        assert_eq!(
            failure.error.as_deref(),
            Some("missing input: pending topic in record store")
        );
        assert_eq!(outcome.record.status, RecordStatus::Pending);
    }

    /// Store that applies `mark_in_progress` and then reports an error.
    struct LossyStore {
        inner: Arc<dyn RecordStore>,
    }

    #[async_trait::async_trait]
    impl RecordStore for LossyStore {
        async fn next_pending(&self) -> anyhow::Result<Option<TopicRecord>> {
            self.inner.next_pending().await
        }

        async fn mark_in_progress(&self, id: &str) -> anyhow::Result<()> {
            self.inner.mark_in_progress(id).await?;
            anyhow::bail!("connection reset after write")
        }

        async fn mark_complete(&self, id: &str, video_url: Option<&str>) -> anyhow::Result<()> {
            self.inner.mark_complete(id, video_url).await
        }

        async fn mark_failed(&self, id: &str, reason: &str) -> anyhow::Result<()> {
            self.inner.mark_failed(id, reason).await
        }
    }

    #[tokio::test]
    async fn test_store_error_after_claim_marks_record_failed() {
        let sim = SimulatedServices::new(Duration::ZERO);
        let mut services = sim.services();
        services.store = Arc::new(LossyStore {
            inner: services.store.clone(),
        });
        let pipeline = VideoPipeline::build(services, &fast_config(), None).unwrap();

        let outcome = pipeline.run().await;
        let failure = outcome.report.first_failure().unwrap();

        assert_eq!(failure.phase, VideoPhase::FetchTitle);
        assert!(failure
            .error
            .as_deref()
            .unwrap_or_default()
            .contains("connection reset after write"));
        assert_eq!(outcome.record.status, RecordStatus::Failed);
        assert_eq!(sim.status("rec-001"), Some(RecordStatus::Failed));
    }

    #[test]
    fn test_video_graph_matches_table() {
        let graph = video_graph().unwrap();
        assert_eq!(
            graph.dependencies(VideoPhase::Finalize),
            &[
                VideoPhase::PublishVideo,
                VideoPhase::PublishBlog,
                VideoPhase::PublishSocial
            ]
        );
        assert_eq!(graph.dependents(VideoPhase::ScrapeProducts).len(), 3);
    }
}
