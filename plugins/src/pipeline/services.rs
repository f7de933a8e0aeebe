//! External collaborators of the video pipeline.
//!
//! Every vendor integration sits behind one of these traits so the pipeline
//! can run against real clients or [`super::simulated::SimulatedServices`].
//! Implementations report failures as `anyhow::Error`; handlers attach the
//! service name.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use countdown_core::config::CircuitBreakerConfig;
use countdown_core::resilience::CircuitBreaker;

use super::record::{
    CountdownCopy, KeywordSet, Product, ProductImage, PublishedPost, RankedProduct, TopicRecord,
    VoiceClip,
};

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Next topic waiting for a video, if any.
    async fn next_pending(&self) -> Result<Option<TopicRecord>>;
    async fn mark_in_progress(&self, id: &str) -> Result<()>;
    async fn mark_complete(&self, id: &str, video_url: Option<&str>) -> Result<()>;
    async fn mark_failed(&self, id: &str, reason: &str) -> Result<()>;
}

#[async_trait]
pub trait CredentialCheck: Send + Sync {
    /// Verify every vendor account; returns the verified service names.
    async fn verify(&self) -> Result<Vec<String>>;
}

#[async_trait]
pub trait Marketplace: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Product>>;
}

#[async_trait]
pub trait CopyWriter: Send + Sync {
    async fn countdown_copy(
        &self,
        topic: &TopicRecord,
        products: &[RankedProduct],
    ) -> Result<CountdownCopy>;

    async fn keywords(&self, topic: &TopicRecord, products: &[RankedProduct])
        -> Result<KeywordSet>;
}

#[async_trait]
pub trait SpeechSynth: Send + Sync {
    async fn synthesize(&self, script: &str) -> Result<VoiceClip>;
}

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, topic: &TopicRecord, product: &RankedProduct) -> Result<ProductImage>;
}

/// Everything the renderer needs to assemble a video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderJob {
    pub title: String,
    pub voice_url: String,
    /// In countdown order
    pub image_urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RenderStatus {
    Queued,
    Rendering { progress: u8 },
    Done { url: String },
    Failed { reason: String },
}

#[async_trait]
pub trait VideoRenderer: Send + Sync {
    /// Submit a job; returns the job id to poll.
    async fn submit(&self, job: &RenderJob) -> Result<String>;
    async fn status(&self, job_id: &str) -> Result<RenderStatus>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "platform", rename_all = "snake_case")]
pub enum PublishTarget {
    Video,
    Blog,
    Social(String),
}

impl PublishTarget {
    pub fn label(&self) -> &str {
        match self {
            PublishTarget::Video => "video",
            PublishTarget::Blog => "blog",
            PublishTarget::Social(platform) => platform,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishRequest {
    pub target: PublishTarget,
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, request: &PublishRequest) -> Result<PublishedPost>;
}

/// Collaborators handed to the phase handlers.
#[derive(Clone)]
pub struct PipelineServices {
    pub store: Arc<dyn RecordStore>,
    pub credentials: Arc<dyn CredentialCheck>,
    pub marketplace: Arc<dyn Marketplace>,
    pub writer: Arc<dyn CopyWriter>,
    pub speech: Arc<dyn SpeechSynth>,
    pub images: Arc<dyn ImageGenerator>,
    pub renderer: Arc<dyn VideoRenderer>,
    pub publisher: Arc<dyn Publisher>,
}

/// One circuit breaker per collaborator.
#[derive(Debug, Clone)]
pub struct ServiceBreakers {
    pub store: CircuitBreaker,
    pub credentials: CircuitBreaker,
    pub marketplace: CircuitBreaker,
    pub writer: CircuitBreaker,
    pub speech: CircuitBreaker,
    pub images: CircuitBreaker,
    pub renderer: CircuitBreaker,
    pub publisher: CircuitBreaker,
}

impl ServiceBreakers {
    pub fn from_config(cfg: &CircuitBreakerConfig) -> Self {
        Self {
            store: cfg.breaker("store"),
            credentials: cfg.breaker("credentials"),
            marketplace: cfg.breaker("marketplace"),
            writer: cfg.breaker("writer"),
            speech: cfg.breaker("speech"),
            images: cfg.breaker("images"),
            renderer: cfg.breaker("renderer"),
            publisher: cfg.breaker("publisher"),
        }
    }
}
