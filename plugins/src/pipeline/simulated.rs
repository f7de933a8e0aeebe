//! In-memory collaborators for dry runs and tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use uuid::Uuid;

use super::phase::VideoPhase;
use super::ranking::countdown_order;
use super::record::{
    CountdownCopy, CountdownSegment, KeywordSet, Product, ProductImage, PublishedPost,
    RankedProduct, RecordStatus, TopicRecord, VoiceClip,
};
use super::services::{
    CopyWriter, CredentialCheck, ImageGenerator, Marketplace, PipelineServices, PublishRequest,
    PublishTarget, Publisher, RecordStore, RenderJob, RenderStatus, SpeechSynth, VideoRenderer,
};

/// Polls a simulated render job reports as in progress before finishing.
const RENDER_POLLS: u32 = 2;

/// Simulated collaborators sharing one in-memory state.
///
/// Every call waits `latency`; the collaborator behind `fail_phase` fails
/// every call.
#[derive(Clone)]
pub struct SimulatedServices {
    inner: Arc<Simulator>,
}

struct Simulator {
    latency: Duration,
    fail_phase: Option<VideoPhase>,
    topics: Vec<TopicRecord>,
    statuses: Mutex<HashMap<String, RecordStatus>>,
    render_jobs: Mutex<HashMap<String, u32>>,
}

impl SimulatedServices {
    pub fn new(latency: Duration) -> Self {
        Self::with_topics(latency, None, default_topics())
    }

    pub fn with_topics(
        latency: Duration,
        fail_phase: Option<VideoPhase>,
        topics: Vec<TopicRecord>,
    ) -> Self {
        let statuses = topics
            .iter()
            .map(|t| (t.id.clone(), RecordStatus::Pending))
            .collect();
        Self {
            inner: Arc::new(Simulator {
                latency,
                fail_phase,
                topics,
                statuses: Mutex::new(statuses),
                render_jobs: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn failing(latency: Duration, phase: VideoPhase) -> Self {
        Self::with_topics(latency, Some(phase), default_topics())
    }

    /// Whether `phase` has a collaborator that can be made to fail.
    pub fn can_inject(phase: VideoPhase) -> bool {
        phase != VideoPhase::Init
    }

    pub fn services(&self) -> PipelineServices {
        PipelineServices {
            store: self.inner.clone(),
            credentials: self.inner.clone(),
            marketplace: self.inner.clone(),
            writer: self.inner.clone(),
            speech: self.inner.clone(),
            images: self.inner.clone(),
            renderer: self.inner.clone(),
            publisher: self.inner.clone(),
        }
    }

    pub fn status(&self, id: &str) -> Option<RecordStatus> {
        lock(&self.inner.statuses).get(id).copied()
    }
}

fn default_topics() -> Vec<TopicRecord> {
    vec![TopicRecord {
        id: "rec-001".to_string(),
        title: "Wireless Earbuds".to_string(),
        category: Some("electronics".to_string()),
    }]
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn slug(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}

impl Simulator {
    async fn pause(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    async fn step(&self, phase: VideoPhase, what: &str) -> Result<()> {
        self.pause().await;
        if self.fail_phase == Some(phase) {
            bail!("simulated outage during {} (503 Service Unavailable)", what);
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for Simulator {
    async fn next_pending(&self) -> Result<Option<TopicRecord>> {
        self.step(VideoPhase::FetchTitle, "store.next_pending").await?;
        let statuses = lock(&self.statuses);
        Ok(self
            .topics
            .iter()
            .find(|t| statuses.get(&t.id) == Some(&RecordStatus::Pending))
            .cloned())
    }

    async fn mark_in_progress(&self, id: &str) -> Result<()> {
        self.pause().await;
        lock(&self.statuses).insert(id.to_string(), RecordStatus::InProgress);
        Ok(())
    }

    async fn mark_complete(&self, id: &str, _video_url: Option<&str>) -> Result<()> {
        self.step(VideoPhase::Finalize, "store.mark_complete").await?;
        lock(&self.statuses).insert(id.to_string(), RecordStatus::Complete);
        Ok(())
    }

    async fn mark_failed(&self, id: &str, reason: &str) -> Result<()> {
        tracing::debug!(record = id, reason, "simulated store: record failed");
        lock(&self.statuses).insert(id.to_string(), RecordStatus::Failed);
        Ok(())
    }
}

#[async_trait]
impl CredentialCheck for Simulator {
    async fn verify(&self) -> Result<Vec<String>> {
        self.step(VideoPhase::Credentials, "credentials.verify").await?;
        Ok(["marketplace", "writer", "speech", "images", "renderer", "publisher"]
            .iter()
            .map(|s| s.to_string())
            .collect())
    }
}

#[async_trait]
impl Marketplace for Simulator {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Product>> {
        self.step(VideoPhase::ScrapeProducts, "marketplace.search").await?;
        let base = slug(query);
        Ok((0..limit)
            .map(|i| {
                let n = i as u32;
                Product {
                    id: format!("{}-{:02}", base, i),
                    title: format!("{} Model {}", query, i + 1),
                    price: 19.0 + f64::from((n * 7) % 40),
                    rating: 3.5 + f64::from((n * 3) % 16) / 10.0,
                    review_count: 40 + (n * 97) % 900,
                    url: format!("https://shop.example/{}/{}", base, i),
                }
            })
            .collect())
    }
}

#[async_trait]
impl CopyWriter for Simulator {
    async fn countdown_copy(
        &self,
        topic: &TopicRecord,
        products: &[RankedProduct],
    ) -> Result<CountdownCopy> {
        self.step(VideoPhase::GenerateCopy, "writer.countdown_copy").await?;
        let segments = countdown_order(products)
            .into_iter()
            .map(|p| CountdownSegment {
                rank: p.rank,
                headline: p.product.title.clone(),
                script: format!(
                    "Number {}: the {}, rated {:.1} by {} buyers.",
                    p.rank, p.product.title, p.product.rating, p.product.review_count
                ),
            })
            .collect();

        Ok(CountdownCopy {
            title: format!("Top {} {}", products.len(), topic.title),
            intro: format!("These are the best {} you can buy right now.", topic.title),
            segments,
            outro: "Links to every product are in the description.".to_string(),
        })
    }

    async fn keywords(&self, topic: &TopicRecord, _products: &[RankedProduct]) -> Result<KeywordSet> {
        self.step(VideoPhase::GenerateKeywords, "writer.keywords").await?;
        let words: Vec<String> = topic
            .title
            .split_whitespace()
            .map(|w| w.to_lowercase())
            .collect();

        let mut tags = vec![topic.title.to_lowercase(), "top 5".to_string()];
        tags.extend(words.iter().cloned());
        let hashtags = words.iter().map(|w| format!("#{}", w)).collect();

        Ok(KeywordSet { tags, hashtags })
    }
}

#[async_trait]
impl SpeechSynth for Simulator {
    async fn synthesize(&self, script: &str) -> Result<VoiceClip> {
        self.step(VideoPhase::SynthesizeVoice, "speech.synthesize").await?;
        let words = script.split_whitespace().count() as f64;
        Ok(VoiceClip {
            url: format!("https://audio.example/{}.mp3", Uuid::new_v4()),
            duration_secs: words / 2.5,
        })
    }
}

#[async_trait]
impl ImageGenerator for Simulator {
    async fn generate(&self, topic: &TopicRecord, product: &RankedProduct) -> Result<ProductImage> {
        self.step(VideoPhase::GenerateImages, "images.generate").await?;
        Ok(ProductImage {
            rank: product.rank,
            url: format!("https://img.example/{}/{}.png", slug(&topic.title), product.rank),
        })
    }
}

#[async_trait]
impl VideoRenderer for Simulator {
    async fn submit(&self, job: &RenderJob) -> Result<String> {
        self.pause().await;
        if job.image_urls.is_empty() {
            bail!("render job has no images");
        }
        let id = Uuid::new_v4().to_string();
        lock(&self.render_jobs).insert(id.clone(), 0);
        Ok(id)
    }

    async fn status(&self, job_id: &str) -> Result<RenderStatus> {
        let mut jobs = lock(&self.render_jobs);
        let Some(polls) = jobs.get_mut(job_id) else {
            bail!("unknown render job {}", job_id);
        };
        *polls += 1;

        if self.fail_phase == Some(VideoPhase::RenderVideo) {
            return Ok(RenderStatus::Failed {
                reason: "simulated encoder crash".to_string(),
            });
        }
        if *polls >= RENDER_POLLS {
            return Ok(RenderStatus::Done {
                url: format!("https://render.example/{}.mp4", job_id),
            });
        }
        Ok(RenderStatus::Rendering {
            progress: (*polls * 100 / RENDER_POLLS) as u8,
        })
    }
}

#[async_trait]
impl Publisher for Simulator {
    async fn publish(&self, request: &PublishRequest) -> Result<PublishedPost> {
        let phase = match request.target {
            PublishTarget::Video => VideoPhase::PublishVideo,
            PublishTarget::Blog => VideoPhase::PublishBlog,
            PublishTarget::Social(_) => VideoPhase::PublishSocial,
        };
        self.step(phase, "publisher.publish").await?;

        let url = match &request.target {
            PublishTarget::Video => format!("https://video.example/watch/{}", Uuid::new_v4()),
            PublishTarget::Blog => format!("https://blog.example/{}", slug(&request.title)),
            PublishTarget::Social(platform) => {
                format!("https://{}.example/post/{}", platform, Uuid::new_v4())
            }
        };
        Ok(PublishedPost {
            platform: request.target.label().to_string(),
            url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug() {
        assert_eq!(slug("Wireless Earbuds (2024)"), "wireless-earbuds-2024");
    }

    #[tokio::test]
    async fn test_store_hands_out_pending_topic_once() {
        let sim = SimulatedServices::new(Duration::ZERO);
        let services = sim.services();

        let topic = services.store.next_pending().await.unwrap().unwrap();
        services.store.mark_in_progress(&topic.id).await.unwrap();

        assert!(services.store.next_pending().await.unwrap().is_none());
        assert_eq!(sim.status(&topic.id), Some(RecordStatus::InProgress));
    }

    #[tokio::test]
    async fn test_render_job_finishes_after_polls() {
        let sim = SimulatedServices::new(Duration::ZERO);
        let renderer = sim.services().renderer;
        let job = RenderJob {
            title: "t".into(),
            voice_url: "v".into(),
            image_urls: vec!["i".into()],
        };

        let id = renderer.submit(&job).await.unwrap();
        assert!(matches!(
            renderer.status(&id).await.unwrap(),
            RenderStatus::Rendering { .. }
        ));
        assert!(matches!(renderer.status(&id).await.unwrap(), RenderStatus::Done { .. }));
    }

    #[tokio::test]
    async fn test_injected_fault_hits_only_its_collaborator() {
        let sim = SimulatedServices::failing(Duration::ZERO, VideoPhase::ScrapeProducts);
        let services = sim.services();

        assert!(services.credentials.verify().await.is_ok());
        let err = services.marketplace.search("kettles", 3).await.unwrap_err();
        assert!(err.to_string().contains("marketplace.search"));
    }
}
