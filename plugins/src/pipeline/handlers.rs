use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::try_join_all;
use serde_json::json;

use countdown_core::config::PipelineConfig;
use countdown_core::context::{ContextView, FieldSet};
use countdown_core::executor::{PhaseHandler, PhasePayload};
use countdown_core::resilience::{guarded_call, CircuitBreaker, RetryStrategyPlugin};
use countdown_core::HandlerError;

use super::phase::VideoPhase;
use super::ranking::{countdown_order, rank_products};
use super::record::{
    CountdownCopy, KeywordSet, PublishedPost, RankedProduct, RecordField, RecordStatus,
    TopicRecord, VideoRecord,
};
use super::services::{
    PipelineServices, PublishRequest, PublishTarget, RenderJob, RenderStatus, ServiceBreakers,
};

/// State shared by every handler of one pipeline.
pub struct PhaseEnv {
    pub services: PipelineServices,
    pub breakers: ServiceBreakers,
    pub retry: Arc<dyn RetryStrategyPlugin>,
    pub config: PipelineConfig,
}

impl PhaseEnv {
    /// Call a collaborator behind its breaker with retries and the per-call timeout.
    async fn call<T, F, Fut>(
        &self,
        breaker: &CircuitBreaker,
        operation: &str,
        mut op: F,
    ) -> Result<T, HandlerError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let service = breaker.name();
        guarded_call(
            breaker,
            self.retry.as_ref(),
            operation,
            Some(self.config.call_timeout()),
            |_attempt| {
                let fut = op();
                async move { fut.await.map_err(|err| HandlerError::service(service, err)) }
            },
        )
        .await
    }
}

/// Longest a render job is polled before giving up.
fn render_budget(interval: Duration, max_polls: u32) -> Duration {
    interval.saturating_mul(max_polls)
}

/// Handler for one [`VideoPhase`], writing only that phase's record field.
pub struct VideoPhaseHandler {
    phase: VideoPhase,
    env: Arc<PhaseEnv>,
    ctx: ContextView<VideoRecord>,
}

impl VideoPhaseHandler {
    pub fn new(phase: VideoPhase, env: Arc<PhaseEnv>, ctx: ContextView<VideoRecord>) -> Self {
        Self { phase, env, ctx }
    }

    async fn topic(&self) -> Result<TopicRecord, HandlerError> {
        self.ctx
            .read()
            .await
            .topic
            .clone()
            .ok_or_else(|| HandlerError::missing("topic"))
    }

    async fn products(&self) -> Result<Vec<RankedProduct>, HandlerError> {
        let products = self.ctx.read().await.products.clone();
        if products.is_empty() {
            return Err(HandlerError::missing("ranked products"));
        }
        Ok(products)
    }

    async fn copy(&self) -> Result<CountdownCopy, HandlerError> {
        self.ctx
            .read()
            .await
            .copy
            .clone()
            .ok_or_else(|| HandlerError::missing("countdown copy"))
    }

    async fn keywords(&self) -> Result<KeywordSet, HandlerError> {
        self.ctx
            .read()
            .await
            .keywords
            .clone()
            .ok_or_else(|| HandlerError::missing("keywords"))
    }

    async fn init(&self) -> Result<PhasePayload, HandlerError> {
        let started_at = Utc::now();
        self.ctx
            .write(RecordField::STARTED_AT, |r| r.started_at = Some(started_at))
            .await?;
        Ok(Some(json!({ "started_at": started_at.to_rfc3339() })))
    }

    async fn credentials(&self) -> Result<PhasePayload, HandlerError> {
        let env = &self.env;
        let check = &env.services.credentials;
        let verified = env
            .call(&env.breakers.credentials, "credentials.verify", move || check.verify())
            .await?;

        tracing::info!(services = ?verified, "credentials verified");
        let payload = json!({ "verified": verified });
        self.ctx
            .write(RecordField::CREDENTIALS, |r| r.credentials = verified)
            .await?;
        Ok(Some(payload))
    }

    async fn fetch_title(&self) -> Result<PhasePayload, HandlerError> {
        let env = &self.env;
        let store = &env.services.store;
        let topic = env
            .call(&env.breakers.store, "store.next_pending", move || store.next_pending())
            .await?
            .ok_or_else(|| HandlerError::missing("pending topic in record store"))?;

        // Recorded before the store update so a failed run can still mark it.
        tracing::info!(record = %topic.id, title = %topic.title, "topic selected");
        let payload = json!({ "id": topic.id, "title": topic.title });
        let record_id = topic.id.clone();
        self.ctx
            .write(RecordField::TOPIC, |r| r.topic = Some(topic))
            .await?;

        let id = record_id.as_str();
        env.call(&env.breakers.store, "store.mark_in_progress", move || {
            store.mark_in_progress(id)
        })
        .await?;
        Ok(Some(payload))
    }

    async fn scrape_products(&self) -> Result<PhasePayload, HandlerError> {
        let topic = self.topic().await?;
        let env = &self.env;
        let market = &env.services.marketplace;
        let query = topic.title.as_str();
        let limit = env.config.candidate_limit;

        let candidates = env
            .call(&env.breakers.marketplace, "marketplace.search", move || {
                market.search(query, limit)
            })
            .await?;
        let found = candidates.len();

        let ranked = rank_products(candidates, env.config.products_per_video);
        if ranked.is_empty() {
            return Err(HandlerError::missing(format!("products for '{}'", topic.title)));
        }
        if ranked.len() < env.config.products_per_video {
            tracing::warn!(
                found = ranked.len(),
                wanted = env.config.products_per_video,
                "short product list"
            );
        }

        let payload = json!({ "candidates": found, "selected": ranked.len() });
        self.ctx
            .write(RecordField::PRODUCTS, |r| r.products = ranked)
            .await?;
        Ok(Some(payload))
    }

    async fn generate_copy(&self) -> Result<PhasePayload, HandlerError> {
        let topic = self.topic().await?;
        let products = self.products().await?;
        let env = &self.env;
        let writer = &env.services.writer;
        let (t, p) = (&topic, products.as_slice());

        let copy = env
            .call(&env.breakers.writer, "writer.countdown_copy", move || {
                writer.countdown_copy(t, p)
            })
            .await?;

        let payload = json!({ "title": copy.title, "segments": copy.segments.len() });
        self.ctx
            .write(RecordField::COPY, |r| r.copy = Some(copy))
            .await?;
        Ok(Some(payload))
    }

    async fn generate_keywords(&self) -> Result<PhasePayload, HandlerError> {
        let topic = self.topic().await?;
        let products = self.products().await?;
        let env = &self.env;
        let writer = &env.services.writer;
        let (t, p) = (&topic, products.as_slice());

        let keywords = env
            .call(&env.breakers.writer, "writer.keywords", move || writer.keywords(t, p))
            .await?;

        let payload = json!({ "tags": keywords.tags.len(), "hashtags": keywords.hashtags.len() });
        self.ctx
            .write(RecordField::KEYWORDS, |r| r.keywords = Some(keywords))
            .await?;
        Ok(Some(payload))
    }

    async fn generate_images(&self) -> Result<PhasePayload, HandlerError> {
        let topic = self.topic().await?;
        let products = self.products().await?;
        let env = &self.env;
        let generator = &env.services.images;
        let t = &topic;

        let calls = products.iter().map(|product| {
            env.call(&env.breakers.images, "images.generate", move || {
                generator.generate(t, product)
            })
        });
        let mut images = try_join_all(calls).await?;
        images.sort_by_key(|image| image.rank);

        let payload = json!({ "images": images.len() });
        self.ctx
            .write(RecordField::IMAGES, |r| r.images = images)
            .await?;
        Ok(Some(payload))
    }

    async fn synthesize_voice(&self) -> Result<PhasePayload, HandlerError> {
        let script = self.copy().await?.narration();
        let env = &self.env;
        let speech = &env.services.speech;
        let s = script.as_str();

        let clip = env
            .call(&env.breakers.speech, "speech.synthesize", move || speech.synthesize(s))
            .await?;

        let payload = json!({ "url": clip.url, "duration_secs": clip.duration_secs });
        self.ctx
            .write(RecordField::VOICE, |r| r.voice = Some(clip))
            .await?;
        Ok(Some(payload))
    }

    async fn render_job(&self) -> Result<RenderJob, HandlerError> {
        let record = self.ctx.read().await;
        let title = record
            .copy
            .as_ref()
            .map(|c| c.title.clone())
            .ok_or_else(|| HandlerError::missing("countdown copy"))?;
        let voice_url = record
            .voice
            .as_ref()
            .map(|v| v.url.clone())
            .ok_or_else(|| HandlerError::missing("voice clip"))?;

        let mut image_urls = Vec::with_capacity(record.products.len());
        for product in countdown_order(&record.products) {
            let image = record
                .images
                .iter()
                .find(|image| image.rank == product.rank)
                .ok_or_else(|| HandlerError::missing(format!("image for rank {}", product.rank)))?;
            image_urls.push(image.url.clone());
        }

        Ok(RenderJob {
            title,
            voice_url,
            image_urls,
        })
    }

    async fn render_video(&self) -> Result<PhasePayload, HandlerError> {
        let job = self.render_job().await?;
        let env = &self.env;
        let renderer = &env.services.renderer;
        let breaker = &env.breakers.renderer;
        let j = &job;

        let job_id = env
            .call(breaker, "renderer.submit", move || renderer.submit(j))
            .await?;
        tracing::info!(job = %job_id, "render job submitted");

        let interval = env.config.render_poll_interval();
        let max_polls = env.config.render_max_polls;
        let id = job_id.as_str();

        for poll in 1..=max_polls {
            tokio::time::sleep(interval).await;
            let status = env
                .call(breaker, "renderer.status", move || renderer.status(id))
                .await?;

            match status {
                RenderStatus::Done { url } => {
                    tracing::info!(job = %job_id, polls = poll, "render finished");
                    let payload = json!({ "job_id": job_id, "url": url, "polls": poll });
                    self.ctx
                        .write(RecordField::VIDEO_URL, |r| r.video_url = Some(url))
                        .await?;
                    return Ok(Some(payload));
                }
                RenderStatus::Failed { reason } => {
                    return Err(HandlerError::service(
                        breaker.name(),
                        format!("render job {} failed: {}", job_id, reason),
                    ));
                }
                RenderStatus::Queued => {
                    tracing::debug!(job = %job_id, poll, "render queued");
                }
                RenderStatus::Rendering { progress } => {
                    tracing::debug!(job = %job_id, poll, progress, "rendering");
                }
            }
        }

        Err(HandlerError::Timeout {
            operation: format!("render job {}", job_id),
            timeout: render_budget(interval, max_polls),
        })
    }

    async fn publish(&self, request: PublishRequest) -> Result<PublishedPost, HandlerError> {
        let env = &self.env;
        let publisher = &env.services.publisher;
        let operation = format!("publish.{}", request.target.label());
        let req = &request;

        let post = env
            .call(&env.breakers.publisher, &operation, move || publisher.publish(req))
            .await?;
        tracing::info!(platform = %post.platform, url = %post.url, "published");
        Ok(post)
    }

    async fn publish_video(&self) -> Result<PhasePayload, HandlerError> {
        let copy = self.copy().await?;
        let keywords = self.keywords().await?;
        let (video_url, links) = {
            let record = self.ctx.read().await;
            let video_url = record
                .video_url
                .clone()
                .ok_or_else(|| HandlerError::missing("rendered video"))?;
            let links: Vec<String> = countdown_order(&record.products)
                .iter()
                .map(|p| format!("#{} {}: {}", p.rank, p.product.title, p.product.url))
                .collect();
            (video_url, links)
        };

        let request = PublishRequest {
            target: PublishTarget::Video,
            title: copy.title.clone(),
            body: format!("{}\n\n{}", copy.intro, links.join("\n")),
            media_url: Some(video_url),
            tags: keywords.tags,
        };
        let post = self.publish(request).await?;

        let payload = json!({ "url": post.url });
        self.ctx
            .write(RecordField::VIDEO_POST, |r| r.video_post = Some(post))
            .await?;
        Ok(Some(payload))
    }

    async fn publish_blog(&self) -> Result<PhasePayload, HandlerError> {
        let copy = self.copy().await?;
        let keywords = self.keywords().await?;
        let cover = self.ctx.read().await.images.first().map(|i| i.url.clone());

        let request = PublishRequest {
            target: PublishTarget::Blog,
            title: copy.title.clone(),
            body: copy.article(),
            media_url: cover,
            tags: keywords.tags,
        };
        let post = self.publish(request).await?;

        let payload = json!({ "url": post.url });
        self.ctx
            .write(RecordField::BLOG_POST, |r| r.blog_post = Some(post))
            .await?;
        Ok(Some(payload))
    }

    async fn publish_social(&self) -> Result<PhasePayload, HandlerError> {
        let copy = self.copy().await?;
        let keywords = self.keywords().await?;
        let video_url = self
            .ctx
            .read()
            .await
            .video_post
            .as_ref()
            .map(|p| p.url.clone())
            .ok_or_else(|| HandlerError::missing("published video"))?;

        let body = format!("{} {} {}", copy.title, video_url, keywords.hashtags.join(" "));
        let requests = self.env.config.social_platforms.iter().map(|platform| PublishRequest {
            target: PublishTarget::Social(platform.clone()),
            title: copy.title.clone(),
            body: body.trim_end().to_string(),
            media_url: Some(video_url.clone()),
            tags: keywords.tags.clone(),
        });
        let posts = try_join_all(requests.map(|req| self.publish(req))).await?;

        let platforms: Vec<&str> = posts.iter().map(|p| p.platform.as_str()).collect();
        let payload = json!({ "posts": platforms });
        self.ctx
            .write(RecordField::SOCIAL_POSTS, |r| r.social_posts = posts)
            .await?;
        Ok(Some(payload))
    }

    async fn finalize(&self) -> Result<PhasePayload, HandlerError> {
        let topic = self.topic().await?;
        let video_url = self.ctx.read().await.video_url.clone();
        let env = &self.env;
        let store = &env.services.store;
        let (id, url) = (topic.id.as_str(), video_url.as_deref());

        env.call(&env.breakers.store, "store.mark_complete", move || {
            store.mark_complete(id, url)
        })
        .await?;

        tracing::info!(record = %topic.id, "record complete");
        self.ctx
            .write(RecordField::STATUS, |r| r.status = RecordStatus::Complete)
            .await?;
        Ok(Some(json!({ "id": topic.id, "video_url": video_url })))
    }
}

#[async_trait]
impl PhaseHandler for VideoPhaseHandler {
    async fn run(&self) -> Result<PhasePayload, HandlerError> {
        match self.phase {
            VideoPhase::Init => self.init().await,
            VideoPhase::Credentials => self.credentials().await,
            VideoPhase::FetchTitle => self.fetch_title().await,
            VideoPhase::ScrapeProducts => self.scrape_products().await,
            VideoPhase::GenerateCopy => self.generate_copy().await,
            VideoPhase::GenerateKeywords => self.generate_keywords().await,
            VideoPhase::GenerateImages => self.generate_images().await,
            VideoPhase::SynthesizeVoice => self.synthesize_voice().await,
            VideoPhase::RenderVideo => self.render_video().await,
            VideoPhase::PublishVideo => self.publish_video().await,
            VideoPhase::PublishBlog => self.publish_blog().await,
            VideoPhase::PublishSocial => self.publish_social().await,
            VideoPhase::Finalize => self.finalize().await,
        }
    }

    fn writes(&self) -> FieldSet {
        self.ctx.writes().clone()
    }
}
