use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Field names handlers declare in their write sets.
pub struct RecordField;

impl RecordField {
    pub const STARTED_AT: &'static str = "started_at";
    pub const CREDENTIALS: &'static str = "credentials";
    pub const TOPIC: &'static str = "topic";
    pub const PRODUCTS: &'static str = "products";
    pub const COPY: &'static str = "copy";
    pub const KEYWORDS: &'static str = "keywords";
    pub const IMAGES: &'static str = "images";
    pub const VOICE: &'static str = "voice";
    pub const VIDEO_URL: &'static str = "video_url";
    pub const VIDEO_POST: &'static str = "video_post";
    pub const BLOG_POST: &'static str = "blog_post";
    pub const SOCIAL_POSTS: &'static str = "social_posts";
    pub const STATUS: &'static str = "status";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    #[default]
    Pending,
    InProgress,
    Complete,
    Failed,
}

/// A pending row in the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicRecord {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Marketplace listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub title: String,
    pub price: f64,
    pub rating: f64,
    pub review_count: u32,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedProduct {
    /// 1 is the best product
    pub rank: usize,
    pub score: f64,
    pub product: Product,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountdownSegment {
    pub rank: usize,
    pub headline: String,
    pub script: String,
}

/// Narration and blog text for one video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountdownCopy {
    pub title: String,
    pub intro: String,
    /// In countdown order, highest rank number first
    pub segments: Vec<CountdownSegment>,
    pub outro: String,
}

impl CountdownCopy {
    /// Full voice-over script.
    pub fn narration(&self) -> String {
        let mut parts = Vec::with_capacity(self.segments.len() + 2);
        parts.push(self.intro.as_str());
        parts.extend(self.segments.iter().map(|s| s.script.as_str()));
        parts.push(self.outro.as_str());
        parts.join("\n\n")
    }

    /// Blog body with one section per product.
    pub fn article(&self) -> String {
        let mut out = format!("# {}\n\n{}\n", self.title, self.intro);
        for segment in &self.segments {
            out.push_str(&format!(
                "\n## #{} {}\n\n{}\n",
                segment.rank, segment.headline, segment.script
            ));
        }
        out.push_str(&format!("\n{}\n", self.outro));
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeywordSet {
    pub tags: Vec<String>,
    pub hashtags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductImage {
    pub rank: usize,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceClip {
    pub url: String,
    pub duration_secs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedPost {
    pub platform: String,
    pub url: String,
}

/// Shared context of one run. Each field is written by exactly one phase.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoRecord {
    pub started_at: Option<DateTime<Utc>>,
    pub credentials: Vec<String>,
    pub topic: Option<TopicRecord>,
    pub products: Vec<RankedProduct>,
    pub copy: Option<CountdownCopy>,
    pub keywords: Option<KeywordSet>,
    pub images: Vec<ProductImage>,
    pub voice: Option<VoiceClip>,
    pub video_url: Option<String>,
    pub video_post: Option<PublishedPost>,
    pub blog_post: Option<PublishedPost>,
    pub social_posts: Vec<PublishedPost>,
    pub status: RecordStatus,
}
