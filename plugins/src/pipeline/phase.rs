use std::fmt;
use std::str::FromStr;

use countdown_core::context::FieldSet;
use serde::{Deserialize, Serialize};

use super::record::RecordField;

/// Phases of one countdown video production run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VideoPhase {
    Init,
    Credentials,
    FetchTitle,
    ScrapeProducts,
    GenerateCopy,
    GenerateKeywords,
    GenerateImages,
    SynthesizeVoice,
    RenderVideo,
    PublishVideo,
    PublishBlog,
    PublishSocial,
    Finalize,
}

impl VideoPhase {
    pub const ALL: [VideoPhase; 13] = [
        VideoPhase::Init,
        VideoPhase::Credentials,
        VideoPhase::FetchTitle,
        VideoPhase::ScrapeProducts,
        VideoPhase::GenerateCopy,
        VideoPhase::GenerateKeywords,
        VideoPhase::GenerateImages,
        VideoPhase::SynthesizeVoice,
        VideoPhase::RenderVideo,
        VideoPhase::PublishVideo,
        VideoPhase::PublishBlog,
        VideoPhase::PublishSocial,
        VideoPhase::Finalize,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            VideoPhase::Init => "INIT",
            VideoPhase::Credentials => "CREDENTIALS",
            VideoPhase::FetchTitle => "FETCH_TITLE",
            VideoPhase::ScrapeProducts => "SCRAPE_PRODUCTS",
            VideoPhase::GenerateCopy => "GENERATE_COPY",
            VideoPhase::GenerateKeywords => "GENERATE_KEYWORDS",
            VideoPhase::GenerateImages => "GENERATE_IMAGES",
            VideoPhase::SynthesizeVoice => "SYNTHESIZE_VOICE",
            VideoPhase::RenderVideo => "RENDER_VIDEO",
            VideoPhase::PublishVideo => "PUBLISH_VIDEO",
            VideoPhase::PublishBlog => "PUBLISH_BLOG",
            VideoPhase::PublishSocial => "PUBLISH_SOCIAL",
            VideoPhase::Finalize => "FINALIZE",
        }
    }

    /// Phases that must complete before this one starts.
    pub fn dependencies(self) -> &'static [VideoPhase] {
        use VideoPhase::*;
        match self {
            Init => &[],
            Credentials => &[Init],
            FetchTitle => &[Credentials],
            ScrapeProducts => &[FetchTitle],
            GenerateCopy | GenerateKeywords | GenerateImages => &[ScrapeProducts],
            SynthesizeVoice => &[GenerateCopy],
            RenderVideo => &[SynthesizeVoice, GenerateImages],
            PublishVideo => &[RenderVideo, GenerateKeywords],
            PublishBlog => &[GenerateCopy, GenerateKeywords, GenerateImages],
            PublishSocial => &[PublishVideo],
            Finalize => &[PublishVideo, PublishBlog, PublishSocial],
        }
    }

    /// Record fields this phase's handler may write.
    pub fn writes(self) -> FieldSet {
        let field = match self {
            VideoPhase::Init => RecordField::STARTED_AT,
            VideoPhase::Credentials => RecordField::CREDENTIALS,
            VideoPhase::FetchTitle => RecordField::TOPIC,
            VideoPhase::ScrapeProducts => RecordField::PRODUCTS,
            VideoPhase::GenerateCopy => RecordField::COPY,
            VideoPhase::GenerateKeywords => RecordField::KEYWORDS,
            VideoPhase::GenerateImages => RecordField::IMAGES,
            VideoPhase::SynthesizeVoice => RecordField::VOICE,
            VideoPhase::RenderVideo => RecordField::VIDEO_URL,
            VideoPhase::PublishVideo => RecordField::VIDEO_POST,
            VideoPhase::PublishBlog => RecordField::BLOG_POST,
            VideoPhase::PublishSocial => RecordField::SOCIAL_POSTS,
            VideoPhase::Finalize => RecordField::STATUS,
        };
        FieldSet::of(&[field])
    }
}

/// Static dependency table in declaration order.
pub fn video_dependencies() -> Vec<(VideoPhase, Vec<VideoPhase>)> {
    VideoPhase::ALL
        .iter()
        .map(|phase| (*phase, phase.dependencies().to_vec()))
        .collect()
}

impl fmt::Display for VideoPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VideoPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_").to_ascii_uppercase();
        VideoPhase::ALL
            .iter()
            .copied()
            .find(|phase| phase.as_str() == normalized)
            .ok_or_else(|| format!("unknown phase '{}'", s))
    }
}
