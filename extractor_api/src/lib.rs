#[macro_use]
extern crate smart_default;

mod cancel;
mod config;
mod context;
mod error;

pub mod pipeline;
pub mod probe;
pub mod ranking;
pub mod resolver;
pub mod strategies;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use cancel::CancellationToken;
pub use config::{ExtractorConfig, Timeouts};
pub use context::{build_http, BrowserProfile, ExtractionContext, Fetcher, HttpFetcher, Page};
pub use error::{suggestion_for, truncate_message, ErrorKind, ExtractError};
pub use pipeline::{AttemptState, Outcome, Pipeline, Strategy};
pub use resolver::{MediaResolver, ResolveOptions, ResolvedMedia, YtDlpResolver};

pub use anyhow;
pub use async_trait::async_trait;
pub use reqwest;
pub use serde_json;
pub use url;

use serde::Serialize;
use std::fmt;
use url::Url;

pub trait NewExtractor {
    fn new() -> Self;
}

/// Host-based matching against an ordered set of domain fragments.
/// A fragment matches when the host is the fragment itself or one of its subdomains.
pub trait URLMatcher {
    fn domains(&self) -> &'static [&'static str];

    fn match_extractor(&self, url: &Url) -> bool {
        Some(url)
            .filter(|u| matches!(u.scheme(), "http" | "https"))
            .and_then(|u| u.host_str())
            .map(|h| h.to_ascii_lowercase())
            .filter(|h| self.domains().iter().any(|d| host_matches(h, d)))
            .is_some()
    }
}

pub fn host_matches(host: &str, fragment: &str) -> bool {
    host == fragment
        || host
            .strip_suffix(fragment)
            .map_or(false, |rest| rest.ends_with('.'))
}

#[async_trait]
pub trait PlatformExtractor: URLMatcher + Sync + Send {
    fn platform(&self) -> Platform;

    /// Never fails: every failure path ends up as `ExtractionResult::Failure`.
    async fn extract(&self, ctx: &ExtractionContext, url: &Url) -> ExtractionResult;
}

pub type AnyExtractor = Box<dyn PlatformExtractor>;

#[derive(Serialize, PartialEq, Eq, Hash, Clone, Copy, Debug)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    LinkedIn,
    X,
    TikTok,
    Facebook,
    YouTube,
    Pinterest,
    Twitch,
}

impl Platform {
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Instagram => "Instagram",
            Platform::LinkedIn => "LinkedIn",
            Platform::X => "X/Twitter",
            Platform::TikTok => "TikTok",
            Platform::Facebook => "Facebook",
            Platform::YouTube => "YouTube",
            Platform::Pinterest => "Pinterest",
            Platform::Twitch => "Twitch",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One retrievable media stream.
#[derive(Serialize, Default, PartialEq, Clone, Debug)]
pub struct MediaCandidate {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// total bitrate, kbps
    pub bitrate: Option<f64>,
    pub codec_video: Option<String>,
    pub codec_audio: Option<String>,
    pub container_ext: String,
    pub filesize_bytes: Option<u64>,
    pub protocol: String,
}

impl MediaCandidate {
    /// A candidate known only by its URL, as found when scraping a page.
    pub fn from_url(url: &str) -> Self {
        let ext = guess_ext(url);
        MediaCandidate {
            url: url.to_string(),
            protocol: if ext == "m3u8" {
                "m3u8".to_string()
            } else {
                url.split(':').next().unwrap_or("https").to_string()
            },
            container_ext: ext,
            ..Default::default()
        }
    }

    pub fn has_video(&self) -> bool {
        self.codec_video.is_some()
    }

    pub fn has_audio(&self) -> bool {
        self.codec_audio.is_some()
    }

    pub fn has_audio_and_video(&self) -> bool {
        self.has_video() && self.has_audio()
    }

    pub fn is_playable(&self) -> bool {
        (self.url.starts_with("https://") || self.url.starts_with("http://"))
            && (self.protocol.is_empty()
                || self.protocol.starts_with("http")
                || self.protocol.contains("m3u8"))
    }

    pub fn is_image(&self) -> bool {
        IMAGE_EXTS.contains(&self.container_ext.as_str())
    }
}

const IMAGE_EXTS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];

/// File extension of the URL path, lowercase, empty when there is none.
pub fn guess_ext(url: &str) -> String {
    let path = Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.split(['?', '#']).next().unwrap_or("").to_string());
    path.rsplit('/')
        .next()
        .and_then(|file| file.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_default()
}

/// The media a successful extraction points at. A list of URLs only ever comes with a gallery.
#[derive(Serialize, PartialEq, Clone, Debug)]
#[serde(tag = "media_type", content = "media_url", rename_all = "lowercase")]
pub enum Media {
    Video(String),
    Image(String),
    Document(String),
    Gallery(Vec<String>),
}

impl Media {
    pub fn kind(&self) -> &'static str {
        match self {
            Media::Video(_) => "video",
            Media::Image(_) => "image",
            Media::Document(_) => "document",
            Media::Gallery(_) => "gallery",
        }
    }

    /// First (or only) URL
    pub fn primary_url(&self) -> Option<&str> {
        match self {
            Media::Video(u) | Media::Image(u) | Media::Document(u) => Some(u),
            Media::Gallery(us) => us.first().map(String::as_str),
        }
    }
}

#[derive(Serialize, PartialEq, Clone, Debug)]
pub struct Extraction {
    pub title: String,
    pub uploader: String,
    pub duration_seconds: Option<u64>,
    pub thumbnail_url: Option<String>,
    pub description: Option<String>,
    #[serde(flatten)]
    pub media: Media,
    pub candidates: Vec<MediaCandidate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webpage_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_short: Option<bool>,
    /// name of the strategy that produced this result
    pub strategy: String,
}

impl Extraction {
    pub fn new(media: Media) -> Self {
        Extraction {
            title: String::new(),
            uploader: String::new(),
            duration_seconds: None,
            thumbnail_url: None,
            description: None,
            media,
            candidates: vec![],
            webpage_url: None,
            view_count: None,
            max_height: None,
            is_short: None,
            strategy: String::new(),
        }
    }
}

#[derive(Serialize, PartialEq, Clone, Debug)]
pub struct Failure {
    pub error_kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Failure {
    pub fn new(error_kind: ErrorKind, message: impl Into<String>) -> Self {
        Failure {
            error_kind,
            message: message.into(),
            suggestion: suggestion_for(error_kind).map(str::to_string),
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

#[derive(Serialize, PartialEq, Clone, Debug)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExtractionResult {
    Success(Extraction),
    Failure(Failure),
}

impl ExtractionResult {
    pub fn failure(error_kind: ErrorKind, message: impl Into<String>) -> Self {
        ExtractionResult::Failure(Failure::new(error_kind, message))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExtractionResult::Success(_))
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            ExtractionResult::Success(_) => None,
            ExtractionResult::Failure(f) => Some(f.error_kind),
        }
    }

    /// Status code the HTTP layer answers with.
    pub fn http_status(&self) -> u16 {
        match self {
            ExtractionResult::Success(_) => 200,
            ExtractionResult::Failure(_) => 400,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn host_fragments_match_subdomains_only() {
        assert!(host_matches("www.instagram.com", "instagram.com"));
        assert!(host_matches("instagram.com", "instagram.com"));
        assert!(!host_matches("notinstagram.com", "instagram.com"));
        assert!(!host_matches("netflix.com", "x.com"));
    }

    #[test]
    fn guesses_extensions_from_paths() {
        assert_eq!(guess_ext("https://v.pinimg.com/videos/a/b.mp4?x=1"), "mp4");
        assert_eq!(guess_ext("https://i.pinimg.com/originals/a.JPG"), "jpg");
        assert_eq!(guess_ext("https://example.com/watch"), "");
        assert_eq!(guess_ext("https://cdn.example/master.m3u8"), "m3u8");
    }

    #[test]
    fn hls_candidate_is_playable() {
        let c = MediaCandidate::from_url("https://cdn.example/master.m3u8");
        assert_eq!(c.protocol, "m3u8");
        assert!(c.is_playable());
        assert!(!MediaCandidate::from_url("ftp://cdn.example/a.mp4").is_playable());
    }

    #[test]
    fn gallery_serializes_as_list() {
        let mut e = Extraction::new(Media::Gallery(vec!["a".into(), "b".into()]));
        e.strategy = "html".into();
        let json = serde_json::to_value(ExtractionResult::Success(e)).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["media_type"], "gallery");
        assert_eq!(json["media_url"], serde_json::json!(["a", "b"]));
    }

    #[test]
    fn failure_serializes_kind_and_suggestion() {
        let r = ExtractionResult::failure(ErrorKind::RateLimited, "429");
        assert_eq!(r.http_status(), 400);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["error_kind"], "rate_limited");
        assert!(json["suggestion"].as_str().is_some());
    }
}
