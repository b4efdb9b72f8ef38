//! Reusable extraction primitives over a fetched page.
//!
//! Everything here is synchronous: the parsed DOM is not `Send` and must never be held
//! across an `.await`.

pub mod json_walk;
pub mod ld_json;
pub mod meta;
pub mod patterns;
pub mod text;
pub mod video_tags;

use nipper::Document;
use serde_json::Value;
use url::Url;

use crate::Media;
pub use json_walk::JsonSource;
pub use meta::PageInfo;
pub use patterns::PatternProbe;

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum MediaKind {
    Video,
    Image,
    Document,
}

impl MediaKind {
    pub fn wrap(self, url: String) -> Media {
        match self {
            MediaKind::Video => Media::Video(url),
            MediaKind::Image => Media::Image(url),
            MediaKind::Document => Media::Document(url),
        }
    }
}

/// Where `og:image` sits among the probes.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum ImageUse {
    /// right after `og:video`
    Primary,
    /// only once every other probe came up empty
    LastResort,
    Never,
}

/// Embedded JSON probe: collects values under `keys` and asks `pick` for media, first hit wins.
#[derive(Clone)]
pub struct EmbeddedProbe {
    pub name: &'static str,
    pub source: JsonSource,
    pub keys: &'static [&'static str],
    pub pick: fn(key: &str, value: &Value) -> Option<Media>,
}

impl EmbeddedProbe {
    pub fn find(&self, doc: &Document) -> Option<Media> {
        self.source.collect(doc).iter().find_map(|blob| {
            json_walk::find_keys(blob, self.keys, json_walk::DEFAULT_MAX_DEPTH)
                .into_iter()
                .find_map(|(k, v)| (self.pick)(k, v))
        })
    }
}

/// Which probes run for a page. They always run in the same order: structured data,
/// Open Graph, video tags, embedded JSON, regex patterns.
#[derive(Clone)]
pub struct ProbeSet {
    pub ld_json: bool,
    pub og_video: bool,
    pub og_image: ImageUse,
    pub video_tags: bool,
    pub embedded: Vec<EmbeddedProbe>,
    pub patterns: Vec<PatternProbe>,
}

impl Default for ProbeSet {
    fn default() -> Self {
        ProbeSet {
            ld_json: true,
            og_video: true,
            og_image: ImageUse::LastResort,
            video_tags: true,
            embedded: vec![],
            patterns: vec![],
        }
    }
}

impl ProbeSet {
    /// Only the given regex patterns.
    pub fn patterns_only(patterns: Vec<PatternProbe>) -> Self {
        ProbeSet {
            ld_json: false,
            og_video: false,
            og_image: ImageUse::Never,
            video_tags: false,
            embedded: vec![],
            patterns,
        }
    }
}

#[derive(PartialEq, Clone, Debug)]
pub struct Found {
    pub media: Media,
    /// which probe produced it
    pub probe: &'static str,
}

#[derive(PartialEq, Clone, Debug)]
pub struct Scan {
    pub found: Option<Found>,
    pub info: PageInfo,
    pub uploader: Option<String>,
}

pub fn scan(set: &ProbeSet, html: &str, page_url: &Url) -> Scan {
    let doc = Document::from(html);
    let mut info = meta::page_info(&doc);
    let mut uploader = None;
    let found = first_hit(set, &doc, html, page_url, &mut info, &mut uploader);
    Scan {
        found,
        info,
        uploader,
    }
}

fn first_hit(
    set: &ProbeSet,
    doc: &Document,
    html: &str,
    page_url: &Url,
    info: &mut PageInfo,
    uploader: &mut Option<String>,
) -> Option<Found> {
    if set.ld_json {
        if let Some(ld) = ld_json::find_media(doc) {
            info.title = ld.title.or(info.title.take());
            info.description = ld.description.or(info.description.take());
            info.thumbnail = ld.thumbnail.or(info.thumbnail.take());
            *uploader = ld.uploader;
            return Some(Found {
                media: ld.media,
                probe: "ld_json",
            });
        }
    }
    if set.og_video {
        if let Some(url) = meta::og_video(doc) {
            return Some(Found {
                media: Media::Video(url),
                probe: "og_video",
            });
        }
    }
    if set.og_image == ImageUse::Primary {
        if let Some(url) = meta::og_image(doc) {
            return Some(Found {
                media: Media::Image(url),
                probe: "og_image",
            });
        }
    }
    if set.video_tags {
        if let Some(url) = video_tags::video_src(doc, page_url) {
            return Some(Found {
                media: Media::Video(url),
                probe: "video_tag",
            });
        }
    }
    for probe in &set.embedded {
        if let Some(media) = probe.find(doc) {
            return Some(Found {
                media,
                probe: probe.name,
            });
        }
    }
    for probe in &set.patterns {
        if let Some(url) = probe.find(html) {
            return Some(Found {
                media: probe.kind.wrap(url),
                probe: probe.name,
            });
        }
    }
    if set.og_image == ImageUse::LastResort {
        if let Some(url) = meta::og_image(doc) {
            return Some(Found {
                media: Media::Image(url),
                probe: "og_image",
            });
        }
    }
    None
}
