use once_cell::sync::Lazy;
use postgrab_extractor_api::probe::json_walk::str_at;
use postgrab_extractor_api::probe::text::unescape;
use postgrab_extractor_api::probe::{EmbeddedProbe, JsonSource, MediaKind, PatternProbe};
use postgrab_extractor_api::serde_json::Value;
use postgrab_extractor_api::Media;
use regex::Regex;

static CDN_MP4: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""(https?:[^"]+?tiktokcdn[^"]+?mime_type=video_mp4[^"]*)""#).unwrap()
});

/// Older pages nest the address list one level deeper.
fn pick_address(_key: &str, value: &Value) -> Option<Media> {
    value
        .as_str()
        .or_else(|| str_at(value, "UrlList/0"))
        .filter(|u| u.starts_with("http"))
        .map(|u| Media::Video(unescape(u)))
}

/// `playAddr` streams without the watermark, so it goes first.
pub fn rehydration_video() -> EmbeddedProbe {
    EmbeddedProbe {
        name: "rehydration_json",
        source: JsonSource::Script("script#__UNIVERSAL_DATA_FOR_REHYDRATION__, script#SIGI_STATE"),
        keys: &["playAddr"],
        pick: pick_address,
    }
}

pub fn rehydration_download() -> EmbeddedProbe {
    EmbeddedProbe {
        name: "rehydration_json",
        keys: &["downloadAddr"],
        ..rehydration_video()
    }
}

pub fn cdn_mp4() -> PatternProbe {
    PatternProbe::new("cdn_mp4", &CDN_MP4, MediaKind::Video)
}
