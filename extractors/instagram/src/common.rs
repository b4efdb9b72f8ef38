use once_cell::sync::Lazy;
use postgrab_extractor_api::probe::text::unescape;
use postgrab_extractor_api::probe::{EmbeddedProbe, JsonSource, MediaKind, PatternProbe};
use postgrab_extractor_api::serde_json::Value;
use postgrab_extractor_api::url::Url;
use postgrab_extractor_api::{host_matches, Media};
use regex::Regex;

pub const INSTAGRAM_DOMAINS: &[&str] = &["instagram.com", "cdninstagram.com"];

static CDN_MP4: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""(https?:[^"]+?cdninstagram\.com[^"]+?\.mp4[^"]*)""#).unwrap());

/// Links straight to the CDN need no extraction at all.
pub fn is_cdn_media(url: &Url) -> bool {
    url.host_str().map_or(false, |h| host_matches(h, "cdninstagram.com"))
        || url.path().to_ascii_lowercase().ends_with(".mp4")
}

/// `video_versions` lists renditions; the widest one wins.
fn pick_video(key: &str, value: &Value) -> Option<Media> {
    let url = match key {
        "video_versions" => value
            .as_array()?
            .iter()
            .filter(|v| v.get("url").and_then(Value::as_str).is_some())
            .max_by_key(|v| v.get("width").and_then(Value::as_u64).unwrap_or(0))?
            .get("url")?
            .as_str()?,
        "video_url" => value.as_str()?,
        _ => return None,
    };
    Some(url)
        .filter(|u| u.starts_with("http"))
        .map(|u| Media::Video(unescape(u)))
}

pub fn embedded_video() -> EmbeddedProbe {
    EmbeddedProbe {
        name: "embedded_video",
        source: JsonSource::Script(r#"script[type="application/json"]"#),
        keys: &["video_versions", "video_url"],
        pick: pick_video,
    }
}

pub fn cdn_mp4() -> PatternProbe {
    PatternProbe::new("cdn_mp4", &CDN_MP4, MediaKind::Video)
}
