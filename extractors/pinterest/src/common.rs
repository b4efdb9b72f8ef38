use once_cell::sync::Lazy;
use postgrab_extractor_api::probe::json_walk::str_at;
use postgrab_extractor_api::probe::{EmbeddedProbe, JsonSource, MediaKind, PatternProbe};
use postgrab_extractor_api::serde_json::Value;
use postgrab_extractor_api::Media;
use regex::Regex;

static MP4: Lazy<Regex> = Lazy::new(|| Regex::new(r#"https?:[^"'\s<>]+?\.mp4"#).unwrap());
static PINIMG_M3U8: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?:\\?/\\?/v\d*\.pinimg\.com[^"'\s<>]+?\.m3u8"#).unwrap());
static ORIGINALS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)https?:\\?/\\?/i\.pinimg\.com\\?/originals\\?/[^"'\s]+?\.(?:jpe?g|png|webp)"#)
        .unwrap()
});
static PINIMG_IMAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)https?:\\?/\\?/i\.pinimg\.com\\?/[^"'\s]+?\.(?:jpe?g|png|webp)"#).unwrap()
});

const PWS_DATA: JsonSource = JsonSource::Script("script#__PWS_DATA__");

fn pick_video_list(_key: &str, value: &Value) -> Option<Media> {
    let first = value
        .as_object()
        .and_then(|list| list.values().next())
        .and_then(|v| v.get("url"))
        .and_then(Value::as_str);
    str_at(value, "V_720P/url")
        .or_else(|| str_at(value, "V_EXP7/url"))
        .or(first)
        .filter(|u| u.starts_with("http"))
        .map(|u| Media::Video(u.to_string()))
}

fn pick_image(_key: &str, value: &Value) -> Option<Media> {
    str_at(value, "orig/url")
        .or_else(|| str_at(value, "736x/url"))
        .filter(|u| u.starts_with("http"))
        .map(|u| Media::Image(u.to_string()))
}

/// Video beats any image, wherever the two sit in the blob.
pub fn pws_probes() -> Vec<EmbeddedProbe> {
    vec![
        EmbeddedProbe {
            name: "pws_video",
            source: PWS_DATA,
            keys: &["video_list"],
            pick: pick_video_list,
        },
        EmbeddedProbe {
            name: "pws_image",
            source: PWS_DATA,
            keys: &["images"],
            pick: pick_image,
        },
    ]
}

pub fn pattern_probes() -> Vec<PatternProbe> {
    vec![
        PatternProbe::new("mp4", &MP4, MediaKind::Video).prefer(&["v.pinimg.com", "v1.pinimg.com"]),
        PatternProbe::new("pinimg_hls", &PINIMG_M3U8, MediaKind::Video),
        PatternProbe::new("originals_image", &ORIGINALS, MediaKind::Image),
        PatternProbe::new("pinimg_image", &PINIMG_IMAGE, MediaKind::Image).prefer(&["736x"]),
    ]
}
