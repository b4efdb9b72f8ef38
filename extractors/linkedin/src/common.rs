use once_cell::sync::Lazy;
use postgrab_extractor_api::probe::{EmbeddedProbe, JsonSource, MediaKind, PatternProbe};
use postgrab_extractor_api::serde_json::Value;
use postgrab_extractor_api::Media;
use regex::Regex;

pub const LINKEDIN_DOMAINS: &[&str] = &["linkedin.com"];

static DMS_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r#""(https://dms\.licdn\.com/[^"]+)""#).unwrap());

fn pick_source(_key: &str, value: &Value) -> Option<Media> {
    value
        .as_str()
        .filter(|u| u.starts_with("http"))
        .map(|u| Media::Video(u.to_string()))
}

/// Feed videos list their renditions in `<video data-sources="[{src, type}]">`.
pub fn data_sources() -> EmbeddedProbe {
    EmbeddedProbe {
        name: "data_sources",
        source: JsonSource::Attribute {
            selector: "video[data-sources]",
            attr: "data-sources",
        },
        keys: &["src"],
        pick: pick_source,
    }
}

/// Any file on the media server; streaming manifests are not documents.
pub fn dms_document() -> PatternProbe {
    PatternProbe::new("dms_document", &DMS_URL, MediaKind::Document)
        .skip(&[".m3u8", ".mpd"])
        .prefer(&["playlist", "playback"])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dms_skips_manifests_and_prefers_playback() {
        let html = r#"<code>{"a":"https://dms.licdn.com/playlist/vid/a/master.m3u8",
            "b":"https://dms.licdn.com/image/x.jpg",
            "c":"https://dms.licdn.com/playback/doc/1?e=1&v=beta"}</code>"#;
        assert_eq!(
            dms_document().find(html).as_deref(),
            Some("https://dms.licdn.com/playback/doc/1?e=1&v=beta")
        );
    }
}
