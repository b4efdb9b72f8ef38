use once_cell::sync::Lazy;
use postgrab_extractor_api::probe::{MediaKind, PatternProbe};
use postgrab_extractor_api::strategies::with_host;
use postgrab_extractor_api::url::Url;
use postgrab_extractor_api::{host_matches, AttemptState};
use qstring::QString;
use regex::Regex;

pub const FACEBOOK_DOMAINS: &[&str] = &["facebook.com", "fb.watch"];

const MOBILE_HOST: &str = "m.facebook.com";

/// `[facebook] 1787905208566913: Cannot parse data`
pub static ID_NEAR_FACEBOOK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)facebook.*?(\d{10,20})").unwrap());
pub static ID_AFTER_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)error:\s*\[.*?\]\s*(\d{10,20})").unwrap());

static PLAYABLE_HD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""playable_url_quality_hd":"([^"]+)""#).unwrap());
static PLAYABLE_SD: Lazy<Regex> = Lazy::new(|| Regex::new(r#""playable_url":"([^"]+)""#).unwrap());
static VIDEO_REDIRECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"href="(/video_redirect/\?src=[^"]+)""#).unwrap());
static FDOWN_HD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<a href="([^"]+)"\s+[^>]*id="hdlink""#).unwrap());
static FDOWN_SD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<a href="([^"]+)"\s+[^>]*id="sdlink""#).unwrap());

pub fn is_share_link(url: &Url) -> bool {
    url.path().starts_with("/share/") || url.host_str().map_or(false, |h| host_matches(h, "fb.watch"))
}

/// The mobile site of the same page; `None` when already there.
pub fn to_mobile(url: &Url) -> Option<Url> {
    match url.host_str() {
        Some(MOBILE_HOST) => None,
        Some(h) if host_matches(h, "facebook.com") => with_host(url, MOBILE_HOST),
        _ => None,
    }
}

pub fn cannot_parse_data(state: &AttemptState) -> bool {
    state
        .error_messages()
        .any(|m| m.to_lowercase().contains("cannot parse data"))
}

pub fn playable_urls() -> Vec<PatternProbe> {
    vec![
        PatternProbe::new("playable_url_hd", &PLAYABLE_HD, MediaKind::Video),
        PatternProbe::new("playable_url", &PLAYABLE_SD, MediaKind::Video),
    ]
}

/// `/video_redirect/?src=<percent-encoded mp4>`
fn redirect_target(href: &str) -> Option<String> {
    let (_, query) = href.split_once('?')?;
    QString::from(query)
        .get("src")
        .filter(|src| src.starts_with("http"))
        .map(str::to_string)
}

pub fn video_redirect() -> PatternProbe {
    PatternProbe::new("video_redirect", &VIDEO_REDIRECT, MediaKind::Video).transform(redirect_target)
}

pub fn fdown_links() -> Vec<PatternProbe> {
    vec![
        PatternProbe::new("hdlink", &FDOWN_HD, MediaKind::Video),
        PatternProbe::new("sdlink", &FDOWN_SD, MediaKind::Video),
    ]
}
