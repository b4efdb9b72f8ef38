use nipper::Document;
use url::Url;

use super::text::unescape;

/// `src` of the first `<video>`, else of the first `<source>` inside a video, resolved
/// against the page URL.
pub fn video_src(doc: &Document, page_url: &Url) -> Option<String> {
    ["video[src]", "video source[src]"]
        .iter()
        .flat_map(|selector| {
            doc.select(selector)
                .iter()
                .filter_map(|el| el.attr("src").map(|s| s.to_string()))
                .collect::<Vec<_>>()
        })
        .find_map(|src| absolutize(&unescape(src.trim()), page_url))
}

/// Handles absolute, protocol-relative and relative references. `blob:`/`data:` never resolve.
pub fn absolutize(src: &str, base: &Url) -> Option<String> {
    if src.is_empty() || src.starts_with("blob:") || src.starts_with("data:") {
        return None;
    }
    base.join(src)
        .ok()
        .filter(|u| matches!(u.scheme(), "http" | "https"))
        .map(String::from)
}
