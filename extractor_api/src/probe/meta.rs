use nipper::Document;

use super::text::unescape;

/// Content of the first `<meta>` whose `property` or `name` is one of `keys`, tried in key order.
pub fn meta_content(doc: &Document, keys: &[&str]) -> Option<String> {
    let metas = doc.select("meta");
    keys.iter().find_map(|key| {
        metas
            .iter()
            .find(|m| {
                m.attr("property").map_or(false, |p| p.eq_ignore_ascii_case(key))
                    || m.attr("name").map_or(false, |n| n.eq_ignore_ascii_case(key))
            })
            .and_then(|m| m.attr("content"))
            .map(|c| unescape(c.trim()))
            .filter(|c| !c.is_empty())
    })
}

pub fn og_video(doc: &Document) -> Option<String> {
    meta_content(doc, &["og:video", "og:video:url", "og:video:secure_url"])
        .filter(|u| u.starts_with("http"))
}

pub fn og_image(doc: &Document) -> Option<String> {
    meta_content(doc, &["og:image", "og:image:url", "og:image:secure_url", "twitter:image"])
        .filter(|u| u.starts_with("http"))
}

pub fn title(doc: &Document) -> Option<String> {
    meta_content(doc, &["og:title", "twitter:title"]).or_else(|| {
        Some(doc.select("title").text().trim().to_string()).filter(|t| !t.is_empty())
    })
}

pub fn description(doc: &Document) -> Option<String> {
    meta_content(doc, &["og:description", "description", "twitter:description"])
}

/// `link[rel=canonical]`, else `og:url`.
pub fn canonical(doc: &Document) -> Option<String> {
    doc.select(r#"link[rel="canonical"]"#)
        .attr("href")
        .map(|h| unescape(h.trim()))
        .filter(|h| h.starts_with("http"))
        .or_else(|| meta_content(doc, &["og:url"]).filter(|u| u.starts_with("http")))
}

/// Metadata of a scraped page, filled as far as the page allows.
#[derive(Default, PartialEq, Clone, Debug)]
pub struct PageInfo {
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
    pub canonical: Option<String>,
}

pub fn page_info(doc: &Document) -> PageInfo {
    PageInfo {
        title: title(doc),
        description: description(doc),
        thumbnail: og_image(doc),
        canonical: canonical(doc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PAGE: &str = r#"<html><head>
        <title> Fallback title </title>
        <meta property="og:video:url" content="https://cdn.example/v.mp4?a=1&amp;b=2">
        <meta name="description" content="plain description">
        <meta property="og:image" content="https://cdn.example/i.jpg">
        <meta property="og:url" content="https://www.facebook.com/reel/1234567890">
        </head><body></body></html>"#;

    #[test]
    fn reads_open_graph() {
        let doc = Document::from(PAGE);
        assert_eq!(og_video(&doc).as_deref(), Some("https://cdn.example/v.mp4?a=1&b=2"));
        assert_eq!(og_image(&doc).as_deref(), Some("https://cdn.example/i.jpg"));
    }

    #[test]
    fn page_info_falls_back() {
        let info = page_info(&Document::from(PAGE));
        assert_eq!(info.title.as_deref(), Some("Fallback title"));
        assert_eq!(info.description.as_deref(), Some("plain description"));
        assert_eq!(
            info.canonical.as_deref(),
            Some("https://www.facebook.com/reel/1234567890")
        );
    }

    #[test]
    fn missing_tags() {
        let doc = Document::from("<html><body><p>nothing</p></body></html>");
        assert_eq!(og_video(&doc), None);
        assert_eq!(page_info(&doc), PageInfo::default());
    }
}
