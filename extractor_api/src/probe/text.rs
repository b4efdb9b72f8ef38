/// Undo the escaping URLs pick up inside HTML attributes and JSON string literals.
pub fn unescape(raw: &str) -> String {
    raw.replace("\\/", "/")
        .replace("\\u0026", "&")
        .replace("\\u002F", "/")
        .replace("\\u002f", "/")
        .replace("\\u003D", "=")
        .replace("\\u003d", "=")
        .replace("&amp;", "&")
        .replace("&#x2F;", "/")
        .replace("&#038;", "&")
}

#[cfg(test)]
mod tests {
    use super::unescape;

    #[test]
    fn unescapes_json_and_html() {
        assert_eq!(
            unescape(r"https:\/\/video.xx.fbcdn.net\/v\/t42.mp4?a=1&b=2&amp;c=3"),
            "https://video.xx.fbcdn.net/v/t42.mp4?a=1&b=2&c=3"
        );
    }
}
