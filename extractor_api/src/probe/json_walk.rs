//! Bounded search through embedded JSON for an explicit set of keys.

use nipper::Document;
use serde_json::Value;

pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Where an embedded JSON blob lives in the page.
#[derive(Clone, Copy, Debug)]
pub enum JsonSource {
    /// text of every element matching the selector, usually a `<script>`
    Script(&'static str),
    /// an attribute holding JSON, e.g. `data-sources`
    Attribute {
        selector: &'static str,
        attr: &'static str,
    },
}

impl JsonSource {
    /// Every blob of this source that parses.
    pub fn collect(&self, doc: &Document) -> Vec<Value> {
        let raw: Vec<String> = match self {
            JsonSource::Script(selector) => doc
                .select(selector)
                .iter()
                .map(|el| el.text().to_string())
                .collect(),
            JsonSource::Attribute { selector, attr } => doc
                .select(selector)
                .iter()
                .filter_map(|el| el.attr(attr).map(|a| a.to_string()))
                .collect(),
        };
        raw.iter()
            .filter_map(|text| serde_json::from_str(strip_assignment(text)).ok())
            .collect()
    }
}

/// `window.__DATA__ = {...};` -> `{...}`
fn strip_assignment(text: &str) -> &str {
    let trimmed = text.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return trimmed;
    }
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}

/// Values stored under any of `keys`, depth first. Matched values are not searched further.
pub fn find_keys<'v>(root: &'v Value, keys: &[&str], max_depth: usize) -> Vec<(&'v str, &'v Value)> {
    let mut found = vec![];
    walk(root, keys, max_depth, &mut found);
    found
}

fn walk<'v>(value: &'v Value, keys: &[&str], depth_left: usize, found: &mut Vec<(&'v str, &'v Value)>) {
    if depth_left == 0 {
        return;
    }
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                if keys.contains(&k.as_str()) {
                    found.push((k.as_str(), v));
                } else {
                    walk(v, keys, depth_left - 1, found);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                walk(item, keys, depth_left - 1, found);
            }
        }
        _ => {}
    }
}

/// String at a `/`-separated path, e.g. `V_720P/url`.
pub fn str_at<'v>(value: &'v Value, path: &str) -> Option<&'v str> {
    path.split('/')
        .try_fold(value, |v, segment| match v {
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => v.get(segment),
        })
        .and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn finds_nested_keys() {
        let v = json!({"a": {"b": [{"video_list": {"V_720P": {"url": "u"}}}]}, "video_url": "x"});
        let found = find_keys(&v, &["video_list", "video_url"], DEFAULT_MAX_DEPTH);
        assert_eq!(found.len(), 2);
        assert!(found.iter().any(|(k, v)| *k == "video_url" && v.as_str() == Some("x")));
        let (_, list) = found.iter().find(|(k, _)| *k == "video_list").unwrap();
        assert_eq!(str_at(list, "V_720P/url"), Some("u"));
    }

    #[test]
    fn depth_is_bounded() {
        let mut v = json!({"target": 1});
        for _ in 0..100 {
            v = json!({ "n": v });
        }
        assert!(find_keys(&v, &["target"], DEFAULT_MAX_DEPTH).is_empty());
        assert_eq!(find_keys(&v, &["target"], 200).len(), 1);
    }

    #[test]
    fn reads_scripts_and_attributes() {
        let doc = Document::from(
            r#"<script id="__PWS_DATA__" type="application/json">{"props":{"x":1}}</script>
               <script>window.__INITIAL__ = {"y": 2};</script>
               <video data-sources='[{"src":"https://dms.licdn.com/a.mp4"}]'></video>"#,
        );
        assert_eq!(JsonSource::Script("script#__PWS_DATA__").collect(&doc).len(), 1);
        assert_eq!(JsonSource::Script("script:not([id])").collect(&doc)[0]["y"], 2);
        let attr = JsonSource::Attribute {
            selector: "[data-sources]",
            attr: "data-sources",
        }
        .collect(&doc);
        assert_eq!(str_at(&attr[0], "0/src"), Some("https://dms.licdn.com/a.mp4"));
    }
}
