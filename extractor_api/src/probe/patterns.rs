use regex::Regex;

use super::text::unescape;
use super::MediaKind;

/// One regex hunt over raw page text.
#[derive(Clone)]
pub struct PatternProbe {
    pub name: &'static str,
    /// group 1 if present, else the whole match
    pub regex: &'static Regex,
    pub kind: MediaKind,
    /// the first match containing any of these wins; otherwise the first match
    pub prefer: &'static [&'static str],
    pub skip: &'static [&'static str],
    pub transform: Option<fn(&str) -> Option<String>>,
}

impl PatternProbe {
    pub fn new(name: &'static str, regex: &'static Regex, kind: MediaKind) -> Self {
        PatternProbe {
            name,
            regex,
            kind,
            prefer: &[],
            skip: &[],
            transform: None,
        }
    }

    pub fn prefer(mut self, prefer: &'static [&'static str]) -> Self {
        self.prefer = prefer;
        self
    }

    pub fn skip(mut self, skip: &'static [&'static str]) -> Self {
        self.skip = skip;
        self
    }

    pub fn transform(mut self, transform: fn(&str) -> Option<String>) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn find(&self, haystack: &str) -> Option<String> {
        let matches: Vec<String> = self
            .regex
            .captures_iter(haystack)
            .filter_map(|caps| caps.get(1).or_else(|| caps.get(0)))
            .map(|m| unescape(m.as_str()))
            .filter_map(|m| match self.transform {
                Some(transform) => transform(&m),
                None => Some(m),
            })
            .filter(|m| !self.skip.iter().any(|s| m.contains(s)))
            .collect();
        matches
            .iter()
            .find(|m| self.prefer.iter().any(|p| m.contains(p)))
            .or_else(|| matches.first())
            .cloned()
    }
}
