//! `application/ld+json` structured data.

use nipper::Document;
use serde::de::IgnoredAny;
use serde::Deserialize;
use serde_aux::prelude::*;

use crate::Media;

#[derive(Deserialize, Clone, Debug)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    // before `One`: derived structs also accept sequences
    Many(Vec<T>),
    One(T),
    /// anything of another shape, ignored
    Other(IgnoredAny),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(vec![])
    }
}

impl<T> OneOrMany<T> {
    pub fn as_slice(&self) -> &[T] {
        match self {
            OneOrMany::One(one) => std::slice::from_ref(one),
            OneOrMany::Many(many) => many,
            OneOrMany::Other(_) => &[],
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
#[serde(untagged)]
pub enum ImageRef {
    Url(String),
    Object {
        #[serde(rename = "contentUrl")]
        content_url: Option<String>,
        url: Option<String>,
    },
}

impl ImageRef {
    pub fn url(&self) -> Option<&str> {
        match self {
            ImageRef::Url(u) => Some(u),
            ImageRef::Object { content_url, url } => content_url.as_deref().or(url.as_deref()),
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
#[serde(untagged)]
pub enum Person {
    Name(String),
    Object { name: Option<String> },
}

#[derive(Deserialize, Default, Clone, Debug)]
#[serde(default)]
pub struct Node {
    #[serde(rename = "@type", deserialize_with = "deserialize_default_from_null")]
    pub types: OneOrMany<String>,
    #[serde(rename = "@graph", deserialize_with = "deserialize_default_from_null")]
    pub graph: Vec<Node>,
    #[serde(rename = "contentUrl")]
    pub content_url: Option<String>,
    pub url: Option<String>,
    pub name: Option<String>,
    pub headline: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "thumbnailUrl", deserialize_with = "deserialize_default_from_null")]
    pub thumbnail_url: OneOrMany<String>,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub image: OneOrMany<ImageRef>,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub video: OneOrMany<Box<Node>>,
    #[serde(deserialize_with = "deserialize_default_from_null")]
    pub author: OneOrMany<Person>,
}

impl Node {
    pub fn is(&self, kind: &str) -> bool {
        self.types.as_slice().iter().any(|t| t == kind)
    }

    fn image_urls(&self) -> Vec<String> {
        self.image
            .as_slice()
            .iter()
            .filter_map(ImageRef::url)
            .filter(|u| u.starts_with("http"))
            .map(str::to_string)
            .collect()
    }

    fn video_url(&self) -> Option<String> {
        self.content_url.clone().filter(|u| u.starts_with("http"))
    }

    /// The media this node alone points at.
    pub fn media(&self) -> Option<Media> {
        if self.is("VideoObject") {
            return self.video_url().map(Media::Video);
        }
        if self.is("ImageObject") {
            return self
                .content_url
                .clone()
                .or_else(|| self.url.clone())
                .filter(|u| u.starts_with("http"))
                .map(Media::Image);
        }
        if self.is("SocialMediaPosting") || self.is("Article") || self.is("NewsArticle") {
            let mut images = self.image_urls();
            if images.len() >= 2 {
                return Some(Media::Gallery(images));
            }
            if let Some(video) = self.video.as_slice().iter().find_map(|n| n.video_url()) {
                return Some(Media::Video(video));
            }
            return images.pop().map(Media::Image);
        }
        None
    }
}

/// Media found in structured data together with whatever metadata came with it.
#[derive(PartialEq, Clone, Debug)]
pub struct LdMedia {
    pub media: Media,
    pub title: Option<String>,
    pub description: Option<String>,
    pub uploader: Option<String>,
    pub thumbnail: Option<String>,
}

/// Every node of every parseable block, `@graph` members flattened in, in document order.
pub fn nodes(doc: &Document) -> Vec<Node> {
    let mut out = vec![];
    for script in doc.select(r#"script[type="application/ld+json"]"#).iter() {
        let text = script.text();
        let parsed: Result<OneOrMany<Node>, _> = serde_json::from_str(text.trim());
        if let Ok(block) = parsed {
            for node in block.as_slice() {
                flatten(node, &mut out);
            }
        }
    }
    out
}

fn flatten(node: &Node, out: &mut Vec<Node>) {
    out.push(node.clone());
    for member in &node.graph {
        flatten(member, out);
    }
}

pub fn find_media(doc: &Document) -> Option<LdMedia> {
    nodes(doc).into_iter().find_map(|node| {
        node.media().map(|media| LdMedia {
            media,
            title: node.headline.clone().or_else(|| node.name.clone()),
            description: node.description.clone(),
            uploader: node.author.as_slice().iter().find_map(|a| match a {
                Person::Name(n) => Some(n.clone()),
                Person::Object { name } => name.clone(),
            }),
            thumbnail: node.thumbnail_url.as_slice().first().cloned(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn page(blocks: &[&str]) -> Document {
        let scripts: String = blocks
            .iter()
            .map(|b| format!(r#"<script type="application/ld+json">{b}</script>"#))
            .collect();
        Document::from(format!("<html><head>{scripts}</head><body></body></html>").as_str())
    }

    #[test]
    fn video_object() {
        let doc = page(&[
            r#"{"@context":"https://schema.org","@type":"VideoObject","name":"clip","contentUrl":"https://cdn.example/clip.mp4","thumbnailUrl":["https://cdn.example/t.jpg"]}"#,
        ]);
        let found = find_media(&doc).unwrap();
        assert_eq!(found.media, Media::Video("https://cdn.example/clip.mp4".into()));
        assert_eq!(found.title.as_deref(), Some("clip"));
        assert_eq!(found.thumbnail.as_deref(), Some("https://cdn.example/t.jpg"));
    }

    #[test]
    fn posting_with_images_is_gallery() {
        let doc = page(&[
            r#"{"@type":"SocialMediaPosting","headline":"post","author":{"@type":"Person","name":"Ann"},
                "image":["https://media.licdn.com/1.jpg",{"@type":"ImageObject","url":"https://media.licdn.com/2.jpg"}]}"#,
        ]);
        let found = find_media(&doc).unwrap();
        assert_eq!(
            found.media,
            Media::Gallery(vec![
                "https://media.licdn.com/1.jpg".into(),
                "https://media.licdn.com/2.jpg".into()
            ])
        );
        assert_eq!(found.uploader.as_deref(), Some("Ann"));
    }

    #[test]
    fn posting_with_nested_video() {
        let doc = page(&[
            r#"{"@type":"SocialMediaPosting","headline":"clip post",
                "image":"https://media.licdn.com/poster.jpg",
                "video":{"@type":"VideoObject","contentUrl":"https://dms.licdn.com/playlist/vid/1.mp4"}}"#,
        ]);
        let found = find_media(&doc).unwrap();
        assert_eq!(found.media, Media::Video("https://dms.licdn.com/playlist/vid/1.mp4".into()));
        assert_eq!(found.title.as_deref(), Some("clip post"));
    }

    #[test]
    fn malformed_blocks_are_skipped() {
        let doc = page(&[
            "{not json",
            r#"{"@graph":[{"@type":"WebPage"},{"@type":"ImageObject","contentUrl":"https://i.example/a.png"}]}"#,
        ]);
        assert_eq!(
            find_media(&doc).map(|f| f.media),
            Some(Media::Image("https://i.example/a.png".into()))
        );
    }

    #[test]
    fn odd_shapes_do_not_break_parsing() {
        let doc = page(&[
            r#"{"@type":["VideoObject"],"image":42,"author":null,"contentUrl":"https://cdn.example/x.mp4"}"#,
        ]);
        assert_eq!(
            find_media(&doc).map(|f| f.media),
            Some(Media::Video("https://cdn.example/x.mp4".into()))
        );
    }
}
