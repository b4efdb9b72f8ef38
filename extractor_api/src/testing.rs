//! In-memory doubles for the fetcher and the resolver. They never touch the network and
//! count every call they receive.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use url::Url;

use crate::config::ExtractorConfig;
use crate::context::{ExtractionContext, Fetcher, Page};
use crate::error::ExtractError;
use crate::resolver::{MediaResolver, ResolveOptions, ResolvedMedia};
use crate::MediaCandidate;

#[derive(Clone, Debug)]
enum PageReply {
    Page { status: u16, body: String, final_url: String },
    Hang,
}

/// Serves canned pages. Unknown URLs answer 404.
#[derive(Default)]
pub struct StaticFetcher {
    gets: HashMap<String, PageReply>,
    posts: HashMap<String, PageReply>,
    calls: AtomicUsize,
    log: Mutex<Vec<(String, HeaderMap)>>,
    forms: Mutex<Vec<(String, Vec<(String, String)>)>>,
    timeouts: Mutex<Vec<(String, Duration)>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(self, url: &str, body: &str) -> Self {
        self.status_page(url, 200, body)
    }

    pub fn status_page(mut self, url: &str, status: u16, body: &str) -> Self {
        self.gets.insert(
            url.to_string(),
            PageReply::Page {
                status,
                body: body.to_string(),
                final_url: url.to_string(),
            },
        );
        self
    }

    /// `from` ends up at `to` after redirects.
    pub fn redirect(mut self, from: &str, to: &str, body: &str) -> Self {
        self.gets.insert(
            from.to_string(),
            PageReply::Page {
                status: 200,
                body: body.to_string(),
                final_url: to.to_string(),
            },
        );
        self
    }

    pub fn post(mut self, url: &str, body: &str) -> Self {
        self.posts.insert(
            url.to_string(),
            PageReply::Page {
                status: 200,
                body: body.to_string(),
                final_url: url.to_string(),
            },
        );
        self
    }

    /// Never answers.
    pub fn hang(mut self, url: &str) -> Self {
        self.gets.insert(url.to_string(), PageReply::Hang);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requested URLs with the headers sent, in order.
    pub fn requests(&self) -> Vec<(String, HeaderMap)> {
        self.log.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// Posted URLs with their form fields, in order.
    pub fn forms(&self) -> Vec<(String, Vec<(String, String)>)> {
        self.forms.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// Requested URLs with the ceiling each request was given.
    pub fn timeouts(&self) -> Vec<(String, Duration)> {
        self.timeouts.lock().map(|l| l.clone()).unwrap_or_default()
    }

    async fn reply(
        &self,
        table: &HashMap<String, PageReply>,
        url: &Url,
        headers: HeaderMap,
        timeout: Duration,
    ) -> Result<Page, ExtractError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut log) = self.log.lock() {
            log.push((url.to_string(), headers));
        }
        if let Ok(mut timeouts) = self.timeouts.lock() {
            timeouts.push((url.to_string(), timeout));
        }
        match table.get(url.as_str()) {
            Some(PageReply::Page {
                status,
                body,
                final_url,
            }) => Ok(Page {
                status: *status,
                body: body.clone(),
                final_url: Url::parse(final_url)?,
                headers: HeaderMap::new(),
            }),
            Some(PageReply::Hang) => std::future::pending().await,
            None => Ok(Page {
                status: 404,
                body: String::new(),
                final_url: url.clone(),
                headers: HeaderMap::new(),
            }),
        }
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn get(&self, url: &Url, headers: HeaderMap, timeout: Duration) -> Result<Page, ExtractError> {
        self.reply(&self.gets, url, headers, timeout).await
    }

    async fn post_form(
        &self,
        url: &Url,
        form: &[(&str, &str)],
        headers: HeaderMap,
        timeout: Duration,
    ) -> Result<Page, ExtractError> {
        if let Ok(mut forms) = self.forms.lock() {
            let fields = form.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
            forms.push((url.to_string(), fields));
        }
        self.reply(&self.posts, url, headers, timeout).await
    }
}

#[derive(Clone, Debug)]
enum ResolveReply {
    Media(ResolvedMedia),
    Fail(String),
    Locked,
    Hang,
}

/// Canned resolver answers keyed by URL and, optionally, identity source.
/// Unknown URLs fail like yt-dlp does on sites it has no extractor for.
#[derive(Default)]
pub struct StaticResolver {
    replies: HashMap<(String, Option<String>), ResolveReply>,
    /// answers for a specific `--format` selector, checked first
    by_format: HashMap<(String, String), ResolveReply>,
    calls: AtomicUsize,
    log: Mutex<Vec<(String, ResolveOptions)>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn media(self, url: &str, media: ResolvedMedia) -> Self {
        self.reply(url, None, ResolveReply::Media(media))
    }

    pub fn fail(self, url: &str, message: &str) -> Self {
        self.reply(url, None, ResolveReply::Fail(message.to_string()))
    }

    pub fn hang(self, url: &str) -> Self {
        self.reply(url, None, ResolveReply::Hang)
    }

    pub fn media_with_identity(self, url: &str, identity: &str, media: ResolvedMedia) -> Self {
        self.reply(url, Some(identity), ResolveReply::Media(media))
    }

    /// Answer only when asked with this format selector.
    pub fn media_with_format(mut self, url: &str, format: &str, media: ResolvedMedia) -> Self {
        self.by_format
            .insert((url.to_string(), format.to_string()), ResolveReply::Media(media));
        self
    }

    pub fn locked_identity(self, url: &str, identity: &str) -> Self {
        self.reply(url, Some(identity), ResolveReply::Locked)
    }

    fn reply(mut self, url: &str, identity: Option<&str>, reply: ResolveReply) -> Self {
        self.replies
            .insert((url.to_string(), identity.map(str::to_string)), reply);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<(String, ResolveOptions)> {
        self.log.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl MediaResolver for StaticResolver {
    async fn resolve(&self, url: &Url, options: &ResolveOptions) -> Result<ResolvedMedia, ExtractError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut log) = self.log.lock() {
            log.push((url.to_string(), options.clone()));
        }
        let by_format = options
            .format
            .as_ref()
            .and_then(|f| self.by_format.get(&(url.to_string(), f.clone())));
        let reply = by_format
            .or_else(|| self.replies.get(&(url.to_string(), options.identity.clone())))
            .or_else(|| self.replies.get(&(url.to_string(), None)))
            .cloned();
        match reply {
            Some(ResolveReply::Media(media)) => Ok(media),
            Some(ResolveReply::Fail(message)) => Err(ExtractError::Resolver(message)),
            Some(ResolveReply::Locked) => Err(ExtractError::IdentityLocked {
                source_name: options.identity.clone().unwrap_or_default(),
                detail: "Could not copy Chrome cookie database".to_string(),
            }),
            Some(ResolveReply::Hang) => std::future::pending().await,
            None => Err(ExtractError::Resolver(format!("Unsupported URL: {}", url))),
        }
    }
}

/// A muxed mp4 candidate.
pub fn mp4(url: &str, height: u32) -> MediaCandidate {
    MediaCandidate {
        url: url.to_string(),
        width: Some(height * 16 / 9),
        height: Some(height),
        bitrate: Some(height as f64 * 2.0),
        codec_video: Some("avc1.64001F".to_string()),
        codec_audio: Some("mp4a.40.2".to_string()),
        container_ext: "mp4".to_string(),
        filesize_bytes: None,
        protocol: "https".to_string(),
    }
}

/// Resolver answer with a title and the given formats.
pub fn resolved(title: &str, formats: Vec<MediaCandidate>) -> ResolvedMedia {
    ResolvedMedia {
        title: Some(title.to_string()),
        uploader: Some("uploader".to_string()),
        duration: Some(30.0),
        thumbnail: Some("https://img.example/thumb.jpg".to_string()),
        formats,
        ..Default::default()
    }
}

pub fn context_with(fetcher: Arc<StaticFetcher>, resolver: Arc<StaticResolver>) -> ExtractionContext {
    context_with_config(ExtractorConfig::default(), fetcher, resolver)
}

pub fn context_with_config(
    config: ExtractorConfig,
    fetcher: Arc<StaticFetcher>,
    resolver: Arc<StaticResolver>,
) -> ExtractionContext {
    ExtractionContext::with_parts(config, vec!["en-US".to_string()], fetcher, resolver)
}

/// Context over empty doubles.
pub fn test_context() -> (ExtractionContext, Arc<StaticFetcher>, Arc<StaticResolver>) {
    let fetcher = Arc::new(StaticFetcher::new());
    let resolver = Arc::new(StaticResolver::new());
    (
        context_with(fetcher.clone(), resolver.clone()),
        fetcher,
        resolver,
    )
}
