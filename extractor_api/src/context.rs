use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use sys_locale::get_locale;
use tokio::time::Instant;
use url::Url;

use crate::cancel::CancellationToken;
use crate::config::ExtractorConfig;
use crate::error::ExtractError;
use crate::resolver::{MediaResolver, ResolveOptions, ResolvedMedia, YtDlpResolver};

const DESKTOP_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const MOBILE_UA: &str = "Mozilla/5.0 (Linux; Android 10; SM-G960F) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Mobile Safari/537.36";

/// A fetched page, after redirects.
#[derive(Clone, Debug)]
pub struct Page {
    pub status: u16,
    pub body: String,
    pub final_url: Url,
    pub headers: HeaderMap,
}

impl Page {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Header sets that make a request look like it came from a real browser.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub enum BrowserProfile {
    Desktop,
    /// mobile pages tend to skip login walls and carry simpler markup
    Mobile,
}

impl BrowserProfile {
    pub fn user_agent(&self) -> &'static str {
        match self {
            BrowserProfile::Desktop => DESKTOP_UA,
            BrowserProfile::Mobile => MOBILE_UA,
        }
    }

    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, HeaderValue::from_static(self.user_agent()));
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
            ),
        );
        if *self == BrowserProfile::Mobile {
            headers.insert(header::REFERER, HeaderValue::from_static("https://www.google.com/"));
        }
        headers
    }
}

/// The Generic Fetcher seam.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn get(&self, url: &Url, headers: HeaderMap, timeout: Duration) -> Result<Page, ExtractError>;

    async fn post_form(
        &self,
        url: &Url,
        form: &[(&str, &str)],
        headers: HeaderMap,
        timeout: Duration,
    ) -> Result<Page, ExtractError>;
}

pub struct HttpFetcher {
    http: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(http: reqwest::Client) -> Self {
        HttpFetcher { http }
    }

    async fn into_page(response: reqwest::Response) -> Result<Page, ExtractError> {
        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let headers = response.headers().clone();
        let body = response.text().await?;
        Ok(Page {
            status,
            body,
            final_url,
            headers,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get(&self, url: &Url, headers: HeaderMap, timeout: Duration) -> Result<Page, ExtractError> {
        let response = self
            .http
            .get(url.clone())
            .headers(headers)
            .timeout(timeout)
            .send()
            .await?;
        Self::into_page(response).await
    }

    async fn post_form(
        &self,
        url: &Url,
        form: &[(&str, &str)],
        headers: HeaderMap,
        timeout: Duration,
    ) -> Result<Page, ExtractError> {
        let response = self
            .http
            .post(url.clone())
            .form(form)
            .headers(headers)
            .timeout(timeout)
            .send()
            .await?;
        Self::into_page(response).await
    }
}

/// Everything a strategy may touch while extracting one URL.
///
/// The client state is shared and immutable; the deadline and cancellation token are
/// per request, see [`ExtractionContext::for_request`].
#[derive(Clone)]
pub struct ExtractionContext {
    pub fetcher: Arc<dyn Fetcher>,
    pub resolver: Arc<dyn MediaResolver>,
    pub config: Arc<ExtractorConfig>,
    pub locales: Vec<String>,
    deadline: Instant,
    cancel: CancellationToken,
}

impl ExtractionContext {
    pub fn new(config: ExtractorConfig) -> Result<ExtractionContext, ExtractError> {
        let locales = config.locales.clone().unwrap_or_else(system_locales);
        let http = build_http(&locales, config.proxy.as_deref())?;
        let resolver = YtDlpResolver::new(&config.resolver_path, config.proxy.clone());
        Ok(Self::with_parts(
            config,
            locales,
            Arc::new(HttpFetcher::new(http)),
            Arc::new(resolver),
        ))
    }

    pub fn with_parts(
        config: ExtractorConfig,
        locales: Vec<String>,
        fetcher: Arc<dyn Fetcher>,
        resolver: Arc<dyn MediaResolver>,
    ) -> ExtractionContext {
        let deadline = Instant::now() + config.overall_deadline();
        ExtractionContext {
            fetcher,
            resolver,
            config: Arc::new(config),
            locales,
            deadline,
            cancel: CancellationToken::new(),
        }
    }

    /// Same client state, fresh deadline, given cancellation token.
    pub fn for_request(&self, cancel: CancellationToken) -> ExtractionContext {
        ExtractionContext {
            deadline: Instant::now() + self.config.overall_deadline(),
            cancel,
            ..self.clone()
        }
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Fails once the extraction was cancelled or ran out of time.
    pub fn checkpoint(&self) -> Result<(), ExtractError> {
        if self.cancel.is_cancelled() {
            Err(ExtractError::Cancelled)
        } else if self.remaining().is_zero() {
            Err(ExtractError::DeadlineExceeded)
        } else {
            Ok(())
        }
    }

    /// Runs `op` under its own ceiling, the overall deadline and the cancellation token.
    pub async fn bounded<T, F>(&self, operation: &str, limit: Duration, op: F) -> Result<T, ExtractError>
    where
        F: Future<Output = Result<T, ExtractError>>,
    {
        self.checkpoint()?;
        let remaining = self.remaining();
        let (effective, hits_deadline) = if remaining < limit {
            (remaining, true)
        } else {
            (limit, false)
        };
        tokio::select! {
            res = tokio::time::timeout(effective, op) => match res {
                Ok(inner) => inner,
                Err(_) if hits_deadline => Err(ExtractError::DeadlineExceeded),
                Err(_) => Err(ExtractError::Timeout {
                    operation: operation.to_string(),
                    seconds: effective.as_secs(),
                }),
            },
            _ = self.cancel.cancelled() => Err(ExtractError::Cancelled),
        }
    }

    pub async fn get_page(
        &self,
        url: &Url,
        profile: BrowserProfile,
        timeout: Duration,
    ) -> Result<Page, ExtractError> {
        let op = format!("fetching {}", url);
        self.bounded(&op, timeout, self.fetcher.get(url, profile.headers(), timeout))
            .await
    }

    pub async fn post_form(
        &self,
        url: &Url,
        form: &[(&str, &str)],
        headers: HeaderMap,
        timeout: Duration,
    ) -> Result<Page, ExtractError> {
        let op = format!("posting to {}", url);
        self.bounded(&op, timeout, self.fetcher.post_form(url, form, headers, timeout))
            .await
    }

    pub async fn resolve(&self, url: &Url, options: &ResolveOptions) -> Result<ResolvedMedia, ExtractError> {
        let op = format!("resolving {}", url);
        self.bounded(&op, options.timeout, self.resolver.resolve(url, options))
            .await
    }
}

fn system_locales() -> Vec<String> {
    let locale = get_locale()
        .filter(|l| l != "c" && l != "C")
        .unwrap_or_else(|| "en-US".to_string());

    if locale.len() > 2 {
        vec![locale.clone(), locale[0..2].to_string()]
    } else {
        vec![locale]
    }
}

pub fn build_http(locales: &[String], proxy: Option<&str>) -> Result<reqwest::Client, ExtractError> {
    let mut headers = HeaderMap::new();
    // default, overriden by the browser profiles
    headers.insert(header::USER_AGENT, HeaderValue::from_static(DESKTOP_UA));
    let accept_language = locales
        .iter()
        .enumerate()
        .map(|(i, l)| {
            if i != 0 {
                format!("{l};q={}", 1.0 - (i as f32 / 10.0))
            } else {
                l.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(",");
    if let Ok(value) = HeaderValue::from_str(&accept_language) {
        headers.insert(header::ACCEPT_LANGUAGE, value);
    }

    let mut builder = reqwest::ClientBuilder::new()
        .default_headers(headers)
        .cookie_store(true)
        .connect_timeout(Duration::from_secs(10));
    if let Some(proxy) = proxy {
        builder = builder.proxy(reqwest::Proxy::all(proxy)?);
    }
    Ok(builder.build()?)
}
