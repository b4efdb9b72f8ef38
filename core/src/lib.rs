use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use once_cell::sync::Lazy;
use postgrab_extractor_api::url::Url;
pub use postgrab_extractor_api::*;
use serde::Serialize;
use tracing::{error, info};

/// Routing table. Order matters when domain fragments overlap; first match wins.
pub static DEFAULT_EXTRACTOR_LIST: Lazy<Vec<&AnyExtractor>> = Lazy::new(|| {
    let l = vec![].into_iter();

    #[cfg(feature = "instagram")]
    let l = l.chain(postgrab_extractor_instagram::EXTRACTORS.iter());

    #[cfg(feature = "twitch")]
    let l = l.chain(postgrab_extractor_twitch::EXTRACTORS.iter());

    #[cfg(feature = "linkedin")]
    let l = l.chain(postgrab_extractor_linkedin::EXTRACTORS.iter());

    #[cfg(feature = "x")]
    let l = l.chain(postgrab_extractor_x::EXTRACTORS.iter());

    #[cfg(feature = "tiktok")]
    let l = l.chain(postgrab_extractor_tiktok::EXTRACTORS.iter());

    #[cfg(feature = "facebook")]
    let l = l.chain(postgrab_extractor_facebook::EXTRACTORS.iter());

    #[cfg(feature = "youtube")]
    let l = l.chain(postgrab_extractor_youtube::EXTRACTORS.iter());

    #[cfg(feature = "pinterest")]
    let l = l.chain(postgrab_extractor_pinterest::EXTRACTORS.iter());

    l.collect()
});

/// What the dispatcher answers with: the result, tagged with the platform that produced it.
#[derive(Serialize, PartialEq, Clone, Debug)]
pub struct Dispatched {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    pub result: ExtractionResult,
    #[serde(skip)]
    internal_error: bool,
}

impl Dispatched {
    fn new(platform: Option<Platform>, result: ExtractionResult) -> Self {
        Dispatched {
            platform,
            result,
            internal_error: false,
        }
    }

    pub fn is_internal_error(&self) -> bool {
        self.internal_error
    }

    /// Success is 200, a failure 400, and a crashed extractor 500.
    pub fn http_status(&self) -> u16 {
        if self.internal_error {
            500
        } else {
            self.result.http_status()
        }
    }
}

/// Stand-in for hosts nobody handles. Answers without touching the network.
struct Unsupported;

impl Unsupported {
    fn extract(&self, url: &Url) -> ExtractionResult {
        ExtractionResult::failure(
            ErrorKind::UnsupportedPlatform,
            format!("{} is not a supported platform", url.host_str().unwrap_or("this site")),
        )
    }
}

/// Drops what never affects routing.
fn routing_key(url: &Url) -> Url {
    let mut key = url.clone();
    key.set_query(None);
    key.set_fragment(None);
    key
}

/// Trims and validates raw user input. Only absolute http(s) URLs pass.
pub fn parse_input(raw: &str) -> Result<Url, ExtractError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ExtractError::InvalidInput("empty URL".to_string()));
    }
    let url = Url::parse(trimmed)
        .map_err(|e| ExtractError::InvalidInput(format!("{}: {}", trimmed, e)))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        _ => Err(ExtractError::InvalidInput(format!(
            "{} is not an http(s) URL",
            trimmed
        ))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("extractor panicked")
}

pub struct CoreClient<'a> {
    extractors: Vec<&'a AnyExtractor>,
    context: ExtractionContext,
}

impl CoreClient<'static> {
    pub fn new(config: ExtractorConfig) -> Result<Self, ExtractError> {
        Ok(Self::with_context(ExtractionContext::new(config)?))
    }

    /// Client over existing shared state, e.g. in-memory doubles.
    pub fn with_context(context: ExtractionContext) -> Self {
        CoreClient {
            extractors: DEFAULT_EXTRACTOR_LIST.to_vec(),
            context,
        }
    }
}

impl<'a> CoreClient<'a> {
    pub fn with_extractors(context: ExtractionContext, extractors: Vec<&'a AnyExtractor>) -> Self {
        CoreClient {
            extractors,
            context,
        }
    }

    /// Extractor responsible for `url`, if any.
    pub fn route(&self, url: &Url) -> Option<&'a AnyExtractor> {
        let key = routing_key(url);
        self.extractors
            .iter()
            .find(|extractor| extractor.match_extractor(&key))
            .copied()
    }

    pub async fn dispatch(&self, raw: &str) -> Dispatched {
        self.dispatch_with(raw, CancellationToken::new()).await
    }

    /// Like [`CoreClient::dispatch`], abortable through `cancel`.
    pub async fn dispatch_with(&self, raw: &str, cancel: CancellationToken) -> Dispatched {
        let url = match parse_input(raw) {
            Ok(url) => url,
            Err(e) => {
                let result = ExtractionResult::failure(
                    ErrorKind::InvalidInput,
                    truncate_message(&e.to_string(), self.context.config.max_error_len),
                );
                return Dispatched::new(None, result);
            }
        };

        let extractor = match self.route(&url) {
            Some(extractor) => extractor,
            None => {
                info!(url = %url, "no extractor for url");
                return Dispatched::new(None, Unsupported.extract(&url));
            }
        };

        let platform = extractor.platform();
        info!(platform = %platform, url = %url, "dispatching");
        let ctx = self.context.for_request(cancel);
        match AssertUnwindSafe(extractor.extract(&ctx, &url))
            .catch_unwind()
            .await
        {
            Ok(result) => Dispatched::new(Some(platform), result),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(platform = %platform, url = %url, panic = message, "extractor panicked");
                let result = ExtractionResult::Failure(Failure {
                    error_kind: ErrorKind::Unknown,
                    message: format!(
                        "internal error: {}",
                        truncate_message(message, self.context.config.max_error_len)
                    ),
                    suggestion: suggestion_for(ErrorKind::Unknown).map(str::to_string),
                });
                Dispatched {
                    platform: Some(platform),
                    result,
                    internal_error: true,
                }
            }
        }
    }
}
