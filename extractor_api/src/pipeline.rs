use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};
use url::Url;

use crate::context::{BrowserProfile, ExtractionContext, Page};
use crate::error::{truncate_message, ErrorKind, ExtractError};
use crate::{Extraction, ExtractionResult, Failure, Platform};

#[derive(Debug)]
pub enum Outcome {
    Found(Extraction),
    /// ran to completion without finding anything
    Exhausted,
    /// its trigger did not apply
    Skipped,
}

/// One step of an extractor's fallback chain.
#[async_trait]
pub trait Strategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn attempt(
        &self,
        ctx: &ExtractionContext,
        state: &mut AttemptState,
    ) -> Result<Outcome, ExtractError>;
}

/// What strategies of one extraction learn along the way.
pub struct AttemptState {
    pub original_url: Url,
    /// moved by redirect resolution and canonical retries
    pub current_url: Url,
    pub errors: Vec<(&'static str, ExtractError)>,
    /// canonical page URL seen in scraped HTML
    pub canonical_hint: Option<Url>,
    pub canonical_retry_used: bool,
    exhausted: bool,
    pages: HashMap<(String, BrowserProfile), Page>,
}

impl AttemptState {
    pub fn new(url: Url) -> Self {
        AttemptState {
            original_url: url.clone(),
            current_url: url,
            errors: vec![],
            canonical_hint: None,
            canonical_retry_used: false,
            exhausted: false,
            pages: HashMap::new(),
        }
    }

    pub fn record(&mut self, strategy: &'static str, error: ExtractError) {
        self.errors.push((strategy, error));
    }

    /// Messages of recorded errors, oldest first.
    pub fn error_messages(&self) -> impl Iterator<Item = String> + '_ {
        self.errors.iter().map(|(_, e)| e.to_string())
    }

    pub fn has_error_kind(&self, kind: ErrorKind) -> bool {
        self.errors.iter().any(|(_, e)| e.kind() == kind)
    }

    /// Fetches a page once per extraction; later calls for the same URL and profile reuse it.
    pub async fn page(
        &mut self,
        ctx: &ExtractionContext,
        url: &Url,
        profile: BrowserProfile,
    ) -> Result<&Page, ExtractError> {
        self.page_within(ctx, url, profile, ctx.config.timeouts.page()).await
    }

    /// Like [`AttemptState::page`] with an explicit ceiling for the first fetch.
    pub async fn page_within(
        &mut self,
        ctx: &ExtractionContext,
        url: &Url,
        profile: BrowserProfile,
        timeout: Duration,
    ) -> Result<&Page, ExtractError> {
        let page = match self.pages.entry((url.to_string(), profile)) {
            Entry::Occupied(hit) => hit.into_mut(),
            Entry::Vacant(slot) => {
                let page = ctx.get_page(url, profile, timeout).await?;
                slot.insert(page)
            }
        };
        if page.is_success() {
            Ok(page)
        } else {
            Err(ExtractError::Status {
                url: url.to_string(),
                status: page.status,
            })
        }
    }

    /// The failure reported when every strategy came up empty.
    pub fn into_failure(self, max_len: usize) -> Failure {
        if let Some((_, fatal)) = self.errors.iter().find(|(_, e)| e.is_fatal()) {
            return Failure::new(ErrorKind::Timeout, fatal.to_string());
        }
        if let Some((kind, e)) = self
            .errors
            .iter()
            .map(|(_, e)| (e.kind(), e))
            .find(|(kind, _)| *kind != ErrorKind::Unknown)
        {
            return Failure::new(kind, truncate_message(&e.to_string(), max_len));
        }
        match self.errors.first() {
            Some((_, e)) if !self.exhausted => {
                Failure::new(ErrorKind::Unknown, truncate_message(&e.to_string(), max_len))
            }
            _ => Failure::new(
                ErrorKind::NoMediaFound,
                format!("no downloadable media found at {}", self.original_url),
            ),
        }
    }
}

/// Ordered fallback chain of one platform.
pub struct Pipeline {
    platform: Platform,
    strategies: Vec<Box<dyn Strategy>>,
}

impl Pipeline {
    pub fn new(platform: Platform) -> Self {
        Pipeline {
            platform,
            strategies: vec![],
        }
    }

    pub fn then(mut self, strategy: impl Strategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub async fn run(&self, ctx: &ExtractionContext, url: &Url) -> ExtractionResult {
        info!(platform = %self.platform, url = %url, "extraction started");
        let mut state = AttemptState::new(url.clone());

        for strategy in &self.strategies {
            let name = strategy.name();
            if let Err(e) = ctx.checkpoint() {
                warn!(platform = %self.platform, strategy = name, error = %e, "giving up");
                state.record(name, e);
                break;
            }
            match strategy.attempt(ctx, &mut state).await {
                Ok(Outcome::Found(mut extraction)) => {
                    info!(platform = %self.platform, strategy = name, media_type = extraction.media.kind(), "media found");
                    extraction.strategy = name.to_string();
                    return ExtractionResult::Success(extraction);
                }
                Ok(Outcome::Exhausted) => {
                    debug!(platform = %self.platform, strategy = name, "exhausted");
                    state.exhausted = true;
                }
                Ok(Outcome::Skipped) => {
                    debug!(platform = %self.platform, strategy = name, "skipped");
                }
                Err(e) => {
                    warn!(platform = %self.platform, strategy = name, error = %e, "strategy failed");
                    let fatal = e.is_fatal();
                    state.record(name, e);
                    if fatal {
                        break;
                    }
                }
            }
        }

        let failure = state.into_failure(ctx.config.max_error_len);
        info!(platform = %self.platform, error_kind = %failure.error_kind, "extraction failed");
        ExtractionResult::Failure(failure)
    }
}
