use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use super::media_for;
use crate::config::clamped;
use crate::pipeline::{AttemptState, Outcome, Strategy};
use crate::ranking;
use crate::resolver::{ResolveOptions, ResolvedMedia};
use crate::{ExtractError, Extraction, ExtractionContext, MediaCandidate};

pub type Finish = fn(&ResolvedMedia, &AttemptState, &mut Extraction);

/// Asks the General Media Resolver and keeps the best acceptable candidate.
#[derive(Clone)]
pub struct ResolveMedia {
    name: &'static str,
    format: Option<&'static str>,
    headers: Vec<(String, String)>,
    user_agent: Option<&'static str>,
    timeout_secs: Option<u64>,
    accept: fn(&MediaCandidate) -> bool,
    reject_input: bool,
    rewrite: Option<fn(&Url) -> Option<Url>>,
    trigger: Option<fn(&AttemptState) -> bool>,
    finish: Option<Finish>,
}

impl Default for ResolveMedia {
    fn default() -> Self {
        ResolveMedia {
            name: "resolver",
            format: None,
            headers: vec![],
            user_agent: None,
            timeout_secs: None,
            accept: MediaCandidate::is_playable,
            reject_input: false,
            rewrite: None,
            trigger: None,
            finish: None,
        }
    }
}

impl ResolveMedia {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub fn format(mut self, format: &'static str) -> Self {
        self.format = Some(format);
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn user_agent(mut self, ua: &'static str) -> Self {
        self.user_agent = Some(ua);
        self
    }

    /// Overrides the configured resolver timeout; still clamped.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn accept(mut self, accept: fn(&MediaCandidate) -> bool) -> Self {
        self.accept = accept;
        self
    }

    /// Candidates pointing back at the post itself are not media.
    pub fn reject_input_url(mut self) -> Self {
        self.reject_input = true;
        self
    }

    /// Resolve another URL derived from the current one; `None` skips.
    pub fn rewrite(mut self, rewrite: fn(&Url) -> Option<Url>) -> Self {
        self.rewrite = Some(rewrite);
        self
    }

    /// Only run when the state says so.
    pub fn when(mut self, trigger: fn(&AttemptState) -> bool) -> Self {
        self.trigger = Some(trigger);
        self
    }

    pub fn finish(mut self, finish: Finish) -> Self {
        self.finish = Some(finish);
        self
    }

    pub fn options(&self, ctx: &ExtractionContext, identity: Option<&str>) -> ResolveOptions {
        ResolveOptions {
            format: self.format.map(str::to_string),
            headers: self.headers.clone(),
            identity: identity.map(str::to_string),
            user_agent: self.user_agent.map(str::to_string),
            timeout: match self.timeout_secs {
                Some(secs) => clamped(secs),
                None => ctx.config.timeouts.resolver(),
            },
        }
    }

    /// Usable candidates, best first. With a format selector, its pick leads.
    pub fn candidates(&self, resolved: &ResolvedMedia, state: &AttemptState) -> Vec<MediaCandidate> {
        let usable = |c: &MediaCandidate| {
            (self.accept)(c)
                && !(self.reject_input
                    && (c.url == state.original_url.as_str() || c.url == state.current_url.as_str()))
        };
        let mut ranked = ranking::rank(resolved.formats.iter().filter(|c| usable(c)).cloned());
        match resolved.picked().filter(|c| usable(c)) {
            Some(picked) if self.format.is_some() || ranked.is_empty() => {
                ranked.retain(|c| c.url != picked.url);
                ranked.insert(0, picked);
            }
            _ => {}
        }
        ranked
    }

    /// One resolver round for `url`.
    pub async fn resolve_with(
        &self,
        ctx: &ExtractionContext,
        state: &AttemptState,
        url: &Url,
        identity: Option<&str>,
    ) -> Result<Option<Extraction>, ExtractError> {
        let resolved = ctx.resolve(url, &self.options(ctx, identity)).await?;
        Ok(self.build(&resolved, state))
    }

    fn build(&self, resolved: &ResolvedMedia, state: &AttemptState) -> Option<Extraction> {
        let candidates = self.candidates(resolved, state);
        let best = candidates.first()?;
        let mut extraction = Extraction::new(media_for(best));
        extraction.title = resolved.title.clone().unwrap_or_default();
        extraction.uploader = resolved.uploader.clone().unwrap_or_default();
        extraction.duration_seconds = resolved.duration.map(|d| d.round() as u64);
        extraction.thumbnail_url = resolved.thumbnail.clone();
        extraction.description = resolved.description.clone();
        extraction.webpage_url = resolved.webpage_url.clone();
        extraction.view_count = resolved.view_count;
        extraction.candidates = candidates;
        if let Some(finish) = self.finish {
            finish(resolved, state, &mut extraction);
        }
        Some(extraction)
    }

    pub fn timeout(&self, ctx: &ExtractionContext) -> Duration {
        self.options(ctx, None).timeout
    }
}

#[async_trait]
impl Strategy for ResolveMedia {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn attempt(
        &self,
        ctx: &ExtractionContext,
        state: &mut AttemptState,
    ) -> Result<Outcome, ExtractError> {
        if let Some(trigger) = self.trigger {
            if !trigger(state) {
                return Ok(Outcome::Skipped);
            }
        }
        let url = match self.rewrite {
            Some(rewrite) => match rewrite(&state.current_url) {
                Some(url) => url,
                None => return Ok(Outcome::Skipped),
            },
            None => state.current_url.clone(),
        };
        Ok(match self.resolve_with(ctx, state, &url, None).await? {
            Some(extraction) => Outcome::Found(extraction),
            None => Outcome::Exhausted,
        })
    }
}
