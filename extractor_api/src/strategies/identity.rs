use async_trait::async_trait;
use tracing::{info, warn};

use super::ResolveMedia;
use crate::pipeline::{AttemptState, Outcome, Strategy};
use crate::{ErrorKind, ExtractError, ExtractionContext};

/// Re-runs the resolver with a browser session borrowed from each configured identity
/// source in turn. A locked source is skipped, never fatal.
pub struct IdentityRetry {
    resolve: ResolveMedia,
    trigger: fn(&AttemptState) -> bool,
}

/// Stories always need a session; otherwise only an auth wall warrants one.
pub fn needs_identity(state: &AttemptState) -> bool {
    state.current_url.path().contains("/stories/")
        || state.has_error_kind(ErrorKind::AuthRequired)
        || state
            .error_messages()
            .any(|m| m.to_lowercase().contains("user info"))
}

impl IdentityRetry {
    pub fn new(resolve: ResolveMedia) -> Self {
        IdentityRetry {
            resolve,
            trigger: needs_identity,
        }
    }

    pub fn when(mut self, trigger: fn(&AttemptState) -> bool) -> Self {
        self.trigger = trigger;
        self
    }
}

#[async_trait]
impl Strategy for IdentityRetry {
    fn name(&self) -> &'static str {
        "identity_retry"
    }

    async fn attempt(
        &self,
        ctx: &ExtractionContext,
        state: &mut AttemptState,
    ) -> Result<Outcome, ExtractError> {
        if !(self.trigger)(state) || ctx.config.identity_sources.is_empty() {
            return Ok(Outcome::Skipped);
        }

        let url = state.current_url.clone();
        let mut last_error = None;
        let mut resolved_any = false;
        for source in &ctx.config.identity_sources {
            info!(source = %source, url = %url, "retrying with browser session");
            match self.resolve.resolve_with(ctx, state, &url, Some(source.as_str())).await {
                Ok(Some(extraction)) => return Ok(Outcome::Found(extraction)),
                Ok(None) => resolved_any = true,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    match &e {
                        ExtractError::IdentityLocked { .. } => {
                            warn!(source = %source, error = %e, "identity source locked, skipping")
                        }
                        _ => warn!(source = %source, error = %e, "retry with browser session failed"),
                    }
                    if let Some(previous) = last_error.replace(e) {
                        state.record(self.name(), previous);
                    }
                }
            }
        }

        match last_error {
            Some(e) if !resolved_any => Err(e),
            Some(e) => {
                state.record(self.name(), e);
                Ok(Outcome::Exhausted)
            }
            None => Ok(Outcome::Exhausted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context_with, context_with_config, mp4, resolved, StaticFetcher, StaticResolver};
    use crate::ExtractorConfig;
    use std::sync::Arc;
    use url::Url;

    const STORY: &str = "https://www.instagram.com/stories/someone/1/";

    #[tokio::test]
    async fn locked_source_falls_through_to_next() {
        let resolver = Arc::new(
            StaticResolver::new()
                .fail(STORY, "ERROR: unable to extract user info")
                .locked_identity(STORY, "chrome")
                .media_with_identity(STORY, "edge", resolved("story", vec![mp4("https://v/s.mp4", 720)])),
        );
        let ctx = context_with(Arc::new(StaticFetcher::new()), resolver.clone());
        let mut state = AttemptState::new(Url::parse(STORY).unwrap());
        let outcome = IdentityRetry::new(ResolveMedia::new())
            .attempt(&ctx, &mut state)
            .await
            .unwrap();
        assert!(matches!(outcome, Outcome::Found(_)));
        let identities: Vec<_> = resolver
            .requests()
            .into_iter()
            .map(|(_, o)| o.identity)
            .collect();
        assert_eq!(identities, vec![Some("chrome".to_string()), Some("edge".to_string())]);
    }

    #[tokio::test]
    async fn all_sources_locked_reports_auth() {
        let resolver = StaticResolver::new()
            .locked_identity(STORY, "chrome")
            .locked_identity(STORY, "edge");
        let ctx = context_with(Arc::new(StaticFetcher::new()), Arc::new(resolver));
        let mut state = AttemptState::new(Url::parse(STORY).unwrap());
        let err = IdentityRetry::new(ResolveMedia::new())
            .attempt(&ctx, &mut state)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AuthRequired);
        assert_eq!(state.errors.len(), 1);
    }

    #[tokio::test]
    async fn public_post_without_auth_error_skips() {
        let config = ExtractorConfig::default();
        let resolver = Arc::new(StaticResolver::new());
        let ctx = context_with_config(config, Arc::new(StaticFetcher::new()), resolver.clone());
        let mut state = AttemptState::new(Url::parse("https://www.instagram.com/p/abc/").unwrap());
        state.record("resolver", ExtractError::Resolver("Unsupported URL".into()));
        let outcome = IdentityRetry::new(ResolveMedia::new()).attempt(&ctx, &mut state).await;
        assert!(matches!(outcome, Ok(Outcome::Skipped)));
        assert_eq!(resolver.calls(), 0);
    }

    #[tokio::test]
    async fn no_sources_configured_skips() {
        let config = ExtractorConfig {
            identity_sources: vec![],
            ..Default::default()
        };
        let ctx = context_with_config(config, Arc::new(StaticFetcher::new()), Arc::new(StaticResolver::new()));
        let mut state = AttemptState::new(Url::parse(STORY).unwrap());
        let outcome = IdentityRetry::new(ResolveMedia::new()).attempt(&ctx, &mut state).await;
        assert!(matches!(outcome, Ok(Outcome::Skipped)));
    }
}
