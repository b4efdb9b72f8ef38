use async_trait::async_trait;
use regex::Regex;
use tracing::info;
use url::Url;

use super::ResolveMedia;
use crate::pipeline::{AttemptState, Outcome, Strategy};
use crate::{ExtractError, ExtractionContext};

/// Rebuilds a canonical URL from a content id the resolver leaked in its errors and
/// resolves that instead. Runs at most once per extraction.
pub struct CanonicalRetry {
    resolve: ResolveMedia,
    id_patterns: Vec<&'static Regex>,
    /// `{id}` is replaced
    template: &'static str,
}

impl CanonicalRetry {
    pub fn new(resolve: ResolveMedia, id_patterns: Vec<&'static Regex>, template: &'static str) -> Self {
        CanonicalRetry {
            resolve,
            id_patterns,
            template,
        }
    }

    fn find_id(&self, state: &AttemptState) -> Option<String> {
        let hint = state.canonical_hint.as_ref().map(Url::to_string);
        state
            .error_messages()
            .chain(hint)
            .find_map(|text| {
                self.id_patterns
                    .iter()
                    .find_map(|re| re.captures(&text).and_then(|c| c.get(1)).map(|m| m.as_str().to_string()))
            })
    }
}

#[async_trait]
impl Strategy for CanonicalRetry {
    fn name(&self) -> &'static str {
        "canonical_retry"
    }

    async fn attempt(
        &self,
        ctx: &ExtractionContext,
        state: &mut AttemptState,
    ) -> Result<Outcome, ExtractError> {
        if state.canonical_retry_used {
            return Ok(Outcome::Skipped);
        }
        let id = match self.find_id(state) {
            Some(id) => id,
            None => return Ok(Outcome::Skipped),
        };
        let canonical = Url::parse(&self.template.replace("{id}", &id))?;
        if canonical == state.current_url {
            return Ok(Outcome::Skipped);
        }

        info!(id = %id, url = %canonical, "retrying with canonical url");
        state.canonical_retry_used = true;
        state.current_url = canonical.clone();
        Ok(match self.resolve.resolve_with(ctx, state, &canonical, None).await? {
            Some(extraction) => Outcome::Found(extraction),
            None => Outcome::Exhausted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context_with, mp4, resolved, StaticFetcher, StaticResolver};
    use once_cell::sync::Lazy;
    use std::sync::Arc;

    static ID_IN_ERROR: Lazy<Regex> = Lazy::new(|| Regex::new(r"facebook.*?(\d{10,20})").unwrap());

    fn strategy() -> CanonicalRetry {
        CanonicalRetry::new(
            ResolveMedia::new(),
            vec![&*ID_IN_ERROR],
            "https://www.facebook.com/reel/{id}",
        )
    }

    #[tokio::test]
    async fn restarts_once_with_canonical_url() {
        let resolver = Arc::new(StaticResolver::new().media(
            "https://www.facebook.com/reel/1787905208566913",
            resolved("reel", vec![mp4("https://video.fbcdn.net/r.mp4", 720)]),
        ));
        let ctx = context_with(Arc::new(StaticFetcher::new()), resolver.clone());
        let mut state =
            AttemptState::new(Url::parse("https://www.facebook.com/share/r/xyz/").unwrap());
        state.record(
            "resolver",
            ExtractError::Resolver("[facebook] 1787905208566913: Cannot parse data".into()),
        );

        let outcome = strategy().attempt(&ctx, &mut state).await.unwrap();
        assert!(matches!(outcome, Outcome::Found(_)));
        assert!(state.canonical_retry_used);

        let again = strategy().attempt(&ctx, &mut state).await.unwrap();
        assert!(matches!(again, Outcome::Skipped));
        assert_eq!(resolver.calls(), 1);
    }

    #[tokio::test]
    async fn no_id_no_retry() {
        let (ctx, _, resolver) = crate::testing::test_context();
        let mut state = AttemptState::new(Url::parse("https://www.facebook.com/watch").unwrap());
        state.record("resolver", ExtractError::Resolver("Cannot parse data".into()));
        assert!(matches!(
            strategy().attempt(&ctx, &mut state).await,
            Ok(Outcome::Skipped)
        ));
        assert_eq!(resolver.calls(), 0);
    }
}
