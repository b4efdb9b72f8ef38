use async_trait::async_trait;
use tracing::debug;
use url::Url;

use super::bare_extraction;
use crate::pipeline::{AttemptState, Outcome, Strategy};
use crate::probe::{self, ProbeSet};
use crate::{host_matches, BrowserProfile, ExtractError, ExtractionContext, Media};

/// Fetches the post page itself and runs the probes over it.
pub struct HtmlFallback {
    name: &'static str,
    probes: ProbeSet,
    profile: BrowserProfile,
    rewrite: Option<fn(&Url) -> Option<Url>>,
    login_markers: &'static [&'static str],
    adopt_canonical: bool,
}

impl HtmlFallback {
    pub fn new(name: &'static str, probes: ProbeSet) -> Self {
        HtmlFallback {
            name,
            probes,
            profile: BrowserProfile::Desktop,
            rewrite: None,
            login_markers: &[],
            adopt_canonical: false,
        }
    }

    pub fn profile(mut self, profile: BrowserProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Scrape another page derived from the current URL; `None` skips.
    pub fn rewrite(mut self, rewrite: fn(&Url) -> Option<Url>) -> Self {
        self.rewrite = Some(rewrite);
        self
    }

    /// Page text that gives away a login wall when nothing was found.
    pub fn login_markers(mut self, markers: &'static [&'static str]) -> Self {
        self.login_markers = markers;
        self
    }

    /// Later steps continue with the page's canonical URL when it differs.
    pub fn adopt_canonical(mut self) -> Self {
        self.adopt_canonical = true;
        self
    }
}

fn same_site(a: &Url, b: &Url) -> bool {
    match (a.host_str(), b.host_str()) {
        (Some(a), Some(b)) => {
            let site = |h: &str| {
                let parts: Vec<&str> = h.rsplitn(3, '.').collect();
                match parts.as_slice() {
                    [tld, domain, ..] => format!("{domain}.{tld}"),
                    _ => h.to_string(),
                }
            };
            host_matches(a, &site(b))
        }
        _ => false,
    }
}

#[async_trait]
impl Strategy for HtmlFallback {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn attempt(
        &self,
        ctx: &ExtractionContext,
        state: &mut AttemptState,
    ) -> Result<Outcome, ExtractError> {
        let url = match self.rewrite {
            Some(rewrite) => match rewrite(&state.current_url) {
                Some(url) => url,
                None => return Ok(Outcome::Skipped),
            },
            None => state.current_url.clone(),
        };

        let (body, final_url) = {
            let page = state
                .page_within(ctx, &url, self.profile, ctx.config.timeouts.probe())
                .await?;
            (page.body.clone(), page.final_url.clone())
        };
        let scan = probe::scan(&self.probes, &body, &final_url);

        if let Some(found) = scan.found {
            debug!(strategy = self.name, probe = found.probe, "probe hit");
            let mut extraction = bare_extraction(found.media);
            extraction.title = scan.info.title.unwrap_or_default();
            extraction.description = scan.info.description;
            extraction.uploader = scan.uploader.unwrap_or_default();
            extraction.thumbnail_url = match &extraction.media {
                Media::Image(u) => scan.info.thumbnail.or_else(|| Some(u.clone())),
                _ => scan.info.thumbnail,
            };
            extraction.webpage_url = Some(final_url.to_string());
            return Ok(Outcome::Found(extraction));
        }

        if let Some(canonical) = scan.info.canonical.and_then(|c| Url::parse(&c).ok()) {
            if canonical != state.current_url && same_site(&canonical, &state.current_url) {
                state.canonical_hint = Some(canonical.clone());
                if self.adopt_canonical {
                    debug!(url = %canonical, "continuing with canonical url");
                    state.current_url = canonical;
                }
            }
        }

        if self.login_markers.iter().any(|m| body.contains(m)) {
            return Err(ExtractError::LoginWall(final_url.to_string()));
        }
        Ok(Outcome::Exhausted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Timeouts;
    use crate::testing::{context_with, context_with_config, StaticFetcher, StaticResolver};
    use crate::{ErrorKind, ExtractorConfig};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::time::Duration;

    const OG_ONLY: &str = include_str!("../../tests/fixtures/og_video_only.html");
    const POST: &str = "https://www.example.com/post/1";

    fn ctx_with(fetcher: StaticFetcher) -> (ExtractionContext, Arc<StaticFetcher>) {
        let fetcher = Arc::new(fetcher);
        (context_with(fetcher.clone(), Arc::new(StaticResolver::new())), fetcher)
    }

    #[tokio::test]
    async fn og_video_page_yields_video() {
        let (ctx, _) = ctx_with(StaticFetcher::new().page(POST, OG_ONLY));
        let mut state = AttemptState::new(Url::parse(POST).unwrap());
        match HtmlFallback::new("html", ProbeSet::default())
            .attempt(&ctx, &mut state)
            .await
            .unwrap()
        {
            Outcome::Found(e) => {
                assert_eq!(e.media, Media::Video("https://cdn.example.com/videos/og.mp4".into()));
                assert_eq!(e.title, "A clip");
                assert_eq!(e.thumbnail_url.as_deref(), Some("https://cdn.example.com/i/thumb.jpg"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn page_is_fetched_once_per_extraction() {
        let (ctx, fetcher) = ctx_with(StaticFetcher::new().page(POST, "<html><body></body></html>"));
        let mut state = AttemptState::new(Url::parse(POST).unwrap());
        let first = HtmlFallback::new("a", ProbeSet::default());
        let second = HtmlFallback::new("b", ProbeSet::patterns_only(vec![]));
        assert!(matches!(first.attempt(&ctx, &mut state).await, Ok(Outcome::Exhausted)));
        assert!(matches!(second.attempt(&ctx, &mut state).await, Ok(Outcome::Exhausted)));
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn html_fetch_ceiling_comes_from_config() {
        let config = ExtractorConfig {
            timeouts: Timeouts {
                probe_secs: 25,
                ..Default::default()
            },
            ..Default::default()
        };
        let fetcher = Arc::new(StaticFetcher::new().page(POST, "<html></html>"));
        let ctx = context_with_config(config, fetcher.clone(), Arc::new(StaticResolver::new()));
        let mut state = AttemptState::new(Url::parse(POST).unwrap());
        let outcome = HtmlFallback::new("html", ProbeSet::default())
            .attempt(&ctx, &mut state)
            .await;
        assert!(matches!(outcome, Ok(Outcome::Exhausted)));
        assert_eq!(fetcher.timeouts(), vec![(POST.to_string(), Duration::from_secs(25))]);
    }

    #[tokio::test]
    async fn login_wall_is_auth_required() {
        let (ctx, _) = ctx_with(StaticFetcher::new().page(POST, r#"<form id="login_form"></form>"#));
        let mut state = AttemptState::new(Url::parse(POST).unwrap());
        let err = HtmlFallback::new("html", ProbeSet::default())
            .login_markers(&["login_form"])
            .attempt(&ctx, &mut state)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AuthRequired);
    }

    #[tokio::test]
    async fn missing_page_is_not_found() {
        let (ctx, _) = ctx_with(StaticFetcher::new());
        let mut state = AttemptState::new(Url::parse(POST).unwrap());
        let err = HtmlFallback::new("html", ProbeSet::default())
            .attempt(&ctx, &mut state)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn adopts_canonical_on_same_site() {
        let page = r#"<html><head><link rel="canonical" href="https://www.facebook.com/reel/1234567890123"></head></html>"#;
        let url = "https://m.facebook.com/watch/?v=1";
        let (ctx, _) = ctx_with(StaticFetcher::new().page(url, page));
        let mut state = AttemptState::new(Url::parse(url).unwrap());
        let outcome = HtmlFallback::new("html", ProbeSet::default())
            .adopt_canonical()
            .attempt(&ctx, &mut state)
            .await;
        assert!(matches!(outcome, Ok(Outcome::Exhausted)));
        assert_eq!(state.current_url.as_str(), "https://www.facebook.com/reel/1234567890123");
        assert!(state.canonical_hint.is_some());
    }

    #[test]
    fn same_site_ignores_subdomains() {
        let a = Url::parse("https://m.facebook.com/x").unwrap();
        let b = Url::parse("https://www.facebook.com/y").unwrap();
        let c = Url::parse("https://evil.example/y").unwrap();
        assert!(same_site(&a, &b));
        assert!(!same_site(&a, &c));
    }
}
