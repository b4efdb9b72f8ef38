use postgrab_extractor_api::probe::{ImageUse, ProbeSet};
use postgrab_extractor_api::strategies::{HtmlFallback, ResolveMedia};
use postgrab_extractor_api::url::Url;
use postgrab_extractor_api::{
    async_trait, BrowserProfile, ExtractionContext, ExtractionResult, NewExtractor, Pipeline,
    Platform, PlatformExtractor, URLMatcher,
};

use crate::common::{pattern_probes, pws_probes};

/// Pins, video or image. `pin.it` short links land on the pin page.
pub struct PinterestPE {
    pipeline: Pipeline,
}

impl NewExtractor for PinterestPE {
    fn new() -> Self {
        PinterestPE {
            pipeline: Pipeline::new(Platform::Pinterest)
                .then(ResolveMedia::new())
                // the mobile site skips most of the login wall
                .then(
                    HtmlFallback::new(
                        "html",
                        ProbeSet {
                            og_image: ImageUse::LastResort,
                            embedded: pws_probes(),
                            patterns: pattern_probes(),
                            ..Default::default()
                        },
                    )
                    .profile(BrowserProfile::Mobile),
                ),
        }
    }
}

impl URLMatcher for PinterestPE {
    fn domains(&self) -> &'static [&'static str] {
        &[
            "pinterest.com",
            "pin.it",
            "pinterest.at",
            "pinterest.ca",
            "pinterest.ch",
            "pinterest.cl",
            "pinterest.co.kr",
            "pinterest.co.uk",
            "pinterest.com.au",
            "pinterest.com.mx",
            "pinterest.de",
            "pinterest.dk",
            "pinterest.es",
            "pinterest.fr",
            "pinterest.ie",
            "pinterest.it",
            "pinterest.jp",
            "pinterest.nz",
            "pinterest.ph",
            "pinterest.pt",
            "pinterest.se",
        ]
    }
}

#[async_trait]
impl PlatformExtractor for PinterestPE {
    fn platform(&self) -> Platform {
        Platform::Pinterest
    }

    async fn extract(&self, ctx: &ExtractionContext, url: &Url) -> ExtractionResult {
        self.pipeline.run(ctx, url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use postgrab_extractor_api::testing::{context_with, StaticFetcher, StaticResolver};
    use postgrab_extractor_api::Media;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    const PIN: &str = "https://www.pinterest.com/pin/123456789012345678/";

    async fn extract(page: &str) -> (ExtractionResult, Arc<StaticFetcher>) {
        let fetcher = Arc::new(StaticFetcher::new().page(PIN, page));
        let resolver = StaticResolver::new().fail(PIN, "ERROR: [Pinterest] 123456789012345678: No video formats found!");
        let ctx = context_with(fetcher.clone(), Arc::new(resolver));
        (PinterestPE::new().extract(&ctx, &Url::parse(PIN).unwrap()).await, fetcher)
    }

    fn media(result: ExtractionResult) -> (Media, String) {
        match result {
            ExtractionResult::Success(e) => (e.media, e.strategy),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn country_domains_route_here() {
        let pe = PinterestPE::new();
        for pin in [
            "https://www.pinterest.co.uk/pin/123456789012345678/",
            "https://de.pinterest.com/pin/123456789012345678/",
            "https://www.pinterest.de/pin/123456789012345678/",
            "https://www.pinterest.com.au/pin/123456789012345678/",
            "https://pin.it/1a2b3c",
        ] {
            assert!(pe.match_extractor(&Url::parse(pin).unwrap()), "{}", pin);
        }
        assert!(!pe.match_extractor(&Url::parse("https://notpinterest.de/pin/1/").unwrap()));
    }

    #[tokio::test]
    async fn pws_video_beats_images() {
        let page = r#"<html><head><meta property="og:image" content="https://i.pinimg.com/736x/cover.jpg"></head><body>
            <script id="__PWS_DATA__" type="application/json">{"props":{"initialReduxState":{"pins":{"1":{
                "images":{"orig":{"url":"https://i.pinimg.com/originals/cover.jpg"}},
                "videos":{"video_list":{"V_720P":{"url":"https://v1.pinimg.com/videos/mc/720p/a.mp4"}}}}}}}}</script>
            </body></html>"#;
        let (result, fetcher) = extract(page).await;
        assert_eq!(
            media(result).0,
            Media::Video("https://v1.pinimg.com/videos/mc/720p/a.mp4".into())
        );
        let requests = fetcher.requests();
        let ua = requests[0].1.get("user-agent").and_then(|v| v.to_str().ok()).unwrap_or("");
        assert!(ua.contains("Mobile"));
    }

    #[tokio::test]
    async fn original_image_pin() {
        let page = r#"<html><body><img src="https://i.pinimg.com/75x75_RS/avatar.jpg">
            <img src="https://i.pinimg.com/originals/aa/bb/photo.png"></body></html>"#;
        let (media, strategy) = media(extract(page).await.0);
        assert_eq!(media, Media::Image("https://i.pinimg.com/originals/aa/bb/photo.png".into()));
        assert_eq!(strategy, "html");
    }

    #[tokio::test]
    async fn og_image_last() {
        let page = r#"<html><head><meta property="og:image" content="https://s.pinimg.com/og.png"></head></html>"#;
        let (media, _) = media(extract(page).await.0);
        assert_eq!(media, Media::Image("https://s.pinimg.com/og.png".into()));
    }
}
