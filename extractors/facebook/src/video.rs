use postgrab_extractor_api::probe::{ImageUse, ProbeSet};
use postgrab_extractor_api::strategies::{
    CanonicalRetry, FollowRedirect, HtmlFallback, MirrorService, ResolveMedia,
};
use postgrab_extractor_api::url::Url;
use postgrab_extractor_api::{
    async_trait, BrowserProfile, ExtractionContext, ExtractionResult, MediaCandidate, NewExtractor,
    Pipeline, Platform, PlatformExtractor, URLMatcher,
};

use crate::common::{
    cannot_parse_data, fdown_links, is_share_link, playable_urls, to_mobile, video_redirect,
    FACEBOOK_DOMAINS, ID_AFTER_TAG, ID_NEAR_FACEBOOK,
};

/// Videos, reels, watch links and their share/short forms.
pub struct FacebookVideoPE {
    pipeline: Pipeline,
}

fn playable_mp4(c: &MediaCandidate) -> bool {
    c.is_playable() && c.container_ext == "mp4"
}

const LOGIN_MARKERS: &[&str] = &["login_form", "Log In", "Inicia sesión"];

impl NewExtractor for FacebookVideoPE {
    fn new() -> Self {
        let resolve = ResolveMedia::new()
            .user_agent(BrowserProfile::Desktop.user_agent())
            .header("Referer", "https://www.facebook.com/")
            .timeout_secs(30)
            .accept(playable_mp4);
        FacebookVideoPE {
            pipeline: Pipeline::new(Platform::Facebook)
                .then(FollowRedirect::new(is_share_link))
                .then(resolve.clone())
                .then(
                    resolve
                        .clone()
                        .named("resolver_mobile")
                        .when(cannot_parse_data)
                        .rewrite(to_mobile),
                )
                .then(CanonicalRetry::new(
                    resolve,
                    vec![&*ID_NEAR_FACEBOOK, &*ID_AFTER_TAG],
                    "https://www.facebook.com/reel/{id}",
                ))
                .then(
                    HtmlFallback::new(
                        "html",
                        ProbeSet {
                            ld_json: false,
                            og_image: ImageUse::Never,
                            video_tags: false,
                            patterns: playable_urls(),
                            ..Default::default()
                        },
                    )
                    .adopt_canonical()
                    .login_markers(LOGIN_MARKERS),
                )
                .then(
                    HtmlFallback::new("html_mobile", ProbeSet::patterns_only(vec![video_redirect()]))
                        .rewrite(to_mobile),
                )
                .then(MirrorService::new(
                    "fdown",
                    "https://fdown.net/download.php",
                    "URL",
                    &[("origin", "https://fdown.net"), ("referer", "https://fdown.net/")],
                    fdown_links(),
                )),
        }
    }
}

impl URLMatcher for FacebookVideoPE {
    fn domains(&self) -> &'static [&'static str] {
        FACEBOOK_DOMAINS
    }
}

#[async_trait]
impl PlatformExtractor for FacebookVideoPE {
    fn platform(&self) -> Platform {
        Platform::Facebook
    }

    async fn extract(&self, ctx: &ExtractionContext, url: &Url) -> ExtractionResult {
        self.pipeline.run(ctx, url).await
    }
}
