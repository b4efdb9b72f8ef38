use postgrab_extractor_api::probe::{ImageUse, ProbeSet};
use postgrab_extractor_api::strategies::{DirectLink, HtmlFallback, IdentityRetry, ResolveMedia};
use postgrab_extractor_api::url::Url;
use postgrab_extractor_api::{
    async_trait, ExtractionContext, ExtractionResult, MediaCandidate, NewExtractor, Pipeline,
    Platform, PlatformExtractor, URLMatcher,
};

use crate::common::{cdn_mp4, embedded_video, is_cdn_media, INSTAGRAM_DOMAINS};

/// Posts, reels and stories.
pub struct InstagramPE {
    pipeline: Pipeline,
}

fn muxed_mp4(c: &MediaCandidate) -> bool {
    c.is_playable() && c.container_ext == "mp4" && c.has_audio_and_video()
}

impl NewExtractor for InstagramPE {
    fn new() -> Self {
        let resolve = ResolveMedia::new()
            .format("best[ext=mp4]/best")
            .timeout_secs(60)
            .accept(muxed_mp4);
        InstagramPE {
            pipeline: Pipeline::new(Platform::Instagram)
                .then(DirectLink::new(is_cdn_media))
                .then(resolve.clone())
                .then(IdentityRetry::new(resolve))
                .then(HtmlFallback::new(
                    "html",
                    ProbeSet {
                        og_image: ImageUse::LastResort,
                        embedded: vec![embedded_video()],
                        patterns: vec![cdn_mp4()],
                        ..Default::default()
                    },
                )),
        }
    }
}

impl URLMatcher for InstagramPE {
    fn domains(&self) -> &'static [&'static str] {
        INSTAGRAM_DOMAINS
    }
}

#[async_trait]
impl PlatformExtractor for InstagramPE {
    fn platform(&self) -> Platform {
        Platform::Instagram
    }

    async fn extract(&self, ctx: &ExtractionContext, url: &Url) -> ExtractionResult {
        self.pipeline.run(ctx, url).await
    }
}
