use postgrab_extractor_api::probe::{ImageUse, ProbeSet};
use postgrab_extractor_api::strategies::{HtmlFallback, ResolveMedia};
use postgrab_extractor_api::url::Url;
use postgrab_extractor_api::{
    async_trait, ExtractionContext, ExtractionResult, NewExtractor, Pipeline, Platform,
    PlatformExtractor, URLMatcher,
};

use crate::common::{cdn_mp4, rehydration_download, rehydration_video};

pub struct TikTokPE {
    pipeline: Pipeline,
}

impl NewExtractor for TikTokPE {
    fn new() -> Self {
        TikTokPE {
            pipeline: Pipeline::new(Platform::TikTok)
                .then(
                    ResolveMedia::new()
                        .format("bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best"),
                )
                .then(HtmlFallback::new(
                    "html",
                    ProbeSet {
                        ld_json: false,
                        og_video: true,
                        // the cover picture is never the post
                        og_image: ImageUse::Never,
                        video_tags: false,
                        embedded: vec![rehydration_video(), rehydration_download()],
                        patterns: vec![cdn_mp4()],
                    },
                )),
        }
    }
}

impl URLMatcher for TikTokPE {
    fn domains(&self) -> &'static [&'static str] {
        &["tiktok.com"]
    }
}

#[async_trait]
impl PlatformExtractor for TikTokPE {
    fn platform(&self) -> Platform {
        Platform::TikTok
    }

    async fn extract(&self, ctx: &ExtractionContext, url: &Url) -> ExtractionResult {
        self.pipeline.run(ctx, url).await
    }
}
