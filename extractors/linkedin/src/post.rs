use postgrab_extractor_api::probe::{ImageUse, ProbeSet};
use postgrab_extractor_api::strategies::{HtmlFallback, IdentityRetry, ResolveMedia};
use postgrab_extractor_api::url::Url;
use postgrab_extractor_api::{
    async_trait, ExtractionContext, ExtractionResult, NewExtractor, Pipeline, Platform,
    PlatformExtractor, URLMatcher,
};

use crate::common::{data_sources, dms_document, LINKEDIN_DOMAINS};
use crate::document::NativeDocument;

/// Feed posts: video, image galleries and documents.
pub struct LinkedInPE {
    pipeline: Pipeline,
}

impl NewExtractor for LinkedInPE {
    fn new() -> Self {
        let resolve = ResolveMedia::new();
        LinkedInPE {
            pipeline: Pipeline::new(Platform::LinkedIn)
                .then(resolve.clone())
                .then(IdentityRetry::new(resolve))
                .then(HtmlFallback::new(
                    "html",
                    ProbeSet {
                        // images wait until documents had their turn
                        og_image: ImageUse::Never,
                        embedded: vec![data_sources()],
                        ..Default::default()
                    },
                ))
                .then(NativeDocument)
                .then(HtmlFallback::new(
                    "html_document",
                    ProbeSet {
                        og_image: ImageUse::LastResort,
                        ..ProbeSet::patterns_only(vec![dms_document()])
                    },
                )),
        }
    }
}

impl URLMatcher for LinkedInPE {
    fn domains(&self) -> &'static [&'static str] {
        LINKEDIN_DOMAINS
    }
}

#[async_trait]
impl PlatformExtractor for LinkedInPE {
    fn platform(&self) -> Platform {
        Platform::LinkedIn
    }

    async fn extract(&self, ctx: &ExtractionContext, url: &Url) -> ExtractionResult {
        self.pipeline.run(ctx, url).await
    }
}
