use nipper::Document;
use postgrab_extractor_api::pipeline::{AttemptState, Outcome, Strategy};
use postgrab_extractor_api::probe::meta::{page_info, PageInfo};
use postgrab_extractor_api::strategies::bare_extraction;
use postgrab_extractor_api::url::Url;
use postgrab_extractor_api::{
    async_trait, BrowserProfile, ExtractError, ExtractionContext, Media,
};
use tracing::debug;

use crate::types::{DocumentConfig, Manifest};

/// Document (carousel) posts only embed a manifest URL; the manifest names the PDF.
pub struct NativeDocument;

// must be a separate non-async function for nipper reasons
fn manifest_url(html: &str) -> (Option<String>, PageInfo) {
    let doc = Document::from(html);
    let manifest = doc
        .select("[data-native-document-config]")
        .iter()
        .filter_map(|el| el.attr("data-native-document-config"))
        .filter_map(|raw| serde_json::from_str::<DocumentConfig>(&raw).ok())
        .find_map(|config| config.doc.and_then(|d| d.manifest().map(str::to_string)));
    (manifest, page_info(&doc))
}

#[async_trait]
impl Strategy for NativeDocument {
    fn name(&self) -> &'static str {
        "document_manifest"
    }

    async fn attempt(
        &self,
        ctx: &ExtractionContext,
        state: &mut AttemptState,
    ) -> Result<Outcome, ExtractError> {
        let url = state.current_url.clone();
        let body = state.page(ctx, &url, BrowserProfile::Desktop).await?.body.clone();
        let (manifest, info) = manifest_url(&body);
        let manifest = match manifest {
            Some(m) => Url::parse(&m)?,
            None => return Ok(Outcome::Exhausted),
        };

        debug!(manifest = %manifest, "document manifest found");
        let page = ctx
            .get_page(&manifest, BrowserProfile::Desktop, ctx.config.timeouts.page())
            .await?;
        if !page.is_success() {
            return Err(ExtractError::Status {
                url: manifest.to_string(),
                status: page.status,
            });
        }
        let document = serde_json::from_str::<Manifest>(&page.body)?.document_url();
        Ok(match document {
            Some(document) => {
                let mut extraction = bare_extraction(Media::Document(document));
                extraction.title = info.title.unwrap_or_default();
                extraction.thumbnail_url = info.thumbnail;
                extraction.description = info.description;
                extraction.webpage_url = Some(url.to_string());
                Outcome::Found(extraction)
            }
            None => Outcome::Exhausted,
        })
    }
}
