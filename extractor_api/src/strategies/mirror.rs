use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::debug;
use url::Url;

use super::bare_extraction;
use crate::pipeline::{AttemptState, Outcome, Strategy};
use crate::probe::PatternProbe;
use crate::{BrowserProfile, ExtractError, ExtractionContext};

/// Hands the post URL to a third-party download site and scrapes the links it answers with.
/// Optional: disabled mirrors are a degraded mode, not an error.
pub struct MirrorService {
    name: &'static str,
    endpoint: &'static str,
    field: &'static str,
    headers: &'static [(&'static str, &'static str)],
    /// tried in order, e.g. HD before SD
    links: Vec<PatternProbe>,
}

impl MirrorService {
    pub fn new(
        name: &'static str,
        endpoint: &'static str,
        field: &'static str,
        headers: &'static [(&'static str, &'static str)],
        links: Vec<PatternProbe>,
    ) -> Self {
        MirrorService {
            name,
            endpoint,
            field,
            headers,
            links,
        }
    }

    fn header_map(&self) -> HeaderMap {
        let mut map = BrowserProfile::Desktop.headers();
        for (name, value) in self.headers {
            map.insert(HeaderName::from_static(*name), HeaderValue::from_static(*value));
        }
        map
    }
}

#[async_trait]
impl Strategy for MirrorService {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn attempt(
        &self,
        ctx: &ExtractionContext,
        state: &mut AttemptState,
    ) -> Result<Outcome, ExtractError> {
        if !ctx.config.mirrors_enabled {
            return Ok(Outcome::Skipped);
        }
        let endpoint = Url::parse(self.endpoint)?;
        let target = state.current_url.to_string();
        let page = ctx
            .post_form(
                &endpoint,
                &[(self.field, target.as_str())],
                self.header_map(),
                ctx.config.timeouts.mirror(),
            )
            .await?;
        if !page.is_success() {
            return Err(ExtractError::Status {
                url: endpoint.to_string(),
                status: page.status,
            });
        }
        for link in &self.links {
            if let Some(url) = link.find(&page.body) {
                debug!(mirror = self.name, link = link.name, "mirror answered");
                return Ok(Outcome::Found(bare_extraction(link.kind.wrap(url))));
            }
        }
        Ok(Outcome::Exhausted)
    }
}
