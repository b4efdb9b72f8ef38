use async_trait::async_trait;
use tracing::info;
use url::Url;

use crate::pipeline::{AttemptState, Outcome, Strategy};
use crate::{BrowserProfile, ExtractError, ExtractionContext};

/// Resolves share and short links to the page they land on. Never finds media itself.
pub struct FollowRedirect {
    applies: fn(&Url) -> bool,
}

impl FollowRedirect {
    pub fn new(applies: fn(&Url) -> bool) -> Self {
        FollowRedirect { applies }
    }
}

#[async_trait]
impl Strategy for FollowRedirect {
    fn name(&self) -> &'static str {
        "follow_redirect"
    }

    async fn attempt(
        &self,
        ctx: &ExtractionContext,
        state: &mut AttemptState,
    ) -> Result<Outcome, ExtractError> {
        if !(self.applies)(&state.current_url) {
            return Ok(Outcome::Skipped);
        }
        let page = ctx
            .get_page(
                &state.current_url,
                BrowserProfile::Desktop,
                ctx.config.timeouts.redirect(),
            )
            .await?;
        if page.final_url != state.current_url {
            info!(from = %state.current_url, to = %page.final_url, "share link resolved");
            state.current_url = page.final_url;
        }
        Ok(Outcome::Skipped)
    }
}
