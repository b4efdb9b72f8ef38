use async_trait::async_trait;
use url::Url;

use super::{bare_extraction, media_for};
use crate::pipeline::{AttemptState, Outcome, Strategy};
use crate::{ExtractError, ExtractionContext, MediaCandidate};

/// The input already is a media file; nothing to fetch.
pub struct DirectLink {
    matches: fn(&Url) -> bool,
}

impl DirectLink {
    pub fn new(matches: fn(&Url) -> bool) -> Self {
        DirectLink { matches }
    }
}

#[async_trait]
impl Strategy for DirectLink {
    fn name(&self) -> &'static str {
        "direct_link"
    }

    async fn attempt(
        &self,
        _ctx: &ExtractionContext,
        state: &mut AttemptState,
    ) -> Result<Outcome, ExtractError> {
        if !(self.matches)(&state.current_url) {
            return Ok(Outcome::Skipped);
        }
        let candidate = MediaCandidate::from_url(state.current_url.as_str());
        let mut extraction = bare_extraction(media_for(&candidate));
        extraction.title = "direct media".to_string();
        Ok(Outcome::Found(extraction))
    }
}
