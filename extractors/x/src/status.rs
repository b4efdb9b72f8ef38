use postgrab_extractor_api::strategies::ResolveMedia;
use postgrab_extractor_api::url::Url;
use postgrab_extractor_api::{
    async_trait, ExtractionContext, ExtractionResult, MediaCandidate, NewExtractor, Pipeline,
    Platform, PlatformExtractor, URLMatcher,
};

pub struct XStatusPE {
    pipeline: Pipeline,
}

fn playable_video(c: &MediaCandidate) -> bool {
    c.has_video() && c.is_playable()
}

impl NewExtractor for XStatusPE {
    fn new() -> Self {
        XStatusPE {
            pipeline: Pipeline::new(Platform::X).then(
                ResolveMedia::new()
                    .format("bestvideo[ext=mp4]+bestaudio[ext=m4a]/bestvideo+bestaudio/best")
                    .accept(playable_video)
                    // the resolver echoes the status URL back for text-only posts
                    .reject_input_url(),
            ),
        }
    }
}

impl URLMatcher for XStatusPE {
    fn domains(&self) -> &'static [&'static str] {
        &["x.com", "twitter.com"]
    }
}

#[async_trait]
impl PlatformExtractor for XStatusPE {
    fn platform(&self) -> Platform {
        Platform::X
    }

    async fn extract(&self, ctx: &ExtractionContext, url: &Url) -> ExtractionResult {
        self.pipeline.run(ctx, url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use postgrab_extractor_api::testing::{context_with, mp4, resolved, StaticFetcher, StaticResolver};
    use postgrab_extractor_api::{ErrorKind, Media};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    const STATUS: &str = "https://x.com/someone/status/1790000000000000000";

    fn audio_only(url: &str) -> MediaCandidate {
        MediaCandidate {
            url: url.to_string(),
            codec_audio: Some("mp4a.40.2".to_string()),
            container_ext: "m4a".to_string(),
            protocol: "https".to_string(),
            bitrate: Some(128.0),
            ..Default::default()
        }
    }

    #[test]
    fn matches_both_hosts_only() {
        let e = XStatusPE::new();
        assert!(e.match_extractor(&Url::parse(STATUS).unwrap()));
        assert!(e.match_extractor(&Url::parse("https://mobile.twitter.com/a/status/1").unwrap()));
        assert!(!e.match_extractor(&Url::parse("https://netflix.com/title/1").unwrap()));
    }

    #[tokio::test]
    async fn best_video_format_wins() {
        let resolver = StaticResolver::new().media(
            STATUS,
            resolved(
                "post",
                vec![
                    audio_only("https://video.twimg.com/aud.m4a"),
                    mp4("https://video.twimg.com/360.mp4", 360),
                    mp4("https://video.twimg.com/720.mp4", 720),
                ],
            ),
        );
        let ctx = context_with(Arc::new(StaticFetcher::new()), Arc::new(resolver));
        match XStatusPE::new().extract(&ctx, &Url::parse(STATUS).unwrap()).await {
            ExtractionResult::Success(e) => {
                assert_eq!(e.media, Media::Video("https://video.twimg.com/720.mp4".into()));
                assert_eq!(e.candidates.len(), 2);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn private_account_needs_auth() {
        let url = "https://x.com/dne_url";
        let resolver = StaticResolver::new().fail(url, "ERROR: [twitter] dne_url: private account");
        let ctx = context_with(Arc::new(StaticFetcher::new()), Arc::new(resolver));
        match XStatusPE::new().extract(&ctx, &Url::parse(url).unwrap()).await {
            ExtractionResult::Failure(f) => {
                assert_eq!(f.error_kind, ErrorKind::AuthRequired);
                assert!(f.suggestion.map_or(false, |s| !s.is_empty()));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn echoed_status_url_is_no_media() {
        let resolver = StaticResolver::new().media(STATUS, resolved("text only", vec![mp4(STATUS, 0)]));
        let ctx = context_with(Arc::new(StaticFetcher::new()), Arc::new(resolver));
        let result = XStatusPE::new().extract(&ctx, &Url::parse(STATUS).unwrap()).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::NoMediaFound));
    }
}
