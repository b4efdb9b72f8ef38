use postgrab_extractor_api::strategies::ResolveMedia;
use postgrab_extractor_api::url::Url;
use postgrab_extractor_api::{
    async_trait, ExtractionContext, ExtractionResult, NewExtractor, Pipeline, Platform,
    PlatformExtractor, URLMatcher,
};

/// VODs and clips. Twitch only serves HLS; the downloader needs `webpage_url` to fetch it.
pub struct TwitchPE {
    pipeline: Pipeline,
}

impl NewExtractor for TwitchPE {
    fn new() -> Self {
        TwitchPE {
            pipeline: Pipeline::new(Platform::Twitch).then(ResolveMedia::new()),
        }
    }
}

impl URLMatcher for TwitchPE {
    fn domains(&self) -> &'static [&'static str] {
        &["twitch.tv", "twitch.com"]
    }
}

#[async_trait]
impl PlatformExtractor for TwitchPE {
    fn platform(&self) -> Platform {
        Platform::Twitch
    }

    async fn extract(&self, ctx: &ExtractionContext, url: &Url) -> ExtractionResult {
        self.pipeline.run(ctx, url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use postgrab_extractor_api::testing::{context_with, resolved, StaticFetcher, StaticResolver};
    use postgrab_extractor_api::{ErrorKind, Media, MediaCandidate};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    const VOD: &str = "https://www.twitch.tv/videos/2000000000";

    fn hls(url: &str, height: u32) -> MediaCandidate {
        MediaCandidate {
            url: url.to_string(),
            height: Some(height),
            codec_video: Some("avc1.4D401F".to_string()),
            codec_audio: Some("mp4a.40.2".to_string()),
            container_ext: "mp4".to_string(),
            protocol: "m3u8_native".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn hls_vod_keeps_webpage_url() {
        let mut media = resolved(
            "speedrun",
            vec![
                hls("https://usher.ttvnw.net/160p.m3u8", 160),
                hls("https://usher.ttvnw.net/1080p.m3u8", 1080),
            ],
        );
        media.webpage_url = Some(VOD.to_string());
        let resolver = StaticResolver::new().media(VOD, media);
        let ctx = context_with(Arc::new(StaticFetcher::new()), Arc::new(resolver));
        match TwitchPE::new().extract(&ctx, &Url::parse(VOD).unwrap()).await {
            ExtractionResult::Success(e) => {
                assert_eq!(e.media, Media::Video("https://usher.ttvnw.net/1080p.m3u8".into()));
                assert_eq!(e.webpage_url.as_deref(), Some(VOD));
                assert_eq!(e.candidates.len(), 2);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn expired_vod_is_not_found() {
        let resolver = StaticResolver::new().fail(VOD, "ERROR: [twitch:vod] 2000000000: Video does not exist");
        let (fetcher, resolver) = (Arc::new(StaticFetcher::new()), Arc::new(resolver));
        let ctx = context_with(fetcher.clone(), resolver);
        let result = TwitchPE::new().extract(&ctx, &Url::parse(VOD).unwrap()).await;
        assert_eq!(result.error_kind(), Some(ErrorKind::NotFound));
        assert_eq!(fetcher.calls(), 0);
    }
}
