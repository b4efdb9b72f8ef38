use postgrab_extractor_api::pipeline::AttemptState;
use postgrab_extractor_api::resolver::ResolvedMedia;
use postgrab_extractor_api::strategies::ResolveMedia;
use postgrab_extractor_api::url::Url;
use postgrab_extractor_api::{
    async_trait, Extraction, ExtractionContext, ExtractionResult, MediaCandidate, NewExtractor,
    Pipeline, Platform, PlatformExtractor, URLMatcher,
};

const SHORT_MAX_SECS: f64 = 60.0;

/// Videos and Shorts.
pub struct YoutubePE {
    pipeline: Pipeline,
}

/// Muxed streams only: the preview must play with sound.
fn muxed(c: &MediaCandidate) -> bool {
    c.has_audio_and_video() && c.is_playable()
}

fn is_short(resolved: &ResolvedMedia, state: &AttemptState, extraction: &Extraction) -> bool {
    if state.original_url.path().starts_with("/shorts/") {
        return true;
    }
    if resolved.duration.map_or(false, |d| d > 0.0 && d <= SHORT_MAX_SECS) {
        return true;
    }
    let top = extraction.candidates.first();
    let width = resolved.width.or_else(|| top.and_then(|c| c.width));
    let height = resolved.height.or_else(|| top.and_then(|c| c.height));
    matches!((width, height), (Some(w), Some(h)) if w > 0 && h > w)
}

/// Highest quality on offer, DASH video-only streams included.
fn youtube_extras(resolved: &ResolvedMedia, state: &AttemptState, extraction: &mut Extraction) {
    extraction.max_height = resolved
        .formats
        .iter()
        .filter_map(|f| f.height)
        .max()
        .or(resolved.height)
        .filter(|h| *h > 0);
    let short = is_short(resolved, state, extraction);
    extraction.is_short = Some(short);
}

impl NewExtractor for YoutubePE {
    fn new() -> Self {
        YoutubePE {
            pipeline: Pipeline::new(Platform::YouTube)
                .then(ResolveMedia::new().accept(muxed).finish(youtube_extras))
                .then(
                    ResolveMedia::new()
                        .named("basic_format")
                        .format("best[ext=mp4]/best")
                        .timeout_secs(45)
                        .finish(youtube_extras),
                ),
        }
    }
}

impl URLMatcher for YoutubePE {
    fn domains(&self) -> &'static [&'static str] {
        &["youtube.com", "youtu.be"]
    }
}

#[async_trait]
impl PlatformExtractor for YoutubePE {
    fn platform(&self) -> Platform {
        Platform::YouTube
    }

    async fn extract(&self, ctx: &ExtractionContext, url: &Url) -> ExtractionResult {
        self.pipeline.run(ctx, url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use postgrab_extractor_api::testing::{context_with, mp4, resolved, StaticFetcher, StaticResolver};
    use postgrab_extractor_api::Media;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    const WATCH: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

    fn dash_video(url: &str, height: u32) -> MediaCandidate {
        MediaCandidate {
            codec_audio: None,
            container_ext: "webm".to_string(),
            ..mp4(url, height)
        }
    }

    async fn extract(url: &str, resolver: StaticResolver) -> ExtractionResult {
        let ctx = context_with(Arc::new(StaticFetcher::new()), Arc::new(resolver));
        YoutubePE::new().extract(&ctx, &Url::parse(url).unwrap()).await
    }

    #[tokio::test]
    async fn muxed_preview_with_max_quality() {
        let mut media = resolved(
            "song",
            vec![
                mp4("https://rr1.googlevideo.com/360.mp4", 360),
                dash_video("https://rr1.googlevideo.com/2160.webm", 2160),
                mp4("https://rr1.googlevideo.com/720.mp4", 720),
            ],
        );
        media.duration = Some(213.0);
        match extract(WATCH, StaticResolver::new().media(WATCH, media)).await {
            ExtractionResult::Success(e) => {
                assert_eq!(e.media, Media::Video("https://rr1.googlevideo.com/720.mp4".into()));
                assert_eq!(e.max_height, Some(2160));
                assert_eq!(e.is_short, Some(false));
                assert_eq!(e.candidates.len(), 2);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn shorts_path_is_short() {
        let url = "https://www.youtube.com/shorts/abcdefghijk";
        let mut media = resolved("short", vec![mp4("https://rr1.googlevideo.com/s.mp4", 1080)]);
        media.duration = Some(300.0);
        match extract(url, StaticResolver::new().media(url, media)).await {
            ExtractionResult::Success(e) => assert_eq!(e.is_short, Some(true)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn portrait_video_is_short() {
        let portrait = MediaCandidate {
            width: Some(1080),
            height: Some(1920),
            ..mp4("https://rr1.googlevideo.com/p.mp4", 1920)
        };
        let mut media = resolved("vertical", vec![portrait]);
        media.duration = Some(95.0);
        match extract(WATCH, StaticResolver::new().media(WATCH, media)).await {
            ExtractionResult::Success(e) => assert_eq!(e.is_short, Some(true)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn falls_back_to_basic_format() {
        // the default answer has no muxed stream; the mp4 selector picks format 18
        let dash = resolved("dash only", vec![dash_video("https://rr1.googlevideo.com/1080.webm", 1080)]);
        let basic = ResolvedMedia {
            url: Some("https://rr1.googlevideo.com/18.mp4".to_string()),
            ..resolved(
                "dash only",
                vec![
                    dash_video("https://rr1.googlevideo.com/1080.webm", 1080),
                    mp4("https://rr1.googlevideo.com/18.mp4", 360),
                ],
            )
        };
        let resolver = Arc::new(
            StaticResolver::new()
                .media(WATCH, dash)
                .media_with_format(WATCH, "best[ext=mp4]/best", basic),
        );
        let ctx = context_with(Arc::new(StaticFetcher::new()), resolver.clone());
        match YoutubePE::new().extract(&ctx, &Url::parse(WATCH).unwrap()).await {
            ExtractionResult::Success(e) => {
                assert_eq!(e.strategy, "basic_format");
                assert_eq!(e.media, Media::Video("https://rr1.googlevideo.com/18.mp4".into()));
                assert!(e.candidates[0].has_audio_and_video());
                assert_eq!(e.max_height, Some(1080));
            }
            other => panic!("unexpected {:?}", other),
        }
        let formats: Vec<_> = resolver.requests().into_iter().map(|(_, o)| o.format).collect();
        assert_eq!(formats, vec![None, Some("best[ext=mp4]/best".to_string())]);
    }
}
