//! Canonical ordering of media candidates: muxed audio+video first, then taller, then
//! higher bitrate.

use std::cmp::Ordering;

use itertools::Itertools;

use crate::MediaCandidate;

/// `Less` means `a` is the better candidate.
pub fn compare(a: &MediaCandidate, b: &MediaCandidate) -> Ordering {
    b.has_audio_and_video()
        .cmp(&a.has_audio_and_video())
        .then_with(|| b.height.unwrap_or(0).cmp(&a.height.unwrap_or(0)))
        .then_with(|| b.bitrate.unwrap_or(0.0).total_cmp(&a.bitrate.unwrap_or(0.0)))
}

/// Best first. Stable, so equally ranked candidates keep their order.
pub fn rank(candidates: impl IntoIterator<Item = MediaCandidate>) -> Vec<MediaCandidate> {
    candidates.into_iter().sorted_by(compare).collect()
}

pub fn best(candidates: &[MediaCandidate]) -> Option<&MediaCandidate> {
    candidates.iter().min_by(|a, b| compare(a, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn candidate(url: &str, height: u32, bitrate: f64, audio: bool) -> MediaCandidate {
        MediaCandidate {
            url: url.to_string(),
            height: Some(height),
            bitrate: Some(bitrate),
            codec_video: Some("avc1".into()),
            codec_audio: audio.then(|| "mp4a".to_string()),
            container_ext: "mp4".into(),
            protocol: "https".into(),
            ..Default::default()
        }
    }

    #[test]
    fn muxed_480p_beats_video_only_720p() {
        let ranked = rank(vec![
            candidate("720", 720, 2500.0, false),
            candidate("480", 480, 900.0, true),
        ]);
        assert_eq!(ranked[0].url, "480");
    }

    #[test]
    fn height_then_bitrate() {
        let ranked = rank(vec![
            candidate("a", 720, 1000.0, true),
            candidate("b", 1080, 500.0, true),
            candidate("c", 720, 2000.0, true),
        ]);
        let urls: Vec<_> = ranked.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(urls, vec!["b", "c", "a"]);
    }

    #[test]
    fn best_of_empty_is_none() {
        assert!(best(&[]).is_none());
        let list = vec![candidate("x", 360, 1.0, false), candidate("y", 360, 2.0, false)];
        assert_eq!(best(&list).map(|c| c.url.as_str()), Some("y"));
    }
}
