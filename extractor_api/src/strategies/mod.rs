//! Building blocks the platform extractors assemble their pipelines from.

mod canonical;
mod direct;
mod html;
mod identity;
mod mirror;
mod redirect;
mod resolve;

pub use canonical::CanonicalRetry;
pub use direct::DirectLink;
pub use html::HtmlFallback;
pub use identity::IdentityRetry;
pub use mirror::MirrorService;
pub use redirect::FollowRedirect;
pub use resolve::ResolveMedia;

use url::Url;

use crate::{Extraction, Media, MediaCandidate};

/// Video unless the URL points at a picture.
pub fn media_for(candidate: &MediaCandidate) -> Media {
    if candidate.is_image() {
        Media::Image(candidate.url.clone())
    } else {
        Media::Video(candidate.url.clone())
    }
}

/// An extraction that only knows its media.
pub fn bare_extraction(media: Media) -> Extraction {
    let candidates = match &media {
        Media::Gallery(urls) => urls.iter().map(|u| MediaCandidate::from_url(u)).collect(),
        Media::Video(u) | Media::Image(u) | Media::Document(u) => vec![MediaCandidate::from_url(u)],
    };
    Extraction {
        candidates,
        ..Extraction::new(media)
    }
}

/// Same URL, other host. Used for mobile page variants.
pub fn with_host(url: &Url, host: &str) -> Option<Url> {
    let mut moved = url.clone();
    moved.set_host(Some(host)).ok()?;
    Some(moved)
}
