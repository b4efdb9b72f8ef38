mod common;
pub mod video;

use once_cell::sync::Lazy;
use postgrab_extractor_api::{AnyExtractor, NewExtractor};
pub use video::TikTokPE;

pub static EXTRACTORS: Lazy<Vec<AnyExtractor>> =
    Lazy::new(|| vec![Box::new(TikTokPE::new()) as AnyExtractor]);
