mod common;
pub mod video;

use once_cell::sync::Lazy;
use postgrab_extractor_api::{AnyExtractor, NewExtractor};
pub use video::FacebookVideoPE;

pub static EXTRACTORS: Lazy<Vec<AnyExtractor>> =
    Lazy::new(|| vec![Box::new(FacebookVideoPE::new()) as AnyExtractor]);
