mod common;
pub mod post;

use once_cell::sync::Lazy;
use postgrab_extractor_api::{AnyExtractor, NewExtractor};
pub use post::InstagramPE;

pub static EXTRACTORS: Lazy<Vec<AnyExtractor>> =
    Lazy::new(|| vec![Box::new(InstagramPE::new()) as AnyExtractor]);
