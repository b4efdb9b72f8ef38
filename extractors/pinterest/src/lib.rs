mod common;
pub mod pin;

use once_cell::sync::Lazy;
use postgrab_extractor_api::{AnyExtractor, NewExtractor};
pub use pin::PinterestPE;

pub static EXTRACTORS: Lazy<Vec<AnyExtractor>> =
    Lazy::new(|| vec![Box::new(PinterestPE::new()) as AnyExtractor]);
