mod common;
pub mod document;
pub mod post;
mod types;

use once_cell::sync::Lazy;
use postgrab_extractor_api::{AnyExtractor, NewExtractor};
pub use document::NativeDocument;
pub use post::LinkedInPE;

pub static EXTRACTORS: Lazy<Vec<AnyExtractor>> =
    Lazy::new(|| vec![Box::new(LinkedInPE::new()) as AnyExtractor]);
