//! Wikilink slug normalization, occurrence extraction, and deterministic
//! target resolution.

pub mod extractor;
pub mod resolver;
pub mod slug;

pub use extractor::{extract_links, ExtractedLink};
pub use resolver::{resolve_target, Candidate};
pub use slug::normalize;
