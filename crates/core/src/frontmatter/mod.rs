//! Frontmatter parsing and serialization.

pub mod parser;
pub mod serializer;
pub mod types;

pub use parser::{parse, FrontmatterParseError};
pub use serializer::{frontmatter_to_yaml, serialize};
pub use types::{Frontmatter, ParsedDocument};
