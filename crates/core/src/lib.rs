#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]

//! Multi-tenant Markdown note store: vault I/O, a derived SQLite index
//! (full-text search, tags, wikilink graph), and an optimistic-concurrency
//! write protocol, all exposed through [`facade::Core`].

pub mod concurrency;
pub mod config;
pub mod errors;
pub mod facade;
pub mod frontmatter;
pub mod index;
pub mod indexer;
pub mod search;
pub mod vault;
pub mod wikilink;

pub use errors::{CoreError, CoreResult};
pub use facade::Core;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
