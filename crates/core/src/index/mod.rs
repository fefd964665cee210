//! Derived SQLite index: schema, connection lifecycle, and row-level CRUD.
//! The [`indexer`](crate::indexer) module is the only caller that composes
//! these primitives into one logical operation.

pub mod db;
pub mod schema;
pub mod types;

pub use db::{IndexError, IndexStore};
pub use schema::{SchemaError, SCHEMA_VERSION};
pub use types::{Backlink, IndexHealth, LinkRow, NoteMetadata, TagCount};
