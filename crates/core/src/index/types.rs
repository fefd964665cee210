//! Row types for the index database.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct NoteMetadata {
    pub id: i64,
    pub user_id: String,
    pub note_path: String,
    pub version: i64,
    pub title: String,
    pub size_bytes: i64,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub normalized_title_slug: String,
    pub normalized_path_slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRow {
    pub user_id: String,
    pub source_path: String,
    pub link_text: String,
    pub target_path: Option<String>,
    pub is_resolved: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexHealth {
    pub user_id: String,
    pub note_count: i64,
    pub last_full_rebuild: Option<DateTime<Utc>>,
    pub last_incremental_update: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagCount {
    pub tag: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backlink {
    pub source_path: String,
    pub title: String,
}
