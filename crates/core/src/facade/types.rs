//! Request/response shapes for [`super::Core`]'s ten operations.

use chrono::{DateTime, Utc};

use crate::frontmatter::Frontmatter;

#[derive(Debug, Clone, PartialEq)]
pub struct NoteSummary {
    pub note_path: String,
    pub title: String,
    pub updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NoteDetail {
    pub title: String,
    pub frontmatter: Frontmatter,
    pub body: String,
    pub version: i64,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub size_bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    pub version: i64,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebuildOutcome {
    pub note_count: usize,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexHealth {
    pub note_count: i64,
    pub last_full_rebuild: Option<DateTime<Utc>>,
    pub last_incremental_update: Option<DateTime<Utc>>,
}
