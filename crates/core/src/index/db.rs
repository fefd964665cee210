//! Connection lifecycle and CRUD for the index database.
//!
//! Every function here takes `&Connection` so the same code runs whether
//! called against the live connection or inside a `rusqlite::Transaction`
//! (which derefs to `Connection`); the indexer is what decides transaction
//! boundaries.

use std::path::Path;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

use super::schema::{init_schema, SchemaError};
use super::types::{Backlink, IndexHealth, LinkRow, NoteMetadata, TagCount};
use crate::wikilink::Candidate;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("note not found: {path}")]
    NotFound { path: String },
    #[error("vault walk failed: {0}")]
    Walk(String),
}

/// Owns the single embedded SQLite connection for the whole process. WAL
/// mode lets readers proceed concurrently with the single writer; the
/// `Mutex` here stands in for a process-wide connection pool sized 1,
/// without pulling in a dedicated pooling crate for a single connection.
pub struct IndexStore {
    conn: Mutex<Connection>,
}

impl IndexStore {
    pub fn open(path: &Path) -> Result<Self, IndexError> {
        let conn = Connection::open(path)?;
        Self::configure(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn open_in_memory() -> Result<Self, IndexError> {
        let conn = Connection::open_in_memory()?;
        Self::configure(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn configure(conn: &Connection) -> Result<(), IndexError> {
        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON; PRAGMA busy_timeout=5000; PRAGMA synchronous=NORMAL;",
        )?;
        init_schema(conn)?;
        Ok(())
    }

    /// Run `f` against the live connection, no transaction boundary. For
    /// reads only; writers should use [`IndexStore::transaction`].
    pub fn with_conn<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Connection) -> R,
    {
        let conn = self.conn.lock();
        f(&conn)
    }

    /// Run `f` inside a single SQLite transaction; commits iff `f` returns
    /// `Ok`.
    pub fn transaction<F, R>(&self, f: F) -> Result<R, IndexError>
    where
        F: FnOnce(&rusqlite::Transaction) -> Result<R, IndexError>,
    {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }
}

fn row_to_metadata(row: &rusqlite::Row) -> rusqlite::Result<NoteMetadata> {
    Ok(NoteMetadata {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        note_path: row.get("note_path")?,
        version: row.get("version")?,
        title: row.get("title")?,
        size_bytes: row.get("size_bytes")?,
        created: parse_ts(row.get::<_, String>("created")?),
        updated: parse_ts(row.get::<_, String>("updated")?),
        normalized_title_slug: row.get("normalized_title_slug")?,
        normalized_path_slug: row.get("normalized_path_slug")?,
    })
}

fn parse_ts(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s).map(|dt| dt.with_timezone(&Utc)).unwrap_or_else(|_| Utc::now())
}

pub fn get_metadata(
    conn: &Connection,
    user_id: &str,
    note_path: &str,
) -> Result<Option<NoteMetadata>, IndexError> {
    conn.query_row(
        "SELECT * FROM note_metadata WHERE user_id = ?1 AND note_path = ?2",
        params![user_id, note_path],
        row_to_metadata,
    )
    .optional()
    .map_err(IndexError::from)
}

pub fn list_metadata(
    conn: &Connection,
    user_id: &str,
    folder: Option<&str>,
) -> Result<Vec<NoteMetadata>, IndexError> {
    let mut stmt = conn.prepare(
        "SELECT * FROM note_metadata WHERE user_id = ?1 ORDER BY note_path ASC",
    )?;
    let rows = stmt.query_map(params![user_id], row_to_metadata)?;
    let mut out = Vec::new();
    for row in rows {
        let row = row?;
        if let Some(prefix) = folder {
            if !row.note_path.starts_with(prefix) {
                continue;
            }
        }
        out.push(row);
    }
    Ok(out)
}

pub fn count_notes(conn: &Connection, user_id: &str) -> Result<i64, IndexError> {
    conn.query_row(
        "SELECT COUNT(*) FROM note_metadata WHERE user_id = ?1",
        params![user_id],
        |row| row.get(0),
    )
    .map_err(IndexError::from)
}

/// Insert-or-update the metadata row, incrementing `version` on update.
/// Returns the resulting row (with `version` already incremented).
pub fn upsert_metadata(
    conn: &Connection,
    user_id: &str,
    note_path: &str,
    title: &str,
    size_bytes: i64,
    title_slug: &str,
    path_slug: &str,
    now: DateTime<Utc>,
) -> Result<NoteMetadata, IndexError> {
    let now_s = now.to_rfc3339();
    let existing = get_metadata(conn, user_id, note_path)?;

    match existing {
        Some(row) => {
            let new_version = row.version + 1;
            conn.execute(
                "UPDATE note_metadata SET version = ?1, title = ?2, size_bytes = ?3, updated = ?4,
                 normalized_title_slug = ?5, normalized_path_slug = ?6 WHERE id = ?7",
                params![new_version, title, size_bytes, now_s, title_slug, path_slug, row.id],
            )?;
            Ok(NoteMetadata { version: new_version, title: title.to_string(), size_bytes, updated: now, normalized_title_slug: title_slug.to_string(), normalized_path_slug: path_slug.to_string(), ..row })
        }
        None => {
            conn.execute(
                "INSERT INTO note_metadata
                 (user_id, note_path, version, title, size_bytes, created, updated, normalized_title_slug, normalized_path_slug)
                 VALUES (?1, ?2, 1, ?3, ?4, ?5, ?5, ?6, ?7)",
                params![user_id, note_path, title, size_bytes, now_s, title_slug, path_slug],
            )?;
            let id = conn.last_insert_rowid();
            Ok(NoteMetadata {
                id,
                user_id: user_id.to_string(),
                note_path: note_path.to_string(),
                version: 1,
                title: title.to_string(),
                size_bytes,
                created: now,
                updated: now,
                normalized_title_slug: title_slug.to_string(),
                normalized_path_slug: path_slug.to_string(),
            })
        }
    }
}

/// Delete the metadata row and its FTS shadow row. Returns the deleted row,
/// if any.
pub fn delete_metadata(
    conn: &Connection,
    user_id: &str,
    note_path: &str,
) -> Result<Option<NoteMetadata>, IndexError> {
    let existing = get_metadata(conn, user_id, note_path)?;
    if let Some(row) = &existing {
        conn.execute("DELETE FROM note_fts WHERE rowid = ?1", params![row.id])?;
        conn.execute("DELETE FROM note_metadata WHERE id = ?1", params![row.id])?;
    }
    Ok(existing)
}

/// Increment `version` and bump `updated` for an existing row, without
/// touching any other column. Used by `MoveNote`, which already rewrote
/// `note_path` via [`update_note_path`] before calling this.
pub fn bump_version(
    conn: &Connection,
    user_id: &str,
    note_path: &str,
    now: DateTime<Utc>,
) -> Result<NoteMetadata, IndexError> {
    conn.execute(
        "UPDATE note_metadata SET version = version + 1, updated = ?1
         WHERE user_id = ?2 AND note_path = ?3",
        params![now.to_rfc3339(), user_id, note_path],
    )?;
    get_metadata(conn, user_id, note_path)?
        .ok_or_else(|| IndexError::NotFound { path: note_path.to_string() })
}

pub fn update_note_path(
    conn: &Connection,
    user_id: &str,
    old_path: &str,
    new_path: &str,
    new_path_slug: &str,
) -> Result<(), IndexError> {
    conn.execute(
        "UPDATE note_metadata SET note_path = ?1, normalized_path_slug = ?2
         WHERE user_id = ?3 AND note_path = ?4",
        params![new_path, new_path_slug, user_id, old_path],
    )?;
    Ok(())
}

pub fn replace_fts(conn: &Connection, id: i64, title: &str, body: &str) -> Result<(), IndexError> {
    conn.execute("DELETE FROM note_fts WHERE rowid = ?1", params![id])?;
    conn.execute(
        "INSERT INTO note_fts (rowid, title, body) VALUES (?1, ?2, ?3)",
        params![id, title, body],
    )?;
    Ok(())
}

pub fn replace_tags(
    conn: &Connection,
    user_id: &str,
    note_path: &str,
    tags: &[String],
) -> Result<(), IndexError> {
    conn.execute(
        "DELETE FROM note_tags WHERE user_id = ?1 AND note_path = ?2",
        params![user_id, note_path],
    )?;
    for tag in tags {
        conn.execute(
            "INSERT OR IGNORE INTO note_tags (user_id, note_path, tag) VALUES (?1, ?2, ?3)",
            params![user_id, note_path, tag],
        )?;
    }
    Ok(())
}

pub fn delete_tags(conn: &Connection, user_id: &str, note_path: &str) -> Result<(), IndexError> {
    conn.execute(
        "DELETE FROM note_tags WHERE user_id = ?1 AND note_path = ?2",
        params![user_id, note_path],
    )?;
    Ok(())
}

pub fn tags_with_counts(conn: &Connection, user_id: &str) -> Result<Vec<TagCount>, IndexError> {
    let mut stmt = conn.prepare(
        "SELECT tag, COUNT(*) as cnt FROM note_tags WHERE user_id = ?1 GROUP BY tag ORDER BY tag ASC",
    )?;
    let rows = stmt
        .query_map(params![user_id], |row| {
            Ok(TagCount { tag: row.get(0)?, count: row.get(1)? })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Candidates whose normalized title or path slug equals `slug`.
pub fn candidates_by_slug(
    conn: &Connection,
    user_id: &str,
    slug: &str,
) -> Result<Vec<Candidate>, IndexError> {
    let mut stmt = conn.prepare(
        "SELECT note_path FROM note_metadata WHERE user_id = ?1
         AND (normalized_title_slug = ?2 OR normalized_path_slug = ?2)",
    )?;
    let rows = stmt
        .query_map(params![user_id, slug], |row| {
            Ok(Candidate { note_path: row.get(0)? })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Replace every outbound `note_links` row for `source_path` with
/// `resolved_links` (link_text, target_path).
pub fn replace_outbound_links(
    conn: &Connection,
    user_id: &str,
    source_path: &str,
    resolved_links: &[(String, Option<String>)],
) -> Result<(), IndexError> {
    conn.execute(
        "DELETE FROM note_links WHERE user_id = ?1 AND source_path = ?2",
        params![user_id, source_path],
    )?;
    for (link_text, target) in resolved_links {
        conn.execute(
            "INSERT OR IGNORE INTO note_links (user_id, source_path, link_text, target_path, is_resolved)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![user_id, source_path, link_text, target, target.is_some()],
        )?;
    }
    Ok(())
}

pub fn delete_outbound_links(
    conn: &Connection,
    user_id: &str,
    source_path: &str,
) -> Result<(), IndexError> {
    conn.execute(
        "DELETE FROM note_links WHERE user_id = ?1 AND source_path = ?2",
        params![user_id, source_path],
    )?;
    Ok(())
}

/// All currently-unresolved links for a user (candidates for re-resolution).
pub fn unresolved_links(conn: &Connection, user_id: &str) -> Result<Vec<LinkRow>, IndexError> {
    let mut stmt = conn.prepare(
        "SELECT user_id, source_path, link_text, target_path, is_resolved
         FROM note_links WHERE user_id = ?1 AND is_resolved = 0",
    )?;
    let rows = stmt
        .query_map(params![user_id], row_to_link)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn row_to_link(row: &rusqlite::Row) -> rusqlite::Result<LinkRow> {
    Ok(LinkRow {
        user_id: row.get(0)?,
        source_path: row.get(1)?,
        link_text: row.get(2)?,
        target_path: row.get(3)?,
        is_resolved: row.get::<_, i64>(4)? != 0,
    })
}

pub fn set_link_target(
    conn: &Connection,
    user_id: &str,
    source_path: &str,
    link_text: &str,
    target: Option<&str>,
) -> Result<(), IndexError> {
    conn.execute(
        "UPDATE note_links SET target_path = ?1, is_resolved = ?2
         WHERE user_id = ?3 AND source_path = ?4 AND link_text = ?5",
        params![target, target.is_some(), user_id, source_path, link_text],
    )?;
    Ok(())
}

/// Resolved inbound links pointing at `target_path` become unresolved.
/// Rows are preserved, not deleted, so the link reappears resolved if a
/// note with a matching slug is created again later.
pub fn unresolve_links_to(
    conn: &Connection,
    user_id: &str,
    target_path: &str,
) -> Result<usize, IndexError> {
    let n = conn.execute(
        "UPDATE note_links SET target_path = NULL, is_resolved = 0
         WHERE user_id = ?1 AND target_path = ?2 AND is_resolved = 1",
        params![user_id, target_path],
    )?;
    Ok(n)
}

/// Resolved inbound links pointing at `old_target` are retargeted to
/// `new_target`.
pub fn retarget_links(
    conn: &Connection,
    user_id: &str,
    old_target: &str,
    new_target: &str,
) -> Result<usize, IndexError> {
    let n = conn.execute(
        "UPDATE note_links SET target_path = ?1
         WHERE user_id = ?2 AND target_path = ?3 AND is_resolved = 1",
        params![new_target, user_id, old_target],
    )?;
    Ok(n)
}

pub fn update_links_source_path(
    conn: &Connection,
    user_id: &str,
    old_source: &str,
    new_source: &str,
) -> Result<(), IndexError> {
    conn.execute(
        "UPDATE note_links SET source_path = ?1 WHERE user_id = ?2 AND source_path = ?3",
        params![new_source, user_id, old_source],
    )?;
    Ok(())
}

pub fn backlinks(
    conn: &Connection,
    user_id: &str,
    target_path: &str,
) -> Result<Vec<Backlink>, IndexError> {
    let mut stmt = conn.prepare(
        "SELECT nl.source_path, nm.title FROM note_links nl
         JOIN note_metadata nm ON nm.user_id = nl.user_id AND nm.note_path = nl.source_path
         WHERE nl.user_id = ?1 AND nl.target_path = ?2 AND nl.is_resolved = 1
         ORDER BY nl.source_path ASC",
    )?;
    let rows = stmt
        .query_map(params![user_id, target_path], |row| {
            Ok(Backlink { source_path: row.get(0)?, title: row.get(1)? })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn health(conn: &Connection, user_id: &str) -> Result<IndexHealth, IndexError> {
    let row = conn
        .query_row(
            "SELECT user_id, note_count, last_full_rebuild, last_incremental_update
             FROM index_health WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok(IndexHealth {
                    user_id: row.get(0)?,
                    note_count: row.get(1)?,
                    last_full_rebuild: row
                        .get::<_, Option<String>>(2)?
                        .map(|s| parse_ts(s)),
                    last_incremental_update: row
                        .get::<_, Option<String>>(3)?
                        .map(|s| parse_ts(s)),
                })
            },
        )
        .optional()?;
    Ok(row.unwrap_or_else(|| IndexHealth { user_id: user_id.to_string(), ..Default::default() }))
}

pub fn touch_incremental(conn: &Connection, user_id: &str, now: DateTime<Utc>) -> Result<(), IndexError> {
    let note_count = count_notes(conn, user_id)?;
    conn.execute(
        "INSERT INTO index_health (user_id, note_count, last_incremental_update)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(user_id) DO UPDATE SET note_count = ?2, last_incremental_update = ?3",
        params![user_id, note_count, now.to_rfc3339()],
    )?;
    Ok(())
}

pub fn touch_full_rebuild(conn: &Connection, user_id: &str, now: DateTime<Utc>) -> Result<(), IndexError> {
    let note_count = count_notes(conn, user_id)?;
    conn.execute(
        "INSERT INTO index_health (user_id, note_count, last_full_rebuild)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(user_id) DO UPDATE SET note_count = ?2, last_full_rebuild = ?3",
        params![user_id, note_count, now.to_rfc3339()],
    )?;
    Ok(())
}

/// Wipes every row owned by `user_id` across all tables (RebuildAll's reset
/// step). FTS rows are deleted before metadata since their rowid references
/// `note_metadata.id`.
pub fn clear_user(conn: &Connection, user_id: &str) -> Result<(), IndexError> {
    conn.execute(
        "DELETE FROM note_fts WHERE rowid IN (SELECT id FROM note_metadata WHERE user_id = ?1)",
        params![user_id],
    )?;
    conn.execute("DELETE FROM note_metadata WHERE user_id = ?1", params![user_id])?;
    conn.execute("DELETE FROM note_tags WHERE user_id = ?1", params![user_id])?;
    conn.execute("DELETE FROM note_links WHERE user_id = ?1", params![user_id])?;
    Ok(())
}
