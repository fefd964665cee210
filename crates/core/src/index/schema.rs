//! Schema definition and forward-only migrations for the index database.

use rusqlite::Connection;
use thiserror::Error;

pub const SCHEMA_VERSION: i32 = 1;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("schema version {found} is newer than supported version {supported}")]
    VersionTooNew { found: i32, supported: i32 },
    #[error("migration failed: {0}")]
    MigrationFailed(String),
}

/// Idempotent: safe to call on every `IndexDb::open`.
pub fn init_schema(conn: &Connection) -> Result<(), SchemaError> {
    let table_exists: bool = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='schema_version'",
            [],
            |row| row.get::<_, i64>(0),
        )
        .map(|count| count > 0)?;

    if !table_exists {
        create_schema_v1(conn)?;
        return Ok(());
    }

    let current: i32 =
        conn.query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))?;

    if current > SCHEMA_VERSION {
        return Err(SchemaError::VersionTooNew { found: current, supported: SCHEMA_VERSION });
    }
    if current < SCHEMA_VERSION {
        migrate(conn, current)?;
    }
    Ok(())
}

fn migrate(_conn: &Connection, _from: i32) -> Result<(), SchemaError> {
    // No migrations beyond v1 yet; future schema bumps add arms here.
    Ok(())
}

fn create_schema_v1(conn: &Connection) -> Result<(), SchemaError> {
    conn.execute_batch(
        "
        BEGIN;

        CREATE TABLE schema_version (version INTEGER NOT NULL);
        INSERT INTO schema_version (version) VALUES (1);

        CREATE TABLE note_metadata (
            id                     INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id                TEXT NOT NULL,
            note_path              TEXT NOT NULL,
            version                INTEGER NOT NULL,
            title                  TEXT NOT NULL,
            size_bytes             INTEGER NOT NULL,
            created                TEXT NOT NULL,
            updated                TEXT NOT NULL,
            normalized_title_slug  TEXT NOT NULL,
            normalized_path_slug   TEXT NOT NULL,
            UNIQUE(user_id, note_path)
        );
        CREATE INDEX idx_note_metadata_title_slug ON note_metadata(user_id, normalized_title_slug);
        CREATE INDEX idx_note_metadata_path_slug ON note_metadata(user_id, normalized_path_slug);

        CREATE VIRTUAL TABLE note_fts USING fts5(
            title,
            body,
            content='',
            tokenize='porter unicode61',
            prefix='2 3'
        );

        CREATE TABLE note_tags (
            user_id    TEXT NOT NULL,
            note_path  TEXT NOT NULL,
            tag        TEXT NOT NULL,
            PRIMARY KEY (user_id, note_path, tag)
        );
        CREATE INDEX idx_note_tags_tag ON note_tags(user_id, tag);

        CREATE TABLE note_links (
            user_id      TEXT NOT NULL,
            source_path  TEXT NOT NULL,
            link_text    TEXT NOT NULL,
            target_path  TEXT,
            is_resolved  INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (user_id, source_path, link_text)
        );
        CREATE INDEX idx_note_links_target ON note_links(user_id, target_path);

        CREATE TABLE index_health (
            user_id                  TEXT PRIMARY KEY,
            note_count               INTEGER NOT NULL DEFAULT 0,
            last_full_rebuild        TEXT,
            last_incremental_update  TEXT
        );

        COMMIT;
        ",
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_memory() -> Connection {
        Connection::open_in_memory().unwrap()
    }

    #[test]
    fn fresh_db_creates_all_tables() {
        let conn = open_memory();
        init_schema(&conn).unwrap();

        for table in
            ["note_metadata", "note_fts", "note_tags", "note_links", "index_health"]
        {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE name = ?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "missing table {table}");
        }
    }

    #[test]
    fn init_schema_is_idempotent() {
        let conn = open_memory();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        let version: i32 =
            conn.query_row("SELECT version FROM schema_version", [], |row| row.get(0)).unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }
}
