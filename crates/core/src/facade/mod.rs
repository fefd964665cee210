//! The crate's single public entry point. Wires the vault store, index
//! store, indexer, search engine, and concurrency gate together behind ten
//! operations, each accepting a [`CancellationToken`].

pub mod types;

use std::time::Instant;

use chrono::Utc;

use crate::concurrency::{CancellationToken, LockRegistry};
use crate::config::ResolvedConfig;
use crate::errors::{CoreError, CoreResult};
use crate::frontmatter::Frontmatter;
use crate::index::{db, IndexStore};
use crate::indexer;
use crate::search::{self, SearchHit, SearchWeights};
use crate::vault::{store::derive_title, VaultStore};

pub use types::{Backlink, IndexHealth, NoteDetail, NoteSummary, RebuildOutcome, TagCount, WriteOutcome};

fn check_cancelled(token: &CancellationToken) -> CoreResult<()> {
    if token.is_cancelled() {
        return Err(CoreError::Cancelled);
    }
    Ok(())
}

/// The multi-tenant note store. One `Core` per process; every method is
/// scoped by the caller-supplied `user_id`.
pub struct Core {
    vault: VaultStore,
    index: IndexStore,
    locks: LockRegistry,
    config: ResolvedConfig,
}

impl Core {
    pub fn open(config: ResolvedConfig) -> CoreResult<Self> {
        let vault = VaultStore::new(config.vault_root.clone());
        let index = IndexStore::open(&config.database_path)?;
        Ok(Self { vault, index, locks: LockRegistry::new(), config })
    }

    /// For tests and the CLI's `--in-memory` escape hatch: an index backed
    /// by `:memory:` with the vault rooted at `vault_root`.
    pub fn open_with_in_memory_index(
        vault_root: impl Into<std::path::PathBuf>,
        mut config: ResolvedConfig,
    ) -> CoreResult<Self> {
        let vault_root = vault_root.into();
        config.vault_root = vault_root.clone();
        let vault = VaultStore::new(vault_root);
        let index = IndexStore::open_in_memory()?;
        Ok(Self { vault, index, locks: LockRegistry::new(), config })
    }

    fn user_root(&self, user_id: &str) -> std::path::PathBuf {
        self.config.vault_root.join(user_id)
    }

    pub fn list_notes(
        &self,
        user_id: &str,
        folder: Option<&str>,
        cancel: &CancellationToken,
    ) -> CoreResult<Vec<NoteSummary>> {
        check_cancelled(cancel)?;
        let rows = self.index.with_conn(|c| db::list_metadata(c, user_id, folder))?;
        Ok(rows
            .into_iter()
            .map(|r| NoteSummary { note_path: r.note_path, title: r.title, updated: r.updated })
            .collect())
    }

    pub fn read_note(
        &self,
        user_id: &str,
        note_path: &str,
        cancel: &CancellationToken,
    ) -> CoreResult<NoteDetail> {
        check_cancelled(cancel)?;
        let meta = self
            .index
            .with_conn(|c| db::get_metadata(c, user_id, note_path))?
            .ok_or_else(|| CoreError::NotFound { path: note_path.to_string() })?;
        let content = self.vault.read(user_id, note_path)?;
        Ok(NoteDetail {
            title: content.title,
            frontmatter: content.frontmatter,
            body: content.body,
            version: meta.version,
            created: meta.created,
            updated: meta.updated,
            size_bytes: content.size_bytes,
        })
    }

    /// `if_version` absent is last-write-wins; present and mismatched
    /// (including `0` against a note that doesn't exist yet) fails with
    /// `VersionConflict`.
    pub fn write_note(
        &self,
        user_id: &str,
        note_path: &str,
        frontmatter: &Frontmatter,
        body: &str,
        if_version: Option<i64>,
        cancel: &CancellationToken,
    ) -> CoreResult<WriteOutcome> {
        check_cancelled(cancel)?;
        self.locks.with_note_lock(user_id, note_path, || {
            let existing = self.index.with_conn(|c| db::get_metadata(c, user_id, note_path))?;

            if let Some(expected) = if_version {
                let current = existing.as_ref().map(|m| m.version).unwrap_or(0);
                if current != expected {
                    return Err(CoreError::VersionConflict { expected, current });
                }
            }

            if existing.is_none() {
                let count = self.index.with_conn(|c| db::count_notes(c, user_id))?;
                if count as usize >= self.config.max_notes_per_user {
                    return Err(CoreError::QuotaExceeded { limit: self.config.max_notes_per_user });
                }
            }

            let size_bytes = self.vault.write(
                user_id,
                note_path,
                frontmatter,
                body,
                self.config.max_note_size_bytes,
            )?;
            let title = derive_title(frontmatter, body, note_path);
            let meta = indexer::index_note(
                &self.index,
                user_id,
                note_path,
                &title,
                body,
                size_bytes,
                frontmatter,
                Utc::now(),
            )?;
            Ok(WriteOutcome { version: meta.version, created: meta.created, updated: meta.updated })
        })
    }

    pub fn delete_note(
        &self,
        user_id: &str,
        note_path: &str,
        cancel: &CancellationToken,
    ) -> CoreResult<()> {
        check_cancelled(cancel)?;
        self.locks.with_note_lock(user_id, note_path, || {
            self.vault.delete(user_id, note_path)?;
            indexer::unindex_note(&self.index, user_id, note_path, Utc::now())?;
            Ok(())
        })
    }

    /// `MoveNote`. Both endpoints are locked, in sorted order, so two
    /// concurrent moves can never deadlock on each other's mutexes.
    pub fn move_note(
        &self,
        user_id: &str,
        old_path: &str,
        new_path: &str,
        cancel: &CancellationToken,
    ) -> CoreResult<WriteOutcome> {
        check_cancelled(cancel)?;
        let (first, second) =
            if old_path <= new_path { (old_path, new_path) } else { (new_path, old_path) };
        self.locks.with_note_lock(user_id, first, || {
            self.locks.with_note_lock(user_id, second, || {
                self.vault.mv(user_id, old_path, new_path)?;
                let meta = indexer::move_note(&self.index, user_id, old_path, new_path, Utc::now())?;
                Ok(WriteOutcome { version: meta.version, created: meta.created, updated: meta.updated })
            })
        })
    }

    pub fn search(
        &self,
        user_id: &str,
        query: &str,
        limit: usize,
        cancel: &CancellationToken,
    ) -> CoreResult<Vec<SearchHit>> {
        check_cancelled(cancel)?;
        let limit = limit.clamp(1, 20);
        let weights = SearchWeights {
            title_weight: self.config.title_weight,
            body_weight: self.config.body_weight,
            recency_bonus_recent_days: self.config.recency_bonus_recent_days,
            recency_bonus_medium_days: self.config.recency_bonus_medium_days,
        };
        search::search(&self.index, &self.vault, user_id, query, &weights, Utc::now(), limit)
    }

    pub fn backlinks(
        &self,
        user_id: &str,
        note_path: &str,
        cancel: &CancellationToken,
    ) -> CoreResult<Vec<Backlink>> {
        check_cancelled(cancel)?;
        let rows = self.index.with_conn(|c| db::backlinks(c, user_id, note_path))?;
        Ok(rows.into_iter().map(|r| Backlink { source_path: r.source_path, title: r.title }).collect())
    }

    pub fn tags(&self, user_id: &str, cancel: &CancellationToken) -> CoreResult<Vec<TagCount>> {
        check_cancelled(cancel)?;
        let rows = self.index.with_conn(|c| db::tags_with_counts(c, user_id))?;
        Ok(rows.into_iter().map(|r| TagCount { tag: r.tag, count: r.count }).collect())
    }

    /// `RebuildIndex`. Excludes concurrent rebuilds for the same user; a
    /// write that lands mid-rebuild on a different note is unaffected
    /// because the rebuild holds only the rebuild lock, not every note lock.
    pub fn rebuild_index(&self, user_id: &str, cancel: &CancellationToken) -> CoreResult<RebuildOutcome> {
        check_cancelled(cancel)?;
        self.locks.with_rebuild_lock(user_id, || {
            let start = Instant::now();
            let user_root = self.user_root(user_id);
            let stats =
                indexer::rebuild_all(&self.index, user_id, &user_root, Utc::now, || cancel.is_cancelled())?;
            Ok(RebuildOutcome {
                note_count: stats.notes_indexed,
                duration_ms: start.elapsed().as_millis() as u64,
            })
        })
    }

    pub fn index_health(&self, user_id: &str, cancel: &CancellationToken) -> CoreResult<IndexHealth> {
        check_cancelled(cancel)?;
        let h = self.index.with_conn(|c| db::health(c, user_id))?;
        Ok(IndexHealth {
            note_count: h.note_count,
            last_full_rebuild: h.last_full_rebuild,
            last_incremental_update: h.last_incremental_update,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn core(dir: &TempDir) -> Core {
        Core::open_with_in_memory_index(dir.path(), ResolvedConfig::default()).unwrap()
    }

    fn fm_with_title(title: &str) -> Frontmatter {
        let mut fm = Frontmatter::default();
        fm.set_title(title);
        fm
    }

    #[test]
    fn write_then_read_roundtrip() {
        let dir = TempDir::new().unwrap();
        let core = core(&dir);
        let cancel = CancellationToken::new();
        let fm = fm_with_title("Getting Started");

        let outcome = core
            .write_note("u1", "getting-started.md", &fm, "# Hello\n[[API Documentation]]", None, &cancel)
            .unwrap();
        assert_eq!(outcome.version, 1);

        let note = core.read_note("u1", "getting-started.md", &cancel).unwrap();
        assert!(note.body.starts_with("# Hello"));
        assert_eq!(note.version, 1);
    }

    #[test]
    fn wikilink_resolves_once_target_exists() {
        let dir = TempDir::new().unwrap();
        let core = core(&dir);
        let cancel = CancellationToken::new();

        core.write_note(
            "u1",
            "getting-started.md",
            &fm_with_title("Getting Started"),
            "[[API Documentation]]",
            None,
            &cancel,
        )
        .unwrap();
        core.write_note(
            "u1",
            "api-documentation.md",
            &fm_with_title("API Documentation"),
            "ok",
            None,
            &cancel,
        )
        .unwrap();

        let backlinks = core.backlinks("u1", "api-documentation.md", &cancel).unwrap();
        assert_eq!(backlinks, vec![Backlink {
            source_path: "getting-started.md".to_string(),
            title: "Getting Started".to_string(),
        }]);
    }

    #[test]
    fn optimistic_concurrency_conflict() {
        let dir = TempDir::new().unwrap();
        let core = core(&dir);
        let cancel = CancellationToken::new();
        let fm = Frontmatter::default();

        core.write_note("u1", "a.md", &fm, "v1", None, &cancel).unwrap();
        core.write_note("u1", "a.md", &fm, "v2", None, &cancel).unwrap();
        core.write_note("u1", "a.md", &fm, "v3", None, &cancel).unwrap();
        core.write_note("u1", "a.md", &fm, "v4", None, &cancel).unwrap();
        let fifth = core.write_note("u1", "a.md", &fm, "v5", Some(4), &cancel).unwrap();
        assert_eq!(fifth.version, 5);

        let err = core.write_note("u1", "a.md", &fm, "v6", Some(4), &cancel).unwrap_err();
        assert!(matches!(err, CoreError::VersionConflict { expected: 4, current: 5 }));
    }

    #[test]
    fn path_traversal_is_refused() {
        let dir = TempDir::new().unwrap();
        let core = core(&dir);
        let cancel = CancellationToken::new();
        let fm = Frontmatter::default();

        let err = core.write_note("u1", "../evil.md", &fm, "x", None, &cancel).unwrap_err();
        assert!(matches!(err, CoreError::PathInvalid { .. }));

        let err = core.read_note("u1", "../u2/secret.md", &cancel).unwrap_err();
        assert!(matches!(err, CoreError::PathInvalid { .. }));
    }

    #[test]
    fn delete_then_create_restarts_at_version_one() {
        let dir = TempDir::new().unwrap();
        let core = core(&dir);
        let cancel = CancellationToken::new();
        let fm = Frontmatter::default();

        core.write_note("u1", "x.md", &fm, "v1", None, &cancel).unwrap();
        core.write_note("u1", "x.md", &fm, "v2", None, &cancel).unwrap();
        core.delete_note("u1", "x.md", &cancel).unwrap();
        let outcome = core.write_note("u1", "x.md", &fm, "v1-again", None, &cancel).unwrap();
        assert_eq!(outcome.version, 1);
    }

    #[test]
    fn quota_exceeded_rejects_new_note() {
        let dir = TempDir::new().unwrap();
        let mut config = ResolvedConfig::default();
        config.max_notes_per_user = 1;
        let core = Core::open_with_in_memory_index(dir.path(), config).unwrap();
        let cancel = CancellationToken::new();
        let fm = Frontmatter::default();

        core.write_note("u1", "a.md", &fm, "x", None, &cancel).unwrap();
        let err = core.write_note("u1", "b.md", &fm, "y", None, &cancel).unwrap_err();
        assert!(matches!(err, CoreError::QuotaExceeded { limit: 1 }));
    }

    #[test]
    fn cancelled_token_short_circuits() {
        let dir = TempDir::new().unwrap();
        let core = core(&dir);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = core.list_notes("u1", None, &cancel).unwrap_err();
        assert!(matches!(err, CoreError::Cancelled));
    }

    #[test]
    fn rebuild_repairs_index_vault_drift() {
        let dir = TempDir::new().unwrap();
        let core = core(&dir);
        let cancel = CancellationToken::new();
        let fm = Frontmatter::default();

        core.write_note("u1", "a.md", &fm, "body", None, &cancel).unwrap();
        // Simulate drift: delete the vault file directly, bypassing the facade.
        std::fs::remove_file(dir.path().join("u1").join("a.md")).unwrap();

        let outcome = core.rebuild_index("u1", &cancel).unwrap();
        assert_eq!(outcome.note_count, 0);
        let err = core.read_note("u1", "a.md", &cancel).unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }

    #[test]
    fn move_note_updates_path_and_bumps_version() {
        let dir = TempDir::new().unwrap();
        let core = core(&dir);
        let cancel = CancellationToken::new();
        let fm = Frontmatter::default();

        core.write_note("u1", "old.md", &fm, "body", None, &cancel).unwrap();
        let outcome = core.move_note("u1", "old.md", "new.md", &cancel).unwrap();
        assert_eq!(outcome.version, 2);

        let note = core.read_note("u1", "new.md", &cancel).unwrap();
        assert_eq!(note.body, "body");
        let err = core.read_note("u1", "old.md", &cancel).unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
    }
}
