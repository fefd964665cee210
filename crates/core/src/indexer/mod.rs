//! The only code that turns a note's content into rows in the derived
//! SQLite index. Every operation here runs inside a single transaction so
//! the index is never observed half-updated.

use std::path::Path;

use chrono::{DateTime, Utc};

use crate::frontmatter::Frontmatter;
use crate::index::db::{self, IndexError};
use crate::index::types::NoteMetadata;
use crate::index::IndexStore;
use crate::vault::VaultWalker;
use crate::wikilink::{self, Candidate};

/// Re-resolve a slug's wikilinks against every unresolved link in the user's
/// graph after a note is indexed under that slug, and correct already
/// resolved links whose target changed identity under the hood. Matches the
/// set of slugs a note answers to (title slug and path slug).
fn reresolve_inbound(
    conn: &rusqlite::Transaction,
    user_id: &str,
    note_path: &str,
) -> Result<(), IndexError> {
    for link in db::unresolved_links(conn, user_id)? {
        let candidates = db::candidates_by_slug(conn, user_id, &wikilink::normalize(&link.link_text))?;
        if let Some(target) = wikilink::resolve_target(&candidates, &link.source_path) {
            if target == note_path {
                db::set_link_target(conn, user_id, &link.source_path, &link.link_text, Some(&target))?;
            }
        }
    }
    Ok(())
}

/// Extract, resolve, and persist every outbound wikilink for `note_path`,
/// then re-resolve any previously-unresolved link elsewhere in the vault
/// that could now point at this note.
fn index_links(
    conn: &rusqlite::Transaction,
    user_id: &str,
    note_path: &str,
    body: &str,
) -> Result<(), IndexError> {
    let mut resolved = Vec::new();
    for link in wikilink::extract_links(body) {
        let slug = wikilink::normalize(&link.link_text);
        let candidates: Vec<Candidate> = db::candidates_by_slug(conn, user_id, &slug)?;
        let target = wikilink::resolve_target(&candidates, note_path);
        resolved.push((link.link_text, target));
    }
    db::replace_outbound_links(conn, user_id, note_path, &resolved)?;
    reresolve_inbound(conn, user_id, note_path)?;
    Ok(())
}

/// Upsert metadata, FTS shadow row, tags, and outbound links for one note,
/// in a single transaction. `now` is supplied by the caller rather than
/// read from the clock so the operation stays testable.
pub fn index_note(
    store: &IndexStore,
    user_id: &str,
    note_path: &str,
    title: &str,
    body: &str,
    size_bytes: usize,
    frontmatter: &Frontmatter,
    now: DateTime<Utc>,
) -> Result<NoteMetadata, IndexError> {
    let title_slug = wikilink::normalize(title);
    let path_slug = wikilink::normalize(stem(note_path));
    let tags = frontmatter.tags();

    store.transaction(|tx| {
        let meta = db::upsert_metadata(
            tx,
            user_id,
            note_path,
            title,
            size_bytes as i64,
            &title_slug,
            &path_slug,
            now,
        )?;
        db::replace_fts(tx, meta.id, title, body)?;
        db::replace_tags(tx, user_id, note_path, &tags)?;
        index_links(tx, user_id, note_path, body)?;
        db::touch_incremental(tx, user_id, now)?;
        Ok(meta)
    })
}

/// Remove a note's metadata, FTS row, tags, and outbound links; inbound
/// resolved links that pointed at it become unresolved (rows preserved,
/// not deleted).
pub fn unindex_note(
    store: &IndexStore,
    user_id: &str,
    note_path: &str,
    now: DateTime<Utc>,
) -> Result<(), IndexError> {
    store.transaction(|tx| {
        db::delete_outbound_links(tx, user_id, note_path)?;
        db::delete_tags(tx, user_id, note_path)?;
        db::delete_metadata(tx, user_id, note_path)?;
        db::unresolve_links_to(tx, user_id, note_path)?;
        db::touch_incremental(tx, user_id, now)?;
        Ok(())
    })
}

/// Rewrite `note_path` on the metadata row (bumping `version`), repoint
/// outbound link ownership, retarget resolved inbound links, and
/// re-resolve anything that could now match the new path slug.
pub fn move_note(
    store: &IndexStore,
    user_id: &str,
    old_path: &str,
    new_path: &str,
    now: DateTime<Utc>,
) -> Result<NoteMetadata, IndexError> {
    store.transaction(|tx| {
        db::get_metadata(tx, user_id, old_path)?
            .ok_or_else(|| IndexError::NotFound { path: old_path.to_string() })?;

        let new_path_slug = wikilink::normalize(stem(new_path));
        db::update_note_path(tx, user_id, old_path, new_path, &new_path_slug)?;
        let bumped = db::bump_version(tx, user_id, new_path, now)?;

        db::update_links_source_path(tx, user_id, old_path, new_path)?;
        db::retarget_links(tx, user_id, old_path, new_path)?;
        reresolve_inbound(tx, user_id, new_path)?;
        db::touch_incremental(tx, user_id, now)?;
        Ok(bumped)
    })
}

/// Outcome of `RebuildAll`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebuildStats {
    pub notes_indexed: usize,
}

/// Deterministically recreate the entire index for a user from the
/// vault's current contents, discarding whatever was there. Reads files
/// directly (rather than through [`crate::vault::VaultStore`]) since the
/// indexer owns no write path into the vault and only needs the parsed
/// frontmatter and body, which [`crate::frontmatter::parse`] already
/// provides context-free. `user_root` not existing yet is zero notes, not
/// an error: a brand-new user has an empty vault.
pub fn rebuild_all(
    store: &IndexStore,
    user_id: &str,
    user_root: &Path,
    now: impl Fn() -> DateTime<Utc>,
    is_cancelled: impl Fn() -> bool,
) -> Result<RebuildStats, IndexError> {
    store.transaction(|tx| db::clear_user(tx, user_id))?;

    let walker = match VaultWalker::new(user_root) {
        Ok(w) => w,
        Err(_) => {
            store.transaction(|tx| db::touch_full_rebuild(tx, user_id, now()))?;
            return Ok(RebuildStats { notes_indexed: 0 });
        }
    };
    let files = walker.walk().map_err(|e| IndexError::Walk(e.to_string()))?;

    let mut notes_indexed = 0;
    for file in files {
        if is_cancelled() {
            break;
        }
        let Ok(raw) = std::fs::read_to_string(&file.absolute_path) else { continue };
        let Ok(parsed) = crate::frontmatter::parse(&raw) else { continue };
        let frontmatter = parsed.frontmatter.clone().unwrap_or_default();
        let note_path = file.relative_path.to_string_lossy().replace('\\', "/");
        let title = crate::vault::store::derive_title(&frontmatter, &parsed.body, &note_path);

        index_note(
            store,
            user_id,
            &note_path,
            &title,
            &parsed.body,
            raw.len(),
            &frontmatter,
            now(),
        )?;
        notes_indexed += 1;
    }

    store.transaction(|tx| db::touch_full_rebuild(tx, user_id, now()))?;
    Ok(RebuildStats { notes_indexed })
}

fn stem(note_path: &str) -> &str {
    Path::new(note_path).file_stem().and_then(|s| s.to_str()).unwrap_or(note_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontmatter::Frontmatter;

    fn store() -> IndexStore {
        IndexStore::open_in_memory().unwrap()
    }

    #[test]
    fn index_note_creates_metadata_and_fts() {
        let store = store();
        let fm = Frontmatter::default();
        let meta = index_note(&store, "u1", "a.md", "Title", "body text", 9, &fm, Utc::now()).unwrap();
        assert_eq!(meta.version, 1);
        assert_eq!(meta.title, "Title");
    }

    #[test]
    fn reindexing_same_note_increments_version() {
        let store = store();
        let fm = Frontmatter::default();
        index_note(&store, "u1", "a.md", "T", "body", 4, &fm, Utc::now()).unwrap();
        let meta = index_note(&store, "u1", "a.md", "T2", "body2", 5, &fm, Utc::now()).unwrap();
        assert_eq!(meta.version, 2);
    }

    #[test]
    fn wikilink_resolves_once_target_is_indexed() {
        let store = store();
        let fm = Frontmatter::default();
        index_note(&store, "u1", "src.md", "Source", "See [[Target Note]]", 20, &fm, Utc::now()).unwrap();

        let links = store.with_conn(|c| db::unresolved_links(c, "u1").unwrap());
        assert_eq!(links.len(), 1);

        index_note(&store, "u1", "target-note.md", "Target Note", "body", 4, &fm, Utc::now()).unwrap();

        let links = store.with_conn(|c| db::unresolved_links(c, "u1").unwrap());
        assert!(links.is_empty());
    }

    #[test]
    fn unindex_removes_metadata_and_unresolves_backlinks() {
        let store = store();
        let fm = Frontmatter::default();
        index_note(&store, "u1", "target.md", "Target", "body", 4, &fm, Utc::now()).unwrap();
        index_note(&store, "u1", "src.md", "Source", "See [[Target]]", 13, &fm, Utc::now()).unwrap();

        unindex_note(&store, "u1", "target.md", Utc::now()).unwrap();

        assert!(store.with_conn(|c| db::get_metadata(c, "u1", "target.md").unwrap()).is_none());
        let links = store.with_conn(|c| db::unresolved_links(c, "u1").unwrap());
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].target_path, None);
    }

    #[test]
    fn move_note_bumps_version_and_retargets_backlinks() {
        let store = store();
        let fm = Frontmatter::default();
        index_note(&store, "u1", "old.md", "Old", "body", 4, &fm, Utc::now()).unwrap();
        index_note(&store, "u1", "src.md", "Source", "See [[Old]]", 11, &fm, Utc::now()).unwrap();

        let meta = move_note(&store, "u1", "old.md", "new.md", Utc::now()).unwrap();
        assert_eq!(meta.note_path, "new.md");
        assert_eq!(meta.version, 2);

        let backlinks = store.with_conn(|c| db::backlinks(c, "u1", "new.md").unwrap());
        assert_eq!(backlinks.len(), 1);
        assert_eq!(backlinks[0].source_path, "src.md");
    }

    #[test]
    fn move_missing_note_is_not_found() {
        let store = store();
        let err = move_note(&store, "u1", "missing.md", "new.md", Utc::now()).unwrap_err();
        assert!(matches!(err, IndexError::NotFound { .. }));
    }

    #[test]
    fn rebuild_all_on_missing_vault_dir_is_zero_notes() {
        let store = store();
        let dir = tempfile::TempDir::new().unwrap();
        let missing_user_root = dir.path().join("nobody");
        let stats =
            rebuild_all(&store, "u1", &missing_user_root, Utc::now, || false).unwrap();
        assert_eq!(stats.notes_indexed, 0);
    }

    #[test]
    fn rebuild_all_indexes_every_markdown_file() {
        let store = store();
        let dir = tempfile::TempDir::new().unwrap();
        let user_root = dir.path().join("u1");
        std::fs::create_dir_all(&user_root).unwrap();
        std::fs::write(user_root.join("a.md"), "# A\nbody").unwrap();
        std::fs::write(user_root.join("b.md"), "# B\nbody").unwrap();

        let stats = rebuild_all(&store, "u1", &user_root, Utc::now, || false).unwrap();
        assert_eq!(stats.notes_indexed, 2);
        assert_eq!(store.with_conn(|c| db::count_notes(c, "u1").unwrap()), 2);
    }

    #[test]
    fn rebuild_all_discards_stale_rows_not_on_disk() {
        let store = store();
        let fm = Frontmatter::default();
        index_note(&store, "u1", "stale.md", "Stale", "body", 4, &fm, Utc::now()).unwrap();

        let dir = tempfile::TempDir::new().unwrap();
        let user_root = dir.path().join("u1");
        std::fs::create_dir_all(&user_root).unwrap();
        std::fs::write(user_root.join("fresh.md"), "# Fresh\nbody").unwrap();

        rebuild_all(&store, "u1", &user_root, Utc::now, || false).unwrap();

        assert!(store.with_conn(|c| db::get_metadata(c, "u1", "stale.md").unwrap()).is_none());
        assert!(store.with_conn(|c| db::get_metadata(c, "u1", "fresh.md").unwrap()).is_some());
    }
}
