//! Filesystem-owned note storage: read, atomic write, delete, move, list.
//! Never looks outside `<vault_root>/<user_id>/`.

use std::fs::{self, File};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::path::{resolve_within_root, PathError};
use crate::frontmatter::{self, Frontmatter, ParsedDocument};

#[derive(Debug, Error)]
pub enum VaultStoreError {
    #[error(transparent)]
    Path(#[from] PathError),
    #[error("note not found: {0}")]
    NotFound(String),
    #[error("move target already exists: {0}")]
    Conflict(String),
    #[error("note body exceeds {max} bytes ({size} given)")]
    TooLarge { size: usize, max: usize },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid frontmatter: {0}")]
    Frontmatter(#[from] frontmatter::FrontmatterParseError),
}

/// A note's content as read from disk.
#[derive(Debug, Clone)]
pub struct NoteContent {
    pub frontmatter: Frontmatter,
    pub body: String,
    pub title: String,
    pub size_bytes: usize,
    pub modified: DateTime<Utc>,
}

/// Summary row returned by `list`.
#[derive(Debug, Clone)]
pub struct ListedNote {
    pub note_path: String,
    pub modified: DateTime<Utc>,
}

pub struct VaultStore {
    vault_root: PathBuf,
}

impl VaultStore {
    pub fn new(vault_root: impl Into<PathBuf>) -> Self {
        Self { vault_root: vault_root.into() }
    }

    fn user_root(&self, user_id: &str) -> PathBuf {
        self.vault_root.join(user_id)
    }

    fn resolve(&self, user_id: &str, note_path: &str) -> Result<PathBuf, VaultStoreError> {
        let root = self.user_root(user_id);
        Ok(resolve_within_root(&root, note_path)?)
    }

    pub fn read(&self, user_id: &str, note_path: &str) -> Result<NoteContent, VaultStoreError> {
        let abs = self.resolve(user_id, note_path)?;
        if !abs.is_file() {
            return Err(VaultStoreError::NotFound(note_path.to_string()));
        }
        let raw = fs::read_to_string(&abs)?;
        let metadata = fs::metadata(&abs)?;
        let modified = system_time_to_utc(metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH));

        let parsed = frontmatter::parse(&raw)?;
        let frontmatter = parsed.frontmatter.clone().unwrap_or_default();
        let title = derive_title(&frontmatter, &parsed.body, note_path);

        Ok(NoteContent {
            frontmatter,
            body: parsed.body,
            title,
            size_bytes: raw.len(),
            modified,
        })
    }

    /// Atomically write `frontmatter` + `body` to `note_path`. Caller is
    /// responsible for the quota check (it requires the index row count,
    /// which the vault store does not own).
    pub fn write(
        &self,
        user_id: &str,
        note_path: &str,
        frontmatter: &Frontmatter,
        body: &str,
        max_note_size_bytes: usize,
    ) -> Result<usize, VaultStoreError> {
        let abs = self.resolve(user_id, note_path)?;

        let doc = ParsedDocument { frontmatter: Some(frontmatter.clone()), body: body.to_string() };
        let rendered = frontmatter::serialize(&doc);
        let size = rendered.len();
        if size > max_note_size_bytes {
            return Err(VaultStoreError::TooLarge { size, max: max_note_size_bytes });
        }

        if let Some(parent) = abs.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = tmp_sibling(&abs);
        {
            let mut tmp = File::create(&tmp_path)?;
            tmp.write_all(rendered.as_bytes())?;
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, &abs)?;

        Ok(size)
    }

    pub fn delete(&self, user_id: &str, note_path: &str) -> Result<(), VaultStoreError> {
        let abs = self.resolve(user_id, note_path)?;
        if !abs.is_file() {
            return Err(VaultStoreError::NotFound(note_path.to_string()));
        }
        fs::remove_file(&abs)?;
        Ok(())
    }

    pub fn mv(
        &self,
        user_id: &str,
        old_path: &str,
        new_path: &str,
    ) -> Result<(), VaultStoreError> {
        let old_abs = self.resolve(user_id, old_path)?;
        let new_abs = self.resolve(user_id, new_path)?;

        if !old_abs.is_file() {
            return Err(VaultStoreError::NotFound(old_path.to_string()));
        }
        if new_abs.exists() {
            return Err(VaultStoreError::Conflict(new_path.to_string()));
        }
        if let Some(parent) = new_abs.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(&old_abs, &new_abs)?;
        Ok(())
    }

    /// List notes under `folder` (or the whole vault if `None`). The walk is
    /// recursive; every note under the given prefix is returned, not just
    /// its immediate children.
    pub fn list(
        &self,
        user_id: &str,
        folder: Option<&str>,
    ) -> Result<Vec<ListedNote>, VaultStoreError> {
        let root = self.user_root(user_id);
        if !root.exists() {
            return Ok(Vec::new());
        }
        let walker = super::walker::VaultWalker::new(&root)
            .map_err(|e| VaultStoreError::Io(std::io::Error::other(e.to_string())))?;
        let files = walker
            .walk()
            .map_err(|e| VaultStoreError::Io(std::io::Error::other(e.to_string())))?;

        let prefix = folder.map(|f| f.trim_end_matches('/').to_string());
        let mut out = Vec::new();
        for f in files {
            let rel = f.relative_path.to_string_lossy().replace('\\', "/");
            if let Some(p) = &prefix
                && !rel.starts_with(p.as_str())
            {
                continue;
            }
            out.push(ListedNote { note_path: rel, modified: system_time_to_utc(f.modified) });
        }
        Ok(out)
    }
}

fn tmp_sibling(target: &Path) -> PathBuf {
    let file_name = target.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
    let unique = std::process::id();
    let tmp_name = format!(".{file_name}.tmp-{unique}-{:?}", std::time::Instant::now());
    target.with_file_name(tmp_name)
}

fn system_time_to_utc(t: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(t)
}

/// Frontmatter `title` if present, else first `#`-level heading of the body,
/// else the filename stem. (Open Question 2 in DESIGN.md: frontmatter wins.)
pub fn derive_title(frontmatter: &Frontmatter, body: &str, note_path: &str) -> String {
    if let Some(t) = frontmatter.title() {
        return t;
    }
    for line in body.lines() {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix("# ") {
            return rest.trim().to_string();
        }
        if trimmed == "#" {
            return String::new();
        }
    }
    Path::new(note_path)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| note_path.to_string())
}
