//! Pure path validation. No rule here touches the filesystem; callers run
//! this before any I/O so a bad path never has a side effect.

use std::path::{Component, Path, PathBuf};
use thiserror::Error;

const MAX_PATH_BYTES: usize = 256;

const RESERVED_STEMS: &[&str] = &[
    "con", "prn", "aux", "nul", "com1", "com2", "com3", "com4", "com5", "com6", "com7",
    "com8", "com9", "lpt1", "lpt2", "lpt3", "lpt4", "lpt5", "lpt6", "lpt7", "lpt8", "lpt9",
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("path exceeds {MAX_PATH_BYTES} bytes")]
    TooLong,
    #[error("path contains an empty, '.', or '..' segment")]
    BadSegment,
    #[error("path contains a backslash")]
    Backslash,
    #[error("path contains a null or control character")]
    ControlChar,
    #[error("path uses a reserved filename")]
    Reserved,
    #[error("path must end in .md")]
    NotMarkdown,
    #[error("path escapes the vault root")]
    Escapes,
}

/// Validate a `note_path` against the rules that don't require resolving
/// against a concrete vault root. Returns the validated, forward-slash
/// relative path unchanged.
pub fn validate_note_path(note_path: &str) -> Result<(), PathError> {
    if note_path.len() > MAX_PATH_BYTES {
        return Err(PathError::TooLong);
    }
    if note_path.contains('\\') {
        return Err(PathError::Backslash);
    }
    if note_path.starts_with('/') {
        return Err(PathError::BadSegment);
    }
    if note_path.chars().any(|c| c == '\0' || (c.is_control())) {
        return Err(PathError::ControlChar);
    }
    if !note_path.ends_with(".md") {
        return Err(PathError::NotMarkdown);
    }

    let segments: Vec<&str> = note_path.split('/').collect();
    for seg in &segments {
        if seg.is_empty() || *seg == "." || *seg == ".." {
            return Err(PathError::BadSegment);
        }
        let stem = seg.strip_suffix(".md").unwrap_or(seg);
        if RESERVED_STEMS.contains(&stem.to_ascii_lowercase().as_str()) {
            return Err(PathError::Reserved);
        }
    }

    Ok(())
}

/// Resolve `note_path` against `user_root` and enforce rule 7: the resolved
/// path must be a strict descendant of the (canonicalized) user root, with no
/// symlink escape.
///
/// `user_root` need not exist yet; if it doesn't, the join is checked
/// component-wise instead of via `canonicalize`.
pub fn resolve_within_root(user_root: &Path, note_path: &str) -> Result<PathBuf, PathError> {
    validate_note_path(note_path)?;

    let joined = user_root.join(note_path);

    // Component-wise check: guards against ".." even though validate_note_path
    // already rejects literal ".." segments; this also catches the resolved
    // absolute form if callers ever pass a path with platform separators.
    let rel = joined.strip_prefix(user_root).map_err(|_| PathError::Escapes)?;
    if rel.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(PathError::Escapes);
    }

    match user_root.canonicalize() {
        Ok(canonical_root) => {
            // The file may not exist yet (write path); canonicalize the
            // deepest existing ancestor and confirm it's under canonical_root.
            let mut probe = joined.clone();
            let existing = loop {
                if probe.exists() {
                    break probe.canonicalize().map_err(|_| PathError::Escapes)?;
                }
                match probe.parent() {
                    Some(parent) if parent != probe => probe = parent.to_path_buf(),
                    _ => break canonical_root.clone(),
                }
            };
            if !existing.starts_with(&canonical_root) {
                return Err(PathError::Escapes);
            }
        }
        Err(_) => {
            // Root doesn't exist on disk yet (first write for this user).
        }
    }

    Ok(joined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn rejects_parent_segments() {
        assert_eq!(validate_note_path("../evil.md"), Err(PathError::BadSegment));
        assert_eq!(validate_note_path("a/../b.md"), Err(PathError::BadSegment));
    }

    #[test]
    fn rejects_backslash() {
        assert_eq!(validate_note_path("a\\b.md"), Err(PathError::Backslash));
    }

    #[test]
    fn rejects_non_markdown() {
        assert_eq!(validate_note_path("note.txt"), Err(PathError::NotMarkdown));
    }

    #[test]
    fn rejects_reserved_names() {
        assert_eq!(validate_note_path("CON.md"), Err(PathError::Reserved));
        assert_eq!(validate_note_path("folder/nul.md"), Err(PathError::Reserved));
    }

    #[test]
    fn rejects_control_chars() {
        assert_eq!(validate_note_path("a\0b.md"), Err(PathError::ControlChar));
    }

    #[test]
    fn accepts_nested_valid_path() {
        assert!(validate_note_path("folder/sub/note.md").is_ok());
    }

    #[test]
    fn resolve_within_root_rejects_traversal() {
        let dir = TempDir::new().unwrap();
        let result = resolve_within_root(dir.path(), "../../etc/passwd.md");
        assert!(result.is_err());
    }

    #[test]
    fn resolve_within_root_accepts_valid_path() {
        let dir = TempDir::new().unwrap();
        let result = resolve_within_root(dir.path(), "notes/a.md").unwrap();
        assert_eq!(result, dir.path().join("notes/a.md"));
    }

    #[test]
    fn resolve_within_root_rejects_symlink_escape() {
        let dir = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        std::fs::write(outside.path().join("secret.md"), "x").unwrap();
        #[cfg(unix)]
        {
            std::os::unix::fs::symlink(outside.path(), dir.path().join("escape")).unwrap();
            let result = resolve_within_root(dir.path(), "escape/secret.md");
            assert!(result.is_err());
        }
    }
}
