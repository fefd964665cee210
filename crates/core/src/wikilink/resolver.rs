//! Deterministic target selection for a wikilink occurrence. This module is
//! pure: it receives the candidate set already queried from the index (by
//! `normalized_title_slug` or `normalized_path_slug`) and applies the
//! folder-preference then lexicographic tie-break.

use std::path::Path;

/// A note eligible to be a wikilink target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub note_path: String,
}

/// Resolve `slug_l` against `candidates` for a link occurring in `source_path`.
/// Returns `None` if there is no candidate (the link stays unresolved).
pub fn resolve_target(candidates: &[Candidate], source_path: &str) -> Option<String> {
    if candidates.is_empty() {
        return None;
    }
    if candidates.len() == 1 {
        return Some(candidates[0].note_path.clone());
    }

    let source_folder = folder_of(source_path);
    let same_folder: Vec<&Candidate> =
        candidates.iter().filter(|c| folder_of(&c.note_path) == source_folder).collect();

    let pool: Vec<&Candidate> = if same_folder.is_empty() { candidates.iter().collect() } else { same_folder };

    pool.into_iter().map(|c| c.note_path.clone()).min()
}

fn folder_of(note_path: &str) -> String {
    Path::new(note_path).parent().map(|p| p.to_string_lossy().to_string()).unwrap_or_default()
}
