//! Snippet generation for search hits.
//!
//! `note_fts` is a contentless FTS5 table (`content=''`) so SQLite's
//! built-in `snippet()`/`highlight()` functions are unavailable: they need
//! the original text, which a contentless table never stores. Hits are
//! instead re-read from the vault and highlighted here.

const MAX_SNIPPET_LEN: usize = 200;
const CONTEXT_BEFORE: usize = 60;

/// Build a snippet around the first case-insensitive occurrence of any of
/// `terms` in `body`, wrapping the match in `<mark>...</mark>` and
/// truncating to roughly [`MAX_SNIPPET_LEN`] characters with ellipses where
/// content was cut.
pub fn make_snippet(body: &str, terms: &[String]) -> String {
    let hit = terms
        .iter()
        .filter(|t| !t.is_empty())
        .filter_map(|t| find_case_insensitive(body, t))
        .min_by_key(|(idx, _)| *idx);

    let Some((match_start, match_len)) = hit else {
        return truncate_from_start(body.trim());
    };

    let window_start = match_start.saturating_sub(CONTEXT_BEFORE);
    let start = floor_char_boundary(body, window_start);
    let window_end = (match_start + match_len + (MAX_SNIPPET_LEN - CONTEXT_BEFORE)).min(body.len());
    let end = ceil_char_boundary(body, window_end);

    let prefix = if start > 0 { "…" } else { "" };
    let suffix = if end < body.len() { "…" } else { "" };

    let before = &body[start..match_start];
    let matched = &body[match_start..match_start + match_len];
    let after = &body[match_start + match_len..end];

    format!("{prefix}{before}<mark>{matched}</mark>{after}{suffix}").replace('\n', " ")
}

/// Find the first case-insensitive occurrence of `term` in `body`, returning
/// a `(start, len)` byte range that is always a valid slice of `body`
/// itself. Compares via per-char `to_lowercase()` folding rather than
/// lowercasing the whole string up front, so a match never has to be
/// translated back across a lowercasing that changed some other
/// character's byte length (e.g. Turkish `İ`, U+0130, folds to two chars).
fn find_case_insensitive(body: &str, term: &str) -> Option<(usize, usize)> {
    let term_lower: Vec<char> = term.chars().flat_map(char::to_lowercase).collect();
    if term_lower.is_empty() {
        return None;
    }
    let body_chars: Vec<(usize, char)> = body.char_indices().collect();

    'start: for start_idx in 0..body_chars.len() {
        let mut term_pos = 0;
        let mut body_idx = start_idx;
        while term_pos < term_lower.len() {
            let Some(&(_, c)) = body_chars.get(body_idx) else { continue 'start };
            for folded in c.to_lowercase() {
                if term_pos >= term_lower.len() || folded != term_lower[term_pos] {
                    continue 'start;
                }
                term_pos += 1;
            }
            body_idx += 1;
        }
        let start_byte = body_chars[start_idx].0;
        let end_byte = body_chars.get(body_idx).map(|&(b, _)| b).unwrap_or(body.len());
        return Some((start_byte, end_byte - start_byte));
    }
    None
}

fn truncate_from_start(body: &str) -> String {
    if body.len() <= MAX_SNIPPET_LEN {
        return body.replace('\n', " ");
    }
    let end = floor_char_boundary(body, MAX_SNIPPET_LEN);
    format!("{}…", body[..end].replace('\n', " "))
}

fn floor_char_boundary(s: &str, idx: usize) -> usize {
    let mut i = idx.min(s.len());
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn ceil_char_boundary(s: &str, idx: usize) -> usize {
    let mut i = idx.min(s.len());
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highlights_first_match() {
        let snippet = make_snippet("the quick brown fox jumps", &["brown".to_string()]);
        assert!(snippet.contains("<mark>brown</mark>"));
    }

    #[test]
    fn case_insensitive_match() {
        let snippet = make_snippet("The Quick Brown Fox", &["brown".to_string()]);
        assert!(snippet.to_lowercase().contains("<mark>brown</mark>"));
    }

    #[test]
    fn no_match_falls_back_to_leading_text() {
        let snippet = make_snippet("no relevant terms here", &["zzz".to_string()]);
        assert!(!snippet.contains("<mark>"));
        assert!(snippet.starts_with("no relevant"));
    }

    #[test]
    fn long_body_is_truncated_with_ellipsis() {
        let body = format!("{}TARGET{}", "a".repeat(500), "b".repeat(500));
        let snippet = make_snippet(&body, &["target".to_string()]);
        assert!(snippet.contains("…"));
        assert!(snippet.len() < body.len());
    }

    #[test]
    fn picks_the_earliest_of_multiple_terms() {
        let snippet = make_snippet("alpha then beta then gamma", &["gamma".to_string(), "beta".to_string()]);
        assert!(snippet.contains("<mark>beta</mark>"));
    }

    #[test]
    fn lowercasing_length_change_before_match_does_not_panic_or_desync() {
        // U+0130 (LATIN CAPITAL LETTER I WITH DOT ABOVE) is 2 bytes but folds
        // to "i̇" (3 bytes), shifting every later offset if a match were
        // located via a separately-lowercased copy of the body.
        let body = "İstanbul notes: remember the target before travel";
        let snippet = make_snippet(body, &["target".to_string()]);
        assert!(snippet.contains("<mark>target</mark>"));
    }

    #[test]
    fn multibyte_text_around_match_does_not_panic() {
        let body = "héllo wörld café target 日本語のテキスト";
        let snippet = make_snippet(body, &["target".to_string()]);
        assert!(snippet.contains("<mark>target</mark>"));
    }
}
