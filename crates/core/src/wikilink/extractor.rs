//! Extracts `[[LinkText]]` occurrences from a note body. Only the base form
//! is recognized; aliases and anchors are not part of the grammar, but a
//! `|` or `#` inside the braces truncates the link text rather than being
//! rejected.

use std::sync::LazyLock;

use regex::Regex;

static WIKILINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([^\]]+)\]\]").expect("static regex"));

/// A single `[[...]]` occurrence found in a note body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedLink {
    pub link_text: String,
}

/// Extract every wikilink occurrence, in order of appearance. Duplicate link
/// texts are preserved as-is here; the indexer is responsible for the
/// `(user_id, source_path, link_text)` uniqueness the schema enforces.
pub fn extract_links(body: &str) -> Vec<ExtractedLink> {
    WIKILINK_RE
        .captures_iter(body)
        .map(|cap| {
            let raw = cap.get(1).map(|m| m.as_str()).unwrap_or("").trim();
            let link_text = truncate_at_pipe_or_hash(raw).trim().to_string();
            ExtractedLink { link_text }
        })
        .filter(|l| !l.link_text.is_empty())
        .collect()
}

fn truncate_at_pipe_or_hash(raw: &str) -> &str {
    let end = raw
        .char_indices()
        .find(|(_, c)| *c == '|' || *c == '#')
        .map(|(i, _)| i)
        .unwrap_or(raw.len());
    &raw[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_simple_wikilink() {
        let links = extract_links("See [[API Documentation]] for details.");
        assert_eq!(links, vec![ExtractedLink { link_text: "API Documentation".into() }]);
    }

    #[test]
    fn truncates_at_pipe() {
        let links = extract_links("[[Target|Alias Text]]");
        assert_eq!(links[0].link_text, "Target");
    }

    #[test]
    fn truncates_at_hash() {
        let links = extract_links("[[Some Note#Section Heading]]");
        assert_eq!(links[0].link_text, "Some Note");
    }

    #[test]
    fn extracts_multiple_links_in_order() {
        let links = extract_links("[[One]] then [[Two]] then [[Three]]");
        let texts: Vec<_> = links.iter().map(|l| l.link_text.clone()).collect();
        assert_eq!(texts, vec!["One", "Two", "Three"]);
    }

    #[test]
    fn ignores_empty_brackets() {
        let links = extract_links("[[]]");
        assert!(links.is_empty());
    }

    #[test]
    fn no_links_in_plain_text() {
        assert!(extract_links("no links here").is_empty());
    }
}
