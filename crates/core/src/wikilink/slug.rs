//! Slug normalization: the key used to resolve `[[LinkText]]` occurrences
//! against note titles and filename stems.

use std::sync::LazyLock;

use regex::Regex;

static WHITESPACE_OR_UNDERSCORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s_]+").expect("static regex"));
static NOT_ALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9/-]").expect("static regex"));
static REPEATED_HYPHENS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-{2,}").expect("static regex"));

/// 1. Lowercase (Unicode-aware).
/// 2. Replace runs of whitespace/underscores with a single hyphen.
/// 3. Strip characters outside `[a-z0-9/-]`.
/// 4. Collapse repeated hyphens; trim leading/trailing hyphens.
pub fn normalize(input: &str) -> String {
    let lowered = input.to_lowercase();
    let hyphenated = WHITESPACE_OR_UNDERSCORE.replace_all(&lowered, "-");
    let stripped = NOT_ALLOWED.replace_all(&hyphenated, "");
    let collapsed = REPEATED_HYPHENS.replace_all(&stripped, "-");
    collapsed.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("API Documentation", "api-documentation")]
    #[case("  spaced  out  ", "spaced-out")]
    #[case("Under_Score_Case", "under-score-case")]
    #[case("Ünïcødé Title", "ncd-title")]
    #[case("folder/Name", "folder/name")]
    #[case("---leading-and-trailing---", "leading-and-trailing")]
    #[case("multi---hyphen", "multi-hyphen")]
    fn normalizes_as_expected(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize(input), expected);
    }
}
