//! Frontmatter types: a flat key/value map plus typed accessors for the two
//! fields the core treats specially (`title`, `tags`).

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::HashMap;

/// Parsed YAML frontmatter. Unknown keys pass through unchanged on
/// round-trip.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Frontmatter {
    #[serde(flatten)]
    pub fields: HashMap<String, Value>,
}

impl Frontmatter {
    pub fn title(&self) -> Option<String> {
        self.fields.get("title").and_then(|v| v.as_str()).map(str::to_owned)
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.fields.insert("title".to_string(), Value::String(title.into()));
    }

    /// Tags from the frontmatter `tags` list, lowercased and trimmed. A
    /// missing or non-list `tags` field yields an empty vec.
    pub fn tags(&self) -> Vec<String> {
        match self.fields.get("tags") {
            Some(Value::Sequence(seq)) => seq
                .iter()
                .filter_map(|v| v.as_str())
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Result of splitting frontmatter from a note body.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub frontmatter: Option<Frontmatter>,
    pub body: String,
}
