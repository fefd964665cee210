//! Query sanitization, BM25 + recency ranking over the derived index, and
//! snippet generation from the vault.

pub mod snippet;

use chrono::{DateTime, Utc};
use rusqlite::params;

use crate::errors::CoreError;
use crate::index::IndexStore;
use crate::vault::VaultStore;

/// One ranked search result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub note_path: String,
    pub title: String,
    pub snippet: String,
    pub score: f64,
    pub updated: DateTime<Utc>,
}

/// Tunables pulled from [`crate::config::ResolvedConfig`]; kept as plain
/// fields here so this module has no direct dependency on the config crate
/// surface.
#[derive(Debug, Clone, Copy)]
pub struct SearchWeights {
    pub title_weight: f64,
    pub body_weight: f64,
    pub recency_bonus_recent_days: i64,
    pub recency_bonus_medium_days: i64,
}

/// Reduce a raw user query to a sequence of quoted FTS5 terms: each
/// whitespace-delimited token is stripped of everything but alphanumerics
/// and apostrophes (so `"don't"` survives and `"&"` disappears), quoted as a
/// literal phrase to neutralize FTS5 operator syntax, and a trailing `*` is
/// preserved outside the quotes as a prefix match. An empty result is a
/// user-facing [`CoreError::InvalidQuery`], not a panic or an unbounded scan.
pub fn sanitize_query(raw: &str) -> Result<String, CoreError> {
    let mut terms = Vec::new();
    for token in raw.split_whitespace() {
        let wants_prefix = token.len() > 1 && token.ends_with('*');
        let core: String = token
            .trim_end_matches('*')
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '\'')
            .collect();
        if core.is_empty() {
            continue;
        }
        let escaped = core.replace('"', "\"\"");
        if wants_prefix {
            terms.push(format!("\"{escaped}\"*"));
        } else {
            terms.push(format!("\"{escaped}\""));
        }
    }

    if terms.is_empty() {
        return Err(CoreError::InvalidQuery {
            reason: "query contains no searchable terms".to_string(),
        });
    }
    Ok(terms.join(" "))
}

struct RawHit {
    note_path: String,
    title: String,
    updated: DateTime<Utc>,
    raw_rank: f64,
}

fn recency_bonus(updated: DateTime<Utc>, now: DateTime<Utc>, weights: &SearchWeights) -> f64 {
    let age_days = (now - updated).num_days();
    if age_days <= weights.recency_bonus_recent_days {
        1.0
    } else if age_days <= weights.recency_bonus_medium_days {
        0.5
    } else {
        0.0
    }
}

/// Run a search for `user_id`, returning hits ordered by descending score
/// (BM25, weighted by column, plus a recency bonus), tie-broken by
/// `updated` descending then `note_path` ascending.
pub fn search(
    index: &IndexStore,
    vault: &VaultStore,
    user_id: &str,
    raw_query: &str,
    weights: &SearchWeights,
    now: DateTime<Utc>,
    limit: usize,
) -> Result<Vec<SearchHit>, CoreError> {
    let fts_query = sanitize_query(raw_query)?;
    let search_terms: Vec<String> = raw_query
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'').to_string())
        .filter(|t| !t.is_empty())
        .collect();

    let mut rows = index.with_conn(|conn| -> Result<Vec<RawHit>, rusqlite::Error> {
        let mut stmt = conn.prepare(
            "SELECT nm.note_path, nm.title, nm.updated, bm25(note_fts, ?1, ?2) AS raw_rank
             FROM note_fts
             JOIN note_metadata nm ON nm.id = note_fts.rowid
             WHERE note_fts MATCH ?3 AND nm.user_id = ?4",
        )?;
        let mapped = stmt.query_map(
            params![weights.title_weight, weights.body_weight, fts_query, user_id],
            |row| {
                let updated: String = row.get(2)?;
                Ok(RawHit {
                    note_path: row.get(0)?,
                    title: row.get(1)?,
                    updated: DateTime::parse_from_rfc3339(&updated)
                        .map(|dt| dt.with_timezone(&Utc))
                        .unwrap_or(now),
                    raw_rank: row.get(3)?,
                })
            },
        )?;
        mapped.collect::<Result<Vec<_>, _>>()
    })?;

    rows.sort_by(|a, b| {
        let score_a = -a.raw_rank + recency_bonus(a.updated, now, weights);
        let score_b = -b.raw_rank + recency_bonus(b.updated, now, weights);
        score_b
            .partial_cmp(&score_a)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.updated.cmp(&a.updated))
            .then_with(|| a.note_path.cmp(&b.note_path))
    });
    rows.truncate(limit);

    let hits = rows
        .into_iter()
        .map(|row| {
            let score = -row.raw_rank + recency_bonus(row.updated, now, weights);
            let body = vault.read(user_id, &row.note_path).map(|c| c.body).unwrap_or_default();
            SearchHit {
                snippet: snippet::make_snippet(&body, &search_terms),
                note_path: row.note_path,
                title: row.title,
                score,
                updated: row.updated,
            }
        })
        .collect();

    Ok(hits)
}
