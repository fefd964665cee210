//! The single closed error set returned by every [`crate::facade::Core`] operation.

use thiserror::Error;

/// Exhaustive error kind for the core's public surface.
///
/// No variant is ever translated into another to hide information; callers are
/// expected to pattern-match on the tag and use the carried payload (e.g. the
/// current version on [`CoreError::VersionConflict`]).
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid note path: {path}")]
    PathInvalid { path: String },

    #[error("note body exceeds the maximum size ({size} > {max} bytes)")]
    TooLarge { size: usize, max: usize },

    #[error("user has reached the maximum number of notes ({limit})")]
    QuotaExceeded { limit: usize },

    #[error("note not found: {path}")]
    NotFound { path: String },

    #[error("move target already exists: {path}")]
    Conflict { path: String },

    #[error("version conflict: expected {expected}, current is {current}")]
    VersionConflict { expected: i64, current: i64 },

    #[error("invalid search query: {reason}")]
    InvalidQuery { reason: String },

    #[error("index is corrupt and disagrees with the vault: {detail}; run RebuildIndex to recover")]
    IndexCorrupt { detail: String },

    #[error("operation was cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl From<crate::vault::path::PathError> for CoreError {
    fn from(err: crate::vault::path::PathError) -> Self {
        CoreError::PathInvalid { path: err.to_string() }
    }
}

impl From<crate::index::schema::SchemaError> for CoreError {
    fn from(err: crate::index::schema::SchemaError) -> Self {
        CoreError::Internal(err.to_string())
    }
}

impl From<crate::index::db::IndexError> for CoreError {
    fn from(err: crate::index::db::IndexError) -> Self {
        match err {
            crate::index::db::IndexError::NotFound { path } => CoreError::NotFound { path },
            other => CoreError::Internal(other.to_string()),
        }
    }
}

impl From<crate::vault::store::VaultStoreError> for CoreError {
    fn from(err: crate::vault::store::VaultStoreError) -> Self {
        use crate::vault::store::VaultStoreError as E;
        match err {
            E::Path(path_err) => CoreError::from(path_err),
            E::NotFound(path) => CoreError::NotFound { path },
            E::Conflict(path) => CoreError::Conflict { path },
            E::TooLarge { size, max } => CoreError::TooLarge { size, max },
            other => CoreError::Internal(other.to_string()),
        }
    }
}

impl From<crate::config::ConfigError> for CoreError {
    fn from(err: crate::config::ConfigError) -> Self {
        CoreError::Internal(err.to_string())
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Internal(err.to_string())
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        CoreError::Internal(err.to_string())
    }
}
