use std::path::PathBuf;

use serde::Deserialize;

/// Raw on-disk shape of the TOML config file.
#[derive(Debug, Deserialize)]
pub struct ConfigFile {
    pub version: u32,
    pub vault_root: String,
    pub database_path: String,
    #[serde(default = "default_max_note_size_bytes")]
    pub max_note_size_bytes: usize,
    #[serde(default = "default_max_notes_per_user")]
    pub max_notes_per_user: usize,
    #[serde(default = "default_recency_recent_days")]
    pub recency_bonus_recent_days: i64,
    #[serde(default = "default_recency_medium_days")]
    pub recency_bonus_medium_days: i64,
    #[serde(default = "default_title_weight")]
    pub title_weight: f64,
    #[serde(default = "default_body_weight")]
    pub body_weight: f64,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), file: None }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

pub(crate) fn default_max_note_size_bytes() -> usize {
    1_048_576
}

pub(crate) fn default_max_notes_per_user() -> usize {
    5_000
}

pub(crate) fn default_recency_recent_days() -> i64 {
    7
}

pub(crate) fn default_recency_medium_days() -> i64 {
    30
}

pub(crate) fn default_title_weight() -> f64 {
    3.0
}

pub(crate) fn default_body_weight() -> f64 {
    1.0
}

/// Fully resolved configuration, the only shape the rest of the crate sees.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub vault_root: PathBuf,
    pub database_path: PathBuf,
    pub max_note_size_bytes: usize,
    pub max_notes_per_user: usize,
    pub recency_bonus_recent_days: i64,
    pub recency_bonus_medium_days: i64,
    pub title_weight: f64,
    pub body_weight: f64,
    pub logging: LoggingConfig,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            vault_root: PathBuf::from("./vault"),
            database_path: PathBuf::from("./vault/index.sqlite3"),
            max_note_size_bytes: default_max_note_size_bytes(),
            max_notes_per_user: default_max_notes_per_user(),
            recency_bonus_recent_days: default_recency_recent_days(),
            recency_bonus_medium_days: default_recency_medium_days(),
            title_weight: default_title_weight(),
            body_weight: default_body_weight(),
            logging: LoggingConfig::default(),
        }
    }
}
