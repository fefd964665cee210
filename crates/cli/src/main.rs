#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]

//! `nv`: an illustrative, non-authoritative driver for the notevault core
//! facade. Other surfaces exposing the same operations (a REST API, a
//! tool-call interface) would sit alongside this one; this binary exists
//! for local inspection and scripting, not as the system of record for how
//! the facade should be exposed.

mod logging;

use std::io::Read as _;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use notevault_core::concurrency::CancellationToken;
use notevault_core::config::{ConfigLoader, ResolvedConfig};
use notevault_core::frontmatter::Frontmatter;
use notevault_core::{Core, CoreError};

#[derive(Parser)]
#[command(name = "nv", version, about = "Multi-tenant Markdown note store")]
struct Cli {
    /// Path to config.toml; defaults to the platform config directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List notes for a user, optionally scoped to a folder prefix.
    List {
        #[arg(long)]
        user: String,
        #[arg(long)]
        folder: Option<String>,
    },
    /// Read a single note.
    Read {
        #[arg(long)]
        user: String,
        path: String,
    },
    /// Write a note; body is read from stdin unless `--body-file` is given.
    Write {
        #[arg(long)]
        user: String,
        path: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        body_file: Option<PathBuf>,
        #[arg(long)]
        if_version: Option<i64>,
    },
    /// Delete a note.
    Delete {
        #[arg(long)]
        user: String,
        path: String,
    },
    /// Move (rename) a note.
    Move {
        #[arg(long)]
        user: String,
        old: String,
        new: String,
    },
    /// Full-text search over a user's notes.
    Search {
        #[arg(long)]
        user: String,
        query: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Notes that link to the given note.
    Backlinks {
        #[arg(long)]
        user: String,
        path: String,
    },
    /// Tag usage counts across a user's vault.
    Tags {
        #[arg(long)]
        user: String,
    },
    /// Rebuild the derived index for a user from the vault's current state.
    Rebuild {
        #[arg(long)]
        user: String,
    },
    /// Index health (note count, last rebuild/update timestamps).
    Health {
        #[arg(long)]
        user: String,
    },
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let config: ResolvedConfig = ConfigLoader::load(cli.config.as_deref())
        .unwrap_or_else(|_| ResolvedConfig::default());
    logging::init(&config);

    let core = Core::open(config)?;
    let cancel = CancellationToken::new();

    match run(&core, &cancel, cli.command) {
        Ok(()) => Ok(()),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(exit_code(&err));
        }
    }
}

fn exit_code(err: &CoreError) -> i32 {
    match err {
        CoreError::NotFound { .. } => 3,
        CoreError::PathInvalid { .. } | CoreError::InvalidQuery { .. } => 4,
        CoreError::VersionConflict { .. } | CoreError::Conflict { .. } => 5,
        CoreError::QuotaExceeded { .. } | CoreError::TooLarge { .. } => 6,
        _ => 1,
    }
}

fn run(core: &Core, cancel: &CancellationToken, command: Command) -> Result<(), CoreError> {
    match command {
        Command::List { user, folder } => {
            let notes = core.list_notes(&user, folder.as_deref(), cancel)?;
            let json: Vec<_> = notes
                .iter()
                .map(|n| {
                    serde_json::json!({
                        "note_path": n.note_path,
                        "title": n.title,
                        "updated": n.updated.to_rfc3339(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
        }
        Command::Read { user, path } => {
            let note = core.read_note(&user, &path, cancel)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "title": note.title,
                    "body": note.body,
                    "version": note.version,
                    "created": note.created.to_rfc3339(),
                    "updated": note.updated.to_rfc3339(),
                    "size_bytes": note.size_bytes,
                    "tags": note.frontmatter.tags(),
                }))
                .unwrap_or_default()
            );
        }
        Command::Write { user, path, title, tags, body_file, if_version } => {
            let body = match body_file {
                Some(p) => std::fs::read_to_string(p).map_err(CoreError::from)?,
                None => {
                    let mut s = String::new();
                    std::io::stdin().read_to_string(&mut s).map_err(CoreError::from)?;
                    s
                }
            };
            let mut frontmatter = Frontmatter::default();
            if let Some(title) = title {
                frontmatter.set_title(title);
            }
            if !tags.is_empty() {
                frontmatter
                    .fields
                    .insert("tags".to_string(), serde_yaml::Value::Sequence(
                        tags.into_iter().map(serde_yaml::Value::String).collect(),
                    ));
            }
            let outcome = core.write_note(&user, &path, &frontmatter, &body, if_version, cancel)?;
            println!(
                "{}",
                serde_json::json!({
                    "version": outcome.version,
                    "created": outcome.created.to_rfc3339(),
                    "updated": outcome.updated.to_rfc3339(),
                })
            );
        }
        Command::Delete { user, path } => {
            core.delete_note(&user, &path, cancel)?;
        }
        Command::Move { user, old, new } => {
            let outcome = core.move_note(&user, &old, &new, cancel)?;
            println!("{}", serde_json::json!({ "version": outcome.version }));
        }
        Command::Search { user, query, limit } => {
            let hits = core.search(&user, &query, limit, cancel)?;
            let json: Vec<_> = hits
                .iter()
                .map(|h| {
                    serde_json::json!({
                        "note_path": h.note_path,
                        "title": h.title,
                        "snippet": h.snippet,
                        "score": h.score,
                        "updated": h.updated.to_rfc3339(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
        }
        Command::Backlinks { user, path } => {
            let links = core.backlinks(&user, &path, cancel)?;
            let json: Vec<_> = links
                .iter()
                .map(|b| serde_json::json!({ "source_path": b.source_path, "title": b.title }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
        }
        Command::Tags { user } => {
            let tags = core.tags(&user, cancel)?;
            let json: Vec<_> =
                tags.iter().map(|t| serde_json::json!({ "tag": t.tag, "count": t.count })).collect();
            println!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
        }
        Command::Rebuild { user } => {
            let outcome = core.rebuild_index(&user, cancel)?;
            println!(
                "{}",
                serde_json::json!({ "note_count": outcome.note_count, "duration_ms": outcome.duration_ms })
            );
        }
        Command::Health { user } => {
            let health = core.index_health(&user, cancel)?;
            println!(
                "{}",
                serde_json::json!({
                    "note_count": health.note_count,
                    "last_full_rebuild": health.last_full_rebuild.map(|d| d.to_rfc3339()),
                    "last_incremental_update": health.last_incremental_update.map(|d| d.to_rfc3339()),
                })
            );
        }
    }
    Ok(())
}
