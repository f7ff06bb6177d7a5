//! `pairrank` command-line front end.
//!
//! # Responsibility
//! - Map subcommands onto `RankingService` operations.
//! - Print results as JSON on stdout; errors go to stderr with exit code 1.

use clap::{Parser, Subcommand};
use log::info;
use pairrank_core::db::open_db;
use pairrank_core::{
    default_log_level, init_logging, IssuedPair, ItemPatch, ListStatus, RankList, RankingConfig,
    RankingError, RankingResult, RankingService, RatedItem, SqliteRankingRepository, VoteOutcome,
};
use serde_json::{json, Value};
use std::path::PathBuf;
use uuid::Uuid;

fn bail(msg: impl std::fmt::Display) -> ! {
    eprintln!("Error: {msg}");
    std::process::exit(1);
}

fn fail(err: RankingError) -> ! {
    bail(format!("[{}] {err}", err.code()))
}

#[derive(Parser)]
#[command(name = "pairrank", version, about = "Rank items through pairwise votes")]
struct Cli {
    /// SQLite database file
    #[arg(long, env = "PAIRRANK_DB", default_value = "pairrank.sqlite3", global = true)]
    db: PathBuf,

    /// TOML file overriding ranking parameters
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Absolute directory for rolling log files. Logging is off when unset.
    #[arg(long, global = true)]
    log_dir: Option<String>,

    /// trace|debug|info|warn|error (default: debug in debug builds, info otherwise)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new list
    ListCreate { name: String },
    /// Show all lists, newest first
    Lists,
    /// Show one list
    ListShow { list: Uuid },
    /// Add an item to a list
    ItemAdd {
        list: Uuid,
        /// Free-form payload type tag
        #[arg(long, default_value = "text")]
        kind: String,
        /// Item content. Parsed as JSON; anything else is stored as a string.
        #[arg(long)]
        payload: String,
    },
    /// Show the items of a list
    Items {
        list: Uuid,
        /// Include soft-deleted items
        #[arg(long)]
        all: bool,
    },
    /// Edit an item; `--active true` restores a removed item with its old rating
    ItemUpdate {
        list: Uuid,
        item: Uuid,
        #[arg(long)]
        kind: Option<String>,
        /// Parsed as JSON; anything else is stored as a string.
        #[arg(long)]
        payload: Option<String>,
        #[arg(long)]
        active: Option<bool>,
    },
    /// Soft-delete an item
    ItemRemove { list: Uuid, item: Uuid },
    /// Issue the next comparison for a list
    Pair { list: Uuid },
    /// Answer a comparison with `left` or `right`
    Vote {
        list: Uuid,
        pair: Uuid,
        winner: String,
    },
    /// Show the current ranking and its stability
    Status { list: Uuid },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Self::ListCreate { .. } => "list-create",
            Self::Lists => "lists",
            Self::ListShow { .. } => "list-show",
            Self::ItemAdd { .. } => "item-add",
            Self::Items { .. } => "items",
            Self::ItemUpdate { .. } => "item-update",
            Self::ItemRemove { .. } => "item-remove",
            Self::Pair { .. } => "pair",
            Self::Vote { .. } => "vote",
            Self::Status { .. } => "status",
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Some(log_dir) = &cli.log_dir {
        let level = cli.log_level.as_deref().unwrap_or_else(|| default_log_level());
        init_logging(level, log_dir).unwrap_or_else(|err| bail(err));
    }

    let config = match &cli.config {
        Some(path) => RankingConfig::load(path).unwrap_or_else(|err| bail(err)),
        None => RankingConfig::default(),
    };

    let conn = open_db(&cli.db)
        .unwrap_or_else(|err| bail(format!("failed to open {}: {err}", cli.db.display())));
    let repo = SqliteRankingRepository::try_new(&conn).unwrap_or_else(|err| bail(err));
    let service = RankingService::with_config(repo, config).unwrap_or_else(|err| fail(err));

    let command_name = cli.command.name();
    match run(&service, cli.command) {
        Ok(output) => {
            info!("event=cli_command module=cli status=ok command={command_name}");
            match serde_json::to_string_pretty(&output) {
                Ok(text) => println!("{text}"),
                Err(err) => bail(err),
            }
        }
        Err(err) => {
            info!(
                "event=cli_command module=cli status=error command={command_name} error_code={}",
                err.code()
            );
            fail(err)
        }
    }
}

fn run(
    service: &RankingService<SqliteRankingRepository<'_>>,
    command: Commands,
) -> RankingResult<Value> {
    match command {
        Commands::ListCreate { name } => Ok(list_json(&service.create_list(&name)?)),
        Commands::Lists => {
            let lists = service.list_lists()?;
            Ok(Value::Array(lists.iter().map(list_json).collect()))
        }
        Commands::ListShow { list } => Ok(list_json(&service.get_list(list)?)),
        Commands::ItemAdd {
            list,
            kind,
            payload,
        } => {
            let payload = parse_payload(payload);
            Ok(item_json(&service.add_item(list, &kind, payload)?))
        }
        Commands::Items { list, all } => {
            let items = service.list_items(list, all)?;
            Ok(Value::Array(items.iter().map(item_json).collect()))
        }
        Commands::ItemUpdate {
            list,
            item,
            kind,
            payload,
            active,
        } => {
            let patch = ItemPatch {
                kind,
                payload: payload.map(parse_payload),
                active,
            };
            Ok(item_json(&service.update_item(list, item, &patch)?))
        }
        Commands::ItemRemove { list, item } => {
            service.remove_item(list, item)?;
            Ok(json!({ "removed": item.to_string() }))
        }
        Commands::Pair { list } => Ok(pair_json(&service.request_pair(list)?)),
        Commands::Vote { list, pair, winner } => {
            Ok(vote_json(&service.submit_vote(list, pair, &winner)?))
        }
        Commands::Status { list } => Ok(status_json(&service.get_status(list)?)),
    }
}

/// Raw text that is not valid JSON becomes a JSON string.
fn parse_payload(raw: String) -> Value {
    serde_json::from_str(&raw).unwrap_or(Value::String(raw))
}

fn list_json(list: &RankList) -> Value {
    json!({
        "id": list.id.to_string(),
        "name": list.name,
        "created_at": list.created_at,
    })
}

fn item_json(rated: &RatedItem) -> Value {
    json!({
        "id": rated.item.id.to_string(),
        "kind": rated.item.kind,
        "payload": rated.item.payload,
        "active": rated.item.active,
        "strength": rated.rating.strength,
        "comparisons": rated.rating.comparisons,
    })
}

fn pair_json(issued: &IssuedPair) -> Value {
    json!({
        "pair_id": issued.pair.id.to_string(),
        "list_id": issued.pair.list_id.to_string(),
        "left": item_json(&issued.left),
        "right": item_json(&issued.right),
    })
}

fn vote_json(outcome: &VoteOutcome) -> Value {
    match outcome {
        VoteOutcome::Applied {
            winner,
            left,
            right,
        } => json!({
            "status": "applied",
            "winner": winner.to_string(),
            "left": { "strength": left.strength, "comparisons": left.comparisons },
            "right": { "strength": right.strength, "comparisons": right.comparisons },
        }),
        VoteOutcome::Ignored(reason) => json!({
            "status": "ignored",
            "reason": reason.as_str(),
        }),
    }
}

fn status_json(status: &ListStatus) -> Value {
    let ranking: Vec<Value> = status
        .ranked_items
        .iter()
        .enumerate()
        .map(|(index, rated)| {
            let mut entry = item_json(rated);
            entry["rank"] = json!(index + 1);
            entry
        })
        .collect();

    json!({
        "list_id": status.list_id.to_string(),
        "stability": status.stability,
        "total_comparisons": status.total_comparisons,
        "ranking": ranking,
    })
}
