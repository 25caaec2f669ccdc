//! race_stats - Season Analytics CLI
//!
//! Runs one stats-engine operation against a SQLite results database and
//! prints the records as pretty JSON on stdout.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --bin race_stats -- summary --constructor 9
//! cargo run --release --bin race_stats -- progression --driver 1 --season 74
//! cargo run --release --bin race_stats -- all-progressions --driver --season 74 --backend sql
//! ```
//!
//! Commands: `summary`, `points`, `career`, `progression`, `all-progressions`, `trace`
//!
//! ## Environment Variables
//!
//! - RACESTATS_DB_PATH - SQLite database path (default: racestats.db)
//! - RACESTATS_SCHEMA_DIR - Schema migrations directory (default: sql)
//! - PROGRESSION_FAN_OUT - Concurrent per-entity progressions (default: 1)
//! - PROGRESSION_BACKEND - memory | sql (default: memory; --backend overrides)
//! - RUST_LOG - Logging level (optional, default: info)

use racestats::stats_core::{BackendKind, EntityKind, SqliteRecordStore, StatsEngine};
use racestats::StatsConfig;
use serde::Serialize;
use std::env;
use std::path::Path;

const USAGE: &str = "usage: race_stats <summary|points|career|progression|all-progressions|trace> \
                     [--constructor ID | --driver ID] [--season ID] [--backend memory|sql]";

#[derive(Debug)]
struct CliArgs {
    command: String,
    kind: EntityKind,
    entity_id: Option<i64>,
    season_id: Option<i64>,
    backend: Option<BackendKind>,
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|x| x == flag)
        .and_then(|idx| args.get(idx + 1))
        .map(|s| s.as_str())
}

fn parse_id(args: &[String], flag: &str) -> Result<Option<i64>, Box<dyn std::error::Error>> {
    match flag_value(args, flag) {
        Some(value) if !value.starts_with("--") => value
            .parse()
            .map(Some)
            .map_err(|e| format!("invalid {} '{}': {}", flag, value, e).into()),
        _ => Ok(None),
    }
}

fn parse_args() -> Result<CliArgs, Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    let command = args.get(1).cloned().ok_or(USAGE)?;

    let kind = if args.contains(&"--driver".to_string()) {
        EntityKind::Driver
    } else {
        EntityKind::Constructor
    };

    let entity_id = parse_id(&args, &format!("--{}", kind.as_str()))?;
    let season_id = parse_id(&args, "--season")?;

    let backend = match flag_value(&args, "--backend") {
        Some(value) => Some(
            BackendKind::from_str(value)
                .ok_or_else(|| format!("unknown backend '{}' (expected memory or sql)", value))?,
        ),
        None => None,
    };

    Ok(CliArgs {
        command,
        kind,
        entity_id,
        season_id,
        backend,
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn required(value: Option<i64>, what: &str) -> Result<i64, Box<dyn std::error::Error>> {
    value.ok_or_else(|| format!("missing {}\n{}", what, USAGE).into())
}

/// Loads `.env` before the logger reads RUST_LOG
fn init_environment(env_file: Option<&Path>) {
    match env_file {
        Some(path) => {
            dotenv::from_path(path).ok();
        }
        None => {
            dotenv::dotenv().ok();
        }
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .try_init()
        .ok();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_environment(None);

    let config = StatsConfig::from_env();
    let cli = parse_args()?;
    let backend = cli.backend.unwrap_or(config.backend);

    log::info!("🚀 race_stats {}", cli.command);
    log::info!("   Database: {}", config.db_path);
    log::info!("   Progression backend: {}", backend.as_str());
    log::info!("   Fan-out: {}", config.fan_out);

    let store = SqliteRecordStore::open(&config.db_path)?;
    if Path::new(&config.schema_dir).is_dir() {
        store.run_schema_migrations(&config.schema_dir)?;
    } else {
        log::warn!(
            "⚠️  Schema dir {} not found, skipping migrations",
            config.schema_dir
        );
    }

    let engine = StatsEngine::new(store)
        .with_backend(backend)
        .with_fan_out(config.fan_out);

    match cli.command.as_str() {
        "summary" => {
            let id = required(cli.entity_id, "entity id")?;
            print_json(&engine.season_summaries(cli.kind, id).await?)?;
        }
        "points" => {
            let id = required(cli.entity_id, "entity id")?;
            print_json(&engine.points_per_season(cli.kind, id).await?)?;
        }
        "career" => {
            let id = required(cli.entity_id, "entity id")?;
            print_json(&engine.career_totals(cli.kind, id).await?)?;
        }
        "progression" => {
            let id = required(cli.entity_id, "entity id")?;
            let season = required(cli.season_id, "--season")?;
            print_json(&engine.progression(cli.kind, id, season).await?)?;
        }
        "all-progressions" => {
            let season = required(cli.season_id, "--season")?;
            print_json(&engine.all_progressions(cli.kind, season).await?)?;
        }
        "trace" => {
            let id = required(cli.entity_id, "entity id")?;
            let season = required(cli.season_id, "--season")?;
            print_json(&engine.trace(cli.kind, id, season).await?)?;
        }
        other => {
            return Err(format!("unknown command '{}'\n{}", other, USAGE).into());
        }
    }

    log::info!("✅ Done");
    Ok(())
}
