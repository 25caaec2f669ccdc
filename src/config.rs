//! Stats configuration from environment variables

use std::env;

use crate::stats_core::BackendKind;

/// Configuration for the stats engine and CLI
///
/// Loaded from environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct StatsConfig {
    /// Path to SQLite database file
    pub db_path: String,

    /// Directory holding `*.sql` schema migrations
    pub schema_dir: String,

    /// Per-entity progressions in flight for the all-entities view
    pub fan_out: usize,

    /// Progression backend used unless overridden on the command line
    pub backend: BackendKind,

    pub rust_log: Option<String>,
}

impl StatsConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `RACESTATS_DB_PATH` (default: racestats.db)
    /// - `RACESTATS_SCHEMA_DIR` (default: sql)
    /// - `PROGRESSION_FAN_OUT` (default: 1, i.e. sequential)
    /// - `PROGRESSION_BACKEND` (`memory` or `sql`, default: memory)
    /// - `RUST_LOG` (optional)
    pub fn from_env() -> Self {
        let backend = match env::var("PROGRESSION_BACKEND") {
            Ok(value) => BackendKind::from_str(value.trim()).unwrap_or_else(|| {
                log::warn!(
                    "⚠️  Unknown PROGRESSION_BACKEND '{}', falling back to memory",
                    value
                );
                BackendKind::InMemory
            }),
            Err(_) => BackendKind::InMemory,
        };

        Self {
            db_path: env::var("RACESTATS_DB_PATH").unwrap_or_else(|_| "racestats.db".to_string()),

            schema_dir: env::var("RACESTATS_SCHEMA_DIR").unwrap_or_else(|_| "sql".to_string()),

            fan_out: env::var("PROGRESSION_FAN_OUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(1),

            backend,

            rust_log: env::var("RUST_LOG").ok(),
        }
    }
}
