
pub mod config;
pub mod stats_core;

pub use config::StatsConfig;
pub use stats_core::{EntityKind, StatsEngine, StatsError};
