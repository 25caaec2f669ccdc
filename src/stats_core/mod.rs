//! Stats Core - Season Analytics Engine
//!
//! Turns flat result rows (one row per driver per session) into season-shaped
//! analytics: per-season totals, career totals, round-by-round cumulative
//! points progressions, and a denormalized trace view for inspection.
//!
//! # Architecture
//!
//! ```text
//! RecordStore (SQLite or any other backend)
//!     ↓
//! Normalizer (untyped cells → RaceResult)
//!     ↓
//! JoinResolver (results → sessions → races → seasons, batched IN lookups)
//!     ↓
//! Aggregator / ProgressionBuilder (per-season buckets, cumulative rounds)
//!     ↓
//! SeasonGapFiller (continuous season axis)
//!     ↓
//! StatsEngine → ordered records (serde, camelCase)
//! ```
//!
//! Every request is stateless: nothing is cached between calls and nothing is
//! written back to the store.

pub mod aggregator;
pub mod engine;
pub mod error;
pub mod gap_filler;
pub mod names;
pub mod normalizer;
pub mod progression;
pub mod resolver;
pub mod sqlite_store;
pub mod store;
pub mod trace;

#[cfg(test)]
pub(crate) mod test_support;

pub use aggregator::{aggregate_by, career_totals, CareerTotals, SeasonPoints, SeasonSummary, SeasonTotals};
pub use engine::StatsEngine;
pub use error::StatsError;
pub use gap_filler::fill_season_gaps;
pub use names::DisplayName;
pub use normalizer::{normalize_results, RaceResult, RawCell, RawResultRow};
pub use progression::{
    build_progression, BackendKind, EntityProgression, InMemoryProgression, ProgressionPoint,
    ProgressionSource, RosterEntry, WindowedSqlProgression,
};
pub use resolver::{resolve_race_info, RaceInfo};
pub use sqlite_store::SqliteRecordStore;
pub use store::{
    EntityFilter, EntityKind, EntityRecord, Race, RaceFilter, RecordStore, ResultFilter, Season,
    SeasonFilter, Session, SessionFilter, StandingsEntry, StoreError, WindowedProgressionRow,
};
pub use trace::{trace_entity_in_season, TraceRow};
