//! Record store trait and relation types
//!
//! Defines the read-only query surface the engine needs from a backing store.
//! Filters follow one rule: `Some(vec![])` for an `*_in` filter matches nothing,
//! `None` leaves that column unconstrained.

use async_trait::async_trait;

use super::names::DisplayName;
use super::normalizer::RawResultRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Driver,
    Constructor,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Driver => "driver",
            EntityKind::Constructor => "constructor",
        }
    }

    /// Relation the entity rows live in
    pub fn relation(&self) -> &'static str {
        match self {
            EntityKind::Driver => "drivers",
            EntityKind::Constructor => "constructors",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub id: i64,
    pub race_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Race {
    pub id: i64,
    pub season_id: i64,
    pub round: i32,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Season {
    pub id: i64,
    pub year: i32,
}

/// Entity row as stored; name composition differs per kind
#[derive(Debug, Clone, PartialEq)]
pub enum EntityRecord {
    Driver {
        id: i64,
        forename: Option<String>,
        surname: Option<String>,
    },
    Constructor {
        id: i64,
        name: Option<String>,
        is_active: bool,
    },
}

impl EntityRecord {
    pub fn id(&self) -> i64 {
        match self {
            EntityRecord::Driver { id, .. } | EntityRecord::Constructor { id, .. } => *id,
        }
    }

    pub fn display_name(&self) -> DisplayName {
        match self {
            EntityRecord::Driver { forename, surname, .. } => {
                DisplayName::from_parts(forename.as_deref(), surname.as_deref())
            }
            EntityRecord::Constructor { name, .. } => DisplayName::from_full_name(name.as_deref()),
        }
    }
}

/// One row of the driver standings materialized view
#[derive(Debug, Clone, PartialEq)]
pub struct StandingsEntry {
    pub driver_id: i64,
    pub season_year: i32,
    pub driver_full_name: Option<String>,
    pub position: Option<i64>,
}

/// Pre-joined row produced by the windowed running-sum query
#[derive(Debug, Clone, PartialEq)]
pub struct WindowedProgressionRow {
    pub entity_id: i64,
    pub entity_name: Option<String>,
    pub round: i32,
    pub race_name: String,
    pub race_points: f64,
    pub cumulative_points: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultFilter {
    pub session_id_in: Option<Vec<i64>>,
    pub driver_id_in: Option<Vec<i64>>,
    pub constructor_id: Option<i64>,
}

impl ResultFilter {
    /// All results for a single driver or constructor
    pub fn for_entity(kind: EntityKind, entity_id: i64) -> Self {
        match kind {
            EntityKind::Driver => Self {
                driver_id_in: Some(vec![entity_id]),
                ..Self::default()
            },
            EntityKind::Constructor => Self {
                constructor_id: Some(entity_id),
                ..Self::default()
            },
        }
    }

    pub fn with_sessions(mut self, session_ids: Vec<i64>) -> Self {
        self.session_id_in = Some(session_ids);
        self
    }

    /// Test a row against the filter; used by stores that filter in memory
    pub fn matches(&self, row: &RawResultRow) -> bool {
        self.session_id_in
            .as_ref()
            .map_or(true, |ids| ids.contains(&row.session_id))
            && self
                .driver_id_in
                .as_ref()
                .map_or(true, |ids| ids.contains(&row.driver_id))
            && self
                .constructor_id
                .map_or(true, |id| id == row.constructor_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionFilter {
    pub id_in: Option<Vec<i64>>,
    pub race_id_in: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RaceFilter {
    pub id_in: Option<Vec<i64>>,
    pub season_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeasonFilter {
    pub id_in: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityFilter {
    pub id_in: Option<Vec<i64>>,
    /// Constructors only; drivers carry no activity flag
    pub active_only: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreError {
    pub relation: &'static str,
    pub message: String,
}

impl StoreError {
    pub fn new(relation: &'static str, err: impl std::fmt::Display) -> Self {
        Self {
            relation,
            message: err.to_string(),
        }
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Store error on {}: {}", self.relation, self.message)
    }
}

impl std::error::Error for StoreError {}

/// Read-only query surface over results, sessions, races, seasons and entities
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn find_results(&self, filter: &ResultFilter) -> Result<Vec<RawResultRow>, StoreError>;

    async fn find_sessions(&self, filter: &SessionFilter) -> Result<Vec<Session>, StoreError>;

    async fn find_races(&self, filter: &RaceFilter) -> Result<Vec<Race>, StoreError>;

    async fn find_seasons(&self, filter: &SeasonFilter) -> Result<Vec<Season>, StoreError>;

    async fn find_entities(
        &self,
        kind: EntityKind,
        filter: &EntityFilter,
    ) -> Result<Vec<EntityRecord>, StoreError>;

    /// Driver standings view rows for one season year, ordered by position
    async fn find_standings_roster(&self, season_year: i32) -> Result<Vec<StandingsEntry>, StoreError>;

    /// Raw windowed query: per-round points and running totals for each entity
    /// in `entity_ids`, restricted to races of the season with `season_year`
    async fn windowed_progression_rows(
        &self,
        kind: EntityKind,
        entity_ids: &[i64],
        season_year: i32,
    ) -> Result<Vec<WindowedProgressionRow>, StoreError>;

    /// Get backend type for logging
    fn backend_type(&self) -> &'static str;
}
