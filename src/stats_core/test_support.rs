//! In-memory record store for unit tests

use async_trait::async_trait;

use super::normalizer::{RaceResult, RawCell, RawResultRow};
use super::store::{
    EntityFilter, EntityKind, EntityRecord, Race, RaceFilter, RecordStore, ResultFilter, Season,
    SeasonFilter, Session, SessionFilter, StandingsEntry, StoreError, WindowedProgressionRow,
};

pub(crate) fn result(
    driver_id: i64,
    constructor_id: i64,
    session_id: i64,
    position: Option<i64>,
    points: f64,
) -> RaceResult {
    RaceResult {
        driver_id,
        constructor_id,
        session_id,
        position,
        points,
    }
}

#[derive(Debug, Default)]
pub(crate) struct MemoryStore {
    results: Vec<RawResultRow>,
    sessions: Vec<Session>,
    races: Vec<Race>,
    seasons: Vec<Season>,
    entities: Vec<EntityRecord>,
    standings: Vec<StandingsEntry>,
    windowed: Vec<WindowedProgressionRow>,
    failing_relation: Option<&'static str>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_season(mut self, id: i64, year: i32) -> Self {
        self.seasons.push(Season { id, year });
        self
    }

    pub fn with_race(mut self, id: i64, season_id: i64, round: i32, name: &str) -> Self {
        self.races.push(Race {
            id,
            season_id,
            round,
            name: name.to_string(),
        });
        self
    }

    pub fn with_session(mut self, id: i64, race_id: i64) -> Self {
        self.sessions.push(Session { id, race_id });
        self
    }

    pub fn with_result(
        mut self,
        driver_id: i64,
        constructor_id: i64,
        session_id: i64,
        position: impl Into<RawCell>,
        points: impl Into<RawCell>,
    ) -> Self {
        self.results.push(RawResultRow {
            driver_id,
            constructor_id,
            session_id,
            position: position.into(),
            points: points.into(),
        });
        self
    }

    pub fn with_driver(mut self, id: i64, forename: Option<&str>, surname: Option<&str>) -> Self {
        self.entities.push(EntityRecord::Driver {
            id,
            forename: forename.map(str::to_string),
            surname: surname.map(str::to_string),
        });
        self
    }

    pub fn with_constructor(mut self, id: i64, name: &str, is_active: bool) -> Self {
        self.entities.push(EntityRecord::Constructor {
            id,
            name: Some(name.to_string()),
            is_active,
        });
        self
    }

    pub fn with_standing(
        mut self,
        driver_id: i64,
        season_year: i32,
        driver_full_name: Option<&str>,
        position: i64,
    ) -> Self {
        self.standings.push(StandingsEntry {
            driver_id,
            season_year,
            driver_full_name: driver_full_name.map(str::to_string),
            position: Some(position),
        });
        self
    }

    pub fn with_windowed_row(mut self, row: WindowedProgressionRow) -> Self {
        self.windowed.push(row);
        self
    }

    /// Every query against `relation` fails
    pub fn failing_on(mut self, relation: &'static str) -> Self {
        self.failing_relation = Some(relation);
        self
    }

    fn check(&self, relation: &'static str) -> Result<(), StoreError> {
        if self.failing_relation == Some(relation) {
            return Err(StoreError::new(relation, "connection reset"));
        }
        Ok(())
    }
}

fn in_set(set: &Option<Vec<i64>>, value: i64) -> bool {
    set.as_ref().map_or(true, |ids| ids.contains(&value))
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn find_results(&self, filter: &ResultFilter) -> Result<Vec<RawResultRow>, StoreError> {
        self.check("race_results")?;
        Ok(self.results.iter().filter(|r| filter.matches(r)).cloned().collect())
    }

    async fn find_sessions(&self, filter: &SessionFilter) -> Result<Vec<Session>, StoreError> {
        self.check("sessions")?;
        Ok(self
            .sessions
            .iter()
            .filter(|s| in_set(&filter.id_in, s.id) && in_set(&filter.race_id_in, s.race_id))
            .copied()
            .collect())
    }

    async fn find_races(&self, filter: &RaceFilter) -> Result<Vec<Race>, StoreError> {
        self.check("races")?;
        Ok(self
            .races
            .iter()
            .filter(|r| in_set(&filter.id_in, r.id))
            .filter(|r| filter.season_id.map_or(true, |id| id == r.season_id))
            .cloned()
            .collect())
    }

    async fn find_seasons(&self, filter: &SeasonFilter) -> Result<Vec<Season>, StoreError> {
        self.check("seasons")?;
        Ok(self
            .seasons
            .iter()
            .filter(|s| in_set(&filter.id_in, s.id))
            .copied()
            .collect())
    }

    async fn find_entities(
        &self,
        kind: EntityKind,
        filter: &EntityFilter,
    ) -> Result<Vec<EntityRecord>, StoreError> {
        self.check(kind.relation())?;
        Ok(self
            .entities
            .iter()
            .filter(|e| match (kind, e) {
                (EntityKind::Driver, EntityRecord::Driver { .. }) => true,
                (EntityKind::Constructor, EntityRecord::Constructor { is_active, .. }) => {
                    *is_active || !filter.active_only
                }
                _ => false,
            })
            .filter(|e| in_set(&filter.id_in, e.id()))
            .cloned()
            .collect())
    }

    async fn find_standings_roster(&self, season_year: i32) -> Result<Vec<StandingsEntry>, StoreError> {
        self.check("driver_standings_materialized")?;
        let mut rows: Vec<StandingsEntry> = self
            .standings
            .iter()
            .filter(|s| s.season_year == season_year)
            .cloned()
            .collect();
        rows.sort_by_key(|s| (s.position.unwrap_or(i64::MAX), s.driver_id));
        Ok(rows)
    }

    async fn windowed_progression_rows(
        &self,
        _kind: EntityKind,
        entity_ids: &[i64],
        _season_year: i32,
    ) -> Result<Vec<WindowedProgressionRow>, StoreError> {
        self.check("race_results")?;
        Ok(self
            .windowed
            .iter()
            .filter(|r| entity_ids.contains(&r.entity_id))
            .cloned()
            .collect())
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}
