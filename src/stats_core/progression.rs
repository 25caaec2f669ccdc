//! Cumulative points progressions per round
//!
//! `build_progression` is the pure core. `ProgressionSource` hides where the
//! per-round numbers come from: `InMemoryProgression` joins and folds rows in
//! the process, `WindowedSqlProgression` pushes the running sum down into the
//! store's windowed query. Both return the same shapes for the same data.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use futures_util::{stream, StreamExt, TryStreamExt};
use serde::Serialize;

use super::error::StatsError;
use super::names::DisplayName;
use super::normalizer::RaceResult;
use super::resolver::{fetch_results, resolve_race_info, RaceInfo};
use super::store::{EntityFilter, EntityKind, RecordStore, ResultFilter, Season, WindowedProgressionRow};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressionPoint {
    pub round: i32,
    pub race_name: String,
    pub race_points: f64,
    pub cumulative_points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityProgression {
    pub entity_id: i64,
    pub entity_name: String,
    pub progression: Vec<ProgressionPoint>,
}

/// An entity in scope for a season's all-entities progression
#[derive(Debug, Clone, PartialEq)]
pub struct RosterEntry {
    pub entity_id: i64,
    pub entity_name: DisplayName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    InMemory,
    WindowedSql,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::InMemory => "memory",
            BackendKind::WindowedSql => "sql",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "memory" => Some(BackendKind::InMemory),
            "sql" => Some(BackendKind::WindowedSql),
            _ => None,
        }
    }
}

/// Fold results into one entry per round, ascending, with a running total
///
/// Results sharing a round (sprint + main race) are summed into one entry.
/// If two races share a round, the last processed race name wins. Results
/// whose session is missing from `session_to_race` are excluded.
pub fn build_progression(
    results: &[RaceResult],
    session_to_race: &HashMap<i64, RaceInfo>,
) -> Vec<ProgressionPoint> {
    let mut rounds: BTreeMap<i32, (String, f64)> = BTreeMap::new();

    for result in results {
        let Some(race) = session_to_race.get(&result.session_id) else {
            continue;
        };
        let entry = rounds
            .entry(race.round)
            .or_insert_with(|| (race.name.clone(), 0.0));
        entry.0.clone_from(&race.name);
        entry.1 += result.points;
    }

    let mut cumulative = 0.0;
    rounds
        .into_iter()
        .map(|(round, (race_name, race_points))| {
            cumulative += race_points;
            ProgressionPoint {
                round,
                race_name,
                race_points,
                cumulative_points: cumulative,
            }
        })
        .collect()
}

/// Entities considered in scope for `season`
///
/// - constructors: those flagged active
/// - drivers: those with a standings view row for the season's year; rows
///   without a precomposed name fall back to the driver table's name parts
pub async fn load_roster<S: RecordStore + ?Sized>(
    store: &S,
    kind: EntityKind,
    season: &Season,
) -> Result<Vec<RosterEntry>, StatsError> {
    match kind {
        EntityKind::Constructor => {
            let constructors = store
                .find_entities(
                    kind,
                    &EntityFilter {
                        id_in: None,
                        active_only: true,
                    },
                )
                .await?;

            Ok(constructors
                .iter()
                .map(|c| RosterEntry {
                    entity_id: c.id(),
                    entity_name: c.display_name(),
                })
                .collect())
        }
        EntityKind::Driver => {
            let standings = store.find_standings_roster(season.year).await?;

            let unnamed: Vec<i64> = standings
                .iter()
                .filter(|s| DisplayName::from_full_name(s.driver_full_name.as_deref()).is_empty())
                .map(|s| s.driver_id)
                .collect();

            let fallback: HashMap<i64, DisplayName> = if unnamed.is_empty() {
                HashMap::new()
            } else {
                store
                    .find_entities(
                        kind,
                        &EntityFilter {
                            id_in: Some(unnamed),
                            active_only: false,
                        },
                    )
                    .await?
                    .iter()
                    .map(|d| (d.id(), d.display_name()))
                    .collect()
            };

            Ok(standings
                .into_iter()
                .map(|s| {
                    let name = DisplayName::from_full_name(s.driver_full_name.as_deref());
                    let entity_name = if name.is_empty() {
                        fallback.get(&s.driver_id).cloned().unwrap_or_default()
                    } else {
                        name
                    };
                    RosterEntry {
                        entity_id: s.driver_id,
                        entity_name,
                    }
                })
                .collect())
        }
    }
}

/// One capability ("progression for an entity in a season"), two backends
#[async_trait]
pub trait ProgressionSource: Send + Sync {
    async fn progression(
        &self,
        kind: EntityKind,
        entity_id: i64,
        season: &Season,
    ) -> Result<Vec<ProgressionPoint>, StatsError>;

    /// Progressions for every roster entry, in roster order
    async fn progressions(
        &self,
        kind: EntityKind,
        roster: &[RosterEntry],
        season: &Season,
    ) -> Result<Vec<EntityProgression>, StatsError>;

    fn source_name(&self) -> &'static str;
}

/// Canonical backend: fetch results, resolve races in memory, fold
pub struct InMemoryProgression<'a, S: ?Sized> {
    store: &'a S,
    fan_out: usize,
}

impl<'a, S: RecordStore + ?Sized> InMemoryProgression<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store, fan_out: 1 }
    }

    /// Maximum per-entity progressions in flight; output order is unaffected
    pub fn with_fan_out(mut self, fan_out: usize) -> Self {
        self.fan_out = fan_out.max(1);
        self
    }
}

#[async_trait]
impl<'a, S: RecordStore + ?Sized> ProgressionSource for InMemoryProgression<'a, S> {
    async fn progression(
        &self,
        kind: EntityKind,
        entity_id: i64,
        season: &Season,
    ) -> Result<Vec<ProgressionPoint>, StatsError> {
        let results = fetch_results(self.store, &ResultFilter::for_entity(kind, entity_id)).await?;
        if results.is_empty() {
            return Ok(Vec::new());
        }

        let session_to_race = resolve_race_info(self.store, &results, Some(season.id)).await?;
        let progression = build_progression(&results, &session_to_race);

        log::debug!(
            "📈 {} {} season {}: {} results → {} rounds",
            kind.as_str(),
            entity_id,
            season.year,
            results.len(),
            progression.len()
        );

        Ok(progression)
    }

    async fn progressions(
        &self,
        kind: EntityKind,
        roster: &[RosterEntry],
        season: &Season,
    ) -> Result<Vec<EntityProgression>, StatsError> {
        stream::iter(roster.iter().cloned())
            .map(move |entry: RosterEntry| async move {
                let progression = self.progression(kind, entry.entity_id, season).await?;
                Ok::<_, StatsError>(EntityProgression {
                    entity_id: entry.entity_id,
                    entity_name: entry.entity_name.into_string(),
                    progression,
                })
            })
            .buffered(self.fan_out)
            .try_collect()
            .await
    }

    fn source_name(&self) -> &'static str {
        "in-memory"
    }
}

/// SQL pushdown backend: the store computes per-round sums and running totals
pub struct WindowedSqlProgression<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: RecordStore + ?Sized> WindowedSqlProgression<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }
}

fn point_from_row(row: &WindowedProgressionRow) -> ProgressionPoint {
    ProgressionPoint {
        round: row.round,
        race_name: row.race_name.clone(),
        race_points: row.race_points,
        cumulative_points: row.cumulative_points,
    }
}

#[async_trait]
impl<'a, S: RecordStore + ?Sized> ProgressionSource for WindowedSqlProgression<'a, S> {
    async fn progression(
        &self,
        kind: EntityKind,
        entity_id: i64,
        season: &Season,
    ) -> Result<Vec<ProgressionPoint>, StatsError> {
        let rows = self
            .store
            .windowed_progression_rows(kind, &[entity_id], season.year)
            .await?;

        Ok(rows
            .iter()
            .filter(|r| r.entity_id == entity_id)
            .map(point_from_row)
            .collect())
    }

    async fn progressions(
        &self,
        kind: EntityKind,
        roster: &[RosterEntry],
        season: &Season,
    ) -> Result<Vec<EntityProgression>, StatsError> {
        if roster.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = roster.iter().map(|e| e.entity_id).collect();
        let rows = self
            .store
            .windowed_progression_rows(kind, &ids, season.year)
            .await?;

        log::debug!(
            "📈 windowed query for {} {}s in {}: {} rows",
            ids.len(),
            kind.as_str(),
            season.year,
            rows.len()
        );

        let mut by_entity: HashMap<i64, (Option<String>, Vec<ProgressionPoint>)> = HashMap::new();
        for row in &rows {
            let entry = by_entity
                .entry(row.entity_id)
                .or_insert_with(|| (row.entity_name.clone(), Vec::new()));
            entry.1.push(point_from_row(row));
        }

        Ok(roster
            .iter()
            .map(|entry| {
                let (row_name, progression) = by_entity.remove(&entry.entity_id).unwrap_or_default();
                let entity_name = if entry.entity_name.is_empty() {
                    DisplayName::from_full_name(row_name.as_deref())
                } else {
                    entry.entity_name.clone()
                };
                EntityProgression {
                    entity_id: entry.entity_id,
                    entity_name: entity_name.into_string(),
                    progression,
                }
            })
            .collect())
    }

    fn source_name(&self) -> &'static str {
        "windowed-sql"
    }
}
