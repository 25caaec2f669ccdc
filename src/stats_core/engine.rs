//! Request-scoped stats operations over a record store

use std::collections::{BTreeMap, BTreeSet};

use super::aggregator::{aggregate_by, career_totals, CareerTotals, SeasonPoints, SeasonSummary};
use super::error::StatsError;
use super::gap_filler::fill_season_gaps;
use super::progression::{
    load_roster, BackendKind, EntityProgression, InMemoryProgression, ProgressionPoint,
    ProgressionSource, WindowedSqlProgression,
};
use super::resolver::{fetch_results, resolve_race_info, resolve_season_years};
use super::store::{EntityKind, RecordStore, ResultFilter, Season, SeasonFilter};
use super::trace::{trace_entity_in_season, TraceRow};

pub struct StatsEngine<S> {
    store: S,
    backend: BackendKind,
    fan_out: usize,
}

impl<S: RecordStore> StatsEngine<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            backend: BackendKind::InMemory,
            fan_out: 1,
        }
    }

    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    /// Per-entity progressions in flight for the in-memory backend
    pub fn with_fan_out(mut self, fan_out: usize) -> Self {
        self.fan_out = fan_out.max(1);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn progression_source(&self) -> Box<dyn ProgressionSource + '_> {
        match self.backend {
            BackendKind::InMemory => {
                Box::new(InMemoryProgression::new(&self.store).with_fan_out(self.fan_out))
            }
            BackendKind::WindowedSql => Box::new(WindowedSqlProgression::new(&self.store)),
        }
    }

    async fn season(&self, season_id: i64) -> Result<Season, StatsError> {
        self.store
            .find_seasons(&SeasonFilter {
                id_in: Some(vec![season_id]),
            })
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StatsError::not_found("season", season_id))
    }

    /// Results bucketed by season year, plus every year reachable from them
    async fn season_totals(
        &self,
        kind: EntityKind,
        entity_id: i64,
    ) -> Result<(BTreeMap<i32, SeasonSummary>, Vec<i32>), StatsError> {
        let results = fetch_results(&self.store, &ResultFilter::for_entity(kind, entity_id)).await?;
        if results.is_empty() {
            return Ok((BTreeMap::new(), Vec::new()));
        }

        let session_to_race = resolve_race_info(&self.store, &results, None).await?;
        let season_ids: BTreeSet<i64> = session_to_race.values().map(|r| r.season_id).collect();
        let years = resolve_season_years(&self.store, season_ids).await?;

        let buckets = aggregate_by(&results, |r| {
            session_to_race
                .get(&r.session_id)
                .and_then(|race| years.get(&race.season_id))
                .copied()
        });

        let summaries = buckets
            .into_iter()
            .map(|(year, totals)| (year, SeasonSummary::from_totals(year, totals)))
            .collect();
        let known_years: Vec<i32> = years.values().copied().collect();

        Ok((summaries, known_years))
    }

    /// `{season, points, wins, podiums, totalRaces}` for every season in range
    pub async fn season_summaries(
        &self,
        kind: EntityKind,
        entity_id: i64,
    ) -> Result<Vec<SeasonSummary>, StatsError> {
        let (summaries, known_years) = self.season_totals(kind, entity_id).await?;
        let filled = fill_season_gaps(summaries, &known_years);

        log::info!(
            "📊 {} {}: {} season summaries",
            kind.as_str(),
            entity_id,
            filled.len()
        );
        Ok(filled)
    }

    /// `{season, points}` for seasons with resolved results only
    pub async fn points_per_season(
        &self,
        kind: EntityKind,
        entity_id: i64,
    ) -> Result<Vec<SeasonPoints>, StatsError> {
        let (summaries, _) = self.season_totals(kind, entity_id).await?;
        Ok(summaries
            .into_values()
            .map(|s| SeasonPoints {
                season: s.season,
                points: s.points,
            })
            .collect())
    }

    pub async fn career_totals(
        &self,
        kind: EntityKind,
        entity_id: i64,
    ) -> Result<CareerTotals, StatsError> {
        let results = fetch_results(&self.store, &ResultFilter::for_entity(kind, entity_id)).await?;
        Ok(career_totals(&results))
    }

    pub async fn progression(
        &self,
        kind: EntityKind,
        entity_id: i64,
        season_id: i64,
    ) -> Result<Vec<ProgressionPoint>, StatsError> {
        let season = self.season(season_id).await?;
        self.progression_source()
            .progression(kind, entity_id, &season)
            .await
    }

    /// One progression per roster member of the season, in roster order
    pub async fn all_progressions(
        &self,
        kind: EntityKind,
        season_id: i64,
    ) -> Result<Vec<EntityProgression>, StatsError> {
        let season = self.season(season_id).await?;
        let roster = load_roster(&self.store, kind, &season).await?;

        let source = self.progression_source();
        log::info!(
            "📈 Building {} {} progressions for {} via {} ({} store)",
            roster.len(),
            kind.as_str(),
            season.year,
            source.source_name(),
            self.store.backend_type()
        );

        source.progressions(kind, &roster, &season).await
    }

    pub async fn trace(
        &self,
        kind: EntityKind,
        entity_id: i64,
        season_id: i64,
    ) -> Result<Vec<TraceRow>, StatsError> {
        trace_entity_in_season(&self.store, kind, entity_id, season_id)
            .await
            .map_err(|e| {
                log::warn!("⚠️  Trace for {} {} failed: {}", kind.as_str(), entity_id, e);
                e
            })
    }
}
