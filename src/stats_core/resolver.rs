//! Join resolution: results → sessions → races → seasons
//!
//! Joins happen in application memory with batched IN lookups. Links that do
//! not resolve (a session with no race, a race outside the season filter) are
//! simply absent from the returned maps; callers exclude those results.

use std::collections::{BTreeSet, HashMap};

use super::error::StatsError;
use super::normalizer::{normalize_results, RaceResult};
use super::store::{RaceFilter, RecordStore, ResultFilter, SeasonFilter, SessionFilter};

/// Race attributes a session resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaceInfo {
    pub round: i32,
    pub name: String,
    pub season_id: i64,
}

/// Fetch result rows and normalize them before any aggregation runs
pub async fn fetch_results<S: RecordStore + ?Sized>(
    store: &S,
    filter: &ResultFilter,
) -> Result<Vec<RaceResult>, StatsError> {
    let rows = store.find_results(filter).await.map_err(|e| {
        log::error!("❌ Failed to fetch race_results: {}", e);
        StatsError::from(e)
    })?;
    Ok(normalize_results(rows))
}

/// Map every resolvable session of `results` to its race
///
/// When `season_filter` is set, races of other seasons are dropped and their
/// sessions stay unmapped.
pub async fn resolve_race_info<S: RecordStore + ?Sized>(
    store: &S,
    results: &[RaceResult],
    season_filter: Option<i64>,
) -> Result<HashMap<i64, RaceInfo>, StatsError> {
    if results.is_empty() {
        return Ok(HashMap::new());
    }

    let session_ids: BTreeSet<i64> = results.iter().map(|r| r.session_id).collect();
    let sessions = store
        .find_sessions(&SessionFilter {
            id_in: Some(session_ids.iter().copied().collect()),
            ..SessionFilter::default()
        })
        .await?;

    let race_ids: BTreeSet<i64> = sessions.iter().map(|s| s.race_id).collect();
    let races = store
        .find_races(&RaceFilter {
            id_in: Some(race_ids.into_iter().collect()),
            season_id: season_filter,
        })
        .await?;

    let races_by_id: HashMap<i64, RaceInfo> = races
        .into_iter()
        .map(|race| {
            (
                race.id,
                RaceInfo {
                    round: race.round,
                    name: race.name,
                    season_id: race.season_id,
                },
            )
        })
        .collect();

    let session_to_race: HashMap<i64, RaceInfo> = sessions
        .iter()
        .filter_map(|s| races_by_id.get(&s.race_id).map(|info| (s.id, info.clone())))
        .collect();

    let unresolved = session_ids.len().saturating_sub(session_to_race.len());
    if unresolved > 0 {
        log::debug!(
            "🔗 {} of {} sessions did not resolve to a race (season filter: {:?})",
            unresolved,
            session_ids.len(),
            season_filter
        );
    }

    Ok(session_to_race)
}

/// Translate season ids to years; unknown ids are left out
pub async fn resolve_season_years<S: RecordStore + ?Sized>(
    store: &S,
    season_ids: impl IntoIterator<Item = i64>,
) -> Result<HashMap<i64, i32>, StatsError> {
    let ids: BTreeSet<i64> = season_ids.into_iter().collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let seasons = store
        .find_seasons(&SeasonFilter {
            id_in: Some(ids.into_iter().collect()),
        })
        .await?;

    Ok(seasons.into_iter().map(|s| (s.id, s.year)).collect())
}
