//! Denormalized per-result rows for operational inspection

use std::collections::HashMap;

use serde::Serialize;

use super::error::StatsError;
use super::resolver::fetch_results;
use super::store::{EntityKind, RaceFilter, RecordStore, ResultFilter, SeasonFilter, SessionFilter};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceRow {
    pub season: i32,
    pub race_name: String,
    pub position: Option<i64>,
    pub points: f64,
}

/// races in season → sessions of those races → the entity's results in those sessions
///
/// One row per matching result, in fetch order.
pub async fn trace_entity_in_season<S: RecordStore + ?Sized>(
    store: &S,
    kind: EntityKind,
    entity_id: i64,
    season_id: i64,
) -> Result<Vec<TraceRow>, StatsError> {
    let season = store
        .find_seasons(&SeasonFilter {
            id_in: Some(vec![season_id]),
        })
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| StatsError::not_found("season", season_id))?;

    let races = store
        .find_races(&RaceFilter {
            id_in: None,
            season_id: Some(season_id),
        })
        .await?;
    log::debug!("🔍 trace: season {} has {} races", season.year, races.len());
    if races.is_empty() {
        return Ok(Vec::new());
    }

    let race_names: HashMap<i64, &str> = races.iter().map(|r| (r.id, r.name.as_str())).collect();

    let sessions = store
        .find_sessions(&SessionFilter {
            id_in: None,
            race_id_in: Some(races.iter().map(|r| r.id).collect()),
        })
        .await?;
    log::debug!("🔍 trace: {} sessions", sessions.len());

    let session_race: HashMap<i64, i64> = sessions.iter().map(|s| (s.id, s.race_id)).collect();

    let filter = ResultFilter::for_entity(kind, entity_id)
        .with_sessions(sessions.iter().map(|s| s.id).collect());
    let results = fetch_results(store, &filter).await?;
    log::debug!(
        "🔍 trace: {} {} has {} results in {}",
        kind.as_str(),
        entity_id,
        results.len(),
        season.year
    );

    Ok(results
        .into_iter()
        .filter_map(|r| {
            let race_id = session_race.get(&r.session_id)?;
            let race_name = race_names.get(race_id)?;
            Some(TraceRow {
                season: season.year,
                race_name: race_name.to_string(),
                position: r.position,
                points: r.points,
            })
        })
        .collect())
}
