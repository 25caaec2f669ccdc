//! Per-key folding of joined results: points, wins, podiums, race counts

use std::collections::BTreeMap;

use serde::Serialize;

use super::normalizer::RaceResult;

/// Running totals for one bucket (a season, a round, ...)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonTotals {
    pub points: f64,
    pub wins: u32,
    pub podiums: u32,
    pub total_races: u32,
}

impl SeasonTotals {
    pub fn add_result(&mut self, result: &RaceResult) {
        self.points += result.points;
        if result.is_win() {
            self.wins += 1;
        }
        if result.is_podium() {
            self.podiums += 1;
        }
        self.total_races += 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonSummary {
    pub season: i32,
    pub points: f64,
    pub wins: u32,
    pub podiums: u32,
    pub total_races: u32,
}

impl SeasonSummary {
    pub fn empty(season: i32) -> Self {
        Self::from_totals(season, SeasonTotals::default())
    }

    pub fn from_totals(season: i32, totals: SeasonTotals) -> Self {
        Self {
            season,
            points: totals.points,
            wins: totals.wins,
            podiums: totals.podiums,
            total_races: totals.total_races,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeasonPoints {
    pub season: i32,
    pub points: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CareerTotals {
    pub total_races: u32,
    pub wins: u32,
    pub podiums: u32,
    pub total_points: f64,
}

/// Fold results into buckets keyed by `key_fn`; results without a key are skipped
pub fn aggregate_by<K, F>(results: &[RaceResult], key_fn: F) -> BTreeMap<K, SeasonTotals>
where
    K: Ord,
    F: Fn(&RaceResult) -> Option<K>,
{
    let mut buckets: BTreeMap<K, SeasonTotals> = BTreeMap::new();
    for result in results {
        if let Some(key) = key_fn(result) {
            buckets.entry(key).or_default().add_result(result);
        }
    }
    buckets
}

/// Whole-career totals over every result, joined or not
pub fn career_totals(results: &[RaceResult]) -> CareerTotals {
    let totals = results.iter().fold(SeasonTotals::default(), |mut acc, r| {
        acc.add_result(r);
        acc
    });

    CareerTotals {
        total_races: totals.total_races,
        wins: totals.wins,
        podiums: totals.podiums,
        total_points: totals.points,
    }
}
