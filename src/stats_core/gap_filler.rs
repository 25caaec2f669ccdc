//! Season gap filling
//!
//! A season the entity simply did not score in still gets a zero entry, so
//! season-over-season charts keep a continuous axis.

use std::collections::BTreeMap;

use super::aggregator::SeasonSummary;

/// One summary per year in `[min(known_years), max(known_years)]`, ascending
///
/// Summaries outside the known range are dropped; an empty `known_years`
/// yields an empty vec.
pub fn fill_season_gaps(
    mut summaries: BTreeMap<i32, SeasonSummary>,
    known_years: &[i32],
) -> Vec<SeasonSummary> {
    let (Some(&min), Some(&max)) = (known_years.iter().min(), known_years.iter().max()) else {
        return Vec::new();
    };

    (min..=max)
        .map(|year| summaries.remove(&year).unwrap_or_else(|| SeasonSummary::empty(year)))
        .collect()
}
