//! Nearest-first ranking of the collector roster.

use std::cmp::Ordering;

use serde::Serialize;

use crate::collectors::Collector;
use crate::geo::{distance_km, UserLocation};

/// A roster entry annotated with its distance from the user.
///
/// Serializes as the collector's own fields followed by `distanceKm`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCollector<'a> {
    #[serde(flatten)]
    pub collector: &'a Collector,
    /// Kilometres from the user, rounded to two decimals.
    #[serde(rename = "distanceKm", serialize_with = "crate::geo::serialize_number")]
    pub distance_km: f64,
}

/// Result of [`rank_collectors`]: a fresh sorted view, or the roster as-is.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RankedRoster<'a> {
    Ranked(Vec<RankedCollector<'a>>),
    Unranked(&'a [Collector]),
}

impl RankedRoster<'_> {
    #[must_use]
    pub fn is_ranked(&self) -> bool {
        matches!(self, RankedRoster::Ranked(_))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            RankedRoster::Ranked(ranked) => ranked.len(),
            RankedRoster::Unranked(roster) => roster.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Collectors in output order, without distances.
    pub fn collectors(&self) -> Box<dyn Iterator<Item = &Collector> + '_> {
        match self {
            RankedRoster::Ranked(ranked) => Box::new(ranked.iter().map(|r| r.collector)),
            RankedRoster::Unranked(roster) => Box::new(roster.iter()),
        }
    }
}

/// Rank `roster` by distance from `location`, nearest first.
///
/// With a location, every entry gets a rounded `distanceKm` and the view is
/// stably sorted ascending, so equal distances keep roster order. Without a
/// location the roster is returned untouched. The input is never mutated.
#[must_use]
pub fn rank_collectors(roster: &[Collector], location: Option<UserLocation>) -> RankedRoster<'_> {
    let Some(loc) = location else {
        return RankedRoster::Unranked(roster);
    };

    let mut ranked: Vec<RankedCollector<'_>> = roster
        .iter()
        .map(|collector| RankedCollector {
            collector,
            distance_km: round2(distance_km(
                loc.latitude,
                loc.longitude,
                collector.latitude,
                collector.longitude,
            )),
        })
        .collect();

    // sort_by is stable: equal distances keep roster order
    ranked.sort_by(|a, b| nearest_first(a.distance_km, b.distance_km));
    RankedRoster::Ranked(ranked)
}

/// Ascending order with NaN distances placed after every real distance.
fn nearest_first(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (false, false) => a.total_cmp(&b),
        (a_nan, b_nan) => a_nan.cmp(&b_nan),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
