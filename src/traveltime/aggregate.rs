use crate::records::TravelTimeSample;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Traffic-weighted travel time of one gantry pair at one timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentObservation {
    pub timestamp: NaiveDateTime,
    pub gantry_from: String,
    pub gantry_to: String,
    /// `"<from>-<to>"`.
    pub segment_key: String,
    pub weighted_avg_travel_time: f64,
    pub total_traffic: f64,
}

pub fn segment_key(from: &str, to: &str) -> String {
    format!("{from}-{to}")
}

/// Computes `sum(value * weight) / sum(weight)` over `(value, weight)` pairs.
///
/// Returns exactly 0.0 when the weights sum to zero: no vehicle was observed,
/// which is not the same as a zero travel time.
pub fn weighted_average(samples: &[(f64, f64)]) -> f64 {
    let weight_sum: f64 = samples.iter().map(|(_, w)| w).sum();
    if weight_sum == 0.0 {
        return 0.0;
    }
    samples.iter().map(|(v, w)| v * w).sum::<f64>() / weight_sum
}

/// Collapses vehicle-class samples sharing `(timestamp, from, to)` into one observation.
///
/// Output is ordered by timestamp, then gantry from, then gantry to.
#[tracing::instrument(skip_all, fields(samples = samples.len()))]
pub fn aggregate_travel_time(samples: &[TravelTimeSample]) -> Vec<SegmentObservation> {
    let mut groups: BTreeMap<(NaiveDateTime, &str, &str), Vec<(f64, f64)>> = BTreeMap::new();
    for sample in samples {
        groups
            .entry((sample.timestamp, sample.gantry_from.as_str(), sample.gantry_to.as_str()))
            .or_default()
            .push((sample.travel_time, sample.traffic));
    }

    let observations: Vec<SegmentObservation> = groups
        .into_iter()
        .map(|((timestamp, from, to), group)| SegmentObservation {
            timestamp,
            gantry_from: from.to_string(),
            gantry_to: to.to_string(),
            segment_key: segment_key(from, to),
            weighted_avg_travel_time: weighted_average(&group),
            total_traffic: group.iter().map(|(_, traffic)| traffic).sum(),
        })
        .collect();

    let unobserved = observations.iter().filter(|o| o.total_traffic == 0.0).count();
    if unobserved > 0 {
        debug!(unobserved, "Observations without traffic carry a zero travel time");
    }
    info!(observations = observations.len(), "Aggregated travel-time samples");

    observations
}
