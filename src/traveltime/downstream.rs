use super::aggregate::SegmentObservation;
use chrono::NaiveDateTime;
use std::collections::{BTreeMap, HashMap};
use tracing::{info, warn};

pub const DEFAULT_LAG_COUNT: usize = 5;

/// A segment observation with lagged downstream travel times attached.
///
/// `downstream_lags[i]` holds the downstream weighted-average travel time
/// `i + 1` positions earlier in the downstream series.
#[derive(Debug, Clone, PartialEq)]
pub struct LaggedObservation {
    pub observation: SegmentObservation,
    pub downstream_lags: Vec<f64>,
}

pub fn lag_column_name(lag: usize) -> String {
    format!("ds_prev_{lag}_WATT")
}

/// Shifted copies of one series, keyed by timestamp. `None` where the shift
/// runs past the start of the series.
type LagTable = HashMap<NaiveDateTime, Vec<Option<f64>>>;

fn lag_table(rows: &[&SegmentObservation], lag_count: usize) -> LagTable {
    let mut ordered = rows.to_vec();
    ordered.sort_by_key(|o| o.timestamp);
    ordered
        .iter()
        .enumerate()
        .map(|(pos, obs)| {
            let lags = (1..=lag_count)
                .map(|lag| pos.checked_sub(lag).map(|p| ordered[p].weighted_avg_travel_time))
                .collect();
            (obs.timestamp, lags)
        })
        .collect()
}

/// Equal-weight mean of one lag across every downstream branch.
///
/// A branch without a value at this timestamp/lag makes the whole lag missing,
/// which is then filled with 0.
fn blend(branches: &[&LagTable], timestamp: &NaiveDateTime, lag: usize) -> f64 {
    if branches.is_empty() {
        return 0.0;
    }
    let values: Option<Vec<f64>> = branches
        .iter()
        .map(|table| table.get(timestamp).and_then(|lags| lags[lag]))
        .collect();
    match values {
        Some(values) => values.iter().sum::<f64>() / values.len() as f64,
        None => 0.0,
    }
}

/// Attaches `lag_count` lagged copies of each segment's downstream series.
///
/// A downstream segment is any segment whose `gantry_from` equals this
/// segment's `gantry_to`. Lags count positions in the downstream series, not
/// elapsed time. With several downstream branches the lags are averaged
/// column by column. Every input row appears exactly once in the output,
/// grouped by segment in order of first appearance.
#[tracing::instrument(skip(series), fields(rows = series.len()))]
pub fn attach_downstream_lags(
    series: &[SegmentObservation],
    lag_count: usize,
) -> Vec<LaggedObservation> {
    let mut order: Vec<&str> = Vec::new();
    let mut rows_by_segment: HashMap<&str, Vec<&SegmentObservation>> = HashMap::new();
    let mut successors: HashMap<&str, Vec<&str>> = HashMap::new();
    for obs in series {
        let rows = rows_by_segment.entry(obs.segment_key.as_str()).or_default();
        if rows.is_empty() {
            order.push(&obs.segment_key);
            successors
                .entry(obs.gantry_from.as_str())
                .or_default()
                .push(&obs.segment_key);
        }
        rows.push(obs);
    }

    let lag_tables: HashMap<&str, LagTable> = rows_by_segment
        .iter()
        .map(|(key, rows)| (*key, lag_table(rows, lag_count)))
        .collect();

    let mut branching: BTreeMap<usize, usize> = BTreeMap::new();
    let mut output = Vec::with_capacity(series.len());
    for key in order {
        let rows = &rows_by_segment[key];
        let to = rows[0].gantry_to.as_str();
        let downstream: &[&str] = successors.get(to).map(Vec::as_slice).unwrap_or(&[]);
        *branching.entry(downstream.len()).or_default() += 1;
        if downstream.len() > 2 {
            warn!(
                segment = key,
                branches = downstream.len(),
                "Averaging more than two downstream branches"
            );
        }

        let branches: Vec<&LagTable> = downstream.iter().map(|d| &lag_tables[d]).collect();
        for obs in rows {
            let downstream_lags = (0..lag_count)
                .map(|lag| blend(&branches, &obs.timestamp, lag))
                .collect();
            output.push(LaggedObservation {
                observation: (*obs).clone(),
                downstream_lags,
            });
        }
    }

    info!(
        segments = lag_tables.len(),
        ?branching,
        "Attached downstream lags"
    );
    output
}
