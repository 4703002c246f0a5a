use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;

use crate::pipeline::PanelBuild;

/// Summary of one panel build, logged after every run and optionally appended
/// to a CSV history.
#[derive(Debug, Default, Serialize)]
pub struct PanelSummary {
    pub generated_at: DateTime<Utc>,
    pub route_id: String,
    pub direction: String,
    pub lag_count: usize,

    // shape
    pub rows: usize,
    pub segments: usize,
    pub locations: usize,
    pub first_timestamp: Option<NaiveDateTime>,
    pub last_timestamp: Option<NaiveDateTime>,
    pub zero_traffic_rows: usize,

    // rows touched by each event source
    pub holiday_rows: usize,
    pub congestion_rows: usize,
    pub road_build_rows: usize,
    pub accident_rows: usize,
}

impl PanelSummary {
    pub fn from_build(build: &PanelBuild) -> Self {
        let panel = &build.panel;
        let mut s = PanelSummary {
            generated_at: Utc::now(),
            route_id: build.mileage.route_id().to_string(),
            direction: build.mileage.direction().to_string(),
            lag_count: panel.lag_count,
            rows: panel.len(),
            locations: build.mileage.len(),
            ..Default::default()
        };

        let mut segments = HashSet::new();
        for row in &panel.rows {
            let obs = &row.observation;
            segments.insert(obs.segment_key.as_str());

            s.first_timestamp = Some(s.first_timestamp.map_or(obs.timestamp, |t| t.min(obs.timestamp)));
            s.last_timestamp = Some(s.last_timestamp.map_or(obs.timestamp, |t| t.max(obs.timestamp)));

            if obs.total_traffic == 0.0 {
                s.zero_traffic_rows += 1;
            }
            if !row.calendar.holiday_names.is_empty() {
                s.holiday_rows += 1;
            }
            if row.congestion_syndrome == 1 {
                s.congestion_rows += 1;
            }
            if row.road_build.road_build == 1 {
                s.road_build_rows += 1;
            }
            if row.accident.is_accident() {
                s.accident_rows += 1;
            }
        }
        s.segments = segments.len();

        s
    }

    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    pub fn congestion_pct(&self) -> f64 {
        Self::pct(self.congestion_rows, self.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::parse_timestamp;
    use crate::mileage::MileageTable;
    use crate::panel::Panel;
    use crate::traveltime::{LaggedObservation, SegmentObservation, segment_key};

    fn build(rows: &[(&str, &str, &str, f64)]) -> PanelBuild {
        let lagged = rows
            .iter()
            .map(|(ts, from, to, traffic)| LaggedObservation {
                observation: SegmentObservation {
                    timestamp: parse_timestamp(ts).unwrap(),
                    gantry_from: from.to_string(),
                    gantry_to: to.to_string(),
                    segment_key: segment_key(from, to),
                    weighted_avg_travel_time: 300.0,
                    total_traffic: *traffic,
                },
                downstream_lags: vec![0.0],
            })
            .collect();
        PanelBuild {
            mileage: MileageTable::resolve(&[], &[], "000050", "N").unwrap(),
            panel: Panel::from_lagged(lagged, 1),
        }
    }

    #[test]
    fn test_pct_with_zero_total() {
        assert_eq!(PanelSummary::pct(10, 0), 0.0);
    }

    #[test]
    fn test_pct_normal_values() {
        assert_eq!(PanelSummary::pct(50, 100), 50.0);
        assert_eq!(PanelSummary::pct(1, 4), 25.0);
    }

    #[test]
    fn test_from_build_empty() {
        let summary = PanelSummary::from_build(&build(&[]));
        assert_eq!(summary.rows, 0);
        assert_eq!(summary.segments, 0);
        assert_eq!(summary.first_timestamp, None);
        assert_eq!(summary.route_id, "000050");
    }

    #[test]
    fn test_from_build_counts() {
        let mut built = build(&[
            ("2024-02-09 08:05", "A", "B", 3.0),
            ("2024-02-09 08:00", "A", "B", 0.0),
            ("2024-02-09 08:10", "B", "C", 1.0),
        ]);
        built.panel.rows[0].congestion_syndrome = 1;
        built.panel.rows[2].road_build.road_build = 1;

        let summary = PanelSummary::from_build(&built);
        assert_eq!(summary.rows, 3);
        assert_eq!(summary.segments, 2);
        assert_eq!(summary.zero_traffic_rows, 1);
        assert_eq!(summary.congestion_rows, 1);
        assert_eq!(summary.road_build_rows, 1);
        assert_eq!(summary.accident_rows, 0);
        assert_eq!(summary.first_timestamp, Some(parse_timestamp("2024-02-09 08:00").unwrap()));
        assert_eq!(summary.last_timestamp, Some(parse_timestamp("2024-02-09 08:10").unwrap()));
    }

    #[test]
    fn test_congestion_pct() {
        let summary = PanelSummary {
            rows: 4,
            congestion_rows: 1,
            ..Default::default()
        };
        assert_eq!(summary.congestion_pct(), 25.0);
    }
}
