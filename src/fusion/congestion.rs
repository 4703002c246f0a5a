use super::{MatchAudit, TravelOrientation, segment_spans};
use crate::calendar::{DayClass, hour_minute, year_month};
use crate::error::PanelError;
use crate::lookup::substitute_location_name;
use crate::mileage::MileageTable;
use crate::panel::Panel;
use crate::records::CongestionRule;
use chrono::NaiveDateTime;
use tracing::debug;

/// A congestion rule with its location names resolved to mileage.
#[derive(Debug, Clone, PartialEq)]
struct ResolvedRule {
    start_mileage: f64,
    end_mileage: f64,
    day_class: DayClass,
    start_hhmm: u32,
    end_hhmm: u32,
    start_year_month: u32,
    end_year_month: u32,
}

impl ResolvedRule {
    fn resolve(rule: &CongestionRule, mileage: &MileageTable) -> Result<Self, PanelError> {
        let start_name = substitute_location_name(&rule.link_start)?;
        let end_name = substitute_location_name(&rule.link_end)?;
        let start_mileage = mileage
            .mileage_of(start_name)
            .ok_or_else(|| PanelError::UnknownLocation(start_name.to_string()))?;
        let end_mileage = mileage
            .mileage_of(end_name)
            .ok_or_else(|| PanelError::UnknownLocation(end_name.to_string()))?;
        Ok(ResolvedRule {
            start_mileage: start_mileage as f64,
            end_mileage: end_mileage as f64,
            day_class: rule.day_class.parse()?,
            start_hhmm: rule.congest_start,
            end_hhmm: rule.congest_end,
            start_year_month: rule.start_year_month,
            end_year_month: rule.end_year_month,
        })
    }

    fn in_window(&self, ts: &NaiveDateTime) -> bool {
        let ym = year_month(ts);
        let hhmm = hour_minute(ts);
        (self.start_year_month..=self.end_year_month).contains(&ym)
            && DayClass::of(ts) == self.day_class
            && (self.start_hhmm..=self.end_hhmm).contains(&hhmm)
    }
}

/// Flags rows that fall inside any recurring congestion window.
///
/// Only rules for `direction` are applied. Every rule's location names go
/// through the substitution table first, so an unknown name fails the batch
/// even when the rule belongs to another direction.
///
/// # Errors
///
/// [`PanelError::UnknownCongestionLocation`] for a name with no substitution,
/// [`PanelError::UnknownLocation`] when the substituted name is not on the
/// route and [`PanelError::UnknownDayClass`] for an unrecognised day class.
#[tracing::instrument(skip_all, fields(rows = panel.len(), rules = rules.len()))]
pub fn fuse_congestion(
    panel: &Panel,
    rules: &[CongestionRule],
    mileage: &MileageTable,
    direction: &str,
    orientation: TravelOrientation,
) -> Result<Panel, PanelError> {
    let mut resolved = Vec::new();
    for rule in rules {
        substitute_location_name(&rule.link_start)?;
        substitute_location_name(&rule.link_end)?;
        if rule.direction.trim() == direction {
            resolved.push(ResolvedRule::resolve(rule, mileage)?);
        }
    }
    debug!(applied = resolved.len(), "Resolved congestion rules");

    let spans = segment_spans(&panel.rows, mileage);
    let mut audit = MatchAudit::new(panel.len());
    for rule in &resolved {
        let mut hit = false;
        for (i, row) in panel.rows.iter().enumerate() {
            let Some(span) = spans[i] else { continue };
            if rule.in_window(&row.observation.timestamp)
                && orientation.overlaps(span, rule.start_mileage, rule.end_mileage)
            {
                audit.record(i);
                hit = true;
            }
        }
        if hit {
            audit.record_event();
        }
    }
    audit.log("congestion");

    let mut output = panel.clone();
    for (i, row) in output.rows.iter_mut().enumerate() {
        row.congestion_syndrome = u8::from(audit.hit_count(i) > 0);
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::parse_timestamp;
    use crate::records::{GantryRecord, SectionRecord};
    use crate::traveltime::{LaggedObservation, SegmentObservation, segment_key};

    fn mileage() -> MileageTable {
        let section = |start: &str, end: &str, s: &str, e: &str| SectionRecord {
            road_id: "000050".to_string(),
            road_direction: "N".to_string(),
            section_start: start.to_string(),
            section_end: end.to_string(),
            start_mileage: s.to_string(),
            end_mileage: e.to_string(),
        };
        let gantry = |id: &str, mile: &str| GantryRecord {
            gantry_id: id.to_string(),
            road_id: "000050".to_string(),
            road_direction: "N".to_string(),
            location_mile: mile.to_string(),
        };
        MileageTable::resolve(
            &[
                section("頭城交流道", "坪林交控交流道", "K30+000", "K15+000"),
                section("坪林交控交流道", "南港系統交流道", "K15+000", "K0+000"),
            ],
            &[gantry("A", "K28+700"), gantry("B", "K15+300"), gantry("C", "K5+500")],
            "000050",
            "N",
        )
        .unwrap()
    }

    fn panel(rows: &[(&str, &str, &str)]) -> Panel {
        let lagged = rows
            .iter()
            .map(|(ts, from, to)| LaggedObservation {
                observation: SegmentObservation {
                    timestamp: parse_timestamp(ts).unwrap(),
                    gantry_from: from.to_string(),
                    gantry_to: to.to_string(),
                    segment_key: segment_key(from, to),
                    weighted_avg_travel_time: 300.0,
                    total_traffic: 1.0,
                },
                downstream_lags: vec![0.0],
            })
            .collect();
        Panel::from_lagged(lagged, 1)
    }

    fn rule(start: &str, end: &str, day: &str, from: u32, to: u32) -> CongestionRule {
        CongestionRule {
            link_start: start.to_string(),
            link_end: end.to_string(),
            direction: "N".to_string(),
            day_class: day.to_string(),
            congest_start: from,
            congest_end: to,
            start_year_month: 202401,
            end_year_month: 202412,
        }
    }

    fn flags(panel: &Panel) -> Vec<u8> {
        panel.rows.iter().map(|r| r.congestion_syndrome).collect()
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        // 2024-02-09 is a Friday
        let input = panel(&[
            ("2024-02-09 07:55", "A", "B"),
            ("2024-02-09 08:00", "A", "B"),
            ("2024-02-09 08:05", "A", "B"),
            ("2024-02-09 08:10", "A", "B"),
        ]);
        let rules = vec![rule("頭城", "坪林", "weekday", 800, 805)];
        let out = fuse_congestion(&input, &rules, &mileage(), "N", TravelOrientation::Descending)
            .unwrap();
        assert_eq!(flags(&out), vec![0, 1, 1, 0]);
    }

    #[test]
    fn test_two_matching_rules_still_flag_one() {
        let input = panel(&[("2024-02-09 08:05", "B", "C")]);
        let rules = vec![
            rule("頭城", "坪林", "weekday", 800, 805),
            rule("坪林", "南港系統", "weekday", 805, 830),
        ];
        let out = fuse_congestion(&input, &rules, &mileage(), "N", TravelOrientation::Descending)
            .unwrap();
        assert_eq!(flags(&out), vec![1]);
    }

    #[test]
    fn test_day_class_month_and_mileage_must_all_match() {
        let input = panel(&[
            ("2024-02-10 08:00", "A", "B"), // Saturday
            ("2025-02-10 08:00", "A", "B"), // outside year-month range
            ("2024-02-09 08:00", "A", "B"), // upstream of the rule span
        ]);
        let rules = vec![rule("坪林", "南港系統", "weekday", 800, 830)];
        let out = fuse_congestion(&input, &rules, &mileage(), "N", TravelOrientation::Descending)
            .unwrap();
        assert_eq!(flags(&out), vec![0, 0, 0]);

        let saturday = vec![rule("頭城", "坪林", "Saturday", 800, 830)];
        let out = fuse_congestion(&input, &saturday, &mileage(), "N", TravelOrientation::Descending)
            .unwrap();
        assert_eq!(flags(&out), vec![1, 0, 0]);
    }

    #[test]
    fn test_unknown_location_name_is_an_error() {
        let input = panel(&[("2024-02-09 08:00", "A", "B")]);
        let mut bad = rule("員山", "坪林", "weekday", 800, 805);
        bad.direction = "S".to_string();
        let err = fuse_congestion(&input, &[bad], &mileage(), "N", TravelOrientation::Descending)
            .unwrap_err();
        assert!(matches!(err, PanelError::UnknownCongestionLocation(_)));
    }

    #[test]
    fn test_substituted_name_missing_from_route() {
        let input = panel(&[("2024-02-09 08:00", "A", "B")]);
        let rules = vec![rule("宜蘭", "頭城", "weekday", 800, 805)];
        let err = fuse_congestion(&input, &rules, &mileage(), "N", TravelOrientation::Descending)
            .unwrap_err();
        assert!(matches!(err, PanelError::UnknownLocation(name) if name == "宜蘭交流道"));
    }

    #[test]
    fn test_other_direction_rules_are_skipped() {
        let input = panel(&[("2024-02-09 08:00", "A", "B")]);
        let mut south = rule("頭城", "坪林", "weekday", 800, 805);
        south.direction = "S".to_string();
        let out = fuse_congestion(&input, &[south], &mileage(), "N", TravelOrientation::Descending)
            .unwrap();
        assert_eq!(flags(&out), vec![0]);
    }
}
