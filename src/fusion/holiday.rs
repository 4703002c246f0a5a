use super::MatchAudit;
use crate::calendar::{day_of_week, expand_dates};
use crate::panel::{CalendarFeatures, Panel};
use crate::records::HolidayRecord;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

/// Joins holidays to rows by calendar date and adds the day of week.
///
/// A date covered by several holidays sets every matching indicator. The
/// continuity flag is set if any of them is continuous and the length is the
/// longest among them. The indicator columns are every distinct holiday name,
/// sorted.
#[tracing::instrument(skip_all, fields(rows = panel.len(), holidays = holidays.len()))]
pub fn fuse_holidays(panel: &Panel, holidays: &[HolidayRecord]) -> Panel {
    let mut by_date: BTreeMap<NaiveDate, Vec<&HolidayRecord>> = BTreeMap::new();
    for holiday in holidays {
        for date in expand_dates(holiday.start_date, holiday.end_date) {
            by_date.entry(date).or_default().push(holiday);
        }
    }

    let holiday_columns: Vec<String> = holidays
        .iter()
        .map(|h| h.event_name.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut audit = MatchAudit::new(panel.len());
    let mut matched_holidays: BTreeSet<&str> = BTreeSet::new();
    let mut rows = panel.rows.clone();
    for (i, row) in rows.iter_mut().enumerate() {
        let timestamp = row.observation.timestamp;
        let covering = by_date.get(&timestamp.date()).map(Vec::as_slice).unwrap_or(&[]);

        let mut calendar = CalendarFeatures {
            day_of_week: day_of_week(&timestamp),
            ..CalendarFeatures::default()
        };
        for holiday in covering {
            audit.record(i);
            matched_holidays.insert(&holiday.event_name);
            if !calendar.holiday_names.contains(&holiday.event_name) {
                calendar.holiday_names.push(holiday.event_name.clone());
            }
            calendar.holiday_continue = calendar.holiday_continue.max(u8::from(holiday.continuous));
            calendar.holiday_length = calendar.holiday_length.max(holiday.event_length);
        }
        row.calendar = calendar;
    }
    for _ in &matched_holidays {
        audit.record_event();
    }
    audit.log("holiday");

    Panel {
        lag_count: panel.lag_count,
        holiday_columns,
        rows,
    }
}
