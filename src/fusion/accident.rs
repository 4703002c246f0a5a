use super::{MatchAudit, TravelOrientation, segment_spans};
use crate::config::{AccidentFilter, OverlapPolicy};
use crate::error::PanelError;
use crate::lookup::{VEHICLE_TOKENS, accident_type_code};
use crate::mileage::MileageTable;
use crate::panel::{AccidentFeatures, NO_ACCIDENT_SENTINEL, Panel};
use crate::records::AccidentRecord;
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use tracing::{debug, warn};

/// An accident placed on the time and mileage axes.
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedAccident {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Meters.
    pub mileage: f64,
    pub features: AccidentFeatures,
}

/// Counts each vehicle-type token in a free-text vehicle list: light truck,
/// passenger car, bus, heavy truck.
pub fn count_vehicle_types(vehicles: &str) -> [i64; 4] {
    VEHICLE_TOKENS.map(|token| vehicles.matches(token).count() as i64)
}

fn accident_start(record: &AccidentRecord) -> Result<NaiveDateTime, PanelError> {
    NaiveDate::from_ymd_opt(record.year, record.month, record.day)
        .and_then(|d| d.and_hms_opt(record.hour, record.minute, 0))
        .ok_or(PanelError::AccidentDateTime {
            year: record.year,
            month: record.month,
            day: record.day,
            hour: record.hour,
            minute: record.minute,
        })
}

/// Start, end and mileage in meters of one accident.
fn accident_window(record: &AccidentRecord) -> Result<(NaiveDateTime, NaiveDateTime, f64), PanelError> {
    let start = accident_start(record)?;
    let end = TimeDelta::try_minutes(record.handling_minutes)
        .and_then(|d| start.checked_add_signed(d))
        .ok_or(PanelError::HandlingDuration {
            minutes: record.handling_minutes,
        })?;
    let km = record
        .mileage_km
        .ok_or_else(|| PanelError::MissingAccidentMileage(start.to_string()))?;
    Ok((start, end, km * 1000.0))
}

impl LocatedAccident {
    /// Builds the time window and the feature values of one accident.
    ///
    /// # Errors
    ///
    /// [`PanelError::AccidentDateTime`] for an impossible date or time,
    /// [`PanelError::HandlingDuration`] when the handling time runs past the
    /// representable range, [`PanelError::MissingAccidentMileage`] for a blank
    /// mileage and [`PanelError::UnknownAccidentType`] for an unrecognised type
    /// code.
    pub fn locate(record: &AccidentRecord) -> Result<Self, PanelError> {
        let (start, end, mileage) = accident_window(record)?;
        let [light_truck_count, passenger_car_count, bus_count, heavy_truck_count] =
            count_vehicle_types(&record.combined_vehicles());
        let or_sentinel = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| NO_ACCIDENT_SENTINEL.to_string())
        };

        let features = AccidentFeatures {
            accident_mileage: mileage,
            event_occurrence: or_sentinel(&record.event_occurrence),
            event_exclusion: or_sentinel(&record.event_exclusion),
            handling_minutes: record.handling_minutes,
            accident_type: accident_type_code(record.accident_type.as_deref())?,
            death_count: record.death_count,
            injuries_count: record.injuries_count,
            inner_shoulder_flag: record.inner_shoulder,
            inner_lane_flag: record.inner_lane,
            middle_inner_lane_flag: record.middle_inner_lane,
            middle_lane_flag: record.middle_lane,
            middle_outer_lane_flag: record.middle_outer_lane,
            outer_lane_flag: record.outer_lane,
            outer_shoulder_flag: record.outer_shoulder,
            ramp_flag: record.ramp,
            overturn_accident_flag: record.overturn,
            construction_accident_flag: record.construction,
            hazardous_material_vehicle_flag: record.hazardous_material,
            on_fire_vehicle_flag: record.on_fire,
            smoking_vehicle_flag: record.smoking,
            mainlane_disruption_flag: record.mainlane_disruption,
            accident_vehicle_count: record.accident_vehicle_count,
            light_truck_count,
            passenger_car_count,
            bus_count,
            heavy_truck_count,
        };
        Ok(LocatedAccident {
            start,
            end,
            mileage,
            features,
        })
    }
}

fn replaces(policy: OverlapPolicy, current: &AccidentFeatures, candidate: &AccidentFeatures) -> bool {
    match policy {
        OverlapPolicy::LastWriteWins => true,
        OverlapPolicy::MostSevere => {
            !current.is_accident() || candidate.accident_type >= current.accident_type
        }
    }
}

/// Attaches accidents to the rows whose time falls in the accident window and
/// whose segment contains the accident mileage.
///
/// Rows matched by several accidents are resolved by `policy`: the accident
/// processed last wins by default, or the highest type code under
/// [`OverlapPolicy::MostSevere`]. Unmatched rows keep the sentinel defaults.
/// Accidents without a mileage never match.
///
/// # Errors
///
/// Fails on the first selected accident with an impossible date or handling
/// time. The type code is only checked for accidents that match a row.
#[tracing::instrument(skip_all, fields(rows = panel.len(), accidents = accidents.len()))]
pub fn fuse_accidents(
    panel: &Panel,
    accidents: &[AccidentRecord],
    filter: &AccidentFilter,
    mileage: &MileageTable,
    orientation: TravelOrientation,
    policy: OverlapPolicy,
) -> Result<Panel, PanelError> {
    let selected: Vec<&AccidentRecord> = accidents
        .iter()
        .filter(|a| a.road_name.trim() == filter.road_name && a.direction.trim() == filter.direction)
        .collect();
    debug!(selected = selected.len(), "Filtered accidents");

    let (placed, unplaced): (Vec<_>, Vec<_>) =
        selected.into_iter().partition(|a| a.mileage_km.is_some());
    if !unplaced.is_empty() {
        warn!(unplaced = unplaced.len(), "Accidents without a mileage are ignored");
    }

    let spans = segment_spans(&panel.rows, mileage);
    let mut audit = MatchAudit::new(panel.len());
    let mut output = panel.clone();
    for record in placed {
        let (start, end, accident_mileage) = accident_window(record)?;
        let matched: Vec<usize> = output
            .rows
            .iter()
            .enumerate()
            .filter(|(i, row)| {
                let ts = row.observation.timestamp;
                spans[*i].is_some_and(|span| {
                    ts >= start
                        && ts <= end
                        && orientation.overlaps(span, accident_mileage, accident_mileage)
                })
            })
            .map(|(i, _)| i)
            .collect();
        if matched.is_empty() {
            continue;
        }

        let accident = LocatedAccident::locate(record)?;
        audit.record_event();
        for i in matched {
            audit.record(i);
            let row = &mut output.rows[i];
            if replaces(policy, &row.accident, &accident.features) {
                row.accident = accident.features.clone();
            }
        }
    }
    audit.log("accident");
    Ok(output)
}
