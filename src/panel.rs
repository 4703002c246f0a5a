//! Fixed-schema rows of the enriched panel.
//!
//! Every feature group defaults to its "no event" value, so a row that no
//! event touched is already fully populated.

use crate::traveltime::{LaggedObservation, SegmentObservation};

/// Fill value for accident mileage and time fields of rows with no accident.
pub const NO_ACCIDENT_SENTINEL: i64 = 99_999_999;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalendarFeatures {
    /// Holidays covering the row's date, in holiday-table order.
    pub holiday_names: Vec<String>,
    pub holiday_continue: u8,
    pub holiday_length: i64,
    /// 1 = Monday .. 7 = Sunday.
    pub day_of_week: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoadBuildFeatures {
    pub road_build: u8,
    pub total_block_count: u32,
    pub road_block_count: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccidentFeatures {
    /// Meters.
    pub accident_mileage: f64,
    pub event_occurrence: String,
    pub event_exclusion: String,
    pub handling_minutes: i64,
    pub accident_type: u8,
    pub death_count: i64,
    pub injuries_count: i64,
    pub inner_shoulder_flag: i64,
    pub inner_lane_flag: i64,
    pub middle_inner_lane_flag: i64,
    pub middle_lane_flag: i64,
    pub middle_outer_lane_flag: i64,
    pub outer_lane_flag: i64,
    pub outer_shoulder_flag: i64,
    pub ramp_flag: i64,
    pub overturn_accident_flag: i64,
    pub construction_accident_flag: i64,
    pub hazardous_material_vehicle_flag: i64,
    pub on_fire_vehicle_flag: i64,
    pub smoking_vehicle_flag: i64,
    pub mainlane_disruption_flag: i64,
    pub accident_vehicle_count: i64,
    pub light_truck_count: i64,
    pub passenger_car_count: i64,
    pub bus_count: i64,
    pub heavy_truck_count: i64,
}

impl AccidentFeatures {
    pub const COLUMNS: [&'static str; 26] = [
        "accident_mileage",
        "event_occurrence",
        "event_exclusion",
        "handling_minutes",
        "accident_type",
        "death_count",
        "injuries_count",
        "inner_shoulder_flag",
        "inner_lane_flag",
        "middle_inner_lane_flag",
        "middle_lane_flag",
        "middle_outer_lane_flag",
        "outer_lane_flag",
        "outer_shoulder_flag",
        "ramp_flag",
        "overturn_accident_flag",
        "construction_accident_flag",
        "hazardous_material_vehicle_flag",
        "on_fire_vehicle_flag",
        "smoking_vehicle_flag",
        "mainlane_disruption_flag",
        "accident_vehicle_count",
        "light_truck_count",
        "passenger_car_count",
        "bus_count",
        "heavy_truck_count",
    ];

    /// Field values in [`Self::COLUMNS`] order.
    pub fn values(&self) -> [String; 26] {
        [
            self.accident_mileage.to_string(),
            self.event_occurrence.clone(),
            self.event_exclusion.clone(),
            self.handling_minutes.to_string(),
            self.accident_type.to_string(),
            self.death_count.to_string(),
            self.injuries_count.to_string(),
            self.inner_shoulder_flag.to_string(),
            self.inner_lane_flag.to_string(),
            self.middle_inner_lane_flag.to_string(),
            self.middle_lane_flag.to_string(),
            self.middle_outer_lane_flag.to_string(),
            self.outer_lane_flag.to_string(),
            self.outer_shoulder_flag.to_string(),
            self.ramp_flag.to_string(),
            self.overturn_accident_flag.to_string(),
            self.construction_accident_flag.to_string(),
            self.hazardous_material_vehicle_flag.to_string(),
            self.on_fire_vehicle_flag.to_string(),
            self.smoking_vehicle_flag.to_string(),
            self.mainlane_disruption_flag.to_string(),
            self.accident_vehicle_count.to_string(),
            self.light_truck_count.to_string(),
            self.passenger_car_count.to_string(),
            self.bus_count.to_string(),
            self.heavy_truck_count.to_string(),
        ]
    }

    pub fn is_accident(&self) -> bool {
        self.accident_mileage != NO_ACCIDENT_SENTINEL as f64
    }
}

impl Default for AccidentFeatures {
    fn default() -> Self {
        AccidentFeatures {
            accident_mileage: NO_ACCIDENT_SENTINEL as f64,
            event_occurrence: NO_ACCIDENT_SENTINEL.to_string(),
            event_exclusion: NO_ACCIDENT_SENTINEL.to_string(),
            handling_minutes: 0,
            accident_type: 0,
            death_count: 0,
            injuries_count: 0,
            inner_shoulder_flag: 0,
            inner_lane_flag: 0,
            middle_inner_lane_flag: 0,
            middle_lane_flag: 0,
            middle_outer_lane_flag: 0,
            outer_lane_flag: 0,
            outer_shoulder_flag: 0,
            ramp_flag: 0,
            overturn_accident_flag: 0,
            construction_accident_flag: 0,
            hazardous_material_vehicle_flag: 0,
            on_fire_vehicle_flag: 0,
            smoking_vehicle_flag: 0,
            mainlane_disruption_flag: 0,
            accident_vehicle_count: 0,
            light_truck_count: 0,
            passenger_car_count: 0,
            bus_count: 0,
            heavy_truck_count: 0,
        }
    }
}

/// One `(timestamp, segment)` row of the panel.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelRow {
    pub observation: SegmentObservation,
    pub downstream_lags: Vec<f64>,
    pub calendar: CalendarFeatures,
    pub congestion_syndrome: u8,
    pub road_build: RoadBuildFeatures,
    pub accident: AccidentFeatures,
}

impl From<LaggedObservation> for PanelRow {
    fn from(lagged: LaggedObservation) -> Self {
        PanelRow {
            observation: lagged.observation,
            downstream_lags: lagged.downstream_lags,
            calendar: CalendarFeatures::default(),
            congestion_syndrome: 0,
            road_build: RoadBuildFeatures::default(),
            accident: AccidentFeatures::default(),
        }
    }
}

/// The enriched table plus the schema details that vary per run.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub lag_count: usize,
    /// One-hot holiday indicator columns, sorted by name.
    pub holiday_columns: Vec<String>,
    pub rows: Vec<PanelRow>,
}

impl Panel {
    pub fn from_lagged(lagged: Vec<LaggedObservation>, lag_count: usize) -> Self {
        Panel {
            lag_count,
            holiday_columns: Vec::new(),
            rows: lagged.into_iter().map(PanelRow::from).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
