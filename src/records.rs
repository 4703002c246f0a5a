//! Typed rows of the source tables handed over by the download/ETL collaborators.
//!
//! Column names follow the published source files; accident rows also accept
//! English aliases.

use crate::calendar::{parse_date, parse_timestamp};
use chrono::{NaiveDate, NaiveDateTime};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

/// One freeway section bounded by two interchanges.
#[derive(Debug, Clone, Deserialize)]
pub struct SectionRecord {
    #[serde(rename = "RoadID")]
    pub road_id: String,
    #[serde(rename = "RoadDirection")]
    pub road_direction: String,
    #[serde(rename = "RoadSection_Start")]
    pub section_start: String,
    #[serde(rename = "RoadSection_End")]
    pub section_end: String,
    #[serde(rename = "SectionMile_StartKM")]
    pub start_mileage: String,
    #[serde(rename = "SectionMile_EndKM")]
    pub end_mileage: String,
}

/// Location of one electronic toll gantry.
#[derive(Debug, Clone, Deserialize)]
pub struct GantryRecord {
    #[serde(rename = "ETagGantryID")]
    pub gantry_id: String,
    #[serde(rename = "RoadID")]
    pub road_id: String,
    #[serde(rename = "RoadDirection")]
    pub road_direction: String,
    #[serde(rename = "LocationMile")]
    pub location_mile: String,
}

/// Travel time of one vehicle class between two gantries in one interval.
#[derive(Debug, Clone, Deserialize)]
pub struct TravelTimeSample {
    #[serde(rename = "TimeStamp", deserialize_with = "timestamp")]
    pub timestamp: NaiveDateTime,
    #[serde(rename = "GantryFrom")]
    pub gantry_from: String,
    #[serde(rename = "GantryTo")]
    pub gantry_to: String,
    #[serde(rename = "VehicleType")]
    pub vehicle_type: String,
    #[serde(rename = "TravelTime")]
    pub travel_time: f64,
    #[serde(rename = "Traffic")]
    pub traffic: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HolidayRecord {
    pub event_name: String,
    #[serde(deserialize_with = "date")]
    pub start_date: NaiveDate,
    #[serde(deserialize_with = "date")]
    pub end_date: NaiveDate,
    #[serde(deserialize_with = "tf_flag")]
    pub continuous: bool,
    #[serde(default, deserialize_with = "lenient_count")]
    pub event_length: i64,
}

/// A recurring congestion window between two named locations.
#[derive(Debug, Clone, Deserialize)]
pub struct CongestionRule {
    #[serde(rename = "LinkStart")]
    pub link_start: String,
    #[serde(rename = "LinkEnd")]
    pub link_end: String,
    pub direction: String,
    #[serde(rename = "dayofweek")]
    pub day_class: String,
    #[serde(rename = "CongestStart")]
    pub congest_start: u32,
    #[serde(rename = "CongestEnd")]
    pub congest_end: u32,
    #[serde(rename = "StartYearMonth")]
    pub start_year_month: u32,
    #[serde(rename = "EndYearMonth")]
    pub end_year_month: u32,
}

/// One step of a road-construction incident.
#[derive(Debug, Clone, Deserialize)]
pub struct RoadBuildIncident {
    #[serde(rename = "incStepIncidentId")]
    pub incident_id: String,
    #[serde(rename = "incStepFreewayId")]
    pub freeway_id: i64,
    #[serde(rename = "incStepDirection")]
    pub direction_code: i64,
    #[serde(rename = "incStepTime", deserialize_with = "timestamp")]
    pub start_time: NaiveDateTime,
    #[serde(rename = "incStepEndTime", default, deserialize_with = "optional_timestamp")]
    pub end_time: Option<NaiveDateTime>,
    #[serde(rename = "incStepStartMileage", default, deserialize_with = "optional_float")]
    pub start_mileage: Option<f64>,
    #[serde(rename = "incStepEndMileage", default, deserialize_with = "optional_float")]
    pub end_mileage: Option<f64>,
    #[serde(rename = "incStepBlockagePattern", default)]
    pub blockage_pattern: String,
}

/// One traffic accident report.
#[derive(Debug, Clone, Deserialize)]
pub struct AccidentRecord {
    #[serde(rename = "年", alias = "year")]
    pub year: i32,
    #[serde(rename = "月", alias = "month")]
    pub month: u32,
    #[serde(rename = "日", alias = "day")]
    pub day: u32,
    #[serde(rename = "時", alias = "hour")]
    pub hour: u32,
    #[serde(rename = "分", alias = "minute")]
    pub minute: u32,
    #[serde(rename = "國道名稱", alias = "road_name")]
    pub road_name: String,
    #[serde(rename = "方向", alias = "direction")]
    pub direction: String,
    /// Kilometers.
    #[serde(rename = "里程", alias = "mileage_km", default, deserialize_with = "optional_float")]
    pub mileage_km: Option<f64>,
    #[serde(rename = "事件發生", alias = "event_occurrence", default)]
    pub event_occurrence: Option<String>,
    #[serde(rename = "事件排除", alias = "event_exclusion", default)]
    pub event_exclusion: Option<String>,
    #[serde(rename = "處理分鐘", alias = "handling_minutes", default, deserialize_with = "lenient_count")]
    pub handling_minutes: i64,
    #[serde(rename = "事故類型", alias = "accident_type", default)]
    pub accident_type: Option<String>,
    #[serde(rename = "死亡", alias = "death_count", default, deserialize_with = "lenient_count")]
    pub death_count: i64,
    #[serde(rename = "受傷", alias = "injuries_count", default, deserialize_with = "lenient_count")]
    pub injuries_count: i64,
    #[serde(rename = "內路肩", alias = "inner_shoulder", default, deserialize_with = "lenient_count")]
    pub inner_shoulder: i64,
    #[serde(rename = "內車道", alias = "inner_lane", default, deserialize_with = "lenient_count")]
    pub inner_lane: i64,
    #[serde(rename = "中內車道", alias = "middle_inner_lane", default, deserialize_with = "lenient_count")]
    pub middle_inner_lane: i64,
    #[serde(rename = "中車道", alias = "middle_lane", default, deserialize_with = "lenient_count")]
    pub middle_lane: i64,
    #[serde(rename = "中外車道", alias = "middle_outer_lane", default, deserialize_with = "lenient_count")]
    pub middle_outer_lane: i64,
    #[serde(rename = "外車道", alias = "outer_lane", default, deserialize_with = "lenient_count")]
    pub outer_lane: i64,
    #[serde(rename = "外路肩", alias = "outer_shoulder", default, deserialize_with = "lenient_count")]
    pub outer_shoulder: i64,
    #[serde(rename = "匝道", alias = "ramp", default, deserialize_with = "lenient_count")]
    pub ramp: i64,
    #[serde(rename = "翻覆事故註記", alias = "overturn", default, deserialize_with = "lenient_count")]
    pub overturn: i64,
    #[serde(rename = "施工事故註記", alias = "construction", default, deserialize_with = "lenient_count")]
    pub construction: i64,
    #[serde(rename = "危險物品車輛註記", alias = "hazardous_material", default, deserialize_with = "lenient_count")]
    pub hazardous_material: i64,
    #[serde(rename = "車輛起火註記", alias = "on_fire", default, deserialize_with = "lenient_count")]
    pub on_fire: i64,
    #[serde(rename = "冒煙車事故註記", alias = "smoking", default, deserialize_with = "lenient_count")]
    pub smoking: i64,
    #[serde(rename = "主線中斷註記", alias = "mainlane_disruption", default, deserialize_with = "lenient_count")]
    pub mainlane_disruption: i64,
    #[serde(rename = "肇事車輛", alias = "accident_vehicle_count", default, deserialize_with = "lenient_count")]
    pub accident_vehicle_count: i64,
    #[serde(rename = "車輛1", alias = "vehicle_1", default)]
    pub vehicle_1: Option<String>,
    #[serde(rename = "車輛2", alias = "vehicle_2", default)]
    pub vehicle_2: Option<String>,
    #[serde(rename = "車輛3", alias = "vehicle_3", default)]
    pub vehicle_3: Option<String>,
    #[serde(rename = "車輛4", alias = "vehicle_4", default)]
    pub vehicle_4: Option<String>,
    #[serde(rename = "車輛5", alias = "vehicle_5", default)]
    pub vehicle_5: Option<String>,
    #[serde(rename = "車輛6", alias = "vehicle_6", default)]
    pub vehicle_6: Option<String>,
    #[serde(rename = "車輛7", alias = "vehicle_7", default)]
    pub vehicle_7: Option<String>,
    #[serde(rename = "車輛8", alias = "vehicle_8", default)]
    pub vehicle_8: Option<String>,
    #[serde(rename = "車輛9", alias = "vehicle_9", default)]
    pub vehicle_9: Option<String>,
    #[serde(rename = "車輛10", alias = "vehicle_10", default)]
    pub vehicle_10: Option<String>,
    #[serde(rename = "車輛11", alias = "vehicle_11", default)]
    pub vehicle_11: Option<String>,
    #[serde(rename = "車輛12", alias = "vehicle_12", default)]
    pub vehicle_12: Option<String>,
}

impl AccidentRecord {
    /// Non-blank vehicle entries joined with commas.
    pub fn combined_vehicles(&self) -> String {
        [
            &self.vehicle_1,
            &self.vehicle_2,
            &self.vehicle_3,
            &self.vehicle_4,
            &self.vehicle_5,
            &self.vehicle_6,
            &self.vehicle_7,
            &self.vehicle_8,
            &self.vehicle_9,
            &self.vehicle_10,
            &self.vehicle_11,
            &self.vehicle_12,
        ]
        .into_iter()
        .filter_map(|v| v.as_deref().map(str::trim).filter(|s| !s.is_empty()))
        .collect::<Vec<_>>()
        .join(",")
    }
}

fn timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(D::Error::custom)
}

fn optional_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<NaiveDateTime>, D::Error> {
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.trim().is_empty() => parse_timestamp(&raw).map(Some).map_err(D::Error::custom),
        _ => Ok(None),
    }
}

/// Float column that may be blank.
fn optional_float<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("expected a number, got '{raw}'"))),
        _ => Ok(None),
    }
}

fn date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw).map_err(D::Error::custom)
}

fn tf_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
    match raw.trim() {
        "T" | "t" | "1" | "true" | "True" => Ok(true),
        "F" | "f" | "0" | "false" | "False" | "" => Ok(false),
        other => Err(D::Error::custom(format!("expected T or F, got '{other}'"))),
    }
}

/// Integer column that may be blank or written as a float (`3.0`).
fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<f64>()
            .map(|v| v as i64)
            .map_err(|_| D::Error::custom(format!("expected a number, got '{raw}'"))),
        _ => Ok(0),
    }
}
