//! Pipeline configuration, stored as a JSON file next to the input tables:
//!
//! ```json
//! {
//!   "route_id": "000050",
//!   "direction": "N",
//!   "lag_count": 5,
//!   "inputs": {
//!     "section_info": "section_info.csv",
//!     "gantry_info": "etag_5n_loc.csv",
//!     "travel_time": "hw5_m04a.csv",
//!     "calendar_event": "calendar_event.csv",
//!     "congestion_table": "congestion_table.csv",
//!     "road_build_event": "road_build_event.csv",
//!     "traffic_accident": "traffic_accident.csv"
//!   },
//!   "overlap_policy": "last_write_wins"
//! }
//! ```

use crate::error::PanelError;
use crate::fusion::TravelOrientation;
use crate::traveltime::DEFAULT_LAG_COUNT;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How an event stage resolves a row matched by several events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Events are applied in table order; the last match overwrites earlier ones.
    #[default]
    LastWriteWins,
    /// The most severe match is kept; ties go to the later event.
    MostSevere,
}

/// Selects the construction incidents of the route direction under study.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RoadBuildFilter {
    pub freeway_id: i64,
    pub direction_code: i64,
}

impl Default for RoadBuildFilter {
    fn default() -> Self {
        Self {
            freeway_id: 10050,
            direction_code: 2,
        }
    }
}

/// Selects the accidents of the route direction under study.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccidentFilter {
    pub road_name: String,
    pub direction: String,
}

impl Default for AccidentFilter {
    fn default() -> Self {
        Self {
            road_name: "國道5號".to_string(),
            direction: "北".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InputPaths {
    pub section_info: PathBuf,
    pub gantry_info: PathBuf,
    pub travel_time: PathBuf,
    pub calendar_event: PathBuf,
    pub congestion_table: PathBuf,
    pub road_build_event: PathBuf,
    pub traffic_accident: PathBuf,
}

impl InputPaths {
    fn resolve_against(&mut self, base: &Path) {
        for path in [
            &mut self.section_info,
            &mut self.gantry_info,
            &mut self.travel_time,
            &mut self.calendar_event,
            &mut self.congestion_table,
            &mut self.road_build_event,
            &mut self.traffic_accident,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    #[serde(default = "default_route_id")]
    pub route_id: String,
    #[serde(default = "default_direction")]
    pub direction: String,
    #[serde(default = "default_lag_count")]
    pub lag_count: usize,
    pub inputs: InputPaths,
    #[serde(default)]
    pub road_build_filter: RoadBuildFilter,
    #[serde(default)]
    pub accident_filter: AccidentFilter,
    #[serde(default)]
    pub overlap_policy: OverlapPolicy,
    /// Column-description rows directly under the road-build header.
    #[serde(default = "default_description_rows")]
    pub road_build_description_rows: usize,
}

fn default_route_id() -> String {
    "000050".to_string()
}

fn default_direction() -> String {
    "N".to_string()
}

fn default_lag_count() -> usize {
    DEFAULT_LAG_COUNT
}

fn default_description_rows() -> usize {
    1
}

impl PipelineConfig {
    /// Loads and validates the config at `path`. Relative input paths are
    /// resolved against the config file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let mut config: PipelineConfig = serde_json::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        if let Some(base) = path.parent() {
            config.inputs.resolve_against(base);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PanelError> {
        if self.lag_count == 0 {
            return Err(PanelError::InvalidConfig(
                "lag_count must be at least 1".to_string(),
            ));
        }
        if self.route_id.trim().is_empty() {
            return Err(PanelError::InvalidConfig("route_id is empty".to_string()));
        }
        self.orientation().map(|_| ())
    }

    pub fn orientation(&self) -> Result<TravelOrientation, PanelError> {
        TravelOrientation::for_direction(&self.direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    const MINIMAL: &str = r#"{
        "inputs": {
            "section_info": "section_info.csv",
            "gantry_info": "gantry_info.csv",
            "travel_time": "/data/travel_time.csv",
            "calendar_event": "calendar_event.csv",
            "congestion_table": "congestion_table.csv",
            "road_build_event": "road_build_event.csv",
            "traffic_accident": "traffic_accident.csv"
        }
    }"#;

    fn temp_path(name: &str) -> PathBuf {
        env::temp_dir().join(name)
    }

    #[test]
    fn test_defaults() {
        let config: PipelineConfig = serde_json::from_str(MINIMAL).unwrap();
        assert_eq!(config.route_id, "000050");
        assert_eq!(config.direction, "N");
        assert_eq!(config.lag_count, 5);
        assert_eq!(config.overlap_policy, OverlapPolicy::LastWriteWins);
        assert_eq!(config.road_build_filter.freeway_id, 10050);
        assert_eq!(config.accident_filter.direction, "北");
        assert_eq!(config.road_build_description_rows, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overlap_policy_snake_case() {
        let policy: OverlapPolicy = serde_json::from_str("\"most_severe\"").unwrap();
        assert_eq!(policy, OverlapPolicy::MostSevere);
    }

    #[test]
    fn test_validate_rejects_zero_lags_and_unknown_direction() {
        let mut config: PipelineConfig = serde_json::from_str(MINIMAL).unwrap();
        config.lag_count = 0;
        assert!(matches!(config.validate(), Err(PanelError::InvalidConfig(_))));

        config.lag_count = 5;
        config.direction = "X".to_string();
        assert!(matches!(config.validate(), Err(PanelError::InvalidConfig(_))));
    }

    #[test]
    fn test_load_resolves_relative_inputs() {
        let dir = temp_path("hwttp_config_test");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("pipeline.json");
        fs::write(&path, MINIMAL).unwrap();

        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.inputs.section_info, dir.join("section_info.csv"));
        assert_eq!(config.inputs.travel_time, PathBuf::from("/data/travel_time.csv"));

        fs::remove_file(&path).unwrap();
    }
}
