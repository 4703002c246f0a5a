//! Reads the seven source tables into typed rows.

use crate::config::PipelineConfig;
use crate::records::{
    AccidentRecord, CongestionRule, GantryRecord, HolidayRecord, RoadBuildIncident, SectionRecord,
    TravelTimeSample,
};
use anyhow::{Context, Result};
use csv::{ReaderBuilder, Trim};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::path::Path;
use tracing::info;

/// Deserializes every row of a headed CSV file, skipping the first
/// `skip_rows` data rows.
pub fn read_records<T: DeserializeOwned>(path: &Path, skip_rows: usize) -> Result<Vec<T>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(file);
    let headers = rdr
        .headers()
        .with_context(|| format!("reading header of {}", path.display()))?
        .clone();

    let mut rows = Vec::new();
    for (i, result) in rdr.records().enumerate().skip(skip_rows) {
        let record =
            result.with_context(|| format!("reading row {} of {}", i + 1, path.display()))?;
        let row: T = record
            .deserialize(Some(&headers))
            .with_context(|| format!("decoding row {} of {}", i + 1, path.display()))?;
        rows.push(row);
    }
    Ok(rows)
}

/// All source tables of one run.
#[derive(Debug, Default)]
pub struct SourceTables {
    pub sections: Vec<SectionRecord>,
    pub gantries: Vec<GantryRecord>,
    pub samples: Vec<TravelTimeSample>,
    pub holidays: Vec<HolidayRecord>,
    pub congestion_rules: Vec<CongestionRule>,
    pub road_build: Vec<RoadBuildIncident>,
    pub accidents: Vec<AccidentRecord>,
}

impl SourceTables {
    #[tracing::instrument(skip_all)]
    pub fn load(config: &PipelineConfig) -> Result<Self> {
        let inputs = &config.inputs;
        let tables = SourceTables {
            sections: read_records(&inputs.section_info, 0)?,
            gantries: read_records(&inputs.gantry_info, 0)?,
            samples: read_records(&inputs.travel_time, 0)?,
            holidays: read_records(&inputs.calendar_event, 0)?,
            congestion_rules: read_records(&inputs.congestion_table, 0)?,
            road_build: read_records(&inputs.road_build_event, config.road_build_description_rows)?,
            accidents: read_records(&inputs.traffic_accident, 0)?,
        };
        info!(
            sections = tables.sections.len(),
            gantries = tables.gantries.len(),
            samples = tables.samples.len(),
            holidays = tables.holidays.len(),
            congestion_rules = tables.congestion_rules.len(),
            road_build = tables.road_build.len(),
            accidents = tables.accidents.len(),
            "Loaded source tables"
        );
        Ok(tables)
    }
}
