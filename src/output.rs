//! Output formatting and persistence for panels and run summaries.
//!
//! Supports the full panel, the forecast frame, intermediate tables, optional
//! gzip compression and CSV append of run summaries.

use anyhow::{Context, Result};
use clap::ValueEnum;
use flate2::Compression;
use flate2::write::GzEncoder;
use tracing::{debug, info};

use crate::mileage::MileageTable;
use crate::panel::{AccidentFeatures, Panel, PanelRow};
use crate::stats::PanelSummary;
use crate::traveltime::{SegmentObservation, lag_column_name};
use csv::{Writer, WriterBuilder};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Column layout of a written panel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Every column, keyed by timestamp and gantry pair.
    #[default]
    Panel,
    /// Forecasting frame: `unique_id`, `ds`, `y` first, gantry columns dropped.
    Forecast,
}

pub fn panel_header(panel: &Panel, format: OutputFormat) -> Vec<String> {
    let mut header: Vec<String> = match format {
        OutputFormat::Panel => ["TimeStamp", "GantryFrom", "GantryTo", "gf_gt", "WeightedAvgTravelTime"]
            .map(String::from)
            .to_vec(),
        OutputFormat::Forecast => ["unique_id", "ds", "y"].map(String::from).to_vec(),
    };
    header.push("TotalTraffic".to_string());
    header.extend((1..=panel.lag_count).map(lag_column_name));
    header.extend(
        ["holiday_name", "holiday_continue", "holiday_length"].map(String::from),
    );
    header.extend(panel.holiday_columns.iter().map(|name| format!("holiday_name_{name}")));
    header.extend(
        ["dayofweek", "congestion_syndrome", "road_build", "total_block_count", "road_block_count"]
            .map(String::from),
    );
    header.extend(AccidentFeatures::COLUMNS.map(String::from));
    header
}

pub fn panel_record(row: &PanelRow, holiday_columns: &[String], format: OutputFormat) -> Vec<String> {
    let obs = &row.observation;
    let timestamp = obs.timestamp.format(TIMESTAMP_FORMAT).to_string();
    let mut record = match format {
        OutputFormat::Panel => vec![
            timestamp,
            obs.gantry_from.clone(),
            obs.gantry_to.clone(),
            obs.segment_key.clone(),
            obs.weighted_avg_travel_time.to_string(),
        ],
        OutputFormat::Forecast => vec![
            obs.segment_key.clone(),
            timestamp,
            obs.weighted_avg_travel_time.to_string(),
        ],
    };
    record.push(obs.total_traffic.to_string());
    record.extend(row.downstream_lags.iter().map(f64::to_string));

    let calendar = &row.calendar;
    record.push(calendar.holiday_names.join("|"));
    record.push(calendar.holiday_continue.to_string());
    record.push(calendar.holiday_length.to_string());
    record.extend(
        holiday_columns
            .iter()
            .map(|name| u8::from(calendar.holiday_names.contains(name)).to_string()),
    );
    record.push(calendar.day_of_week.to_string());
    record.push(row.congestion_syndrome.to_string());
    record.push(row.road_build.road_build.to_string());
    record.push(row.road_build.total_block_count.to_string());
    record.push(row.road_build.road_block_count.to_string());
    record.extend(row.accident.values());
    record
}

/// Writes the header and every row of `panel` as CSV.
pub fn write_panel<W: Write>(writer: W, panel: &Panel, format: OutputFormat) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);
    wtr.write_record(panel_header(panel, format))?;
    for row in &panel.rows {
        wtr.write_record(panel_record(row, &panel.holiday_columns, format))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes the panel to `path`, gzip-compressed when `gzip` is set.
#[tracing::instrument(skip(panel), fields(rows = panel.len()))]
pub fn write_panel_file(path: &Path, panel: &Panel, format: OutputFormat, gzip: bool) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    if gzip {
        let mut encoder = GzEncoder::new(file, Compression::default());
        write_panel(&mut encoder, panel, format)?;
        encoder.finish()?;
    } else {
        write_panel(file, panel, format)?;
    }
    info!(path = %path.display(), gzip, "Panel written");
    Ok(())
}

pub fn write_mileage_table<W: Write>(writer: W, table: &MileageTable) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);
    for location in table.locations() {
        wtr.serialize(location)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_observations<W: Write>(writer: W, series: &[SegmentObservation]) -> Result<()> {
    let mut wtr = Writer::from_writer(writer);
    for obs in series {
        wtr.serialize(obs)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Logs a run summary using Rust's debug pretty-print format.
pub fn print_pretty(summary: &PanelSummary) {
    debug!("{:#?}", summary);
}

/// Logs a run summary as pretty-printed JSON.
pub fn print_json(summary: &PanelSummary) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(summary)?);
    Ok(())
}

/// Appends a [`PanelSummary`] as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_summary(path: &Path, summary: &PanelSummary) -> Result<()> {
    let file_exists = path.exists();
    debug!(path = %path.display(), file_exists, "Appending summary record");

    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    writer.serialize(summary)?;
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::parse_timestamp;
    use crate::traveltime::{LaggedObservation, segment_key};
    use flate2::read::GzDecoder;
    use std::env;
    use std::fs;
    use std::io::Read;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        env::temp_dir().join(name)
    }

    fn sample_panel() -> Panel {
        let lagged = vec![LaggedObservation {
            observation: SegmentObservation {
                timestamp: parse_timestamp("2024-02-09 08:05").unwrap(),
                gantry_from: "05F0287N".to_string(),
                gantry_to: "05F0153N".to_string(),
                segment_key: segment_key("05F0287N", "05F0153N"),
                weighted_avg_travel_time: 325.0,
                total_traffic: 4.0,
            },
            downstream_lags: vec![500.0, 0.0],
        }];
        let mut panel = Panel::from_lagged(lagged, 2);
        panel.holiday_columns = vec!["春節".to_string(), "除夕".to_string()];
        panel.rows[0].calendar.holiday_names = vec!["除夕".to_string()];
        panel.rows[0].calendar.day_of_week = 5;
        panel
    }

    fn to_string(panel: &Panel, format: OutputFormat) -> String {
        let mut buf = Vec::new();
        write_panel(&mut buf, panel, format).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_header_and_record_have_same_width() {
        let panel = sample_panel();
        for format in [OutputFormat::Panel, OutputFormat::Forecast] {
            let header = panel_header(&panel, format);
            let record = panel_record(&panel.rows[0], &panel.holiday_columns, format);
            assert_eq!(header.len(), record.len());
        }
    }

    #[test]
    fn test_panel_layout() {
        let content = to_string(&sample_panel(), OutputFormat::Panel);
        let mut lines = content.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("TimeStamp,GantryFrom,GantryTo,gf_gt,WeightedAvgTravelTime,TotalTraffic,ds_prev_1_WATT,ds_prev_2_WATT,holiday_name,"));
        assert!(header.contains("holiday_name_春節,holiday_name_除夕,dayofweek"));

        let row = lines.next().unwrap();
        assert!(row.starts_with("2024-02-09 08:05:00,05F0287N,05F0153N,05F0287N-05F0153N,325,4,500,0,除夕,0,0,0,1,5,"));
        assert!(row.ends_with(",99999999,99999999,99999999,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0"));
    }

    #[test]
    fn test_forecast_layout_renames_and_drops_gantries() {
        let content = to_string(&sample_panel(), OutputFormat::Forecast);
        let header = content.lines().next().unwrap();
        assert!(header.starts_with("unique_id,ds,y,TotalTraffic,"));
        assert!(!header.contains("GantryFrom"));
        let row = content.lines().nth(1).unwrap();
        assert!(row.starts_with("05F0287N-05F0153N,2024-02-09 08:05:00,325,4,"));
    }

    #[test]
    fn test_write_panel_file_gzip() {
        let path = temp_path("hwttp_test_panel.csv.gz");
        let _ = fs::remove_file(&path);
        let panel = sample_panel();
        write_panel_file(&path, &panel, OutputFormat::Panel, true).unwrap();

        let mut decoded = String::new();
        GzDecoder::new(File::open(&path).unwrap())
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, to_string(&panel, OutputFormat::Panel));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_print_pretty_does_not_panic() {
        let summary = PanelSummary::default();
        print_pretty(&summary);
    }

    #[test]
    fn test_print_json_does_not_panic() {
        let summary = PanelSummary::default();
        print_json(&summary).unwrap();
    }

    #[test]
    fn test_append_summary_writes_header_once() {
        let path = temp_path("hwttp_test_summary_header.csv");
        let _ = fs::remove_file(&path);

        let summary = PanelSummary::default();
        append_summary(&path, &summary).unwrap();
        append_summary(&path, &summary).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let header_count = content.lines().filter(|l| l.contains("generated_at")).count();
        assert_eq!(header_count, 1);
        // 1 header + 2 data rows
        assert_eq!(content.lines().count(), 3);

        fs::remove_file(&path).unwrap();
    }
}
