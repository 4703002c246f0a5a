//! CLI entry point for the highway travel-time panel builder.
//!
//! Provides subcommands for building the enriched panel, inspecting the
//! resolved mileage table, running the aggregator alone and listing month
//! ranges for batch downloads.

use anyhow::Result;
use clap::{Parser, Subcommand};
use hwttp::calendar::month_ranges;
use hwttp::config::PipelineConfig;
use hwttp::loader::{SourceTables, read_records};
use hwttp::mileage::MileageTable;
use hwttp::output::{
    OutputFormat, append_summary, print_json, print_pretty, write_mileage_table,
    write_observations, write_panel_file,
};
use hwttp::pipeline::build_panel;
use hwttp::records::TravelTimeSample;
use hwttp::stats::PanelSummary;
use hwttp::traveltime::aggregate_travel_time;
use std::ffi::OsStr;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "hwttp")]
#[command(about = "Builds highway travel-time panels for forecasting", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the enriched panel from the source tables named in a config file
    Build {
        /// Pipeline config (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// CSV file to write the panel to
        #[arg(short, long, default_value = "panel.csv")]
        output: PathBuf,

        /// Column layout of the written panel
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Panel)]
        format: OutputFormat,

        /// Gzip compress the panel
        #[arg(long, default_value_t = false)]
        gzip: bool,

        /// Optional: CSV file to append the run summary to
        #[arg(long)]
        summary_log: Option<PathBuf>,
    },
    /// Write the resolved mileage table of the configured route direction
    Mileage {
        /// Pipeline config (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// CSV file to write to (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Collapse raw travel-time samples into one series per gantry pair
    Aggregate {
        /// Raw per-vehicle-class travel-time CSV
        #[arg(short, long)]
        input: PathBuf,

        /// CSV file to write to (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the first and last day of every month in a range
    MonthRanges {
        #[arg(long)]
        start_year: i32,
        #[arg(long)]
        start_month: u32,
        #[arg(long)]
        end_year: i32,
        #[arg(long)]
        end_month: u32,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/hwttp.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("hwttp.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            config,
            output,
            format,
            gzip,
            summary_log,
        } => {
            let config = PipelineConfig::load(&config)?;
            let tables = SourceTables::load(&config)?;
            let build = build_panel(&tables, &config)?;

            write_panel_file(&output, &build.panel, format, gzip)?;

            let summary = PanelSummary::from_build(&build);
            print_pretty(&summary);
            print_json(&summary)?;
            if let Some(path) = summary_log {
                append_summary(&path, &summary)?;
            }
        }
        Commands::Mileage { config, output } => {
            let config = PipelineConfig::load(&config)?;
            let tables = SourceTables::load(&config)?;
            let table = MileageTable::resolve(
                &tables.sections,
                &tables.gantries,
                &config.route_id,
                &config.direction,
            )?;
            info!(locations = table.len(), "Mileage table resolved");
            write_mileage_table(open_output(output.as_deref())?, &table)?;
        }
        Commands::Aggregate { input, output } => {
            let samples: Vec<TravelTimeSample> = read_records(&input, 0)?;
            let series = aggregate_travel_time(&samples);
            write_observations(open_output(output.as_deref())?, &series)?;
        }
        Commands::MonthRanges {
            start_year,
            start_month,
            end_year,
            end_month,
        } => {
            let mut stdout = std::io::stdout().lock();
            for (first, last) in month_ranges(start_year, start_month, end_year, end_month)? {
                writeln!(stdout, "{first} {last}")?;
            }
        }
    }

    Ok(())
}

/// Opens `path` for writing, or stdout when no path is given.
fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(std::io::stdout().lock()),
    })
}
