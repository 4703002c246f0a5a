//! Runs the whole alignment and fusion chain over loaded source tables.

use crate::config::PipelineConfig;
use crate::error::PanelError;
use crate::fusion::{fuse_accidents, fuse_congestion, fuse_holidays, fuse_road_build};
use crate::loader::SourceTables;
use crate::mileage::MileageTable;
use crate::panel::Panel;
use crate::traveltime::{aggregate_travel_time, attach_downstream_lags};
use tracing::info;

/// Output of one pipeline run.
#[derive(Debug, Clone)]
pub struct PanelBuild {
    pub mileage: MileageTable,
    pub panel: Panel,
}

/// raw tables -> mileage table -> segment series -> downstream lags -> event features
#[tracing::instrument(skip_all, fields(route_id = %config.route_id, direction = %config.direction))]
pub fn build_panel(tables: &SourceTables, config: &PipelineConfig) -> Result<PanelBuild, PanelError> {
    config.validate()?;
    let orientation = config.orientation()?;

    let mileage = MileageTable::resolve(
        &tables.sections,
        &tables.gantries,
        &config.route_id,
        &config.direction,
    )?;
    let series = aggregate_travel_time(&tables.samples);
    let lagged = attach_downstream_lags(&series, config.lag_count);
    let panel = Panel::from_lagged(lagged, config.lag_count);

    let panel = fuse_holidays(&panel, &tables.holidays);
    let panel = fuse_congestion(
        &panel,
        &tables.congestion_rules,
        &mileage,
        &config.direction,
        orientation,
    )?;
    let panel = fuse_road_build(
        &panel,
        &tables.road_build,
        &config.road_build_filter,
        &mileage,
        orientation,
        config.overlap_policy,
    );
    let panel = fuse_accidents(
        &panel,
        &tables.accidents,
        &config.accident_filter,
        &mileage,
        orientation,
        config.overlap_policy,
    )?;

    info!(
        rows = panel.len(),
        locations = mileage.len(),
        holiday_columns = panel.holiday_columns.len(),
        "Panel built"
    );
    Ok(PanelBuild { mileage, panel })
}
