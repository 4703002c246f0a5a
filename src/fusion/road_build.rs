use super::{MatchAudit, TravelOrientation, segment_spans};
use crate::config::{OverlapPolicy, RoadBuildFilter};
use crate::mileage::MileageTable;
use crate::panel::{Panel, RoadBuildFeatures};
use crate::records::RoadBuildIncident;
use tracing::{debug, warn};

/// Expected length of the lane blockage bitstring.
pub const BLOCKAGE_PATTERN_LEN: usize = 14;

/// Counts blocked lanes in a blockage bitstring.
///
/// Returns `(total, road)`: every `'1'` in the first 14 characters, and the
/// `'1'`s in positions 1 through 9. Positions beyond the string are unblocked.
pub fn blockage_counts(pattern: &str) -> (u32, u32) {
    let bits: Vec<char> = pattern.trim().chars().take(BLOCKAGE_PATTERN_LEN).collect();
    let count = |slice: &[char]| slice.iter().filter(|c| **c == '1').count() as u32;
    let road_end = bits.len().min(10);
    let road = if road_end > 1 { count(&bits[1..road_end]) } else { 0 };
    (count(&bits), road)
}

impl RoadBuildFeatures {
    fn from_incident(incident: &RoadBuildIncident) -> Self {
        let (total_block_count, road_block_count) = blockage_counts(&incident.blockage_pattern);
        RoadBuildFeatures {
            road_build: 1,
            total_block_count,
            road_block_count,
        }
    }
}

fn replaces(policy: OverlapPolicy, current: &RoadBuildFeatures, candidate: &RoadBuildFeatures) -> bool {
    match policy {
        OverlapPolicy::LastWriteWins => true,
        OverlapPolicy::MostSevere => {
            current.road_build == 0 || candidate.total_block_count >= current.total_block_count
        }
    }
}

/// Attaches construction incidents to the rows they cover in time and mileage.
///
/// Incidents are applied in table order. A row covered by several incidents is
/// resolved by `policy`: the last one wins by default, or the one blocking the
/// most lanes under [`OverlapPolicy::MostSevere`]. Each step stands on its own:
/// steps sharing an incident id do not replace each other's rows. A step
/// without an end time or a mileage never matches.
#[tracing::instrument(skip_all, fields(rows = panel.len(), incidents = incidents.len()))]
pub fn fuse_road_build(
    panel: &Panel,
    incidents: &[RoadBuildIncident],
    filter: &RoadBuildFilter,
    mileage: &MileageTable,
    orientation: TravelOrientation,
    policy: OverlapPolicy,
) -> Panel {
    let selected: Vec<&RoadBuildIncident> = incidents
        .iter()
        .filter(|i| i.freeway_id == filter.freeway_id && i.direction_code == filter.direction_code)
        .collect();
    debug!(selected = selected.len(), "Filtered construction incidents");

    let open_ended = selected.iter().filter(|i| i.end_time.is_none()).count();
    if open_ended > 0 {
        warn!(open_ended, "Construction incidents without an end time are ignored");
    }
    let unplaced = selected
        .iter()
        .filter(|i| i.start_mileage.is_none() || i.end_mileage.is_none())
        .count();
    if unplaced > 0 {
        warn!(unplaced, "Construction incidents without a mileage are ignored");
    }

    let spans = segment_spans(&panel.rows, mileage);
    let mut audit = MatchAudit::new(panel.len());
    let mut output = panel.clone();
    for incident in selected {
        let (Some(end_time), Some(start_mileage), Some(end_mileage)) =
            (incident.end_time, incident.start_mileage, incident.end_mileage)
        else {
            continue;
        };
        let features = RoadBuildFeatures::from_incident(incident);
        let mut hit = false;
        for (i, row) in output.rows.iter_mut().enumerate() {
            let Some(span) = spans[i] else { continue };
            let ts = row.observation.timestamp;
            if ts < incident.start_time || ts > end_time {
                continue;
            }
            if !orientation.overlaps(span, start_mileage, end_mileage) {
                continue;
            }
            audit.record(i);
            hit = true;
            if replaces(policy, &row.road_build, &features) {
                row.road_build = features;
            }
        }
        if hit {
            audit.record_event();
        }
    }
    audit.log("road_build");
    output
}
