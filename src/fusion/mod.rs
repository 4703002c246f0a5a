//! Event fusion: overlays holidays, recurring congestion windows, road
//! construction and accidents onto the panel.
//!
//! Each stage borrows the panel and returns a new one with its own feature
//! group filled in. Stages touch disjoint fields, so their order does not
//! matter. Matching is a full scan of every event against every row.

pub mod accident;
pub mod congestion;
pub mod holiday;
pub mod road_build;

pub use accident::fuse_accidents;
pub use congestion::fuse_congestion;
pub use holiday::fuse_holidays;
pub use road_build::fuse_road_build;

use crate::error::PanelError;
use crate::mileage::MileageTable;
use crate::panel::PanelRow;
use tracing::{info, warn};

/// Mileage endpoints of a segment row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentSpan {
    pub from_mileage: f64,
    pub to_mileage: f64,
}

/// Whether mileage decreases or increases along the direction of travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TravelOrientation {
    Descending,
    Ascending,
}

impl TravelOrientation {
    pub fn for_direction(direction: &str) -> Result<Self, PanelError> {
        match direction.trim() {
            "N" | "W" => Ok(TravelOrientation::Descending),
            "S" | "E" => Ok(TravelOrientation::Ascending),
            other => Err(PanelError::InvalidConfig(format!(
                "unknown route direction '{other}'"
            ))),
        }
    }

    /// Tests a segment against an event span whose `start` is the upstream end.
    ///
    /// Descending: `from >= end && start >= to`. Ascending mirrors both inequalities.
    pub fn overlaps(self, segment: SegmentSpan, start: f64, end: f64) -> bool {
        match self {
            TravelOrientation::Descending => {
                segment.from_mileage >= end && start >= segment.to_mileage
            }
            TravelOrientation::Ascending => {
                segment.from_mileage <= end && start <= segment.to_mileage
            }
        }
    }
}

/// Looks up both endpoint mileages of every row. Rows whose gantries are not in
/// the table get `None` and never match a mileage predicate.
pub fn segment_spans(rows: &[PanelRow], mileage: &MileageTable) -> Vec<Option<SegmentSpan>> {
    let spans: Vec<Option<SegmentSpan>> = rows
        .iter()
        .map(|row| {
            mileage
                .pair_mileage(&row.observation.gantry_from, &row.observation.gantry_to)
                .ok()
                .map(|(from, to)| SegmentSpan {
                    from_mileage: from as f64,
                    to_mileage: to as f64,
                })
        })
        .collect();

    let unresolved = spans.iter().filter(|s| s.is_none()).count();
    if unresolved > 0 {
        warn!(
            unresolved,
            "Rows with a gantry missing from the mileage table are never matched by location"
        );
    }
    spans
}

/// Per-row match tallies for one event stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchAudit {
    hits: Vec<u32>,
    events_matched: usize,
}

impl MatchAudit {
    pub fn new(rows: usize) -> Self {
        Self {
            hits: vec![0; rows],
            events_matched: 0,
        }
    }

    pub fn record(&mut self, row: usize) {
        self.hits[row] += 1;
    }

    /// Marks that one event matched at least one row.
    pub fn record_event(&mut self) {
        self.events_matched += 1;
    }

    pub fn hit_count(&self, row: usize) -> u32 {
        self.hits[row]
    }

    pub fn matched_rows(&self) -> usize {
        self.hits.iter().filter(|h| **h > 0).count()
    }

    /// Rows matched by more than one event.
    pub fn duplicate_rows(&self) -> usize {
        self.hits.iter().filter(|h| **h > 1).count()
    }

    pub fn events_matched(&self) -> usize {
        self.events_matched
    }

    pub fn log(&self, stage: &str) {
        let duplicate_rows = self.duplicate_rows();
        info!(
            stage,
            matched_rows = self.matched_rows(),
            duplicate_rows,
            events_matched = self.events_matched,
            "Event fusion complete"
        );
        if duplicate_rows > 0 {
            warn!(
                stage,
                duplicate_rows, "Rows matched by several events, resolved by overlap policy"
            );
        }
    }
}
