//! Per-segment travel-time series.
//!
//! Raw per-vehicle-class samples are collapsed into one traffic-weighted
//! series per gantry pair, then each segment is enriched with lagged copies
//! of its downstream neighbour's series.

pub mod aggregate;
pub mod downstream;

pub use aggregate::{SegmentObservation, aggregate_travel_time, segment_key, weighted_average};
pub use downstream::{DEFAULT_LAG_COUNT, LaggedObservation, attach_downstream_lags, lag_column_name};
