pub mod calendar;
pub mod config;
pub mod error;
pub mod fusion;
pub mod loader;
pub mod lookup;
pub mod mileage;
pub mod output;
pub mod panel;
pub mod pipeline;
pub mod records;
pub mod stats;
pub mod traveltime;
