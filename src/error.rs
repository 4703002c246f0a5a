//! Errors raised by the alignment and fusion core.

#[derive(thiserror::Error, Debug)]
pub enum PanelError {
    #[error("malformed mileage '{value}' for location '{location}', expected K<km>+<meters>")]
    MileageParse { location: String, value: String },
    #[error("failed to parse timestamp '{0}'")]
    TimestampParse(String),
    #[error("failed to parse date '{0}'")]
    DateParse(String),
    #[error("invalid accident datetime {year}-{month}-{day} {hour}:{minute}")]
    AccidentDateTime {
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
    },
    #[error("accident handling time of {minutes} minutes overflows the accident window")]
    HandlingDuration { minutes: i64 },
    #[error("accident at {0} has no mileage")]
    MissingAccidentMileage(String),
    #[error("unknown day class '{0}', expected weekday, Saturday or Sunday")]
    UnknownDayClass(String),
    #[error("congestion location '{0}' has no entry in the name substitution table")]
    UnknownCongestionLocation(String),
    #[error("location '{0}' is not present in the mileage table")]
    UnknownLocation(String),
    #[error("unknown accident type code '{0}'")]
    UnknownAccidentType(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
