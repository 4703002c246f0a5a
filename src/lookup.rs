//! Fixed lookup tables shared by the resolver and the fusion stages.
//!
//! These are constant for the whole run and never mutated.

use crate::error::PanelError;

/// Locations whose published mileage string is malformed, with the corrected
/// mileage in meters.
static MILEAGE_OVERRIDES: &[(&str, i64)] = &[("05FR143N", 41_200)];

/// Short location names used by the congestion table, mapped to the names
/// used by the route-section table.
static LOCATION_NAME_SUBSTITUTIONS: &[(&str, &str)] = &[
    ("南港系統", "南港系統交流道"),
    ("坪林", "坪林交控交流道"),
    ("頭城", "頭城交流道"),
    ("宜蘭", "宜蘭交流道"),
    ("羅東", "羅東交流道"),
];

/// Accident severity classes, encoded so that a larger value is more severe.
static ACCIDENT_TYPE_CODES: &[(&str, u8)] = &[("A0", 0), ("A3", 1), ("A2", 2), ("A1", 3)];

/// Vehicle-type tokens counted in the free-text vehicle list of an accident:
/// light truck, passenger car, bus, heavy truck.
pub static VEHICLE_TOKENS: [&str; 4] = ["小貨車", "小客車", "大客車", "大貨車"];

pub fn mileage_override(location: &str) -> Option<i64> {
    MILEAGE_OVERRIDES
        .iter()
        .find(|(name, _)| *name == location)
        .map(|(_, mileage)| *mileage)
}

/// Translates a congestion-table location name into its route-section name.
///
/// # Errors
///
/// Returns [`PanelError::UnknownCongestionLocation`] when the name has no
/// substitution entry.
pub fn substitute_location_name(short_name: &str) -> Result<&'static str, PanelError> {
    LOCATION_NAME_SUBSTITUTIONS
        .iter()
        .find(|(short, _)| *short == short_name.trim())
        .map(|(_, full)| *full)
        .ok_or_else(|| PanelError::UnknownCongestionLocation(short_name.to_string()))
}

/// Encodes an accident type, treating a missing or blank code as `A0`.
pub fn accident_type_code(code: Option<&str>) -> Result<u8, PanelError> {
    let code = code.map(str::trim).filter(|c| !c.is_empty()).unwrap_or("A0");
    ACCIDENT_TYPE_CODES
        .iter()
        .find(|(name, _)| *name == code)
        .map(|(_, value)| *value)
        .ok_or_else(|| PanelError::UnknownAccidentType(code.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mileage_override_known_and_unknown() {
        assert_eq!(mileage_override("05FR143N"), Some(41_200));
        assert_eq!(mileage_override("05F0287N"), None);
    }

    #[test]
    fn test_substitute_location_name() {
        assert_eq!(substitute_location_name("坪林").unwrap(), "坪林交控交流道");
        assert_eq!(substitute_location_name(" 頭城 ").unwrap(), "頭城交流道");
    }

    #[test]
    fn test_substitute_unknown_location_fails() {
        let err = substitute_location_name("基隆").unwrap_err();
        assert!(matches!(err, PanelError::UnknownCongestionLocation(name) if name == "基隆"));
    }

    #[test]
    fn test_accident_type_code_ordering() {
        assert_eq!(accident_type_code(None).unwrap(), 0);
        assert_eq!(accident_type_code(Some("")).unwrap(), 0);
        assert_eq!(accident_type_code(Some("A3")).unwrap(), 1);
        assert_eq!(accident_type_code(Some("A2")).unwrap(), 2);
        assert_eq!(accident_type_code(Some("A1")).unwrap(), 3);
        assert!(accident_type_code(Some("B9")).is_err());
    }
}
