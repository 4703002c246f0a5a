//! Linear mileage coordinates for interchanges and toll gantries on one route direction.

use crate::error::PanelError;
use crate::lookup::mileage_override;
use crate::records::{GantryRecord, SectionRecord};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    Interchange,
    EtagGantry,
}

impl fmt::Display for LocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationKind::Interchange => f.write_str("interchange"),
            LocationKind::EtagGantry => f.write_str("etag_gantry"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Location {
    pub name: String,
    pub kind: LocationKind,
    pub route_id: String,
    pub direction: String,
    /// Meters from the start of the route.
    pub mileage: i64,
}

/// Locations of one route direction, sorted ascending by mileage.
#[derive(Debug, Clone)]
pub struct MileageTable {
    route_id: String,
    direction: String,
    locations: Vec<Location>,
}

/// Parses a `K<km>+<meters>` mileage string into meters.
pub fn parse_mileage(value: &str) -> Option<i64> {
    let (km, meters) = value.trim().strip_prefix('K')?.split_once('+')?;
    let is_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !is_digits(km) || !is_digits(meters) {
        return None;
    }
    Some(km.parse::<i64>().ok()? * 1000 + meters.parse::<i64>().ok()?)
}

// Route ids are published both zero-padded ("000050") and bare ("50").
fn same_route(a: &str, b: &str) -> bool {
    a.trim().trim_start_matches('0') == b.trim().trim_start_matches('0')
}

impl MileageTable {
    /// Builds the table for `route_id`/`direction` from section boundaries and gantries.
    ///
    /// Rows are deduplicated on exact match; an interchange and a gantry sharing a
    /// mileage are both kept.
    ///
    /// # Errors
    ///
    /// Returns [`PanelError::MileageParse`] for a malformed mileage string unless
    /// the location has a fixed override.
    pub fn resolve(
        sections: &[SectionRecord],
        gantries: &[GantryRecord],
        route_id: &str,
        direction: &str,
    ) -> Result<Self, PanelError> {
        let in_scope = |road_id: &str, road_direction: &str| {
            same_route(road_id, route_id) && road_direction.trim() == direction
        };
        let sections: Vec<&SectionRecord> = sections
            .iter()
            .filter(|s| in_scope(&s.road_id, &s.road_direction))
            .collect();

        let raw = sections
            .iter()
            .map(|s| (&s.section_start, &s.start_mileage, LocationKind::Interchange))
            .chain(
                sections
                    .iter()
                    .map(|s| (&s.section_end, &s.end_mileage, LocationKind::Interchange)),
            )
            .chain(
                gantries
                    .iter()
                    .filter(|g| in_scope(&g.road_id, &g.road_direction))
                    .map(|g| (&g.gantry_id, &g.location_mile, LocationKind::EtagGantry)),
            );

        let mut seen_raw = HashSet::new();
        let mut seen = HashSet::new();
        let mut locations = Vec::new();
        for (name, mileage, kind) in raw {
            if !seen_raw.insert((name.trim(), mileage.trim(), kind)) {
                continue;
            }
            let mileage = match mileage_override(name.trim()) {
                Some(corrected) => corrected,
                None => parse_mileage(mileage).ok_or_else(|| PanelError::MileageParse {
                    location: name.clone(),
                    value: mileage.clone(),
                })?,
            };
            let location = Location {
                name: name.trim().to_string(),
                kind,
                route_id: route_id.to_string(),
                direction: direction.to_string(),
                mileage,
            };
            if seen.insert(location.clone()) {
                locations.push(location);
            }
        }
        locations.sort_by_key(|l| l.mileage);

        debug!(
            route_id,
            direction,
            locations = locations.len(),
            "Resolved mileage table"
        );

        Ok(Self {
            route_id: route_id.to_string(),
            direction: direction.to_string(),
            locations,
        })
    }

    pub fn route_id(&self) -> &str {
        &self.route_id
    }

    pub fn direction(&self) -> &str {
        &self.direction
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Mileage of the lowest-mileage location named `name`.
    pub fn mileage_of(&self, name: &str) -> Option<i64> {
        self.locations
            .iter()
            .find(|l| l.name == name)
            .map(|l| l.mileage)
    }

    /// Mileages of both endpoints of a gantry pair.
    pub fn pair_mileage(&self, from: &str, to: &str) -> Result<(i64, i64), PanelError> {
        let lookup = |name: &str| {
            self.mileage_of(name)
                .ok_or_else(|| PanelError::UnknownLocation(name.to_string()))
        };
        Ok((lookup(from)?, lookup(to)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(dir: &str, start: &str, end: &str, start_mile: &str, end_mile: &str) -> SectionRecord {
        SectionRecord {
            road_id: "000050".to_string(),
            road_direction: dir.to_string(),
            section_start: start.to_string(),
            section_end: end.to_string(),
            start_mileage: start_mile.to_string(),
            end_mileage: end_mile.to_string(),
        }
    }

    fn gantry(id: &str, dir: &str, mile: &str) -> GantryRecord {
        GantryRecord {
            gantry_id: id.to_string(),
            road_id: "50".to_string(),
            road_direction: dir.to_string(),
            location_mile: mile.to_string(),
        }
    }

    #[test]
    fn test_parse_mileage_well_formed() {
        assert_eq!(parse_mileage("K41+200"), Some(41_200));
        assert_eq!(parse_mileage("K0+000"), Some(0));
        assert_eq!(parse_mileage("K5+5"), Some(5_005));
        assert_eq!(parse_mileage(" K28+700 "), Some(28_700));
    }

    #[test]
    fn test_parse_mileage_malformed() {
        assert_eq!(parse_mileage("41.2"), None);
        assert_eq!(parse_mileage("K41"), None);
        assert_eq!(parse_mileage("K41+2OO"), None);
        assert_eq!(parse_mileage("K-1+200"), None);
        assert_eq!(parse_mileage("K+200"), None);
    }

    #[test]
    fn test_resolve_sorted_and_deduplicated() {
        let sections = vec![
            section("N", "頭城交流道", "坪林交控交流道", "K30+000", "K15+000"),
            section("N", "坪林交控交流道", "南港系統交流道", "K15+000", "K0+000"),
            section("S", "南港系統交流道", "坪林交控交流道", "K0+000", "K15+000"),
        ];
        let gantries = vec![
            gantry("05F0153N", "N", "K15+300"),
            gantry("05F0153N", "N", "K15+300"),
            gantry("05F0055S", "S", "K5+500"),
        ];
        let table = MileageTable::resolve(&sections, &gantries, "000050", "N").unwrap();

        let names: Vec<_> = table.locations().iter().map(|l| l.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["南港系統交流道", "坪林交控交流道", "05F0153N", "頭城交流道"]
        );
        let mileages: Vec<_> = table.locations().iter().map(|l| l.mileage).collect();
        assert!(mileages.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(table.route_id(), "000050");
        assert_eq!(table.direction(), "N");
    }

    #[test]
    fn test_resolve_keeps_interchange_and_gantry_at_same_mileage() {
        let sections = vec![section("N", "A交流道", "B交流道", "K10+000", "K5+000")];
        let gantries = vec![gantry("G1", "N", "K10+000")];
        let table = MileageTable::resolve(&sections, &gantries, "000050", "N").unwrap();
        let at_10k: Vec<_> = table
            .locations()
            .iter()
            .filter(|l| l.mileage == 10_000)
            .map(|l| l.kind)
            .collect();
        assert_eq!(at_10k.len(), 2);
        assert!(at_10k.contains(&LocationKind::Interchange));
        assert!(at_10k.contains(&LocationKind::EtagGantry));
    }

    #[test]
    fn test_resolve_applies_override_for_malformed_entry() {
        let gantries = vec![gantry("05FR143N", "N", "K41+2OO"), gantry("G1", "N", "K1+000")];
        let table = MileageTable::resolve(&[], &gantries, "000050", "N").unwrap();
        assert_eq!(table.mileage_of("05FR143N"), Some(41_200));
        assert_eq!(table.locations().last().unwrap().name, "05FR143N");
    }

    #[test]
    fn test_resolve_fails_on_malformed_mileage() {
        let gantries = vec![gantry("G9", "N", "41.2km")];
        let err = MileageTable::resolve(&[], &gantries, "000050", "N").unwrap_err();
        assert!(matches!(err, PanelError::MileageParse { location, .. } if location == "G9"));
    }

    #[test]
    fn test_pair_mileage() {
        let gantries = vec![gantry("G1", "N", "K28+700"), gantry("G2", "N", "K15+300")];
        let table = MileageTable::resolve(&[], &gantries, "000050", "N").unwrap();
        assert_eq!(table.pair_mileage("G1", "G2").unwrap(), (28_700, 15_300));
        assert!(matches!(
            table.pair_mileage("G1", "G3"),
            Err(PanelError::UnknownLocation(name)) if name == "G3"
        ));
    }
}
