use serde::{Deserialize, Serialize};

use crate::error::CoordinateError;

/// A validated latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    lat: f64,
    lon: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    lat: f64,
    lon: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = CoordinateError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Coordinate::new(raw.lat, raw.lon)
    }
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Result<Self, CoordinateError> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(CoordinateError::Latitude(lat));
        }
        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            return Err(CoordinateError::Longitude(lon));
        }
        Ok(Self { lat, lon })
    }

    // Only for literals known to be in range.
    const fn fixed(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.lat, self.lon)
    }
}

pub const LONDON: Coordinate = Coordinate::fixed(51.5074, -0.1278);
pub const NEW_YORK: Coordinate = Coordinate::fixed(40.7128, -74.0060);
pub const TOKYO: Coordinate = Coordinate::fixed(35.6762, 139.6503);
pub const SYDNEY: Coordinate = Coordinate::fixed(-33.8688, 151.2093);

/// A named coordinate offered for quick selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetLocation {
    pub name: String,
    #[serde(flatten)]
    pub coordinate: Coordinate,
}

impl PresetLocation {
    pub fn new(name: impl Into<String>, coordinate: Coordinate) -> Self {
        Self { name: name.into(), coordinate }
    }
}

pub fn builtin_presets() -> Vec<PresetLocation> {
    vec![
        PresetLocation::new("London", LONDON),
        PresetLocation::new("New York", NEW_YORK),
        PresetLocation::new("Tokyo", TOKYO),
        PresetLocation::new("Sydney", SYDNEY),
    ]
}

/// Case-insensitive lookup by preset name.
pub fn find_preset<'a>(presets: &'a [PresetLocation], name: &str) -> Option<&'a PresetLocation> {
    let wanted = name.trim();
    presets.iter().find(|p| p.name.eq_ignore_ascii_case(wanted))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range() {
        assert_eq!(Coordinate::new(90.5, 0.0), Err(CoordinateError::Latitude(90.5)));
        assert_eq!(Coordinate::new(0.0, -180.1), Err(CoordinateError::Longitude(-180.1)));
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
        assert!(Coordinate::new(-90.0, 180.0).is_ok());
    }

    #[test]
    fn builtin_presets_are_valid() {
        for preset in builtin_presets() {
            let c = preset.coordinate;
            assert!(Coordinate::new(c.lat(), c.lon()).is_ok(), "{} out of range", preset.name);
        }
    }

    #[test]
    fn find_preset_ignores_case() {
        let presets = builtin_presets();
        let found = find_preset(&presets, "new york").expect("preset should exist");
        assert_eq!(found.coordinate, NEW_YORK);
        assert!(find_preset(&presets, "Atlantis").is_none());
    }

    #[test]
    fn deserialize_validates() {
        let ok: PresetLocation = toml::from_str("name = \"Paris\"\nlat = 48.8566\nlon = 2.3522").unwrap();
        assert_eq!(ok.coordinate.lat(), 48.8566);

        let bad = toml::from_str::<PresetLocation>("name = \"Nowhere\"\nlat = 123.0\nlon = 0.0");
        assert!(bad.is_err());
    }
}
