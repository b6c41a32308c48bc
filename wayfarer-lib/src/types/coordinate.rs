use std::fmt::{self, Display};
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{ErrorKind, Result};

/// Strict `lng,lat` pattern for user-supplied coordinate text.
///
/// Deliberately narrower than [`Coordinate::parse_loose`]: free text is
/// only treated as a coordinate when it is nothing but two decimal
/// numbers separated by a comma.
static LNG_LAT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(-?\d+(?:\.\d+)?)\s*,\s*(-?\d+(?:\.\d+)?)$").expect("coordinate regex")
});

/// A WGS/GCJ longitude-latitude pair.
///
/// Valid iff both components are finite, `|lng| <= 180` and `|lat| <= 90`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Longitude in degrees
    pub lng: f64,
    /// Latitude in degrees
    pub lat: f64,
}

impl Coordinate {
    /// Create a coordinate, failing on out-of-range or non-finite input
    pub fn new(lng: f64, lat: f64) -> Result<Self> {
        let coord = Self { lng, lat };
        if coord.is_valid() {
            Ok(coord)
        } else {
            Err(ErrorKind::InvalidCoordinate(format!("{lng},{lat}")))
        }
    }

    /// Whether both components are finite and within range
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lng.is_finite()
            && self.lat.is_finite()
            && self.lng.abs() <= 180.0
            && self.lat.abs() <= 90.0
    }

    /// Parse strict user-facing coordinate text (`"116.4,39.9"`).
    ///
    /// Returns `None` for anything that is not exactly a coordinate pair,
    /// including pairs that are out of range.
    #[must_use]
    pub fn from_text(text: &str) -> Option<Self> {
        let caps = LNG_LAT.captures(text.trim())?;
        let lng: f64 = caps[1].parse().ok()?;
        let lat: f64 = caps[2].parse().ok()?;
        Self::new(lng, lat).ok()
    }

    /// Parse a provider location field.
    ///
    /// AMap location fields may carry multiple points separated by `;` or
    /// `|`; only the first is meaningful here. Falls back to a plain
    /// comma split for values the strict pattern rejects (e.g. scientific
    /// notation).
    #[must_use]
    pub fn parse_loose(text: &str) -> Option<Self> {
        let raw = text.trim();
        if raw.is_empty() {
            return None;
        }
        let first = raw.split([';', '|']).next()?.trim();
        if let Some(coord) = Self::from_text(first) {
            return Some(coord);
        }
        let mut parts = first.split(',');
        let lng: f64 = parts.next()?.trim().parse().ok()?;
        let lat: f64 = parts.next()?.trim().parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Self::new(lng, lat).ok()
    }

    /// Stable dedup key: both components rounded to six decimals
    #[must_use]
    pub fn rounded_key(&self) -> String {
        format!("{:.6},{:.6}", self.lng, self.lat)
    }
}

impl Display for Coordinate {
    /// Formats as `lng,lat`, the form AMap expects in query parameters
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lng, self.lat)
    }
}

impl FromStr for Coordinate {
    type Err = ErrorKind;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_text(s).ok_or_else(|| ErrorKind::InvalidCoordinate(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::Coordinate;

    #[test]
    fn test_from_text() {
        let coord = Coordinate::from_text("116.4,39.9").unwrap();
        assert_eq!(coord.lng, 116.4);
        assert_eq!(coord.lat, 39.9);

        assert!(Coordinate::from_text(" -73.99 , 40.73 ").is_some());
        assert!(Coordinate::from_text("Beijing West Station").is_none());
        assert!(Coordinate::from_text("116.4").is_none());
        assert!(Coordinate::from_text("116.4,39.9,10").is_none());
        // out of range
        assert!(Coordinate::from_text("181,39.9").is_none());
        assert!(Coordinate::from_text("116.4,91").is_none());
    }

    #[test]
    fn test_parse_loose_multi_point() {
        // entrance fields sometimes hold several points
        let coord = Coordinate::parse_loose("116.4,39.9;116.5,39.8").unwrap();
        assert_eq!(coord, Coordinate { lng: 116.4, lat: 39.9 });
        let coord = Coordinate::parse_loose("116.4,39.9|116.5,39.8").unwrap();
        assert_eq!(coord.lng, 116.4);
        assert!(Coordinate::parse_loose("").is_none());
        assert!(Coordinate::parse_loose("x,y").is_none());
    }

    #[test]
    fn test_display_round_trip() {
        let coord = Coordinate { lng: 116.4, lat: 39.9 };
        assert_eq!(coord.to_string(), "116.4,39.9");
        assert_eq!("116.4,39.9".parse::<Coordinate>().unwrap(), coord);
    }

    #[test]
    fn test_rounded_key() {
        let a = Coordinate { lng: 116.400_000_4, lat: 39.9 };
        let b = Coordinate { lng: 116.400_000_3, lat: 39.9 };
        assert_eq!(a.rounded_key(), b.rounded_key());
    }
}
