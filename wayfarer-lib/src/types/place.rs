use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::types::Coordinate;
use crate::{ErrorKind, Result};

/// How a [`ResolvedPlace`] was produced.
///
/// Preserved through recompute flows so clients can resubmit previously
/// resolved places without losing provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PlaceSource {
    /// The input text was itself a literal coordinate pair
    Coord,
    /// Matched through POI text search
    Poi,
    /// Matched through address geocoding
    #[default]
    Geocode,
}

/// A place resolved from free text (or a literal coordinate) to a
/// routable location.
///
/// Field names follow the wire contract: `citycode`/`adcode` are the
/// provider's city and administrative district codes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPlace {
    /// The text the user originally entered
    pub input: String,
    /// Display name (POI name, formatted address, or the raw coordinate)
    pub name: String,
    /// Formatted address, when the provider supplied one
    pub address: Option<String>,
    /// Routable location, always a valid [`Coordinate`]
    pub location: Coordinate,
    /// Provider city code, used as a transit routing hint
    pub citycode: Option<String>,
    /// Provider administrative district code
    pub adcode: Option<String>,
    /// Provenance of the resolution
    #[serde(default, deserialize_with = "lenient_source")]
    pub source: PlaceSource,
}

/// Resubmitted places may carry a stale or foreign `source` value;
/// anything unrecognized degrades to `geocode` instead of failing
fn lenient_source<'de, D>(deserializer: D) -> std::result::Result<PlaceSource, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

impl ResolvedPlace {
    /// Validate a resubmitted place (recompute flow).
    ///
    /// Serde accepts any pair of floats for `location`; routing does not.
    pub fn validate(&self, kind: &str, idx: usize) -> Result<()> {
        if self.location.is_valid() {
            Ok(())
        } else {
            Err(ErrorKind::InvalidCoordinate(format!(
                "{kind}[{idx}]: {},{}",
                self.location.lng, self.location.lat
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PlaceSource, ResolvedPlace};
    use crate::types::Coordinate;

    #[test]
    fn test_source_serde_round_trip() {
        let json = serde_json::to_string(&PlaceSource::Poi).unwrap();
        assert_eq!(json, "\"poi\"");
        let source: PlaceSource = serde_json::from_str("\"coord\"").unwrap();
        assert_eq!(source, PlaceSource::Coord);
    }

    #[test]
    fn test_missing_source_defaults_to_geocode() {
        let place: ResolvedPlace = serde_json::from_str(
            r#"{
                "input": "somewhere",
                "name": "Somewhere",
                "address": null,
                "location": {"lng": 116.4, "lat": 39.9},
                "citycode": "010",
                "adcode": null
            }"#,
        )
        .unwrap();
        assert_eq!(place.source, PlaceSource::Geocode);
        assert!(place.validate("bases", 0).is_ok());
    }

    #[test]
    fn test_unknown_source_coerced_to_geocode() {
        let place: ResolvedPlace = serde_json::from_str(
            r#"{
                "input": "x",
                "name": "x",
                "address": null,
                "location": {"lng": 116.4, "lat": 39.9},
                "citycode": null,
                "adcode": null,
                "source": "crystal-ball"
            }"#,
        )
        .unwrap();
        assert_eq!(place.source, PlaceSource::Geocode);
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let place = ResolvedPlace {
            input: "x".into(),
            name: "x".into(),
            address: None,
            location: Coordinate { lng: 190.0, lat: 0.0 },
            citycode: None,
            adcode: None,
            source: PlaceSource::Coord,
        };
        assert!(place.validate("destinations", 2).is_err());
    }
}
