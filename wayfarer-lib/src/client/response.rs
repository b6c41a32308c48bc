//! Typed views of AMap endpoint payloads.
//!
//! The provider's JSON is only loosely typed: numbers arrive as strings,
//! and absent fields show up as `""` or `[]` instead of being omitted.
//! Every field here is parsed totally — anything that doesn't match the
//! expected shape becomes `None` (or an empty list) instead of a
//! deserialization failure.

use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;

use crate::{ErrorKind, Result};

/// Decode a classified payload into its endpoint-specific shape
pub(crate) fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(ErrorKind::DecodeResponse)
}

/// String-ish field: accepts strings and numbers, maps `""`/`[]` to `None`
fn lenient_str<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Numeric field: accepts numbers and numeric strings
fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<f64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_f64().filter(|n| n.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    })
}

/// Nested object: any shape mismatch (typically `[]`) becomes `None`
fn lenient_opt<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Nested list: any shape mismatch becomes an empty list
fn lenient_vec<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

// --- geocode/regeo ---

#[derive(Debug, Deserialize)]
pub(crate) struct RegeoResponse {
    #[serde(default, deserialize_with = "lenient_opt")]
    pub regeocode: Option<Regeocode>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Regeocode {
    #[serde(default, deserialize_with = "lenient_str")]
    pub formatted_address: Option<String>,
    #[serde(rename = "addressComponent", default, deserialize_with = "lenient_opt")]
    pub address_component: Option<AddressComponent>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AddressComponent {
    #[serde(default, deserialize_with = "lenient_str")]
    pub citycode: Option<String>,
    #[serde(default, deserialize_with = "lenient_str")]
    pub adcode: Option<String>,
}

// --- place/text ---

#[derive(Debug, Deserialize)]
pub(crate) struct PoiSearchResponse {
    #[serde(default, deserialize_with = "lenient_vec")]
    pub pois: Vec<Poi>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Poi {
    #[serde(default, deserialize_with = "lenient_str")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_str")]
    pub address: Option<String>,
    /// Centroid of the POI
    #[serde(default, deserialize_with = "lenient_str")]
    pub location: Option<String>,
    /// Entrance/access point; preferred over the centroid for routing
    #[serde(default, deserialize_with = "lenient_str")]
    pub entr_location: Option<String>,
    #[serde(default, deserialize_with = "lenient_str")]
    pub citycode: Option<String>,
    #[serde(default, deserialize_with = "lenient_str")]
    pub adcode: Option<String>,
}

// --- geocode/geo ---

#[derive(Debug, Deserialize)]
pub(crate) struct GeocodeResponse {
    #[serde(default, deserialize_with = "lenient_vec")]
    pub geocodes: Vec<GeocodeEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GeocodeEntry {
    #[serde(default, deserialize_with = "lenient_str")]
    pub formatted_address: Option<String>,
    #[serde(default, deserialize_with = "lenient_str")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient_str")]
    pub citycode: Option<String>,
    #[serde(default, deserialize_with = "lenient_str")]
    pub adcode: Option<String>,
}

// --- direction/driving ---

#[derive(Debug, Deserialize)]
pub(crate) struct DrivingResponse {
    #[serde(default, deserialize_with = "lenient_opt")]
    pub route: Option<DriveRoute>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DriveRoute {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub taxi_cost: Option<f64>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub paths: Vec<DrivePath>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DrivePath {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub distance: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub duration: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub tolls: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub toll_distance: Option<f64>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub steps: Vec<DriveStep>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DriveStep {
    #[serde(default, deserialize_with = "lenient_str")]
    pub polyline: Option<String>,
    /// Traffic metering segments; may be absent outside covered areas
    #[serde(default, deserialize_with = "lenient_vec")]
    pub tmcs: Vec<Tmc>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Tmc {
    #[serde(default, deserialize_with = "lenient_str")]
    pub polyline: Option<String>,
    #[serde(default, deserialize_with = "lenient_str")]
    pub status: Option<String>,
}

// --- direction/walking and direction/bicycling ---

#[derive(Debug, Deserialize)]
pub(crate) struct SimpleStep {
    #[serde(default, deserialize_with = "lenient_str")]
    pub polyline: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SimplePath {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub distance: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub duration: Option<f64>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub steps: Vec<SimpleStep>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SimpleRouteBody {
    #[serde(default, deserialize_with = "lenient_vec")]
    pub paths: Vec<SimplePath>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WalkingResponse {
    #[serde(default, deserialize_with = "lenient_opt")]
    pub route: Option<SimpleRouteBody>,
}

/// The v4 bicycling envelope has moved twice; paths may live under
/// `data`, `route`, or at the top level depending on the deployment
#[derive(Debug, Deserialize)]
pub(crate) struct CyclingResponse {
    #[serde(default, deserialize_with = "lenient_opt")]
    pub data: Option<SimpleRouteBody>,
    #[serde(default, deserialize_with = "lenient_opt")]
    pub route: Option<SimpleRouteBody>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub paths: Vec<SimplePath>,
}

impl CyclingResponse {
    pub(crate) fn paths(&self) -> &[SimplePath] {
        if let Some(data) = &self.data {
            if !data.paths.is_empty() {
                return &data.paths;
            }
        }
        if let Some(route) = &self.route {
            if !route.paths.is_empty() {
                return &route.paths;
            }
        }
        &self.paths
    }
}

// --- direction/transit/integrated ---

#[derive(Debug, Deserialize)]
pub(crate) struct TransitResponse {
    #[serde(default, deserialize_with = "lenient_opt")]
    pub route: Option<TransitRoute>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TransitRoute {
    #[serde(default, deserialize_with = "lenient_vec")]
    pub transits: Vec<Transit>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Transit {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub duration: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub cost: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub walking_distance: Option<f64>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub segments: Vec<TransitSegment>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TransitSegment {
    #[serde(default, deserialize_with = "lenient_opt")]
    pub walking: Option<SegmentWalking>,
    #[serde(default, deserialize_with = "lenient_opt")]
    pub bus: Option<SegmentBus>,
    #[serde(default, deserialize_with = "lenient_opt")]
    pub railway: Option<SegmentRailway>,
    #[serde(default, deserialize_with = "lenient_opt")]
    pub taxi: Option<SegmentTaxi>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SegmentWalking {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub distance: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub duration: Option<f64>,
    #[serde(default, deserialize_with = "lenient_str")]
    pub origin: Option<String>,
    #[serde(default, deserialize_with = "lenient_str")]
    pub destination: Option<String>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub steps: Vec<SimpleStep>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SegmentBus {
    #[serde(default, deserialize_with = "lenient_vec")]
    pub buslines: Vec<Busline>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Busline {
    #[serde(default, deserialize_with = "lenient_str")]
    pub name: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "lenient_str")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub via_num: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub distance: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub duration: Option<f64>,
    #[serde(default, deserialize_with = "lenient_str")]
    pub polyline: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt")]
    pub departure_stop: Option<BusStop>,
    #[serde(default, deserialize_with = "lenient_opt")]
    pub arrival_stop: Option<BusStop>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BusStop {
    #[serde(default, deserialize_with = "lenient_str")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_str")]
    pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SegmentRailway {
    #[serde(default, deserialize_with = "lenient_str")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub distance: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub duration: Option<f64>,
    #[serde(default, deserialize_with = "lenient_str")]
    pub polyline: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt")]
    pub trip: Option<RailwayTrip>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RailwayTrip {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub distance: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub duration: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SegmentTaxi {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub distance: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub duration: Option<f64>,
    #[serde(default, deserialize_with = "lenient_str")]
    pub polyline: Option<String>,
}

impl SegmentTaxi {
    /// The provider sends `{}` where there is no taxi leg
    pub(crate) fn is_present(&self) -> bool {
        self.distance.is_some() || self.duration.is_some() || self.polyline.is_some()
    }
}
