use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::types::comparison::TravelMode;
use crate::types::Coordinate;

/// Kind of a route segment or transit leg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LegKind {
    Driving,
    Walking,
    Cycling,
    Taxi,
    Bus,
    Subway,
    Railway,
}

/// Congestion level of a driving segment, from the provider's TMC data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TrafficStatus {
    Smooth,
    Slow,
    Jam,
    Serious,
}

impl TrafficStatus {
    /// Normalize the provider's free-text status.
    ///
    /// AMap reports these in Chinese; anything unrecognized (including an
    /// empty field) is treated as smooth, matching how the map legend
    /// degrades.
    #[must_use]
    pub fn from_provider(status: &str) -> Self {
        let value = status.trim();
        if value.contains("严重") {
            Self::Serious
        } else if value.contains("拥堵") {
            Self::Jam
        } else if value.contains("缓行") {
            Self::Slow
        } else {
            Self::Smooth
        }
    }
}

/// A boarding or alighting point of a transit leg
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStop {
    pub name: Option<String>,
    pub location: Option<Coordinate>,
}

/// One drawable segment of a route: a polyline plus display metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSegment {
    pub kind: LegKind,
    /// Short human label: line name, `Walk`, `Taxi`, ...
    pub label: String,
    pub path: Vec<Coordinate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    /// Only set on driving segments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traffic_status: Option<TrafficStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<RouteStop>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<RouteStop>,
}

impl RouteSegment {
    /// A bare segment with no duration, traffic, or stops attached
    #[must_use]
    pub const fn new(kind: LegKind, label: String, path: Vec<Coordinate>) -> Self {
        Self {
            kind,
            label,
            path,
            duration_seconds: None,
            traffic_status: None,
            from: None,
            to: None,
        }
    }
}

/// Drawable route for one mode between one origin/destination pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePath {
    pub mode: TravelMode,
    /// Which transit plan the segments belong to; `None` for other modes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taxi_cost_yuan: Option<f64>,
    pub segments: Vec<RouteSegment>,
}

#[cfg(test)]
mod tests {
    use super::TrafficStatus;

    #[test]
    fn test_traffic_status_normalization() {
        assert_eq!(TrafficStatus::from_provider("畅通"), TrafficStatus::Smooth);
        assert_eq!(TrafficStatus::from_provider("缓行"), TrafficStatus::Slow);
        assert_eq!(TrafficStatus::from_provider("拥堵"), TrafficStatus::Jam);
        assert_eq!(
            TrafficStatus::from_provider("严重拥堵"),
            TrafficStatus::Serious
        );
        assert_eq!(TrafficStatus::from_provider(""), TrafficStatus::Smooth);
        assert_eq!(TrafficStatus::from_provider("unknown"), TrafficStatus::Smooth);
    }
}
