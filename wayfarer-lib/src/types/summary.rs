use serde::{Deserialize, Serialize};

use crate::types::route::LegKind;

/// Driving route summary for one (base, destination) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrivingSummary {
    pub distance_meters: f64,
    pub duration_seconds: f64,
    /// Estimated taxi fare; the provider omits it outside fare-model areas
    pub taxi_cost_yuan: Option<f64>,
    /// Toll total; absent on toll-free routes
    pub tolls_yuan: Option<f64>,
    pub toll_distance_meters: Option<f64>,
}

/// Walking route summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalkingSummary {
    pub distance_meters: f64,
    pub duration_seconds: f64,
}

/// Cycling route summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CyclingSummary {
    pub distance_meters: f64,
    pub duration_seconds: f64,
}

/// One typed segment of a transit plan, for list display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitLeg {
    pub kind: LegKind,
    /// Short human label: line name, `Walk`, `Taxi`, ...
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_meters: Option<u64>,
}

/// One ranked transit plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitPlan {
    pub duration_seconds: f64,
    pub cost_yuan: Option<f64>,
    pub walking_distance_meters: Option<f64>,
    /// Legs joined with arrows, segments joined with pipes
    pub summary: String,
    pub has_taxi: bool,
    pub legs: Vec<TransitLeg>,
}

/// Transit routing summary: plans in provider ranking order, truncated
/// to the configured maximum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitSummary {
    pub plans: Vec<TransitPlan>,
}
