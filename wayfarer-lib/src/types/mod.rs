//! Core value types shared across the library

mod comparison;
mod coordinate;
mod error;
mod place;
mod route;
mod summary;

pub use comparison::{Comparison, TravelMode};
pub use coordinate::Coordinate;
pub use error::{ErrorKind, Result};
pub use place::{PlaceSource, ResolvedPlace};
pub use route::{LegKind, RoutePath, RouteSegment, RouteStop, TrafficStatus};
pub use summary::{
    CyclingSummary, DrivingSummary, TransitLeg, TransitPlan, TransitSummary, WalkingSummary,
};
