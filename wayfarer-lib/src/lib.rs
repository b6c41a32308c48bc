//! `wayfarer-lib` compares candidate "base" locations (hotels) against
//! destination points by travel time, distance, and cost across
//! driving, walking, cycling, and transit, using the AMap REST API.
//!
//! The heart of the crate is a thin, heavily-throttled orchestration
//! layer: a process-wide [`ratelimit::RateLimiter`] paces every
//! provider request, a per-batch [`ratelimit::ConcurrencyLimiter`]
//! bounds fan-out width, and [`compare::compute_comparisons`] turns
//! N×M place pairs into bounded concurrent work where every cell fails
//! independently.
//!
//! ```no_run
//! use wayfarer_lib::places::{self, PlaceQuery};
//! use wayfarer_lib::{ClientBuilder, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = ClientBuilder::builder().build().client()?;
//!     let place =
//!         places::resolve_place(&client, "Beijing West Railway Station", &PlaceQuery::default())
//!             .await?;
//!     println!("{} is at {}", place.name, place.location);
//!     Ok(())
//! }
//! ```

mod client;
mod types;

pub mod compare;
pub mod directions;
pub mod places;
pub mod ratelimit;

#[cfg(test)]
mod test_utils;

pub use client::{
    ApiBase, ClientBuilder, ProviderClient, ProviderErrorInfo, ResponseClassifier, API_BASE_V3,
    API_BASE_V4, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_WAIT_TIME_MS, DEFAULT_TIMEOUT_SECS,
};
pub use types::*;
