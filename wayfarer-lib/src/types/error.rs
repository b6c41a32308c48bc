use std::time::Duration;

use http::StatusCode;
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::types::comparison::TravelMode;

/// Possible errors when interacting with `wayfarer_lib`
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// No AMap key could be resolved from the per-call override, the
    /// client configuration, or the environment
    #[error("Missing AMap key: set AMAP_WEB_KEY or AMAP_KEY, or pass a key explicitly")]
    MissingCredential,

    /// The rate limiter queue is full and the operation could not start
    /// immediately
    #[error("Request overload: rate limiter queue is full ({0})")]
    Overloaded(usize),

    /// A concurrency limiter was closed while operations were waiting on it
    #[error("Concurrency limiter closed while waiting for a slot")]
    LimiterClosed,

    /// Reqwest network error while talking to the provider
    #[error("Network error while requesting the AMap API")]
    NetworkRequest(#[source] reqwest::Error),

    /// The provider did not answer within the configured timeout
    #[error("AMap request timed out after {0:?}")]
    Timeout(Duration),

    /// The provider answered with a non-2xx HTTP status
    #[error("AMap request failed: {0}")]
    RejectedStatusCode(StatusCode),

    /// The provider response body could not be read or decoded as JSON
    #[error("Failed to read AMap response body")]
    ReadResponseBody(#[source] reqwest::Error),

    /// The provider returned a well-formed response with an unexpected shape
    #[error("Unexpected AMap response shape")]
    DecodeResponse(#[source] serde_json::Error),

    /// The provider returned an error payload that is not a rate limit
    #[error("AMap returned an error: {info} ({code})")]
    Provider {
        /// Human-readable provider message
        info: String,
        /// Machine error code
        code: String,
    },

    /// Every retry of a rate-limited request was itself rate-limited
    #[error("AMap request failed: retries exhausted after {0} attempts")]
    RetriesExhausted(u64),

    /// A coordinate is out of range, non-finite, or unparsable
    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    /// Neither POI search nor geocoding produced a usable location
    #[error("No place found for {0:?}")]
    PlaceNotFound(String),

    /// The provider returned an empty route set for the given mode
    #[error("No {0} route found")]
    NoRoute(TravelMode),

    /// A restricted-recompute index does not address an existing row/column
    #[error("{kind} index {index} is out of range (0..{len})")]
    IndexOutOfRange {
        /// Which index set was addressed, e.g. `base` or `destination`
        kind: &'static str,
        /// The offending index
        index: usize,
        /// Number of entries in the addressed set
        len: usize,
    },

    /// An API base URL or endpoint path could not be combined into a URL
    #[error("Cannot build provider URL from endpoint {0:?}")]
    InvalidUrl(String),
}

impl Serialize for ErrorKind {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Shorthand result type used throughout the library
pub type Result<T> = std::result::Result<T, ErrorKind>;
