//! Free-text place resolution.
//!
//! Turns user input (a place name, a street address, or a literal
//! `lng,lat` pair) into a [`ResolvedPlace`] through a prioritized
//! fallback chain: coordinate parse, POI text search, geocoding.

use std::collections::{HashMap, HashSet};

use futures::future::join_all;
use log::debug;

use crate::client::response::{decode, GeocodeResponse, Poi, PoiSearchResponse, RegeoResponse};
use crate::client::{ApiBase, ProviderClient, ResponseClassifier};
use crate::ratelimit::ConcurrencyLimiter;
use crate::types::{Coordinate, PlaceSource, ResolvedPlace};
use crate::{ErrorKind, Result};

/// Default number of candidates returned by [`search_candidates`]
pub const DEFAULT_CANDIDATE_LIMIT: usize = 8;
/// Hard cap on the candidate count the provider is asked for
const MAX_CANDIDATE_LIMIT: usize = 20;
/// Fan-out width of a batch resolve
pub const RESOLVE_CONCURRENCY: usize = 5;

/// Shared scoping parameters for one resolution request or batch
#[derive(Debug, Clone, Copy)]
pub struct PlaceQuery<'a> {
    /// City to scope searches to
    pub city: Option<&'a str>,
    /// Restrict POI search to `city` (only effective when `city` is set)
    pub city_limit: bool,
    /// Per-call key override
    pub credential: Option<&'a str>,
}

impl Default for PlaceQuery<'_> {
    fn default() -> Self {
        Self {
            city: None,
            city_limit: true,
            credential: None,
        }
    }
}

/// Resolve free text to a routable place.
///
/// Priority order, first applicable branch wins:
///
/// 1. Text that parses as a `lng,lat` pair is enriched via reverse
///    geocoding; if that fails the raw coordinate is returned as-is —
///    a user-supplied coordinate is already routable without a name.
/// 2. POI text search, preferring the entrance location over the
///    centroid (centroids of large venues like airports mislead transit
///    routing toward inaccessible points).
/// 3. Geocoding the text as an address.
///
/// # Errors
///
/// [`ErrorKind::PlaceNotFound`] when no branch produces a usable
/// location; provider errors from the search/geocode calls otherwise.
pub async fn resolve_place(
    client: &ProviderClient,
    text: &str,
    query: &PlaceQuery<'_>,
) -> Result<ResolvedPlace> {
    if let Some(coord) = Coordinate::from_text(text) {
        return Ok(resolve_coordinate(client, text, coord, query).await);
    }

    // POI search first: better for hotels and landmarks than geocoding
    let poi_json = client
        .get_json(
            ApiBase::V3,
            "place/text",
            &[
                ("keywords", Some(text.to_string())),
                // extensions=all carries entr_location
                ("extensions", Some("all".to_string())),
                ("offset", Some("1".to_string())),
                ("page", Some("1".to_string())),
                ("city", query.city.map(str::to_string)),
                (
                    "citylimit",
                    (query.city_limit && query.city.is_some()).then(|| "true".to_string()),
                ),
            ],
            query.credential,
            &ResponseClassifier::v3(),
        )
        .await?;
    let search: PoiSearchResponse = decode(poi_json)?;
    for poi in search.pois {
        let Some(location) = poi_location(&poi) else {
            continue;
        };
        return Ok(ResolvedPlace {
            input: text.to_string(),
            name: poi.name.unwrap_or_else(|| text.to_string()),
            address: poi.address,
            location,
            citycode: poi.citycode,
            adcode: poi.adcode,
            source: PlaceSource::Poi,
        });
    }

    // Geocode fallback: better for full street addresses
    let geo_json = client
        .get_json(
            ApiBase::V3,
            "geocode/geo",
            &[
                ("address", Some(text.to_string())),
                ("city", query.city.map(str::to_string)),
            ],
            query.credential,
            &ResponseClassifier::v3(),
        )
        .await?;
    let geocodes: GeocodeResponse = decode(geo_json)?;
    if let Some(entry) = geocodes.geocodes.into_iter().next() {
        if let Some(raw) = entry.location {
            let location = Coordinate::parse_loose(&raw)
                .ok_or_else(|| ErrorKind::InvalidCoordinate(raw.clone()))?;
            return Ok(ResolvedPlace {
                input: text.to_string(),
                name: entry
                    .formatted_address
                    .clone()
                    .unwrap_or_else(|| text.to_string()),
                address: entry.formatted_address,
                location,
                citycode: entry.citycode,
                adcode: entry.adcode,
                source: PlaceSource::Geocode,
            });
        }
    }

    Err(ErrorKind::PlaceNotFound(text.to_string()))
}

/// Return up to `limit` deduplicated matches for disambiguation.
///
/// Coordinate input yields an empty list (nothing to disambiguate).
/// POI matches are deduplicated by rounded coordinate plus name; when
/// POI search yields nothing usable, geocode results stand in.
pub async fn search_candidates(
    client: &ProviderClient,
    text: &str,
    query: &PlaceQuery<'_>,
    limit: usize,
) -> Result<Vec<ResolvedPlace>> {
    if Coordinate::from_text(text).is_some() {
        return Ok(Vec::new());
    }
    let capped = limit.clamp(1, MAX_CANDIDATE_LIMIT);

    let poi_json = client
        .get_json(
            ApiBase::V3,
            "place/text",
            &[
                ("keywords", Some(text.to_string())),
                ("extensions", Some("all".to_string())),
                ("offset", Some(capped.to_string())),
                ("page", Some("1".to_string())),
                ("city", query.city.map(str::to_string)),
                (
                    "citylimit",
                    (query.city_limit && query.city.is_some()).then(|| "true".to_string()),
                ),
            ],
            query.credential,
            &ResponseClassifier::v3(),
        )
        .await?;
    let search: PoiSearchResponse = decode(poi_json)?;

    let mut seen = HashSet::new();
    let mut candidates = Vec::new();
    for poi in search.pois {
        let Some(raw) = poi.entr_location.as_deref().or(poi.location.as_deref()) else {
            continue;
        };
        let Some(location) = Coordinate::parse_loose(raw) else {
            continue;
        };
        let name = poi.name.clone().unwrap_or_default();
        if !seen.insert(format!("{}-{name}", location.rounded_key())) {
            continue;
        }
        candidates.push(ResolvedPlace {
            input: text.to_string(),
            name: poi.name.unwrap_or_else(|| text.to_string()),
            address: poi.address,
            location,
            citycode: poi.citycode,
            adcode: poi.adcode,
            source: PlaceSource::Poi,
        });
    }
    if !candidates.is_empty() {
        return Ok(candidates);
    }

    let geo_json = client
        .get_json(
            ApiBase::V3,
            "geocode/geo",
            &[
                ("address", Some(text.to_string())),
                ("city", query.city.map(str::to_string)),
            ],
            query.credential,
            &ResponseClassifier::v3(),
        )
        .await?;
    let geocodes: GeocodeResponse = decode(geo_json)?;
    let mut fallback = Vec::new();
    for entry in geocodes.geocodes.into_iter().take(capped) {
        let Some(location) = entry.location.as_deref().and_then(Coordinate::parse_loose) else {
            continue;
        };
        fallback.push(ResolvedPlace {
            input: text.to_string(),
            name: entry
                .formatted_address
                .clone()
                .unwrap_or_else(|| text.to_string()),
            address: entry.formatted_address,
            location,
            citycode: entry.citycode,
            adcode: entry.adcode,
            source: PlaceSource::Geocode,
        });
    }
    Ok(fallback)
}

/// Resolve a batch of texts, each distinct text once.
///
/// Resolutions fan out through `limiter`; results come back in input
/// order, duplicates sharing one resolution. Any failure fails the
/// whole batch — a comparison over unresolved places is meaningless.
pub async fn resolve_places(
    client: &ProviderClient,
    texts: &[String],
    query: &PlaceQuery<'_>,
    limiter: &ConcurrencyLimiter,
) -> Result<Vec<ResolvedPlace>> {
    let mut seen = HashSet::new();
    let mut distinct = Vec::new();
    for text in texts {
        if seen.insert(text.as_str()) {
            distinct.push(text.as_str());
        }
    }

    let resolutions = join_all(
        distinct
            .iter()
            .map(|text| limiter.run(resolve_place(client, text, query))),
    )
    .await;

    let mut by_text: HashMap<&str, ResolvedPlace> = HashMap::with_capacity(distinct.len());
    for (text, resolution) in distinct.into_iter().zip(resolutions) {
        by_text.insert(text, resolution?);
    }
    Ok(texts
        .iter()
        .map(|text| by_text[text.as_str()].clone())
        .collect())
}

/// Enrich a literal coordinate via reverse geocoding; never fails.
///
/// This is the one place a provider error is deliberately swallowed:
/// the coordinate alone is a usable degraded result.
async fn resolve_coordinate(
    client: &ProviderClient,
    text: &str,
    coord: Coordinate,
    query: &PlaceQuery<'_>,
) -> ResolvedPlace {
    match reverse_geocode(client, coord, query.credential).await {
        Ok(regeo) => {
            let component = regeo.as_ref().and_then(|r| r.address_component.as_ref());
            let formatted = regeo.as_ref().and_then(|r| r.formatted_address.clone());
            ResolvedPlace {
                input: text.to_string(),
                name: formatted.clone().unwrap_or_else(|| text.to_string()),
                address: formatted,
                location: coord,
                citycode: component.and_then(|c| c.citycode.clone()),
                adcode: component.and_then(|c| c.adcode.clone()),
                source: PlaceSource::Coord,
            }
        }
        Err(err) => {
            debug!("reverse geocode for {text:?} failed ({err}), keeping raw coordinate");
            ResolvedPlace {
                input: text.to_string(),
                name: text.to_string(),
                address: None,
                location: coord,
                citycode: None,
                adcode: None,
                source: PlaceSource::Coord,
            }
        }
    }
}

async fn reverse_geocode(
    client: &ProviderClient,
    coord: Coordinate,
    credential: Option<&str>,
) -> Result<Option<crate::client::response::Regeocode>> {
    let json = client
        .get_json(
            ApiBase::V3,
            "geocode/regeo",
            &[
                ("location", Some(coord.to_string())),
                ("extensions", Some("base".to_string())),
                ("radius", Some("1000".to_string())),
            ],
            credential,
            &ResponseClassifier::v3(),
        )
        .await?;
    let response: RegeoResponse = decode(json)?;
    Ok(response.regeocode)
}

/// Entrance location wins over the centroid when both parse
fn poi_location(poi: &Poi) -> Option<Coordinate> {
    poi.entr_location
        .as_deref()
        .and_then(Coordinate::parse_loose)
        .or_else(|| poi.location.as_deref().and_then(Coordinate::parse_loose))
}
