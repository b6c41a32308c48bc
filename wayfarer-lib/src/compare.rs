//! Pairwise comparison engine.
//!
//! Fans out N bases × M destinations into per-pair, per-mode routing
//! requests with bounded concurrency. Each mode of each pair settles
//! independently: a mode failure is recorded in that one cell's error
//! map and never aborts sibling work. The full result set is returned
//! only once everything has settled.

use futures::future::join_all;

use crate::client::ProviderClient;
use crate::directions::{
    cycling_summary, driving_summary, transit_summary, walking_summary, TransitQuery,
    DEFAULT_MAX_TRANSIT_PLANS,
};
use crate::ratelimit::ConcurrencyLimiter;
use crate::types::{Comparison, ResolvedPlace, TravelMode};
use crate::{ErrorKind, Result};

/// Maximum number of bases or destinations per batch
pub const MAX_ITEMS: usize = 20;
/// Maximum number of base×destination pairs per batch
pub const MAX_PAIRS: usize = 240;
/// Fan-out width of one comparison batch
pub const COMPARE_CONCURRENCY: usize = 5;

/// Options for one comparison batch
#[derive(Debug, Clone, Copy)]
pub struct CompareOptions<'a> {
    /// City override for transit routing hints
    pub city: Option<&'a str>,
    /// Transit plans kept per pair (clamped to 1..=6)
    pub max_transit_plans: usize,
    /// Provider transit strategy (0 = fastest)
    pub transit_strategy: u32,
    /// Restrict the cross product to a single base row
    pub only_base_idx: Option<usize>,
    /// Restrict the cross product to a single destination column
    pub only_dest_idx: Option<usize>,
    /// Per-call key override
    pub credential: Option<&'a str>,
}

impl Default for CompareOptions<'_> {
    fn default() -> Self {
        Self {
            city: None,
            max_transit_plans: DEFAULT_MAX_TRANSIT_PLANS,
            transit_strategy: 0,
            only_base_idx: None,
            only_dest_idx: None,
            credential: None,
        }
    }
}

/// Pad or truncate raw per-destination direction flags to `len`
#[must_use]
pub fn normalize_direction_flags(raw: &[bool], len: usize) -> Vec<bool> {
    (0..len)
        .map(|idx| raw.get(idx).copied().unwrap_or(false))
        .collect()
}

/// Validate resubmitted places before a recompute
pub fn validate_resolved_places(places: &[ResolvedPlace], kind: &str) -> Result<()> {
    for (idx, place) in places.iter().enumerate() {
        place.validate(kind, idx)?;
    }
    Ok(())
}

/// Compare every requested (base, destination) pair across four modes.
///
/// `direction_flags[dest_idx]` flips the route direction to
/// destination→base for every pair involving that destination.
/// `only_base_idx`/`only_dest_idx` narrow the cross product to one row
/// or column; an out-of-range index is an error.
///
/// Returns one [`Comparison`] per pair in base-major order, after every
/// pair's every mode has settled.
pub async fn compute_comparisons(
    client: &ProviderClient,
    bases: &[ResolvedPlace],
    destinations: &[ResolvedPlace],
    direction_flags: &[bool],
    options: &CompareOptions<'_>,
) -> Result<Vec<Comparison>> {
    let base_indices = restrict("base", options.only_base_idx, bases.len())?;
    let dest_indices = restrict("destination", options.only_dest_idx, destinations.len())?;

    let context = PairContext {
        client,
        bases,
        destinations,
        direction_flags,
        options,
        limiter: ConcurrencyLimiter::new(COMPARE_CONCURRENCY),
    };

    let pairs: Vec<(usize, usize)> = base_indices
        .iter()
        .flat_map(|&base_idx| dest_indices.iter().map(move |&dest_idx| (base_idx, dest_idx)))
        .collect();

    Ok(join_all(
        pairs
            .into_iter()
            .map(|(base_idx, dest_idx)| compare_pair(&context, base_idx, dest_idx)),
    )
    .await)
}

struct PairContext<'a> {
    client: &'a ProviderClient,
    bases: &'a [ResolvedPlace],
    destinations: &'a [ResolvedPlace],
    direction_flags: &'a [bool],
    options: &'a CompareOptions<'a>,
    limiter: ConcurrencyLimiter,
}

async fn compare_pair(context: &PairContext<'_>, base_idx: usize, dest_idx: usize) -> Comparison {
    let base = &context.bases[base_idx];
    let dest = &context.destinations[dest_idx];
    let reverse = context
        .direction_flags
        .get(dest_idx)
        .copied()
        .unwrap_or(false);
    let (origin_place, dest_place) = if reverse { (dest, base) } else { (base, dest) };
    let origin = origin_place.location;
    let destination = dest_place.location;

    // Transit needs city hints: an explicit override wins, then each
    // side's own city code, the destination side falling back to the
    // origin's (same-city trips often only resolve one code).
    let options = context.options;
    let city_hint = options
        .city
        .map(str::to_string)
        .or_else(|| origin_place.citycode.clone());
    let cityd_hint = options
        .city
        .map(str::to_string)
        .or_else(|| dest_place.citycode.clone())
        .or_else(|| city_hint.clone());

    let transit_query = TransitQuery {
        origin,
        destination,
        city: city_hint.as_deref(),
        cityd: cityd_hint.as_deref(),
        strategy: options.transit_strategy,
        credential: options.credential,
    };

    let client = context.client;
    let limiter = &context.limiter;
    let (driving, walking, cycling, transit) = tokio::join!(
        limiter.run(driving_summary(client, origin, destination, options.credential)),
        limiter.run(walking_summary(client, origin, destination, options.credential)),
        limiter.run(cycling_summary(client, origin, destination, options.credential)),
        limiter.run(transit_summary(client, &transit_query, options.max_transit_plans)),
    );

    let mut comparison = Comparison::new(base_idx, dest_idx);
    match driving {
        Ok(summary) => comparison.driving = Some(summary),
        Err(err) => comparison.record_error(TravelMode::Driving, err.to_string()),
    }
    match walking {
        Ok(summary) => comparison.walking = Some(summary),
        Err(err) => comparison.record_error(TravelMode::Walking, err.to_string()),
    }
    match cycling {
        Ok(summary) => comparison.cycling = Some(summary),
        Err(err) => comparison.record_error(TravelMode::Cycling, err.to_string()),
    }
    match transit {
        Ok(summary) => comparison.transit = Some(summary),
        Err(err) => comparison.record_error(TravelMode::Transit, err.to_string()),
    }
    comparison
}

fn restrict(kind: &'static str, only: Option<usize>, len: usize) -> Result<Vec<usize>> {
    match only {
        None => Ok((0..len).collect()),
        Some(index) if index < len => Ok(vec![index]),
        Some(index) => Err(ErrorKind::IndexOutOfRange { kind, index, len }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::{compute_comparisons, normalize_direction_flags, CompareOptions};
    use crate::test_utils::{mock_client, mount_json};
    use crate::types::{Coordinate, ErrorKind, PlaceSource, ResolvedPlace, TravelMode};

    fn place(name: &str, lng: f64, lat: f64, citycode: Option<&str>) -> ResolvedPlace {
        ResolvedPlace {
            input: name.to_string(),
            name: name.to_string(),
            address: None,
            location: Coordinate { lng, lat },
            citycode: citycode.map(str::to_string),
            adcode: None,
            source: PlaceSource::Poi,
        }
    }

    fn driving_body() -> serde_json::Value {
        serde_json::json!({
            "status": "1",
            "route": {"paths": [{"distance": "1000", "duration": "300", "steps": []}]}
        })
    }

    fn simple_body() -> serde_json::Value {
        serde_json::json!({
            "status": "1",
            "route": {"paths": [{"distance": "1000", "duration": "600", "steps": []}]}
        })
    }

    fn cycling_body() -> serde_json::Value {
        serde_json::json!({
            "errcode": 0,
            "data": {"paths": [{"distance": "1000", "duration": "400", "steps": []}]}
        })
    }

    fn transit_body() -> serde_json::Value {
        serde_json::json!({
            "status": "1",
            "route": {"transits": [{"duration": "1500", "segments": []}]}
        })
    }

    async fn mount_all_modes(server: &MockServer) {
        mount_json(server, "/direction/driving", driving_body()).await;
        mount_json(server, "/direction/walking", simple_body()).await;
        mount_json(server, "/direction/bicycling", cycling_body()).await;
        mount_json(server, "/direction/transit/integrated", transit_body()).await;
    }

    #[tokio::test]
    async fn test_full_cross_product() {
        let server = MockServer::start().await;
        mount_all_modes(&server).await;

        let client = mock_client(&server);
        let bases = vec![
            place("b0", 116.1, 39.1, Some("010")),
            place("b1", 116.2, 39.2, Some("010")),
            place("b2", 116.3, 39.3, Some("010")),
        ];
        let destinations = vec![
            place("d0", 116.4, 39.4, Some("010")),
            place("d1", 116.5, 39.5, Some("010")),
        ];
        let flags = vec![false, false];

        let comparisons = compute_comparisons(
            &client,
            &bases,
            &destinations,
            &flags,
            &CompareOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(comparisons.len(), 6);
        let pairs: HashSet<(usize, usize)> = comparisons
            .iter()
            .map(|c| (c.base_idx, c.dest_idx))
            .collect();
        assert_eq!(pairs.len(), 6);
        for comparison in &comparisons {
            assert!(comparison.driving.is_some());
            assert!(comparison.walking.is_some());
            assert!(comparison.cycling.is_some());
            assert!(comparison.transit.is_some());
            assert_eq!(comparison.errors, None);
        }
    }

    #[tokio::test]
    async fn test_restricted_recompute() {
        let server = MockServer::start().await;
        mount_all_modes(&server).await;

        let client = mock_client(&server);
        let bases = vec![
            place("b0", 116.1, 39.1, None),
            place("b1", 116.2, 39.2, None),
            place("b2", 116.3, 39.3, None),
        ];
        let destinations = vec![place("d0", 116.4, 39.4, None), place("d1", 116.5, 39.5, None)];
        let flags = vec![false, false];

        let options = CompareOptions {
            only_dest_idx: Some(1),
            ..CompareOptions::default()
        };
        let comparisons = compute_comparisons(&client, &bases, &destinations, &flags, &options)
            .await
            .unwrap();

        assert_eq!(comparisons.len(), 3);
        assert!(comparisons.iter().all(|c| c.dest_idx == 1));
        let base_indices: Vec<usize> = comparisons.iter().map(|c| c.base_idx).collect();
        assert_eq!(base_indices, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_restricted_recompute_out_of_range() {
        let server = MockServer::start().await;
        let client = mock_client(&server);
        let bases = vec![place("b0", 116.1, 39.1, None)];
        let destinations = vec![place("d0", 116.4, 39.4, None)];

        let options = CompareOptions {
            only_dest_idx: Some(5),
            ..CompareOptions::default()
        };
        let result =
            compute_comparisons(&client, &bases, &destinations, &[false], &options).await;

        assert!(matches!(
            result,
            Err(ErrorKind::IndexOutOfRange { kind: "destination", index: 5, len: 1 })
        ));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_per_mode_isolation() {
        let server = MockServer::start().await;
        // Transit fails only for routes originating at b0; mount order
        // matters, the specific mock must come first
        Mock::given(method("GET"))
            .and(path("/direction/transit/integrated"))
            .and(query_param("origin", "116.1,39.1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "0",
                "info": "SERVICE_NOT_AVAILABLE",
                "infocode": "10003"
            })))
            .mount(&server)
            .await;
        mount_all_modes(&server).await;

        let client = mock_client(&server);
        let bases = vec![
            place("b0", 116.1, 39.1, Some("010")),
            place("b1", 116.2, 39.2, Some("010")),
        ];
        let destinations = vec![place("d0", 116.4, 39.4, Some("010"))];

        let comparisons = compute_comparisons(
            &client,
            &bases,
            &destinations,
            &[false],
            &CompareOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(comparisons.len(), 2);
        let broken = comparisons
            .iter()
            .find(|c| c.base_idx == 0)
            .unwrap();
        assert!(broken.driving.is_some());
        assert!(broken.walking.is_some());
        assert!(broken.cycling.is_some());
        assert!(broken.transit.is_none());
        let errors = broken.errors.as_ref().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[&TravelMode::Transit].contains("SERVICE_NOT_AVAILABLE"));

        let healthy = comparisons.iter().find(|c| c.base_idx == 1).unwrap();
        assert!(healthy.transit.is_some());
        assert_eq!(healthy.errors, None);
    }

    #[tokio::test]
    async fn test_direction_flag_swaps_origin_and_destination() {
        let server = MockServer::start().await;
        mount_all_modes(&server).await;

        let client = mock_client(&server);
        let bases = vec![place("b0", 116.1, 39.1, Some("010"))];
        let destinations = vec![
            place("d0", 116.4, 39.4, Some("010")),
            place("d1", 116.5, 39.5, Some("021")),
        ];

        // Destination 1 is reversed: routes run d1 -> b0
        compute_comparisons(
            &client,
            &bases,
            &destinations,
            &[false, true],
            &CompareOptions::default(),
        )
        .await
        .unwrap();

        let requests = server.received_requests().await.unwrap();
        let driving_queries: Vec<(String, String)> = requests
            .iter()
            .filter(|r| r.url.path() == "/direction/driving")
            .map(|r| {
                let mut origin = String::new();
                let mut destination = String::new();
                for (key, value) in r.url.query_pairs() {
                    match key.as_ref() {
                        "origin" => origin = value.to_string(),
                        "destination" => destination = value.to_string(),
                        _ => {}
                    }
                }
                (origin, destination)
            })
            .collect();

        assert_eq!(driving_queries.len(), 2);
        assert!(driving_queries.contains(&("116.1,39.1".to_string(), "116.4,39.4".to_string())));
        assert!(driving_queries.contains(&("116.5,39.5".to_string(), "116.1,39.1".to_string())));
    }

    #[tokio::test]
    async fn test_transit_city_hints() {
        let server = MockServer::start().await;
        mount_all_modes(&server).await;

        let client = mock_client(&server);
        // Destination has no city code of its own: the cityd hint falls
        // back to the origin-side hint
        let bases = vec![place("b0", 116.1, 39.1, Some("010"))];
        let destinations = vec![place("d0", 116.4, 39.4, None)];

        compute_comparisons(
            &client,
            &bases,
            &destinations,
            &[false],
            &CompareOptions::default(),
        )
        .await
        .unwrap();

        let requests = server.received_requests().await.unwrap();
        let transit = requests
            .iter()
            .find(|r| r.url.path() == "/direction/transit/integrated")
            .unwrap();
        let mut city = None;
        let mut cityd = None;
        for (key, value) in transit.url.query_pairs() {
            match key.as_ref() {
                "city" => city = Some(value.to_string()),
                "cityd" => cityd = Some(value.to_string()),
                _ => {}
            }
        }
        assert_eq!(city.as_deref(), Some("010"));
        assert_eq!(cityd.as_deref(), Some("010"));
    }

    #[test]
    fn test_normalize_direction_flags() {
        assert_eq!(normalize_direction_flags(&[true], 3), vec![true, false, false]);
        assert_eq!(normalize_direction_flags(&[true, false, true, true], 2), vec![true, false]);
    }
}
