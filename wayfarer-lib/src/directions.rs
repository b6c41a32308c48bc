//! Mode-specific routing: summaries for the comparison engine and
//! polyline extraction for map drawing.

use crate::client::response::{
    decode, CyclingResponse, DrivingResponse, SimplePath, TransitResponse, TransitSegment,
    WalkingResponse,
};
use crate::client::{ApiBase, ProviderClient, ResponseClassifier};
use crate::types::{
    Coordinate, CyclingSummary, DrivingSummary, LegKind, RoutePath, RouteSegment, RouteStop,
    TrafficStatus, TransitLeg, TransitPlan, TransitSummary, TravelMode, WalkingSummary,
};
use crate::{ErrorKind, Result};

/// Default number of transit plans kept per pair
pub const DEFAULT_MAX_TRANSIT_PLANS: usize = 3;
/// Hard cap on the number of transit plans kept per pair
const MAX_TRANSIT_PLANS: usize = 6;

/// Assumed speeds in meters per second, used to estimate a leg duration
/// only when the provider omits one
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegSpeeds {
    pub walking: f64,
    pub bus: f64,
    pub subway: f64,
    pub railway: f64,
    pub taxi: f64,
}

impl Default for LegSpeeds {
    fn default() -> Self {
        Self {
            walking: 1.2,
            bus: 6.0,
            subway: 8.0,
            railway: 15.0,
            taxi: 9.0,
        }
    }
}

/// Parameters of one transit routing request
#[derive(Debug, Clone, Copy)]
pub struct TransitQuery<'a> {
    pub origin: Coordinate,
    pub destination: Coordinate,
    /// Origin-side city hint; `None` lets the provider infer
    pub city: Option<&'a str>,
    /// Destination-side city hint
    pub cityd: Option<&'a str>,
    /// Provider transit strategy (0 = fastest)
    pub strategy: u32,
    pub credential: Option<&'a str>,
}

/// Parameters of one polyline request, any mode
#[derive(Debug, Clone, Copy)]
pub struct RouteQuery<'a> {
    pub origin: Coordinate,
    pub destination: Coordinate,
    pub city: Option<&'a str>,
    pub cityd: Option<&'a str>,
    pub strategy: u32,
    /// Which transit plan to draw; ignored for other modes
    pub plan_index: usize,
    pub credential: Option<&'a str>,
}

/// Driving time/distance/cost between two points
pub async fn driving_summary(
    client: &ProviderClient,
    origin: Coordinate,
    destination: Coordinate,
    credential: Option<&str>,
) -> Result<DrivingSummary> {
    let json = client
        .get_json(
            ApiBase::V3,
            "direction/driving",
            &driving_params(origin, destination),
            credential,
            &ResponseClassifier::v3(),
        )
        .await?;
    let response: DrivingResponse = decode(json)?;
    let route = response
        .route
        .ok_or(ErrorKind::NoRoute(TravelMode::Driving))?;
    let first = route
        .paths
        .into_iter()
        .next()
        .ok_or(ErrorKind::NoRoute(TravelMode::Driving))?;
    Ok(DrivingSummary {
        distance_meters: first.distance.unwrap_or(0.0),
        duration_seconds: first.duration.unwrap_or(0.0),
        taxi_cost_yuan: route.taxi_cost,
        tolls_yuan: first.tolls,
        toll_distance_meters: first.toll_distance,
    })
}

/// Walking time/distance between two points
pub async fn walking_summary(
    client: &ProviderClient,
    origin: Coordinate,
    destination: Coordinate,
    credential: Option<&str>,
) -> Result<WalkingSummary> {
    let json = client
        .get_json(
            ApiBase::V3,
            "direction/walking",
            &origin_destination_params(origin, destination),
            credential,
            &ResponseClassifier::v3(),
        )
        .await?;
    let response: WalkingResponse = decode(json)?;
    let first = response
        .route
        .map(|route| route.paths)
        .unwrap_or_default()
        .into_iter()
        .next()
        .ok_or(ErrorKind::NoRoute(TravelMode::Walking))?;
    Ok(WalkingSummary {
        distance_meters: first.distance.unwrap_or(0.0),
        duration_seconds: first.duration.unwrap_or(0.0),
    })
}

/// Cycling time/distance between two points (v4 endpoint)
pub async fn cycling_summary(
    client: &ProviderClient,
    origin: Coordinate,
    destination: Coordinate,
    credential: Option<&str>,
) -> Result<CyclingSummary> {
    let response = fetch_cycling(client, origin, destination, credential).await?;
    let first = response
        .paths()
        .first()
        .ok_or(ErrorKind::NoRoute(TravelMode::Cycling))?;
    Ok(CyclingSummary {
        distance_meters: first.distance.unwrap_or(0.0),
        duration_seconds: first.duration.unwrap_or(0.0),
    })
}

/// Ranked transit plans between two points, truncated to `max_plans`
pub async fn transit_summary(
    client: &ProviderClient,
    query: &TransitQuery<'_>,
    max_plans: usize,
) -> Result<TransitSummary> {
    let response = fetch_transit(client, query).await?;
    let transits = response.route.map(|r| r.transits).unwrap_or_default();
    if transits.is_empty() {
        return Err(ErrorKind::NoRoute(TravelMode::Transit));
    }

    let limit = max_plans.clamp(1, MAX_TRANSIT_PLANS);
    let plans = transits
        .into_iter()
        .take(limit)
        .map(|transit| {
            let summaries: Vec<SegmentSummary> =
                transit.segments.iter().map(summarize_segment).collect();
            TransitPlan {
                duration_seconds: transit.duration.unwrap_or(0.0),
                cost_yuan: transit.cost,
                walking_distance_meters: transit.walking_distance,
                summary: summaries
                    .iter()
                    .map(|s| s.text.as_str())
                    .filter(|text| !text.is_empty())
                    .collect::<Vec<_>>()
                    .join(" | "),
                has_taxi: summaries.iter().any(|s| s.has_taxi),
                legs: summaries.into_iter().flat_map(|s| s.legs).collect(),
            }
        })
        .collect();
    Ok(TransitSummary { plans })
}

/// Drawable route for any mode
pub async fn route_path(
    client: &ProviderClient,
    mode: TravelMode,
    query: &RouteQuery<'_>,
    speeds: &LegSpeeds,
) -> Result<RoutePath> {
    match mode {
        TravelMode::Driving => {
            driving_route(client, query.origin, query.destination, query.credential).await
        }
        TravelMode::Walking => {
            walking_route(client, query.origin, query.destination, query.credential).await
        }
        TravelMode::Cycling => {
            cycling_route(client, query.origin, query.destination, query.credential).await
        }
        TravelMode::Transit => {
            let transit_query = TransitQuery {
                origin: query.origin,
                destination: query.destination,
                city: query.city,
                cityd: query.cityd,
                strategy: query.strategy,
                credential: query.credential,
            };
            transit_route(client, &transit_query, query.plan_index, speeds).await
        }
    }
}

/// Driving polylines with per-TMC-segment traffic classification.
///
/// Steps without TMC data fall back to a whole-step smooth segment; a
/// route with no usable step polylines falls back to one concatenated
/// smooth path. A route the provider could not plan yields an empty
/// segment list rather than an error.
async fn driving_route(
    client: &ProviderClient,
    origin: Coordinate,
    destination: Coordinate,
    credential: Option<&str>,
) -> Result<RoutePath> {
    let json = client
        .get_json(
            ApiBase::V3,
            "direction/driving",
            &driving_params(origin, destination),
            credential,
            &ResponseClassifier::v3(),
        )
        .await?;
    let response: DrivingResponse = decode(json)?;
    let route = response.route;
    let taxi_cost_yuan = route.as_ref().and_then(|r| r.taxi_cost);
    let first = route.and_then(|r| r.paths.into_iter().next());
    let duration = first.as_ref().and_then(|path| path.duration);
    let steps = first.map(|path| path.steps).unwrap_or_default();

    let mut segments = Vec::new();
    for step in &steps {
        if !step.tmcs.is_empty() {
            for tmc in &step.tmcs {
                let path = parse_polyline(tmc.polyline.as_deref().unwrap_or_default());
                if path.is_empty() {
                    continue;
                }
                let mut segment = RouteSegment::new(LegKind::Driving, "Drive".to_string(), path);
                segment.traffic_status = Some(TrafficStatus::from_provider(
                    tmc.status.as_deref().unwrap_or_default(),
                ));
                segments.push(segment);
            }
            continue;
        }
        let path = parse_polyline(step.polyline.as_deref().unwrap_or_default());
        if path.is_empty() {
            continue;
        }
        let mut segment = RouteSegment::new(LegKind::Driving, "Drive".to_string(), path);
        segment.traffic_status = Some(TrafficStatus::Smooth);
        segments.push(segment);
    }
    if segments.is_empty() {
        let fallback: Vec<Coordinate> = steps
            .iter()
            .flat_map(|step| parse_polyline(step.polyline.as_deref().unwrap_or_default()))
            .collect();
        if !fallback.is_empty() {
            let mut segment = RouteSegment::new(LegKind::Driving, "Drive".to_string(), fallback);
            segment.traffic_status = Some(TrafficStatus::Smooth);
            segments.push(segment);
        }
    }
    if let Some(first_segment) = segments.first_mut() {
        first_segment.duration_seconds = duration;
    }

    Ok(RoutePath {
        mode: TravelMode::Driving,
        plan_index: None,
        taxi_cost_yuan,
        segments,
    })
}

async fn walking_route(
    client: &ProviderClient,
    origin: Coordinate,
    destination: Coordinate,
    credential: Option<&str>,
) -> Result<RoutePath> {
    let json = client
        .get_json(
            ApiBase::V3,
            "direction/walking",
            &origin_destination_params(origin, destination),
            credential,
            &ResponseClassifier::v3(),
        )
        .await?;
    let response: WalkingResponse = decode(json)?;
    let first = response
        .route
        .map(|route| route.paths)
        .unwrap_or_default()
        .into_iter()
        .next();
    Ok(RoutePath {
        mode: TravelMode::Walking,
        plan_index: None,
        taxi_cost_yuan: None,
        segments: vec![single_path_segment(
            LegKind::Walking,
            "Walk",
            first.as_ref(),
        )],
    })
}

async fn cycling_route(
    client: &ProviderClient,
    origin: Coordinate,
    destination: Coordinate,
    credential: Option<&str>,
) -> Result<RoutePath> {
    let response = fetch_cycling(client, origin, destination, credential).await?;
    let first = response
        .paths()
        .first()
        .ok_or(ErrorKind::NoRoute(TravelMode::Cycling))?;
    Ok(RoutePath {
        mode: TravelMode::Cycling,
        plan_index: None,
        taxi_cost_yuan: None,
        segments: vec![single_path_segment(LegKind::Cycling, "Cycle", Some(first))],
    })
}

/// Polylines for one transit plan, `plan_index` clamped into range.
///
/// Legs whose provider duration is missing get a speed-based estimate.
async fn transit_route(
    client: &ProviderClient,
    query: &TransitQuery<'_>,
    plan_index: usize,
    speeds: &LegSpeeds,
) -> Result<RoutePath> {
    let response = fetch_transit(client, query).await?;
    let transits = response.route.map(|r| r.transits).unwrap_or_default();
    if transits.is_empty() {
        return Err(ErrorKind::NoRoute(TravelMode::Transit));
    }
    let idx = plan_index.min(transits.len() - 1);

    let mut segments = Vec::new();
    for seg in &transits[idx].segments {
        extend_transit_segments(&mut segments, seg, speeds);
    }

    Ok(RoutePath {
        mode: TravelMode::Transit,
        plan_index: Some(idx),
        taxi_cost_yuan: None,
        segments,
    })
}

fn extend_transit_segments(
    segments: &mut Vec<RouteSegment>,
    seg: &TransitSegment,
    speeds: &LegSpeeds,
) {
    if let Some(walking) = &seg.walking {
        let path: Vec<Coordinate> = walking
            .steps
            .iter()
            .flat_map(|step| parse_polyline(step.polyline.as_deref().unwrap_or_default()))
            .collect();
        if !path.is_empty() {
            let mut segment = RouteSegment::new(LegKind::Walking, "Walk".to_string(), path);
            segment.duration_seconds = walking
                .duration
                .or_else(|| estimate_duration(walking.distance, speeds.walking));
            segment.from = Some(stop_from_location(walking.origin.as_deref()));
            segment.to = Some(stop_from_location(walking.destination.as_deref()));
            segments.push(segment);
        }
    }

    if let Some(taxi) = &seg.taxi {
        if let Some(polyline) = taxi.polyline.as_deref() {
            let path = parse_polyline(polyline);
            if !path.is_empty() {
                let mut segment = RouteSegment::new(LegKind::Taxi, "Taxi".to_string(), path);
                segment.duration_seconds = taxi
                    .duration
                    .or_else(|| estimate_duration(taxi.distance, speeds.taxi));
                segments.push(segment);
            }
        }
    }

    if let Some(bus) = &seg.bus {
        for line in &bus.buslines {
            let path = parse_polyline(line.polyline.as_deref().unwrap_or_default());
            if path.is_empty() {
                continue;
            }
            let name = line.name.clone().unwrap_or_default();
            let short = short_line_name(&name);
            let kind = busline_kind(line.kind.as_deref(), &short);
            let speed = if kind == LegKind::Subway {
                speeds.subway
            } else {
                speeds.bus
            };
            let mut segment = RouteSegment::new(kind, short, path);
            segment.duration_seconds = line
                .duration
                .or_else(|| estimate_duration(line.distance, speed));
            segment.from = line.departure_stop.as_ref().map(|stop| RouteStop {
                name: stop.name.clone(),
                location: stop.location.as_deref().and_then(Coordinate::parse_loose),
            });
            segment.to = line.arrival_stop.as_ref().map(|stop| RouteStop {
                name: stop.name.clone(),
                location: stop.location.as_deref().and_then(Coordinate::parse_loose),
            });
            segments.push(segment);
        }
    }

    if let Some(railway) = &seg.railway {
        if let Some(polyline) = railway.polyline.as_deref() {
            let path = parse_polyline(polyline);
            if !path.is_empty() {
                let distance = railway
                    .distance
                    .or_else(|| railway.trip.as_ref().and_then(|t| t.distance));
                let mut segment = RouteSegment::new(
                    LegKind::Railway,
                    railway.name.clone().unwrap_or_else(|| "Rail".to_string()),
                    path,
                );
                segment.duration_seconds = railway
                    .duration
                    .or_else(|| railway.trip.as_ref().and_then(|t| t.duration))
                    .or_else(|| estimate_duration(distance, speeds.railway));
                segments.push(segment);
            }
        }
    }
}

async fn fetch_transit(
    client: &ProviderClient,
    query: &TransitQuery<'_>,
) -> Result<TransitResponse> {
    let json = client
        .get_json(
            ApiBase::V3,
            "direction/transit/integrated",
            &[
                ("origin", Some(query.origin.to_string())),
                ("destination", Some(query.destination.to_string())),
                ("city", Some(query.city.unwrap_or_default().to_string())),
                ("cityd", Some(query.cityd.unwrap_or_default().to_string())),
                ("extensions", Some("base".to_string())),
                ("strategy", Some(query.strategy.to_string())),
            ],
            query.credential,
            &ResponseClassifier::v3(),
        )
        .await?;
    decode(json)
}

async fn fetch_cycling(
    client: &ProviderClient,
    origin: Coordinate,
    destination: Coordinate,
    credential: Option<&str>,
) -> Result<CyclingResponse> {
    let json = client
        .get_json(
            ApiBase::V4,
            "direction/bicycling",
            &origin_destination_params(origin, destination),
            credential,
            &ResponseClassifier::v4(),
        )
        .await?;
    decode(json)
}

fn driving_params(origin: Coordinate, destination: Coordinate) -> [(&'static str, Option<String>); 4] {
    [
        ("origin", Some(origin.to_string())),
        ("destination", Some(destination.to_string())),
        ("extensions", Some("all".to_string())),
        ("strategy", Some("0".to_string())),
    ]
}

fn origin_destination_params(
    origin: Coordinate,
    destination: Coordinate,
) -> [(&'static str, Option<String>); 2] {
    [
        ("origin", Some(origin.to_string())),
        ("destination", Some(destination.to_string())),
    ]
}

fn single_path_segment(kind: LegKind, label: &str, path: Option<&SimplePath>) -> RouteSegment {
    let points: Vec<Coordinate> = path
        .map(|p| {
            p.steps
                .iter()
                .flat_map(|step| parse_polyline(step.polyline.as_deref().unwrap_or_default()))
                .collect()
        })
        .unwrap_or_default();
    let mut segment = RouteSegment::new(kind, label.to_string(), points);
    segment.duration_seconds = path.and_then(|p| p.duration);
    segment
}

/// `;`-separated `lng,lat` pairs; unparsable points are skipped
fn parse_polyline(text: &str) -> Vec<Coordinate> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    text.split(';')
        .filter_map(Coordinate::parse_loose)
        .collect()
}

/// Estimate a duration from distance and an assumed speed.
///
/// Only used when the provider omits the authoritative duration.
fn estimate_duration(distance_meters: Option<f64>, speed_mps: f64) -> Option<f64> {
    let distance = distance_meters?;
    if distance <= 0.0 || !speed_mps.is_finite() || speed_mps <= 0.0 {
        return None;
    }
    Some((distance / speed_mps).round())
}

fn short_line_name(name: &str) -> String {
    let short = name.split('(').next().unwrap_or(name).trim();
    if short.is_empty() {
        name.to_string()
    } else {
        short.to_string()
    }
}

/// Subway lines are flagged by the line type or the name itself
fn busline_kind(kind: Option<&str>, short_name: &str) -> LegKind {
    if kind.is_some_and(|k| k.contains("地铁")) || short_name.contains("地铁") {
        LegKind::Subway
    } else {
        LegKind::Bus
    }
}

fn stop_from_location(raw: Option<&str>) -> RouteStop {
    RouteStop {
        name: None,
        location: raw.and_then(Coordinate::parse_loose),
    }
}

/// Per-segment summary parts, collected into a [`TransitPlan`]
struct SegmentSummary {
    text: String,
    has_taxi: bool,
    legs: Vec<TransitLeg>,
}

fn summarize_segment(segment: &TransitSegment) -> SegmentSummary {
    let mut parts: Vec<String> = Vec::new();
    let mut legs = Vec::new();
    let mut has_taxi = false;

    if let Some(walking) = &segment.walking {
        if let Some(meters) = walking.distance.filter(|meters| *meters > 0.0) {
            let rounded = meters.round() as u64;
            parts.push(format!("Walk {rounded}m"));
            legs.push(TransitLeg {
                kind: LegKind::Walking,
                label: "Walk".to_string(),
                distance_meters: Some(rounded),
            });
        }
    }

    if let Some(bus) = &segment.bus {
        for line in &bus.buslines {
            let Some(name) = &line.name else {
                continue;
            };
            let via_stops = line.via_num.map(|via| via.round() as u64);
            parts.push(match via_stops {
                Some(via) => format!("{name}({via} stops)"),
                None => name.clone(),
            });
            let short = short_line_name(name);
            let kind = busline_kind(line.kind.as_deref(), &short);
            legs.push(TransitLeg {
                kind,
                label: short,
                distance_meters: None,
            });
        }
    }

    if let Some(railway) = &segment.railway {
        if let Some(name) = &railway.name {
            parts.push(format!("Rail {name}"));
            legs.push(TransitLeg {
                kind: LegKind::Railway,
                label: name.clone(),
                distance_meters: None,
            });
        }
    }

    if let Some(taxi) = &segment.taxi {
        if taxi.is_present() {
            has_taxi = true;
            let distance = taxi.distance.map(|meters| meters.round() as u64);
            parts.push(match distance {
                Some(meters) => format!("Taxi {meters}m"),
                None => "Taxi".to_string(),
            });
            legs.push(TransitLeg {
                kind: LegKind::Taxi,
                label: "Taxi".to_string(),
                distance_meters: distance,
            });
        }
    }

    SegmentSummary {
        text: parts.join(" → "),
        has_taxi,
        legs,
    }
}
