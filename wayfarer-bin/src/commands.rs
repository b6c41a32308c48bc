use std::fs;
use std::io;
use std::num::NonZeroU32;
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use wayfarer_lib::compare::{self, CompareOptions, MAX_ITEMS, MAX_PAIRS};
use wayfarer_lib::directions::{self, LegSpeeds, RouteQuery};
use wayfarer_lib::places::{self, PlaceQuery, RESOLVE_CONCURRENCY};
use wayfarer_lib::ratelimit::{ConcurrencyLimiter, RateLimitConfig};
use wayfarer_lib::{
    ClientBuilder, Comparison, Coordinate, ProviderClient, ResolvedPlace, TravelMode,
};

use crate::options::{
    CandidatesArgs, CompareArgs, OutputFormat, ResolveArgs, RouteArgs, WayfarerOptions,
};
use crate::output;

/// The full compare report: resolved inputs plus one comparison per pair.
///
/// Feeding this back through `compare --from-json` recomputes without
/// re-resolving any text.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CompareReport {
    pub(crate) bases: Vec<ResolvedPlace>,
    pub(crate) destinations: Vec<ResolvedPlace>,
    pub(crate) direction_flags: Vec<bool>,
    pub(crate) comparisons: Vec<Comparison>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResolvedBatch {
    bases: Vec<ResolvedPlace>,
    destinations: Vec<ResolvedPlace>,
    #[serde(default)]
    direction_flags: Vec<bool>,
}

pub(crate) fn build_client(options: &WayfarerOptions) -> Result<ProviderClient> {
    let rate = NonZeroU32::new(options.requests_per_second)
        .context("--requests-per-second must be at least 1")?;
    let builder = ClientBuilder::builder()
        .max_retries(options.max_retries)
        .timeout(Duration::from_secs(options.timeout))
        .rate_limit(RateLimitConfig::per_second(
            options.max_concurrency,
            rate,
            Some(options.queue_limit),
        ));
    let builder = match &options.api_key {
        Some(key) => builder.credential(SecretString::new(key.clone())).build(),
        None => builder.build(),
    };
    Ok(builder.client()?)
}

pub(crate) async fn compare(client: &ProviderClient, args: &CompareArgs) -> Result<()> {
    let (bases, destinations, mut flags) = if let Some(path) = &args.from_json {
        load_resolved_batch(path)?
    } else {
        resolve_batch(client, args).await?
    };

    check_batch_size(bases.len(), destinations.len(), args)?;

    for &idx in &args.reverse {
        if idx >= destinations.len() {
            bail!(
                "--reverse index {idx} is out of range (0..{})",
                destinations.len()
            );
        }
        flags[idx] = true;
    }

    let compare_options = CompareOptions {
        city: args.city.as_deref(),
        max_transit_plans: args.max_transit_plans,
        transit_strategy: args.transit_strategy,
        only_base_idx: args.only_base,
        only_dest_idx: args.only_dest,
        credential: None,
    };
    let comparisons =
        compare::compute_comparisons(client, &bases, &destinations, &flags, &compare_options)
            .await?;

    let report = CompareReport {
        bases,
        destinations,
        direction_flags: flags,
        comparisons,
    };
    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Compact => output::write_compact(&report, &mut io::stdout().lock())?,
    }
    Ok(())
}

pub(crate) async fn resolve(client: &ProviderClient, args: &ResolveArgs) -> Result<()> {
    let query = PlaceQuery {
        city: args.city.as_deref(),
        city_limit: !args.no_city_limit,
        credential: None,
    };
    let place = places::resolve_place(client, args.text.trim(), &query).await?;
    println!("{}", serde_json::to_string_pretty(&place)?);
    Ok(())
}

pub(crate) async fn candidates(client: &ProviderClient, args: &CandidatesArgs) -> Result<()> {
    let query = PlaceQuery {
        city: args.city.as_deref(),
        city_limit: !args.no_city_limit,
        credential: None,
    };
    let candidates =
        places::search_candidates(client, args.text.trim(), &query, args.limit).await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({ "candidates": candidates }))?
    );
    Ok(())
}

pub(crate) async fn route(client: &ProviderClient, args: &RouteArgs) -> Result<()> {
    let mode: TravelMode = args.mode.parse().map_err(|_| {
        anyhow!(
            "unknown mode {:?} (expected driving, walking, cycling, or transit)",
            args.mode
        )
    })?;
    let origin: Coordinate = args.origin.parse()?;
    let destination: Coordinate = args.destination.parse()?;

    let query = RouteQuery {
        origin,
        destination,
        city: args.city.as_deref(),
        cityd: args.cityd.as_deref(),
        strategy: args.strategy,
        plan_index: args.plan_index,
        credential: None,
    };
    let path = directions::route_path(client, mode, &query, &LegSpeeds::default()).await?;
    println!("{}", serde_json::to_string_pretty(&path)?);
    Ok(())
}

/// Resolve the text inputs of a compare run, each distinct text once
/// across both lists
async fn resolve_batch(
    client: &ProviderClient,
    args: &CompareArgs,
) -> Result<(Vec<ResolvedPlace>, Vec<ResolvedPlace>, Vec<bool>)> {
    let base_texts = gather_texts(&args.bases, args.bases_file.as_deref())?;
    let dest_texts = gather_texts(&args.destinations, args.dests_file.as_deref())?;
    if base_texts.is_empty() {
        bail!("at least one base is required (use --base or --bases-file)");
    }
    if dest_texts.is_empty() {
        bail!("at least one destination is required (use --dest or --dests-file)");
    }
    check_batch_size(base_texts.len(), dest_texts.len(), args)?;

    let query = PlaceQuery {
        city: args.city.as_deref(),
        city_limit: !args.no_city_limit,
        credential: None,
    };
    let mut texts = base_texts.clone();
    texts.extend(dest_texts.iter().cloned());
    let limiter = ConcurrencyLimiter::new(RESOLVE_CONCURRENCY);
    let mut resolved = places::resolve_places(client, &texts, &query, &limiter).await?;

    let destinations = resolved.split_off(base_texts.len());
    let flags = vec![false; dest_texts.len()];
    Ok((resolved, destinations, flags))
}

fn load_resolved_batch(
    path: &Path,
) -> Result<(Vec<ResolvedPlace>, Vec<ResolvedPlace>, Vec<bool>)> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("cannot read resolved places from {}", path.display()))?;
    let batch: ResolvedBatch =
        serde_json::from_str(&raw).context("malformed resolved-places JSON")?;
    if batch.bases.is_empty() {
        bail!("resolved-places JSON contains no bases");
    }
    if batch.destinations.is_empty() {
        bail!("resolved-places JSON contains no destinations");
    }
    compare::validate_resolved_places(&batch.bases, "bases")?;
    compare::validate_resolved_places(&batch.destinations, "destinations")?;
    let flags =
        compare::normalize_direction_flags(&batch.direction_flags, batch.destinations.len());
    Ok((batch.bases, batch.destinations, flags))
}

fn check_batch_size(bases: usize, destinations: usize, args: &CompareArgs) -> Result<()> {
    if bases > MAX_ITEMS || destinations > MAX_ITEMS {
        bail!("at most {MAX_ITEMS} bases and {MAX_ITEMS} destinations per run");
    }
    let restricted = args.only_base.is_some() || args.only_dest.is_some();
    if !restricted && bases * destinations > MAX_PAIRS {
        bail!(
            "too many combinations: at most {MAX_PAIRS} pairs (got {})",
            bases * destinations
        );
    }
    Ok(())
}

/// Trim flag values and file lines into a clean input list
fn gather_texts(values: &[String], file: Option<&Path>) -> Result<Vec<String>> {
    let mut texts: Vec<String> = values
        .iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect();
    if let Some(path) = file {
        let content = fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        texts.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string),
        );
    }
    Ok(texts)
}
