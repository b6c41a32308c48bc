use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use wayfarer_lib::directions::DEFAULT_MAX_TRANSIT_PLANS;
use wayfarer_lib::places::DEFAULT_CANDIDATE_LIMIT;
use wayfarer_lib::ratelimit::{
    DEFAULT_MAX_CONCURRENT, DEFAULT_QUEUE_LIMIT, DEFAULT_REQUESTS_PER_SECOND,
};
use wayfarer_lib::{DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT_SECS};

#[derive(Parser, Debug)]
#[command(
    name = "wayfarer",
    version,
    about = "Compare candidate hotel bases against destinations by travel time, distance and cost"
)]
pub(crate) struct WayfarerOptions {
    /// AMap web service key (AMAP_KEY is also honored as a fallback)
    #[arg(long, env = "AMAP_WEB_KEY", hide_env_values = true, global = true)]
    pub(crate) api_key: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, global = true)]
    pub(crate) timeout: u64,

    /// Maximum retries for rate-limited provider responses
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES, global = true)]
    pub(crate) max_retries: u64,

    /// Maximum concurrent provider requests
    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENT, global = true)]
    pub(crate) max_concurrency: usize,

    /// Target provider request rate, requests per second
    #[arg(long, default_value_t = DEFAULT_REQUESTS_PER_SECOND, global = true)]
    pub(crate) requests_per_second: u32,

    /// Bound on the provider request queue
    #[arg(long, default_value_t = DEFAULT_QUEUE_LIMIT, global = true)]
    pub(crate) queue_limit: usize,

    /// Log retries, fallbacks, and other provider chatter
    #[arg(short, long, global = true)]
    pub(crate) verbose: bool,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Compare bases against destinations across four travel modes
    Compare(CompareArgs),
    /// Resolve free text (or a literal "lng,lat") to a routable place
    Resolve(ResolveArgs),
    /// List candidate matches for ambiguous place text
    Candidates(CandidatesArgs),
    /// Fetch drawable polylines for one route
    Route(RouteArgs),
}

#[derive(Args, Debug)]
pub(crate) struct CompareArgs {
    /// A base location (hotel), repeatable
    #[arg(short = 'b', long = "base")]
    pub(crate) bases: Vec<String>,

    /// A destination to compare against, repeatable
    #[arg(short = 'd', long = "dest")]
    pub(crate) destinations: Vec<String>,

    /// File with one base per line
    #[arg(long)]
    pub(crate) bases_file: Option<PathBuf>,

    /// File with one destination per line
    #[arg(long)]
    pub(crate) dests_file: Option<PathBuf>,

    /// Previously resolved places as JSON (the output of a prior
    /// compare run); skips text resolution entirely
    #[arg(long, conflicts_with_all = ["bases", "destinations", "bases_file", "dests_file"])]
    pub(crate) from_json: Option<PathBuf>,

    /// Destination index to route destination→base instead, repeatable
    #[arg(long = "reverse", value_name = "DEST_IDX")]
    pub(crate) reverse: Vec<usize>,

    /// City to scope place resolution and transit routing to
    #[arg(long)]
    pub(crate) city: Option<String>,

    /// Allow place matches outside the given city
    #[arg(long)]
    pub(crate) no_city_limit: bool,

    /// Transit plans kept per pair (1-6)
    #[arg(long, default_value_t = DEFAULT_MAX_TRANSIT_PLANS)]
    pub(crate) max_transit_plans: usize,

    /// Provider transit strategy (0 = fastest)
    #[arg(long, default_value_t = 0)]
    pub(crate) transit_strategy: u32,

    /// Recompute only this base row
    #[arg(long, value_name = "IDX")]
    pub(crate) only_base: Option<usize>,

    /// Recompute only this destination column
    #[arg(long, value_name = "IDX")]
    pub(crate) only_dest: Option<usize>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub(crate) format: OutputFormat,
}

#[derive(Args, Debug)]
pub(crate) struct ResolveArgs {
    /// Place name, address, or "lng,lat"
    pub(crate) text: String,

    /// City to scope the search to
    #[arg(long)]
    pub(crate) city: Option<String>,

    /// Allow matches outside the given city
    #[arg(long)]
    pub(crate) no_city_limit: bool,
}

#[derive(Args, Debug)]
pub(crate) struct CandidatesArgs {
    /// Place name or address to disambiguate
    pub(crate) text: String,

    /// City to scope the search to
    #[arg(long)]
    pub(crate) city: Option<String>,

    /// Allow matches outside the given city
    #[arg(long)]
    pub(crate) no_city_limit: bool,

    /// Maximum candidates to return (1-20)
    #[arg(long, default_value_t = DEFAULT_CANDIDATE_LIMIT)]
    pub(crate) limit: usize,
}

#[derive(Args, Debug)]
pub(crate) struct RouteArgs {
    /// Travel mode: driving, walking, cycling, or transit
    #[arg(long)]
    pub(crate) mode: String,

    /// Origin as "lng,lat"
    #[arg(long)]
    pub(crate) origin: String,

    /// Destination as "lng,lat"
    #[arg(long)]
    pub(crate) destination: String,

    /// Origin-side city hint for transit
    #[arg(long)]
    pub(crate) city: Option<String>,

    /// Destination-side city hint for transit
    #[arg(long)]
    pub(crate) cityd: Option<String>,

    /// Provider transit strategy (0 = fastest)
    #[arg(long, default_value_t = 0)]
    pub(crate) strategy: u32,

    /// Which transit plan to draw
    #[arg(long, default_value_t = 0)]
    pub(crate) plan_index: usize,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OutputFormat {
    /// Full machine-readable report
    Json,
    /// Short human-readable summary per pair
    Compact,
}
