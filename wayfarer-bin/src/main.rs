//! `wayfarer` compares candidate hotel bases against destination points
//! by travel time, distance, and cost across driving, walking, cycling,
//! and transit, using the AMap REST API.
//!
//! Compare two hotels against a few daily destinations:
//!
//! ```sh
//! wayfarer compare -b "Grand Hotel" -b "Harbour Hotel" \
//!     -d "Science Museum" -d "116.4,39.9" --city 北京
//! ```
//!
//! Recompute a single column after editing one destination, without
//! re-resolving any text:
//!
//! ```sh
//! wayfarer compare --from-json report.json --only-dest 1
//! ```
//!
//! Resolve or disambiguate a single place:
//!
//! ```sh
//! wayfarer resolve "Beijing West Railway Station"
//! wayfarer candidates "Grand Hotel" --limit 5
//! ```

use anyhow::Result;
use clap::Parser;

mod commands;
mod options;
mod output;

use options::{Command, WayfarerOptions};

#[tokio::main]
async fn main() -> Result<()> {
    let options = WayfarerOptions::parse();
    init_logging(options.verbose);

    let client = commands::build_client(&options)?;
    match &options.command {
        Command::Compare(args) => commands::compare(&client, args).await,
        Command::Resolve(args) => commands::resolve(&client, args).await,
        Command::Candidates(args) => commands::candidates(&client, args).await,
        Command::Route(args) => commands::route(&client, args).await,
    }
}

fn init_logging(verbose: bool) {
    env_logger::Builder::new()
        .filter_level(if verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        })
        .parse_default_env()
        .init();
}
