//! Resolve one coordinate against a soil dataset and print the result as JSON.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use landiq::config::Config;
use landiq::geo_lookup::ResolverKind;
use landiq::Coordinate;

#[derive(Parser, Debug)]
#[command(name = "lookup")]
#[command(about = "Look up the soil mapping unit for a coordinate")]
struct Args {
    /// Latitude in decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,

    /// Longitude in decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    lon: f64,

    /// Soil GeoJSON dataset (.geojson or .geojson.gz), overrides the config file
    #[arg(long)]
    dataset: Option<PathBuf>,

    /// Config file (defaults to ./landiq.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Resolver implementation, overrides the config file
    #[arg(long, value_enum)]
    resolver: Option<ResolverKind>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout stays pure JSON
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let coord = Coordinate::new(args.lat, args.lon);
    if !coord.is_valid() {
        bail!(
            "Invalid coordinate ({}, {}): latitude must be within [-90, 90] and longitude within [-180, 180]",
            args.lat,
            args.lon
        );
    }

    let mut config = Config::load_or_default(args.config.as_deref())?;
    if let Some(dataset) = args.dataset {
        config.dataset.path = dataset;
    }
    if let Some(resolver) = args.resolver {
        config.dataset.resolver = resolver;
    }

    let service = config
        .dataset
        .open()
        .context("Failed to load soil dataset")?;

    let result = service.lookup(coord);
    info!("Lookup ({}, {}) -> {:?}", args.lat, args.lon, result);

    let output = if args.pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{}", output);

    Ok(())
}
