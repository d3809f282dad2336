//! main.rs — poeminv command-line entry point
//!
//! Loads a rule configuration and runs one calculation per invocation:
//!   guess    complete partial vessel attributes
//!   track    emissions along an AIS track
//!   mooring  emissions while moored for a number of hours
//!
//! Results are printed to stdout as JSON. Logs go to stderr; set `RUST_LOG`
//! to change the level.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use poeminv_engine::{
    always_plausible_distance, always_plausible_sog, Config, EmissionCalculator, PositionRecord,
    SegmentDurationSanitizer, Track, VesselInfo,
};
use poeminv_types::{Mode, Value, Values};
use tracing::{debug, info};

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "poeminv", about = "Ship exhaust emissions for port emission inventories")]
struct Args {
    /// Segment duration sanitizer parameters (TOML)
    #[arg(long, global = true)]
    sanitizer: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the completed vessel attributes
    Guess {
        /// Rule configuration (.json or .toml)
        #[arg(short, long)]
        config: PathBuf,
        /// Known vessel attributes as a JSON object
        #[arg(short, long, default_value = "{}")]
        attrs: String,
    },
    /// Print the emissions along a track, in grams
    Track {
        /// Rule configuration (.json or .toml)
        #[arg(short, long)]
        config: PathBuf,
        /// JSON array of position records
        #[arg(short, long)]
        positions: PathBuf,
        /// transit or maneuvering
        #[arg(short, long, default_value = "transit")]
        mode: Mode,
        /// Known vessel attributes as a JSON object
        #[arg(short, long, default_value = "{}")]
        vessel: String,
    },
    /// Print the emissions while moored, in grams
    Mooring {
        /// Rule configuration (.json or .toml)
        #[arg(short, long)]
        config: PathBuf,
        /// Time spent moored
        #[arg(long)]
        hours: f64,
        /// hotelling or anchorage
        #[arg(short, long, default_value = "hotelling")]
        mode: Mode,
        /// Known vessel attributes as a JSON object
        #[arg(short, long, default_value = "{}")]
        vessel: String,
    },
}

// ── Main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "poeminv=info,poeminv_engine=info".into()),
        )
        .init();

    let args = Args::parse();
    let sanitizer = load_sanitizer(args.sanitizer.as_deref())?;

    let output = match args.command {
        Command::Guess { config, attrs } => {
            let config = load_config(&config)?;
            let guess = config.guess_missing_vessel_info(&parse_values(&attrs)?)?;
            serde_json::to_value(guess)?
        }
        Command::Track { config, positions, mode, vessel } => {
            let config = load_config(&config)?;
            let vessel_info = vessel_info(&config, &vessel)?;
            let raw = std::fs::read_to_string(&positions)
                .with_context(|| format!("reading positions from {}", positions.display()))?;
            let records: Vec<PositionRecord> = serde_json::from_str(&raw)
                .with_context(|| format!("parsing positions in {}", positions.display()))?;
            let track = Track::sanitized_from_positions(&records, always_plausible_sog, always_plausible_distance)
                .context("sanitizing track")?;
            info!("Track of {} positions over {:.2} h", track.len(), track.hours());
            let calculator = EmissionCalculator::with_sanitizer(&config, vessel_info, sanitizer);
            serde_json::to_value(calculator.calculate_track_emissions(&track, mode)?)?
        }
        Command::Mooring { config, hours, mode, vessel } => {
            if !(hours.is_finite() && hours >= 0.0) {
                bail!("hours must be a non-negative number, got {hours}");
            }
            let config = load_config(&config)?;
            let vessel_info = vessel_info(&config, &vessel)?;
            let duration = chrono::Duration::milliseconds((hours * 3_600_000.0).round() as i64);
            let calculator = EmissionCalculator::with_sanitizer(&config, vessel_info, sanitizer);
            serde_json::to_value(calculator.calculate_mooring_emissions(duration, mode)?)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn load_config(path: &Path) -> Result<Config> {
    let config = Config::from_path(path).with_context(|| format!("loading config {}", path.display()))?;
    info!("Loaded config from {}", path.display());
    Ok(config)
}

fn load_sanitizer(path: Option<&Path>) -> Result<SegmentDurationSanitizer> {
    let Some(path) = path else {
        return Ok(SegmentDurationSanitizer::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading sanitizer parameters from {}", path.display()))?;
    let sanitizer: SegmentDurationSanitizer =
        toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    debug!("Sanitizer parameters: {sanitizer:?}");
    Ok(sanitizer)
}

/// Parses a JSON object of scalar attributes.
fn parse_values(json: &str) -> Result<Values> {
    let parsed: serde_json::Value = serde_json::from_str(json).with_context(|| format!("parsing attributes {json}"))?;
    let Some(object) = parsed.as_object() else {
        bail!("attributes must be a JSON object, got {parsed}");
    };
    object
        .iter()
        .map(|(k, v)| {
            let value = Value::try_from(v).with_context(|| format!("attribute {k}"))?;
            Ok((k.clone(), value))
        })
        .collect()
}

fn vessel_info(config: &Config, json: &str) -> Result<VesselInfo> {
    let vessel_info = config.vessel_info_from(&parse_values(json)?)?;
    info!("Vessel: {vessel_info:?}");
    Ok(vessel_info)
}
