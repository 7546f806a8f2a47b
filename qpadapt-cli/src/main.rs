#![forbid(unsafe_code)]

//! qpadapt CLI.
//!
//! ```bash
//! qpadapt simulate --deployment live --seconds 130
//! qpadapt simulate --deployment live --profile 121:2.6M,10:14.5M --json
//! qpadapt presets --json
//! ```

mod profile;
mod simulate;

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use qpadapt::{Deployment, Preset, ResolutionTier, SessionConfig};

use crate::profile::{Profile, parse_bitrate};

#[derive(Parser, Debug)]
#[command(
    name = "qpadapt",
    version,
    about = "Adaptive QP-delta rate control simulator",
    arg_required_else_help = true
)]
struct Cli {
    /// More log output on stderr (-v debug, -vv trace). RUST_LOG wins.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a session against a synthetic encoder and print every window.
    Simulate(SimulateArgs),
    /// Print the built-in resolution presets.
    Presets(PresetsArgs),
}

#[derive(Args, Debug)]
struct SimulateArgs {
    /// Session config as JSON; flags below override its fields.
    #[arg(long = "config")]
    config: Option<PathBuf>,

    #[arg(long = "width")]
    width: Option<u32>,

    #[arg(long = "height")]
    height: Option<u32>,

    #[arg(long = "fps")]
    fps: Option<u32>,

    /// Requested bitrate, e.g. 3M or 2500k.
    #[arg(long = "bitrate", value_parser = parse_bitrate_arg)]
    bitrate: Option<u32>,

    #[arg(long = "deployment", value_enum)]
    deployment: Option<DeploymentArg>,

    #[arg(long = "tier", value_enum, default_value_t = TierArg::Auto)]
    tier: TierArg,

    /// Run length when no profile is given.
    #[arg(long = "seconds", default_value_t = 10)]
    seconds: u64,

    /// Encoder output as SECS:BITS segments, e.g. 30:2.6M,5:14.5M.
    /// Defaults to producing exactly the requested bitrate.
    #[arg(long = "profile")]
    profile: Option<String>,

    #[arg(long = "json", default_value_t = false)]
    json: bool,
}

#[derive(Args, Debug)]
struct PresetsArgs {
    #[arg(long = "json", default_value_t = false)]
    json: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DeploymentArg {
    Desktop,
    Live,
}

impl From<DeploymentArg> for Deployment {
    fn from(arg: DeploymentArg) -> Self {
        match arg {
            DeploymentArg::Desktop => Deployment::Desktop,
            DeploymentArg::Live => Deployment::LiveStream,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TierArg {
    Auto,
    #[value(name = "sub1080")]
    Sub1080,
    #[value(name = "hd1080")]
    Hd1080,
}

impl TierArg {
    fn resolve(self) -> Option<ResolutionTier> {
        match self {
            TierArg::Auto => None,
            TierArg::Sub1080 => Some(ResolutionTier::Sub1080),
            TierArg::Hd1080 => Some(ResolutionTier::Hd1080),
        }
    }
}

fn parse_bitrate_arg(s: &str) -> Result<u32, String> {
    let bits = parse_bitrate(s).map_err(|e| e.to_string())?;
    u32::try_from(bits).map_err(|_| format!("bitrate out of range: {s}"))
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn session_config(args: &SimulateArgs) -> Result<SessionConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => SessionConfig::default(),
    };

    if let Some(width) = args.width {
        config.controller.width = width;
    }
    if let Some(height) = args.height {
        config.controller.height = height;
    }
    if let Some(fps) = args.fps {
        config.controller.fps = fps;
    }
    if let Some(bitrate) = args.bitrate {
        config.initial_bitrate = bitrate;
    }
    if let Some(deployment) = args.deployment {
        config.controller.deployment = deployment.into();
    }
    if args.tier != TierArg::Auto {
        config.controller.tier = args.tier.resolve();
    }

    config.validate()?;
    Ok(config)
}

fn run_simulate(args: SimulateArgs) -> Result<()> {
    let config = session_config(&args)?;
    let profile = match &args.profile {
        Some(text) => Profile::parse(text)?,
        None => Profile::constant(
            Duration::from_secs(args.seconds),
            u64::from(config.initial_bitrate),
        ),
    };

    let summary = simulate::run(&config, config.initial_bitrate, &profile, args.json)?;
    if !args.json {
        println!(
            "{} frames, {} windows, {} adjustments, baselines {}/{}/{}",
            summary.frames,
            summary.windows,
            summary.adjustments,
            summary.baselines.low,
            summary.baselines.medium,
            summary.baselines.high,
        );
    }
    Ok(())
}

#[derive(Serialize)]
struct PresetEntry {
    tier: ResolutionTier,
    preset: Preset,
}

fn run_presets(args: PresetsArgs) -> Result<()> {
    let entries: Vec<PresetEntry> = [ResolutionTier::Sub1080, ResolutionTier::Hd1080]
        .into_iter()
        .map(|tier| PresetEntry {
            tier,
            preset: tier.preset(),
        })
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for PresetEntry { tier, preset } in &entries {
        let w = &preset.watermarks;
        println!("{tier:?}");
        println!(
            "  watermarks  low={} medium={} rated={} high={} ex_high={}",
            w.low, w.medium, w.rated, w.high, w.ex_high
        );
        println!(
            "  thresholds  {}..={}  spatial offset {}",
            preset.min_threshold, preset.max_threshold, preset.spatial_offset
        );
        println!(
            "  baselines   low={} medium={} high={}",
            preset.baselines.low, preset.baselines.medium, preset.baselines.high
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Simulate(args) => run_simulate(args),
        Commands::Presets(args) => run_presets(args),
    }
}
