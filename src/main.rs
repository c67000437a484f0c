//! Sense Guardian CLI
//!
//! Runs the alert engine against the simulator or a recorded feed.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use sense_guardian::{
    config::Config,
    engine::Engine,
    source::{normalize, ReplayReader, SourceError},
    VERSION,
};
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[cfg(feature = "simulator")]
use chrono_tz::Tz;
#[cfg(feature = "simulator")]
use sense_guardian::core::{Channel, Notification};
#[cfg(feature = "simulator")]
use sense_guardian::engine::IngestOutcome;
#[cfg(feature = "simulator")]
use sense_guardian::source::{SimulatedSource, SimulatorConfig};
#[cfg(feature = "simulator")]
use std::collections::HashSet;
#[cfg(feature = "simulator")]
use std::sync::atomic::{AtomicBool, Ordering};
#[cfg(feature = "simulator")]
use std::sync::Arc;
#[cfg(feature = "simulator")]
use std::time::Duration;

#[derive(Parser)]
#[command(name = "sense-guardian")]
#[command(version = VERSION)]
#[command(about = "Anomaly detection and alert lifecycle engine for wearable safety sensors", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the engine against simulated readings until Ctrl+C
    #[cfg(feature = "simulator")]
    Run {
        /// Seconds between readings (overrides the configured tick interval)
        #[arg(long)]
        interval: Option<u64>,

        /// Seed for a reproducible random walk
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Replay a JSON-lines feed and print the resulting notifications
    Replay {
        /// Input file, or `-` for stdin
        path: String,
    },

    /// Print the canonical reading for one JSON payload
    Normalize {
        /// Raw payload as a JSON string
        payload: String,
    },

    /// Show configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        init: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: could not load config, using defaults: {e}");
            Config::default()
        }
    };
    init_tracing(&config.log_filter);

    match cli.command {
        #[cfg(feature = "simulator")]
        Commands::Run { interval, seed } => cmd_run(&config, interval, seed),
        Commands::Replay { path } => cmd_replay(&config, &path),
        Commands::Normalize { payload } => cmd_normalize(&payload),
        Commands::Config { init } => cmd_config(&config, init),
    }
}

fn init_tracing(fallback: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[cfg(feature = "simulator")]
fn cmd_run(config: &Config, interval: Option<u64>, seed: Option<u64>) -> Result<()> {
    let tz = config.timezone()?;
    let interval = interval
        .map(Duration::from_secs)
        .unwrap_or(config.tick_interval);
    if interval.is_zero() {
        bail!("--interval must be at least 1 second");
    }

    println!("Sense Guardian v{VERSION}");
    println!();
    println!("  Tick interval: {}s", interval.as_secs());
    if let Some(seed) = seed {
        println!("  Seed: {seed}");
    }
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let mut engine = Engine::new(config.thresholds.clone());
    println!("Instance ID: {}", engine.stats().instance_id());

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("Error setting Ctrl+C handler")?;

    let mut source = SimulatedSource::new(SimulatorConfig { interval, seed });
    source.start()?;
    let receiver = source.receiver().clone();

    let mut shown: HashSet<String> = HashSet::new();

    while running.load(Ordering::SeqCst) {
        match receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(event) => {
                let IngestOutcome::Processed(reading) = engine.process_event(&event) else {
                    continue;
                };

                let channels = [
                    (Channel::Heart, reading.heartbeat),
                    (Channel::Motion, reading.motion),
                    (Channel::Sound, reading.sound),
                ]
                .map(|(channel, value)| {
                    let status = engine
                        .channel_status(channel)
                        .map_or("-".to_string(), |s| s.to_string());
                    format!("{value:.1} {} ({status})", channel.unit())
                });
                println!(
                    "[{}] {} | {} | {}",
                    reading.observed_at.with_timezone(&tz).format("%H:%M:%S"),
                    channels.join(" | "),
                    reading.gps.address,
                    engine.system_status(),
                );
                print_changes(engine.current_notifications(), &mut shown, tz);
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                eprintln!("Simulator disconnected unexpectedly");
                break;
            }
        }
    }

    println!();
    println!("Stopping...");
    source.stop();
    engine.shutdown();

    println!();
    println!("{}", engine.stats().summary());
    Ok(())
}

/// Print notifications that appeared or went away since the last call.
#[cfg(feature = "simulator")]
fn print_changes(current: &[Notification], shown: &mut HashSet<String>, tz: Tz) {
    for n in current.iter().rev().filter(|n| !shown.contains(&n.id)) {
        let marker = if n.persistent { "!!" } else { "+" };
        println!(
            "  {marker} [{}] {} {}: {}",
            n.timestamp.with_timezone(&tz).format("%H:%M:%S"),
            n.kind,
            n.sensor,
            n.message
        );
    }

    let ids: HashSet<String> = current.iter().map(|n| n.id.clone()).collect();
    for gone in shown.difference(&ids) {
        println!("  - {gone}");
    }
    *shown = ids;
}

fn cmd_replay(config: &Config, path: &str) -> Result<()> {
    let input: Box<dyn BufRead> = if path == "-" {
        Box::new(BufReader::new(std::io::stdin()))
    } else {
        let path = PathBuf::from(path);
        let file =
            std::fs::File::open(&path).with_context(|| format!("Cannot open {path:?}"))?;
        Box::new(BufReader::new(file))
    };

    let mut engine = Engine::new(config.thresholds.clone());

    for event in ReplayReader::new(input) {
        match event {
            Ok(event) => {
                engine.process_event(&event);
            }
            Err(e @ SourceError::ParseError { .. }) => warn!("skipping line: {e}"),
            Err(e) => return Err(e.into()),
        }
    }
    engine.shutdown();

    println!("{}", serde_json::to_string_pretty(engine.current_notifications())?);
    eprintln!();
    eprintln!("{}", engine.stats().summary());
    Ok(())
}

fn cmd_normalize(payload: &str) -> Result<()> {
    let raw: serde_json::Value =
        serde_json::from_str(payload).context("Payload is not valid JSON")?;
    let Some(reading) = normalize(&raw, Utc::now()) else {
        bail!("No recognizable sensor fields in payload");
    };

    println!("{}", serde_json::to_string_pretty(&reading)?);
    if let Some(url) = reading.gps.maps_url() {
        println!("{url}");
    }
    Ok(())
}

fn cmd_config(config: &Config, init: bool) -> Result<()> {
    if init {
        config.save()?;
        println!("Wrote {:?}", Config::config_path());
        return Ok(());
    }

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
