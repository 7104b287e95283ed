//! display-tracker - display configuration tracking demo
//!
//! Builds an in-memory platform from the configuration, tracks it, replays the
//! scripted `[[events]]` and logs every change notification.

use anyhow::{Context, Result};
use clap::Parser;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use display_tracker::config::{Config, LoggingConfig, ScriptedEvent};
use display_tracker::controller::DisplayController;
use display_tracker::display::{ChangeFlags, DisplayId, Info};
use display_tracker::platform::StaticPlatform;

/// Command-line arguments for display-tracker
#[derive(Parser, Debug)]
#[command(name = "display-tracker")]
#[command(version, about = "Display configuration tracker", long_about = None)]
pub struct Args {
    /// Configuration file path (built-in single-display defaults if omitted)
    #[arg(short, long, env = "DISPLAY_TRACKER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbose logging (can be specified multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log format (json|pretty|compact)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Write logs to file (in addition to stderr)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Print every snapshot and change notification as JSON on stdout
    #[arg(long)]
    pub dump_json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Configuration decides the log setup, so load it first and report later
    let (config, load_error) = match &args.config {
        Some(path) => match Config::load(path) {
            Ok(config) => (config, None),
            Err(e) => (Config::default_config()?, Some(e)),
        },
        None => (Config::default_config()?, None),
    };
    let config = config.with_overrides(args.verbose, args.log_format.clone(), args.log_file.clone());

    init_logging(&config.logging)?;

    info!("════════════════════════════════════════════════════════");
    info!("  display-tracker v{}", env!("CARGO_PKG_VERSION"));
    info!("  Profile: {}", if cfg!(debug_assertions) { "debug" } else { "release" });
    info!("════════════════════════════════════════════════════════");

    if let Some(e) = load_error {
        warn!("Failed to load config: {:#}, using defaults", e);
    }
    debug!("Config: {:?}", config);

    let platform = Arc::new(StaticPlatform::from_config(&config.displays));
    let controller = DisplayController::new(platform.clone(), config.controller.clone())
        .context("Failed to start display controller")?;

    let dump_json = args.dump_json;
    controller.set_priority_listener(|display_id, info, flags| {
        info!(
            "Profile update for {} [{}]: {} at {}, scale {:.2}",
            display_id,
            flags,
            info.current_bounds.size(),
            info.rotation,
            info.scale_factor()
        );
    });

    // Listen on every display the script may touch, tracked or not yet
    let mut displays: BTreeSet<DisplayId> = config.displays.iter().map(|d| d.display_id()).collect();
    displays.extend(config.events.iter().filter_map(ScriptedEvent::display));
    for display_id in displays {
        controller.add_listener(display_id, move |display_id, info, flags| {
            report_change(display_id, info, flags, dump_json);
        });
    }

    if dump_json {
        for display_id in controller.tracked_displays() {
            if let Some(info) = controller.info(display_id) {
                print_json(&serde_json::json!({ "display": display_id, "info": info.as_ref() }));
            }
        }
    }

    info!("Replaying {} scripted event(s)", config.events.len());
    for (index, event) in config.events.iter().enumerate() {
        debug!("Event #{}: {:?}", index, event);
        if !platform.apply(event) {
            warn!("Event #{} had no effect: {:?}", index, event);
        }
        controller.flush();
    }

    for display_id in controller.tracked_displays() {
        if let Some(info) = controller.info(display_id) {
            info!(
                "{}: {} at {}, {} dpi, {} supported bounds",
                display_id,
                info.current_bounds.size(),
                info.rotation,
                info.density_dpi,
                info.supported_bounds.len()
            );
        }
    }

    controller.close()?;
    info!("display-tracker shut down");
    Ok(())
}

fn report_change(display_id: DisplayId, info: &Info, flags: ChangeFlags, dump_json: bool) {
    if dump_json {
        print_json(&serde_json::json!({
            "display": display_id,
            "changes": flags,
            "info": info,
        }));
    } else {
        info!(
            "{} changed [{}]: {} at {}, {} dpi, font scale {}, night mode {}",
            display_id,
            flags,
            info.current_bounds.size(),
            info.rotation,
            info.density_dpi,
            info.font_scale,
            info.night_mode
        );
    }
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string(value) {
        Ok(line) => println!("{}", line),
        Err(e) => warn!("Failed to serialize snapshot: {}", e),
    }
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    use std::fs::File;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "display_tracker={level},warn",
            level = logging.level
        ))
    });

    // If log file is specified, write to both stderr and file
    if let Some(log_file_path) = &logging.file {
        let file = File::create(log_file_path)
            .with_context(|| format!("Failed to create log file: {}", log_file_path.display()))?;

        match logging.format.as_str() {
            "json" => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_writer(std::io::stderr),
                    )
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_writer(file)
                            .with_ansi(false),
                    )
                    .init();
            }
            "compact" => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .compact()
                            .with_writer(std::io::stderr),
                    )
                    .with(
                        tracing_subscriber::fmt::layer()
                            .compact()
                            .with_writer(file)
                            .with_ansi(false),
                    )
                    .init();
            }
            _ => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .pretty()
                            .with_writer(std::io::stderr),
                    )
                    .with(
                        tracing_subscriber::fmt::layer()
                            .with_writer(file)
                            .with_ansi(false),
                    )
                    .init();
            }
        }
        info!("Logging to file: {}", log_file_path.display());
    } else {
        // Stderr only; stdout carries --dump-json output
        match logging.format.as_str() {
            "json" => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                    .init();
            }
            "compact" => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
                    .init();
            }
            _ => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                    .init();
            }
        }
    }

    Ok(())
}
