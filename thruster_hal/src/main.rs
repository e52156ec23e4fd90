//! # Thruster HAL Binary
//!
//! Runs the multi-thruster vehicle driver at a fixed control period.
//!
//! # Usage
//!
//! ```bash
//! # Four index-named thrusters, identity dynamics
//! thruster_hal --thrusters 4 --start 2/velocity --set 2/velocity=1.5 --cycles 100
//!
//! # Vehicle layout and model from a file, verbose JSON logs
//! thruster_hal --config vehicle.toml -v --json
//! ```

use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use thruster_common::config::{ConfigLoader, LogLevel};
use thruster_common::consts::DEFAULT_CONFIG_PATH;
use thruster_common::hal::interface::StateSlot;
use thruster_hal::config::SystemConfig;
use thruster_hal::core::HalCore;
use thruster_hal::drivers::vehicle::{SimulatedSensor, VehicleSystemDriver};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Thruster HAL - multi-thruster vehicle driver
#[derive(Parser, Debug)]
#[command(name = "thruster_hal")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Multi-thruster vehicle driver with control-mode switching")]
#[command(long_about = None)]
struct Args {
    /// Path to the vehicle configuration file (TOML).
    /// Defaults to /etc/thruster_hal/vehicle.toml when that file exists.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of index-named thrusters when no config file is found
    #[arg(short = 'n', long, default_value_t = 4)]
    thrusters: usize,

    /// Command interface to start before the loop (repeatable)
    #[arg(long = "start", value_name = "IFACE", action = clap::ArgAction::Append)]
    start: Vec<String>,

    /// Initial command value as IFACE=VALUE (repeatable)
    #[arg(long = "set", value_name = "IFACE=VALUE", value_parser = parse_assignment, action = clap::ArgAction::Append)]
    set: Vec<(String, f64)>,

    /// Stop after this many cycles (default: run until Ctrl-C)
    #[arg(long)]
    cycles: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn parse_assignment(s: &str) -> Result<(String, f64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected IFACE=VALUE, got '{s}'"))?;
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|e| format!("invalid value in '{s}': {e}"))?;
    if !value.is_finite() {
        return Err(format!("value in '{s}' must be finite"));
    }
    Ok((name.trim().to_string(), value))
}

/// Explicit `--config`, else `fallback` if it exists.
fn config_path(explicit: Option<PathBuf>, fallback: &Path) -> Option<PathBuf> {
    explicit.or_else(|| fallback.exists().then(|| fallback.to_path_buf()))
}

fn main() {
    if let Err(e) = run() {
        error!("Thruster HAL failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config_path = config_path(args.config.clone(), Path::new(DEFAULT_CONFIG_PATH));
    let config = match &config_path {
        Some(path) => SystemConfig::load_validated(path),
        None => Ok(SystemConfig::with_thruster_count(args.thrusters)),
    };
    let log_level = config
        .as_ref()
        .map(|c| c.shared.log_level)
        .unwrap_or_default();
    setup_tracing(&args, log_level);
    let config = config?;

    info!(
        "{} v{} starting...",
        config.shared.service_name,
        env!("CARGO_PKG_VERSION")
    );

    let model = config.dynamics.build()?;
    let driver = VehicleSystemDriver::new(model, Box::new(SimulatedSensor));
    let cancel = driver.cancel_handle();
    let mut hal_core = HalCore::new(config, Box::new(driver))?;

    let running = hal_core.running_flag();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        running.store(false, Ordering::SeqCst);
        cancel.cancel();
    })?;

    hal_core.init()?;
    hal_core.activate()?;

    if !args.start.is_empty() {
        hal_core.switch_modes(&args.start, &[])?;
        info!("Started interfaces {:?}", args.start);
    }
    for (name, value) in &args.set {
        hal_core.set_command(name, *value)?;
    }

    if let Err(e) = hal_core.run(args.cycles) {
        error!("Control loop error: {}", e);
    }

    report_state(&hal_core);
    hal_core.shutdown()?;

    info!("Thruster HAL shutdown complete");
    Ok(())
}

/// Log final thruster state and diagnostics.
fn report_state(hal_core: &HalCore) {
    for handle in hal_core.state_interfaces() {
        if let (StateSlot::Thruster { .. }, Some(value)) =
            (handle.slot, hal_core.driver().state_value(handle))
        {
            info!("{} = {}", handle.name, value);
        }
    }
    if let Some(diag) = hal_core.diagnostics() {
        info!(
            "Diagnostics: {} cycles, {} read failures, {} write failures, last error: {}",
            diag.cycle_count,
            diag.read_failures,
            diag.write_failures,
            diag.last_error.as_deref().unwrap_or("none")
        );
    }
}

/// Setup tracing subscriber based on CLI arguments.
fn setup_tracing(args: &Args, level: LogLevel) {
    let directive = if args.verbose {
        LogLevel::Debug.as_directive()
    } else {
        level.as_directive()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
