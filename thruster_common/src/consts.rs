//! System-wide constants for the thruster driver workspace.
//!
//! Single source of truth for numeric limits, default timings and
//! interface naming. Imported by all crates.

/// Canonical service name (used for logging and the default config).
pub const SERVICE_NAME: &str = "thruster_hal";

/// Maximum number of thrusters one driver instance may own.
pub const MAX_THRUSTERS: usize = 64;

/// Maximum number of vehicle-level sensor channels.
pub const MAX_SENSORS: usize = 256;

/// Default control period in microseconds (100 Hz).
pub const DEFAULT_CYCLE_TIME_US: u64 = 10_000;

/// Default budget for one sensor read in microseconds.
pub const DEFAULT_READ_TIMEOUT_US: u64 = 2_000;

/// Default budget for one forward-dynamics evaluation in microseconds.
pub const DEFAULT_EVAL_TIMEOUT_US: u64 = 5_000;

/// Separator between thruster name and field in an interface name.
pub const INTERFACE_SEPARATOR: char = '/';

/// Prefix used for vehicle-level sensor state interfaces.
pub const VEHICLE_PREFIX: &str = "vehicle";

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/thruster_hal/vehicle.toml";
