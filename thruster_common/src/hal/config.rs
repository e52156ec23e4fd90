//! Vehicle driver configuration.
//!
//! - `VehicleConfig` - Timing parameters, sensor channels and thruster list
//! - `ThrusterConfig` - Per-thruster name and declared interfaces
//!
//! Immutable once `on_init` has accepted it.

use crate::consts::{
    DEFAULT_EVAL_TIMEOUT_US, DEFAULT_READ_TIMEOUT_US, INTERFACE_SEPARATOR, MAX_SENSORS,
    MAX_THRUSTERS, VEHICLE_PREFIX,
};
use crate::hal::driver::HardwareError;
use crate::hal::interface::{CommandField, StateField};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

fn default_slowdown() -> f64 {
    1.0
}

fn default_read_timeout_us() -> u64 {
    DEFAULT_READ_TIMEOUT_US
}

fn default_eval_timeout_us() -> u64 {
    DEFAULT_EVAL_TIMEOUT_US
}

/// Driver configuration, usually the `[vehicle]` table of the host config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleConfig {
    /// Wall-clock delay before activation completes, in seconds.
    #[serde(default)]
    pub hw_start_sec: f64,

    /// Wall-clock delay before deactivation completes, in seconds.
    #[serde(default)]
    pub hw_stop_sec: f64,

    /// Simulated time per wall time. The dynamics timestep is
    /// `period * hw_slowdown`.
    #[serde(default = "default_slowdown")]
    pub hw_slowdown: f64,

    /// Budget for one sensor read in microseconds.
    #[serde(default = "default_read_timeout_us")]
    pub read_timeout_us: u64,

    /// Budget for one dynamics evaluation in microseconds.
    #[serde(default = "default_eval_timeout_us")]
    pub eval_timeout_us: u64,

    /// Names of vehicle-level sensor channels.
    #[serde(default)]
    pub sensors: Vec<String>,

    /// Thrusters in index order.
    #[serde(default)]
    pub thrusters: Vec<ThrusterConfig>,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            hw_start_sec: 0.0,
            hw_stop_sec: 0.0,
            hw_slowdown: default_slowdown(),
            read_timeout_us: DEFAULT_READ_TIMEOUT_US,
            eval_timeout_us: DEFAULT_EVAL_TIMEOUT_US,
            sensors: Vec::new(),
            thrusters: Vec::new(),
        }
    }
}

impl VehicleConfig {
    /// Default layout with `count` thrusters named by their index.
    pub fn with_thruster_count(count: usize) -> Self {
        Self {
            thrusters: (0..count).map(|i| ThrusterConfig::new(i.to_string())).collect(),
            ..Self::default()
        }
    }

    /// Validate parameters and interface declarations.
    ///
    /// # Validation Rules
    /// 1. `hw_slowdown` finite and > 0
    /// 2. `hw_start_sec`, `hw_stop_sec` finite and >= 0
    /// 3. `read_timeout_us` and `eval_timeout_us` > 0
    /// 4. 1..=MAX_THRUSTERS thrusters, at most MAX_SENSORS sensors
    /// 5. Thruster and sensor names non-empty, separator-free and unique
    /// 6. Declared interfaces known, unique and non-empty per thruster
    pub fn validate(&self) -> Result<(), HardwareError> {
        if !self.hw_slowdown.is_finite() || self.hw_slowdown <= 0.0 {
            return Err(HardwareError::Config(format!(
                "hw_slowdown must be finite and > 0, got {}",
                self.hw_slowdown
            )));
        }

        for (name, value) in [
            ("hw_start_sec", self.hw_start_sec),
            ("hw_stop_sec", self.hw_stop_sec),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(HardwareError::Config(format!(
                    "{name} must be finite and >= 0, got {value}"
                )));
            }
        }

        for (name, value) in [
            ("read_timeout_us", self.read_timeout_us),
            ("eval_timeout_us", self.eval_timeout_us),
        ] {
            if value == 0 {
                return Err(HardwareError::Config(format!(
                    "{name} must be greater than 0"
                )));
            }
        }

        if self.thrusters.is_empty() {
            return Err(HardwareError::Initialization(
                "no thrusters declared".to_string(),
            ));
        }
        if self.thrusters.len() > MAX_THRUSTERS {
            return Err(HardwareError::Initialization(format!(
                "Too many thrusters: {} (max {})",
                self.thrusters.len(),
                MAX_THRUSTERS
            )));
        }
        if self.sensors.len() > MAX_SENSORS {
            return Err(HardwareError::Initialization(format!(
                "Too many sensors: {} (max {})",
                self.sensors.len(),
                MAX_SENSORS
            )));
        }

        let mut thruster_names = HashSet::new();
        for thruster in &self.thrusters {
            check_name("thruster", &thruster.name)?;
            if thruster.name == VEHICLE_PREFIX {
                return Err(HardwareError::Initialization(format!(
                    "thruster name '{VEHICLE_PREFIX}' is reserved"
                )));
            }
            if !thruster_names.insert(&thruster.name) {
                return Err(HardwareError::Initialization(format!(
                    "Duplicate thruster name: {}",
                    thruster.name
                )));
            }
            thruster.command_fields()?;
            thruster.state_fields()?;
        }

        let mut sensor_names = HashSet::new();
        for sensor in &self.sensors {
            check_name("sensor", sensor)?;
            if !sensor_names.insert(sensor) {
                return Err(HardwareError::Initialization(format!(
                    "Duplicate sensor name: {sensor}"
                )));
            }
        }

        Ok(())
    }

    /// Wall-clock activation delay.
    pub fn start_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.hw_start_sec).unwrap_or_default()
    }

    /// Wall-clock deactivation delay.
    pub fn stop_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.hw_stop_sec).unwrap_or_default()
    }

    /// Sensor read budget.
    pub fn read_timeout(&self) -> Duration {
        Duration::from_micros(self.read_timeout_us)
    }

    /// Dynamics evaluation deadline.
    pub fn eval_timeout(&self) -> Duration {
        Duration::from_micros(self.eval_timeout_us)
    }
}

fn check_name(kind: &str, name: &str) -> Result<(), HardwareError> {
    if name.is_empty() {
        return Err(HardwareError::Initialization(format!(
            "{kind} name cannot be empty"
        )));
    }
    if name.contains(INTERFACE_SEPARATOR) {
        return Err(HardwareError::Initialization(format!(
            "{kind} name '{name}' contains '{INTERFACE_SEPARATOR}'"
        )));
    }
    Ok(())
}

/// One thruster entry.
///
/// # TOML Example
///
/// ```toml
/// [[vehicle.thrusters]]
/// name = "thruster_3"
/// command_interfaces = ["velocity", "effort", "disable", "standby"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrusterConfig {
    /// Thruster name; prefix of its interface names.
    pub name: String,

    /// Declared command interfaces. All fields if omitted.
    #[serde(default)]
    pub command_interfaces: Option<Vec<String>>,

    /// Declared state interfaces. All fields if omitted.
    #[serde(default)]
    pub state_interfaces: Option<Vec<String>>,
}

impl ThrusterConfig {
    /// Thruster declaring every interface.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command_interfaces: None,
            state_interfaces: None,
        }
    }

    /// Resolve declared command interfaces.
    pub fn command_fields(&self) -> Result<Vec<CommandField>, HardwareError> {
        match &self.command_interfaces {
            None => Ok(CommandField::ALL.to_vec()),
            Some(names) => resolve(&self.name, "command", names, CommandField::parse),
        }
    }

    /// Resolve declared state interfaces.
    pub fn state_fields(&self) -> Result<Vec<StateField>, HardwareError> {
        match &self.state_interfaces {
            None => Ok(StateField::ALL.to_vec()),
            Some(names) => resolve(&self.name, "state", names, StateField::parse),
        }
    }
}

fn resolve<F: Copy + PartialEq>(
    thruster: &str,
    kind: &str,
    names: &[String],
    parse: fn(&str) -> Option<F>,
) -> Result<Vec<F>, HardwareError> {
    if names.is_empty() {
        return Err(HardwareError::Initialization(format!(
            "thruster {thruster} declares no {kind} interfaces"
        )));
    }
    let mut fields = Vec::with_capacity(names.len());
    for name in names {
        let field = parse(name).ok_or_else(|| {
            HardwareError::Initialization(format!(
                "thruster {thruster}: no {kind} interface '{name}'"
            ))
        })?;
        if fields.contains(&field) {
            return Err(HardwareError::Initialization(format!(
                "thruster {thruster}: duplicate {kind} interface '{name}'"
            )));
        }
        fields.push(field);
    }
    Ok(fields)
}
