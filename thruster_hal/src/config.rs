//! Host configuration.
//!
//! # TOML Example
//!
//! ```toml
//! cycle_time_us = 10000
//!
//! [shared]
//! log_level = "info"
//! service_name = "thruster_hal"
//!
//! [dynamics]
//! model = "first_order"
//! time_constant = 0.05
//!
//! [vehicle]
//! hw_slowdown = 1.0
//! sensors = ["depth"]
//!
//! [[vehicle.thrusters]]
//! name = "port"
//!
//! [[vehicle.thrusters]]
//! name = "starboard"
//! command_interfaces = ["velocity", "disable", "standby"]
//! ```

use crate::drivers::vehicle::{FirstOrderDynamics, IdentityDynamics};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thruster_common::config::{ConfigError, SharedConfig, Validate};
use thruster_common::consts::DEFAULT_CYCLE_TIME_US;
use thruster_common::hal::config::VehicleConfig;
use thruster_common::hal::driver::{ForwardDynamics, HardwareError};

/// Forward-dynamics model selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum DynamicsConfig {
    /// Next state equals the commanded setpoint.
    #[default]
    Identity,
    /// Exponential lag toward the setpoint.
    FirstOrder {
        /// Tracking time constant in seconds.
        #[serde(default = "default_time_constant")]
        time_constant: f64,
        /// Linear drag coefficient in 1/s.
        #[serde(default = "default_drag")]
        drag: f64,
    },
}

fn default_time_constant() -> f64 {
    FirstOrderDynamics::default().time_constant
}

fn default_drag() -> f64 {
    FirstOrderDynamics::default().drag
}

impl DynamicsConfig {
    /// Check model parameters.
    pub fn validate(&self) -> Result<(), HardwareError> {
        match *self {
            Self::Identity => Ok(()),
            Self::FirstOrder {
                time_constant,
                drag,
            } => {
                if !time_constant.is_finite() || time_constant <= 0.0 {
                    return Err(HardwareError::Config(format!(
                        "time_constant must be finite and > 0, got {time_constant}"
                    )));
                }
                if !drag.is_finite() || drag < 0.0 {
                    return Err(HardwareError::Config(format!(
                        "drag must be finite and >= 0, got {drag}"
                    )));
                }
                Ok(())
            }
        }
    }

    /// Instantiate the selected model.
    pub fn build(&self) -> Result<Box<dyn ForwardDynamics>, HardwareError> {
        self.validate()?;
        Ok(match *self {
            Self::Identity => Box::new(IdentityDynamics),
            Self::FirstOrder {
                time_constant,
                drag,
            } => Box::new(FirstOrderDynamics {
                time_constant,
                drag,
            }),
        })
    }
}

/// Top-level configuration of the `thruster_hal` binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Logging and service identity.
    #[serde(default)]
    pub shared: SharedConfig,

    /// Control period in microseconds.
    #[serde(default = "default_cycle_time_us")]
    pub cycle_time_us: u64,

    /// Forward-dynamics model.
    #[serde(default)]
    pub dynamics: DynamicsConfig,

    /// Vehicle layout and timing.
    #[serde(default)]
    pub vehicle: VehicleConfig,
}

fn default_cycle_time_us() -> u64 {
    DEFAULT_CYCLE_TIME_US
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            shared: SharedConfig::default(),
            cycle_time_us: DEFAULT_CYCLE_TIME_US,
            dynamics: DynamicsConfig::default(),
            vehicle: VehicleConfig::default(),
        }
    }
}

impl SystemConfig {
    /// Default host configuration for `count` index-named thrusters.
    pub fn with_thruster_count(count: usize) -> Self {
        Self {
            vehicle: VehicleConfig::with_thruster_count(count),
            ..Self::default()
        }
    }

    /// Control period.
    #[inline]
    pub fn cycle_time(&self) -> Duration {
        Duration::from_micros(self.cycle_time_us)
    }
}

impl Validate for SystemConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        if self.cycle_time_us == 0 {
            return Err(ConfigError::ValidationError(
                "cycle_time_us must be > 0".to_string(),
            ));
        }
        self.dynamics
            .validate()
            .and_then(|()| self.vehicle.validate())
            .map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}
