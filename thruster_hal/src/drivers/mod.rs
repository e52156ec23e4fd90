//! Driver implementations.
//!
//! - [`vehicle`] - Multi-thruster vehicle driver over a forward-dynamics model

pub mod vehicle;

use crate::config::SystemConfig;
use thruster_common::hal::driver::{HardwareError, SensorSource, SystemInterface};
use vehicle::{SimulatedSensor, VehicleSystemDriver};

/// Build the vehicle driver for `config` with the given feedback source.
///
/// # Errors
/// Returns `Config` if the dynamics model parameters are invalid.
pub fn create_driver(
    config: &SystemConfig,
    sensor: Box<dyn SensorSource>,
) -> Result<Box<dyn SystemInterface>, HardwareError> {
    let model = config.dynamics.build()?;
    Ok(Box::new(VehicleSystemDriver::new(model, sensor)))
}

/// Build the vehicle driver in pure simulation (no external feedback).
pub fn create_simulated_driver(
    config: &SystemConfig,
) -> Result<Box<dyn SystemInterface>, HardwareError> {
    create_driver(config, Box::new(SimulatedSensor))
}
