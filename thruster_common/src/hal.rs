//! Driver contracts, data model and configuration.
//!
//! - [`types`] - Modes, thruster state, vehicle snapshot, sensor frames
//! - [`interface`] - Interface names and index-based handles
//! - [`driver`] - `SystemInterface`, `ForwardDynamics`, `SensorSource`, errors
//! - [`config`] - `VehicleConfig` and its validation

pub mod config;
pub mod driver;
pub mod interface;
pub mod types;
