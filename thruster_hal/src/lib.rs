//! # Thruster HAL Library
//!
//! Multi-thruster vehicle driver: per-thruster control-mode switching and
//! a fixed-period read/write cycle over a forward-dynamics model.
//!
//! The driver implements `SystemInterface` from
//! `thruster_common::hal::driver`; `HalCore` plays the host that calls it.
//!
//! # Module Structure
//!
//! - [`config`] - Host configuration (`SystemConfig`, model selection)
//! - [`core`] - HalCore struct, fixed-period loop management
//! - [`drivers`] - Driver implementations
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │  HalCore (fixed-period loop)                                   │
//! │     │  read() / write() / prepare + perform switch             │
//! │     ▼                                                          │
//! │  VehicleSystemDriver ──► ModeBank (one machine per thruster)   │
//! │     │            │                                             │
//! │     │            └─────► InterfaceTable (named handles)        │
//! │     ▼                                                          │
//! │  SensorSource      DynamicsEvaluator ──► ForwardDynamics       │
//! │                     (worker thread)                            │
//! └────────────────────────────────────────────────────────────────┘
//! ```

#![deny(missing_docs)]

pub mod config;
pub mod core;
pub mod drivers;

// Re-export key types for convenience
pub use crate::config::{DynamicsConfig, SystemConfig};
pub use crate::core::{CycleReport, HalCore};
pub use crate::drivers::vehicle::VehicleSystemDriver;
