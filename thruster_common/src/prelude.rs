//! Prelude module for common re-exports.
//!
//! ```rust
//! use thruster_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig, Validate};
pub use crate::hal::config::{ThrusterConfig, VehicleConfig};

// ─── Constants ──────────────────────────────────────────────────────
pub use crate::consts::{DEFAULT_CYCLE_TIME_US, MAX_THRUSTERS};

// ─── Contracts ──────────────────────────────────────────────────────
pub use crate::hal::driver::{
    DriverDiagnostics, DynamicsError, ForwardDynamics, HardwareError, IoError, SensorSource,
    SwitchRejection, SystemInterface,
};

// ─── Data model ─────────────────────────────────────────────────────
pub use crate::hal::interface::{
    CommandField, CommandInterface, StateField, StateInterface, StateSlot,
};
pub use crate::hal::types::{
    LifecycleState, ModeState, SensorFrame, ThrusterCommand, ThrusterFeedback, ThrusterInput,
    ThrusterState, VehicleSnapshot,
};
