//! Driver contracts and error types.
//!
//! This module defines:
//! - `SystemInterface` trait - Capability set the host drives each period
//! - `ForwardDynamics` trait - Opaque `(state, inputs, dt) -> next_state` model
//! - `SensorSource` trait - Raw feedback collaborator consumed by `read`
//! - `HardwareError` / `IoError` / `DynamicsError` / `SwitchRejection`
//! - `DriverDiagnostics` struct - Optional per-driver counters

use crate::hal::config::VehicleConfig;
use crate::hal::interface::{CommandField, CommandInterface, StateInterface};
use crate::hal::types::{LifecycleState, SensorFrame, ThrusterInput, VehicleSnapshot};
use std::time::Duration;
use thiserror::Error;

/// Reason a thruster's part of a mode-switch batch was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SwitchRejection {
    /// Two exclusive interfaces would be active after the switch.
    #[error("{first} and {second} cannot both be active")]
    TwoActiveInterfaces {
        /// First exclusive interface.
        first: CommandField,
        /// Second exclusive interface.
        second: CommandField,
    },
    /// A new interface was started without stopping the active one.
    #[error("starting {requested} requires stopping active {active}")]
    ActiveInterfaceNotStopped {
        /// Interface currently claimed.
        active: CommandField,
        /// Interface requested to start.
        requested: CommandField,
    },
    /// The thruster does not declare the interface.
    #[error("{0} is not declared for this thruster")]
    InterfaceNotDeclared(CommandField),
}

/// Sensor read failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IoError {
    /// Sampling exceeded the read budget.
    #[error("sensor read took {elapsed:?} (budget {budget:?})")]
    Timeout {
        /// Time spent sampling.
        elapsed: Duration,
        /// Allowed budget.
        budget: Duration,
    },
    /// The collaborator reported a failure.
    #[error("sensor failure: {0}")]
    Sensor(String),
    /// Frame does not match the configured layout.
    #[error("sensor frame has {got} {what} entries, expected {expected}")]
    FrameMismatch {
        /// Which part of the frame.
        what: &'static str,
        /// Configured count.
        expected: usize,
        /// Received count.
        got: usize,
    },
    /// Non-finite sample.
    #[error("non-finite sample at {0}")]
    InvalidSample(String),
}

/// Forward-dynamics failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DynamicsError {
    /// The model produced NaN or infinity.
    #[error("numeric divergence at {0}")]
    NumericDivergence(String),
    /// The evaluation overran its deadline.
    #[error("evaluation exceeded {0:?}")]
    Timeout(Duration),
    /// Inputs rejected before evaluation.
    #[error("malformed input: {0}")]
    MalformedInput(String),
    /// Result has the wrong shape.
    #[error("malformed output: {0}")]
    MalformedOutput(String),
    /// Evaluation aborted by deactivation.
    #[error("evaluation cancelled")]
    Cancelled,
    /// The solver failed or is unavailable.
    #[error("solver failure: {0}")]
    Solver(String),
}

/// Error returned by every `SystemInterface` operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HardwareError {
    /// Mode-switch batch rejected; no mode changed.
    #[error("conflicting interfaces for thruster {thruster}: {reason}")]
    ConflictingInterfaces {
        /// Offending thruster name.
        thruster: String,
        /// Why it was rejected.
        reason: SwitchRejection,
    },
    /// Interface name not owned by this driver or malformed.
    #[error("unknown interface: {0}")]
    UnknownInterface(String),
    /// Write to a pseudo-interface or out-of-range handle.
    #[error("interface is not writable: {0}")]
    NotWritable(String),
    /// Sensor read failed; prior state retained.
    #[error(transparent)]
    Io(#[from] IoError),
    /// Dynamics evaluation failed; prior snapshot retained.
    #[error(transparent)]
    Dynamics(#[from] DynamicsError),
    /// Interface declaration error. Fatal.
    #[error("initialization failed: {0}")]
    Initialization(String),
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
    /// Operation requires the active lifecycle state.
    #[error("driver is {0}, not active")]
    NotActive(LifecycleState),
    /// `perform` called without a matching `prepare`.
    #[error("no prepared mode switch matches this request")]
    SwitchNotPrepared,
}

impl HardwareError {
    /// True for errors that only fail the current cycle.
    pub const fn is_cycle_failure(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Dynamics(_))
    }
}

/// Optional driver diagnostics.
#[derive(Debug, Clone, Default)]
pub struct DriverDiagnostics {
    /// Completed write cycles.
    pub cycle_count: u64,
    /// Failed reads.
    pub read_failures: u64,
    /// Failed writes.
    pub write_failures: u64,
    /// Failures since the last fully successful cycle.
    pub consecutive_failures: u64,
    /// Text of the most recent failure.
    pub last_error: Option<String>,
}

/// Raw feedback collaborator.
pub trait SensorSource: Send {
    /// Sample fresh feedback, returning within `budget` or failing.
    ///
    /// Must never return stale data silently. The driver calls this from a
    /// worker thread and reports `IoError::Timeout` once `budget` elapses,
    /// so a source that blocks past it only loses that sample.
    fn sample(&mut self, budget: Duration) -> Result<SensorFrame, IoError>;
}

/// Opaque forward-dynamics model.
///
/// Pure with respect to its arguments: no memory between calls beyond what
/// is passed in `snapshot`.
pub trait ForwardDynamics: Send + 'static {
    /// Model identifier for logs.
    fn name(&self) -> &'static str;

    /// Compute the next snapshot.
    ///
    /// `inputs` holds one entry per thruster in snapshot order.
    fn step(
        &self,
        snapshot: &VehicleSnapshot,
        inputs: &[ThrusterInput],
        dt: f64,
    ) -> Result<VehicleSnapshot, DynamicsError>;
}

/// Capability set a host framework drives.
///
/// # Lifecycle
///
/// 1. `on_init()` - Validate config, declare interfaces
/// 2. `export_*()` - Hand handles to the host
/// 3. `on_activate()` - Enter the cycling state
/// 4. `read()` then `write()` - Once per period, never concurrently
/// 5. `on_deactivate()` - Leave the cycling state
///
/// Mode switches go through `prepare_command_mode_switch` (validate the
/// whole batch, stage) and `perform_command_mode_switch` (commit). Both
/// take `&mut self` and are therefore serialized with `write`.
pub trait SystemInterface: Send {
    /// Driver identifier.
    fn name(&self) -> &'static str;

    /// Current lifecycle state.
    fn lifecycle_state(&self) -> LifecycleState;

    /// Validate configuration and declare interfaces.
    ///
    /// # Errors
    /// `HardwareError::Initialization` for missing or duplicate interface
    /// declarations, `HardwareError::Config` for invalid parameters.
    fn on_init(&mut self, config: &VehicleConfig) -> Result<(), HardwareError>;

    /// Enter the active state.
    fn on_activate(&mut self, previous: LifecycleState) -> Result<(), HardwareError>;

    /// Leave the active state; every thruster returns to standby.
    fn on_deactivate(&mut self, previous: LifecycleState) -> Result<(), HardwareError>;

    /// One handle per declared state interface.
    fn export_state_interfaces(&self) -> Vec<StateInterface>;

    /// One handle per declared command interface.
    fn export_command_interfaces(&self) -> Vec<CommandInterface>;

    /// Validate a switch batch for all thrusters and stage it.
    fn prepare_command_mode_switch(
        &mut self,
        start_interfaces: &[String],
        stop_interfaces: &[String],
    ) -> Result<(), HardwareError>;

    /// Commit the batch staged by `prepare_command_mode_switch`.
    fn perform_command_mode_switch(
        &mut self,
        start_interfaces: &[String],
        stop_interfaces: &[String],
    ) -> Result<(), HardwareError>;

    /// Refresh sensor-backed state.
    fn read(&mut self, time: Duration, period: Duration) -> Result<(), HardwareError>;

    /// Apply active commands through the dynamics model.
    fn write(&mut self, time: Duration, period: Duration) -> Result<(), HardwareError>;

    /// Read the value behind a state handle.
    fn state_value(&self, handle: &StateInterface) -> Option<f64>;

    /// Write a command value through a command handle.
    fn set_command(&mut self, handle: &CommandInterface, value: f64) -> Result<(), HardwareError>;

    /// Driver-specific diagnostics.
    /// Default: None
    fn diagnostics(&self) -> Option<DriverDiagnostics> {
        None
    }
}
