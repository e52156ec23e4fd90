//! Driver data model.
//!
//! - `ModeState` - Active control mode of one thruster
//! - `ThrusterState` / `ThrusterCommand` - Per-thruster state and host commands
//! - `VehicleSnapshot` - Unit of atomic update per cycle
//! - `ThrusterInput` - Per-thruster input handed to the dynamics model
//! - `SensorFrame` / `ThrusterFeedback` - Raw feedback from the sensor collaborator
//! - `LifecycleState` - Host lifecycle state passed to activate/deactivate

use std::fmt;

/// Control mode of a single thruster.
///
/// Exactly one mode is active per thruster at any instant. Only the
/// command field matching the active mode is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ModeState {
    /// Powered but not commanded. Initial mode.
    #[default]
    Standby,
    /// Output disabled.
    Disable,
    /// Position setpoint control.
    Position,
    /// Velocity setpoint control.
    Velocity,
    /// Motor current control.
    Current,
    /// Unactuated; the thruster evolves freely under the dynamics model.
    FreeExcite,
    /// Effort (force/torque) control.
    Effort,
}

impl ModeState {
    /// Every mode, in declaration order.
    pub const ALL: [ModeState; 7] = [
        Self::Standby,
        Self::Disable,
        Self::Position,
        Self::Velocity,
        Self::Current,
        Self::FreeExcite,
        Self::Effort,
    ];

    /// True for modes whose command field drives the dynamics.
    #[inline]
    pub const fn is_actuated(self) -> bool {
        matches!(
            self,
            Self::Position | Self::Velocity | Self::Current | Self::Effort
        )
    }

    /// Lowercase name as used in logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Standby => "standby",
            Self::Disable => "disable",
            Self::Position => "position",
            Self::Velocity => "velocity",
            Self::Current => "current",
            Self::FreeExcite => "free_excite",
            Self::Effort => "effort",
        }
    }
}

impl fmt::Display for ModeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latest values written by the host through command interfaces.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ThrusterCommand {
    /// Commanded position.
    pub position: f64,
    /// Commanded velocity.
    pub velocity: f64,
    /// Commanded motor current.
    pub current: f64,
    /// Commanded effort.
    pub effort: f64,
}

impl ThrusterCommand {
    /// Command value that is authoritative in `mode`, if the mode has one.
    #[inline]
    pub const fn value_for(&self, mode: ModeState) -> Option<f64> {
        match mode {
            ModeState::Position => Some(self.position),
            ModeState::Velocity => Some(self.velocity),
            ModeState::Current => Some(self.current),
            ModeState::Effort => Some(self.effort),
            ModeState::Standby | ModeState::Disable | ModeState::FreeExcite => None,
        }
    }
}

/// State of one thruster/joint.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ThrusterState {
    /// Last known or simulated position.
    pub position: f64,
    /// Last known or simulated velocity.
    pub velocity: f64,
    /// Last known or simulated effort.
    pub effort: f64,
    /// Last known or simulated motor current.
    pub current: f64,
    /// Host-written commands. Not a dynamics output.
    pub command: ThrusterCommand,
}

impl ThrusterState {
    /// Seed every command field from the current state.
    pub fn hold_current_state(&mut self) {
        self.command = ThrusterCommand {
            position: self.position,
            velocity: self.velocity,
            current: self.current,
            effort: self.effort,
        };
    }

    fn first_non_finite(&self) -> Option<&'static str> {
        [
            ("position", self.position),
            ("velocity", self.velocity),
            ("effort", self.effort),
            ("current", self.current),
        ]
        .into_iter()
        .find(|(_, v)| !v.is_finite())
        .map(|(name, _)| name)
    }
}

/// Full vehicle state, updated as one unit per cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VehicleSnapshot {
    /// Per-thruster state, index-addressable.
    pub thrusters: Vec<ThrusterState>,
    /// Vehicle-level sensor readings and derived quantities.
    pub sensors: Vec<f64>,
}

impl VehicleSnapshot {
    /// Zeroed snapshot for `thrusters` thrusters and `sensors` sensor channels.
    pub fn new(thrusters: usize, sensors: usize) -> Self {
        Self {
            thrusters: vec![ThrusterState::default(); thrusters],
            sensors: vec![0.0; sensors],
        }
    }

    /// Locate the first non-finite state value, if any.
    ///
    /// Command fields are not inspected.
    pub fn first_non_finite(&self) -> Option<String> {
        for (idx, thruster) in self.thrusters.iter().enumerate() {
            if let Some(field) = thruster.first_non_finite() {
                return Some(format!("thruster {idx} {field}"));
            }
        }
        self.sensors
            .iter()
            .position(|v| !v.is_finite())
            .map(|idx| format!("sensor {idx}"))
    }

    /// True if both snapshots have the same thruster and sensor counts.
    #[inline]
    pub fn same_shape(&self, other: &VehicleSnapshot) -> bool {
        self.thrusters.len() == other.thrusters.len() && self.sensors.len() == other.sensors.len()
    }
}

/// Per-thruster input assembled by the cycle driver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrusterInput {
    /// Mode that selected `value`.
    pub mode: ModeState,
    /// Authoritative command value; 0.0 for unactuated modes.
    pub value: f64,
}

impl ThrusterInput {
    /// Build the input for `mode` from the host's command fields.
    pub fn select(mode: ModeState, command: &ThrusterCommand) -> Self {
        Self {
            mode,
            value: command.value_for(mode).unwrap_or(0.0),
        }
    }
}

/// Raw feedback for one thruster. `None` keeps the current value.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ThrusterFeedback {
    /// Measured position.
    pub position: Option<f64>,
    /// Measured velocity.
    pub velocity: Option<f64>,
    /// Measured motor current.
    pub current: Option<f64>,
}

/// One sample from the sensor collaborator.
///
/// Each vector is either empty (no feedback of that kind) or holds exactly
/// one entry per thruster / sensor channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorFrame {
    /// Per-thruster feedback.
    pub thrusters: Vec<ThrusterFeedback>,
    /// Vehicle-level sensor readings.
    pub sensors: Vec<f64>,
}

/// Host lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LifecycleState {
    /// Constructed, `on_init` not yet successful.
    #[default]
    Unconfigured,
    /// Initialized, not cycling.
    Inactive,
    /// Cycling; `read`/`write` allowed.
    Active,
    /// Torn down.
    Finalized,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unconfigured => "unconfigured",
            Self::Inactive => "inactive",
            Self::Active => "active",
            Self::Finalized => "finalized",
        };
        f.write_str(s)
    }
}
