//! Named state/command interfaces and their handles.
//!
//! Interface names follow `<thruster>/<field>` for per-thruster fields and
//! `vehicle/<sensor>` for vehicle-level sensor channels. Handles are
//! index-based: they name a slot in the driver's state store rather than
//! holding a reference into it.

use crate::consts::INTERFACE_SEPARATOR;
use crate::hal::types::ModeState;
use std::fmt;

/// Controllable field of a thruster.
///
/// The first four carry a value; `FreeExcite`, `Disable` and `Standby`
/// are mode-control pseudo-interfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandField {
    /// Position setpoint.
    Position,
    /// Velocity setpoint.
    Velocity,
    /// Motor current setpoint.
    Current,
    /// Effort setpoint.
    Effort,
    /// Release the thruster to free motion.
    FreeExcite,
    /// Disable output.
    Disable,
    /// Return to standby.
    Standby,
}

impl CommandField {
    /// Every command field, in export order.
    pub const ALL: [CommandField; 7] = [
        Self::Position,
        Self::Velocity,
        Self::Current,
        Self::Effort,
        Self::FreeExcite,
        Self::Disable,
        Self::Standby,
    ];

    /// Field name as it appears after the separator.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Position => "position",
            Self::Velocity => "velocity",
            Self::Current => "current",
            Self::Effort => "effort",
            Self::FreeExcite => "free_excite",
            Self::Disable => "disable",
            Self::Standby => "standby",
        }
    }

    /// Parse a field name.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == name)
    }

    /// Mode activated by claiming this interface.
    pub const fn mode(self) -> ModeState {
        match self {
            Self::Position => ModeState::Position,
            Self::Velocity => ModeState::Velocity,
            Self::Current => ModeState::Current,
            Self::Effort => ModeState::Effort,
            Self::FreeExcite => ModeState::FreeExcite,
            Self::Disable => ModeState::Disable,
            Self::Standby => ModeState::Standby,
        }
    }

    /// Interface claimed while `mode` is active, if any.
    pub const fn for_mode(mode: ModeState) -> Option<Self> {
        match mode {
            ModeState::Position => Some(Self::Position),
            ModeState::Velocity => Some(Self::Velocity),
            ModeState::Current => Some(Self::Current),
            ModeState::Effort => Some(Self::Effort),
            ModeState::FreeExcite => Some(Self::FreeExcite),
            ModeState::Disable => Some(Self::Disable),
            ModeState::Standby => None,
        }
    }

    /// True if the host may write a value through this interface.
    #[inline]
    pub const fn carries_value(self) -> bool {
        matches!(
            self,
            Self::Position | Self::Velocity | Self::Current | Self::Effort
        )
    }

    /// True for the mutually exclusive control interfaces.
    #[inline]
    pub const fn is_exclusive(self) -> bool {
        matches!(
            self,
            Self::Position | Self::Velocity | Self::Current | Self::Effort | Self::FreeExcite
        )
    }
}

impl fmt::Display for CommandField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exposed state field of a thruster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateField {
    /// Position.
    Position,
    /// Velocity.
    Velocity,
    /// Effort.
    Effort,
    /// Motor current.
    Current,
}

impl StateField {
    /// Every state field, in export order.
    pub const ALL: [StateField; 4] = [
        Self::Position,
        Self::Velocity,
        Self::Effort,
        Self::Current,
    ];

    /// Field name as it appears after the separator.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Position => "position",
            Self::Velocity => "velocity",
            Self::Effort => "effort",
            Self::Current => "current",
        }
    }

    /// Parse a field name.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == name)
    }
}

/// Location a state handle reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateSlot {
    /// A field of thruster `index`.
    Thruster {
        /// Thruster index.
        index: usize,
        /// Field within the thruster.
        field: StateField,
    },
    /// Vehicle-level sensor channel.
    Sensor(usize),
}

/// Read-only handle to one state value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StateInterface {
    /// Full interface name.
    pub name: String,
    /// Bound slot.
    pub slot: StateSlot,
}

/// Write handle to one command value or mode pseudo-interface.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommandInterface {
    /// Full interface name.
    pub name: String,
    /// Thruster index.
    pub thruster: usize,
    /// Controlled field.
    pub field: CommandField,
}

impl CommandInterface {
    /// Mode this interface activates when claimed.
    #[inline]
    pub const fn activates(&self) -> ModeState {
        self.field.mode()
    }
}

/// Join a prefix and field into an interface name.
pub fn interface_name(prefix: &str, field: &str) -> String {
    format!("{prefix}{INTERFACE_SEPARATOR}{field}")
}

/// Split `<prefix>/<field>` at the last separator.
pub fn split_interface_name(name: &str) -> Option<(&str, &str)> {
    let (prefix, field) = name.rsplit_once(INTERFACE_SEPARATOR)?;
    if prefix.is_empty() || field.is_empty() {
        return None;
    }
    Some((prefix, field))
}
