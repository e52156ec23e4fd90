//! Per-thruster control-mode state machine and batch switching.
//!
//! Each thruster owns a `ThrusterModeMachine` that starts in STANDBY and
//! only changes through a committed switch. `ModeBank` validates a whole
//! batch across all thrusters before staging it, so a batch either changes
//! every requested thruster or none.

use thruster_common::hal::driver::SwitchRejection;
use thruster_common::hal::interface::CommandField;
use thruster_common::hal::types::ModeState;
use tracing::{debug, trace};

/// Outcome of validating one thruster's part of a switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchDecision {
    /// Switch is valid; mode after commit.
    Accept(ModeState),
    /// Switch is invalid.
    Reject(SwitchRejection),
}

/// Interfaces one thruster wants to start and stop controlling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThrusterRequest {
    /// Interfaces to start.
    pub start: Vec<CommandField>,
    /// Interfaces to stop.
    pub stop: Vec<CommandField>,
}

impl ThrusterRequest {
    /// True if the request names no interface.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start.is_empty() && self.stop.is_empty()
    }
}

/// Mode state machine of one thruster.
#[derive(Debug, Clone)]
pub struct ThrusterModeMachine {
    mode: ModeState,
    declared: Vec<CommandField>,
}

impl ThrusterModeMachine {
    /// Machine in STANDBY accepting only the `declared` interfaces.
    pub fn new(declared: Vec<CommandField>) -> Self {
        Self {
            mode: ModeState::Standby,
            declared,
        }
    }

    /// Active mode.
    #[inline]
    pub const fn mode(&self) -> ModeState {
        self.mode
    }

    /// Validate a switch without changing anything.
    ///
    /// Rules, in order:
    /// 1. Starting `disable` always wins if `disable` is declared; every
    ///    other start and stop for this thruster is dropped.
    /// 2. Every named interface must be declared.
    /// 3. At most one exclusive interface may be started.
    /// 4. Starting an exclusive interface requires stopping a different
    ///    active exclusive one in the same request.
    /// 5. Otherwise `standby` or an empty claim set yields STANDBY, and a
    ///    surviving claim keeps its mode.
    pub fn validate_switch(&self, start: &[CommandField], stop: &[CommandField]) -> SwitchDecision {
        if start.contains(&CommandField::Disable) {
            return if self.declared.contains(&CommandField::Disable) {
                SwitchDecision::Accept(ModeState::Disable)
            } else {
                SwitchDecision::Reject(SwitchRejection::InterfaceNotDeclared(
                    CommandField::Disable,
                ))
            };
        }

        if let Some(field) = start
            .iter()
            .chain(stop)
            .find(|f| !self.declared.contains(f))
        {
            return SwitchDecision::Reject(SwitchRejection::InterfaceNotDeclared(*field));
        }

        let remaining = CommandField::for_mode(self.mode).filter(|active| !stop.contains(active));

        let mut requested: Option<CommandField> = None;
        for &field in start.iter().filter(|f| f.is_exclusive()) {
            match requested {
                Some(first) if first != field => {
                    return SwitchDecision::Reject(SwitchRejection::TwoActiveInterfaces {
                        first,
                        second: field,
                    });
                }
                _ => requested = Some(field),
            }
        }

        if let Some(requested) = requested {
            if let Some(active) = remaining {
                if active.is_exclusive() && active != requested {
                    return SwitchDecision::Reject(SwitchRejection::ActiveInterfaceNotStopped {
                        active,
                        requested,
                    });
                }
            }
            return SwitchDecision::Accept(requested.mode());
        }

        if start.contains(&CommandField::Standby) {
            return SwitchDecision::Accept(ModeState::Standby);
        }

        SwitchDecision::Accept(remaining.map_or(ModeState::Standby, CommandField::mode))
    }

    /// Apply a validated mode.
    #[inline]
    pub fn commit_switch(&mut self, mode: ModeState) {
        self.mode = mode;
    }
}

/// Modes staged by a successful prepare.
#[derive(Debug, Clone, PartialEq)]
struct StagedSwitch {
    key: SwitchKey,
    modes: Vec<(usize, ModeState)>,
}

/// Order-independent identity of a switch request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchKey {
    start: Vec<String>,
    stop: Vec<String>,
}

impl SwitchKey {
    /// Normalize interface name lists.
    pub fn new(start: &[String], stop: &[String]) -> Self {
        fn normalized(names: &[String]) -> Vec<String> {
            let mut v = names.to_vec();
            v.sort();
            v.dedup();
            v
        }
        Self {
            start: normalized(start),
            stop: normalized(stop),
        }
    }
}

/// Mode machines of every thruster plus the staged batch.
#[derive(Debug, Clone)]
pub struct ModeBank {
    machines: Vec<ThrusterModeMachine>,
    staged: Option<StagedSwitch>,
}

impl ModeBank {
    /// One machine per entry of `declared`.
    pub fn new(declared: Vec<Vec<CommandField>>) -> Self {
        Self {
            machines: declared.into_iter().map(ThrusterModeMachine::new).collect(),
            staged: None,
        }
    }

    /// Number of thrusters.
    #[inline]
    pub fn len(&self) -> usize {
        self.machines.len()
    }

    /// True if no thrusters.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }

    /// Active mode of thruster `index`.
    pub fn mode(&self, index: usize) -> Option<ModeState> {
        self.machines.get(index).map(ThrusterModeMachine::mode)
    }

    /// Active modes in thruster order.
    pub fn modes(&self) -> impl Iterator<Item = ModeState> + '_ {
        self.machines.iter().map(ThrusterModeMachine::mode)
    }

    /// Modes of the staged batch, if any.
    pub fn staged_modes(&self) -> Option<&[(usize, ModeState)]> {
        self.staged.as_ref().map(|s| s.modes.as_slice())
    }

    /// Validate `requests` (indexed by thruster) and stage the result.
    ///
    /// On rejection nothing is staged and the previous staged batch is
    /// discarded. Returns the offending thruster index with the reason.
    pub fn prepare(
        &mut self,
        key: SwitchKey,
        requests: &[ThrusterRequest],
    ) -> Result<&[(usize, ModeState)], (usize, SwitchRejection)> {
        self.staged = None;

        let mut modes = Vec::new();
        for (index, request) in requests.iter().enumerate() {
            if request.is_empty() {
                continue;
            }
            let Some(machine) = self.machines.get(index) else {
                continue;
            };
            match machine.validate_switch(&request.start, &request.stop) {
                SwitchDecision::Accept(mode) => {
                    trace!("thruster {} switch accepted: {} -> {}", index, machine.mode(), mode);
                    modes.push((index, mode));
                }
                SwitchDecision::Reject(reason) => return Err((index, reason)),
            }
        }

        let staged = self.staged.insert(StagedSwitch { key, modes });
        Ok(staged.modes.as_slice())
    }

    /// Commit the staged batch if it was prepared for `key`.
    ///
    /// Returns the `(thruster, from, to)` changes applied, or `None` if
    /// nothing matching is staged.
    pub fn perform(&mut self, key: &SwitchKey) -> Option<Vec<(usize, ModeState, ModeState)>> {
        if self.staged.as_ref().is_none_or(|s| &s.key != key) {
            return None;
        }
        let staged = self.staged.take()?;

        let mut changes = Vec::with_capacity(staged.modes.len());
        for (index, mode) in staged.modes {
            if let Some(machine) = self.machines.get_mut(index) {
                let from = machine.mode();
                machine.commit_switch(mode);
                if from != mode {
                    changes.push((index, from, mode));
                }
            }
        }
        debug!("Committed mode switch, {} thrusters changed", changes.len());
        Some(changes)
    }

    /// Discard the staged batch, if any.
    pub fn clear_staged(&mut self) {
        self.staged = None;
    }

    /// Drop any staged batch and return every thruster to STANDBY.
    pub fn reset_all(&mut self) {
        self.staged = None;
        for machine in &mut self.machines {
            machine.commit_switch(ModeState::Standby);
        }
    }
}
