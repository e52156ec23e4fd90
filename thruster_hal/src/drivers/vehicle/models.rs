//! Built-in forward-dynamics models.
//!
//! - `IdentityDynamics` - Next state equals the commanded setpoint
//! - `FirstOrderDynamics` - Exponential lag toward the setpoint with drag
//!
//! Both are pure functions of their arguments and stay bounded for any
//! finite positive timestep.

use thruster_common::hal::driver::{DynamicsError, ForwardDynamics};
use thruster_common::hal::types::{ModeState, ThrusterInput, ThrusterState, VehicleSnapshot};

/// Next state equals the commanded setpoint of every actuated thruster.
///
/// Unactuated thrusters and sensor channels pass through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityDynamics;

impl ForwardDynamics for IdentityDynamics {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn step(
        &self,
        snapshot: &VehicleSnapshot,
        inputs: &[ThrusterInput],
        _dt: f64,
    ) -> Result<VehicleSnapshot, DynamicsError> {
        let mut next = snapshot.clone();
        for (state, input) in next.thrusters.iter_mut().zip(inputs) {
            match input.mode {
                ModeState::Position => state.position = input.value,
                ModeState::Velocity => state.velocity = input.value,
                ModeState::Current => state.current = input.value,
                ModeState::Effort => state.effort = input.value,
                ModeState::Standby | ModeState::Disable | ModeState::FreeExcite => {}
            }
        }
        Ok(next)
    }
}

/// First-order thruster model.
///
/// The commanded quantity approaches its setpoint with `time_constant`.
/// Velocity integrates effort against linear `drag`; position integrates
/// velocity. Unactuated thrusters coast while effort and current decay.
#[derive(Debug, Clone, Copy)]
pub struct FirstOrderDynamics {
    /// Setpoint tracking time constant in seconds.
    pub time_constant: f64,
    /// Linear drag coefficient in 1/s.
    pub drag: f64,
}

impl Default for FirstOrderDynamics {
    fn default() -> Self {
        Self {
            time_constant: 0.1,
            drag: 1.0,
        }
    }
}

impl FirstOrderDynamics {
    fn coast(&self, state: &mut ThrusterState, dt: f64) {
        state.velocity = (state.velocity + state.effort * dt) / (1.0 + self.drag * dt);
        state.position += state.velocity * dt;
    }

    fn advance(&self, state: &mut ThrusterState, input: &ThrusterInput, dt: f64) {
        let alpha = 1.0 - (-dt / self.time_constant).exp();
        match input.mode {
            ModeState::Position => {
                let previous = state.position;
                state.position += (input.value - state.position) * alpha;
                state.velocity = (state.position - previous) / dt;
            }
            ModeState::Velocity => {
                state.velocity += (input.value - state.velocity) * alpha;
                state.position += state.velocity * dt;
            }
            ModeState::Effort => {
                state.effort += (input.value - state.effort) * alpha;
                state.current = state.effort;
                self.coast(state, dt);
            }
            ModeState::Current => {
                state.current += (input.value - state.current) * alpha;
                state.effort = state.current;
                self.coast(state, dt);
            }
            ModeState::Standby | ModeState::Disable | ModeState::FreeExcite => {
                state.effort -= state.effort * alpha;
                state.current -= state.current * alpha;
                self.coast(state, dt);
            }
        }
    }
}

impl ForwardDynamics for FirstOrderDynamics {
    fn name(&self) -> &'static str {
        "first_order"
    }

    fn step(
        &self,
        snapshot: &VehicleSnapshot,
        inputs: &[ThrusterInput],
        dt: f64,
    ) -> Result<VehicleSnapshot, DynamicsError> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(DynamicsError::MalformedInput(format!("timestep {dt}")));
        }
        let mut next = snapshot.clone();
        for (state, input) in next.thrusters.iter_mut().zip(inputs) {
            self.advance(state, input, dt);
        }
        Ok(next)
    }
}
