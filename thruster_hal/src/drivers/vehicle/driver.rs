//! Vehicle system driver implementation.
//!
//! `VehicleSystemDriver` implements `SystemInterface` for a set of
//! thrusters: it owns the vehicle snapshot and the per-thruster mode
//! machines, refreshes sensor-backed state in `read`, and in `write` feeds
//! the mode-selected commands through the dynamics evaluator, replacing
//! the snapshot only when the evaluation succeeds.

use super::dynamics::{CancelToken, DynamicsEvaluator};
use super::interfaces::InterfaceTable;
use super::mode::{ModeBank, SwitchKey};
use super::models::IdentityDynamics;
use super::sensor::{SensorPoller, SimulatedSensor};
use std::thread;
use std::time::Duration;
use thruster_common::hal::config::VehicleConfig;
use thruster_common::hal::driver::{
    DriverDiagnostics, ForwardDynamics, HardwareError, IoError, SensorSource, SystemInterface,
};
use thruster_common::hal::interface::{
    CommandField, CommandInterface, StateField, StateInterface, StateSlot,
};
use thruster_common::hal::types::{
    LifecycleState, ModeState, SensorFrame, ThrusterInput, VehicleSnapshot,
};
use tracing::{debug, info, trace, warn};

/// Everything that exists only after a successful `on_init`.
struct Initialized {
    config: VehicleConfig,
    interfaces: InterfaceTable,
    evaluator: DynamicsEvaluator,
    sensor: SensorPoller,
}

/// Multi-thruster vehicle driver.
pub struct VehicleSystemDriver {
    lifecycle: LifecycleState,
    model: Option<Box<dyn ForwardDynamics>>,
    sensor: Option<Box<dyn SensorSource>>,
    init: Option<Initialized>,
    modes: ModeBank,
    snapshot: VehicleSnapshot,
    inputs: Vec<ThrusterInput>,
    cancel: CancelToken,
    diagnostics: DriverDiagnostics,
}

impl VehicleSystemDriver {
    /// Driver evaluating `model` and reading feedback from `sensor`.
    pub fn new(model: Box<dyn ForwardDynamics>, sensor: Box<dyn SensorSource>) -> Self {
        Self {
            lifecycle: LifecycleState::Unconfigured,
            model: Some(model),
            sensor: Some(sensor),
            init: None,
            modes: ModeBank::new(Vec::new()),
            snapshot: VehicleSnapshot::default(),
            inputs: Vec::new(),
            cancel: CancelToken::new(),
            diagnostics: DriverDiagnostics::default(),
        }
    }

    /// Pure simulation: identity dynamics, no external feedback.
    pub fn simulated() -> Self {
        Self::new(Box::new(IdentityDynamics), Box::new(SimulatedSensor))
    }

    /// Token that aborts a pending evaluation from another thread.
    pub fn cancel_handle(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Active mode of thruster `index`.
    pub fn mode(&self, index: usize) -> Option<ModeState> {
        self.modes.mode(index)
    }

    /// Active modes in thruster order.
    pub fn modes(&self) -> Vec<ModeState> {
        self.modes.modes().collect()
    }

    /// Modes staged by the last successful prepare.
    pub fn staged_modes(&self) -> Option<&[(usize, ModeState)]> {
        self.modes.staged_modes()
    }

    /// Current vehicle snapshot.
    #[inline]
    pub fn snapshot(&self) -> &VehicleSnapshot {
        &self.snapshot
    }

    fn initialized(&self) -> Result<&Initialized, HardwareError> {
        self.init
            .as_ref()
            .ok_or(HardwareError::NotActive(self.lifecycle))
    }

    fn ensure_active(&self) -> Result<(), HardwareError> {
        if self.lifecycle == LifecycleState::Active {
            Ok(())
        } else {
            Err(HardwareError::NotActive(self.lifecycle))
        }
    }

    fn thruster_name(&self, index: usize) -> String {
        self.init
            .as_ref()
            .and_then(|i| i.interfaces.thruster_name(index))
            .map_or_else(|| index.to_string(), str::to_string)
    }

    fn record_failure(&mut self, err: &HardwareError, read: bool) {
        if read {
            self.diagnostics.read_failures += 1;
        } else {
            self.diagnostics.write_failures += 1;
        }
        self.diagnostics.consecutive_failures += 1;
        self.diagnostics.last_error = Some(err.to_string());
    }

    /// Validate a frame against the snapshot layout, then apply it.
    ///
    /// Nothing is written unless the whole frame is valid.
    fn apply_frame(&mut self, frame: &SensorFrame) -> Result<(), IoError> {
        let thrusters = self.snapshot.thrusters.len();
        let sensors = self.snapshot.sensors.len();

        if !frame.thrusters.is_empty() && frame.thrusters.len() != thrusters {
            return Err(IoError::FrameMismatch {
                what: "thruster",
                expected: thrusters,
                got: frame.thrusters.len(),
            });
        }
        if !frame.sensors.is_empty() && frame.sensors.len() != sensors {
            return Err(IoError::FrameMismatch {
                what: "sensor",
                expected: sensors,
                got: frame.sensors.len(),
            });
        }

        for (idx, feedback) in frame.thrusters.iter().enumerate() {
            for (name, value) in [
                ("position", feedback.position),
                ("velocity", feedback.velocity),
                ("current", feedback.current),
            ] {
                if value.is_some_and(|v| !v.is_finite()) {
                    return Err(IoError::InvalidSample(format!("thruster {idx} {name}")));
                }
            }
        }
        if let Some(idx) = frame.sensors.iter().position(|v| !v.is_finite()) {
            return Err(IoError::InvalidSample(format!("sensor {idx}")));
        }

        for (state, feedback) in self.snapshot.thrusters.iter_mut().zip(&frame.thrusters) {
            if let Some(v) = feedback.position {
                state.position = v;
            }
            if let Some(v) = feedback.velocity {
                state.velocity = v;
            }
            if let Some(v) = feedback.current {
                state.current = v;
            }
        }
        if !frame.sensors.is_empty() {
            self.snapshot.sensors.copy_from_slice(&frame.sensors);
        }
        Ok(())
    }
}

impl SystemInterface for VehicleSystemDriver {
    fn name(&self) -> &'static str {
        "vehicle_system"
    }

    fn lifecycle_state(&self) -> LifecycleState {
        self.lifecycle
    }

    fn on_init(&mut self, config: &VehicleConfig) -> Result<(), HardwareError> {
        if self.lifecycle != LifecycleState::Unconfigured {
            return Err(HardwareError::Initialization(format!(
                "on_init called while {}",
                self.lifecycle
            )));
        }

        let interfaces = InterfaceTable::build(config)?;
        let (Some(model), Some(sensor)) = (self.model.take(), self.sensor.take()) else {
            return Err(HardwareError::Initialization(
                "dynamics model or sensor already consumed".to_string(),
            ));
        };
        let evaluator = DynamicsEvaluator::spawn(model, config.eval_timeout(), self.cancel.clone())?;
        let sensor = SensorPoller::spawn(sensor)?;

        info!(
            "Initializing vehicle driver: {} thrusters, {} sensors, model '{}', slowdown {}",
            interfaces.thruster_count(),
            config.sensors.len(),
            evaluator.model_name(),
            config.hw_slowdown
        );

        self.modes = ModeBank::new(interfaces.declared_command_fields());
        self.snapshot = VehicleSnapshot::new(interfaces.thruster_count(), config.sensors.len());
        self.inputs = Vec::with_capacity(interfaces.thruster_count());
        self.init = Some(Initialized {
            config: config.clone(),
            interfaces,
            evaluator,
            sensor,
        });
        self.lifecycle = LifecycleState::Inactive;
        Ok(())
    }

    fn on_activate(&mut self, previous: LifecycleState) -> Result<(), HardwareError> {
        if self.lifecycle != LifecycleState::Inactive {
            return Err(HardwareError::NotActive(self.lifecycle));
        }
        let delay = self.initialized()?.config.start_delay();

        info!("Activating vehicle driver (from {}), please wait {:?}...", previous, delay);
        if !delay.is_zero() {
            thread::sleep(delay);
        }

        self.modes.reset_all();
        for state in &mut self.snapshot.thrusters {
            state.hold_current_state();
        }
        self.cancel.reset();
        self.lifecycle = LifecycleState::Active;

        info!("Vehicle driver activated");
        Ok(())
    }

    fn on_deactivate(&mut self, previous: LifecycleState) -> Result<(), HardwareError> {
        let delay = self.initialized()?.config.stop_delay();

        info!("Deactivating vehicle driver (from {}), please wait {:?}...", previous, delay);
        self.cancel.cancel();
        if !delay.is_zero() {
            thread::sleep(delay);
        }

        self.modes.reset_all();
        self.lifecycle = LifecycleState::Inactive;

        info!("Vehicle driver deactivated, all thrusters in standby");
        Ok(())
    }

    fn export_state_interfaces(&self) -> Vec<StateInterface> {
        self.init
            .as_ref()
            .map(|i| i.interfaces.state_interfaces().to_vec())
            .unwrap_or_default()
    }

    fn export_command_interfaces(&self) -> Vec<CommandInterface> {
        self.init
            .as_ref()
            .map(|i| i.interfaces.command_interfaces().to_vec())
            .unwrap_or_default()
    }

    fn prepare_command_mode_switch(
        &mut self,
        start_interfaces: &[String],
        stop_interfaces: &[String],
    ) -> Result<(), HardwareError> {
        self.modes.clear_staged();
        let requests = self
            .initialized()?
            .interfaces
            .group_requests(start_interfaces, stop_interfaces)?;

        let key = SwitchKey::new(start_interfaces, stop_interfaces);
        let staged = match self.modes.prepare(key, &requests) {
            Ok(staged) => staged.to_vec(),
            Err((index, reason)) => {
                let thruster = self.thruster_name(index);
                warn!("Rejected mode switch for thruster {}: {}", thruster, reason);
                return Err(HardwareError::ConflictingInterfaces { thruster, reason });
            }
        };

        for (index, mode) in staged {
            let request = &requests[index];
            if mode == ModeState::Disable && request.start.len() > 1 {
                warn!(
                    "Thruster {} disable requested together with {:?}; disable wins",
                    self.thruster_name(index),
                    request.start
                );
            }
            debug!(
                "Staged thruster {} switch to {}",
                self.thruster_name(index),
                mode
            );
        }
        Ok(())
    }

    fn perform_command_mode_switch(
        &mut self,
        start_interfaces: &[String],
        stop_interfaces: &[String],
    ) -> Result<(), HardwareError> {
        let key = SwitchKey::new(start_interfaces, stop_interfaces);
        let changes = self
            .modes
            .perform(&key)
            .ok_or(HardwareError::SwitchNotPrepared)?;

        for (index, from, to) in changes {
            info!("Thruster {} mode {} -> {}", self.thruster_name(index), from, to);
        }
        Ok(())
    }

    fn read(&mut self, _time: Duration, _period: Duration) -> Result<(), HardwareError> {
        self.ensure_active()?;
        let Some(init) = self.init.as_mut() else {
            return Err(HardwareError::NotActive(self.lifecycle));
        };
        let budget = init.config.read_timeout();

        let sampled = init.sensor.sample(budget);
        let result = sampled
            .and_then(|frame| self.apply_frame(&frame))
            .map_err(HardwareError::from);

        if let Err(err) = &result {
            debug!("Read failed, keeping last-known state: {}", err);
            self.record_failure(err, true);
        }
        result
    }

    fn write(&mut self, time: Duration, period: Duration) -> Result<(), HardwareError> {
        self.ensure_active()?;
        let Some(init) = self.init.as_mut() else {
            return Err(HardwareError::NotActive(self.lifecycle));
        };

        self.inputs.clear();
        self.inputs.extend(
            self.modes
                .modes()
                .zip(&self.snapshot.thrusters)
                .map(|(mode, state)| ThrusterInput::select(mode, &state.command)),
        );

        let dt = period.as_secs_f64() * init.config.hw_slowdown;
        trace!("write t={:?} dt={}", time, dt);

        match init.evaluator.evaluate(&self.snapshot, &self.inputs, dt) {
            Ok(mut next) => {
                for (state, previous) in next.thrusters.iter_mut().zip(&self.snapshot.thrusters) {
                    state.command = previous.command;
                }
                self.snapshot = next;
                self.diagnostics.cycle_count += 1;
                self.diagnostics.consecutive_failures = 0;
                Ok(())
            }
            Err(err) => {
                let err = HardwareError::from(err);
                debug!("Write failed, snapshot unchanged: {}", err);
                self.record_failure(&err, false);
                Err(err)
            }
        }
    }

    fn state_value(&self, handle: &StateInterface) -> Option<f64> {
        match handle.slot {
            StateSlot::Thruster { index, field } => {
                let state = self.snapshot.thrusters.get(index)?;
                Some(match field {
                    StateField::Position => state.position,
                    StateField::Velocity => state.velocity,
                    StateField::Effort => state.effort,
                    StateField::Current => state.current,
                })
            }
            StateSlot::Sensor(index) => self.snapshot.sensors.get(index).copied(),
        }
    }

    fn set_command(&mut self, handle: &CommandInterface, value: f64) -> Result<(), HardwareError> {
        let declared = self
            .initialized()?
            .interfaces
            .command_interfaces()
            .contains(handle);
        if !declared || !handle.field.carries_value() {
            return Err(HardwareError::NotWritable(handle.name.clone()));
        }
        let state = self
            .snapshot
            .thrusters
            .get_mut(handle.thruster)
            .ok_or_else(|| HardwareError::NotWritable(handle.name.clone()))?;

        match handle.field {
            CommandField::Position => state.command.position = value,
            CommandField::Velocity => state.command.velocity = value,
            CommandField::Current => state.command.current = value,
            CommandField::Effort => state.command.effort = value,
            CommandField::FreeExcite | CommandField::Disable | CommandField::Standby => {
                return Err(HardwareError::NotWritable(handle.name.clone()));
            }
        }
        Ok(())
    }

    fn diagnostics(&self) -> Option<DriverDiagnostics> {
        Some(self.diagnostics.clone())
    }
}
