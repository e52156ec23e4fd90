//! Integration test: read/write cycle over the dynamics evaluator.

use super::{
    DivergingDynamics, PERIOD, ScriptedSensor, TimestepEcho, active_driver, active_driver_with,
    command, state, switch,
};
use std::time::Duration;
use thruster_common::prelude::*;
use thruster_hal::drivers::vehicle::{FirstOrderDynamics, IdentityDynamics, SimulatedSensor};

// ── Helpers ─────────────────────────────────────────────────────────

fn feedback(position: f64, velocity: f64) -> ThrusterFeedback {
    ThrusterFeedback {
        position: Some(position),
        velocity: Some(velocity),
        current: None,
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn velocity_scenario_on_four_thrusters() {
    let mut driver = active_driver(4);
    switch(&mut driver, &["2/velocity"], &[]).unwrap();
    command(&mut driver, "2/velocity", 1.5);

    driver.read(Duration::ZERO, PERIOD).unwrap();
    driver.write(Duration::ZERO, PERIOD).unwrap();

    assert_eq!(state(&driver, "2/velocity"), 1.5);
    for idx in [0, 1, 3] {
        for field in ["position", "velocity", "effort", "current"] {
            assert_eq!(state(&driver, &format!("{idx}/{field}")), 0.0);
        }
    }
    assert_eq!(state(&driver, "2/position"), 0.0);
}

#[test]
fn position_round_trip_with_identity_model() {
    let mut driver = active_driver(2);
    switch(&mut driver, &["1/position"], &[]).unwrap();

    for p in [0.25, -3.0, 12.5] {
        command(&mut driver, "1/position", p);
        driver.write(Duration::ZERO, PERIOD).unwrap();
        assert_eq!(state(&driver, "1/position"), p);
    }
}

#[test]
fn inactive_mode_commands_do_not_reach_the_model() {
    let mut driver = active_driver(1);
    switch(&mut driver, &["0/velocity"], &[]).unwrap();
    command(&mut driver, "0/velocity", 2.0);
    command(&mut driver, "0/position", 9.0);

    driver.write(Duration::ZERO, PERIOD).unwrap();
    assert_eq!(state(&driver, "0/velocity"), 2.0);
    assert_eq!(state(&driver, "0/position"), 0.0);
}

#[test]
fn divergence_leaves_snapshot_unchanged() {
    let mut driver = active_driver_with(
        &VehicleConfig::with_thruster_count(2),
        Box::new(DivergingDynamics),
        Box::new(SimulatedSensor),
    );
    let before = driver.snapshot().clone();

    let err = driver.write(Duration::ZERO, PERIOD).unwrap_err();
    assert!(matches!(
        err,
        HardwareError::Dynamics(DynamicsError::NumericDivergence(_))
    ));
    assert_eq!(driver.snapshot(), &before);

    let diag = driver.diagnostics().unwrap();
    assert_eq!(diag.write_failures, 1);
    assert_eq!(diag.cycle_count, 0);
    assert!(diag.last_error.is_some());
}

#[test]
fn failed_read_keeps_last_known_state_and_write_still_runs() {
    let sensor = ScriptedSensor::new([
        Ok(SensorFrame {
            thrusters: vec![feedback(1.0, 0.5), feedback(-2.0, 0.0)],
            sensors: vec![],
        }),
        Err(IoError::Sensor("bus timeout".into())),
    ]);
    let mut driver = active_driver_with(
        &VehicleConfig::with_thruster_count(2),
        Box::new(IdentityDynamics),
        Box::new(sensor),
    );
    switch(&mut driver, &["1/effort"], &[]).unwrap();
    command(&mut driver, "1/effort", 4.0);

    driver.read(Duration::ZERO, PERIOD).unwrap();
    driver.write(Duration::ZERO, PERIOD).unwrap();
    assert_eq!(state(&driver, "0/position"), 1.0);

    let err = driver.read(PERIOD, PERIOD).unwrap_err();
    assert!(matches!(err, HardwareError::Io(IoError::Sensor(_))));
    assert!(err.is_cycle_failure());

    driver.write(PERIOD, PERIOD).unwrap();
    assert_eq!(state(&driver, "0/position"), 1.0);
    assert_eq!(state(&driver, "0/velocity"), 0.5);
    assert_eq!(state(&driver, "1/position"), -2.0);
    assert_eq!(state(&driver, "1/effort"), 4.0);

    let diag = driver.diagnostics().unwrap();
    assert_eq!(diag.read_failures, 1);
    assert_eq!(diag.cycle_count, 2);
    assert_eq!(diag.consecutive_failures, 0);
}

#[test]
fn malformed_frame_is_not_partially_applied() {
    let mut bad = feedback(f64::NAN, 0.0);
    bad.current = Some(1.0);
    let sensor = ScriptedSensor::new([
        Ok(SensorFrame {
            thrusters: vec![feedback(5.0, 5.0), bad],
            sensors: vec![],
        }),
        Ok(SensorFrame {
            thrusters: vec![feedback(5.0, 5.0)],
            sensors: vec![],
        }),
    ]);
    let mut driver = active_driver_with(
        &VehicleConfig::with_thruster_count(2),
        Box::new(IdentityDynamics),
        Box::new(sensor),
    );
    let before = driver.snapshot().clone();

    assert!(matches!(
        driver.read(Duration::ZERO, PERIOD),
        Err(HardwareError::Io(IoError::InvalidSample(_)))
    ));
    assert!(matches!(
        driver.read(Duration::ZERO, PERIOD),
        Err(HardwareError::Io(IoError::FrameMismatch { .. }))
    ));
    assert_eq!(driver.snapshot(), &before);
}

#[test]
fn vehicle_sensors_are_exported_and_refreshed() {
    let mut config = VehicleConfig::with_thruster_count(1);
    config.sensors = vec!["depth".into(), "heading".into()];
    let sensor = ScriptedSensor::new([Ok(SensorFrame {
        thrusters: vec![],
        sensors: vec![12.0, 0.75],
    })]);
    let mut driver = active_driver_with(&config, Box::new(IdentityDynamics), Box::new(sensor));

    driver.read(Duration::ZERO, PERIOD).unwrap();
    assert_eq!(state(&driver, "vehicle/depth"), 12.0);
    assert_eq!(state(&driver, "vehicle/heading"), 0.75);
}

#[test]
fn slowdown_scales_the_timestep() {
    let mut config = VehicleConfig::with_thruster_count(1);
    config.sensors = vec!["dt".into()];
    config.hw_slowdown = 0.5;
    let mut driver = active_driver_with(&config, Box::new(TimestepEcho), Box::new(SimulatedSensor));

    driver.write(Duration::ZERO, PERIOD).unwrap();
    assert!((state(&driver, "vehicle/dt") - 0.005).abs() < 1e-12);
}

#[test]
fn first_order_model_tracks_velocity_over_cycles() {
    let mut driver = active_driver_with(
        &VehicleConfig::with_thruster_count(1),
        Box::new(FirstOrderDynamics::default()),
        Box::new(SimulatedSensor),
    );
    switch(&mut driver, &["0/velocity"], &[]).unwrap();
    command(&mut driver, "0/velocity", 1.0);

    for cycle in 0..300u32 {
        let time = PERIOD * cycle;
        driver.read(time, PERIOD).unwrap();
        driver.write(time, PERIOD).unwrap();
    }
    assert!((state(&driver, "0/velocity") - 1.0).abs() < 1e-3);
    assert!(state(&driver, "0/position") > 2.0);
    // Command survives evaluation.
    assert_eq!(driver.snapshot().thrusters[0].command.velocity, 1.0);
}

#[test]
fn evaluator_overrun_reports_timeout() {
    struct Slow;
    impl ForwardDynamics for Slow {
        fn name(&self) -> &'static str {
            "slow"
        }
        fn step(
            &self,
            snapshot: &VehicleSnapshot,
            _inputs: &[ThrusterInput],
            _dt: f64,
        ) -> Result<VehicleSnapshot, DynamicsError> {
            std::thread::sleep(Duration::from_millis(50));
            Ok(snapshot.clone())
        }
    }

    let mut config = VehicleConfig::with_thruster_count(1);
    config.eval_timeout_us = 2_000;
    let mut driver = active_driver_with(&config, Box::new(Slow), Box::new(SimulatedSensor));
    let before = driver.snapshot().clone();

    assert!(matches!(
        driver.write(Duration::ZERO, PERIOD),
        Err(HardwareError::Dynamics(DynamicsError::Timeout(_)))
    ));
    assert_eq!(driver.snapshot(), &before);
}

#[test]
fn blocking_sensor_is_cut_off_at_read_budget() {
    struct Blocking;
    impl SensorSource for Blocking {
        fn sample(&mut self, _budget: Duration) -> Result<SensorFrame, IoError> {
            std::thread::sleep(Duration::from_millis(300));
            Ok(SensorFrame::default())
        }
    }

    let mut config = VehicleConfig::with_thruster_count(1);
    config.read_timeout_us = 2_000;
    let mut driver = active_driver_with(&config, Box::new(IdentityDynamics), Box::new(Blocking));

    let started = std::time::Instant::now();
    assert!(matches!(
        driver.read(Duration::ZERO, PERIOD),
        Err(HardwareError::Io(IoError::Timeout { .. }))
    ));
    assert!(started.elapsed() < Duration::from_millis(150));

    // The cycle carries on while the source is still blocked.
    assert!(driver.write(Duration::ZERO, PERIOD).is_ok());
}
