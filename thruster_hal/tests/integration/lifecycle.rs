//! Integration test: lifecycle transitions and interface export.

use super::{PERIOD, active_driver, command, state, switch};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use thruster_common::prelude::*;
use thruster_hal::drivers::vehicle::VehicleSystemDriver;

#[test]
fn export_names_follow_thruster_field_convention() {
    let mut driver = VehicleSystemDriver::simulated();
    assert!(driver.export_state_interfaces().is_empty());
    driver.on_init(&VehicleConfig::with_thruster_count(4)).unwrap();

    let states = driver.export_state_interfaces();
    let commands = driver.export_command_interfaces();
    assert_eq!(states.len(), 16);
    assert_eq!(commands.len(), 28);

    let state_names: HashSet<_> = states.iter().map(|h| h.name.clone()).collect();
    assert_eq!(state_names.len(), states.len());
    for idx in 0..4 {
        for field in StateField::ALL {
            assert!(state_names.contains(&format!("{idx}/{}", field.as_str())));
        }
    }

    let disable = commands.iter().find(|h| h.name == "3/disable").unwrap();
    assert_eq!(disable.thruster, 3);
    assert_eq!(disable.activates(), ModeState::Disable);
}

#[test]
fn duplicate_declarations_fail_init() {
    let mut config = VehicleConfig::with_thruster_count(2);
    config.thrusters[0].state_interfaces = Some(vec!["position".into(), "position".into()]);
    let mut driver = VehicleSystemDriver::simulated();
    assert!(matches!(
        driver.on_init(&config),
        Err(HardwareError::Initialization(_))
    ));
    assert!(matches!(
        driver.on_activate(LifecycleState::Unconfigured),
        Err(HardwareError::NotActive(LifecycleState::Unconfigured))
    ));
}

#[test]
fn missing_thrusters_fail_init() {
    let mut driver = VehicleSystemDriver::simulated();
    assert!(matches!(
        driver.on_init(&VehicleConfig::default()),
        Err(HardwareError::Initialization(_))
    ));
}

#[test]
fn start_delay_is_honoured() {
    let mut config = VehicleConfig::with_thruster_count(1);
    config.hw_start_sec = 0.02;
    let mut driver = VehicleSystemDriver::simulated();
    driver.on_init(&config).unwrap();

    let started = Instant::now();
    driver.on_activate(LifecycleState::Inactive).unwrap();
    assert!(started.elapsed() >= Duration::from_millis(20));
    assert_eq!(driver.lifecycle_state(), LifecycleState::Active);
}

#[test]
fn deactivate_resets_modes_and_blocks_cycles() {
    let mut driver = active_driver(3);
    switch(&mut driver, &["0/position", "2/effort"], &[]).unwrap();
    command(&mut driver, "0/position", 1.25);
    driver.write(Duration::ZERO, PERIOD).unwrap();

    driver.on_deactivate(LifecycleState::Active).unwrap();
    assert_eq!(driver.modes(), vec![ModeState::Standby; 3]);
    assert!(matches!(
        driver.write(PERIOD, PERIOD),
        Err(HardwareError::NotActive(LifecycleState::Inactive))
    ));
    // State survives deactivation.
    assert_eq!(state(&driver, "0/position"), 1.25);

    driver.on_activate(LifecycleState::Inactive).unwrap();
    driver.write(PERIOD, PERIOD).unwrap();
    assert_eq!(state(&driver, "0/position"), 1.25);
}

#[test]
fn cancel_handle_aborts_evaluation_until_reactivated() {
    let mut driver = active_driver(1);
    let cancel = driver.cancel_handle();
    cancel.cancel();
    assert!(matches!(
        driver.write(Duration::ZERO, PERIOD),
        Err(HardwareError::Dynamics(DynamicsError::Cancelled))
    ));

    driver.on_deactivate(LifecycleState::Active).unwrap();
    driver.on_activate(LifecycleState::Inactive).unwrap();
    assert!(!cancel.is_cancelled());
    driver.write(Duration::ZERO, PERIOD).unwrap();
}

#[test]
fn switches_can_be_staged_while_inactive() {
    let mut driver = VehicleSystemDriver::simulated();
    driver.on_init(&VehicleConfig::with_thruster_count(2)).unwrap();
    switch(&mut driver, &["1/velocity"], &[]).unwrap();
    assert_eq!(driver.mode(1), Some(ModeState::Velocity));

    // Activation starts every thruster from standby.
    driver.on_activate(LifecycleState::Inactive).unwrap();
    assert_eq!(driver.mode(1), Some(ModeState::Standby));
}
