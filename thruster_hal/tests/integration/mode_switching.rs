//! Integration test: mode-switch batches across several thrusters.

use super::{active_driver, names, switch};
use thruster_common::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Field name that keeps `mode` active, if any.
fn claim_of(mode: ModeState) -> Option<&'static str> {
    match mode {
        ModeState::Position => Some("position"),
        ModeState::Velocity => Some("velocity"),
        ModeState::Current => Some("current"),
        ModeState::Effort => Some("effort"),
        ModeState::FreeExcite => Some("free_excite"),
        ModeState::Disable => Some("disable"),
        ModeState::Standby => None,
    }
}

fn exclusive_mode(field: &str) -> Option<ModeState> {
    match field {
        "position" => Some(ModeState::Position),
        "velocity" => Some(ModeState::Velocity),
        "current" => Some(ModeState::Current),
        "effort" => Some(ModeState::Effort),
        "free_excite" => Some(ModeState::FreeExcite),
        _ => None,
    }
}

/// Straight-line model of an accepted batch, thruster by thruster.
fn reference_commit(modes: &mut [ModeState], start: &[&str], stop: &[&str]) {
    for (index, mode) in modes.iter_mut().enumerate() {
        let prefix = format!("{index}/");
        let fields = |list: &[&str]| -> Vec<String> {
            list.iter()
                .filter_map(|name| name.strip_prefix(&prefix))
                .map(str::to_string)
                .collect()
        };
        let (starts, stops) = (fields(start), fields(stop));

        *mode = if starts.iter().any(|f| f == "disable") {
            ModeState::Disable
        } else if let Some(next) = starts.iter().find_map(|f| exclusive_mode(f)) {
            next
        } else if starts.iter().any(|f| f == "standby") {
            ModeState::Standby
        } else if claim_of(*mode).is_some_and(|claim| stops.iter().any(|f| f == claim)) {
            ModeState::Standby
        } else {
            *mode
        };
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn all_thrusters_start_in_standby() {
    let driver = active_driver(4);
    assert_eq!(driver.modes(), vec![ModeState::Standby; 4]);
}

#[test]
fn conflicting_batch_changes_nothing() {
    let mut driver = active_driver(3);
    switch(&mut driver, &["0/effort"], &[]).unwrap();
    let before = driver.modes();

    // Thruster 1 is valid on its own; thruster 2 asks for two exclusive modes.
    let err = switch(
        &mut driver,
        &["1/velocity", "2/position", "2/velocity"],
        &[],
    )
    .unwrap_err();

    match err {
        HardwareError::ConflictingInterfaces { thruster, reason } => {
            assert_eq!(thruster, "2");
            assert!(matches!(reason, SwitchRejection::TwoActiveInterfaces { .. }));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(driver.modes(), before);
    assert!(driver.staged_modes().is_none());
}

#[test]
fn starting_over_an_active_interface_requires_stop() {
    let mut driver = active_driver(2);
    switch(&mut driver, &["0/position"], &[]).unwrap();

    let err = switch(&mut driver, &["0/velocity"], &[]).unwrap_err();
    assert!(matches!(
        err,
        HardwareError::ConflictingInterfaces {
            reason: SwitchRejection::ActiveInterfaceNotStopped { .. },
            ..
        }
    ));
    assert_eq!(driver.mode(0), Some(ModeState::Position));

    switch(&mut driver, &["0/velocity"], &["0/position"]).unwrap();
    assert_eq!(driver.mode(0), Some(ModeState::Velocity));
}

#[test]
fn disable_wins_over_simultaneous_starts() {
    let mut driver = active_driver(2);
    switch(&mut driver, &["1/velocity", "1/disable"], &[]).unwrap();
    assert_eq!(driver.mode(1), Some(ModeState::Disable));
    assert_eq!(driver.mode(0), Some(ModeState::Standby));
}

#[test]
fn stopping_the_active_interface_returns_to_standby() {
    let mut driver = active_driver(1);
    switch(&mut driver, &["0/current"], &[]).unwrap();
    switch(&mut driver, &[], &["0/current"]).unwrap();
    assert_eq!(driver.mode(0), Some(ModeState::Standby));

    switch(&mut driver, &["0/free_excite"], &[]).unwrap();
    assert_eq!(driver.mode(0), Some(ModeState::FreeExcite));
    switch(&mut driver, &["0/standby"], &["0/free_excite"]).unwrap();
    assert_eq!(driver.mode(0), Some(ModeState::Standby));
}

#[test]
fn prepare_is_idempotent() {
    let mut driver = active_driver(4);
    let start = names(&["3/velocity", "0/position"]);

    driver.prepare_command_mode_switch(&start, &[]).unwrap();
    let first = driver.staged_modes().map(<[_]>::to_vec);
    driver.prepare_command_mode_switch(&start, &[]).unwrap();
    let second = driver.staged_modes().map(<[_]>::to_vec);
    assert_eq!(first, second);

    // Same batch in a different order still matches what was prepared.
    let reordered = names(&["0/position", "3/velocity"]);
    driver.perform_command_mode_switch(&reordered, &[]).unwrap();
    assert_eq!(
        driver.modes(),
        vec![
            ModeState::Position,
            ModeState::Standby,
            ModeState::Standby,
            ModeState::Velocity
        ]
    );
}

#[test]
fn perform_of_a_different_batch_is_refused() {
    let mut driver = active_driver(2);
    driver
        .prepare_command_mode_switch(&names(&["0/velocity"]), &[])
        .unwrap();
    assert_eq!(
        driver.perform_command_mode_switch(&names(&["1/velocity"]), &[]),
        Err(HardwareError::SwitchNotPrepared)
    );
    assert_eq!(driver.modes(), vec![ModeState::Standby; 2]);
}

#[test]
fn undeclared_interface_is_rejected() {
    let mut config = VehicleConfig::with_thruster_count(2);
    config.thrusters[1].command_interfaces =
        Some(vec!["velocity".into(), "disable".into(), "standby".into()]);
    let mut driver = super::active_driver_with(
        &config,
        Box::new(thruster_hal::drivers::vehicle::IdentityDynamics),
        Box::new(thruster_hal::drivers::vehicle::SimulatedSensor),
    );

    let err = switch(&mut driver, &["1/position"], &[]).unwrap_err();
    assert!(matches!(
        err,
        HardwareError::ConflictingInterfaces {
            reason: SwitchRejection::InterfaceNotDeclared(CommandField::Position),
            ..
        }
    ));
    switch(&mut driver, &["1/velocity"], &[]).unwrap();
}

#[test]
fn foreign_interfaces_are_ignored() {
    let mut driver = active_driver(1);
    switch(&mut driver, &["arm/position", "0/velocity"], &["gripper/effort"]).unwrap();
    assert_eq!(driver.mode(0), Some(ModeState::Velocity));
}

#[test]
fn commits_match_reference_model() {
    let mut driver = active_driver(3);
    let mut expected = vec![ModeState::Standby; 3];
    let batches: &[(&[&str], &[&str])] = &[
        (&["0/position", "1/velocity"], &[]),
        (&["2/effort"], &[]),
        (&["0/disable"], &[]),
        (&["1/current"], &["1/velocity"]),
        (&["0/standby"], &["0/disable"]),
        (&["2/free_excite", "1/disable", "1/effort"], &["2/effort"]),
        (&[], &["2/free_excite", "0/velocity"]),
        (&["1/position"], &[]),
        (&["2/standby"], &["1/position"]),
    ];
    for (start, stop) in batches {
        switch(&mut driver, start, stop).unwrap();
        reference_commit(&mut expected, start, stop);
        assert_eq!(driver.modes(), expected, "after start {start:?} stop {stop:?}");
    }
    assert_eq!(
        driver.modes(),
        vec![ModeState::Standby, ModeState::Standby, ModeState::Standby]
    );
}

#[test]
fn disable_needs_only_disable_declared() {
    let mut config = VehicleConfig::with_thruster_count(2);
    config.thrusters[1].command_interfaces =
        Some(vec!["velocity".into(), "disable".into(), "standby".into()]);
    let mut driver = super::active_driver_with(
        &config,
        Box::new(thruster_hal::drivers::vehicle::IdentityDynamics),
        Box::new(thruster_hal::drivers::vehicle::SimulatedSensor),
    );

    switch(&mut driver, &["1/disable", "1/position"], &["1/effort"]).unwrap();
    assert_eq!(driver.modes(), vec![ModeState::Standby, ModeState::Disable]);

    switch(&mut driver, &["0/disable", "0/thrust"], &[]).unwrap();
    assert_eq!(driver.modes(), vec![ModeState::Disable, ModeState::Disable]);
}
