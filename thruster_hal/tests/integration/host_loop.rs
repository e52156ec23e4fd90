//! Integration test: HalCore driving the vehicle driver.

use super::ScriptedSensor;
use std::io::Write;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;
use tempfile::NamedTempFile;
use thruster_common::prelude::*;
use thruster_hal::config::SystemConfig;
use thruster_hal::core::HalCore;
use thruster_hal::drivers::{create_driver, create_simulated_driver};

fn core_with(config: SystemConfig, sensor: Option<ScriptedSensor>) -> HalCore {
    let driver = match sensor {
        Some(sensor) => create_driver(&config, Box::new(sensor)).unwrap(),
        None => create_simulated_driver(&config).unwrap(),
    };
    let mut core = HalCore::new(config, driver).unwrap();
    core.init().unwrap();
    core.activate().unwrap();
    core
}

#[test]
fn loop_keeps_cycling_through_failures() {
    let mut config = SystemConfig::with_thruster_count(2);
    config.cycle_time_us = 1_000;
    let sensor = ScriptedSensor::new([
        Err(IoError::Sensor("a".into())),
        Err(IoError::Sensor("b".into())),
        Err(IoError::Sensor("c".into())),
    ]);
    let mut core = core_with(config, Some(sensor));
    core.switch_modes(&["0/velocity".to_string()], &[]).unwrap();
    core.set_command("0/velocity", 0.3).unwrap();

    let reports: Vec<_> = (0..5).map(|_| core.step()).collect();
    assert!(reports[..3].iter().all(|r| r.read.is_err() && r.write.is_ok()));
    assert!(reports[3..].iter().all(|r| r.is_ok()));

    let failures = core.failures();
    assert_eq!(failures.read_failures, 3);
    assert_eq!(failures.write_failures, 0);
    assert_eq!(failures.consecutive, 0);
    assert_eq!(core.state_value("0/velocity"), Some(0.3));
    assert_eq!(core.diagnostics().unwrap().cycle_count, 5);
}

#[test]
fn running_flag_stops_unbounded_loop() {
    let mut config = SystemConfig::with_thruster_count(1);
    config.cycle_time_us = 1_000;
    let mut core = core_with(config, None);
    let running = core.running_flag();

    let stopper = thread::spawn(move || {
        // Wait until the loop has started before clearing the flag.
        while !running.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(1));
        }
        thread::sleep(Duration::from_millis(20));
        running.store(false, Ordering::SeqCst);
    });

    core.run(None).unwrap();
    stopper.join().unwrap();
    assert!(core.stats().cycle_count > 0);

    core.shutdown().unwrap();
    assert_eq!(core.driver().lifecycle_state(), LifecycleState::Inactive);
}

#[test]
fn config_file_drives_layout_and_model() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
        cycle_time_us = 2000

        [dynamics]
        model = "first_order"
        time_constant = 0.02

        [vehicle]
        hw_slowdown = 2.0

        [[vehicle.thrusters]]
        name = "port"

        [[vehicle.thrusters]]
        name = "starboard"
        command_interfaces = ["effort", "disable", "standby"]
        "#
    )
    .unwrap();

    let config = SystemConfig::load_validated(file.path()).unwrap();
    let mut core = core_with(config, None);

    assert!(core.command_interfaces().iter().any(|h| h.name == "port/position"));
    assert!(
        !core
            .command_interfaces()
            .iter()
            .any(|h| h.name == "starboard/position")
    );

    assert!(matches!(
        core.switch_modes(&["starboard/velocity".to_string()], &[]),
        Err(HardwareError::ConflictingInterfaces { .. })
    ));
    core.switch_modes(&["port/velocity".to_string()], &[]).unwrap();
    core.set_command("port/velocity", 1.0).unwrap();
    core.run(Some(50)).unwrap();

    let velocity = core.state_value("port/velocity").unwrap();
    assert!(velocity > 0.99 && velocity <= 1.0);
}
