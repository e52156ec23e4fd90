//! HAL Core struct and fixed-period loop management.
//!
//! The `HalCore` struct owns the system driver and plays the host side of
//! the driver contract: lifecycle transitions, mode-switch requests and
//! one `read` followed by one `write` per control period.

use crate::config::SystemConfig;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use thruster_common::hal::driver::{DriverDiagnostics, HardwareError, SystemInterface};
use thruster_common::hal::interface::{CommandInterface, StateInterface};
use thruster_common::hal::types::LifecycleState;
use tracing::{debug, info, warn};

/// HAL Core drives a system interface at a fixed period.
pub struct HalCore {
    /// Host configuration
    config: SystemConfig,
    /// Driver instance
    driver: Box<dyn SystemInterface>,
    /// Command handles exported at init
    commands: Vec<CommandInterface>,
    /// State handles exported at init
    states: Vec<StateInterface>,
    /// Running flag for loop control
    running: Arc<AtomicBool>,
    /// Control period
    cycle_time: Duration,
    /// Time since activation, advanced by one period per cycle
    sim_time: Duration,
    /// Timing statistics
    stats: TimingStats,
    /// Failure counters
    failures: FailureStats,
}

/// Timing statistics for loop monitoring.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TimingStats {
    /// Number of cycles executed
    pub cycle_count: u64,
    /// Number of timing violations (cycle exceeded target)
    pub timing_violations: u64,
    /// Maximum observed cycle time
    pub max_cycle_time_us: u64,
    /// Sum of cycle times for average calculation
    pub total_cycle_time_us: u64,
}

/// Cycle failure counters as seen by the host.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FailureStats {
    /// Failed `read` calls
    pub read_failures: u64,
    /// Failed `write` calls
    pub write_failures: u64,
    /// Cycles in a row with at least one failure
    pub consecutive: u64,
}

/// Outcome of one control cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// Result of the `read` call
    pub read: Result<(), HardwareError>,
    /// Result of the `write` call
    pub write: Result<(), HardwareError>,
}

impl CycleReport {
    /// True when both halves succeeded.
    pub fn is_ok(&self) -> bool {
        self.read.is_ok() && self.write.is_ok()
    }
}

/// Warn for the first 10 occurrences, then every 1000th.
#[inline]
fn should_report(count: u64) -> bool {
    count <= 10 || count % 1000 == 0
}

impl HalCore {
    /// Create a new HalCore around `driver`.
    ///
    /// # Errors
    /// Returns `Config` if the cycle time is zero.
    pub fn new(config: SystemConfig, driver: Box<dyn SystemInterface>) -> Result<Self, HardwareError> {
        if config.cycle_time_us == 0 {
            return Err(HardwareError::Config("cycle_time_us must be > 0".to_string()));
        }
        let cycle_time = config.cycle_time();

        info!(
            "HalCore created for driver '{}' with {} thrusters, cycle_time={}us",
            driver.name(),
            config.vehicle.thrusters.len(),
            config.cycle_time_us
        );

        Ok(Self {
            config,
            driver,
            commands: Vec::new(),
            states: Vec::new(),
            running: Arc::new(AtomicBool::new(false)),
            cycle_time,
            sim_time: Duration::ZERO,
            stats: TimingStats::default(),
            failures: FailureStats::default(),
        })
    }

    /// Initialize the driver and collect its interface handles.
    pub fn init(&mut self) -> Result<(), HardwareError> {
        info!("Initializing HalCore with driver '{}'...", self.driver.name());
        self.driver.on_init(&self.config.vehicle)?;

        self.states = self.driver.export_state_interfaces();
        self.commands = self.driver.export_command_interfaces();
        info!(
            "Driver exported {} state and {} command interfaces",
            self.states.len(),
            self.commands.len()
        );
        Ok(())
    }

    /// Activate the driver.
    pub fn activate(&mut self) -> Result<(), HardwareError> {
        let previous = self.driver.lifecycle_state();
        self.driver.on_activate(previous)?;
        self.sim_time = Duration::ZERO;
        Ok(())
    }

    /// Prepare and perform one mode-switch batch.
    ///
    /// Nothing changes if the batch is rejected.
    pub fn switch_modes(&mut self, start: &[String], stop: &[String]) -> Result<(), HardwareError> {
        self.driver.prepare_command_mode_switch(start, stop)?;
        self.driver.perform_command_mode_switch(start, stop)
    }

    /// Write `value` to the command interface named `name`.
    pub fn set_command(&mut self, name: &str, value: f64) -> Result<(), HardwareError> {
        let handle = self
            .commands
            .iter()
            .find(|h| h.name == name)
            .ok_or_else(|| HardwareError::UnknownInterface(name.to_string()))?;
        self.driver.set_command(handle, value)
    }

    /// Current value of the state interface named `name`.
    pub fn state_value(&self, name: &str) -> Option<f64> {
        let handle = self.states.iter().find(|h| h.name == name)?;
        self.driver.state_value(handle)
    }

    /// Run one control cycle: one `read`, then one `write`.
    ///
    /// `write` runs even if `read` failed; the driver then evaluates
    /// against its last-known state.
    pub fn step(&mut self) -> CycleReport {
        let period = self.cycle_time;
        let time = self.sim_time;

        let read = self.driver.read(time, period);
        if let Err(e) = &read {
            self.failures.read_failures += 1;
            if should_report(self.failures.read_failures) {
                warn!("Read failure #{}: {}", self.failures.read_failures, e);
            }
        }

        let write = self.driver.write(time, period);
        if let Err(e) = &write {
            self.failures.write_failures += 1;
            if should_report(self.failures.write_failures) {
                warn!("Write failure #{}: {}", self.failures.write_failures, e);
            }
        }

        let report = CycleReport { read, write };
        if report.is_ok() {
            self.failures.consecutive = 0;
        } else {
            self.failures.consecutive += 1;
        }
        self.sim_time += period;
        report
    }

    /// Run the fixed-period loop.
    ///
    /// Blocks until `max_cycles` cycles have run or the running flag is
    /// cleared (see [`HalCore::running_flag`]).
    pub fn run(&mut self, max_cycles: Option<u64>) -> Result<(), HardwareError> {
        if self.driver.lifecycle_state() != LifecycleState::Active {
            return Err(HardwareError::NotActive(self.driver.lifecycle_state()));
        }

        info!(
            "Starting HalCore loop (cycle_time={}us)...",
            self.cycle_time.as_micros()
        );
        self.running.store(true, Ordering::SeqCst);

        if detect_rt_mode() {
            info!("Running in real-time mode");
        } else {
            info!("Running in standard (non-RT) mode");
        }

        let target_us = self.config.cycle_time_us;
        let mut executed = 0u64;

        while self.running.load(Ordering::SeqCst) && max_cycles.is_none_or(|max| executed < max) {
            let cycle_start = Instant::now();

            let _report = self.step();
            executed += 1;

            let cycle_time_us = cycle_start.elapsed().as_micros() as u64;
            self.stats.cycle_count += 1;
            self.stats.total_cycle_time_us += cycle_time_us;
            self.stats.max_cycle_time_us = self.stats.max_cycle_time_us.max(cycle_time_us);

            if cycle_time_us > target_us {
                self.stats.timing_violations += 1;
                if should_report(self.stats.timing_violations) {
                    warn!(
                        "Timing violation #{}: cycle took {}us (target {}us)",
                        self.stats.timing_violations, cycle_time_us, target_us
                    );
                }
            }

            let elapsed = cycle_start.elapsed();
            if elapsed < self.cycle_time {
                std::thread::sleep(self.cycle_time - elapsed);
            }

            if self.stats.cycle_count % 1000 == 0 {
                debug!(
                    "Loop: {} cycles, avg={}us, max={}us, violations={}, consecutive failures={}",
                    self.stats.cycle_count,
                    self.stats.total_cycle_time_us / self.stats.cycle_count,
                    self.stats.max_cycle_time_us,
                    self.stats.timing_violations,
                    self.failures.consecutive
                );
            }
        }

        self.running.store(false, Ordering::SeqCst);
        info!(
            "HalCore loop stopped after {} cycles (violations: {}, read failures: {}, write failures: {})",
            self.stats.cycle_count,
            self.stats.timing_violations,
            self.failures.read_failures,
            self.failures.write_failures
        );
        Ok(())
    }

    /// Stop the loop and deactivate the driver.
    pub fn shutdown(&mut self) -> Result<(), HardwareError> {
        info!("Shutdown requested");
        self.running.store(false, Ordering::SeqCst);

        let state = self.driver.lifecycle_state();
        if state == LifecycleState::Active {
            self.driver.on_deactivate(state)?;
        }
        Ok(())
    }

    /// Get the running flag for signal handlers.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Exported command handles.
    pub fn command_interfaces(&self) -> &[CommandInterface] {
        &self.commands
    }

    /// Exported state handles.
    pub fn state_interfaces(&self) -> &[StateInterface] {
        &self.states
    }

    /// The driven system interface.
    pub fn driver(&self) -> &dyn SystemInterface {
        self.driver.as_ref()
    }

    /// Get timing statistics.
    pub fn stats(&self) -> TimingStats {
        self.stats
    }

    /// Get host-side failure counters.
    pub fn failures(&self) -> FailureStats {
        self.failures
    }

    /// Driver-side diagnostics, if the driver keeps them.
    pub fn diagnostics(&self) -> Option<DriverDiagnostics> {
        self.driver.diagnostics()
    }
}

/// Detect if running in real-time mode by checking scheduler policy.
fn detect_rt_mode() -> bool {
    #[cfg(target_os = "linux")]
    {
        use libc::{SCHED_FIFO, SCHED_RR, sched_getscheduler};
        // SAFETY: sched_getscheduler(0) only queries the calling thread's policy.
        unsafe {
            let policy = sched_getscheduler(0);
            policy == SCHED_FIFO || policy == SCHED_RR
        }
    }
    #[cfg(not(target_os = "linux"))]
    {
        false
    }
}
