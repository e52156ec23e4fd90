//! Dynamics evaluator.
//!
//! Runs a `ForwardDynamics` model on a dedicated worker thread so the
//! cycle driver can enforce a per-cycle deadline and abort a pending
//! evaluation on deactivation. At most one evaluation is outstanding; a
//! result that arrives after its deadline is discarded.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thruster_common::hal::driver::{DynamicsError, ForwardDynamics, HardwareError};
use thruster_common::hal::types::{ThrusterInput, VehicleSnapshot};
use tracing::{debug, trace, warn};

/// Granularity of the deadline and cancellation checks.
const POLL_SLICE: Duration = Duration::from_millis(1);

/// Shared flag that aborts a pending evaluation.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Fresh, not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Safe from any thread.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Clear a previous cancellation.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    /// True once `cancel` was called and not reset.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

struct Job {
    seq: u64,
    snapshot: VehicleSnapshot,
    inputs: Vec<ThrusterInput>,
    dt: f64,
}

struct Outcome {
    seq: u64,
    result: Result<VehicleSnapshot, DynamicsError>,
}

/// Deadline-enforcing wrapper around a forward-dynamics model.
pub struct DynamicsEvaluator {
    model_name: &'static str,
    jobs: Sender<Job>,
    outcomes: Receiver<Outcome>,
    next_seq: u64,
    pending: Option<u64>,
    timeout: Duration,
    cancel: CancelToken,
    _worker: JoinHandle<()>,
}

impl DynamicsEvaluator {
    /// Start the worker thread for `model`.
    ///
    /// Every evaluation is bounded by `timeout`; `cancel` can end it earlier.
    pub fn spawn(
        model: Box<dyn ForwardDynamics>,
        timeout: Duration,
        cancel: CancelToken,
    ) -> Result<Self, HardwareError> {
        let model_name = model.name();
        let (jobs, job_rx) = mpsc::channel::<Job>();
        let (outcome_tx, outcomes) = mpsc::channel::<Outcome>();

        let worker = thread::Builder::new()
            .name(format!("dynamics-{model_name}"))
            .spawn(move || run_worker(model, job_rx, outcome_tx))
            .map_err(|e| {
                HardwareError::Initialization(format!("Failed to spawn dynamics worker: {e}"))
            })?;

        debug!(
            "Dynamics evaluator '{}' started (timeout={:?})",
            model_name, timeout
        );

        Ok(Self {
            model_name,
            jobs,
            outcomes,
            next_seq: 0,
            pending: None,
            timeout,
            cancel,
            _worker: worker,
        })
    }

    /// Model identifier.
    #[inline]
    pub fn model_name(&self) -> &'static str {
        self.model_name
    }

    /// Evaluate one step.
    ///
    /// Inputs are checked before dispatch; the result is checked for shape
    /// and finiteness before it is returned.
    pub fn evaluate(
        &mut self,
        snapshot: &VehicleSnapshot,
        inputs: &[ThrusterInput],
        dt: f64,
    ) -> Result<VehicleSnapshot, DynamicsError> {
        check_inputs(snapshot, inputs, dt)?;

        if self.cancel.is_cancelled() {
            return Err(DynamicsError::Cancelled);
        }

        self.drain_stale();
        if self.pending.is_some() {
            // Worker is still busy with an overrun evaluation.
            return Err(DynamicsError::Timeout(self.timeout));
        }

        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.jobs
            .send(Job {
                seq,
                snapshot: snapshot.clone(),
                inputs: inputs.to_vec(),
                dt,
            })
            .map_err(|_| DynamicsError::Solver("dynamics worker stopped".to_string()))?;
        self.pending = Some(seq);

        let started = Instant::now();
        loop {
            if self.cancel.is_cancelled() {
                debug!("Dynamics evaluation {} cancelled", seq);
                return Err(DynamicsError::Cancelled);
            }

            let elapsed = started.elapsed();
            if elapsed >= self.timeout {
                warn!(
                    "Dynamics evaluation {} exceeded {:?}, result will be discarded",
                    seq, self.timeout
                );
                return Err(DynamicsError::Timeout(self.timeout));
            }
            let slice = (self.timeout - elapsed).min(POLL_SLICE);

            match self.outcomes.recv_timeout(slice) {
                Ok(outcome) if outcome.seq == seq => {
                    self.pending = None;
                    trace!("Dynamics evaluation {} took {:?}", seq, started.elapsed());
                    return check_output(snapshot, outcome.result?);
                }
                Ok(stale) => trace!("Discarding stale dynamics result {}", stale.seq),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    self.pending = None;
                    return Err(DynamicsError::Solver("dynamics worker stopped".to_string()));
                }
            }
        }
    }

    fn drain_stale(&mut self) {
        while let Ok(outcome) = self.outcomes.try_recv() {
            if self.pending == Some(outcome.seq) {
                self.pending = None;
            }
            trace!("Discarding late dynamics result {}", outcome.seq);
        }
    }
}

fn run_worker(model: Box<dyn ForwardDynamics>, jobs: Receiver<Job>, outcomes: Sender<Outcome>) {
    while let Ok(job) = jobs.recv() {
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            model.step(&job.snapshot, &job.inputs, job.dt)
        }))
        .unwrap_or_else(|_| Err(DynamicsError::Solver(format!("{} panicked", model.name()))));

        if outcomes.send(Outcome { seq: job.seq, result }).is_err() {
            break;
        }
    }
    trace!("Dynamics worker '{}' exiting", model.name());
}

fn check_inputs(
    snapshot: &VehicleSnapshot,
    inputs: &[ThrusterInput],
    dt: f64,
) -> Result<(), DynamicsError> {
    if !dt.is_finite() || dt <= 0.0 {
        return Err(DynamicsError::MalformedInput(format!("timestep {dt}")));
    }
    if inputs.len() != snapshot.thrusters.len() {
        return Err(DynamicsError::MalformedInput(format!(
            "{} inputs for {} thrusters",
            inputs.len(),
            snapshot.thrusters.len()
        )));
    }
    if let Some(idx) = inputs.iter().position(|i| !i.value.is_finite()) {
        return Err(DynamicsError::MalformedInput(format!(
            "non-finite {} command for thruster {idx}",
            inputs[idx].mode
        )));
    }
    Ok(())
}

fn check_output(
    snapshot: &VehicleSnapshot,
    next: VehicleSnapshot,
) -> Result<VehicleSnapshot, DynamicsError> {
    if !next.same_shape(snapshot) {
        return Err(DynamicsError::MalformedOutput(format!(
            "{} thrusters / {} sensors, expected {} / {}",
            next.thrusters.len(),
            next.sensors.len(),
            snapshot.thrusters.len(),
            snapshot.sensors.len()
        )));
    }
    if let Some(location) = next.first_non_finite() {
        return Err(DynamicsError::NumericDivergence(location));
    }
    Ok(next)
}
