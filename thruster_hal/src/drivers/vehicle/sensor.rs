//! Sensor collaborators.
//!
//! `SimulatedSensor` stands in for hardware feedback when the dynamics
//! model is the source of truth: every sample is an empty frame, which
//! leaves the simulated state untouched.
//!
//! `SensorPoller` runs any `SensorSource` on a worker thread so `read`
//! returns within its budget even when the source ignores it.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thruster_common::hal::driver::{HardwareError, IoError, SensorSource};
use thruster_common::hal::types::SensorFrame;
use tracing::{debug, trace, warn};

/// Feedback source for pure simulation.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedSensor;

impl SensorSource for SimulatedSensor {
    fn sample(&mut self, _budget: Duration) -> Result<SensorFrame, IoError> {
        Ok(SensorFrame::default())
    }
}

struct Request {
    seq: u64,
    budget: Duration,
}

struct Sample {
    seq: u64,
    result: Result<SensorFrame, IoError>,
}

/// Deadline-enforcing wrapper around a sensor source.
///
/// At most one sample is outstanding; a sample that arrives after its
/// deadline is discarded.
pub struct SensorPoller {
    requests: Sender<Request>,
    samples: Receiver<Sample>,
    next_seq: u64,
    pending: Option<u64>,
    _worker: JoinHandle<()>,
}

impl SensorPoller {
    /// Start the worker thread for `source`.
    pub fn spawn(source: Box<dyn SensorSource>) -> Result<Self, HardwareError> {
        let (requests, request_rx) = mpsc::channel::<Request>();
        let (sample_tx, samples) = mpsc::channel::<Sample>();

        let worker = thread::Builder::new()
            .name("sensor-poller".to_string())
            .spawn(move || run_worker(source, request_rx, sample_tx))
            .map_err(|e| {
                HardwareError::Initialization(format!("Failed to spawn sensor worker: {e}"))
            })?;

        debug!("Sensor poller started");
        Ok(Self {
            requests,
            samples,
            next_seq: 0,
            pending: None,
            _worker: worker,
        })
    }

    /// Take one sample, failing with `IoError::Timeout` past `budget`.
    pub fn sample(&mut self, budget: Duration) -> Result<SensorFrame, IoError> {
        let started = Instant::now();

        while let Ok(late) = self.samples.try_recv() {
            if self.pending == Some(late.seq) {
                self.pending = None;
            }
            trace!("Discarding late sensor sample {}", late.seq);
        }
        if self.pending.is_some() {
            // Source is still stuck in an earlier sample.
            return Err(IoError::Timeout {
                elapsed: started.elapsed(),
                budget,
            });
        }

        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.requests
            .send(Request { seq, budget })
            .map_err(|_| IoError::Sensor("sensor worker stopped".to_string()))?;
        self.pending = Some(seq);

        loop {
            let elapsed = started.elapsed();
            if elapsed >= budget {
                warn!("Sensor sample {} exceeded {:?}", seq, budget);
                return Err(IoError::Timeout { elapsed, budget });
            }

            match self.samples.recv_timeout(budget - elapsed) {
                Ok(sample) if sample.seq == seq => {
                    self.pending = None;
                    let elapsed = started.elapsed();
                    if elapsed > budget {
                        return Err(IoError::Timeout { elapsed, budget });
                    }
                    return sample.result;
                }
                Ok(stale) => trace!("Discarding stale sensor sample {}", stale.seq),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    self.pending = None;
                    return Err(IoError::Sensor("sensor worker stopped".to_string()));
                }
            }
        }
    }
}

fn run_worker(mut source: Box<dyn SensorSource>, requests: Receiver<Request>, samples: Sender<Sample>) {
    while let Ok(request) = requests.recv() {
        let result = panic::catch_unwind(AssertUnwindSafe(|| source.sample(request.budget)))
            .unwrap_or_else(|_| Err(IoError::Sensor("sensor source panicked".to_string())));

        if samples
            .send(Sample {
                seq: request.seq,
                result,
            })
            .is_err()
        {
            break;
        }
    }
    trace!("Sensor worker exiting");
}
