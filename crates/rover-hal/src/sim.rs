//! In-process simulated ports for tests and for running without hardware.
//!
//! Both ports are cheap to clone and every clone shares the same state, so a
//! test (or the operator shell) can keep one handle for inspection or
//! steering while the other is owned by the motion core.
//!
//! # Example
//!
//! ```rust
//! use rover_hal::actuator::{ActuatorPort, Motor, MotorCode};
//! use rover_hal::ranging::RangingPort;
//! use rover_hal::sim::{SimActuatorPort, SimRanger};
//!
//! let probe = SimActuatorPort::new();
//! let mut port = probe.clone();
//! port.write_code(Motor::Left, MotorCode::Forward).unwrap();
//! assert_eq!(probe.code(Motor::Left), Some(MotorCode::Forward));
//!
//! let mut ranger = SimRanger::new(120.0);
//! ranger.push_sample(12.5);
//! assert_eq!(ranger.read_distance_cm().unwrap(), 12.5);
//! assert_eq!(ranger.read_distance_cm().unwrap(), 120.0);
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use rover_types::RoverError;

use crate::actuator::{ActuatorPort, LineLevel, Motor, MotorCode};
use crate::ranging::RangingPort;

// ────────────────────────────────────────────────────────────────────────────
// Simulated actuator port
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct ActuatorLog {
    left: Option<(LineLevel, LineLevel)>,
    right: Option<(LineLevel, LineLevel)>,
    writes: usize,
    failing: bool,
}

/// A simulated H-bridge that records the last line levels written to each
/// motor.  Succeeds unless faults are injected with
/// [`set_failing`][Self::set_failing].
#[derive(Debug, Clone, Default)]
pub struct SimActuatorPort {
    log: Arc<Mutex<ActuatorLog>>,
}

impl SimActuatorPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last line pair written to `motor`, or `None` if never written.
    pub fn lines(&self, motor: Motor) -> Option<(LineLevel, LineLevel)> {
        let log = self.log.lock();
        match motor {
            Motor::Left => log.left,
            Motor::Right => log.right,
        }
    }

    /// Last code written to `motor`, decoded from its lines.
    pub fn code(&self, motor: Motor) -> Option<MotorCode> {
        self.lines(motor).and_then(|(a, b)| MotorCode::from_lines(a, b))
    }

    /// `(left, right)` codes.
    pub fn codes(&self) -> (Option<MotorCode>, Option<MotorCode>) {
        (self.code(Motor::Left), self.code(Motor::Right))
    }

    /// Total number of successful per-motor writes.
    pub fn writes(&self) -> usize {
        self.log.lock().writes
    }

    /// Make every subsequent write fail with a hardware fault.
    pub fn set_failing(&self, failing: bool) {
        self.log.lock().failing = failing;
    }
}

impl ActuatorPort for SimActuatorPort {
    fn id(&self) -> &str {
        "sim_h_bridge"
    }

    fn write_lines(
        &mut self,
        motor: Motor,
        a: LineLevel,
        b: LineLevel,
    ) -> Result<(), RoverError> {
        let mut log = self.log.lock();
        if log.failing {
            return Err(RoverError::HardwareFault {
                component: motor.id().to_string(),
                details: "injected write failure".to_string(),
            });
        }
        match motor {
            Motor::Left => log.left = Some((a, b)),
            Motor::Right => log.right = Some((a, b)),
        }
        log.writes += 1;
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Simulated ranger
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct RangerState {
    distance_cm: f64,
    script: VecDeque<Result<f64, String>>,
    reads: usize,
}

/// A simulated distance sensor.
///
/// Scripted samples (and failures) are returned first, in order; once the
/// script is drained every read returns the current steady distance.
#[derive(Debug, Clone)]
pub struct SimRanger {
    state: Arc<Mutex<RangerState>>,
}

impl SimRanger {
    /// Create a ranger that reports `distance_cm` until told otherwise.
    pub fn new(distance_cm: f64) -> Self {
        Self {
            state: Arc::new(Mutex::new(RangerState {
                distance_cm,
                script: VecDeque::new(),
                reads: 0,
            })),
        }
    }

    /// Build a ranger that replays `samples` and then holds the last one.
    pub fn scripted(samples: impl IntoIterator<Item = f64>) -> Self {
        let ranger = Self::new(f64::INFINITY);
        let mut last = None;
        for s in samples {
            ranger.push_sample(s);
            last = Some(s);
        }
        if let Some(s) = last {
            ranger.set_distance(s);
        }
        ranger
    }

    /// Change the steady distance.
    pub fn set_distance(&self, distance_cm: f64) {
        self.state.lock().distance_cm = distance_cm;
    }

    pub fn distance(&self) -> f64 {
        self.state.lock().distance_cm
    }

    /// Queue a one-shot sample.
    pub fn push_sample(&self, distance_cm: f64) {
        self.state.lock().script.push_back(Ok(distance_cm));
    }

    /// Queue a one-shot read failure.
    pub fn push_failure(&self, reason: impl Into<String>) {
        self.state.lock().script.push_back(Err(reason.into()));
    }

    /// Number of reads served so far, failures included.
    pub fn reads(&self) -> usize {
        self.state.lock().reads
    }

    /// Number of scripted entries not yet consumed.
    pub fn pending(&self) -> usize {
        self.state.lock().script.len()
    }
}

impl RangingPort for SimRanger {
    fn id(&self) -> &str {
        "sim_ranger"
    }

    fn read_distance_cm(&mut self) -> Result<f64, RoverError> {
        let mut state = self.state.lock();
        state.reads += 1;
        match state.script.pop_front() {
            Some(Ok(d)) => Ok(d),
            Some(Err(reason)) => Err(RoverError::RangingFailed(reason)),
            None => Ok(state.distance_cm),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
