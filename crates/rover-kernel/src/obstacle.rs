//! [`ObstacleDetector`] – periodic forward-clearance sampling.
//!
//! Each tick takes one sample from the [`RangingPort`] and feeds it to a
//! [`ClearanceTracker`]:
//!
//! - sample ≤ min distance while `Clear` → enter `Detected`, notify;
//! - sample > min distance while `Detected` → enter `Clear`, notify;
//! - anything else → no change, no notification.
//!
//! There is a single threshold with no hysteresis band, so a sensor hovering
//! exactly at the boundary produces one notification per crossing.
//!
//! Listeners run inline on the sampling thread before the next tick, so a
//! slow listener delays the next sample.  A failed read skips the tick.
//!
//! [`ObstacleDetector::spawn`] moves the detector onto a dedicated thread
//! that runs for the rest of the process lifetime.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rover_hal::RangingPort;
use rover_types::{ClearanceEvent, ClearanceState};
use tracing::{debug, error, info, warn};

/// Default sampling period.
pub const DEFAULT_SAMPLE_PERIOD: Duration = Duration::from_millis(100);

/// Default minimum clearance in centimetres.
pub const DEFAULT_MIN_DISTANCE_CM: f64 = 30.0;

const MONITOR_THREAD_NAME: &str = "obstacle-monitor";

// ────────────────────────────────────────────────────────────────────────────
// Configuration & shared handles
// ────────────────────────────────────────────────────────────────────────────

/// Construction-time settings for an [`ObstacleDetector`].
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
    pub sample_period: Duration,
    pub min_distance_cm: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            sample_period: DEFAULT_SAMPLE_PERIOD,
            min_distance_cm: DEFAULT_MIN_DISTANCE_CM,
        }
    }
}

/// Shared, runtime-adjustable minimum distance.
///
/// The sampling loop reads it once per tick, so a change is observed by the
/// next sample.
#[derive(Debug, Clone)]
pub struct MinDistance(Arc<AtomicU64>);

impl MinDistance {
    pub fn new(cm: f64) -> Self {
        Self(Arc::new(AtomicU64::new(cm.to_bits())))
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, cm: f64) {
        self.0.store(cm.to_bits(), Ordering::Release);
    }
}

/// Read-only view of the detector's latest [`ClearanceState`].
#[derive(Debug, Clone, Default)]
pub struct ClearanceView(Arc<AtomicBool>);

impl ClearanceView {
    pub fn get(&self) -> ClearanceState {
        if self.0.load(Ordering::Acquire) {
            ClearanceState::Detected
        } else {
            ClearanceState::Clear
        }
    }

    fn publish(&self, state: ClearanceState) {
        self.0
            .store(state == ClearanceState::Detected, Ordering::Release);
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Listener
// ────────────────────────────────────────────────────────────────────────────

/// Receives clearance transitions.
pub trait ClearanceListener: Send + Sync {
    fn on_clearance(&self, event: &ClearanceEvent);
}

impl<F> ClearanceListener for F
where
    F: Fn(&ClearanceEvent) + Send + Sync,
{
    fn on_clearance(&self, event: &ClearanceEvent) {
        self(event)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Edge detector
// ────────────────────────────────────────────────────────────────────────────

/// Edge-triggered Clear/Detected tracker.  Starts `Clear`.
#[derive(Debug, Default)]
pub struct ClearanceTracker {
    state: ClearanceState,
}

impl ClearanceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ClearanceState {
        self.state
    }

    /// Feed one sample; returns an event only when the state flips.
    pub fn observe(&mut self, sample_cm: f64, min_distance_cm: f64) -> Option<ClearanceEvent> {
        let next = match self.state {
            ClearanceState::Clear if sample_cm <= min_distance_cm => ClearanceState::Detected,
            ClearanceState::Detected if sample_cm > min_distance_cm => ClearanceState::Clear,
            _ => return None,
        };
        self.state = next;
        Some(ClearanceEvent::new(next, sample_cm))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// ObstacleDetector
// ────────────────────────────────────────────────────────────────────────────

/// Owns the ranging port and the sampling state.
pub struct ObstacleDetector {
    ranger: Box<dyn RangingPort>,
    sample_period: Duration,
    min_distance: MinDistance,
    tracker: ClearanceTracker,
    clearance: ClearanceView,
    listeners: Vec<Arc<dyn ClearanceListener>>,
}

impl ObstacleDetector {
    pub fn new(ranger: impl RangingPort + 'static, config: DetectorConfig) -> Self {
        Self {
            ranger: Box::new(ranger),
            sample_period: config.sample_period,
            min_distance: MinDistance::new(config.min_distance_cm),
            tracker: ClearanceTracker::new(),
            clearance: ClearanceView::default(),
            listeners: Vec::new(),
        }
    }

    /// Register a listener.  Listeners are notified in registration order.
    pub fn subscribe(&mut self, listener: Arc<dyn ClearanceListener>) {
        self.listeners.push(listener);
    }

    /// Handle to the threshold used by this detector.
    pub fn min_distance(&self) -> MinDistance {
        self.min_distance.clone()
    }

    pub fn clearance(&self) -> ClearanceView {
        self.clearance.clone()
    }

    pub fn state(&self) -> ClearanceState {
        self.tracker.state()
    }

    /// Run one sampling step without sleeping.
    ///
    /// Returns the transition that was emitted, if any.  A ranging failure
    /// yields `None` and leaves the clearance state untouched.
    pub fn tick(&mut self) -> Option<ClearanceEvent> {
        let sample = match self.ranger.read_distance_cm() {
            Ok(cm) => cm,
            Err(e) => {
                debug!(sensor = self.ranger.id(), error = %e, "ranging read failed; skipping tick");
                return None;
            }
        };

        let event = self.tracker.observe(sample, self.min_distance.get())?;
        self.clearance.publish(event.state);
        info!(state = %event.state, distance_cm = event.distance_cm, "clearance changed");
        self.notify(&event);
        Some(event)
    }

    fn notify(&self, event: &ClearanceEvent) {
        for listener in &self.listeners {
            let delivered = panic::catch_unwind(AssertUnwindSafe(|| listener.on_clearance(event)));
            if delivered.is_err() {
                error!(state = %event.state, "clearance listener panicked");
            }
        }
    }

    /// Move the detector onto its own thread and start sampling.
    ///
    /// The loop has no stop condition; it ends with the process.
    pub fn spawn(self) -> std::io::Result<ObstacleMonitor> {
        let min_distance = self.min_distance();
        let clearance = self.clearance();
        let period = self.sample_period;
        let thread = thread::Builder::new()
            .name(MONITOR_THREAD_NAME.to_string())
            .spawn(move || self.run())?;
        info!(period_ms = period.as_millis() as u64, "obstacle monitor started");
        Ok(ObstacleMonitor {
            thread,
            min_distance,
            clearance,
        })
    }

    fn run(mut self) {
        loop {
            let cycle_start = Instant::now();
            self.tick();

            let elapsed = cycle_start.elapsed();
            if elapsed < self.sample_period {
                thread::sleep(self.sample_period - elapsed);
            } else {
                warn!(elapsed = ?elapsed, period = ?self.sample_period, "sampling cycle overrun");
            }
        }
    }
}

/// Handle to a running sampling loop.
pub struct ObstacleMonitor {
    thread: JoinHandle<()>,
    min_distance: MinDistance,
    clearance: ClearanceView,
}

impl ObstacleMonitor {
    pub fn min_distance(&self) -> MinDistance {
        self.min_distance.clone()
    }

    pub fn clearance(&self) -> ClearanceView {
        self.clearance.clone()
    }

    pub fn thread_name(&self) -> Option<&str> {
        self.thread.thread().name()
    }

    /// `false` would mean the loop died, which only a panic outside a
    /// listener can cause.
    pub fn is_running(&self) -> bool {
        !self.thread.is_finished()
    }
}
