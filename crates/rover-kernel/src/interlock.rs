//! [`SafetyInterlock`] – stops forward motion when an obstacle appears.
//!
//! Subscribed to the obstacle detector.  On a `Detected` edge, if avoidance
//! is enabled and the robot is moving forward, the interlock stops the
//! drive before the notification returns.  A `Clear` edge never resumes
//! motion; the operator has to issue a new command.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use rover_types::{ClearanceEvent, ClearanceState, DriveState};
use tracing::{debug, info, warn};

use crate::drive::DriveController;
use crate::obstacle::ClearanceListener;

pub struct SafetyInterlock {
    drive: Arc<DriveController>,
    avoidance: AtomicBool,
    interventions: AtomicUsize,
}

impl SafetyInterlock {
    pub fn new(drive: Arc<DriveController>, avoidance_enabled: bool) -> Self {
        Self {
            drive,
            avoidance: AtomicBool::new(avoidance_enabled),
            interventions: AtomicUsize::new(0),
        }
    }

    pub fn enable(&self) {
        self.set_enabled(true);
    }

    pub fn disable(&self) {
        self.set_enabled(false);
    }

    pub fn set_enabled(&self, enabled: bool) {
        let was = self.avoidance.swap(enabled, Ordering::AcqRel);
        if was != enabled {
            info!(enabled, "obstacle avoidance toggled");
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.avoidance.load(Ordering::Acquire)
    }

    /// Number of forced stops issued so far.
    pub fn interventions(&self) -> usize {
        self.interventions.load(Ordering::Relaxed)
    }
}

impl ClearanceListener for SafetyInterlock {
    fn on_clearance(&self, event: &ClearanceEvent) {
        if event.state != ClearanceState::Detected {
            return;
        }
        // Read once: a toggle racing with this handler applies to the next
        // notification, not this one.
        if !self.is_enabled() {
            debug!(distance_cm = event.distance_cm, "obstacle detected; avoidance disabled");
            return;
        }
        if self.drive.stop_if(DriveState::MovingForward) {
            self.interventions.fetch_add(1, Ordering::Relaxed);
            warn!(distance_cm = event.distance_cm, "robot stopped: obstacle detected");
        }
    }
}
