//! `rover-kernel` – Motion Core
//!
//! Two execution contexts meet here: the command path (one call per
//! recognised utterance) and the obstacle monitor thread (one tick per
//! sampling period).  They share exactly two values, the drive state and the
//! avoidance flag, each held in its own atomic cell.
//!
//! # Modules
//!
//! - [`drive`] – [`DriveController`][drive::DriveController]: the drive
//!   state machine; single writer of [`DriveState`][rover_types::DriveState].
//! - [`obstacle`] – [`ObstacleDetector`][obstacle::ObstacleDetector]:
//!   periodic ranging with edge-triggered Clear/Detected notifications.
//! - [`interlock`] – [`SafetyInterlock`][interlock::SafetyInterlock]: stops
//!   forward motion on a `Detected` edge when avoidance is enabled.
//! - [`dispatcher`] – [`CommandDispatcher`][dispatcher::CommandDispatcher]:
//!   maps command tokens and spoken phrases onto the above.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use rover_hal::{SimActuatorPort, SimRanger};
//! use rover_kernel::{CommandDispatcher, DetectorConfig, DriveController, ObstacleDetector, SafetyInterlock};
//! use rover_types::DriveState;
//!
//! let drive = Arc::new(DriveController::with_port(SimActuatorPort::new()));
//! let interlock = Arc::new(SafetyInterlock::new(drive.clone(), true));
//! let dispatcher = CommandDispatcher::new(drive.clone(), interlock.clone());
//!
//! let ranger = SimRanger::scripted([80.0, 15.0]);
//! let mut detector = ObstacleDetector::new(ranger, DetectorConfig::default());
//! detector.subscribe(interlock);
//!
//! dispatcher.dispatch("move forward");
//! detector.tick();
//! assert_eq!(drive.state(), DriveState::MovingForward);
//! detector.tick();
//! assert_eq!(drive.state(), DriveState::Stopped);
//! ```

pub mod dispatcher;
pub mod drive;
pub mod interlock;
pub mod obstacle;

pub use dispatcher::CommandDispatcher;
pub use drive::DriveController;
pub use interlock::SafetyInterlock;
pub use obstacle::{
    ClearanceListener, ClearanceView, DetectorConfig, MinDistance, ObstacleDetector,
    ObstacleMonitor,
};
