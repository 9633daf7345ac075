//! `rover-types` – shared vocabulary for the rover motion core.
//!
//! Every crate in the workspace speaks in these types: the drive commands a
//! dispatcher accepts, the motion state the drive controller publishes, the
//! clearance edges the obstacle detector emits, and the error type the ports
//! return.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ────────────────────────────────────────────────────────────────────────────
// Motion state
// ────────────────────────────────────────────────────────────────────────────

/// The robot's current motion state.  Exactly one value holds at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum DriveState {
    MovingForward = 0,
    MovingReverse = 1,
    RotatingRight = 2,
    RotatingLeft = 3,
    TurningRight = 4,
    TurningLeft = 5,
    #[default]
    Stopped = 6,
}

impl fmt::Display for DriveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DriveState::MovingForward => "moving forward",
            DriveState::MovingReverse => "moving reverse",
            DriveState::RotatingRight => "rotating right",
            DriveState::RotatingLeft => "rotating left",
            DriveState::TurningRight => "turning right",
            DriveState::TurningLeft => "turning left",
            DriveState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Commands
// ────────────────────────────────────────────────────────────────────────────

/// One of the seven discrete motion directives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DriveCommand {
    MoveForward,
    MoveReverse,
    TurnRight,
    TurnLeft,
    RotateRight,
    RotateLeft,
    Stop,
}

impl DriveCommand {
    /// All seven commands, in table order.
    pub const ALL: [DriveCommand; 7] = [
        DriveCommand::MoveForward,
        DriveCommand::MoveReverse,
        DriveCommand::TurnRight,
        DriveCommand::TurnLeft,
        DriveCommand::RotateRight,
        DriveCommand::RotateLeft,
        DriveCommand::Stop,
    ];

    /// The [`DriveState`] that holds once this command has been applied.
    pub fn resulting_state(self) -> DriveState {
        match self {
            DriveCommand::MoveForward => DriveState::MovingForward,
            DriveCommand::MoveReverse => DriveState::MovingReverse,
            DriveCommand::TurnRight => DriveState::TurningRight,
            DriveCommand::TurnLeft => DriveState::TurningLeft,
            DriveCommand::RotateRight => DriveState::RotatingRight,
            DriveCommand::RotateLeft => DriveState::RotatingLeft,
            DriveCommand::Stop => DriveState::Stopped,
        }
    }

    /// Wire token, e.g. `"move-forward"`.
    pub fn token(self) -> &'static str {
        match self {
            DriveCommand::MoveForward => "move-forward",
            DriveCommand::MoveReverse => "move-reverse",
            DriveCommand::TurnRight => "turn-right",
            DriveCommand::TurnLeft => "turn-left",
            DriveCommand::RotateRight => "rotate-right",
            DriveCommand::RotateLeft => "rotate-left",
            DriveCommand::Stop => "stop",
        }
    }
}

/// The closed set of tokens a command dispatcher understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Command {
    /// Forward a motion directive to the drive controller.
    Drive(DriveCommand),
    /// Turn the obstacle interlock on.
    EnableAvoidance,
    /// Turn the obstacle interlock off.
    DisableAvoidance,
}

impl Command {
    pub fn token(self) -> &'static str {
        match self {
            Command::Drive(cmd) => cmd.token(),
            Command::EnableAvoidance => "enable-avoidance",
            Command::DisableAvoidance => "disable-avoidance",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Command {
    type Err = RoverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cmd = match s {
            "move-forward" => Command::Drive(DriveCommand::MoveForward),
            "move-reverse" => Command::Drive(DriveCommand::MoveReverse),
            "turn-right" => Command::Drive(DriveCommand::TurnRight),
            "turn-left" => Command::Drive(DriveCommand::TurnLeft),
            "rotate-right" => Command::Drive(DriveCommand::RotateRight),
            "rotate-left" => Command::Drive(DriveCommand::RotateLeft),
            "stop" => Command::Drive(DriveCommand::Stop),
            "enable-avoidance" => Command::EnableAvoidance,
            "disable-avoidance" => Command::DisableAvoidance,
            other => return Err(RoverError::UnknownCommand(other.to_string())),
        };
        Ok(cmd)
    }
}

impl TryFrom<String> for Command {
    type Error = RoverError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Command> for String {
    fn from(cmd: Command) -> Self {
        cmd.token().to_string()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Clearance
// ────────────────────────────────────────────────────────────────────────────

/// Edge-triggered forward clearance reported by the obstacle detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearanceState {
    /// Nothing within the minimum distance.
    #[default]
    Clear,
    /// Minimum distance breached, obstacle ahead.
    Detected,
}

impl fmt::Display for ClearanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClearanceState::Clear => f.write_str("clear"),
            ClearanceState::Detected => f.write_str("detected"),
        }
    }
}

/// Notification raised on a [`ClearanceState`] transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearanceEvent {
    /// The state just entered.
    pub state: ClearanceState,
    /// The sample (cm) that caused the transition.
    pub distance_cm: f64,
    pub timestamp: DateTime<Utc>,
}

impl ClearanceEvent {
    pub fn new(state: ClearanceState, distance_cm: f64) -> Self {
        Self {
            state,
            distance_cm,
            timestamp: Utc::now(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Error type shared by the hardware ports and the motion core.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RoverError {
    #[error("Port Not Ready: {component}")]
    PortNotReady { component: String },

    #[error("Hardware Fault on {component}: {details}")]
    HardwareFault { component: String, details: String },

    #[error("Ranging Read Failed: {0}")]
    RangingFailed(String),

    #[error("Unknown Command: {0:?}")]
    UnknownCommand(String),

    #[error("Configuration Error: {0}")]
    Config(String),
}
