//! [`CommandDispatcher`] – routes recognised utterances to the motion core.
//!
//! Accepts the canonical tokens (`move-forward`, `enable-avoidance`, …) and
//! the spoken forms a recogniser tends to produce (`"Move Forward"`,
//! `"engage obstacle detection"`).  Anything else is ignored.

use std::sync::Arc;

use rover_types::Command;
use tracing::debug;

use crate::drive::DriveController;
use crate::interlock::SafetyInterlock;

/// Lowercase, trim, and join words with `-`.
pub fn normalize(utterance: &str) -> String {
    utterance
        .split(|c: char| c.is_whitespace() || c == '_' || c == '-')
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// Resolve an utterance to a [`Command`], if it names one.
pub fn resolve(utterance: &str) -> Option<Command> {
    let token = normalize(utterance);
    match token.as_str() {
        "engage-obstacle-detection" => Some(Command::EnableAvoidance),
        "disengage-obstacle-detection" => Some(Command::DisableAvoidance),
        other => other.parse().ok(),
    }
}

pub struct CommandDispatcher {
    drive: Arc<DriveController>,
    interlock: Arc<SafetyInterlock>,
}

impl CommandDispatcher {
    pub fn new(drive: Arc<DriveController>, interlock: Arc<SafetyInterlock>) -> Self {
        Self { drive, interlock }
    }

    /// Resolve and execute `utterance`.  Returns the command that ran, or
    /// `None` when the utterance was not recognised.
    pub fn dispatch(&self, utterance: &str) -> Option<Command> {
        let Some(cmd) = resolve(utterance) else {
            debug!(utterance, "ignoring unknown command");
            return None;
        };
        self.execute(cmd);
        Some(cmd)
    }

    pub fn execute(&self, cmd: Command) {
        match cmd {
            Command::Drive(drive_cmd) => {
                self.drive.execute(drive_cmd);
            }
            Command::EnableAvoidance => self.interlock.enable(),
            Command::DisableAvoidance => self.interlock.disable(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rover_hal::SimActuatorPort;
    use rover_types::{DriveCommand, DriveState};

    fn dispatcher() -> (CommandDispatcher, Arc<DriveController>, Arc<SafetyInterlock>) {
        let drive = Arc::new(DriveController::with_port(SimActuatorPort::new()));
        let interlock = Arc::new(SafetyInterlock::new(drive.clone(), true));
        (
            CommandDispatcher::new(drive.clone(), interlock.clone()),
            drive,
            interlock,
        )
    }

    #[test]
    fn normalize_handles_spoken_forms() {
        assert_eq!(normalize("  Move   Forward "), "move-forward");
        assert_eq!(normalize("rotate_left"), "rotate-left");
        assert_eq!(normalize("turn-right"), "turn-right");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn every_token_dispatches() {
        let (d, drive, interlock) = dispatcher();
        for cmd in DriveCommand::ALL {
            assert_eq!(d.dispatch(cmd.token()), Some(Command::Drive(cmd)));
            assert_eq!(drive.state(), cmd.resulting_state());
        }
        d.dispatch("disable-avoidance");
        assert!(!interlock.is_enabled());
        d.dispatch("enable-avoidance");
        assert!(interlock.is_enabled());
    }

    #[test]
    fn spoken_aliases_toggle_avoidance() {
        let (d, _drive, interlock) = dispatcher();
        assert_eq!(
            d.dispatch("disengage obstacle detection"),
            Some(Command::DisableAvoidance)
        );
        assert!(!interlock.is_enabled());
        assert_eq!(
            d.dispatch("Engage Obstacle Detection"),
            Some(Command::EnableAvoidance)
        );
        assert!(interlock.is_enabled());
    }

    #[test]
    fn unknown_tokens_are_ignored() {
        let (d, drive, interlock) = dispatcher();
        d.dispatch("move forward");
        assert_eq!(d.dispatch("fly away"), None);
        assert_eq!(d.dispatch(""), None);
        assert_eq!(drive.state(), DriveState::MovingForward);
        assert!(interlock.is_enabled());
    }
}
