//! [`DriveController`] – the drive state machine.
//!
//! Maps each of the seven [`DriveCommand`]s to a pair of per-motor
//! [`MotorCode`]s, writes them to the bound [`ActuatorPort`], and then
//! publishes the resulting [`DriveState`].
//!
//! | Command | Left | Right | State |
//! |---|---|---|---|
//! | `MoveForward` | Forward | Forward | `MovingForward` |
//! | `MoveReverse` | Reverse | Reverse | `MovingReverse` |
//! | `TurnRight` | Forward | Brake | `TurningRight` |
//! | `TurnLeft` | Brake | Forward | `TurningLeft` |
//! | `RotateRight` | Reverse | Forward | `RotatingRight` |
//! | `RotateLeft` | Forward | Reverse | `RotatingLeft` |
//! | `Stop` | Brake | Brake | `Stopped` |
//!
//! The controller is shared (`Arc<DriveController>`) between the command
//! path and the safety interlock.  Port writes and the state update happen
//! under one port lock, so two writers never interleave their line codes;
//! the state itself lives in an atomic cell so readers never take the lock.
//!
//! # Example
//!
//! ```
//! use rover_hal::{Motor, MotorCode, SimActuatorPort};
//! use rover_kernel::drive::DriveController;
//! use rover_types::DriveState;
//!
//! let probe = SimActuatorPort::new();
//! let drive = DriveController::with_port(probe.clone());
//!
//! drive.turn_left();
//! assert_eq!(drive.state(), DriveState::TurningLeft);
//! assert_eq!(probe.code(Motor::Left), Some(MotorCode::Brake));
//! assert_eq!(probe.code(Motor::Right), Some(MotorCode::Forward));
//! ```

use std::sync::atomic::{AtomicU8, Ordering};

use parking_lot::Mutex;
use rover_hal::{ActuatorPort, Motor, MotorCode};
use rover_types::{DriveCommand, DriveState, RoverError};
use tracing::{debug, error, info, warn};

// ────────────────────────────────────────────────────────────────────────────
// Command table
// ────────────────────────────────────────────────────────────────────────────

/// `(left, right)` motor codes for `cmd`.
pub fn motor_codes(cmd: DriveCommand) -> (MotorCode, MotorCode) {
    use MotorCode::{Brake, Forward, Reverse};
    match cmd {
        DriveCommand::MoveForward => (Forward, Forward),
        DriveCommand::MoveReverse => (Reverse, Reverse),
        DriveCommand::TurnRight => (Forward, Brake),
        DriveCommand::TurnLeft => (Brake, Forward),
        DriveCommand::RotateRight => (Reverse, Forward),
        DriveCommand::RotateLeft => (Forward, Reverse),
        DriveCommand::Stop => (Brake, Brake),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Atomic state cell
// ────────────────────────────────────────────────────────────────────────────

/// Lock-free cell holding a [`DriveState`].
///
/// Stores the enum's `u8` discriminant, so a load always yields one of the
/// seven whole values.
#[derive(Debug)]
pub struct AtomicDriveState {
    inner: AtomicU8,
}

impl AtomicDriveState {
    pub fn new(state: DriveState) -> Self {
        Self {
            inner: AtomicU8::new(state as u8),
        }
    }

    pub fn load(&self) -> DriveState {
        decode(self.inner.load(Ordering::Acquire))
    }

    pub fn store(&self, state: DriveState) {
        self.inner.store(state as u8, Ordering::Release);
    }
}

fn decode(raw: u8) -> DriveState {
    match raw {
        0 => DriveState::MovingForward,
        1 => DriveState::MovingReverse,
        2 => DriveState::RotatingRight,
        3 => DriveState::RotatingLeft,
        4 => DriveState::TurningRight,
        5 => DriveState::TurningLeft,
        // Only `store` writes the cell, so 6 is the only remaining value.
        _ => DriveState::Stopped,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// DriveController
// ────────────────────────────────────────────────────────────────────────────

/// Single writer of the robot's [`DriveState`].
///
/// Every drive operation is total: it never fails and has no precondition
/// on the current state.  Before a port is bound (or after it is unbound)
/// operations are no-ops that leave the state untouched.
pub struct DriveController {
    port: Mutex<Option<Box<dyn ActuatorPort>>>,
    state: AtomicDriveState,
}

impl Default for DriveController {
    fn default() -> Self {
        Self::new()
    }
}

impl DriveController {
    /// Create an unbound controller in the [`DriveState::Stopped`] state.
    pub fn new() -> Self {
        Self {
            port: Mutex::new(None),
            state: AtomicDriveState::new(DriveState::Stopped),
        }
    }

    /// Create a controller and immediately bind `port`.
    pub fn with_port(port: impl ActuatorPort + 'static) -> Self {
        let drive = Self::new();
        drive.bind(Box::new(port));
        drive
    }

    /// Install `port`, brake both motors and reset the state to
    /// [`DriveState::Stopped`].
    ///
    /// A previously bound port is released and returned.
    pub fn bind(&self, port: Box<dyn ActuatorPort>) -> Option<Box<dyn ActuatorPort>> {
        let mut slot = self.port.lock();
        let previous = slot.take();
        if let Some(old) = &previous {
            info!(port = old.id(), "releasing actuator port");
        }
        let mut port = port;
        if let Err(e) = write_command(port.as_mut(), DriveCommand::Stop) {
            error!(port = port.id(), error = %e, "failed to brake motors while binding");
        }
        info!(port = port.id(), "actuator port bound");
        *slot = Some(port);
        self.state.store(DriveState::Stopped);
        previous
    }

    /// Release the bound port.  Subsequent operations become no-ops.
    pub fn unbind(&self) -> Option<Box<dyn ActuatorPort>> {
        self.port.lock().take()
    }

    pub fn is_bound(&self) -> bool {
        self.port.lock().is_some()
    }

    /// The current motion state.  Never blocks.
    pub fn state(&self) -> DriveState {
        self.state.load()
    }

    /// Apply `cmd`.
    ///
    /// Returns `true` when both motors were written and the state updated;
    /// `false` when the port is not bound or a write failed (the state is
    /// left unchanged in both cases).
    pub fn execute(&self, cmd: DriveCommand) -> bool {
        let mut slot = self.port.lock();
        self.apply_locked(&mut slot, cmd)
    }

    /// Issue [`DriveCommand::Stop`] only if the state currently equals
    /// `expected`.
    ///
    /// The check and the stop happen under the port lock, so a command that
    /// lands concurrently is either fully before (and decides the check) or
    /// fully after (and overrides the stop).
    pub fn stop_if(&self, expected: DriveState) -> bool {
        let mut slot = self.port.lock();
        if self.state.load() != expected {
            return false;
        }
        self.apply_locked(&mut slot, DriveCommand::Stop)
    }

    fn apply_locked(&self, slot: &mut Option<Box<dyn ActuatorPort>>, cmd: DriveCommand) -> bool {
        let Some(port) = slot.as_mut() else {
            let err = RoverError::PortNotReady {
                component: "drive_controller".to_string(),
            };
            warn!(command = cmd.token(), error = %err, "drive command ignored");
            return false;
        };
        if let Err(e) = write_command(port.as_mut(), cmd) {
            error!(
                command = cmd.token(),
                error = %e,
                "drive command aborted: actuator write failed"
            );
            return false;
        }
        let from = self.state.load();
        let to = cmd.resulting_state();
        self.state.store(to);
        debug!(command = cmd.token(), from = ?from, to = ?to, "drive state updated");
        true
    }

    pub fn move_forward(&self) -> bool {
        self.execute(DriveCommand::MoveForward)
    }

    pub fn move_reverse(&self) -> bool {
        self.execute(DriveCommand::MoveReverse)
    }

    pub fn turn_right(&self) -> bool {
        self.execute(DriveCommand::TurnRight)
    }

    pub fn turn_left(&self) -> bool {
        self.execute(DriveCommand::TurnLeft)
    }

    pub fn rotate_right(&self) -> bool {
        self.execute(DriveCommand::RotateRight)
    }

    pub fn rotate_left(&self) -> bool {
        self.execute(DriveCommand::RotateLeft)
    }

    pub fn stop(&self) -> bool {
        self.execute(DriveCommand::Stop)
    }
}

/// Write both motor codes for `cmd`, left first.
///
/// A failed left write aborts every command except `Stop`, which still
/// brakes the right motor.  The first error is returned.
fn write_command(port: &mut dyn ActuatorPort, cmd: DriveCommand) -> Result<(), RoverError> {
    let (left, right) = motor_codes(cmd);
    let left_result = port.write_code(Motor::Left, left);
    if left_result.is_err() && cmd != DriveCommand::Stop {
        return left_result;
    }
    let right_result = port.write_code(Motor::Right, right);
    left_result.and(right_result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rover_hal::{LineLevel, SimActuatorPort};
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;
    use std::thread;

    /// Records every `(motor, code)` write in the order the port saw it.
    struct HistoryPort(Arc<Mutex<Vec<(Motor, MotorCode)>>>);

    impl ActuatorPort for HistoryPort {
        fn id(&self) -> &str {
            "history"
        }

        fn write_lines(
            &mut self,
            motor: Motor,
            a: LineLevel,
            b: LineLevel,
        ) -> Result<(), RoverError> {
            let code = MotorCode::from_lines(a, b).expect("valid code");
            self.0.lock().push((motor, code));
            Ok(())
        }
    }

    /// Left line driver is dead; right writes are recorded.
    struct LeftFaultPort(Arc<Mutex<Vec<MotorCode>>>);

    impl ActuatorPort for LeftFaultPort {
        fn id(&self) -> &str {
            "left_fault"
        }

        fn write_lines(
            &mut self,
            motor: Motor,
            a: LineLevel,
            b: LineLevel,
        ) -> Result<(), RoverError> {
            match motor {
                Motor::Left => Err(RoverError::HardwareFault {
                    component: motor.id().to_string(),
                    details: "line stuck".to_string(),
                }),
                Motor::Right => {
                    let code = MotorCode::from_lines(a, b).expect("valid code");
                    self.0.lock().push(code);
                    Ok(())
                }
            }
        }
    }

    fn bound() -> (DriveController, SimActuatorPort) {
        let probe = SimActuatorPort::new();
        (DriveController::with_port(probe.clone()), probe)
    }

    #[test]
    fn every_command_writes_its_table_codes_and_state() {
        use MotorCode::{Brake, Forward, Reverse};
        let expected = [
            (DriveCommand::MoveForward, Forward, Forward, DriveState::MovingForward),
            (DriveCommand::MoveReverse, Reverse, Reverse, DriveState::MovingReverse),
            (DriveCommand::TurnRight, Forward, Brake, DriveState::TurningRight),
            (DriveCommand::TurnLeft, Brake, Forward, DriveState::TurningLeft),
            (DriveCommand::RotateRight, Reverse, Forward, DriveState::RotatingRight),
            (DriveCommand::RotateLeft, Forward, Reverse, DriveState::RotatingLeft),
            (DriveCommand::Stop, Brake, Brake, DriveState::Stopped),
        ];
        let (drive, probe) = bound();
        for (cmd, left, right, state) in expected {
            assert!(drive.execute(cmd), "{cmd:?} must apply");
            assert_eq!(probe.codes(), (Some(left), Some(right)), "{cmd:?} codes");
            assert_eq!(drive.state(), state, "{cmd:?} state");
        }
    }

    #[test]
    fn named_operations_match_execute() {
        let (drive, probe) = bound();
        drive.move_forward();
        assert_eq!(drive.state(), DriveState::MovingForward);
        drive.move_reverse();
        assert_eq!(drive.state(), DriveState::MovingReverse);
        drive.turn_right();
        assert_eq!(drive.state(), DriveState::TurningRight);
        drive.rotate_right();
        assert_eq!(drive.state(), DriveState::RotatingRight);
        assert_eq!(
            probe.codes(),
            (Some(MotorCode::Reverse), Some(MotorCode::Forward))
        );
        drive.rotate_left();
        assert_eq!(drive.state(), DriveState::RotatingLeft);
        drive.turn_left();
        assert_eq!(drive.state(), DriveState::TurningLeft);
        drive.stop();
        assert_eq!(drive.state(), DriveState::Stopped);
    }

    #[test]
    fn stop_is_idempotent() {
        let (drive, probe) = bound();
        assert_eq!(drive.state(), DriveState::Stopped);
        let before = probe.codes();
        assert!(drive.stop());
        assert!(drive.stop());
        assert_eq!(drive.state(), DriveState::Stopped);
        assert_eq!(probe.codes(), before);
        assert_eq!(
            probe.codes(),
            (Some(MotorCode::Brake), Some(MotorCode::Brake))
        );
    }

    #[test]
    fn unbound_controller_is_a_noop() {
        let drive = DriveController::new();
        assert!(!drive.is_bound());
        assert_eq!(drive.state(), DriveState::Stopped);
        assert!(!drive.move_forward());
        assert_eq!(drive.state(), DriveState::Stopped);
    }

    #[test]
    fn bind_brakes_and_resets_to_stopped() {
        let (drive, _first) = bound();
        drive.move_forward();

        let second = SimActuatorPort::new();
        let previous = drive.bind(Box::new(second.clone()));
        assert!(previous.is_some());
        assert_eq!(drive.state(), DriveState::Stopped);
        assert_eq!(
            second.codes(),
            (Some(MotorCode::Brake), Some(MotorCode::Brake))
        );
    }

    #[test]
    fn unbind_leaves_state_and_ignores_later_commands() {
        let (drive, probe) = bound();
        drive.rotate_left();
        assert!(drive.unbind().is_some());
        assert!(!drive.stop());
        assert_eq!(drive.state(), DriveState::RotatingLeft);
        assert_eq!(
            probe.codes(),
            (Some(MotorCode::Forward), Some(MotorCode::Reverse))
        );
    }

    #[test]
    fn failed_write_leaves_state_unchanged() {
        let (drive, probe) = bound();
        drive.move_reverse();
        probe.set_failing(true);
        assert!(!drive.move_forward());
        assert_eq!(drive.state(), DriveState::MovingReverse);
        probe.set_failing(false);
        assert!(drive.move_forward());
        assert_eq!(drive.state(), DriveState::MovingForward);
    }

    #[test]
    fn stop_if_only_fires_on_expected_state() {
        let (drive, _probe) = bound();
        drive.turn_left();
        assert!(!drive.stop_if(DriveState::MovingForward));
        assert_eq!(drive.state(), DriveState::TurningLeft);

        drive.move_forward();
        assert!(drive.stop_if(DriveState::MovingForward));
        assert_eq!(drive.state(), DriveState::Stopped);
    }

    #[test]
    fn atomic_cell_round_trips_every_state() {
        let cell = AtomicDriveState::new(DriveState::Stopped);
        for cmd in DriveCommand::ALL {
            cell.store(cmd.resulting_state());
            assert_eq!(cell.load(), cmd.resulting_state());
        }
    }

    #[test]
    fn concurrent_readers_always_see_a_commanded_state() {
        let probe = SimActuatorPort::new();
        let drive = Arc::new(DriveController::with_port(probe));

        let writer = {
            let drive = drive.clone();
            thread::spawn(move || {
                for _ in 0..500 {
                    drive.move_forward();
                    drive.turn_left();
                }
                drive.stop();
            })
        };
        let reader = {
            let drive = drive.clone();
            thread::spawn(move || {
                for _ in 0..2000 {
                    let s = drive.state();
                    assert!(matches!(
                        s,
                        DriveState::MovingForward | DriveState::TurningLeft | DriveState::Stopped
                    ));
                }
            })
        };
        writer.join().unwrap();
        reader.join().unwrap();
        assert_eq!(drive.state(), DriveState::Stopped);
    }

    #[test]
    fn stop_still_brakes_the_right_motor_when_the_left_write_fails() {
        let right = Arc::new(Mutex::new(Vec::new()));
        let drive = DriveController::with_port(LeftFaultPort(right.clone()));
        assert_eq!(*right.lock(), vec![MotorCode::Brake]);

        assert!(!drive.stop());
        assert_eq!(*right.lock(), vec![MotorCode::Brake, MotorCode::Brake]);

        // Other commands abort on the first failed line.
        assert!(!drive.move_forward());
        assert_eq!(right.lock().len(), 2);
        assert_eq!(drive.state(), DriveState::Stopped);
    }

    #[test]
    fn stop_if_races_cleanly_with_the_command_path() {
        let history = Arc::new(Mutex::new(Vec::new()));
        let drive = Arc::new(DriveController::with_port(HistoryPort(history.clone())));
        history.lock().clear();
        let done = Arc::new(AtomicBool::new(false));

        let commander = {
            let drive = drive.clone();
            let done = done.clone();
            thread::spawn(move || {
                for _ in 0..500 {
                    assert!(drive.move_forward());
                    assert!(drive.turn_left());
                }
                assert!(drive.move_forward());
                done.store(true, Ordering::SeqCst);
            })
        };
        let stopper = {
            let drive = drive.clone();
            let done = done.clone();
            thread::spawn(move || {
                let mut stops = 0;
                while !done.load(Ordering::SeqCst) {
                    if drive.stop_if(DriveState::MovingForward) {
                        stops += 1;
                    }
                }
                // The commander's last word was "forward": this stop must land.
                if drive.stop_if(DriveState::MovingForward) {
                    stops += 1;
                }
                stops
            })
        };
        commander.join().unwrap();
        let stops = stopper.join().unwrap();
        assert_eq!(drive.state(), DriveState::Stopped);

        // Writes happen under the port lock, so the log is a sequence of
        // whole (left, right) pairs.
        let log = history.lock();
        assert_eq!(log.len() % 2, 0);
        let pairs: Vec<(MotorCode, MotorCode)> = log
            .chunks(2)
            .map(|w| {
                assert_eq!((w[0].0, w[1].0), (Motor::Left, Motor::Right));
                (w[0].1, w[1].1)
            })
            .collect();

        let brakes = (MotorCode::Brake, MotorCode::Brake);
        let forward = motor_codes(DriveCommand::MoveForward);
        let mut brake_count = 0;
        for (i, pair) in pairs.iter().enumerate() {
            if *pair == brakes {
                brake_count += 1;
                assert!(i > 0, "stop issued before any motion");
                assert_eq!(pairs[i - 1], forward, "stop overrode a non-forward command");
            }
        }
        assert_eq!(brake_count, stops);
        assert!(stops >= 1);
    }
}
