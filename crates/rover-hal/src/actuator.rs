//! `ActuatorPort` trait for a two-motor differential drive.
//!
//! Each motor is wired to an H-bridge through two logic lines (A and B).  The
//! direction a motor spins is selected purely by the pair of levels written
//! to those lines; there is no speed control and no acknowledgement.

use rover_types::RoverError;

/// Logic level of a single output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineLevel {
    Low,
    High,
}

impl LineLevel {
    /// Character written to a sysfs `value` file.
    pub fn as_char(self) -> char {
        match self {
            LineLevel::Low => '0',
            LineLevel::High => '1',
        }
    }
}

/// Which side of the drive base a motor sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Motor {
    Left,
    Right,
}

impl Motor {
    pub fn id(self) -> &'static str {
        match self {
            Motor::Left => "left_motor",
            Motor::Right => "right_motor",
        }
    }
}

/// Per-motor directional code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotorCode {
    /// (A, B) = (low, high)
    Forward,
    /// (A, B) = (high, low)
    Reverse,
    /// (A, B) = (low, low)
    Brake,
}

impl MotorCode {
    /// The (A, B) line levels for this code.
    pub fn lines(self) -> (LineLevel, LineLevel) {
        match self {
            MotorCode::Forward => (LineLevel::Low, LineLevel::High),
            MotorCode::Reverse => (LineLevel::High, LineLevel::Low),
            MotorCode::Brake => (LineLevel::Low, LineLevel::Low),
        }
    }

    /// Decode a line pair.  `(high, high)` is not part of the alphabet.
    pub fn from_lines(a: LineLevel, b: LineLevel) -> Option<Self> {
        match (a, b) {
            (LineLevel::Low, LineLevel::High) => Some(MotorCode::Forward),
            (LineLevel::High, LineLevel::Low) => Some(MotorCode::Reverse),
            (LineLevel::Low, LineLevel::Low) => Some(MotorCode::Brake),
            (LineLevel::High, LineLevel::High) => None,
        }
    }
}

/// Output port driving both motors of the base.
///
/// Implementations own their line handles; the drive controller owns the
/// port once it has been bound.
pub trait ActuatorPort: Send {
    /// Stable identifier for this port, e.g. `"gpio_h_bridge"`.
    fn id(&self) -> &str;

    /// Drive `motor`'s A and B lines to the given levels.
    ///
    /// # Errors
    ///
    /// Returns [`RoverError::HardwareFault`] if a line cannot be written.
    fn write_lines(&mut self, motor: Motor, a: LineLevel, b: LineLevel)
    -> Result<(), RoverError>;

    /// Write a directional code to `motor`.
    fn write_code(&mut self, motor: Motor, code: MotorCode) -> Result<(), RoverError> {
        let (a, b) = code.lines();
        self.write_lines(motor, a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal in-process port used only for tests.
    struct MockPort {
        left: (LineLevel, LineLevel),
        right: (LineLevel, LineLevel),
    }

    impl ActuatorPort for MockPort {
        fn id(&self) -> &str {
            "mock"
        }

        fn write_lines(
            &mut self,
            motor: Motor,
            a: LineLevel,
            b: LineLevel,
        ) -> Result<(), RoverError> {
            match motor {
                Motor::Left => self.left = (a, b),
                Motor::Right => self.right = (a, b),
            }
            Ok(())
        }
    }

    #[test]
    fn code_alphabet_matches_line_levels() {
        assert_eq!(MotorCode::Forward.lines(), (LineLevel::Low, LineLevel::High));
        assert_eq!(MotorCode::Reverse.lines(), (LineLevel::High, LineLevel::Low));
        assert_eq!(MotorCode::Brake.lines(), (LineLevel::Low, LineLevel::Low));
    }

    #[test]
    fn high_high_is_not_a_code() {
        assert_eq!(MotorCode::from_lines(LineLevel::High, LineLevel::High), None);
        for code in [MotorCode::Forward, MotorCode::Reverse, MotorCode::Brake] {
            let (a, b) = code.lines();
            assert_eq!(MotorCode::from_lines(a, b), Some(code));
        }
    }

    #[test]
    fn write_code_routes_to_the_right_motor() {
        let mut port = MockPort {
            left: (LineLevel::High, LineLevel::High),
            right: (LineLevel::High, LineLevel::High),
        };
        port.write_code(Motor::Left, MotorCode::Reverse).unwrap();
        port.write_code(Motor::Right, MotorCode::Brake).unwrap();
        assert_eq!(port.left, (LineLevel::High, LineLevel::Low));
        assert_eq!(port.right, (LineLevel::Low, LineLevel::Low));
    }
}
