//! HC-SR04 style ultrasonic ranger over sysfs GPIO.
//!
//! A 10 µs pulse on the trigger line starts a measurement; the sensor then
//! holds its echo line high for as long as the sound took to travel out and
//! back.  Sound covers one centimetre and back in roughly 58 µs.
//!
//! Sysfs polling adds jitter in the tens of microseconds, which is well
//! below what a 30 cm stop threshold cares about.

use std::thread;
use std::time::{Duration, Instant};

use rover_types::RoverError;

use crate::actuator::LineLevel;
use crate::gpio::{Direction, SysfsPin};
use crate::ranging::RangingPort;

/// Round-trip echo time per centimetre of range.
const MICROS_PER_CM: f64 = 58.0;

/// Beyond this the HC-SR04 reading is meaningless.
pub const MAX_RANGE_CM: f64 = 400.0;

const TRIGGER_PULSE: Duration = Duration::from_micros(10);
const TRIGGER_SETTLE: Duration = Duration::from_micros(2);

/// Convert an echo pulse width to a distance.
pub fn echo_width_to_cm(width: Duration) -> f64 {
    width.as_secs_f64() * 1_000_000.0 / MICROS_PER_CM
}

/// Front-facing ultrasonic distance sensor.
pub struct UltrasonicRanger {
    trigger: SysfsPin,
    echo: SysfsPin,
    echo_timeout: Duration,
}

impl UltrasonicRanger {
    /// Open `trigger` as an output and `echo` as an input.
    ///
    /// `echo_timeout` bounds each phase of the echo wait, so a read never
    /// blocks for longer than roughly twice that value.
    pub fn open(trigger: u32, echo: u32, echo_timeout: Duration) -> Result<Self, RoverError> {
        Ok(Self::from_pins(
            SysfsPin::open(trigger, Direction::Out)?,
            SysfsPin::open(echo, Direction::In)?,
            echo_timeout,
        ))
    }

    pub fn from_pins(trigger: SysfsPin, echo: SysfsPin, echo_timeout: Duration) -> Self {
        Self {
            trigger,
            echo,
            echo_timeout,
        }
    }

    fn pulse_trigger(&mut self) -> Result<(), RoverError> {
        self.trigger.write(LineLevel::Low)?;
        thread::sleep(TRIGGER_SETTLE);
        self.trigger.write(LineLevel::High)?;
        thread::sleep(TRIGGER_PULSE);
        self.trigger.write(LineLevel::Low)
    }

    /// Spin until the echo line reaches `level` or the timeout elapses.
    fn wait_for(&mut self, level: LineLevel) -> Result<Instant, RoverError> {
        let deadline = Instant::now() + self.echo_timeout;
        loop {
            let now = Instant::now();
            if self.echo.read()? == level {
                return Ok(now);
            }
            if now >= deadline {
                return Err(RoverError::RangingFailed(format!(
                    "echo timeout waiting for {level:?}"
                )));
            }
        }
    }
}

impl RangingPort for UltrasonicRanger {
    fn id(&self) -> &str {
        "front_ultrasonic"
    }

    fn read_distance_cm(&mut self) -> Result<f64, RoverError> {
        self.pulse_trigger()?;
        let rising = self.wait_for(LineLevel::High)?;
        let falling = self.wait_for(LineLevel::Low)?;

        let distance = echo_width_to_cm(falling - rising);
        if distance > MAX_RANGE_CM {
            return Err(RoverError::RangingFailed(format!(
                "out of range echo ({distance:.1} cm)"
            )));
        }
        Ok(distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn echo_width_conversion() {
        assert!((echo_width_to_cm(Duration::from_micros(580)) - 10.0).abs() < 1e-9);
        assert!((echo_width_to_cm(Duration::from_micros(1740)) - 30.0).abs() < 1e-9);
        assert_eq!(echo_width_to_cm(Duration::ZERO), 0.0);
    }

    #[test]
    fn silent_echo_line_times_out() {
        let dir = tempfile::tempdir().expect("tmp dir");
        fs::write(dir.path().join("export"), "").unwrap();
        for n in [12, 16] {
            let pin_dir = dir.path().join(format!("gpio{n}"));
            fs::create_dir(&pin_dir).unwrap();
            fs::write(pin_dir.join("direction"), "in").unwrap();
            fs::write(pin_dir.join("value"), "0").unwrap();
        }
        let trigger = SysfsPin::open_at(dir.path(), 12, Direction::Out).unwrap();
        let echo = SysfsPin::open_at(dir.path(), 16, Direction::In).unwrap();
        let mut ranger = UltrasonicRanger::from_pins(trigger, echo, Duration::from_millis(5));

        let started = Instant::now();
        let result = ranger.read_distance_cm();
        assert!(matches!(result, Err(RoverError::RangingFailed(_))));
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
