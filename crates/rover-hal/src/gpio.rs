//! Linux sysfs GPIO drivers.
//!
//! Pins are exported through `/sys/class/gpio` (BCM numbering on a
//! Raspberry Pi).  [`GpioActuatorPort`] drives the four H-bridge lines of the
//! drive base; the ultrasonic ranger in [`crate::ultrasonic`] reuses
//! [`SysfsPin`] for its trigger and echo lines.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use rover_types::RoverError;
use tracing::debug;

use crate::actuator::{ActuatorPort, LineLevel, Motor};

/// Default sysfs GPIO root.
pub const SYSFS_GPIO_ROOT: &str = "/sys/class/gpio";

/// Pin direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SysfsPin
// ────────────────────────────────────────────────────────────────────────────

/// A single exported GPIO line with its `value` file held open.
#[derive(Debug)]
pub struct SysfsPin {
    number: u32,
    direction: Direction,
    value: File,
}

impl SysfsPin {
    /// Export `number` under [`SYSFS_GPIO_ROOT`] and configure its direction.
    pub fn open(number: u32, direction: Direction) -> Result<Self, RoverError> {
        Self::open_at(Path::new(SYSFS_GPIO_ROOT), number, direction)
    }

    /// Export `number` under an arbitrary sysfs-style `root`.
    ///
    /// The pin is only exported when its `gpioN` directory is missing, so
    /// reopening an already-exported pin is fine.
    pub fn open_at(root: &Path, number: u32, direction: Direction) -> Result<Self, RoverError> {
        let pin_dir = root.join(format!("gpio{number}"));
        if !pin_dir.exists() {
            fs::write(root.join("export"), number.to_string())
                .map_err(|e| fault(number, format!("export failed: {e}")))?;
        }
        fs::write(pin_dir.join("direction"), direction.as_str())
            .map_err(|e| fault(number, format!("set direction failed: {e}")))?;

        let value = OpenOptions::new()
            .read(true)
            .write(direction == Direction::Out)
            .open(value_path(&pin_dir))
            .map_err(|e| fault(number, format!("open value failed: {e}")))?;

        debug!(pin = number, direction = direction.as_str(), "gpio pin opened");
        Ok(Self {
            number,
            direction,
            value,
        })
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    /// Drive an output pin to `level`.
    pub fn write(&mut self, level: LineLevel) -> Result<(), RoverError> {
        if self.direction != Direction::Out {
            return Err(fault(self.number, "write to an input pin".to_string()));
        }
        let mut buf = [0u8; 4];
        let encoded = level.as_char().encode_utf8(&mut buf);
        self.value
            .seek(SeekFrom::Start(0))
            .and_then(|_| self.value.write_all(encoded.as_bytes()))
            .map_err(|e| fault(self.number, format!("write failed: {e}")))
    }

    /// Sample the pin's current level.
    pub fn read(&mut self) -> Result<LineLevel, RoverError> {
        let mut buf = [0u8; 1];
        self.value
            .seek(SeekFrom::Start(0))
            .and_then(|_| self.value.read_exact(&mut buf))
            .map_err(|e| fault(self.number, format!("read failed: {e}")))?;
        Ok(if buf[0] == b'1' {
            LineLevel::High
        } else {
            LineLevel::Low
        })
    }
}

fn value_path(pin_dir: &Path) -> PathBuf {
    pin_dir.join("value")
}

fn fault(number: u32, details: String) -> RoverError {
    RoverError::HardwareFault {
        component: format!("gpio{number}"),
        details,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// GpioActuatorPort
// ────────────────────────────────────────────────────────────────────────────

/// BCM pin numbers of the four H-bridge inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorPins {
    pub left_a: u32,
    pub left_b: u32,
    pub right_a: u32,
    pub right_b: u32,
}

/// Drive-base actuator port backed by four sysfs output pins.
pub struct GpioActuatorPort {
    left_a: SysfsPin,
    left_b: SysfsPin,
    right_a: SysfsPin,
    right_b: SysfsPin,
}

impl GpioActuatorPort {
    /// Open all four pins as outputs under [`SYSFS_GPIO_ROOT`].
    pub fn open(pins: MotorPins) -> Result<Self, RoverError> {
        Self::open_at(Path::new(SYSFS_GPIO_ROOT), pins)
    }

    pub fn open_at(root: &Path, pins: MotorPins) -> Result<Self, RoverError> {
        Ok(Self {
            left_a: SysfsPin::open_at(root, pins.left_a, Direction::Out)?,
            left_b: SysfsPin::open_at(root, pins.left_b, Direction::Out)?,
            right_a: SysfsPin::open_at(root, pins.right_a, Direction::Out)?,
            right_b: SysfsPin::open_at(root, pins.right_b, Direction::Out)?,
        })
    }
}

impl ActuatorPort for GpioActuatorPort {
    fn id(&self) -> &str {
        "gpio_h_bridge"
    }

    fn write_lines(
        &mut self,
        motor: Motor,
        a: LineLevel,
        b: LineLevel,
    ) -> Result<(), RoverError> {
        let (pin_a, pin_b) = match motor {
            Motor::Left => (&mut self.left_a, &mut self.left_b),
            Motor::Right => (&mut self.right_a, &mut self.right_b),
        };
        pin_a.write(a)?;
        pin_b.write(b)
    }
}
