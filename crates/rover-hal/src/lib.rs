//! `rover-hal` – Hardware Abstraction Layer
//!
//! The motion core never touches a pin directly; it talks to two ports.
//!
//! # Modules
//!
//! - [`actuator`] – [`ActuatorPort`][actuator::ActuatorPort]: two-line
//!   directional codes per motor of a differential drive base.
//! - [`ranging`] – [`RangingPort`][ranging::RangingPort]: on-demand forward
//!   distance samples in centimetres.
//! - [`gpio`] – Linux sysfs GPIO pins and the
//!   [`GpioActuatorPort`][gpio::GpioActuatorPort] H-bridge driver.
//! - [`ultrasonic`] – [`UltrasonicRanger`][ultrasonic::UltrasonicRanger], an
//!   HC-SR04 driver on two GPIO lines.
//! - [`sim`] – simulated ports for CI and hardware-free runs.

pub mod actuator;
pub mod gpio;
pub mod ranging;
pub mod sim;
pub mod ultrasonic;

pub use actuator::{ActuatorPort, LineLevel, Motor, MotorCode};
pub use gpio::{GpioActuatorPort, MotorPins, SysfsPin};
pub use ranging::RangingPort;
pub use sim::{SimActuatorPort, SimRanger};
pub use ultrasonic::UltrasonicRanger;
