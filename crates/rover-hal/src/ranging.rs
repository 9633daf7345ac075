//! `RangingPort` trait for forward-facing distance sensors.

use rover_types::RoverError;

/// A distance sensor queried on demand.
///
/// The read is a bounded blocking call: implementations must give up (and
/// return an error) rather than wait indefinitely for an echo.
pub trait RangingPort: Send {
    /// Stable identifier for this sensor, e.g. `"front_ultrasonic"`.
    fn id(&self) -> &str;

    /// Take one distance sample in centimetres.
    ///
    /// # Errors
    ///
    /// Returns [`RoverError::RangingFailed`] on a timeout, an out-of-range
    /// echo, or a disconnected sensor.
    fn read_distance_cm(&mut self) -> Result<f64, RoverError>;
}

impl<R: RangingPort + ?Sized> RangingPort for Box<R> {
    fn id(&self) -> &str {
        (**self).id()
    }

    fn read_distance_cm(&mut self) -> Result<f64, RoverError> {
        (**self).read_distance_cm()
    }
}
