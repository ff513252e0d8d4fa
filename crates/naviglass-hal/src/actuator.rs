//! `HapticActuator` trait for the pair of vibration motors.
//!
//! Drivers translate a [`MotorCommand`] into PWM duty cycles.  The feedback
//! engine treats the call as fire-and-forget: a failed `apply` is logged by
//! the caller and the next tick simply sends a fresh command.

use naviglass_types::{MotorCommand, NaviError};

/// Left/right vibration motor pair.
pub trait HapticActuator: Send {
    /// Stable identifier, e.g. `"temple_motors"`.
    fn id(&self) -> &str;

    /// Drive both motors to the duties in `command`.
    ///
    /// # Errors
    ///
    /// Returns [`NaviError::HardwareFault`] if the PWM channels cannot be
    /// updated.
    fn apply(&mut self, command: MotorCommand) -> Result<(), NaviError>;
}

impl<A: HapticActuator + ?Sized> HapticActuator for Box<A> {
    fn id(&self) -> &str {
        (**self).id()
    }

    fn apply(&mut self, command: MotorCommand) -> Result<(), NaviError> {
        (**self).apply(command)
    }
}
