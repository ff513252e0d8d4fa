//! `naviglass-hal` – hardware seams of the wearable.
//!
//! The feedback core never touches GPIO directly.  It talks to the two
//! traits below, so the ultrasonic pulse-timing driver and the PWM motor
//! driver can be swapped (or simulated) without touching any decision logic.
//!
//! # Modules
//!
//! - [`ranging`] – [`RangeSensor`][ranging::RangeSensor] plus
//!   [`RangeBoard`][ranging::RangeBoard], which lets an external ranging
//!   process push readings in.
//! - [`actuator`] – [`HapticActuator`][actuator::HapticActuator], the
//!   fire-and-forget sink for [`MotorCommand`][naviglass_types::MotorCommand]s.
//! - [`haptics`] – the pure distance/position → duty-cycle mapping.
//! - [`sim`] – scripted and dialled sensors plus recording actuators for headless runs
//!   and tests.

pub mod actuator;
pub mod haptics;
pub mod ranging;
pub mod sim;

pub use actuator::HapticActuator;
pub use ranging::{RangeBoard, RangeSensor};
