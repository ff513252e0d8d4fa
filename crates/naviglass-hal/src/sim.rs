//! In-process stand-ins for the wearable's hardware.
//!
//! These drivers let the whole feedback core run headless: in CI, in unit
//! tests, and in the CLI when no GPIO driver is attached.
//!
//! # Example
//!
//! ```rust
//! use naviglass_hal::sim::{RecordingActuator, ScriptedRangeSensor};
//! use naviglass_hal::{HapticActuator, RangeSensor};
//! use naviglass_types::MotorCommand;
//!
//! let mut sensor = ScriptedRangeSensor::new("left").then_cm(52.0).then_cm(50.0);
//! assert_eq!(sensor.sample().unwrap().cm(), 52.0);
//!
//! let mut motors = RecordingActuator::new("motors");
//! let log = motors.log();
//! motors.apply(MotorCommand::new(20.0, 20.0)).unwrap();
//! assert_eq!(log.lock().len(), 1);
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use naviglass_types::{DistanceSample, MotorCommand, NaviError};
use parking_lot::Mutex;
use tracing::debug;

use crate::actuator::HapticActuator;
use crate::ranging::RangeSensor;

// ────────────────────────────────────────────────────────────────────────────
// Scripted sensor
// ────────────────────────────────────────────────────────────────────────────

/// Plays back a fixed script of readings (or faults).  Once the script is
/// exhausted the last scripted reading repeats; an empty script reports
/// "out of range" forever.
pub struct ScriptedRangeSensor {
    id: String,
    script: VecDeque<Result<f32, NaviError>>,
    last: DistanceSample,
}

impl ScriptedRangeSensor {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            script: VecDeque::new(),
            last: DistanceSample::OUT_OF_RANGE,
        }
    }

    /// Append a raw reading in centimetres.
    pub fn then_cm(mut self, cm: f32) -> Self {
        self.script.push_back(Ok(cm));
        self
    }

    /// Append the same raw reading `count` times.
    pub fn repeat_cm(mut self, cm: f32, count: usize) -> Self {
        for _ in 0..count {
            self.script.push_back(Ok(cm));
        }
        self
    }

    /// Append a driver fault.
    pub fn then_fault(mut self, details: impl Into<String>) -> Self {
        self.script.push_back(Err(NaviError::HardwareFault {
            component: self.id.clone(),
            details: details.into(),
        }));
        self
    }
}

impl RangeSensor for ScriptedRangeSensor {
    fn id(&self) -> &str {
        &self.id
    }

    fn sample(&mut self) -> Result<DistanceSample, NaviError> {
        match self.script.pop_front() {
            Some(Ok(cm)) => {
                self.last = DistanceSample::new(cm);
                Ok(self.last)
            }
            Some(Err(e)) => Err(e),
            None => Ok(self.last),
        }
    }
}

/// Shared knob setting the distance a [`DialRangeSensor`] reports.
#[derive(Clone)]
pub struct RangeDial(Arc<Mutex<DistanceSample>>);

impl RangeDial {
    /// Report `cm` from now on.
    pub fn set(&self, cm: f32) {
        *self.0.lock() = DistanceSample::new(cm);
    }
}

/// Reports whatever its [`RangeDial`] was last set to on every sample;
/// starts out of range.
pub struct DialRangeSensor {
    id: String,
    dial: RangeDial,
}

impl DialRangeSensor {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            dial: RangeDial(Arc::new(Mutex::new(DistanceSample::OUT_OF_RANGE))),
        }
    }

    /// Handle for changing the reported distance after the sensor is moved.
    pub fn dial(&self) -> RangeDial {
        self.dial.clone()
    }
}

impl RangeSensor for DialRangeSensor {
    fn id(&self) -> &str {
        &self.id
    }

    fn sample(&mut self) -> Result<DistanceSample, NaviError> {
        Ok(*self.dial.0.lock())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Actuators
// ────────────────────────────────────────────────────────────────────────────

/// Shared log of every command a [`RecordingActuator`] received.
pub type CommandLog = Arc<Mutex<Vec<MotorCommand>>>;

/// Records every applied command into a shared [`CommandLog`].  Always
/// succeeds.
pub struct RecordingActuator {
    id: String,
    log: CommandLog,
}

impl RecordingActuator {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            log: CommandLog::default(),
        }
    }

    /// Handle to the command log; stays valid after the actuator is moved.
    pub fn log(&self) -> CommandLog {
        Arc::clone(&self.log)
    }
}

impl HapticActuator for RecordingActuator {
    fn id(&self) -> &str {
        &self.id
    }

    fn apply(&mut self, command: MotorCommand) -> Result<(), NaviError> {
        self.log.lock().push(command);
        Ok(())
    }
}

/// Emits each *changed* command as a `debug` event.  Used when the device
/// runs without a motor driver.
pub struct TracingActuator {
    id: String,
    last: MotorCommand,
}

impl TracingActuator {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            last: MotorCommand::IDLE,
        }
    }
}

impl HapticActuator for TracingActuator {
    fn id(&self) -> &str {
        &self.id
    }

    fn apply(&mut self, command: MotorCommand) -> Result<(), NaviError> {
        if command != self.last {
            debug!(
                actuator = %self.id,
                left = command.left_duty,
                right = command.right_duty,
                "motor command"
            );
        }
        self.last = command;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_sensor_plays_back_then_repeats_last() {
        let mut sensor = ScriptedRangeSensor::new("left").then_cm(52.0).then_cm(50.0);
        assert_eq!(sensor.sample().unwrap().cm(), 52.0);
        assert_eq!(sensor.sample().unwrap().cm(), 50.0);
        assert_eq!(sensor.sample().unwrap().cm(), 50.0);
    }

    #[test]
    fn empty_script_is_out_of_range() {
        let mut sensor = ScriptedRangeSensor::new("right");
        assert!(sensor.sample().unwrap().is_out_of_range());
    }

    #[test]
    fn scripted_fault_surfaces_as_hardware_fault() {
        let mut sensor = ScriptedRangeSensor::new("left").then_fault("echo pin stuck");
        assert!(matches!(
            sensor.sample(),
            Err(NaviError::HardwareFault { component, .. }) if component == "left"
        ));
    }

    #[test]
    fn dial_sensor_repeats_the_dialled_distance() {
        let mut sensor = DialRangeSensor::new("left");
        let dial = sensor.dial();
        assert!(sensor.sample().unwrap().is_out_of_range());
        dial.set(75.0);
        assert_eq!(sensor.sample().unwrap().cm(), 75.0);
        assert_eq!(sensor.sample().unwrap().cm(), 75.0);
    }

    #[test]
    fn recording_actuator_keeps_every_command() {
        let mut motors = RecordingActuator::new("motors");
        let log = motors.log();
        motors.apply(MotorCommand::new(10.0, 20.0)).unwrap();
        motors.apply(MotorCommand::IDLE).unwrap();
        assert_eq!(log.lock().as_slice(), [MotorCommand::new(10.0, 20.0), MotorCommand::IDLE]);
    }

    #[test]
    fn tracing_actuator_tracks_last_command() {
        let mut motors = TracingActuator::new("motors");
        motors.apply(MotorCommand::new(35.0, 5.0)).unwrap();
        assert_eq!(motors.last, MotorCommand::new(35.0, 5.0));
    }
}
