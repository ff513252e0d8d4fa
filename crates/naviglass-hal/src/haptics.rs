//! Distance and bearing → vibration duty cycles.
//!
//! Intensity grows linearly as the obstacle gets closer (45 % at contact,
//! 20 % at the edge of the sensor envelope) and drops to a faint 10 % idle
//! hum beyond it.  The intensity is then panned between the two temple
//! motors according to where the object sits horizontally in the frame:
//!
//! ```text
//! left  = min(90, 2 · duty · (1 − x))
//! right = min(90, 2 · duty · x)
//! ```
//!
//! # Example
//!
//! ```rust
//! use naviglass_hal::haptics;
//!
//! assert_eq!(haptics::duty(0.0), 45.0);
//! let (left, right) = haptics::split(0.5, 40.0);
//! assert_eq!((left, right), (40.0, 40.0));
//! ```

use naviglass_types::{MAX_RANGE_CM, MotorCommand};

/// Duty at 0 cm.
const NEAR_DUTY: f32 = 45.0;
/// Duty lost over the full sensor envelope.
const DUTY_SPAN: f32 = 25.0;
/// Duty used when the obstacle is beyond the envelope.
const IDLE_DUTY: f32 = 10.0;
/// Per-motor ceiling after panning.
const PAN_CAP: f32 = 90.0;

/// Vibration intensity (percent) for an obstacle at `distance_cm`.
pub fn duty(distance_cm: f32) -> f32 {
    if distance_cm > MAX_RANGE_CM || distance_cm.is_nan() {
        IDLE_DUTY
    } else {
        NEAR_DUTY - distance_cm / MAX_RANGE_CM * DUTY_SPAN
    }
}

/// Pan `duty` across the motors for an object centred at `x` (0 = far left,
/// 1 = far right).  Returns `(left, right)`.
pub fn split(x: f32, duty: f32) -> (f32, f32) {
    let left = (2.0 * duty * (1.0 - x)).min(PAN_CAP);
    let right = (2.0 * duty * x).min(PAN_CAP);
    (left, right)
}

/// Full mapping for one object: [`duty`] then [`split`], wrapped (and clamped)
/// into a [`MotorCommand`].
pub fn command_for(distance_cm: f32, x: f32) -> MotorCommand {
    let (left, right) = split(x, duty(distance_cm));
    MotorCommand::new(left, right)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duty_endpoints() {
        assert_eq!(duty(0.0), 45.0);
        assert_eq!(duty(400.0), 20.0);
        assert_eq!(duty(401.0), 10.0);
        assert_eq!(duty(999.0), 10.0);
    }

    #[test]
    fn duty_is_non_increasing_over_envelope() {
        let mut previous = duty(0.0);
        for cm in 1..=400 {
            let current = duty(cm as f32);
            assert!(current <= previous, "duty rose at {cm} cm");
            previous = current;
        }
    }

    #[test]
    fn split_centre_left_and_right() {
        assert_eq!(split(0.5, 40.0), (40.0, 40.0));
        assert_eq!(split(0.0, 40.0), (80.0, 0.0));
        assert_eq!(split(1.0, 40.0), (0.0, 80.0));
    }

    #[test]
    fn split_caps_each_motor_at_ninety() {
        let (left, right) = split(0.0, 50.0);
        assert_eq!(left, 90.0);
        assert_eq!(right, 0.0);
    }

    #[test]
    fn command_for_combines_duty_and_pan() {
        // 200 cm → duty 32.5, centred → 32.5 each side.
        let cmd = command_for(200.0, 0.5);
        assert!((cmd.left_duty - 32.5).abs() < 1e-4);
        assert!((cmd.right_duty - 32.5).abs() < 1e-4);
    }
}
