//! `naviglass-types` – shared vocabulary of the NaviGlass feedback core.
//!
//! Every other crate in the workspace speaks in these types: raw ranging
//! samples, detections handed over by the vision collaborator, the motor
//! commands sent to the haptic actuators, speech requests, and the telemetry
//! snapshot exposed to the dashboard.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closest distance (cm) the ultrasonic sensors can physically report.
pub const MIN_RANGE_CM: f32 = 2.0;
/// Farthest distance (cm) the ultrasonic sensors can physically report.
pub const MAX_RANGE_CM: f32 = 400.0;
/// Wire value of the "no echo / out of range" sentinel.
pub const OUT_OF_RANGE_CM: f32 = 999.0;

/// Fused distances below this value are narrated as critical and spoken with
/// an interrupt.
pub const CRITICAL_BELOW_CM: f32 = 60.0;
/// Upper bound (exclusive) of the warning band.
pub const WARNING_BELOW_CM: f32 = 200.0;
/// Upper bound (exclusive) of the info band.
pub const INFO_BELOW_CM: f32 = 400.0;

// ────────────────────────────────────────────────────────────────────────────
// Ranging
// ────────────────────────────────────────────────────────────────────────────

/// One ultrasonic distance reading in centimetres.
///
/// Construction normalises anything outside `[MIN_RANGE_CM, MAX_RANGE_CM]`
/// (including NaN and infinities) to [`DistanceSample::OUT_OF_RANGE`], so a
/// value of this type is always either a physically plausible reading or the
/// sentinel.  The sentinel orders above every valid reading, which lets
/// `min`/median arithmetic treat it as "infinitely far".
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f32", into = "f32")]
pub struct DistanceSample(f32);

impl DistanceSample {
    /// "No echo / out of range."
    pub const OUT_OF_RANGE: Self = Self(OUT_OF_RANGE_CM);

    /// Wrap a raw reading, normalising out-of-envelope values to the sentinel.
    pub fn new(cm: f32) -> Self {
        if cm.is_finite() && (MIN_RANGE_CM..=MAX_RANGE_CM).contains(&cm) {
            Self(cm)
        } else {
            Self::OUT_OF_RANGE
        }
    }

    /// Distance in centimetres (`OUT_OF_RANGE_CM` for the sentinel).
    pub fn cm(self) -> f32 {
        self.0
    }

    /// `true` when this is the sentinel.
    pub fn is_out_of_range(self) -> bool {
        self.0 == OUT_OF_RANGE_CM
    }
}

impl From<f32> for DistanceSample {
    fn from(cm: f32) -> Self {
        Self::new(cm)
    }
}

impl From<DistanceSample> for f32 {
    fn from(sample: DistanceSample) -> Self {
        sample.0
    }
}

impl Default for DistanceSample {
    fn default() -> Self {
        Self::OUT_OF_RANGE
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Vision
// ────────────────────────────────────────────────────────────────────────────

/// A labelled object reported by the vision collaborator for one frame.
///
/// All geometric fields are normalised to the frame (0..1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedObject {
    /// Class name, e.g. `"person"` or `"traffic light"`.
    pub label: String,
    /// Detector confidence (0..1).
    pub confidence: f32,
    /// Horizontal centre of the bounding box (0 = left edge).
    pub center_x: f32,
    /// Vertical centre of the bounding box (0 = top edge).
    pub center_y: f32,
    /// Bounding-box area as a fraction of the frame.
    pub area: f32,
}

impl DetectedObject {
    /// Build a detection from a normalised `[x1, y1, x2, y2]` bounding box.
    pub fn from_normalized_box(label: impl Into<String>, confidence: f32, bbox: [f32; 4]) -> Self {
        let [x1, y1, x2, y2] = bbox;
        let width = (x2 - x1).max(0.0);
        let height = (y2 - y1).max(0.0);
        Self {
            label: label.into(),
            confidence,
            center_x: x1 + width / 2.0,
            center_y: y1 + height / 2.0,
            area: width * height,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Actuation
// ────────────────────────────────────────────────────────────────────────────

/// Duty cycles (percent) for the left and right vibration motors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotorCommand {
    pub left_duty: f32,
    pub right_duty: f32,
}

impl MotorCommand {
    /// Both motors off.
    pub const IDLE: Self = Self {
        left_duty: 0.0,
        right_duty: 0.0,
    };

    /// Build a command, clamping both duties to `[0, 100]`.  NaN becomes 0.
    pub fn new(left_duty: f32, right_duty: f32) -> Self {
        Self {
            left_duty: clamp_duty(left_duty),
            right_duty: clamp_duty(right_duty),
        }
    }

    /// Scale both duties by `factor` (clamped to `[0, 1]`).
    pub fn scaled(self, factor: f32) -> Self {
        let factor = if factor.is_nan() { 0.0 } else { factor.clamp(0.0, 1.0) };
        Self::new(self.left_duty * factor, self.right_duty * factor)
    }

    /// `true` when both motors are off.
    pub fn is_idle(&self) -> bool {
        self.left_duty == 0.0 && self.right_duty == 0.0
    }
}

fn clamp_duty(duty: f32) -> f32 {
    if duty.is_nan() { 0.0 } else { duty.clamp(0.0, 100.0) }
}

// ────────────────────────────────────────────────────────────────────────────
// Speech
// ────────────────────────────────────────────────────────────────────────────

/// A single utterance handed to the speech queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechRequest {
    pub text: String,
    /// Drop everything queued and cut off the current utterance first.
    pub interrupt: bool,
}

impl SpeechRequest {
    /// Build a request.
    ///
    /// # Errors
    ///
    /// Returns [`NaviError::InvalidRequest`] when `text` is empty or only
    /// whitespace.
    pub fn new(text: impl Into<String>, interrupt: bool) -> Result<Self, NaviError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(NaviError::InvalidRequest(
                "speech text must not be empty".to_string(),
            ));
        }
        Ok(Self { text, interrupt })
    }
}

/// Narration urgency band, chosen solely from the fused distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NarrationCategory {
    /// Closer than 60 cm.
    Critical,
    /// 60 cm up to (not including) 200 cm.
    Warning,
    /// 200 cm up to (not including) 400 cm.
    Info,
    /// 400 cm and beyond, or no valid reading.
    Unknown,
}

impl NarrationCategory {
    /// Classify a fused distance in centimetres.
    pub fn from_distance(cm: f32) -> Self {
        if cm.is_nan() {
            Self::Unknown
        } else if cm < CRITICAL_BELOW_CM {
            Self::Critical
        } else if cm < WARNING_BELOW_CM {
            Self::Warning
        } else if cm < INFO_BELOW_CM {
            Self::Info
        } else {
            Self::Unknown
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Warning => "warning",
            Self::Info => "info",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for NarrationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Telemetry
// ────────────────────────────────────────────────────────────────────────────

/// Snapshots older than this are reported as stale.
pub const TELEMETRY_STALE_AFTER_SECS: i64 = 5;

/// Read-only view of the feedback engine for the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    /// Last fused distance (sentinel when nothing was measured).
    pub distance: DistanceSample,
    /// `true` when the last fused distance fell in the critical band.
    pub urgent: bool,
    /// When the snapshot was taken.
    pub timestamp: DateTime<Utc>,
}

impl TelemetrySnapshot {
    pub fn new(distance: DistanceSample, timestamp: DateTime<Utc>) -> Self {
        Self {
            distance,
            urgent: distance.cm() < CRITICAL_BELOW_CM,
            timestamp,
        }
    }

    /// `true` once the snapshot is older than [`TELEMETRY_STALE_AFTER_SECS`].
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now - self.timestamp > Duration::seconds(TELEMETRY_STALE_AFTER_SECS)
    }

    /// The snapshot as a consumer should see it at `now`: stale snapshots
    /// degrade to "nothing in range, not urgent".
    pub fn observed_at(&self, now: DateTime<Utc>) -> Self {
        if self.is_stale(now) {
            Self {
                distance: DistanceSample::OUT_OF_RANGE,
                urgent: false,
                timestamp: self.timestamp,
            }
        } else {
            *self
        }
    }
}

impl Default for TelemetrySnapshot {
    fn default() -> Self {
        Self {
            distance: DistanceSample::OUT_OF_RANGE,
            urgent: false,
            timestamp: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Error type shared by drivers, the speech pipeline and configuration.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NaviError {
    #[error("Hardware Fault on {component}: {details}")]
    HardwareFault { component: String, details: String },

    #[error("Speech Backend Error: {0}")]
    Speech(String),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Invalid Request: {0}")]
    InvalidRequest(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_sample_normalises_out_of_envelope_readings() {
        assert_eq!(DistanceSample::new(1.9), DistanceSample::OUT_OF_RANGE);
        assert_eq!(DistanceSample::new(400.1), DistanceSample::OUT_OF_RANGE);
        assert_eq!(DistanceSample::new(f32::NAN), DistanceSample::OUT_OF_RANGE);
        assert_eq!(DistanceSample::new(2.0).cm(), 2.0);
        assert_eq!(DistanceSample::new(400.0).cm(), 400.0);
        assert!(DistanceSample::new(999.0).is_out_of_range());
    }

    #[test]
    fn sentinel_orders_above_valid_readings() {
        assert!(DistanceSample::new(400.0) < DistanceSample::OUT_OF_RANGE);
    }

    #[test]
    fn distance_sample_deserialises_through_normalisation() {
        let sample: DistanceSample = serde_json::from_str("0.5").unwrap();
        assert!(sample.is_out_of_range());
        let json = serde_json::to_string(&DistanceSample::new(52.0)).unwrap();
        assert_eq!(json, "52.0");
    }

    #[test]
    fn detection_from_normalized_box() {
        let obj = DetectedObject::from_normalized_box("car", 0.9, [0.0, 0.0, 0.5, 0.5]);
        assert!((obj.center_x - 0.25).abs() < 1e-6);
        assert!((obj.center_y - 0.25).abs() < 1e-6);
        assert!((obj.area - 0.25).abs() < 1e-6);
    }

    #[test]
    fn motor_command_clamps_duties() {
        let cmd = MotorCommand::new(-5.0, 150.0);
        assert_eq!(cmd.left_duty, 0.0);
        assert_eq!(cmd.right_duty, 100.0);
        assert!(MotorCommand::IDLE.is_idle());
        assert!(MotorCommand::new(f32::NAN, 0.0).is_idle());
    }

    #[test]
    fn motor_command_scaling() {
        let cmd = MotorCommand::new(80.0, 40.0).scaled(0.5);
        assert_eq!(cmd, MotorCommand::new(40.0, 20.0));
        assert_eq!(MotorCommand::new(80.0, 40.0).scaled(3.0), MotorCommand::new(80.0, 40.0));
    }

    #[test]
    fn speech_request_rejects_blank_text() {
        assert!(matches!(
            SpeechRequest::new("   ", false),
            Err(NaviError::InvalidRequest(_))
        ));
        let req = SpeechRequest::new("hello", true).unwrap();
        assert!(req.interrupt);
    }

    #[test]
    fn category_boundaries() {
        assert_eq!(NarrationCategory::from_distance(59.0), NarrationCategory::Critical);
        assert_eq!(NarrationCategory::from_distance(60.0), NarrationCategory::Warning);
        assert_eq!(NarrationCategory::from_distance(199.0), NarrationCategory::Warning);
        assert_eq!(NarrationCategory::from_distance(200.0), NarrationCategory::Info);
        assert_eq!(NarrationCategory::from_distance(399.0), NarrationCategory::Info);
        assert_eq!(NarrationCategory::from_distance(400.0), NarrationCategory::Unknown);
        assert_eq!(
            NarrationCategory::from_distance(OUT_OF_RANGE_CM),
            NarrationCategory::Unknown
        );
    }

    #[test]
    fn telemetry_marks_urgent_and_goes_stale() {
        let t0 = Utc::now();
        let snap = TelemetrySnapshot::new(DistanceSample::new(45.0), t0);
        assert!(snap.urgent);
        assert!(!snap.is_stale(t0 + Duration::seconds(5)));
        let later = snap.observed_at(t0 + Duration::seconds(6));
        assert!(later.distance.is_out_of_range());
        assert!(!later.urgent);
    }

    #[test]
    fn navi_error_display() {
        let err = NaviError::HardwareFault {
            component: "left_ultrasonic".to_string(),
            details: "echo pin stuck".to_string(),
        };
        assert!(err.to_string().contains("left_ultrasonic"));
    }
}
