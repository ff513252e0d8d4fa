//! [`FeedbackEngine`] – the proximity feedback state machine.
//!
//! One call to [`FeedbackEngine::tick`] is one decision.  Each tick:
//!
//! 1. **Select** – pick the most salient object from the latest
//!    [`DetectionFeed`] snapshot.
//! 2. **Measure** – when something is in view, read both temple sensors and
//!    fuse them via [`SensorFusion`].
//! 3. **Decide** – compare against [`FeedbackState`]: a new label starts a
//!    vibration pulse and one spoken narration, a same-label approach of more
//!    than the configured sensitivity re-arms the pulse silently, and an
//!    expired pulse goes quiet.
//! 4. **Act** – send the [`MotorCommand`] to the actuator, hand narration to
//!    the [`SpeechSink`], and publish a [`TelemetrySnapshot`].
//!
//! # Fault isolation
//!
//! Driver errors and panics raised anywhere inside a tick are caught at the
//! tick boundary.  The tick is logged as faulted, motors are idled, and the
//! next tick starts from the unchanged state.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::{Duration, Instant};
//! use naviglass_hal::sim::{RecordingActuator, ScriptedRangeSensor};
//! use naviglass_perception::{DetectionFeed, MedianSampler, SensorFusion};
//! use naviglass_runtime::feedback::{FeedbackConfig, FeedbackEngine};
//! use naviglass_speech::RecordingSink;
//! use naviglass_types::DetectedObject;
//!
//! let feed = DetectionFeed::new();
//! let fusion = SensorFusion::new(
//!     Box::new(ScriptedRangeSensor::new("left").then_cm(45.0)),
//!     Box::new(ScriptedRangeSensor::new("right")),
//!     MedianSampler::new(3, Duration::ZERO),
//! );
//! let sink = Arc::new(RecordingSink::new());
//! let mut engine = FeedbackEngine::new(
//!     FeedbackConfig::default(),
//!     feed.clone(),
//!     fusion,
//!     Box::new(RecordingActuator::new("motors")),
//!     sink.clone(),
//! );
//!
//! feed.publish(vec![DetectedObject::from_normalized_box("car", 0.9, [0.0, 0.2, 0.4, 0.9])]);
//! let outcome = engine.tick(Instant::now());
//! assert!(!outcome.command.is_idle());
//! assert!(sink.requests()[0].interrupt);
//! ```

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use naviglass_hal::{HapticActuator, haptics};
use naviglass_perception::{DetectionFeed, FusedReading, SensorFusion, select_most_salient};
use naviglass_speech::{NarrationGenerator, SpeechSink};
use naviglass_types::{
    CRITICAL_BELOW_CM, DistanceSample, MAX_RANGE_CM, MotorCommand, NaviError, SpeechRequest,
    TelemetrySnapshot,
};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Tunables for [`FeedbackEngine`].
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackConfig {
    /// How long a vibration pulse lasts after it is (re-)armed.
    pub pulse_time: Duration,
    /// A same-label object must come strictly closer than this (cm) to
    /// re-arm the pulse.
    pub approach_sensitivity_cm: f32,
    /// Consecutive empty frames after which the current target is forgotten.
    pub max_misses: u32,
    /// New-target narration below this distance (cm) interrupts speech.
    pub urgent_below_cm: f32,
    /// User scale for both motor duties, in `[0, 1]`.
    pub vibration_intensity: f32,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            pulse_time: Duration::from_secs(3),
            approach_sensitivity_cm: 10.0,
            max_misses: 10,
            urgent_below_cm: CRITICAL_BELOW_CM,
            vibration_intensity: 1.0,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// State
// ─────────────────────────────────────────────────────────────────────────────

/// Hysteresis state.  Owned and mutated only by [`FeedbackEngine`].
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackState {
    /// Label of the object currently being tracked.
    pub last_label: Option<String>,
    /// Distance at which the current pulse was last armed; the sentinel
    /// when nothing is tracked.
    pub reference_distance: DistanceSample,
    /// End of the current vibration pulse.
    pub vibration_deadline: Option<Instant>,
    pub consecutive_miss_count: u32,
}

impl FeedbackState {
    fn forget_target(&mut self) {
        self.last_label = None;
        self.reference_distance = DistanceSample::OUT_OF_RANGE;
    }
}

impl Default for FeedbackState {
    fn default() -> Self {
        Self {
            last_label: None,
            reference_distance: DistanceSample::OUT_OF_RANGE,
            vibration_deadline: None,
            consecutive_miss_count: 0,
        }
    }
}

/// What a single tick did.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    /// Command sent to the motors.
    pub command: MotorCommand,
    /// Narration requested this tick, if any.
    pub speech: Option<SpeechRequest>,
    /// Fused measurement, when the sensors were read.
    pub reading: Option<FusedReading>,
}

impl TickOutcome {
    fn idle() -> Self {
        Self {
            command: MotorCommand::IDLE,
            speech: None,
            reading: None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FeedbackEngine
// ─────────────────────────────────────────────────────────────────────────────

/// Owns every handle needed to turn detections and ranges into haptic and
/// spoken feedback.
pub struct FeedbackEngine {
    config: FeedbackConfig,
    state: FeedbackState,
    feed: DetectionFeed,
    fusion: SensorFusion,
    actuator: Box<dyn HapticActuator>,
    narrator: NarrationGenerator,
    speech: Arc<dyn SpeechSink>,
    telemetry: watch::Sender<TelemetrySnapshot>,
}

impl FeedbackEngine {
    pub fn new(
        config: FeedbackConfig,
        feed: DetectionFeed,
        fusion: SensorFusion,
        actuator: Box<dyn HapticActuator>,
        speech: Arc<dyn SpeechSink>,
    ) -> Self {
        let (telemetry, _) = watch::channel(TelemetrySnapshot::default());
        Self {
            config,
            state: FeedbackState::default(),
            feed,
            fusion,
            actuator,
            narrator: NarrationGenerator::from_entropy(),
            speech,
            telemetry,
        }
    }

    /// Replace the narration source (tests pass a seeded generator).
    pub fn with_narrator(mut self, narrator: NarrationGenerator) -> Self {
        self.narrator = narrator;
        self
    }

    pub fn config(&self) -> &FeedbackConfig {
        &self.config
    }

    pub fn state(&self) -> &FeedbackState {
        &self.state
    }

    /// Subscribe to the snapshot published after every tick.  Reading never
    /// blocks the engine.
    pub fn telemetry(&self) -> watch::Receiver<TelemetrySnapshot> {
        self.telemetry.subscribe()
    }

    /// Run one tick at `now`.  Never fails: faults and panics idle the motors
    /// and are reported as an idle outcome.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        match panic::catch_unwind(AssertUnwindSafe(|| self.try_tick(now))) {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                warn!(error = %e, "feedback tick faulted; motors idled");
                self.drive(MotorCommand::IDLE);
                self.publish(DistanceSample::OUT_OF_RANGE);
                TickOutcome::idle()
            }
            Err(payload) => {
                error!(panic = panic_message(payload.as_ref()), "feedback tick panicked; motors idled");
                self.drive(MotorCommand::IDLE);
                self.publish(DistanceSample::OUT_OF_RANGE);
                TickOutcome::idle()
            }
        }
    }

    /// One tick with faults propagated instead of contained.
    ///
    /// # Errors
    ///
    /// Returns the [`NaviError::HardwareFault`] raised by a ranging driver.
    pub fn try_tick(&mut self, now: Instant) -> Result<TickOutcome, NaviError> {
        let frame = self.feed.snapshot();
        let Some(target) = select_most_salient(&frame) else {
            self.record_miss();
            self.drive(MotorCommand::IDLE);
            self.publish(DistanceSample::OUT_OF_RANGE);
            return Ok(TickOutcome::idle());
        };

        self.state.consecutive_miss_count = 0;
        let reading = self.fusion.measure()?;
        let fused = reading.fused;

        let mut speech = None;
        let vibrate = if self.state.last_label.as_deref() != Some(target.label.as_str()) {
            let text = self.narrator.generate(&target.label, fused.cm(), target.center_x);
            let request = SpeechRequest::new(text, fused.cm() < self.config.urgent_below_cm)?;
            info!(
                label = %target.label,
                distance_cm = fused.cm(),
                interrupt = request.interrupt,
                "new target"
            );
            self.state.last_label = Some(target.label.clone());
            self.arm(now, fused);
            speech = Some(request);
            true
        } else if self.is_approaching(fused) {
            debug!(
                label = %target.label,
                from_cm = self.state.reference_distance.cm(),
                to_cm = fused.cm(),
                "target approaching; pulse re-armed"
            );
            self.arm(now, fused);
            true
        } else if self.state.vibration_deadline.is_some_and(|deadline| now < deadline) {
            true
        } else {
            self.state.vibration_deadline = None;
            false
        };

        let command = if vibrate {
            haptics::command_for(fused.cm(), target.center_x).scaled(self.config.vibration_intensity)
        } else {
            MotorCommand::IDLE
        };

        if let Some(request) = &speech {
            self.speech.speak(&request.text, request.interrupt);
        }
        self.drive(command);
        self.publish(fused);

        Ok(TickOutcome {
            command,
            speech,
            reading: Some(reading),
        })
    }

    /// Idle the motors.  Call once when the loop stops.
    pub fn shutdown(&mut self) {
        self.drive(MotorCommand::IDLE);
        info!(actuator = self.actuator.id(), "feedback engine stopped; motors idle");
    }

    fn record_miss(&mut self) {
        self.state.consecutive_miss_count = self.state.consecutive_miss_count.saturating_add(1);
        if self.state.consecutive_miss_count >= self.config.max_misses {
            if let Some(label) = self.state.last_label.as_deref() {
                debug!(%label, misses = self.state.consecutive_miss_count, "target lost");
            }
            self.state.forget_target();
        }
    }

    fn is_approaching(&self, fused: DistanceSample) -> bool {
        fused.cm() <= MAX_RANGE_CM
            && fused.cm() < self.state.reference_distance.cm() - self.config.approach_sensitivity_cm
    }

    fn arm(&mut self, now: Instant, fused: DistanceSample) {
        self.state.vibration_deadline = Some(now + self.config.pulse_time);
        self.state.reference_distance = fused;
    }

    /// Actuator errors are logged and otherwise ignored.
    fn drive(&mut self, command: MotorCommand) {
        if let Err(e) = self.actuator.apply(command) {
            warn!(actuator = self.actuator.id(), error = %e, "motor command failed");
        }
    }

    fn publish(&self, distance: DistanceSample) {
        self.telemetry.send_replace(TelemetrySnapshot::new(distance, Utc::now()));
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
