//! Configuration – reads/writes `~/.naviglass/config.toml`.
//!
//! Every field has a default, so a missing file or a partial file is fine.
//! `NAVIGLASS_*` environment variables override the file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use naviglass_perception::{CandidateFilter, MedianSampler};
use naviglass_runtime::FeedbackConfig;
use naviglass_types::NaviError;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Persisted device configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub feedback: FeedbackSection,
    pub ranging: RangingSection,
    pub vision: VisionSection,
    pub speech: SpeechSection,
}

/// `[feedback]` – state machine timing and haptic strength.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackSection {
    pub tick_period_ms: u64,
    pub pulse_time_ms: u64,
    pub approach_sensitivity_cm: f32,
    pub max_misses: u32,
    pub urgent_below_cm: f32,
    /// Scales both motor duties; must lie in `[0, 1]`.
    pub vibration_intensity: f32,
}

impl Default for FeedbackSection {
    fn default() -> Self {
        Self {
            tick_period_ms: 100,
            pulse_time_ms: 3_000,
            approach_sensitivity_cm: 10.0,
            max_misses: 10,
            urgent_below_cm: 60.0,
            vibration_intensity: 1.0,
        }
    }
}

/// `[ranging]` – ultrasonic burst policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangingSection {
    pub samples: usize,
    pub inter_sample_delay_ms: u64,
    /// How long one sample waits for a fresh reading before it counts as
    /// "no echo".
    pub read_timeout_ms: u64,
    pub left_sensor: String,
    pub right_sensor: String,
}

impl Default for RangingSection {
    fn default() -> Self {
        Self {
            samples: 3,
            inter_sample_delay_ms: 40,
            read_timeout_ms: 300,
            left_sensor: "left".to_string(),
            right_sensor: "right".to_string(),
        }
    }
}

/// `[vision]` – candidate gate re-applied to incoming detections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionSection {
    pub min_confidence: f32,
    pub min_area: f32,
}

impl Default for VisionSection {
    fn default() -> Self {
        let filter = CandidateFilter::default();
        Self {
            min_confidence: filter.min_confidence,
            min_area: filter.min_area,
        }
    }
}

/// `[speech]` – synthesizer process and queue behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechSection {
    pub enabled: bool,
    /// Program and arguments; the program reads one utterance per line.
    pub command: Vec<String>,
    /// Files that must exist for speech to be enabled (voice models).
    pub assets: Vec<PathBuf>,
    pub poll_interval_ms: u64,
    /// Spoken once at startup; empty disables it.
    pub startup_message: String,
}

impl Default for SpeechSection {
    fn default() -> Self {
        Self {
            enabled: true,
            command: vec!["espeak-ng".to_string()],
            assets: Vec::new(),
            poll_interval_ms: 1_000,
            startup_message: "Navigation glasses ready.".to_string(),
        }
    }
}

impl Config {
    /// Reject values the engine cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`NaviError::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<(), NaviError> {
        let intensity = self.feedback.vibration_intensity;
        if !(0.0..=1.0).contains(&intensity) {
            return Err(NaviError::Config(format!(
                "feedback.vibration_intensity must be within [0, 1], got {intensity}"
            )));
        }
        if self.feedback.tick_period_ms == 0 {
            return Err(NaviError::Config("feedback.tick_period_ms must be positive".to_string()));
        }
        if self.feedback.max_misses == 0 {
            return Err(NaviError::Config("feedback.max_misses must be positive".to_string()));
        }
        if !(0.0..=1.0).contains(&self.vision.min_confidence) {
            return Err(NaviError::Config("vision.min_confidence must be within [0, 1]".to_string()));
        }
        if !(0.0..=1.0).contains(&self.vision.min_area) {
            return Err(NaviError::Config("vision.min_area must be within [0, 1]".to_string()));
        }
        if self.ranging.left_sensor == self.ranging.right_sensor {
            return Err(NaviError::Config("ranging sensors need distinct ids".to_string()));
        }
        if self.speech.enabled && self.speech.command.is_empty() {
            return Err(NaviError::Config("speech.command must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn feedback_config(&self) -> FeedbackConfig {
        FeedbackConfig {
            pulse_time: Duration::from_millis(self.feedback.pulse_time_ms),
            approach_sensitivity_cm: self.feedback.approach_sensitivity_cm,
            max_misses: self.feedback.max_misses,
            urgent_below_cm: self.feedback.urgent_below_cm,
            vibration_intensity: self.feedback.vibration_intensity,
        }
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.feedback.tick_period_ms)
    }

    pub fn sampler(&self) -> MedianSampler {
        MedianSampler::new(
            self.ranging.samples,
            Duration::from_millis(self.ranging.inter_sample_delay_ms),
        )
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.ranging.read_timeout_ms)
    }

    pub fn candidate_filter(&self) -> CandidateFilter {
        CandidateFilter::new(self.vision.min_confidence, self.vision.min_area)
    }

    pub fn speech_poll_interval(&self) -> Duration {
        Duration::from_millis(self.speech.poll_interval_ms)
    }
}

/// Return the path to `~/.naviglass/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".naviglass").join("config.toml")
}

/// Load `~/.naviglass/config.toml`, apply environment overrides and
/// validate.  `Ok(None)` means no file exists yet.
///
/// # Errors
///
/// Returns [`NaviError::Config`] when the file is unreadable, malformed, or
/// the result fails validation.
pub fn load() -> Result<Option<Config>, NaviError> {
    let Some(mut cfg) = read_from(&config_path())? else {
        return Ok(None);
    };
    apply_env_overrides(&mut cfg);
    cfg.validate()?;
    Ok(Some(cfg))
}

/// Parse and validate the file at `path` without consulting the
/// environment.
pub(crate) fn read_from(path: &Path) -> Result<Option<Config>, NaviError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| NaviError::Config(format!("failed to read {}: {e}", path.display())))?;
    let cfg: Config = toml::from_str(&raw)
        .map_err(|e| NaviError::Config(format!("failed to parse {}: {e}", path.display())))?;
    cfg.validate()?;
    Ok(Some(cfg))
}

/// Apply `NAVIGLASS_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `NAVIGLASS_TICK_MS` | `feedback.tick_period_ms` |
/// | `NAVIGLASS_VIBRATION_INTENSITY` | `feedback.vibration_intensity` |
/// | `NAVIGLASS_READ_TIMEOUT_MS` | `ranging.read_timeout_ms` |
/// | `NAVIGLASS_SPEECH` | `speech.enabled` (`on`/`off`) |
/// | `NAVIGLASS_SPEECH_COMMAND` | `speech.command` (whitespace separated) |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Some(ms) = parsed_env::<u64>("NAVIGLASS_TICK_MS") {
        cfg.feedback.tick_period_ms = ms;
    }
    if let Some(intensity) = parsed_env::<f32>("NAVIGLASS_VIBRATION_INTENSITY") {
        cfg.feedback.vibration_intensity = intensity;
    }
    if let Some(ms) = parsed_env::<u64>("NAVIGLASS_READ_TIMEOUT_MS") {
        cfg.ranging.read_timeout_ms = ms;
    }
    if let Ok(v) = std::env::var("NAVIGLASS_SPEECH") {
        match v.to_ascii_lowercase().as_str() {
            "on" | "true" | "1" => cfg.speech.enabled = true,
            "off" | "false" | "0" => cfg.speech.enabled = false,
            other => warn!(value = other, "ignoring NAVIGLASS_SPEECH"),
        }
    }
    if let Ok(v) = std::env::var("NAVIGLASS_SPEECH_COMMAND") {
        let command: Vec<String> = v.split_whitespace().map(str::to_string).collect();
        if !command.is_empty() {
            cfg.speech.command = command;
        }
    }
}

fn parsed_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = name, value = %raw, "ignoring unparsable override");
            None
        }
    }
}

/// Save the config to disk, creating `~/.naviglass/` if necessary.
///
/// # Errors
///
/// Returns [`NaviError::Config`] on any filesystem or serialisation failure.
pub fn save(cfg: &Config) -> Result<(), NaviError> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), NaviError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| NaviError::Config(format!("failed to create config directory: {e}")))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| NaviError::Config(format!("failed to restrict config directory: {e}")))?;
        }
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| NaviError::Config(format!("failed to serialise config: {e}")))?;
    let write_err = |e: std::io::Error| NaviError::Config(format!("failed to write {}: {e}", path.display()));
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| f.write_all(raw.as_bytes()))
            .map_err(write_err)?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw).map_err(write_err)?;
    Ok(())
}
