//! Synthesis backends.
//!
//! The speech queue never talks to a TTS engine directly.  It drives a
//! [`SynthesisBackend`]: a long-lived session that accepts one utterance at a
//! time and plays it, and that can be killed mid-sentence when something
//! urgent comes up.
//!
//! [`ProcessBackend`] keeps a synthesis program running and feeds it one
//! utterance per line on stdin (e.g. `espeak-ng`, or `piper` behind a small
//! wrapper that plays its output).  Killing the process is what silences
//! in-flight audio.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::Arc;

use naviglass_types::NaviError;
use parking_lot::Mutex;
use tracing::{debug, info};

/// A persistent, killable speech synthesis session.
pub trait SynthesisBackend: Send {
    /// Human-readable backend name for logs.
    fn name(&self) -> &str;

    /// `false` when the voice/model files or the program itself are missing.
    /// Checked once at startup; a backend that reports `false` is never used.
    fn assets_available(&self) -> bool {
        true
    }

    /// Start (or restart) the session.
    ///
    /// # Errors
    ///
    /// Returns [`NaviError::Speech`] when the session cannot be started.
    fn start(&mut self) -> Result<(), NaviError>;

    /// Hand one utterance to the running session.
    ///
    /// # Errors
    ///
    /// Returns [`NaviError::Speech`] when the session is not running or the
    /// write fails; the caller treats the session as dead.
    fn write(&mut self, text: &str) -> Result<(), NaviError>;

    /// Stop the session immediately, cutting off any audio in flight.  A no-op
    /// when nothing is running.
    fn kill(&mut self);

    /// `true` while the session is running.
    fn is_alive(&mut self) -> bool;
}

// ────────────────────────────────────────────────────────────────────────────
// ProcessBackend
// ────────────────────────────────────────────────────────────────────────────

/// Runs a synthesis program as a child process and pipes utterances into its
/// stdin, one per line.
pub struct ProcessBackend {
    program: String,
    args: Vec<String>,
    assets: Vec<PathBuf>,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
}

impl ProcessBackend {
    /// Build a backend from a command line (`program arg1 arg2 …`) and the
    /// files the program needs (voice models and the like).
    ///
    /// # Errors
    ///
    /// Returns [`NaviError::Config`] when `command` is empty.
    pub fn new(command: &[String], assets: Vec<PathBuf>) -> Result<Self, NaviError> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| NaviError::Config("speech command must not be empty".to_string()))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            assets,
            child: None,
            stdin: None,
        })
    }
}

impl SynthesisBackend for ProcessBackend {
    fn name(&self) -> &str {
        &self.program
    }

    fn assets_available(&self) -> bool {
        if !program_exists(&self.program) {
            info!(program = %self.program, "speech program not found");
            return false;
        }
        match self.assets.iter().find(|asset| !asset.exists()) {
            Some(missing) => {
                info!(asset = %missing.display(), "speech asset missing");
                false
            }
            None => true,
        }
    }

    fn start(&mut self) -> Result<(), NaviError> {
        self.kill();
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| NaviError::Speech(format!("failed to spawn {}: {e}", self.program)))?;
        self.stdin = child.stdin.take();
        debug!(program = %self.program, pid = child.id(), "speech process started");
        self.child = Some(child);
        Ok(())
    }

    fn write(&mut self, text: &str) -> Result<(), NaviError> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| NaviError::Speech("speech process is not running".to_string()))?;
        writeln!(stdin, "{}", single_line(text))
            .and_then(|()| stdin.flush())
            .map_err(|e| NaviError::Speech(format!("write to {} failed: {e}", self.program)))
    }

    fn kill(&mut self) {
        // Closing stdin first lets a well-behaved synthesizer exit on its own.
        self.stdin = None;
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                debug!(program = %self.program, error = %e, "speech process kill failed");
            }
            match child.wait() {
                Ok(status) => debug!(program = %self.program, %status, "speech process killed"),
                Err(e) => debug!(program = %self.program, error = %e, "speech process reap failed"),
            }
        }
    }

    fn is_alive(&mut self) -> bool {
        match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }
}

impl Drop for ProcessBackend {
    fn drop(&mut self) {
        self.kill();
    }
}

/// Utterances are line-delimited, so embedded line breaks and control
/// characters become spaces.
fn single_line(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}

fn program_exists(program: &str) -> bool {
    let path = Path::new(program);
    if path.components().count() > 1 {
        return path.is_file();
    }
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
        .unwrap_or(false)
}

// ────────────────────────────────────────────────────────────────────────────
// RecordingBackend
// ────────────────────────────────────────────────────────────────────────────

/// Everything a [`RecordingBackend`] has been asked to do.
#[derive(Debug, Default, Clone)]
pub struct BackendLog {
    pub spoken: Vec<String>,
    pub starts: usize,
    /// Kills that hit a running session.
    pub kills: usize,
    pub alive: bool,
    pub fail_writes: bool,
    pub assets_missing: bool,
}

/// In-memory backend for tests and headless runs.  Clones share the log.
#[derive(Clone, Default)]
pub struct RecordingBackend {
    log: Arc<Mutex<BackendLog>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared view of the log.
    pub fn log(&self) -> Arc<Mutex<BackendLog>> {
        Arc::clone(&self.log)
    }

    /// Make every subsequent write fail.
    pub fn fail_writes(self, fail: bool) -> Self {
        self.log.lock().fail_writes = fail;
        self
    }

    /// Report missing assets at startup.
    pub fn without_assets(self) -> Self {
        self.log.lock().assets_missing = true;
        self
    }

    /// Simulate the session dying on its own.
    pub fn crash(&self) {
        self.log.lock().alive = false;
    }
}

impl SynthesisBackend for RecordingBackend {
    fn name(&self) -> &str {
        "recording"
    }

    fn assets_available(&self) -> bool {
        !self.log.lock().assets_missing
    }

    fn start(&mut self) -> Result<(), NaviError> {
        let mut log = self.log.lock();
        log.starts += 1;
        log.alive = true;
        Ok(())
    }

    fn write(&mut self, text: &str) -> Result<(), NaviError> {
        let mut log = self.log.lock();
        if !log.alive {
            return Err(NaviError::Speech("session not running".to_string()));
        }
        if log.fail_writes {
            log.alive = false;
            return Err(NaviError::Speech("broken pipe".to_string()));
        }
        log.spoken.push(text.to_string());
        Ok(())
    }

    fn kill(&mut self) {
        let mut log = self.log.lock();
        if log.alive {
            log.kills += 1;
        }
        log.alive = false;
    }

    fn is_alive(&mut self) -> bool {
        self.log.lock().alive
    }
}
