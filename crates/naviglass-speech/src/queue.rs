//! [`SpeechQueue`] – serialised, interruptible speech output.
//!
//! Callers enqueue utterances from the feedback loop and return immediately.
//! A single worker thread pops them in FIFO order and hands them to the
//! [`SynthesisBackend`].  An *interrupting* request jumps the line: pending
//! utterances are discarded, the in-flight one is cut off, and the urgent one
//! is spoken next.
//!
//! # Locking
//!
//! Two locks, never held together:
//!
//! * the queue lock guards pending utterances and the interrupt epoch;
//! * the backend lock guards the synthesis session.
//!
//! Every interrupt bumps the epoch.  Utterances carry the epoch they were
//! queued under, and the backend slot remembers the newest epoch it has
//! killed for.  An utterance older than that is stale and dropped; a newer
//! one whose kill has not landed yet performs the kill itself.  Whichever of
//! the interrupter and the worker reaches the backend first does the work.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use naviglass_types::SpeechRequest;
use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, info, trace, warn};

use crate::backend::SynthesisBackend;

/// How long the worker sleeps on an empty queue before checking that the
/// backend is still alive.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Upper bound on how long an interrupting caller waits for the backend lock
/// before leaving the kill to the worker.
const PREEMPT_WAIT: Duration = Duration::from_millis(250);

/// Anything that can be asked to say something.
pub trait SpeechSink: Send + Sync {
    /// Enqueue `text`.  With `interrupt`, drop everything pending, cut off
    /// the current utterance and speak `text` next.  Never blocks on audio.
    fn speak(&self, text: &str, interrupt: bool);
}

struct Utterance {
    text: String,
    epoch: u64,
}

enum Message {
    Say(Utterance),
    Stop,
}

struct QueueState {
    messages: VecDeque<Message>,
    epoch: u64,
    closed: bool,
}

struct BackendSlot {
    backend: Box<dyn SynthesisBackend>,
    killed_through: u64,
    started: bool,
}

impl BackendSlot {
    fn kill(&mut self) {
        self.backend.kill();
        self.started = false;
    }
}

struct Shared {
    queue: Mutex<QueueState>,
    ready: Condvar,
    backend: Mutex<BackendSlot>,
    poll_interval: Duration,
}

impl Shared {
    /// Cut off in-flight audio for interrupt `epoch`, unless the worker (or a
    /// later interrupt) already did.
    fn preempt(&self, epoch: u64) {
        let Some(mut slot) = self.backend.try_lock_for(PREEMPT_WAIT) else {
            debug!(epoch, "backend busy; worker will preempt");
            return;
        };
        if slot.killed_through < epoch {
            slot.kill();
            slot.killed_through = epoch;
            debug!(epoch, "in-flight speech cut off");
        }
    }

    fn deliver(&self, utterance: Utterance) {
        let mut slot = self.backend.lock();
        if utterance.epoch < slot.killed_through {
            trace!(text = %utterance.text, "dropping superseded utterance");
            return;
        }
        if utterance.epoch > slot.killed_through {
            slot.kill();
            slot.killed_through = utterance.epoch;
        }
        if !slot.started || !slot.backend.is_alive() {
            if let Err(e) = slot.backend.start() {
                warn!(backend = slot.backend.name(), error = %e, "speech backend failed to start");
                return;
            }
            slot.started = true;
        }
        match slot.backend.write(&utterance.text) {
            Ok(()) => debug!(text = %utterance.text, "spoken"),
            Err(e) => {
                warn!(backend = slot.backend.name(), error = %e, "speech write failed; restarting on next utterance");
                slot.kill();
            }
        }
    }

    fn check_liveness(&self) {
        let mut slot = self.backend.lock();
        if slot.started && !slot.backend.is_alive() {
            warn!(backend = slot.backend.name(), "speech backend exited; will restart on demand");
            slot.kill();
        }
    }

    fn run(&self) {
        debug!("speech worker started");
        loop {
            let next = {
                let mut queue = self.queue.lock();
                if queue.messages.is_empty() {
                    self.ready.wait_for(&mut queue, self.poll_interval);
                }
                queue.messages.pop_front()
            };
            match next {
                Some(Message::Say(utterance)) => self.deliver(utterance),
                Some(Message::Stop) => break,
                None => self.check_liveness(),
            }
        }
        debug!("speech worker acknowledged stop");
    }
}

/// Interruptible speech queue backed by one worker thread.
///
/// When the backend reports missing assets at startup the queue runs in
/// silent mode: every request is accepted and ignored.
pub struct SpeechQueue {
    shared: Option<Arc<Shared>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SpeechQueue {
    /// Start a queue over `backend` and spawn its worker.
    pub fn spawn(backend: Box<dyn SynthesisBackend>, poll_interval: Duration) -> Self {
        if !backend.assets_available() {
            warn!(backend = backend.name(), "speech assets unavailable; running silent");
            return Self::silent();
        }
        let queue = Self::idle(backend, poll_interval);
        queue.start_worker();
        info!("speech queue started");
        queue
    }

    /// A queue that accepts requests and never speaks.
    pub fn silent() -> Self {
        Self {
            shared: None,
            worker: Mutex::new(None),
        }
    }

    /// `true` when the queue is in silent mode.
    pub fn is_silent(&self) -> bool {
        self.shared.is_none()
    }

    fn idle(backend: Box<dyn SynthesisBackend>, poll_interval: Duration) -> Self {
        let shared = Shared {
            queue: Mutex::new(QueueState {
                messages: VecDeque::new(),
                epoch: 0,
                closed: false,
            }),
            ready: Condvar::new(),
            backend: Mutex::new(BackendSlot {
                backend,
                killed_through: 0,
                started: false,
            }),
            poll_interval,
        };
        Self {
            shared: Some(Arc::new(shared)),
            worker: Mutex::new(None),
        }
    }

    fn start_worker(&self) {
        let Some(shared) = &self.shared else { return };
        let shared = Arc::clone(shared);
        let spawned = std::thread::Builder::new()
            .name("naviglass-speech".to_string())
            .spawn(move || shared.run());
        match spawned {
            Ok(handle) => *self.worker.lock() = Some(handle),
            Err(e) => error!(error = %e, "failed to spawn speech worker"),
        }
    }

    /// Texts waiting to be spoken, oldest first.
    pub fn pending(&self) -> Vec<String> {
        let Some(shared) = &self.shared else { return Vec::new() };
        shared
            .queue
            .lock()
            .messages
            .iter()
            .filter_map(|m| match m {
                Message::Say(u) => Some(u.text.clone()),
                Message::Stop => None,
            })
            .collect()
    }

    /// Let the worker finish what is queued, then shut the backend down.
    /// Safe to call more than once; later calls return immediately.
    pub fn stop(&self) {
        let Some(handle) = self.worker.lock().take() else { return };
        if let Some(shared) = &self.shared {
            {
                let mut queue = shared.queue.lock();
                queue.closed = true;
                queue.messages.push_back(Message::Stop);
            }
            shared.ready.notify_all();
        }
        if handle.join().is_err() {
            error!("speech worker panicked");
        }
        if let Some(shared) = &self.shared {
            shared.backend.lock().kill();
        }
        info!("speech queue stopped");
    }
}

impl SpeechSink for SpeechQueue {
    fn speak(&self, text: &str, interrupt: bool) {
        let Some(shared) = &self.shared else {
            trace!(%text, "silent mode; utterance ignored");
            return;
        };
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        let epoch = {
            let mut queue = shared.queue.lock();
            if queue.closed {
                return;
            }
            if interrupt {
                queue.epoch += 1;
                let dropped = queue.messages.len();
                queue.messages.clear();
                if dropped > 0 {
                    debug!(dropped, "pending speech discarded");
                }
            }
            let epoch = queue.epoch;
            queue.messages.push_back(Message::Say(Utterance {
                text: text.to_string(),
                epoch,
            }));
            epoch
        };
        shared.ready.notify_one();

        if interrupt {
            shared.preempt(epoch);
        }
    }
}

impl Drop for SpeechQueue {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Sink that only remembers what it was asked to say.  Used by tests and
/// dry runs of the feedback engine.
#[derive(Default)]
pub struct RecordingSink {
    requests: Mutex<Vec<SpeechRequest>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request so far, oldest first.
    pub fn requests(&self) -> Vec<SpeechRequest> {
        self.requests.lock().clone()
    }
}

impl SpeechSink for RecordingSink {
    fn speak(&self, text: &str, interrupt: bool) {
        match SpeechRequest::new(text, interrupt) {
            Ok(request) => self.requests.lock().push(request),
            Err(e) => warn!(error = %e, "rejected speech request"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendLog, RecordingBackend};
    use std::time::Instant;

    const FAST_POLL: Duration = Duration::from_millis(20);

    fn wait_until(log: &Arc<Mutex<BackendLog>>, pred: impl Fn(&BackendLog) -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if pred(&log.lock()) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn speaks_in_fifo_order() {
        let backend = RecordingBackend::new();
        let log = backend.log();
        let queue = SpeechQueue::spawn(Box::new(backend), FAST_POLL);
        queue.speak("one", false);
        queue.speak("two", false);
        queue.speak("three", false);
        assert!(wait_until(&log, |l| l.spoken.len() == 3));
        assert_eq!(log.lock().spoken, ["one", "two", "three"]);
        assert_eq!(log.lock().starts, 1);
    }

    #[test]
    fn interrupt_discards_pending_and_cuts_in_flight_audio() {
        let backend = RecordingBackend::new();
        let log = backend.log();
        let queue = SpeechQueue::idle(Box::new(backend), FAST_POLL);
        {
            // Something is already playing.
            let shared = queue.shared.as_ref().unwrap();
            let mut slot = shared.backend.lock();
            slot.backend.start().unwrap();
            slot.started = true;
        }

        queue.speak("a", false);
        queue.speak("b", false);
        queue.speak("c", true);

        assert_eq!(queue.pending(), ["c"]);
        assert_eq!(log.lock().kills, 1);

        queue.start_worker();
        assert!(wait_until(&log, |l| l.spoken == ["c"]));
    }

    #[test]
    fn utterance_older_than_last_interrupt_is_dropped() {
        let backend = RecordingBackend::new();
        let log = backend.log();
        let queue = SpeechQueue::idle(Box::new(backend), FAST_POLL);
        let shared = Arc::clone(queue.shared.as_ref().unwrap());

        queue.speak("stale", false);
        // The worker popped "stale" just before an interrupt landed.
        let popped = match shared.queue.lock().messages.pop_front() {
            Some(Message::Say(u)) => u,
            _ => panic!("expected an utterance"),
        };
        queue.speak("urgent", true);
        shared.deliver(popped);
        assert!(log.lock().spoken.is_empty());

        queue.start_worker();
        assert!(wait_until(&log, |l| l.spoken == ["urgent"]));
    }

    #[test]
    fn interrupt_racing_concurrent_speakers_keeps_only_later_requests() {
        use std::sync::Barrier;
        use std::sync::atomic::{AtomicBool, Ordering};

        const SPEAKERS: usize = 4;
        const PER_SPEAKER: usize = 40;

        let backend = RecordingBackend::new();
        let log = backend.log();
        let queue = Arc::new(SpeechQueue::spawn(Box::new(backend), FAST_POLL));
        let halfway = Arc::new(Barrier::new(SPEAKERS + 1));
        let interrupted = Arc::new(AtomicBool::new(false));

        let speakers: Vec<_> = (0..SPEAKERS)
            .map(|s| {
                let queue = Arc::clone(&queue);
                let halfway = Arc::clone(&halfway);
                let interrupted = Arc::clone(&interrupted);
                std::thread::spawn(move || {
                    let mut after_interrupt = Vec::new();
                    for i in 0..PER_SPEAKER {
                        if i == PER_SPEAKER / 2 {
                            halfway.wait();
                        }
                        let text = format!("s{s}-{i}");
                        let late = interrupted.load(Ordering::SeqCst);
                        queue.speak(&text, false);
                        if late {
                            after_interrupt.push(text);
                        }
                    }
                    after_interrupt
                })
            })
            .collect();

        halfway.wait();
        queue.speak("urgent", true);
        interrupted.store(true, Ordering::SeqCst);

        let must_survive: Vec<String> = speakers.into_iter().flat_map(|h| h.join().unwrap()).collect();
        queue.speak("done", false);
        assert!(wait_until(&log, |l| l.spoken.last().is_some_and(|t| t == "done")));

        let spoken = log.lock().spoken.clone();
        let urgent_at = spoken.iter().position(|t| t == "urgent").expect("interrupt was spoken");
        assert_eq!(spoken.iter().filter(|t| *t == "urgent").count(), 1);

        for text in &must_survive {
            let at = spoken.iter().position(|t| t == text);
            assert!(at.is_some_and(|at| at > urgent_at), "{text} lost or spoken before the interrupt");
        }

        // Per speaker, what follows the interrupt is an unbroken tail of its
        // requests: nothing queued before the purge slipped through.
        for s in 0..SPEAKERS {
            let prefix = format!("s{s}-");
            let tail: Vec<usize> = spoken[urgent_at + 1..]
                .iter()
                .filter_map(|t| t.strip_prefix(&prefix))
                .filter_map(|i| i.parse().ok())
                .collect();
            let expected: Vec<usize> = (PER_SPEAKER - tail.len()..PER_SPEAKER).collect();
            assert_eq!(tail, expected, "speaker {s} delivered a purged request");
        }
    }

    #[test]
    fn interrupt_kill_happens_once_per_epoch() {
        let backend = RecordingBackend::new();
        let log = backend.log();
        let queue = SpeechQueue::spawn(Box::new(backend), FAST_POLL);
        queue.speak("first", false);
        assert!(wait_until(&log, |l| l.spoken.len() == 1));

        queue.speak("stop now", true);
        assert!(wait_until(&log, |l| l.spoken.len() == 2));
        assert_eq!(log.lock().kills, 1);
        assert_eq!(log.lock().spoken, ["first", "stop now"]);
    }

    #[test]
    fn missing_assets_means_silent_mode() {
        let backend = RecordingBackend::new().without_assets();
        let log = backend.log();
        let queue = SpeechQueue::spawn(Box::new(backend), FAST_POLL);
        assert!(queue.is_silent());
        queue.speak("hello", false);
        queue.speak("urgent", true);
        assert!(queue.pending().is_empty());
        queue.stop();
        assert_eq!(log.lock().starts, 0);
        assert!(log.lock().spoken.is_empty());
    }

    #[test]
    fn blank_text_is_ignored() {
        let backend = RecordingBackend::new();
        let queue = SpeechQueue::idle(Box::new(backend), FAST_POLL);
        queue.speak("   ", false);
        queue.speak("", true);
        assert!(queue.pending().is_empty());
    }

    #[test]
    fn stop_drains_then_is_idempotent() {
        let backend = RecordingBackend::new();
        let log = backend.log();
        let queue = SpeechQueue::spawn(Box::new(backend), FAST_POLL);
        queue.speak("goodbye", false);
        queue.stop();
        assert_eq!(log.lock().spoken, ["goodbye"]);
        assert!(!log.lock().alive);

        queue.stop();
        queue.speak("after stop", false);
        assert!(queue.pending().is_empty());
    }

    #[test]
    fn failed_write_restarts_backend_on_next_utterance() {
        let backend = RecordingBackend::new().fail_writes(true);
        let log = backend.log();
        let queue = SpeechQueue::spawn(Box::new(backend), FAST_POLL);
        queue.speak("lost", false);
        assert!(wait_until(&log, |l| l.starts == 1 && !l.alive));

        log.lock().fail_writes = false;
        queue.speak("recovered", false);
        assert!(wait_until(&log, |l| l.spoken == ["recovered"]));
        assert_eq!(log.lock().starts, 2);
    }

    #[test]
    fn dead_backend_is_noticed_while_idle() {
        let backend = RecordingBackend::new();
        let log = backend.log();
        let crasher = backend.clone();
        let queue = SpeechQueue::spawn(Box::new(backend), FAST_POLL);
        queue.speak("hello", false);
        assert!(wait_until(&log, |l| l.spoken.len() == 1));

        crasher.crash();
        let shared = Arc::clone(queue.shared.as_ref().unwrap());
        let deadline = Instant::now() + Duration::from_secs(2);
        while shared.backend.lock().started && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(!shared.backend.lock().started);

        queue.speak("again", false);
        assert!(wait_until(&log, |l| l.spoken.len() == 2));
        assert_eq!(log.lock().starts, 2);
    }

    #[test]
    fn recording_sink_keeps_valid_requests() {
        let sink = RecordingSink::new();
        sink.speak("car ahead", true);
        sink.speak("  ", false);
        let requests = sink.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].text, "car ahead");
        assert!(requests[0].interrupt);
    }
}
