//! `naviglass-runtime` – the feedback core.
//!
//! Wires perception, haptics and speech into one periodic decision loop.
//!
//! # Modules
//!
//! - [`feedback`] – [`FeedbackEngine`][feedback::FeedbackEngine]: the
//!   hysteresis state machine that decides, once per tick, whether to
//!   vibrate, how hard and on which side, and whether to speak.  Faults and
//!   panics inside a tick are contained there.
//! - [`tick_loop`] – [`run`][tick_loop::run]: drives the engine on a fixed
//!   period from an async task, moving each tick onto the blocking pool.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: global
//!   `tracing` subscriber with optional OTLP span export.

pub mod feedback;
pub mod telemetry;
pub mod tick_loop;

pub use feedback::{FeedbackConfig, FeedbackEngine, FeedbackState, TickOutcome};
pub use telemetry::{TracerProviderGuard, init_tracing};
