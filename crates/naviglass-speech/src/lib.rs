//! `naviglass-speech` – everything the device says out loud.
//!
//! # Modules
//!
//! - [`narrator`] – [`NarrationGenerator`][narrator::NarrationGenerator]:
//!   randomised, template-based sentences about one object.
//! - [`phrasebook`] – the template pools and label synonyms it draws from.
//! - [`queue`] – [`SpeechQueue`][queue::SpeechQueue]: FIFO speech output
//!   with pre-emptive interrupts, and the [`SpeechSink`][queue::SpeechSink]
//!   trait the feedback engine speaks through.
//! - [`backend`] – [`SynthesisBackend`][backend::SynthesisBackend] and the
//!   process-based implementation that drives an external synthesizer.

pub mod backend;
pub mod narrator;
pub mod phrasebook;
pub mod queue;

pub use backend::{ProcessBackend, RecordingBackend, SynthesisBackend};
pub use narrator::NarrationGenerator;
pub use queue::{RecordingSink, SpeechQueue, SpeechSink};
