//! `naviglass-perception` – turns raw sensor traffic into the two facts the
//! feedback engine decides on: *what* is in front of the user and *how far*
//! away it is.
//!
//! # Modules
//!
//! - [`fusion`] – [`SensorFusion`][fusion::SensorFusion]: per-sensor median
//!   filtering of ultrasonic samples and closest-wins fusion of the two
//!   temple sensors.
//! - [`selector`] – [`select_most_salient`][selector::select_most_salient]
//!   and [`CandidateFilter`][selector::CandidateFilter]: pick the one object
//!   worth talking about.
//! - [`feed`] – [`DetectionFeed`][feed::DetectionFeed]: the latest-frame
//!   hand-off point between the vision collaborator and the core.

pub mod feed;
pub mod fusion;
pub mod selector;

pub use feed::DetectionFeed;
pub use fusion::{FusedReading, MedianSampler, SensorFusion};
pub use selector::{CandidateFilter, select_most_salient};
