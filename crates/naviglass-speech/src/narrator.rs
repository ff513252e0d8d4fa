//! [`NarrationGenerator`] – turns "car, 45 cm, left of frame" into a short,
//! varied English sentence.
//!
//! The urgency band ([`NarrationCategory`]) is chosen from the fused distance
//! alone.  A template is then drawn at random from that band's pool, and the
//! label is replaced by a random synonym so repeated alerts do not sound
//! canned.  The random source is a type parameter: production code seeds
//! from entropy, tests pass a fixed seed and get reproducible sentences.
//!
//! # Example
//!
//! ```rust
//! use naviglass_speech::narrator::NarrationGenerator;
//!
//! let mut narrator = NarrationGenerator::seeded(7);
//! let sentence = narrator.generate("car", 45.0, 0.1);
//! assert!(sentence.contains("on your left"));
//! ```

use naviglass_types::NarrationCategory;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::phrasebook;

/// Objects left of this normalised x are "on your left".
const LEFT_OF: f32 = 0.35;
/// Objects right of this normalised x are "on your right".
const RIGHT_OF: f32 = 0.65;

/// Spoken position for a horizontal frame coordinate.
pub fn position_phrase(center_x: f32) -> &'static str {
    if center_x < LEFT_OF {
        "on your left"
    } else if center_x > RIGHT_OF {
        "on your right"
    } else {
        "right ahead"
    }
}

/// Spoken distance: centimetres when close, whole metres in the info band,
/// nothing when the distance is unknown.
pub fn distance_phrase(distance_cm: f32) -> String {
    match NarrationCategory::from_distance(distance_cm) {
        NarrationCategory::Critical | NarrationCategory::Warning => {
            format!("{distance_cm:.0} centimeters")
        }
        NarrationCategory::Info => format!("{} meters", (distance_cm / 100.0).floor() as u32),
        NarrationCategory::Unknown => String::new(),
    }
}

/// Collapse every whitespace run to one space and trim the ends.
fn collapse_whitespace(sentence: &str) -> String {
    sentence.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Append `", {pos}"` ahead of the closing punctuation of a template that
/// does not place the position itself.
fn with_trailing_position(template: &str) -> String {
    let body = template.trim_end();
    let stem = body.trim_end_matches(['.', '!', '?']);
    let punctuation = &body[stem.len()..];
    format!("{stem}, {{pos}}{punctuation}")
}

/// Random-but-reproducible sentence builder.
pub struct NarrationGenerator<R = StdRng> {
    rng: R,
}

impl NarrationGenerator<StdRng> {
    /// Generator seeded from OS entropy.
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// Generator with a fixed seed: same seed, same sentences.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> NarrationGenerator<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Random spoken form of a detector label; classes without a synonym
    /// table become `"a {label}"`.
    pub fn label_phrase(&mut self, label: &str) -> String {
        phrasebook::synonyms_for(label)
            .and_then(|alternates| alternates.choose(&mut self.rng))
            .map(|s| (*s).to_string())
            .unwrap_or_else(|| format!("a {label}"))
    }

    /// Build one sentence about `label` at `distance_cm`, centred at
    /// `center_x` in the frame.
    ///
    /// The result always mentions the label and the position, contains no
    /// doubled spaces, and is never empty.
    pub fn generate(&mut self, label: &str, distance_cm: f32, center_x: f32) -> String {
        let category = NarrationCategory::from_distance(distance_cm);
        let template = phrasebook::templates(category)
            .choose(&mut self.rng)
            .copied()
            .unwrap_or("{label} {pos}.");
        let template = if template.contains("{pos}") {
            template.to_string()
        } else {
            with_trailing_position(template)
        };

        let sentence = template
            .replace("{label}", &self.label_phrase(label))
            .replace("{dist}", &distance_phrase(distance_cm))
            .replace("{pos}", position_phrase(center_x));
        collapse_whitespace(&sentence)
    }
}
