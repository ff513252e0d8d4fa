//! Detection selection.
//!
//! The vision collaborator may report several objects per frame.  The user
//! only ever hears about one: the largest, which is the closest or most
//! prominent thing in view.

use naviglass_types::DetectedObject;

/// Pick the object with the largest `area`.
///
/// Returns `None` for an empty frame.  Ties go to the earliest candidate;
/// candidates with a non-finite area are skipped.
pub fn select_most_salient(candidates: &[DetectedObject]) -> Option<&DetectedObject> {
    candidates
        .iter()
        .filter(|candidate| candidate.area.is_finite())
        .fold(None, |best, candidate| match best {
            Some(current) if candidate.area > current.area => Some(candidate),
            Some(current) => Some(current),
            None => Some(candidate),
        })
}

/// Confidence/size gate applied to raw detections.
///
/// The vision pipeline already applies the same thresholds; the core
/// re-applies them so unfiltered input cannot slip through.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateFilter {
    /// Minimum detector confidence (inclusive).
    pub min_confidence: f32,
    /// Minimum box area as a fraction of the frame (inclusive).
    pub min_area: f32,
}

impl CandidateFilter {
    pub fn new(min_confidence: f32, min_area: f32) -> Self {
        Self {
            min_confidence,
            min_area,
        }
    }

    /// `true` when `object` passes both thresholds.
    pub fn accepts(&self, object: &DetectedObject) -> bool {
        object.confidence >= self.min_confidence && object.area >= self.min_area
    }

    /// Keep only the accepted objects, preserving order.
    pub fn retain(&self, objects: impl IntoIterator<Item = DetectedObject>) -> Vec<DetectedObject> {
        objects.into_iter().filter(|o| self.accepts(o)).collect()
    }
}

impl Default for CandidateFilter {
    /// 70 % confidence, one sixteenth of the frame.
    fn default() -> Self {
        Self::new(0.70, 1.0 / 16.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(label: &str, confidence: f32, area: f32) -> DetectedObject {
        DetectedObject {
            label: label.to_string(),
            confidence,
            center_x: 0.5,
            center_y: 0.5,
            area,
        }
    }

    #[test]
    fn empty_frame_selects_nothing() {
        assert!(select_most_salient(&[]).is_none());
    }

    #[test]
    fn largest_area_wins() {
        let frame = vec![obj("person", 0.9, 0.1), obj("car", 0.8, 0.4), obj("bench", 0.95, 0.2)];
        assert_eq!(select_most_salient(&frame).unwrap().label, "car");
    }

    #[test]
    fn ties_go_to_first_occurrence() {
        let frame = vec![obj("bus", 0.9, 0.3), obj("truck", 0.9, 0.3)];
        assert_eq!(select_most_salient(&frame).unwrap().label, "bus");
    }

    #[test]
    fn nan_area_never_displaces_a_real_candidate() {
        let frame = vec![obj("bench", 0.9, 0.2), obj("ghost", 0.9, f32::NAN)];
        assert_eq!(select_most_salient(&frame).unwrap().label, "bench");

        let frame = vec![obj("ghost", 0.9, f32::NAN), obj("bench", 0.9, 0.4)];
        assert_eq!(select_most_salient(&frame).unwrap().label, "bench");
    }

    #[test]
    fn frame_of_only_non_finite_areas_selects_nothing() {
        let frame = vec![obj("ghost", 0.9, f32::NAN), obj("void", 0.9, f32::INFINITY)];
        assert!(select_most_salient(&frame).is_none());
    }

    #[test]
    fn default_filter_thresholds() {
        let filter = CandidateFilter::default();
        assert!(filter.accepts(&obj("person", 0.70, 0.0625)));
        assert!(!filter.accepts(&obj("person", 0.69, 0.5)));
        assert!(!filter.accepts(&obj("person", 0.9, 0.06)));
    }

    #[test]
    fn retain_preserves_order() {
        let filter = CandidateFilter::default();
        let kept = filter.retain(vec![
            obj("car", 0.9, 0.2),
            obj("tiny", 0.9, 0.01),
            obj("bus", 0.8, 0.3),
        ]);
        let labels: Vec<_> = kept.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, ["car", "bus"]);
    }
}
