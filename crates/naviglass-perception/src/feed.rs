//! [`DetectionFeed`] – latest-frame hand-off from the vision collaborator.
//!
//! The publisher overwrites the snapshot once per processed frame; the
//! feedback engine copies whatever is there at tick time.  Nobody ever waits
//! for the *next* frame: stale-but-available beats blocking the safety loop.

use std::sync::Arc;

use naviglass_types::DetectedObject;
use parking_lot::Mutex;

use crate::selector::CandidateFilter;

/// Shared latest-frame slot.  Clones share the same slot.
#[derive(Clone, Default)]
pub struct DetectionFeed {
    latest: Arc<Mutex<Vec<DetectedObject>>>,
    filter: Option<CandidateFilter>,
}

impl DetectionFeed {
    /// A feed that stores frames exactly as published.
    pub fn new() -> Self {
        Self::default()
    }

    /// A feed that drops candidates rejected by `filter` on publish.
    pub fn with_filter(filter: CandidateFilter) -> Self {
        Self {
            latest: Arc::default(),
            filter: Some(filter),
        }
    }

    /// Replace the current snapshot with `objects`.
    pub fn publish(&self, objects: Vec<DetectedObject>) {
        let objects = match &self.filter {
            Some(filter) => filter.retain(objects),
            None => objects,
        };
        *self.latest.lock() = objects;
    }

    /// Empty the snapshot (e.g. the camera stalled).
    pub fn clear(&self) {
        self.latest.lock().clear();
    }

    /// Copy of the most recent snapshot.
    pub fn snapshot(&self) -> Vec<DetectedObject> {
        self.latest.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obj(label: &str, confidence: f32, area: f32) -> DetectedObject {
        DetectedObject {
            label: label.to_string(),
            confidence,
            center_x: 0.2,
            center_y: 0.5,
            area,
        }
    }

    #[test]
    fn publish_overwrites_previous_frame() {
        let feed = DetectionFeed::new();
        feed.publish(vec![obj("car", 0.9, 0.3)]);
        feed.publish(vec![obj("person", 0.9, 0.2)]);
        let snap = feed.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].label, "person");
    }

    #[test]
    fn clones_share_the_slot() {
        let publisher = DetectionFeed::new();
        let reader = publisher.clone();
        publisher.publish(vec![obj("bench", 0.8, 0.1)]);
        assert_eq!(reader.snapshot().len(), 1);
        publisher.clear();
        assert!(reader.snapshot().is_empty());
    }

    #[test]
    fn filtered_feed_drops_weak_candidates() {
        let feed = DetectionFeed::with_filter(CandidateFilter::default());
        feed.publish(vec![obj("car", 0.5, 0.3), obj("bus", 0.9, 0.3)]);
        let snap = feed.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].label, "bus");
    }
}
