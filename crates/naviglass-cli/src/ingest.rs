//! Line-oriented input from external vision and ranging drivers.
//!
//! Each stdin line is one JSON object, either a detection frame or a single
//! range reading:
//!
//! ```text
//! {"objects": [{"label": "car", "confidence": 0.91, "bbox": [0.05, 0.2, 0.45, 0.9]}]}
//! {"objects": [{"label": "person", "confidence": 0.8, "center_x": 0.6, "center_y": 0.5, "area": 0.2}]}
//! {"objects": []}
//! {"range": {"sensor": "left", "cm": 52.0}}
//! ```
//!
//! Boxes are normalised `[x1, y1, x2, y2]`.  Frames replace the detection
//! snapshot wholesale; readings update the per-sensor board.

use std::io::BufRead;

use naviglass_hal::RangeBoard;
use naviglass_perception::DetectionFeed;
use naviglass_types::{DetectedObject, NaviError};
use serde::Deserialize;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InputLine {
    Frame { objects: Vec<RawDetection> },
    Range { range: RangeReading },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawDetection {
    Boxed {
        label: String,
        confidence: f32,
        bbox: [f32; 4],
    },
    Centered(DetectedObject),
}

impl From<RawDetection> for DetectedObject {
    fn from(raw: RawDetection) -> Self {
        match raw {
            RawDetection::Boxed {
                label,
                confidence,
                bbox,
            } => DetectedObject::from_normalized_box(label, confidence, bbox),
            RawDetection::Centered(object) => object,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RangeReading {
    sensor: String,
    cm: f32,
}

/// What one input line did.
#[derive(Debug, Clone, PartialEq)]
pub enum Ingested {
    /// A frame with this many raw detections was published.
    Frame(usize),
    /// A reading for this sensor was recorded.
    Range(String),
}

/// Apply one input line.  Blank lines are ignored.
///
/// # Errors
///
/// Returns [`NaviError::InvalidRequest`] when the line is not one of the
/// accepted shapes or names a sensor the board does not know.
pub fn apply_line(line: &str, feed: &DetectionFeed, board: &RangeBoard) -> Result<Option<Ingested>, NaviError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let parsed: InputLine = serde_json::from_str(line)
        .map_err(|e| NaviError::InvalidRequest(format!("unrecognised input line: {e}")))?;
    match parsed {
        InputLine::Frame { objects } => {
            let count = objects.len();
            feed.publish(objects.into_iter().map(DetectedObject::from).collect());
            Ok(Some(Ingested::Frame(count)))
        }
        InputLine::Range { range } => {
            board.publish(&range.sensor, range.cm)?;
            Ok(Some(Ingested::Range(range.sensor)))
        }
    }
}

/// Feed every line of `reader` into `feed` and `board` until EOF.  Bad lines
/// are logged and skipped.  Returns the number of lines applied.
pub fn pump<R: BufRead>(reader: R, feed: &DetectionFeed, board: &RangeBoard) -> usize {
    let mut applied = 0;
    for (number, line) in reader.lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "input stream failed");
                break;
            }
        };
        match apply_line(&line, feed, board) {
            Ok(Some(ingested)) => {
                debug!(line = number + 1, ?ingested, "input applied");
                applied += 1;
            }
            Ok(None) => {}
            Err(e) => warn!(line = number + 1, error = %e, "input line skipped"),
        }
    }
    info!(applied, "input closed");
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const FRESH: Duration = Duration::from_secs(60);

    fn board() -> RangeBoard {
        RangeBoard::new(["left", "right"])
    }

    #[test]
    fn boxed_frame_becomes_detections() {
        let feed = DetectionFeed::new();
        let board = board();
        let line = r#"{"objects": [{"label": "car", "confidence": 0.9, "bbox": [0.0, 0.0, 0.5, 0.5]}]}"#;
        assert_eq!(apply_line(line, &feed, &board).unwrap(), Some(Ingested::Frame(1)));
        let snap = feed.snapshot();
        assert_eq!(snap[0].label, "car");
        assert_eq!(snap[0].center_x, 0.25);
        assert_eq!(snap[0].area, 0.25);
    }

    #[test]
    fn centered_frame_is_taken_as_is() {
        let feed = DetectionFeed::new();
        let board = board();
        let line = r#"{"objects": [{"label": "bench", "confidence": 0.8, "center_x": 0.7, "center_y": 0.4, "area": 0.2}]}"#;
        apply_line(line, &feed, &board).unwrap();
        assert_eq!(feed.snapshot()[0].center_x, 0.7);
    }

    #[test]
    fn empty_frame_clears_the_snapshot() {
        let feed = DetectionFeed::new();
        let board = board();
        apply_line(r#"{"objects": [{"label": "car", "confidence": 0.9, "bbox": [0, 0, 1, 1]}]}"#, &feed, &board)
            .unwrap();
        assert_eq!(apply_line(r#"{"objects": []}"#, &feed, &board).unwrap(), Some(Ingested::Frame(0)));
        assert!(feed.snapshot().is_empty());
    }

    #[test]
    fn range_line_updates_the_board() {
        let feed = DetectionFeed::new();
        let board = board();
        let ingested = apply_line(r#"{"range": {"sensor": "left", "cm": 52.0}}"#, &feed, &board).unwrap();
        assert_eq!(ingested, Some(Ingested::Range("left".to_string())));
        assert_eq!(board.latest("left", FRESH).unwrap().cm(), 52.0);
    }

    #[test]
    fn garbage_is_rejected_and_blank_is_ignored() {
        let feed = DetectionFeed::new();
        let board = board();
        assert!(matches!(apply_line("hello", &feed, &board), Err(NaviError::InvalidRequest(_))));
        assert!(apply_line(r#"{"speed": 3}"#, &feed, &board).is_err());
        assert_eq!(apply_line("   ", &feed, &board).unwrap(), None);
    }

    #[test]
    fn reading_for_unknown_sensor_is_rejected() {
        let feed = DetectionFeed::new();
        let board = board();
        let line = r#"{"range": {"sensor": "rear", "cm": 40.0}}"#;
        assert!(matches!(apply_line(line, &feed, &board), Err(NaviError::InvalidRequest(_))));
        assert!(board.latest("rear", FRESH).is_none());
    }

    #[test]
    fn pump_skips_bad_lines_and_counts_good_ones() {
        let feed = DetectionFeed::new();
        let board = board();
        let input = concat!(
            "{\"range\": {\"sensor\": \"right\", \"cm\": 120}}\n",
            "not json\n",
            "{\"range\": {\"sensor\": \"rear\", \"cm\": 40}}\n",
            "\n",
            "{\"objects\": [{\"label\": \"dog\", \"confidence\": 0.9, \"bbox\": [0.1, 0.1, 0.6, 0.6]}]}\n",
        );
        let applied = pump(input.as_bytes(), &feed, &board);
        assert_eq!(applied, 2);
        assert_eq!(board.latest("right", FRESH).unwrap().cm(), 120.0);
        assert_eq!(feed.snapshot()[0].label, "dog");
    }
}
