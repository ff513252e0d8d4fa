//! Generic `RangeSensor` trait for ultrasonic (or any single-beam) distance
//! sensors, and [`RangeBoard`], a shared store for readings pushed in by an
//! external ranging process.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use naviglass_types::{DistanceSample, NaviError};
use parking_lot::{Condvar, Mutex};
use tracing::trace;

/// A single distance sensor.
///
/// Implementations block for at most their own read timeout and return
/// [`DistanceSample::OUT_OF_RANGE`] when no echo arrives in time.  A timeout
/// is *not* an error.
pub trait RangeSensor: Send {
    /// Stable identifier, e.g. `"left_ultrasonic"`.
    fn id(&self) -> &str;

    /// Take one raw reading.
    ///
    /// # Errors
    ///
    /// Returns [`NaviError::HardwareFault`] when the driver itself fails
    /// (e.g. the device disappeared), as opposed to simply seeing no echo.
    fn sample(&mut self) -> Result<DistanceSample, NaviError>;
}

impl<S: RangeSensor + ?Sized> RangeSensor for Box<S> {
    fn id(&self) -> &str {
        (**self).id()
    }

    fn sample(&mut self) -> Result<DistanceSample, NaviError> {
        (**self).sample()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// RangeBoard
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct Reading {
    sample: DistanceSample,
    at: Instant,
    seq: u64,
}

#[derive(Default)]
struct BoardShared {
    readings: Mutex<HashMap<String, Option<Reading>>>,
    fresh: Condvar,
}

/// Latest reading per registered sensor, written by an external ranging
/// process and read by [`BoardRangeSensor`]s.  Clones share the same store.
///
/// Every published reading carries a sequence number, so each sensor view
/// consumes a reading at most once.
#[derive(Clone)]
pub struct RangeBoard {
    shared: Arc<BoardShared>,
}

impl RangeBoard {
    /// A board accepting readings for exactly `sensor_ids`.
    pub fn new<I, S>(sensor_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let shared = BoardShared::default();
        {
            let mut readings = shared.readings.lock();
            for id in sensor_ids {
                readings.insert(id.into(), None);
            }
        }
        Self {
            shared: Arc::new(shared),
        }
    }

    /// Record `cm` as the latest reading of `sensor_id`.
    ///
    /// # Errors
    ///
    /// Returns [`NaviError::InvalidRequest`] when `sensor_id` is not
    /// registered on this board.
    pub fn publish(&self, sensor_id: &str, cm: f32) -> Result<(), NaviError> {
        self.publish_at(sensor_id, cm, Instant::now())
    }

    pub(crate) fn publish_at(&self, sensor_id: &str, cm: f32, at: Instant) -> Result<(), NaviError> {
        {
            let mut readings = self.shared.readings.lock();
            let Some(slot) = readings.get_mut(sensor_id) else {
                return Err(NaviError::InvalidRequest(format!(
                    "unknown range sensor {sensor_id:?}"
                )));
            };
            let seq = (*slot).map_or(1, |r| r.seq + 1);
            *slot = Some(Reading {
                sample: DistanceSample::new(cm),
                at,
                seq,
            });
        }
        self.shared.fresh.notify_all();
        Ok(())
    }

    /// Latest reading of `sensor_id` if it is younger than `max_age`.
    pub fn latest(&self, sensor_id: &str, max_age: Duration) -> Option<DistanceSample> {
        let readings = self.shared.readings.lock();
        readings
            .get(sensor_id)
            .copied()
            .flatten()
            .filter(|r| r.at.elapsed() <= max_age)
            .map(|r| r.sample)
    }

    /// A [`RangeSensor`] view of one sensor on this board.  Each sample
    /// waits up to `timeout` for a reading it has not seen yet.
    pub fn sensor(&self, sensor_id: impl Into<String>, timeout: Duration) -> BoardRangeSensor {
        BoardRangeSensor {
            id: sensor_id.into(),
            board: self.clone(),
            timeout,
            seen: 0,
        }
    }

    /// First reading of `sensor_id` newer than `seen` and younger than
    /// `timeout`, waiting at most `timeout` for one to arrive.
    fn next_after(&self, sensor_id: &str, seen: u64, timeout: Duration) -> Option<Reading> {
        let deadline = Instant::now() + timeout;
        let mut readings = self.shared.readings.lock();
        loop {
            let fresh = readings
                .get(sensor_id)
                .copied()
                .flatten()
                .filter(|r| r.seq > seen && r.at.elapsed() <= timeout);
            if fresh.is_some() {
                return fresh;
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            self.shared.fresh.wait_for(&mut readings, deadline - now);
        }
    }
}

/// Serves board readings one at a time.  A sample that finds no unseen
/// reading within the timeout is treated like a missed echo.
pub struct BoardRangeSensor {
    id: String,
    board: RangeBoard,
    timeout: Duration,
    seen: u64,
}

impl RangeSensor for BoardRangeSensor {
    fn id(&self) -> &str {
        &self.id
    }

    fn sample(&mut self) -> Result<DistanceSample, NaviError> {
        match self.board.next_after(&self.id, self.seen, self.timeout) {
            Some(reading) => {
                self.seen = reading.seq;
                Ok(reading.sample)
            }
            None => {
                trace!(sensor = %self.id, "no fresh board reading");
                Ok(DistanceSample::OUT_OF_RANGE)
            }
        }
    }
}
