//! Ultrasonic Sensor Fusion.
//!
//! Two independently aimed ultrasonic sensors sit on the frame of the
//! glasses.  Each one is read several times in a row with a short settle
//! delay (so a late echo from the previous ping cannot masquerade as the next
//! reading), the burst is reduced to its median, and the two medians are
//! fused by taking the minimum: the closest obstacle always wins.
//!
//! Readings outside the physical envelope are already normalised to the
//! sentinel by [`DistanceSample::new`], so a single stray short or long echo
//! can never drag the median.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use naviglass_hal::sim::ScriptedRangeSensor;
//! use naviglass_perception::fusion::{MedianSampler, SensorFusion};
//!
//! let left = ScriptedRangeSensor::new("left").then_cm(50.0).then_cm(52.0).then_cm(51.0);
//! let right = ScriptedRangeSensor::new("right"); // never echoes
//!
//! let mut fusion = SensorFusion::new(
//!     Box::new(left),
//!     Box::new(right),
//!     MedianSampler::new(3, Duration::ZERO),
//! );
//! let reading = fusion.measure().unwrap();
//! assert_eq!(reading.fused.cm(), 51.0);
//! ```

use std::time::Duration;

use naviglass_hal::RangeSensor;
use naviglass_types::{DistanceSample, NaviError};
use tracing::trace;

/// Median of `samples`.  Even-length input averages the two middle values;
/// empty input yields the sentinel.
pub fn median(samples: &[DistanceSample]) -> DistanceSample {
    if samples.is_empty() {
        return DistanceSample::OUT_OF_RANGE;
    }
    let mut sorted: Vec<f32> = samples.iter().map(|s| s.cm()).collect();
    sorted.sort_by(f32::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        DistanceSample::new(sorted[mid])
    } else {
        DistanceSample::new((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}

/// Closest-wins fusion of two filtered readings.
pub fn fuse(a: DistanceSample, b: DistanceSample) -> DistanceSample {
    if b < a { b } else { a }
}

// ────────────────────────────────────────────────────────────────────────────
// MedianSampler
// ────────────────────────────────────────────────────────────────────────────

/// Burst-and-median read policy for one sensor.
#[derive(Debug, Clone, Copy)]
pub struct MedianSampler {
    samples: usize,
    inter_sample_delay: Duration,
}

impl MedianSampler {
    /// `samples` is clamped to at least 1.
    pub fn new(samples: usize, inter_sample_delay: Duration) -> Self {
        Self {
            samples: samples.max(1),
            inter_sample_delay,
        }
    }

    /// Take a burst from `sensor` and return its median.  Blocks for
    /// `(samples − 1) × inter_sample_delay` plus the sensor's own read time.
    ///
    /// # Errors
    ///
    /// Propagates the first driver fault; a missed echo is not a fault.
    pub fn read<S: RangeSensor + ?Sized>(&self, sensor: &mut S) -> Result<DistanceSample, NaviError> {
        let mut burst = Vec::with_capacity(self.samples);
        for i in 0..self.samples {
            if i > 0 && !self.inter_sample_delay.is_zero() {
                std::thread::sleep(self.inter_sample_delay);
            }
            burst.push(sensor.sample()?);
        }
        let filtered = median(&burst);
        trace!(sensor = sensor.id(), ?burst, median = filtered.cm(), "ranging burst");
        Ok(filtered)
    }
}

impl Default for MedianSampler {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(40))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SensorFusion
// ────────────────────────────────────────────────────────────────────────────

/// Result of one fused measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusedReading {
    pub left: DistanceSample,
    pub right: DistanceSample,
    /// `min(left, right)`.
    pub fused: DistanceSample,
}

/// Owns both temple sensors and produces one fused distance per call.
pub struct SensorFusion {
    left: Box<dyn RangeSensor>,
    right: Box<dyn RangeSensor>,
    sampler: MedianSampler,
}

impl SensorFusion {
    pub fn new(left: Box<dyn RangeSensor>, right: Box<dyn RangeSensor>, sampler: MedianSampler) -> Self {
        Self {
            left,
            right,
            sampler,
        }
    }

    /// Read both sensors (left first, then right) and fuse the medians.
    ///
    /// The sensors are pinged one after the other so their bursts cannot
    /// cross-talk.
    ///
    /// # Errors
    ///
    /// Returns the first [`NaviError::HardwareFault`] raised by either driver.
    pub fn measure(&mut self) -> Result<FusedReading, NaviError> {
        let left = self.sampler.read(self.left.as_mut())?;
        let right = self.sampler.read(self.right.as_mut())?;
        Ok(FusedReading {
            left,
            right,
            fused: fuse(left, right),
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use naviglass_hal::RangeBoard;
    use naviglass_hal::sim::ScriptedRangeSensor;

    fn cm(values: &[f32]) -> Vec<DistanceSample> {
        values.iter().copied().map(DistanceSample::new).collect()
    }

    fn instant_sampler() -> MedianSampler {
        MedianSampler::new(3, Duration::ZERO)
    }

    #[test]
    fn median_of_three() {
        assert_eq!(median(&cm(&[50.0, 52.0, 51.0])).cm(), 51.0);
    }

    #[test]
    fn all_sentinel_burst_stays_sentinel() {
        assert!(median(&cm(&[999.0, 999.0, 999.0])).is_out_of_range());
    }

    #[test]
    fn single_stray_reading_cannot_dominate() {
        // 1 cm is outside the envelope and becomes the sentinel, which sorts
        // high instead of low.
        assert_eq!(median(&cm(&[1.0, 80.0, 82.0])).cm(), 82.0);
        assert_eq!(median(&cm(&[80.0, 600.0, 81.0])).cm(), 81.0);
    }

    #[test]
    fn median_of_even_burst_averages_middle_pair() {
        assert_eq!(median(&cm(&[10.0, 20.0, 30.0, 40.0])).cm(), 25.0);
    }

    #[test]
    fn median_of_empty_is_sentinel() {
        assert!(median(&[]).is_out_of_range());
    }

    #[test]
    fn fuse_takes_closest() {
        let near = DistanceSample::new(40.0);
        let far = DistanceSample::new(300.0);
        assert_eq!(fuse(near, far), near);
        assert_eq!(fuse(far, near), near);
        assert_eq!(fuse(DistanceSample::OUT_OF_RANGE, far), far);
    }

    #[test]
    fn sampler_reads_configured_burst() {
        let mut sensor = ScriptedRangeSensor::new("left")
            .then_cm(70.0)
            .then_cm(90.0)
            .then_cm(80.0)
            .then_cm(5.0);
        let reading = instant_sampler().read(&mut sensor).unwrap();
        assert_eq!(reading.cm(), 80.0);
        // The fourth scripted value was not consumed.
        assert_eq!(sensor.sample().unwrap().cm(), 5.0);
    }

    #[test]
    fn sampler_clamps_zero_samples_to_one() {
        let mut sensor = ScriptedRangeSensor::new("left").then_cm(33.0);
        let reading = MedianSampler::new(0, Duration::ZERO).read(&mut sensor).unwrap();
        assert_eq!(reading.cm(), 33.0);
    }

    #[test]
    fn measure_fuses_both_sensors() {
        let left = ScriptedRangeSensor::new("left").repeat_cm(150.0, 3);
        let right = ScriptedRangeSensor::new("right").repeat_cm(90.0, 3);
        let mut fusion = SensorFusion::new(Box::new(left), Box::new(right), instant_sampler());
        let reading = fusion.measure().unwrap();
        assert_eq!(reading.left.cm(), 150.0);
        assert_eq!(reading.right.cm(), 90.0);
        assert_eq!(reading.fused.cm(), 90.0);
    }

    #[test]
    fn measure_propagates_driver_fault() {
        let left = ScriptedRangeSensor::new("left").then_cm(50.0).then_fault("no power");
        let right = ScriptedRangeSensor::new("right");
        let mut fusion = SensorFusion::new(Box::new(left), Box::new(right), instant_sampler());
        assert!(matches!(fusion.measure(), Err(NaviError::HardwareFault { .. })));
    }

    #[test]
    fn inter_sample_delay_is_applied_between_samples() {
        let mut sensor = ScriptedRangeSensor::new("left").repeat_cm(60.0, 3);
        let sampler = MedianSampler::new(3, Duration::from_millis(15));
        let started = std::time::Instant::now();
        sampler.read(&mut sensor).unwrap();
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn one_board_reading_cannot_fill_a_burst() {
        let board = RangeBoard::new(["left", "right"]);
        board.publish("left", 30.0).unwrap();
        let mut sensor = board.sensor("left", Duration::from_millis(50));
        let reading = MedianSampler::new(3, Duration::from_millis(40)).read(&mut sensor).unwrap();
        assert!(reading.is_out_of_range(), "stray echo decided the median: {}", reading.cm());
    }

    #[test]
    fn steady_board_stream_fills_a_burst() {
        let board = RangeBoard::new(["left", "right"]);
        let publisher = board.clone();
        let writer = std::thread::spawn(move || {
            for cm in [61.0, 60.0, 62.0] {
                publisher.publish("left", cm).unwrap();
                std::thread::sleep(Duration::from_millis(25));
            }
        });
        let mut sensor = board.sensor("left", Duration::from_secs(1));
        let reading = MedianSampler::new(3, Duration::ZERO).read(&mut sensor).unwrap();
        writer.join().unwrap();
        assert!((60.0..=62.0).contains(&reading.cm()), "got {}", reading.cm());
    }
}
