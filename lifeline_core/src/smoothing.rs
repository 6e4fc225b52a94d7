//! Positional sample smoothing.
//!
//! Raw device fixes jitter, sometimes by tens of meters between consecutive
//! deliveries. The smoother stabilizes them with an accuracy-weighted
//! average over a bounded sliding window: a tight fix (small error radius)
//! pulls the estimate much harder than a poor one.

use lifeline_env::{GeoPoint, LocationSample};
use std::collections::VecDeque;

/// Maximum number of samples in the smoothing window.
const WINDOW_LEN: usize = 8;

/// Floor applied to reported accuracy before use as a weight denominator.
const MIN_ACCURACY_M: f64 = 1.0;

/// Accuracy at or below which the fix is considered calibrated.
const CALIBRATED_ACCURACY_M: f64 = 20.0;

/// A stabilized position derived from the current window.
///
/// Recomputed on every sample, never cached beyond the current value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothedPosition {
    pub lat: f64,
    pub lng: f64,
}

impl SmoothedPosition {
    /// The smoothed position as a point.
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }
}

/// Sliding-window smoother over raw location samples.
///
/// Holds at most [`WINDOW_LEN`] samples in arrival order; inserting into a
/// full window evicts the oldest. Each sample is weighted by the inverse of
/// its (clamped) accuracy, so the smoothed position is a convex combination
/// of the window contents.
#[derive(Debug, Default)]
pub struct SampleSmoother {
    window: VecDeque<LocationSample>,
    calibrated: bool,
}

impl SampleSmoother {
    /// Creates an empty, still-calibrating smoother.
    pub fn new() -> Self {
        Self {
            window: VecDeque::with_capacity(WINDOW_LEN),
            calibrated: false,
        }
    }

    /// Folds one sample into the window and returns the updated estimate.
    ///
    /// NaN coordinates pass through uncorrected; sensor-level sanitation is
    /// the caller's responsibility.
    pub fn add_sample(&mut self, sample: LocationSample) -> SmoothedPosition {
        if self.window.len() == WINDOW_LEN {
            self.window.pop_front();
        }
        self.window.push_back(sample);

        // Once a fix at or under the threshold is seen, the session is
        // calibrated for good; later degradation does not re-arm the flag.
        if sample.accuracy_m <= CALIBRATED_ACCURACY_M {
            self.calibrated = true;
        }

        let mut weight_sum = 0.0;
        let mut lat = 0.0;
        let mut lng = 0.0;
        for s in &self.window {
            let w = 1.0 / s.accuracy_m.max(MIN_ACCURACY_M);
            lat += s.position.lat * w;
            lng += s.position.lng * w;
            weight_sum += w;
        }

        SmoothedPosition {
            lat: lat / weight_sum,
            lng: lng / weight_sum,
        }
    }

    /// `true` until the first sample with accuracy at or under 20 m.
    pub fn is_calibrating(&self) -> bool {
        !self.calibrated
    }

    /// Number of samples currently in the window.
    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    /// Drops all samples and re-arms the calibration flag.
    pub fn clear(&mut self) {
        self.window.clear();
        self.calibrated = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample(lat: f64, lng: f64, accuracy_m: f64) -> LocationSample {
        LocationSample::new(GeoPoint::new(lat, lng), accuracy_m)
    }

    #[test]
    fn test_window_never_exceeds_cap() {
        let mut smoother = SampleSmoother::new();
        for i in 0..20 {
            smoother.add_sample(sample(10.0 + i as f64 * 0.001, 20.0, 15.0));
            assert!(smoother.window_len() <= WINDOW_LEN);
        }
        assert_eq!(smoother.window_len(), WINDOW_LEN);
    }

    #[test]
    fn test_oldest_sample_evicted_first() {
        let mut smoother = SampleSmoother::new();
        // Fill the window with a far-off point, then push it out entirely.
        for _ in 0..WINDOW_LEN {
            smoother.add_sample(sample(50.0, 50.0, 10.0));
        }
        let mut last = SmoothedPosition { lat: 0.0, lng: 0.0 };
        for _ in 0..WINDOW_LEN {
            last = smoother.add_sample(sample(10.0, 20.0, 10.0));
        }
        assert_relative_eq!(last.lat, 10.0, epsilon = 1e-9);
        assert_relative_eq!(last.lng, 20.0, epsilon = 1e-9);
    }

    #[test]
    fn test_estimate_is_convex_combination() {
        let mut smoother = SampleSmoother::new();
        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        for (lat, acc) in [(10.0, 50.0), (10.002, 8.0), (10.004, 120.0), (10.001, 3.0)] {
            min_lat = min_lat.min(lat);
            max_lat = max_lat.max(lat);
            let smoothed = smoother.add_sample(sample(lat, 20.0, acc));
            assert!(smoothed.lat >= min_lat && smoothed.lat <= max_lat);
        }
    }

    #[test]
    fn test_accurate_sample_dominates() {
        // acc 50 vs acc 10 is a 1:5 weight ratio, so the estimate must land
        // strictly closer to the second sample than the midpoint.
        let mut smoother = SampleSmoother::new();
        smoother.add_sample(sample(10.0, 20.0, 50.0));
        let smoothed = smoother.add_sample(sample(10.001, 20.001, 10.0));

        let midpoint_lat = 10.0005;
        assert!(smoothed.lat > midpoint_lat);
        assert_relative_eq!(smoothed.lat, (10.0 / 50.0 + 10.001 / 10.0) / (1.0 / 50.0 + 1.0 / 10.0), epsilon = 1e-12);
    }

    #[test]
    fn test_near_zero_accuracy_clamped() {
        let mut smoother = SampleSmoother::new();
        smoother.add_sample(sample(10.0, 20.0, 0.0));
        let smoothed = smoother.add_sample(sample(12.0, 22.0, 0.5));
        // Both clamp to weight 1, so the estimate is the plain average.
        assert_relative_eq!(smoothed.lat, 11.0, epsilon = 1e-9);
        assert_relative_eq!(smoothed.lng, 21.0, epsilon = 1e-9);
    }

    #[test]
    fn test_calibration_flag_latches() {
        let mut smoother = SampleSmoother::new();
        assert!(smoother.is_calibrating());

        smoother.add_sample(sample(10.0, 20.0, 45.0));
        assert!(smoother.is_calibrating());

        smoother.add_sample(sample(10.0, 20.0, 20.0));
        assert!(!smoother.is_calibrating());

        // Accuracy degrading again does not re-arm the flag.
        smoother.add_sample(sample(10.0, 20.0, 90.0));
        assert!(!smoother.is_calibrating());
    }

    #[test]
    fn test_clear_resets_window_and_flag() {
        let mut smoother = SampleSmoother::new();
        smoother.add_sample(sample(10.0, 20.0, 5.0));
        assert!(!smoother.is_calibrating());

        smoother.clear();
        assert_eq!(smoother.window_len(), 0);
        assert!(smoother.is_calibrating());
    }
}
