use chrono::Utc;
use std::f64::consts::PI;
use steady_core::Sample;

/// Every `JOLT_PERIOD` ticks the mock device gets bumped
const JOLT_PERIOD: u64 = 25;
const JOLT_Z: f64 = 1.45;

/// Stand-in accelerometer: a device resting flat (≈1 g on z) with slight
/// hand tremor and a periodic jolt.
pub struct MockAccelerometer {
    tick: u64,
    interval_secs: f64,
}

impl MockAccelerometer {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            tick: 0,
            interval_secs: interval_ms as f64 / 1000.0,
        }
    }

    /// Reading for the current tick, without a wall-clock timestamp
    fn reading(&self) -> (f64, f64, f64) {
        let t = self.tick as f64 * self.interval_secs;

        if self.tick > 0 && self.tick % JOLT_PERIOD == 0 {
            return (0.05, -0.04, JOLT_Z);
        }

        (
            (t * 2.0 * PI).sin() * 0.03,
            (t * 2.0 * PI).cos() * 0.02,
            1.0 + (t * PI).sin() * 0.04,
        )
    }

    pub fn next_sample(&mut self) -> Sample {
        let (x, y, z) = self.reading();
        self.tick += 1;
        Sample::new(x, y, z, Utc::now().timestamp_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use steady_core::{classify, DEFAULT_TOLERANCE};

    #[test]
    fn test_mock_rests_near_one_g() {
        let mut accel = MockAccelerometer::new(200);
        let steady = (0..JOLT_PERIOD)
            .map(|_| classify(accel.next_sample(), DEFAULT_TOLERANCE).unwrap())
            .filter(|r| r.steady)
            .count();
        assert_eq!(steady as u64, JOLT_PERIOD);
    }

    #[test]
    fn test_mock_jolt_is_unsteady() {
        let mut accel = MockAccelerometer::new(200);
        for _ in 0..JOLT_PERIOD {
            accel.next_sample();
        }
        let jolt = classify(accel.next_sample(), DEFAULT_TOLERANCE).unwrap();
        assert!(!jolt.steady);
        approx::assert_relative_eq!(jolt.magnitude, 1.45, epsilon = 0.01);
    }

    #[test]
    fn test_timestamps_do_not_go_backwards() {
        let mut accel = MockAccelerometer::new(200);
        let a = accel.next_sample();
        let b = accel.next_sample();
        assert!(b.timestamp >= a.timestamp);
    }
}
