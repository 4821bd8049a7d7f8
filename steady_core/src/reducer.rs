//! Chart-ready series from a sealed session.
//!
//! Every sample becomes one point, but only the first sample that falls in a
//! given whole second (counted from the session's first sample) carries a
//! label. At a 200 ms interval that is one axis label per second while the
//! value series keeps full density.

use crate::error::TrackerResult;
use crate::session::SealedSession;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One point of the reduced series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReducedPoint {
    /// Whole seconds since the first sample
    pub bucket_seconds: i64,
    pub magnitude: f64,
    /// First point of its second
    pub label_visible: bool,
}

impl ReducedPoint {
    pub fn label(&self) -> String {
        if self.label_visible {
            self.bucket_seconds.to_string()
        } else {
            String::new()
        }
    }
}

/// Index-aligned labels and magnitudes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReducedSeries {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl ReducedSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Labels that actually carry text
    pub fn visible_labels(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str).filter(|l| !l.is_empty())
    }
}

/// Whole seconds between `t0` and `t`, rounded toward negative infinity.
///
/// Timestamps before the first sample (a clock step backwards) land in
/// negative buckets rather than collapsing into bucket 0. Widened to i128 so
/// any pair of i64 timestamps has an in-range offset.
pub fn bucket_offset(t0: i64, t: i64) -> i64 {
    (i128::from(t) - i128::from(t0)).div_euclid(1000) as i64
}

/// Per-sample points with first-occurrence label visibility
pub fn reduce_points(session: &SealedSession) -> TrackerResult<Vec<ReducedPoint>> {
    session.ensure_non_empty()?;

    let samples = session.samples();
    let t0 = samples[0].timestamp;
    let mut seen: HashSet<i64> = HashSet::new();

    let points = samples
        .iter()
        .map(|sample| {
            let bucket_seconds = bucket_offset(t0, sample.timestamp);
            ReducedPoint {
                bucket_seconds,
                magnitude: sample.magnitude(),
                label_visible: seen.insert(bucket_seconds),
            }
        })
        .collect::<Vec<_>>();

    log::debug!(
        "Reduced {} samples into {} labelled seconds",
        points.len(),
        seen.len()
    );

    Ok(points)
}

/// Reduce a sealed session to the series a line chart consumes.
///
/// Fails with `EmptySession` when there is nothing to reduce.
pub fn reduce(session: &SealedSession) -> TrackerResult<ReducedSeries> {
    let points = reduce_points(session)?;

    Ok(ReducedSeries {
        labels: points.iter().map(ReducedPoint::label).collect(),
        values: points.iter().map(|p| p.magnitude).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MotionTrackerError;
    use crate::sensor_receiver::Sample;
    use approx::assert_relative_eq;

    fn session_at(offsets_ms: &[i64]) -> SealedSession {
        let t0 = 1_700_000_000_000;
        SealedSession::from_samples(
            offsets_ms
                .iter()
                .map(|dt| Sample::new(0.0, 0.0, 1.0, t0 + dt))
                .collect(),
        )
    }

    #[test]
    fn test_one_label_per_second() {
        let series = reduce(&session_at(&[0, 200, 400, 600, 800, 1000])).unwrap();
        assert_eq!(series.labels, vec!["0", "", "", "", "", "1"]);
        assert_eq!(series.values.len(), 6);
    }

    #[test]
    fn test_values_are_sample_magnitudes() {
        let session = SealedSession::from_samples(vec![
            Sample::new(0.0, 0.0, 1.0, 0),
            Sample::new(3.0, 4.0, 0.0, 200),
            Sample::new(0.0, 0.6, 0.8, 400),
        ]);
        let series = reduce(&session).unwrap();

        assert_eq!(series.len(), session.len());
        for (value, sample) in series.values.iter().zip(session.samples()) {
            assert_relative_eq!(*value, sample.magnitude());
        }
        assert_relative_eq!(series.values[1], 5.0);
    }

    #[test]
    fn test_gaps_skip_labels() {
        // Source stalled between 1.2s and 4.1s
        let series = reduce(&session_at(&[0, 600, 1200, 4100, 4300, 5000])).unwrap();
        assert_eq!(series.labels, vec!["0", "", "1", "4", "", "5"]);
    }

    #[test]
    fn test_revisited_second_stays_unlabelled() {
        // Out-of-order timestamp falls back into an already seen second
        let series = reduce(&session_at(&[0, 1100, 900, 1500])).unwrap();
        assert_eq!(series.labels, vec!["0", "1", "", ""]);
    }

    #[test]
    fn test_timestamp_before_start_gets_negative_bucket() {
        let points = reduce_points(&session_at(&[0, -300, 200])).unwrap();
        let buckets: Vec<i64> = points.iter().map(|p| p.bucket_seconds).collect();
        assert_eq!(buckets, vec![0, -1, 0]);
        assert_eq!(points[1].label(), "-1");
        assert!(!points[2].label_visible);
    }

    #[test]
    fn test_extreme_timestamps_do_not_overflow() {
        let session = SealedSession::from_samples(vec![
            Sample::new(0.0, 0.0, 1.0, i64::MIN),
            Sample::new(0.0, 0.0, 1.0, i64::MAX),
            Sample::new(0.0, 0.0, 1.0, i64::MIN + 999),
        ]);
        let points = reduce_points(&session).unwrap();

        let span = (i128::from(i64::MAX) - i128::from(i64::MIN)).div_euclid(1000) as i64;
        assert_eq!(points[0].bucket_seconds, 0);
        assert_eq!(points[1].bucket_seconds, span);
        assert_eq!(points[2].bucket_seconds, 0);
        assert_eq!(reduce(&session).unwrap().labels, vec!["0".to_string(), span.to_string(), String::new()]);
    }

    #[test]
    fn test_bucket_offset_floors() {
        assert_eq!(bucket_offset(1_000, 1_999), 0);
        assert_eq!(bucket_offset(1_000, 2_000), 1);
        assert_eq!(bucket_offset(1_000, 999), -1);
        assert_eq!(bucket_offset(i64::MAX, i64::MIN), (i128::from(i64::MIN) - i128::from(i64::MAX)).div_euclid(1000) as i64);
    }

    #[test]
    fn test_single_sample() {
        let series = reduce(&session_at(&[0])).unwrap();
        assert_eq!(series.labels, vec!["0"]);
        assert_eq!(series.visible_labels().count(), 1);
    }

    #[test]
    fn test_empty_session_fails() {
        let empty = SealedSession::from_samples(Vec::new());
        assert_eq!(reduce(&empty), Err(MotionTrackerError::EmptySession));
    }
}
