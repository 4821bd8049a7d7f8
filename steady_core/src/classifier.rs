use crate::error::{MotionTrackerError, TrackerResult};
use crate::sensor_receiver::Sample;
use serde::{Deserialize, Serialize};

/// Allowed deviation from 1 g before motion counts as unsteady
pub const DEFAULT_TOLERANCE: f64 = 0.15;

/// Resting magnitude: gravity dominates a still device
const REST_MAGNITUDE: f64 = 1.0;

/// Sample with its derived magnitude and steadiness flag
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedSample {
    pub sample: Sample,
    pub magnitude: f64,
    pub steady: bool,
}

impl ClassifiedSample {
    /// Magnitude rounded to two decimals, as shown on the live readout.
    ///
    /// Exact ties round up (1.125 shows as "1.13"); `{:.2}` alone would
    /// round them to even.
    pub fn display_magnitude(&self) -> String {
        format!("{:.2}", round_half_up_at_cents(self.magnitude))
    }
}

/// Nudge a non-negative value sitting exactly on a half-cent one ulp upward
/// so two-decimal formatting rounds it up.
fn round_half_up_at_cents(value: f64) -> f64 {
    if !value.is_finite() || value <= 0.0 {
        return value;
    }

    // Fixed-precision formatting prints the exact binary value
    let exact = format!("{:.64}", value);
    let is_tie = exact
        .split_once('.')
        .map_or(false, |(_, frac)| {
            frac.as_bytes().get(2) == Some(&b'5') && frac.bytes().skip(3).all(|b| b == b'0')
        });

    if is_tie {
        f64::from_bits(value.to_bits() + 1)
    } else {
        value
    }
}

/// Live readout colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Indicator {
    Ok,
    Alert,
}

impl Indicator {
    /// Only unsteady motion during a recording raises an alert.
    pub fn for_reading(recording: bool, steady: bool) -> Self {
        if !recording || steady {
            Indicator::Ok
        } else {
            Indicator::Alert
        }
    }
}

/// Steady iff `1 - tolerance < magnitude < 1 + tolerance`.
///
/// Both bounds are strict, so a magnitude sitting exactly on the band edge
/// is unsteady.
pub fn is_steady(magnitude: f64, tolerance: f64) -> bool {
    REST_MAGNITUDE - tolerance < magnitude && magnitude < REST_MAGNITUDE + tolerance
}

/// Classify one sample against the tolerance band.
///
/// Rejects samples with a NaN or infinite axis instead of producing a NaN
/// magnitude.
pub fn classify(sample: Sample, tolerance: f64) -> TrackerResult<ClassifiedSample> {
    if !sample.acceleration.is_finite() {
        return Err(MotionTrackerError::InvalidInput(format!(
            "non-finite acceleration at {}: ({}, {}, {})",
            sample.timestamp, sample.acceleration.x, sample.acceleration.y, sample.acceleration.z
        )));
    }
    if !tolerance.is_finite() || tolerance < 0.0 {
        return Err(MotionTrackerError::InvalidInput(format!(
            "tolerance must be finite and non-negative, got {}",
            tolerance
        )));
    }

    let magnitude = sample.magnitude();
    Ok(ClassifiedSample {
        sample,
        magnitude,
        steady: is_steady(magnitude, tolerance),
    })
}
