use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Raw accelerometer axes, in g
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Acceleration {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Acceleration {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn as_vector(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    /// Euclidean norm of the three axes
    pub fn magnitude(&self) -> f64 {
        self.as_vector().norm()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Accelerometer sample as delivered by the sample source.
///
/// Serializes as `{"acceleration":{"x":..,"y":..,"z":..},"timestamp":..}`,
/// which is also the persisted export record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub acceleration: Acceleration,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl Sample {
    pub fn new(x: f64, y: f64, z: f64, timestamp: i64) -> Self {
        Self {
            acceleration: Acceleration::new(x, y, z),
            timestamp,
        }
    }

    pub fn magnitude(&self) -> f64 {
        self.acceleration.magnitude()
    }
}
