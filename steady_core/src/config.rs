use crate::classifier::DEFAULT_TOLERANCE;
use crate::error::{MotionTrackerError, TrackerResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Tracker configuration; every field has a default so partial files load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Allowed deviation from 1 g for steady motion
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// Accelerometer update interval
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,
    /// Where exports and status files go
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Live status refresh period
    #[serde(default = "default_status_interval_secs")]
    pub status_interval_secs: u64,
}

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}

fn default_sample_interval_ms() -> u64 {
    200
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("steady_sessions")
}

fn default_status_interval_secs() -> u64 {
    2
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            tolerance: default_tolerance(),
            sample_interval_ms: default_sample_interval_ms(),
            output_dir: default_output_dir(),
            status_interval_secs: default_status_interval_secs(),
        }
    }
}

impl TrackerConfig {
    pub fn from_json_file(path: &Path) -> TrackerResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            MotionTrackerError::InvalidConfig(format!("{}: {}", path.display(), e))
        })?;
        let config: TrackerConfig = serde_json::from_str(&raw)
            .map_err(|e| MotionTrackerError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> TrackerResult<()> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(MotionTrackerError::InvalidConfig(format!(
                "tolerance must be finite and non-negative, got {}",
                self.tolerance
            )));
        }
        if self.sample_interval_ms == 0 {
            return Err(MotionTrackerError::InvalidConfig(
                "sample_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.status_interval_secs == 0 {
            return Err(MotionTrackerError::InvalidConfig(
                "status_interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }
}
