use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use steady_core::{Indicator, MotionTracker, RecorderState, TrackerResult};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LiveStatus {
    pub timestamp: f64,
    pub state: RecorderState,
    pub session_id: Option<String>,
    pub buffered_samples: usize,
    pub rejected_samples: u64,
    // Latest reading
    pub magnitude: Option<f64>,
    pub magnitude_display: Option<String>,
    pub steady: Option<bool>,
    pub indicator: Indicator,
    pub uptime_seconds: u64,
}

impl LiveStatus {
    pub fn capture(
        tracker: &MotionTracker,
        session_id: Option<String>,
        rejected_samples: u64,
        uptime_seconds: u64,
    ) -> TrackerResult<Self> {
        let latest = tracker.latest()?;

        Ok(Self {
            timestamp: current_timestamp(),
            state: tracker.state()?,
            session_id,
            buffered_samples: tracker.buffered_len()?,
            rejected_samples,
            magnitude: latest.map(|r| r.magnitude),
            magnitude_display: latest.map(|r| r.display_magnitude()),
            steady: latest.map(|r| r.steady),
            indicator: tracker.indicator()?,
            uptime_seconds,
        })
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

pub fn current_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use steady_core::{Sample, TrackerConfig};

    #[test]
    fn test_capture_while_recording() {
        let tracker = MotionTracker::new(TrackerConfig::default()).unwrap();
        let meta = tracker.start().unwrap();
        tracker.on_sample(Sample::new(0.0, 0.0, 1.5, 0)).unwrap();

        let status = LiveStatus::capture(&tracker, Some(meta.session_id.clone()), 2, 7).unwrap();
        assert_eq!(status.state, RecorderState::Recording);
        assert_eq!(status.buffered_samples, 1);
        assert_eq!(status.magnitude_display.as_deref(), Some("1.50"));
        assert_eq!(status.steady, Some(false));
        assert_eq!(status.indicator, Indicator::Alert);
        assert_eq!(status.session_id, Some(meta.session_id));
    }

    #[test]
    fn test_save_writes_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("live_status.json");
        let tracker = MotionTracker::new(TrackerConfig::default()).unwrap();

        LiveStatus::capture(&tracker, None, 0, 0)
            .unwrap()
            .save(&path)
            .unwrap();

        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["state"], "Idle");
        assert_eq!(json["indicator"], "Ok");
        assert!(json["magnitude"].is_null());
    }
}
