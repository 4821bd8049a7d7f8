use crate::classifier::is_steady;
use crate::error::{MotionTrackerError, TrackerResult};
use crate::reducer::ReducedSeries;
use crate::sensor_receiver::Sample;
use crate::session::{SealedSession, SessionMetadata};
use chrono::Utc;
use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

/// Where an export ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReceipt {
    pub location: String,
    pub records: usize,
    pub bytes: usize,
}

/// Durable destination for finished sessions.
///
/// A failed export must leave the caller's session usable, which the
/// borrowed `&SealedSession` guarantees.
pub trait ExportSink {
    fn export(&self, session: &SealedSession, destination: &str) -> TrackerResult<ExportReceipt>;
}

/// Serialize the raw records, refusing empty sessions
pub fn session_to_json_bytes(session: &SealedSession) -> TrackerResult<Vec<u8>> {
    session.ensure_non_empty()?;
    Ok(serde_json::to_vec(session.samples())?)
}

/// Writes `sensorData<millis>.json` into an existing directory
#[derive(Debug, Clone, Default)]
pub struct FileSink;

impl FileSink {
    pub fn new() -> Self {
        FileSink
    }

    pub fn file_name(millis: i64) -> String {
        format!("sensorData{}.json", millis)
    }
}

impl ExportSink for FileSink {
    fn export(&self, session: &SealedSession, destination: &str) -> TrackerResult<ExportReceipt> {
        let bytes = session_to_json_bytes(session)?;

        let dir = Path::new(destination);
        if !dir.is_dir() {
            return Err(MotionTrackerError::Export(format!(
                "destination {} is not an accessible directory",
                destination
            )));
        }

        let path = dir.join(Self::file_name(Utc::now().timestamp_millis()));
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| MotionTrackerError::Export(format!("{}: {}", path.display(), e)))?;
        file.write_all(&bytes)
            .and_then(|_| file.sync_all())
            .map_err(|e| MotionTrackerError::Export(format!("{}: {}", path.display(), e)))?;

        log::info!(
            "Exported {} samples of {} to {}",
            session.len(),
            session.session_id(),
            path.display()
        );

        Ok(ExportReceipt {
            location: path.display().to_string(),
            records: session.len(),
            bytes: bytes.len(),
        })
    }
}

/// Load an exported session (`.json` or `.json.gz`)
pub fn load_session(path: &Path) -> TrackerResult<SealedSession> {
    let file = File::open(path)
        .map_err(|e| MotionTrackerError::InvalidInput(format!("{}: {}", path.display(), e)))?;

    let mut reader: Box<dyn Read> = if path.extension().map_or(false, |ext| ext == "gz") {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(BufReader::new(file))
    };

    let mut contents = String::new();
    reader
        .read_to_string(&mut contents)
        .map_err(|e| MotionTrackerError::InvalidInput(format!("{}: {}", path.display(), e)))?;

    let samples: Vec<Sample> = serde_json::from_str(&contents)?;
    Ok(SealedSession::from_samples(samples))
}

/// Session statistics for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub sample_count: usize,
    pub duration_seconds: f64,
    pub steady_count: usize,
    pub unsteady_count: usize,
    pub peak_magnitude: f64,
}

impl SessionStats {
    pub fn from_session(session: &SealedSession, tolerance: f64) -> TrackerResult<Self> {
        session.ensure_non_empty()?;

        let samples = session.samples();
        let magnitudes: Vec<f64> = samples.iter().map(Sample::magnitude).collect();
        let steady_count = magnitudes
            .iter()
            .filter(|m| is_steady(**m, tolerance))
            .count();
        let duration_ms =
            i128::from(samples[samples.len() - 1].timestamp) - i128::from(samples[0].timestamp);

        Ok(SessionStats {
            sample_count: samples.len(),
            duration_seconds: duration_ms as f64 / 1000.0,
            steady_count,
            unsteady_count: samples.len() - steady_count,
            peak_magnitude: magnitudes.iter().copied().fold(f64::MIN, f64::max),
        })
    }
}

/// Chart-ready output written next to the raw export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesReport {
    pub metadata: SessionMetadata,
    pub stats: SessionStats,
    pub series: ReducedSeries,
}

impl SeriesReport {
    pub fn to_json(&self) -> TrackerResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write as `series_<session id>.json` under `dir`
    pub fn save(&self, dir: &Path) -> TrackerResult<PathBuf> {
        let path = dir.join(format!("series_{}.json", self.metadata.session_id));
        fs::write(&path, self.to_json()?)
            .map_err(|e| MotionTrackerError::Export(format!("{}: {}", path.display(), e)))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reducer::reduce;
    use approx::assert_relative_eq;
    use flate2::write::GzEncoder;
    use flate2::Compression;

    fn recorded() -> SealedSession {
        SealedSession::from_samples(vec![
            Sample::new(0.0, 0.0, 1.0, 1_000),
            Sample::new(0.0, 0.0, 1.5, 1_200),
            Sample::new(0.1, 0.0, 0.99, 2_400),
        ])
    }

    #[test]
    fn test_export_writes_record_array() {
        let dir = tempfile::tempdir().unwrap();
        let session = recorded();

        let receipt = FileSink::new()
            .export(&session, dir.path().to_str().unwrap())
            .unwrap();
        assert_eq!(receipt.records, 3);

        let path = PathBuf::from(&receipt.location);
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("sensorData") && name.ends_with(".json"));

        let raw: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        let records = raw.as_array().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1]["acceleration"]["z"], 1.5);
        assert_eq!(records[2]["timestamp"], 2_400);
    }

    #[test]
    fn test_export_round_trips_through_load() {
        let dir = tempfile::tempdir().unwrap();
        let session = recorded();

        let receipt = FileSink::new()
            .export(&session, dir.path().to_str().unwrap())
            .unwrap();
        let loaded = load_session(Path::new(&receipt.location)).unwrap();
        assert_eq!(loaded.samples(), session.samples());
    }

    #[test]
    fn test_export_to_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let session = recorded();

        let err = FileSink::new()
            .export(&session, missing.to_str().unwrap())
            .unwrap_err();
        assert!(matches!(err, MotionTrackerError::Export(_)));
        assert_eq!(session.len(), 3);
    }

    #[test]
    fn test_export_empty_session_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let empty = SealedSession::from_samples(Vec::new());

        let err = FileSink::new()
            .export(&empty, dir.path().to_str().unwrap())
            .unwrap_err();
        assert_eq!(err, MotionTrackerError::EmptySession);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_load_gzipped_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sensorData1.json.gz");
        let bytes = session_to_json_bytes(&recorded()).unwrap();

        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        encoder.write_all(&bytes).unwrap();
        encoder.finish().unwrap();

        let loaded = load_session(&path).unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.session_id(), "session_1000");
    }

    #[test]
    fn test_load_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{not json").unwrap();

        assert!(matches!(
            load_session(&path),
            Err(MotionTrackerError::Serialization(_))
        ));
    }

    #[test]
    fn test_session_stats() {
        let stats = SessionStats::from_session(&recorded(), 0.15).unwrap();

        assert_eq!(stats.sample_count, 3);
        assert_relative_eq!(stats.duration_seconds, 1.4);
        assert_eq!(stats.steady_count, 2);
        assert_eq!(stats.unsteady_count, 1);
        assert_relative_eq!(stats.peak_magnitude, 1.5);
    }

    #[test]
    fn test_stats_with_extreme_timestamps() {
        let session = SealedSession::from_samples(vec![
            Sample::new(0.0, 0.0, 1.0, i64::MIN),
            Sample::new(0.0, 0.0, 1.0, i64::MAX),
        ]);
        let stats = SessionStats::from_session(&session, 0.15).unwrap();

        assert_relative_eq!(stats.duration_seconds, u64::MAX as f64 / 1000.0);
        assert_eq!(stats.steady_count, 2);
    }

    #[test]
    fn test_series_report_save() {
        let dir = tempfile::tempdir().unwrap();
        let session = recorded();
        let report = SeriesReport {
            metadata: session.metadata().clone(),
            stats: SessionStats::from_session(&session, 0.15).unwrap(),
            series: reduce(&session).unwrap(),
        };

        let path = report.save(dir.path()).unwrap();
        assert!(path.ends_with("series_session_1000.json"));

        let json = fs::read_to_string(path).unwrap();
        assert!(json.contains("\"labels\""));
        assert!(json.contains("session_1000"));
    }
}
