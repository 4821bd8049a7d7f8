use crate::error::{MotionTrackerError, TrackerResult};
use crate::sensor_receiver::Sample;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};

/// Recorder state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecorderState {
    /// No session exists; incoming samples are dropped
    Idle,
    /// Exactly one live session is buffering samples
    Recording,
}

/// Session metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub session_id: String,
    pub start_time: String,
    /// Set when the session is sealed
    pub end_time: Option<String>,
}

impl SessionMetadata {
    fn starting_at(now: DateTime<Utc>) -> Self {
        SessionMetadata {
            session_id: format!("session_{}", now.timestamp_millis()),
            start_time: now.to_rfc3339(),
            end_time: None,
        }
    }
}

struct LiveSession {
    metadata: SessionMetadata,
    samples: Vec<Sample>,
}

/// A finished recording. Immutable; clones share the sample buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct SealedSession {
    metadata: SessionMetadata,
    samples: Arc<[Sample]>,
}

impl SealedSession {
    /// Rebuild a sealed session from persisted records, e.g. a previous export.
    pub fn from_samples(samples: Vec<Sample>) -> Self {
        let (start, end) = match (samples.first(), samples.last()) {
            (Some(first), Some(last)) => (first.timestamp, last.timestamp),
            _ => (0, 0),
        };
        let start_time = DateTime::<Utc>::from_timestamp_millis(start).unwrap_or_default();
        let end_time = DateTime::<Utc>::from_timestamp_millis(end).unwrap_or_default();

        SealedSession {
            metadata: SessionMetadata {
                session_id: format!("session_{}", start),
                start_time: start_time.to_rfc3339(),
                end_time: Some(end_time.to_rfc3339()),
            },
            samples: samples.into(),
        }
    }

    pub fn metadata(&self) -> &SessionMetadata {
        &self.metadata
    }

    pub fn session_id(&self) -> &str {
        &self.metadata.session_id
    }

    /// Samples in ingestion order
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Fails with `EmptySession` for a session that cannot be reduced or exported.
    pub fn ensure_non_empty(&self) -> TrackerResult<()> {
        if self.samples.is_empty() {
            Err(MotionTrackerError::EmptySession)
        } else {
            Ok(())
        }
    }
}

/// Two-state session controller.
///
/// State and buffer sit behind a single lock, so `stop()` hands out exactly
/// the samples ingested before it took the lock.
pub struct Recorder {
    live: Mutex<Option<LiveSession>>,
}

impl Recorder {
    /// Create a recorder in Idle state
    pub fn new() -> Self {
        Recorder {
            live: Mutex::new(None),
        }
    }

    fn lock(&self) -> TrackerResult<MutexGuard<'_, Option<LiveSession>>> {
        self.live.lock().map_err(|_| {
            MotionTrackerError::Internal("Failed to acquire session lock".to_string())
        })
    }

    /// Idle → Recording with a fresh, empty session
    pub fn start(&self) -> TrackerResult<SessionMetadata> {
        let mut live = self.lock()?;

        if live.is_some() {
            return Err(MotionTrackerError::AlreadyRecording);
        }

        let metadata = SessionMetadata::starting_at(Utc::now());
        log::info!("Session {} started", metadata.session_id);
        *live = Some(LiveSession {
            metadata: metadata.clone(),
            samples: Vec::with_capacity(500),
        });

        Ok(metadata)
    }

    /// Recording → Idle, sealing the live session
    pub fn stop(&self) -> TrackerResult<SealedSession> {
        let mut live = self.lock()?;

        let LiveSession {
            mut metadata,
            samples,
        } = live.take().ok_or(MotionTrackerError::NotRecording)?;
        metadata.end_time = Some(Utc::now().to_rfc3339());

        log::info!(
            "Session {} stopped with {} samples",
            metadata.session_id,
            samples.len()
        );

        Ok(SealedSession {
            metadata,
            samples: samples.into(),
        })
    }

    /// Append a sample to the live session.
    ///
    /// Returns `false` when idle; the sample is dropped without error.
    pub fn ingest(&self, sample: Sample) -> TrackerResult<bool> {
        let mut live = self.lock()?;

        match live.as_mut() {
            Some(session) => {
                session.samples.push(sample);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Throw away any buffered data and return to Idle.
    ///
    /// Returns how many samples were dropped.
    pub fn discard(&self) -> TrackerResult<usize> {
        let mut live = self.lock()?;

        let dropped = live.take().map(|s| s.samples.len()).unwrap_or(0);
        if dropped > 0 {
            log::info!("Discarded {} buffered samples", dropped);
        }
        Ok(dropped)
    }

    /// Get current state
    pub fn state(&self) -> TrackerResult<RecorderState> {
        let live = self.lock()?;
        Ok(if live.is_some() {
            RecorderState::Recording
        } else {
            RecorderState::Idle
        })
    }

    /// Check if currently recording
    pub fn is_recording(&self) -> TrackerResult<bool> {
        Ok(self.state()? == RecorderState::Recording)
    }

    /// Number of samples in the live buffer (0 while idle)
    pub fn buffered_len(&self) -> TrackerResult<usize> {
        let live = self.lock()?;
        Ok(live.as_ref().map(|s| s.samples.len()).unwrap_or(0))
    }

    /// Metadata of the live session, if any
    pub fn metadata(&self) -> TrackerResult<Option<SessionMetadata>> {
        let live = self.lock()?;
        Ok(live.as_ref().map(|s| s.metadata.clone()))
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}
