use crate::classifier::{classify, ClassifiedSample, Indicator};
use crate::config::TrackerConfig;
use crate::error::{MotionTrackerError, TrackerResult};
use crate::reducer::{reduce, ReducedSeries};
use crate::sensor_receiver::Sample;
use crate::session::{Recorder, RecorderState, SealedSession, SessionMetadata};
use crate::storage::{ExportReceipt, ExportSink, SeriesReport, SessionStats};
use std::sync::{Mutex, MutexGuard};

/// Classifier, recorder and reducer wired together.
///
/// Shared between the sample source thread and the controlling code; every
/// method takes `&self`.
pub struct MotionTracker {
    config: TrackerConfig,
    recorder: Recorder,
    latest: Mutex<Option<ClassifiedSample>>,
    finished: Mutex<Option<SealedSession>>,
}

impl MotionTracker {
    pub fn new(config: TrackerConfig) -> TrackerResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            recorder: Recorder::new(),
            latest: Mutex::new(None),
            finished: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    fn latest_lock(&self) -> TrackerResult<MutexGuard<'_, Option<ClassifiedSample>>> {
        self.latest.lock().map_err(|_| {
            MotionTrackerError::Internal("Failed to acquire latest reading lock".to_string())
        })
    }

    fn finished_lock(&self) -> TrackerResult<MutexGuard<'_, Option<SealedSession>>> {
        self.finished.lock().map_err(|_| {
            MotionTrackerError::Internal("Failed to acquire finished session lock".to_string())
        })
    }

    /// Handle one delivery from the sample source.
    ///
    /// Non-finite samples are logged and rejected without touching the
    /// buffer or the live reading.
    pub fn on_sample(&self, sample: Sample) -> TrackerResult<ClassifiedSample> {
        let reading = match classify(sample, self.config.tolerance) {
            Ok(reading) => reading,
            Err(e) => {
                log::warn!("Rejected sample: {}", e);
                return Err(e);
            }
        };

        *self.latest_lock()? = Some(reading);

        if self.recorder.ingest(sample)? {
            log::debug!(
                "Buffered sample at {} (|a|={:.3}, steady={})",
                sample.timestamp,
                reading.magnitude,
                reading.steady
            );
        }

        Ok(reading)
    }

    /// Begin a new session; a previously finished one is dropped.
    pub fn start(&self) -> TrackerResult<SessionMetadata> {
        // Lock order: `finished`, then the recorder
        let mut finished = self.finished_lock()?;
        let metadata = self.recorder.start()?;
        *finished = None;
        Ok(metadata)
    }

    /// Seal the live session and keep it for viewing and export
    pub fn stop(&self) -> TrackerResult<SealedSession> {
        let mut finished = self.finished_lock()?;
        let sealed = self.recorder.stop()?;
        *finished = Some(sealed.clone());
        Ok(sealed)
    }

    /// Drop live and finished data ("retry")
    pub fn discard(&self) -> TrackerResult<usize> {
        let mut finished = self.finished_lock()?;
        let live = self.recorder.discard()?;
        let sealed = finished.take().map(|s| s.len()).unwrap_or(0);
        Ok(live + sealed)
    }

    pub fn state(&self) -> TrackerResult<RecorderState> {
        self.recorder.state()
    }

    pub fn buffered_len(&self) -> TrackerResult<usize> {
        self.recorder.buffered_len()
    }

    /// Most recent valid reading, recorded or not
    pub fn latest(&self) -> TrackerResult<Option<ClassifiedSample>> {
        Ok(*self.latest_lock()?)
    }

    /// Readout colour for the latest reading
    pub fn indicator(&self) -> TrackerResult<Indicator> {
        let recording = self.recorder.is_recording()?;
        let steady = self.latest()?.map(|r| r.steady).unwrap_or(true);
        Ok(Indicator::for_reading(recording, steady))
    }

    /// The last stopped session, until it is exported, discarded or replaced
    pub fn finished(&self) -> TrackerResult<Option<SealedSession>> {
        Ok(self.finished_lock()?.clone())
    }

    /// Results are viewable once a non-empty session is sealed and the
    /// recorder is idle.
    pub fn can_view_results(&self) -> TrackerResult<bool> {
        let finished = self.finished_lock()?;
        if self.recorder.is_recording()? {
            return Ok(false);
        }
        Ok(finished.as_ref().map_or(false, |s| !s.is_empty()))
    }

    pub fn reduce(&self, session: &SealedSession) -> TrackerResult<ReducedSeries> {
        reduce(session)
    }

    pub fn stats(&self, session: &SealedSession) -> TrackerResult<SessionStats> {
        SessionStats::from_session(session, self.config.tolerance)
    }

    /// Reduced series plus statistics for one session
    pub fn report(&self, session: &SealedSession) -> TrackerResult<SeriesReport> {
        Ok(SeriesReport {
            metadata: session.metadata().clone(),
            stats: self.stats(session)?,
            series: self.reduce(session)?,
        })
    }

    /// Export the finished session.
    ///
    /// On success the session is released, as after a save the recorder
    /// starts over. On failure it stays available for another attempt.
    pub fn export<S: ExportSink>(&self, sink: &S, destination: &str) -> TrackerResult<ExportReceipt> {
        let mut finished = self.finished_lock()?;
        let session = finished.as_ref().ok_or(MotionTrackerError::EmptySession)?;
        // Sinks never see an empty session
        session.ensure_non_empty()?;

        match sink.export(session, destination) {
            Ok(receipt) => {
                *finished = None;
                Ok(receipt)
            }
            Err(e) => {
                log::warn!(
                    "Export of {} failed, session kept: {}",
                    session.session_id(),
                    e
                );
                Err(e)
            }
        }
    }
}
