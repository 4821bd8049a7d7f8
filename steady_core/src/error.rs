use thiserror::Error;

/// Steady-motion error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MotionTrackerError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Session already recording")]
    AlreadyRecording,

    #[error("Session not recording")]
    NotRecording,

    #[error("Session has no samples")]
    EmptySession,

    #[error("Export failed: {0}")]
    Export(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MotionTrackerError {
    /// Everything except a poisoned lock leaves the tracker usable.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, MotionTrackerError::Internal(_))
    }
}

impl From<serde_json::Error> for MotionTrackerError {
    fn from(e: serde_json::Error) -> Self {
        MotionTrackerError::Serialization(e.to_string())
    }
}

/// Result type for tracker operations
pub type TrackerResult<T> = Result<T, MotionTrackerError>;
