// Steady Motion core
// Accelerometer classification, session recording and chart series reduction

pub mod classifier;
pub mod config;
pub mod error;
pub mod reducer;
pub mod sensor_receiver;
pub mod session;
pub mod source;
pub mod storage;
pub mod tracker;

pub use classifier::{classify, ClassifiedSample, Indicator, DEFAULT_TOLERANCE};
pub use config::TrackerConfig;
pub use error::{MotionTrackerError, TrackerResult};
pub use reducer::{reduce, ReducedPoint, ReducedSeries};
pub use sensor_receiver::{Acceleration, Sample};
pub use session::{Recorder, RecorderState, SealedSession, SessionMetadata};
pub use source::{IntervalSource, ReplaySource, SampleSource, Subscription};
pub use storage::{ExportReceipt, ExportSink, FileSink, SeriesReport, SessionStats};
pub use tracker::MotionTracker;
