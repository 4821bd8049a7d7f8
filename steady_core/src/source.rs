//! Sample sources: push-style producers that call back with one sample per
//! tick until unsubscribed.

use crate::sensor_receiver::Sample;
use crossbeam::channel::{bounded, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Default accelerometer update interval
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(200);

/// Callback invoked for every delivered sample
pub type SampleCallback = Box<dyn FnMut(Sample) + Send + 'static>;

/// Producer of samples at a roughly fixed interval
pub trait SampleSource {
    fn subscribe(self, callback: SampleCallback) -> Subscription;
}

/// Handle to a running delivery thread.
///
/// Dropping the handle unsubscribes.
pub struct Subscription {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<u64>>,
    delivered: u64,
}

impl Subscription {
    fn spawn<F>(interval: Duration, mut next: F, mut callback: SampleCallback) -> Self
    where
        F: FnMut() -> Option<Sample> + Send + 'static,
    {
        let (stop_tx, stop_rx) = bounded::<()>(1);

        let handle = thread::spawn(move || {
            let mut delivered = 0u64;
            loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {}
                    // Explicit stop or the handle went away
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }

                match next() {
                    Some(sample) => {
                        callback(sample);
                        delivered += 1;
                    }
                    None => break,
                }
            }
            log::debug!("Sample source stopped after {} samples", delivered);
            delivered
        });

        Subscription {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
            delivered: 0,
        }
    }

    /// Stop delivery. Idempotent; once this returns no callback is running
    /// or will run again.
    pub fn unsubscribe(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.try_send(());
        }
        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(count) => self.delivered = count,
                Err(_) => log::warn!("Sample source thread panicked"),
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Samples delivered; known once unsubscribed
    pub fn delivered(&self) -> u64 {
        self.delivered
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Calls a generator every interval; the generator returning `None` ends
/// delivery.
pub struct IntervalSource<F> {
    interval: Duration,
    generator: F,
}

impl<F> IntervalSource<F>
where
    F: FnMut() -> Option<Sample> + Send + 'static,
{
    pub fn new(interval: Duration, generator: F) -> Self {
        Self {
            interval,
            generator,
        }
    }
}

impl<F> SampleSource for IntervalSource<F>
where
    F: FnMut() -> Option<Sample> + Send + 'static,
{
    fn subscribe(self, callback: SampleCallback) -> Subscription {
        Subscription::spawn(self.interval, self.generator, callback)
    }
}

/// Re-emits a recorded sample list in order, keeping the recorded timestamps
pub struct ReplaySource {
    interval: Duration,
    samples: Vec<Sample>,
}

impl ReplaySource {
    pub fn new(interval: Duration, samples: Vec<Sample>) -> Self {
        Self { interval, samples }
    }
}

impl SampleSource for ReplaySource {
    fn subscribe(self, callback: SampleCallback) -> Subscription {
        let mut samples = self.samples.into_iter();
        Subscription::spawn(self.interval, move || samples.next(), callback)
    }
}
