use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use steady_core::source::SampleCallback;
use steady_core::storage::load_session;
use steady_core::{
    FileSink, IntervalSource, MotionTracker, ReplaySource, SampleSource, SealedSession,
    SeriesReport, SessionStats, Subscription, TrackerConfig,
};
use tokio::time::{interval, sleep, Duration, Instant};

mod live_status;
mod sensors;

use live_status::LiveStatus;
use sensors::MockAccelerometer;

const EXPORT_ATTEMPTS: u32 = 3;

#[derive(Parser, Debug)]
#[command(name = "steady_tracker")]
#[command(about = "Record accelerometer sessions and flag unsteady motion", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record a session, then export it and write its chart series
    Record(RecordArgs),
    /// Print the chart series of an exported session
    Chart {
        /// Exported sensorData*.json[.gz] file
        file: PathBuf,

        /// Steadiness tolerance used for the statistics
        #[arg(long)]
        tolerance: Option<f64>,
    },
}

#[derive(Args, Debug)]
struct RecordArgs {
    /// Duration in seconds (0 = until Ctrl-C)
    #[arg(long, value_name = "SECONDS", default_value_t = 0)]
    duration: u64,

    /// Allowed deviation from 1 g before motion is unsteady
    #[arg(long)]
    tolerance: Option<f64>,

    /// Sample interval in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Output directory
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Replay an exported session instead of the mock accelerometer
    #[arg(long)]
    replay: Option<PathBuf>,

    /// JSON config file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,
}

impl RecordArgs {
    fn tracker_config(&self) -> Result<TrackerConfig> {
        let mut config = match &self.config {
            Some(path) => TrackerConfig::from_json_file(path)?,
            None => TrackerConfig::default(),
        };
        if let Some(tolerance) = self.tolerance {
            config.tolerance = tolerance;
        }
        if let Some(interval_ms) = self.interval_ms {
            config.sample_interval_ms = interval_ms;
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Command::Record(args) => record(args).await,
        Command::Chart { file, tolerance } => chart(&file, tolerance),
    }
}

async fn record(args: RecordArgs) -> Result<()> {
    let config = args.tracker_config()?;

    println!("[{}] Steady Tracker Starting", ts_now());
    println!("  Duration: {} seconds (0=until Ctrl-C)", args.duration);
    println!("  Tolerance: ±{} g", config.tolerance);
    println!("  Interval: {} ms", config.sample_interval_ms);
    println!("  Output Dir: {}", config.output_dir.display());

    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("creating {}", config.output_dir.display()))?;

    let tracker = Arc::new(MotionTracker::new(config.clone())?);
    let rejected = Arc::new(AtomicU64::new(0));

    let meta = tracker.start()?;
    println!("[{}] Recording {}", ts_now(), meta.session_id);

    let mut subscription = subscribe(&args, &config, Arc::clone(&tracker), Arc::clone(&rejected))?;

    let start = Instant::now();
    let status_path = config.output_dir.join("live_status.json");
    let mut status_ticker = interval(Duration::from_secs(config.status_interval_secs));

    let deadline = async {
        if args.duration > 0 {
            sleep(Duration::from_secs(args.duration)).await
        } else {
            std::future::pending::<()>().await
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => {
                println!("[{}] Duration reached, stopping...", ts_now());
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                println!("[{}] Interrupted, stopping...", ts_now());
                break;
            }
            _ = status_ticker.tick() => {
                let status = LiveStatus::capture(
                    &tracker,
                    Some(meta.session_id.clone()),
                    rejected.load(Ordering::Relaxed),
                    start.elapsed().as_secs(),
                )?;
                save_status(&status, &status_path);
                if let Some(display) = &status.magnitude_display {
                    println!(
                        "[{}] |a|={} g {:?} ({} samples)",
                        ts_now(),
                        display,
                        status.indicator,
                        status.buffered_samples
                    );
                }
                if !subscription.is_active() {
                    println!("[{}] Source finished, stopping...", ts_now());
                    break;
                }
            }
        }
    }

    let session = tracker.stop()?;
    subscription = tokio::task::spawn_blocking(move || {
        subscription.unsubscribe();
        subscription
    })
    .await?;
    log::debug!("Source delivered {} samples", subscription.delivered());

    let final_status = LiveStatus::capture(
        &tracker,
        None,
        rejected.load(Ordering::Relaxed),
        start.elapsed().as_secs(),
    )?;
    save_status(&final_status, &config.output_dir.join("live_status_final.json"));

    if session.is_empty() {
        println!("[{}] No samples recorded, nothing to save", ts_now());
        tracker.discard()?;
        return Ok(());
    }

    let report = tracker.report(&session)?;
    let series_path = report.save(&config.output_dir)?;
    println!("[{}] Chart series written to {}", ts_now(), series_path.display());

    export_with_retry(&tracker, &config.output_dir).await?;
    print_stats(&report.stats);

    Ok(())
}

fn subscribe(
    args: &RecordArgs,
    config: &TrackerConfig,
    tracker: Arc<MotionTracker>,
    rejected: Arc<AtomicU64>,
) -> Result<Subscription> {
    let callback: SampleCallback = Box::new(move |sample| {
        if tracker.on_sample(sample).is_err() {
            rejected.fetch_add(1, Ordering::Relaxed);
        }
    });

    let subscription = match &args.replay {
        Some(path) => {
            let recorded = load_session(path)?;
            println!(
                "[{}] Replaying {} samples from {}",
                ts_now(),
                recorded.len(),
                path.display()
            );
            ReplaySource::new(config.sample_interval(), recorded.samples().to_vec())
                .subscribe(callback)
        }
        None => {
            let mut accel = MockAccelerometer::new(config.sample_interval_ms);
            IntervalSource::new(config.sample_interval(), move || Some(accel.next_sample()))
                .subscribe(callback)
        }
    };

    Ok(subscription)
}

/// Export the finished session, backing off between failed attempts.
///
/// The session is only released after a successful write.
async fn export_with_retry(tracker: &MotionTracker, dir: &Path) -> Result<()> {
    let sink = FileSink::new();
    let destination = dir.to_string_lossy().to_string();
    let mut cooldown = Duration::from_millis(500);
    let mut attempt = 1;

    loop {
        match tracker.export(&sink, &destination) {
            Ok(receipt) => {
                println!(
                    "[{}] Saved {} samples ({} bytes) to {}",
                    ts_now(),
                    receipt.records,
                    receipt.bytes,
                    receipt.location
                );
                return Ok(());
            }
            Err(e) if attempt < EXPORT_ATTEMPTS && e.is_recoverable() => {
                log::warn!(
                    "Export attempt {} failed, retrying in {:.1}s: {}",
                    attempt,
                    cooldown.as_secs_f64(),
                    e
                );
                sleep(cooldown).await;
                cooldown = cooldown.mul_f64(1.5);
                attempt += 1;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("exporting to {}", destination));
            }
        }
    }
}

/// Write a status snapshot; failures are logged, never fatal.
fn save_status(status: &LiveStatus, path: &Path) -> bool {
    match status.save(path) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("Failed to write {}: {}", path.display(), e);
            false
        }
    }
}

fn chart(file: &Path, tolerance: Option<f64>) -> Result<()> {
    let session: SealedSession =
        load_session(file).with_context(|| format!("loading {}", file.display()))?;
    let config = TrackerConfig {
        tolerance: tolerance.unwrap_or(steady_core::DEFAULT_TOLERANCE),
        ..TrackerConfig::default()
    };
    let tracker = MotionTracker::new(config)?;

    let report: SeriesReport = tracker.report(&session)?;
    println!("{}", report.to_json()?);
    Ok(())
}

fn print_stats(stats: &SessionStats) {
    println!("\n=== Session Stats ===");
    println!("Samples: {}", stats.sample_count);
    println!("Duration: {:.1} s", stats.duration_seconds);
    println!("Steady: {}  Unsteady: {}", stats.steady_count, stats.unsteady_count);
    println!("Peak |a|: {:.2} g", stats.peak_magnitude);
}

fn ts_now() -> String {
    Utc::now().format("%H:%M:%S").to_string()
}
