//! Rolling throughput accounting across all connections.
//!
//! Connection pipelines report the byte count of every frame they consume
//! onto a shared size queue. The sampler is the sole owner of the running
//! total: all increments arrive over the queue, so no locking is needed
//! anywhere. Reporting is purely observational and never affects data flow.

use std::time::Duration;

use tokio::{sync::mpsc, time};
use tracing::info;

/// Interval between throughput reports.
pub const SAMPLE_INTERVAL: Duration = Duration::from_secs(60);

fn log_total(total: u64) {
    info!(bytes = total, "data processed in the last sampling interval");
}

/// Accumulates per-frame byte counts and reports the total once per
/// [`SAMPLE_INTERVAL`], resetting after each report.
pub struct ThroughputSampler<R = fn(u64)> {
    sizes: mpsc::Receiver<usize>,
    report: R,
}

impl ThroughputSampler {
    /// Sampler reporting through a log event.
    #[must_use]
    pub fn new(sizes: mpsc::Receiver<usize>) -> Self {
        Self {
            sizes,
            report: log_total,
        }
    }
}

impl<R: FnMut(u64)> ThroughputSampler<R> {
    /// Sampler with a custom reporter in place of the log event.
    #[must_use]
    pub fn with_reporter(sizes: mpsc::Receiver<usize>, report: R) -> Self {
        Self { sizes, report }
    }

    /// Run until the size queue closes.
    ///
    /// A delayed tick only delays reporting; counts are never lost, they
    /// land in the next interval's total.
    pub async fn run(mut self) {
        let mut ticker = time::interval(SAMPLE_INTERVAL);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        // The first tick completes immediately; consume it so the first
        // report covers a full interval.
        ticker.tick().await;

        let mut total: u64 = 0;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    (self.report)(total);
                    total = 0;
                }
                size = self.sizes.recv() => match size {
                    Some(n) => total += n as u64,
                    None => break,
                },
            }
        }
    }
}
