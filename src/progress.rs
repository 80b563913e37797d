//! Throughput, percentage and remaining-time estimation from raw progress samples.

use std::time::{Duration, Instant};

use crate::format::{format_duration, format_percent, format_speed};
use crate::task::TaskId;

/// One raw progress sample emitted by a transport attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSample {
    /// Bytes sent so far in this attempt.
    pub sent: u64,
    /// Total bytes this attempt will send.
    pub total: u64,
}

/// Live figures derived from two consecutive samples of one attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    /// Current transfer rate in bytes per second.
    pub speed_bps: f64,
    /// Overall completion of the task in [0, 100], resume offset included.
    pub percent: f64,
    /// Estimated remaining time for this attempt, rounded up to whole seconds.
    pub eta: Duration,
    /// Bytes sent so far in this attempt.
    pub sent: u64,
    /// Total bytes this attempt will send.
    pub total: u64,
}

impl Snapshot {
    /// Status text in the shape collaborators render verbatim,
    /// e.g. `"1 MB/s 45.2% 00:01:23"`.
    #[must_use]
    pub fn status_line(&self) -> String {
        format!(
            "{} {} {}",
            format_speed(self.speed_bps),
            format_percent(self.percent),
            format_duration(self.eta)
        )
    }
}

/// Working state for one attempt's throughput estimate.
///
/// Create a fresh estimator at the start of every attempt; the byte counter
/// and sample timestamp reset with it.
#[derive(Debug)]
pub struct ProgressEstimator {
    resume_offset: u64,
    total_size: u64,
    sent: u64,
    last_sample: Instant,
}

impl ProgressEstimator {
    /// Estimator for an attempt resuming at `resume_offset` of a source
    /// totalling `total_size` bytes.
    #[must_use]
    pub fn new(resume_offset: u64, total_size: u64) -> Self {
        Self::starting_at(resume_offset, total_size, Instant::now())
    }

    /// Estimator whose first interval is measured from `start`.
    #[must_use]
    pub const fn starting_at(resume_offset: u64, total_size: u64, start: Instant) -> Self {
        Self {
            resume_offset,
            total_size,
            sent: 0,
            last_sample: start,
        }
    }

    /// Records a sample against the current clock.
    pub fn record(&mut self, sample: ProgressSample) -> Snapshot {
        self.record_at(sample, Instant::now())
    }

    /// Records a sample at an explicit instant.
    ///
    /// Speed is the byte delta over the millisecond delta since the previous
    /// sample. A zero interval, zero speed or empty attempt never divides by
    /// zero; the ETA is then zero.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn record_at(&mut self, sample: ProgressSample, now: Instant) -> Snapshot {
        let delta = sample.sent.saturating_sub(self.sent);
        let elapsed_ms = now.saturating_duration_since(self.last_sample).as_millis();
        let speed_bps = if elapsed_ms == 0 {
            0.0
        } else {
            delta as f64 / elapsed_ms as f64 * 1000.0
        };

        let percent = if self.total_size == 0 {
            100.0
        } else {
            let done = (self.resume_offset + sample.sent) as f64;
            (done / self.total_size as f64 * 100.0).clamp(0.0, 100.0)
        };

        let eta = if speed_bps <= 0.0 || sample.total == 0 {
            Duration::ZERO
        } else {
            let remaining = sample.total.saturating_sub(sample.sent) as f64;
            Duration::from_secs((remaining / speed_bps).ceil() as u64)
        };

        self.sent = sample.sent;
        self.last_sample = now;

        Snapshot {
            speed_bps,
            percent,
            eta,
            sent: sample.sent,
            total: sample.total,
        }
    }
}

/// Receives lifecycle and progress events from the engine.
///
/// All methods have default no-op implementations; implement only what the
/// presentation layer renders.
pub trait ProgressSink: Send + Sync {
    /// A task entered the FIFO queue.
    fn on_task_queued(&self, _id: TaskId, _path: &str) {}

    /// A task was dispatched and its transport attempt is starting.
    fn on_task_started(&self, _id: TaskId, _path: &str) {}

    /// A progress sample was converted into live figures.
    fn on_progress(&self, _id: TaskId, _snapshot: &Snapshot) {}

    /// The server acknowledged the full upload.
    fn on_task_completed(&self, _id: TaskId) {}

    /// The attempt failed; `reason` is `None` for an aborted request.
    fn on_task_failed(&self, _id: TaskId, _reason: Option<&str>) {}
}

/// A null sink that ignores all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(sent: u64, total: u64) -> ProgressSample {
        ProgressSample { sent, total }
    }

    #[test]
    fn speed_from_consecutive_samples() {
        let t0 = Instant::now();
        let mut est = ProgressEstimator::starting_at(0, 10_000, t0);

        let snap = est.record_at(sample(0, 10_000), t0);
        assert!((snap.speed_bps - 0.0).abs() < f64::EPSILON);

        let snap = est.record_at(sample(1024, 10_000), t0 + Duration::from_millis(1000));
        assert!((snap.speed_bps - 1024.0).abs() < f64::EPSILON);
    }

    #[test]
    fn percent_includes_resume_offset() {
        let t0 = Instant::now();
        let mut est = ProgressEstimator::starting_at(4000, 10_000, t0);
        let snap = est.record_at(sample(1000, 6000), t0 + Duration::from_millis(100));
        assert!((snap.percent - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn percent_monotone_and_bounded() {
        let t0 = Instant::now();
        let mut est = ProgressEstimator::starting_at(0, 5000, t0);
        let mut last = 0.0;
        for (i, sent) in [0u64, 100, 1500, 1500, 4000, 5000].iter().enumerate() {
            let snap = est.record_at(
                sample(*sent, 5000),
                t0 + Duration::from_millis(100 * (i as u64 + 1)),
            );
            assert!(snap.percent >= last);
            assert!((0.0..=100.0).contains(&snap.percent));
            last = snap.percent;
        }
        assert!((last - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn percent_clamped_when_server_reports_long() {
        let t0 = Instant::now();
        // offset + sent may overshoot the source size; percent must stay at 100
        let mut est = ProgressEstimator::starting_at(9000, 10_000, t0);
        let snap = est.record_at(sample(2000, 2000), t0 + Duration::from_millis(50));
        assert!((snap.percent - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn eta_rounds_up() {
        let t0 = Instant::now();
        let mut est = ProgressEstimator::starting_at(0, 10_000, t0);
        // 1000 B/s with 8500 bytes remaining -> 8.5s -> 00:00:09
        let snap = est.record_at(sample(1500, 10_000), t0 + Duration::from_millis(1500));
        assert_eq!(snap.eta, Duration::from_secs(9));
    }

    #[test]
    fn degenerate_cases_do_not_divide_by_zero() {
        let t0 = Instant::now();

        // zero-length attempt
        let mut est = ProgressEstimator::starting_at(0, 0, t0);
        let snap = est.record_at(sample(0, 0), t0 + Duration::from_millis(10));
        assert!((snap.percent - 100.0).abs() < f64::EPSILON);
        assert_eq!(snap.eta, Duration::ZERO);

        // zero elapsed time
        let mut est = ProgressEstimator::starting_at(0, 100, t0);
        let snap = est.record_at(sample(50, 100), t0);
        assert!((snap.speed_bps - 0.0).abs() < f64::EPSILON);
        assert_eq!(snap.eta, Duration::ZERO);
    }

    #[test]
    fn status_line_shape() {
        let snap = Snapshot {
            speed_bps: 1024.0,
            percent: 45.26,
            eta: Duration::from_secs(83),
            sent: 0,
            total: 0,
        };
        assert_eq!(snap.status_line(), "1 KB/s 45.3% 00:01:23");
    }
}
