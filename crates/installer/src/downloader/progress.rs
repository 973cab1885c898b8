//! Progress tracking and reporting for download operations

use std::sync::Arc;
use std::time::{Duration, Instant};

/// Progress callback for download operations
pub type ProgressCallback = Arc<dyn Fn(DownloadProgress) + Send + Sync>;

/// Snapshot handed to progress callbacks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DownloadProgress {
    pub downloaded: u64,
    pub total: u64,
    /// Seconds left at the current average rate; `None` until a rate is known
    pub eta_secs: Option<f64>,
}

impl DownloadProgress {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.downloaded as f64 / self.total as f64) * 100.0
    }

    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.downloaded >= self.total
    }
}

/// Estimate the remaining time from the average rate since `elapsed` began
pub fn estimate_eta(downloaded: u64, total: u64, elapsed: Duration) -> Option<f64> {
    let elapsed = elapsed.as_secs_f64();
    if elapsed <= 0.0 || downloaded == 0 {
        return None;
    }
    let speed = downloaded as f64 / elapsed;
    let remaining = total.saturating_sub(downloaded) as f64;
    Some(remaining / speed)
}

/// Throttles progress reports and computes ETA for one download
///
/// Reports are only produced when the total size is known, and at most once per
/// `interval`. [`ProgressTracker::finish`] always produces the final 100% report.
#[derive(Debug)]
pub struct ProgressTracker {
    total: Option<u64>,
    downloaded: u64,
    start: Instant,
    last_report: Instant,
    interval: Duration,
}

impl ProgressTracker {
    pub fn new(total: Option<u64>, interval: Duration) -> Self {
        Self::starting_at(total, interval, Instant::now())
    }

    pub fn starting_at(total: Option<u64>, interval: Duration, start: Instant) -> Self {
        Self {
            // A zero Content-Length is as good as none
            total: total.filter(|t| *t > 0),
            downloaded: 0,
            start,
            last_report: start,
            interval,
        }
    }

    pub fn total(&self) -> Option<u64> {
        self.total
    }

    pub fn downloaded(&self) -> u64 {
        self.downloaded
    }

    /// Record `bytes` more and return a report if one is due
    pub fn advance(&mut self, bytes: u64, now: Instant) -> Option<DownloadProgress> {
        self.downloaded += bytes;
        let total = self.total?;

        if self.downloaded >= total || now.duration_since(self.last_report) < self.interval {
            return None;
        }
        self.last_report = now;

        Some(DownloadProgress {
            downloaded: self.downloaded,
            total,
            eta_secs: estimate_eta(self.downloaded, total, now.duration_since(self.start)),
        })
    }

    /// Final report once the body has been fully written
    pub fn finish(&self) -> Option<DownloadProgress> {
        let total = self.total?;
        Some(DownloadProgress {
            downloaded: self.downloaded,
            total: total.max(self.downloaded),
            eta_secs: Some(0.0),
        })
    }
}
