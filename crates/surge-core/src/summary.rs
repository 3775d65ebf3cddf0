use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Upper bucket bounds for the latency histogram, in milliseconds.
/// Latencies above the last bound land in an overflow bucket.
const BUCKET_BOUNDS_MS: [u64; 12] = [1, 5, 10, 25, 50, 100, 250, 500, 1_000, 2_500, 5_000, 10_000];

/// Fixed-bucket histogram of request latencies.
///
/// Percentiles are reported as the upper bound of the bucket containing the
/// requested rank, which keeps `record` allocation-free on the hot path.
#[derive(Debug, Clone)]
pub struct LatencyHistogram {
    counts: Vec<u64>,
    total: u64,
    sum_ms: f64,
    min_ms: f64,
    max_ms: f64,
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self {
            counts: vec![0; BUCKET_BOUNDS_MS.len() + 1],
            total: 0,
            sum_ms: 0.0,
            min_ms: f64::INFINITY,
            max_ms: 0.0,
        }
    }
}

impl LatencyHistogram {
    /// Creates an empty histogram.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one observed latency.
    pub fn record(&mut self, latency: Duration) {
        let ms = latency.as_secs_f64() * 1_000.0;
        let bucket = BUCKET_BOUNDS_MS
            .iter()
            .position(|bound| ms <= *bound as f64)
            .unwrap_or(BUCKET_BOUNDS_MS.len());
        self.counts[bucket] += 1;
        self.total += 1;
        self.sum_ms += ms;
        self.min_ms = self.min_ms.min(ms);
        self.max_ms = self.max_ms.max(ms);
    }

    /// Number of recorded observations.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    /// Approximate latency at `quantile` (0.0..=1.0), in milliseconds.
    ///
    /// Returns 0 for an empty histogram.
    #[must_use]
    pub fn percentile(&self, quantile: f64) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let rank = ((quantile * self.total as f64).ceil() as u64).max(1);
        let mut seen = 0_u64;
        for (idx, count) in self.counts.iter().enumerate() {
            seen += count;
            if seen >= rank {
                return BUCKET_BOUNDS_MS
                    .get(idx)
                    .map_or(self.max_ms, |bound| *bound as f64);
            }
        }
        self.max_ms
    }

    /// Point-in-time distribution summary.
    #[must_use]
    pub fn stats(&self) -> LatencyStats {
        if self.total == 0 {
            return LatencyStats::default();
        }
        LatencyStats {
            min_ms: self.min_ms,
            max_ms: self.max_ms,
            mean_ms: self.sum_ms / self.total as f64,
            p50_ms: self.percentile(0.50),
            p90_ms: self.percentile(0.90),
            p99_ms: self.percentile(0.99),
        }
    }
}

/// Latency distribution summary, milliseconds.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct LatencyStats {
    /// Fastest observed latency.
    pub min_ms: f64,
    /// Slowest observed latency.
    pub max_ms: f64,
    /// Arithmetic mean latency.
    pub mean_ms: f64,
    /// Median latency (bucket upper bound).
    pub p50_ms: f64,
    /// 90th percentile latency (bucket upper bound).
    pub p90_ms: f64,
    /// 99th percentile latency (bucket upper bound).
    pub p99_ms: f64,
}

/// Pass/fail tally for one named check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckTally {
    /// Check name as declared.
    pub name: String,
    /// Requests for which the check passed.
    pub passed: u64,
    /// Requests for which the check failed (including predicate faults).
    pub failed: u64,
}

impl CheckTally {
    /// Total evaluations of this check.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.passed + self.failed
    }

    /// Fraction of evaluations that passed, in 0.0..=1.0.
    #[must_use]
    pub fn pass_rate(&self) -> f64 {
        if self.total() == 0 {
            return 0.0;
        }
        self.passed as f64 / self.total() as f64
    }
}

/// Final aggregated output of a run.
///
/// Built once by the aggregator's snapshot; read-only afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Unique identifier of the run.
    pub run_id: Uuid,
    /// UTC timestamp at which the run started.
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration covered by this summary.
    pub duration: Duration,
    /// Requests issued across all virtual users.
    pub total_requests: u64,
    /// Requests that failed at the transport level.
    pub total_errors: u64,
    /// Per-check tallies in first-appearance order.
    pub checks: Vec<CheckTally>,
    /// Latency distribution across all requests.
    pub latency: LatencyStats,
}

impl RunSummary {
    /// Average request throughput over the run.
    #[must_use]
    pub fn requests_per_second(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.total_requests as f64 / secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_histogram_stats_are_zero() {
        let hist = LatencyHistogram::new();
        let stats = hist.stats();
        assert_eq!(hist.total(), 0);
        assert_eq!(stats.min_ms, 0.0);
        assert_eq!(stats.p99_ms, 0.0);
    }

    #[test]
    fn test_histogram_min_max_mean() {
        let mut hist = LatencyHistogram::new();
        hist.record(Duration::from_millis(10));
        hist.record(Duration::from_millis(20));
        hist.record(Duration::from_millis(30));

        let stats = hist.stats();
        assert_eq!(stats.min_ms, 10.0);
        assert_eq!(stats.max_ms, 30.0);
        assert!((stats.mean_ms - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_histogram_percentiles_use_bucket_bounds() {
        let mut hist = LatencyHistogram::new();
        // 99 fast requests, one slow outlier.
        for _ in 0..99 {
            hist.record(Duration::from_millis(8));
        }
        hist.record(Duration::from_millis(900));

        assert_eq!(hist.percentile(0.50), 10.0);
        assert_eq!(hist.percentile(0.90), 10.0);
        assert_eq!(hist.percentile(1.0), 1_000.0);
    }

    #[test]
    fn test_histogram_overflow_bucket_reports_max() {
        let mut hist = LatencyHistogram::new();
        hist.record(Duration::from_secs(25));
        assert_eq!(hist.percentile(0.99), 25_000.0);
    }

    #[test]
    fn test_check_tally_pass_rate() {
        let tally = CheckTally {
            name: "status is 200".to_string(),
            passed: 3,
            failed: 1,
        };
        assert_eq!(tally.total(), 4);
        assert!((tally.pass_rate() - 0.75).abs() < 1e-9);
    }
}
