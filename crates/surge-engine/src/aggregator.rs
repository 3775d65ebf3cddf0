use std::time::Instant;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use surge_core::{CheckOutcome, CheckTally, LatencyHistogram, RequestResult, RunSummary};

/// Thread-safe accumulator for request results and check outcomes.
///
/// All virtual users share one aggregator; `record` takes a short internal
/// lock, so callers never coordinate among themselves and writers are never
/// blocked for long.
pub struct ResultAggregator {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    started: Instant,
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    total_requests: u64,
    total_errors: u64,
    // First-appearance order, so reports list checks the way they were declared.
    checks: Vec<CheckTally>,
    latency: LatencyHistogram,
}

impl Default for ResultAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultAggregator {
    /// Creates an empty aggregator stamped with a fresh run id.
    #[must_use]
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            started: Instant::now(),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// The run identifier this aggregator reports under.
    #[must_use]
    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Records one request result and its check outcomes.
    pub fn record(&self, result: &RequestResult, outcomes: &[CheckOutcome]) {
        let mut inner = self.inner.lock();
        inner.total_requests += 1;
        if result.is_error() {
            inner.total_errors += 1;
        }
        inner.latency.record(result.latency);
        for outcome in outcomes {
            match inner
                .checks
                .iter_mut()
                .find(|tally| tally.name == outcome.name)
            {
                Some(tally) => {
                    if outcome.passed {
                        tally.passed += 1;
                    } else {
                        tally.failed += 1;
                    }
                }
                None => inner.checks.push(CheckTally {
                    name: outcome.name.clone(),
                    passed: u64::from(outcome.passed),
                    failed: u64::from(!outcome.passed),
                }),
            }
        }
    }

    /// Returns a consistent point-in-time copy of the accumulated state.
    #[must_use]
    pub fn snapshot(&self) -> RunSummary {
        let inner = self.inner.lock();
        RunSummary {
            run_id: self.run_id,
            started_at: self.started_at,
            duration: self.started.elapsed(),
            total_requests: inner.total_requests,
            total_errors: inner.total_errors,
            checks: inner.checks.clone(),
            latency: inner.latency.stats(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use surge_core::{Check, CheckSet, RequestError};

    fn ok_200() -> RequestResult {
        RequestResult::ok(200, Duration::from_millis(8))
    }

    #[test]
    fn test_record_counts_requests_and_errors() {
        let aggregator = ResultAggregator::new();
        let checks = CheckSet::new().with(Check::status_is(200));

        let ok = ok_200();
        aggregator.record(&ok, &checks.evaluate(&ok));

        let failed = RequestResult::failed(RequestError::Connect, Duration::from_millis(2));
        aggregator.record(&failed, &checks.evaluate(&failed));

        let summary = aggregator.snapshot();
        assert_eq!(summary.total_requests, 2);
        assert_eq!(summary.total_errors, 1);
        assert_eq!(summary.checks.len(), 1);
        assert_eq!(summary.checks[0].passed, 1);
        assert_eq!(summary.checks[0].failed, 1);
    }

    #[test]
    fn test_checks_keep_first_appearance_order() {
        let aggregator = ResultAggregator::new();
        let checks = CheckSet::new()
            .with(Check::new("no error", |r| !r.is_error()))
            .with(Check::status_is(200));

        let result = ok_200();
        aggregator.record(&result, &checks.evaluate(&result));

        let names: Vec<_> = aggregator
            .snapshot()
            .checks
            .iter()
            .map(|t| t.name.clone())
            .collect();
        assert_eq!(names, ["no error", "status is 200"]);
    }

    #[test]
    fn test_concurrent_record_loses_no_updates() {
        const WRITERS: usize = 8;
        const PER_WRITER: u64 = 500;

        let aggregator = Arc::new(ResultAggregator::new());
        let checks = Arc::new(CheckSet::new().with(Check::status_is(200)));

        let handles: Vec<_> = (0..WRITERS)
            .map(|_| {
                let aggregator = Arc::clone(&aggregator);
                let checks = Arc::clone(&checks);
                std::thread::spawn(move || {
                    for _ in 0..PER_WRITER {
                        let result = ok_200();
                        aggregator.record(&result, &checks.evaluate(&result));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let summary = aggregator.snapshot();
        let expected = WRITERS as u64 * PER_WRITER;
        assert_eq!(summary.total_requests, expected);
        assert_eq!(summary.total_errors, 0);
        assert_eq!(summary.checks[0].passed, expected);
        assert_eq!(summary.latency.min_ms, 8.0);
    }
}
