use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde::Serialize;

use crate::result::RequestResult;

/// Shared predicate evaluated against each request result.
pub type CheckFn = Arc<dyn Fn(&RequestResult) -> bool + Send + Sync>;

/// A named boolean assertion over a request result.
#[derive(Clone)]
pub struct Check {
    name: String,
    predicate: CheckFn,
}

impl Check {
    /// Creates a check from a name and a predicate.
    pub fn new<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&RequestResult) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Check that the response carried the given status code, named the way
    /// run reports display it (e.g. `"status is 200"`).
    #[must_use]
    pub fn status_is(status: u16) -> Self {
        Self::new(format!("status is {status}"), move |result: &RequestResult| {
            result.status == Some(status)
        })
    }

    /// The check's display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Check").field("name", &self.name).finish()
    }
}

/// Result of one check applied to one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckOutcome {
    /// Name of the check that produced this outcome.
    pub name: String,
    /// Whether the predicate held for the request result.
    pub passed: bool,
}

/// Insertion-ordered set of checks applied to every request result.
#[derive(Debug, Clone, Default)]
pub struct CheckSet {
    checks: Vec<Check>,
}

impl CheckSet {
    /// Creates an empty check set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a check, keeping insertion order.
    pub fn push(&mut self, check: Check) {
        self.checks.push(check);
    }

    /// Builder-style variant of [`push`](Self::push).
    #[must_use]
    pub fn with(mut self, check: Check) -> Self {
        self.push(check);
        self
    }

    /// Number of checks in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.checks.len()
    }

    /// True when the set holds no checks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Evaluates every check in insertion order.
    ///
    /// A predicate that panics is contained and recorded as a failed
    /// outcome; evaluation always yields exactly one outcome per check and
    /// is deterministic for identical input.
    #[must_use]
    pub fn evaluate(&self, result: &RequestResult) -> Vec<CheckOutcome> {
        self.checks
            .iter()
            .map(|check| {
                let passed =
                    catch_unwind(AssertUnwindSafe(|| (check.predicate)(result))).unwrap_or(false);
                CheckOutcome {
                    name: check.name.clone(),
                    passed,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn ok_200() -> RequestResult {
        RequestResult::ok(200, Duration::from_millis(5))
    }

    #[test]
    fn test_status_check_passes_and_fails() {
        let checks = CheckSet::new().with(Check::status_is(200));

        let outcomes = checks.evaluate(&ok_200());
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].name, "status is 200");
        assert!(outcomes[0].passed);

        let outcomes = checks.evaluate(&RequestResult::ok(503, Duration::from_millis(5)));
        assert!(!outcomes[0].passed);
    }

    #[test]
    fn test_evaluation_preserves_insertion_order() {
        let checks = CheckSet::new()
            .with(Check::new("fast", |r| r.latency < Duration::from_secs(1)))
            .with(Check::status_is(200))
            .with(Check::new("no error", |r| !r.is_error()));

        let names: Vec<_> = checks
            .evaluate(&ok_200())
            .into_iter()
            .map(|o| o.name)
            .collect();
        assert_eq!(names, ["fast", "status is 200", "no error"]);
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let checks = CheckSet::new()
            .with(Check::status_is(200))
            .with(Check::new("under 10ms", |r| {
                r.latency < Duration::from_millis(10)
            }));

        let first = checks.evaluate(&ok_200());
        let second = checks.evaluate(&ok_200());
        assert_eq!(first, second);
    }

    #[test]
    fn test_panicking_predicate_recorded_as_failed() {
        let checks = CheckSet::new()
            .with(Check::new("faulty", |_| panic!("predicate bug")))
            .with(Check::status_is(200));

        let outcomes = checks.evaluate(&ok_200());
        assert_eq!(outcomes.len(), 2);
        assert!(!outcomes[0].passed);
        // The fault is contained; later checks still run.
        assert!(outcomes[1].passed);
    }
}
