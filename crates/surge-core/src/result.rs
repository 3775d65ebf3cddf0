use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Failure cause for a request that produced no usable HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestError {
    /// Deadline elapsed before the response completed.
    Timeout,
    /// Connection to the target could not be established.
    Connect,
    /// Any other transport-level failure.
    Other(String),
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::Connect => write!(f, "connect"),
            Self::Other(message) => write!(f, "{message}"),
        }
    }
}

/// Observation of a single request issued by a virtual user.
///
/// Created by the request executor, consumed by check evaluation and the
/// aggregator, then discarded. Failures are data, never propagated errors,
/// so the virtual-user loop always continues.
#[derive(Debug, Clone)]
pub struct RequestResult {
    /// HTTP status code, absent when the request failed before a response.
    pub status: Option<u16>,
    /// Wall-clock time from request start to response or failure.
    pub latency: Duration,
    /// Transport failure, if any.
    pub error: Option<RequestError>,
}

impl RequestResult {
    /// A completed request with a status code.
    #[must_use]
    pub const fn ok(status: u16, latency: Duration) -> Self {
        Self {
            status: Some(status),
            latency,
            error: None,
        }
    }

    /// A failed request with no status code.
    #[must_use]
    pub const fn failed(error: RequestError, latency: Duration) -> Self {
        Self {
            status: None,
            latency,
            error: Some(error),
        }
    }

    /// True when the request failed at the transport level.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_constructors() {
        let ok = RequestResult::ok(200, Duration::from_millis(12));
        assert_eq!(ok.status, Some(200));
        assert!(!ok.is_error());

        let failed = RequestResult::failed(RequestError::Timeout, Duration::from_secs(30));
        assert_eq!(failed.status, None);
        assert!(failed.is_error());
        assert_eq!(failed.error.unwrap().to_string(), "timeout");
    }
}
