use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Method, Url};

use surge_core::{EngineError, EngineResult, HttpMethod, RequestError, RequestResult};

/// Issues one request per call and reports the outcome as data.
///
/// Implementations never fail: transport errors and timeouts come back
/// inside the [`RequestResult`], so virtual-user loops always continue.
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    /// Executes a single request against the configured target.
    async fn execute(&self) -> RequestResult;
}

/// `reqwest`-backed executor hitting a fixed target URL.
#[derive(Debug)]
pub struct HttpExecutor {
    client: Client,
    url: Url,
    method: Method,
}

impl HttpExecutor {
    /// Builds an executor for `target` with a per-request deadline.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSchedule` when `target` is not a valid URL, and
    /// `Internal` when the HTTP client cannot be constructed.
    pub fn new(target: &str, method: HttpMethod, timeout: Duration) -> EngineResult<Self> {
        let url = Url::parse(target).map_err(|err| {
            EngineError::invalid_schedule(format!("target_url `{target}` is not a valid URL: {err}"))
        })?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| EngineError::internal(format!("failed to build HTTP client: {err}")))?;
        Ok(Self {
            client,
            url,
            method: match method {
                HttpMethod::Get => Method::GET,
                HttpMethod::Post => Method::POST,
                HttpMethod::Head => Method::HEAD,
            },
        })
    }

    fn classify(err: &reqwest::Error) -> RequestError {
        if err.is_timeout() {
            RequestError::Timeout
        } else if err.is_connect() {
            RequestError::Connect
        } else {
            RequestError::Other(err.to_string())
        }
    }
}

#[async_trait]
impl RequestExecutor for HttpExecutor {
    async fn execute(&self) -> RequestResult {
        let start = Instant::now();
        let response = self
            .client
            .request(self.method.clone(), self.url.clone())
            .send()
            .await;
        match response {
            Ok(response) => {
                let status = response.status().as_u16();
                // Drain the body so latency covers the full exchange.
                match response.bytes().await {
                    Ok(_) => RequestResult::ok(status, start.elapsed()),
                    Err(err) => RequestResult::failed(Self::classify(&err), start.elapsed()),
                }
            }
            Err(err) => RequestResult::failed(Self::classify(&err), start.elapsed()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_target_url_rejected() {
        let err = HttpExecutor::new("not a url", HttpMethod::Get, Duration::from_secs(5))
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidSchedule { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_target_reported_as_data() {
        // Port 9 (discard) is assumed closed; connection must be refused.
        let executor = HttpExecutor::new(
            "http://127.0.0.1:9/test",
            HttpMethod::Get,
            Duration::from_secs(2),
        )
        .unwrap();

        let result = executor.execute().await;
        assert!(result.is_error());
        assert_eq!(result.status, None);
    }
}
