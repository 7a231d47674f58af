use std::fmt;
use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Request, Response};
use tokio::time::sleep;

use crate::{ElectronBondError, Result, RetryPolicy};

/// `User-Agent` sent on every request.
pub const USER_AGENT: &str = concat!("electronbond-http/", env!("CARGO_PKG_VERSION"));

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Long-lived HTTP session shared by every request of one client.
///
/// Holds the connection pool, session-wide default headers, the request
/// timeout and the retry policy.
#[derive(Clone)]
pub struct Session {
    http: reqwest::Client,
    headers: HeaderMap,
    timeout: Duration,
    retry: RetryPolicy,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: Vec<(&str, &str)> = self
            .headers
            .iter()
            .map(|(name, value)| {
                let shown = if value.is_sensitive() {
                    "<redacted>"
                } else {
                    value.to_str().unwrap_or("<binary>")
                };
                (name.as_str(), shown)
            })
            .collect();
        f.debug_struct("Session")
            .field("headers", &headers)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

/// Builds a session with bounded automatic retry.
///
/// Reuses `existing` when given, replacing its retry policy; otherwise a new
/// connection pool is created.
pub fn build_session(
    retries: u32,
    backoff_factor: f64,
    status_forcelist: impl Into<Vec<u16>>,
    existing: Option<Session>,
) -> Session {
    let retry = RetryPolicy::new(retries, backoff_factor, status_forcelist);
    match existing {
        Some(session) => session.with_retry(retry),
        None => Session::new(retry),
    }
}

impl Session {
    /// Creates a session over a fresh `reqwest::Client`.
    pub fn new(retry: RetryPolicy) -> Self {
        Self::with_client(reqwest::Client::new(), retry)
    }

    /// Wraps a pre-built `reqwest::Client`, keeping its own configuration.
    pub fn with_client(http: reqwest::Client, retry: RetryPolicy) -> Self {
        let mut session = Self {
            http,
            headers: HeaderMap::new(),
            timeout: DEFAULT_TIMEOUT,
            retry,
        };
        session.apply_default_headers();
        session
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets `Accept: application/json` and the crate `User-Agent`.
    pub(crate) fn apply_default_headers(&mut self) {
        self.headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/json"),
        );
        self.headers
            .insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Adds or replaces a session-wide default header.
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    pub fn remove_header(&mut self, name: &HeaderName) -> Option<HeaderValue> {
        self.headers.remove(name)
    }

    /// Sends a built request, retrying as the session's policy allows.
    ///
    /// Session headers are added where the request does not set them itself,
    /// and the session timeout applies unless the request carries one.
    pub async fn execute(&self, mut request: Request) -> Result<Response> {
        for (name, value) in &self.headers {
            if !request.headers().contains_key(name) {
                request.headers_mut().insert(name.clone(), value.clone());
            }
        }
        if request.timeout().is_none() {
            *request.timeout_mut() = Some(self.timeout);
        }

        let method = request.method().clone();
        let mut retry = 0u32;
        let mut current = request;

        loop {
            // Streaming bodies cannot be cloned; such requests get a single attempt.
            let replay = if retry < self.retry.retries {
                current.try_clone()
            } else {
                None
            };
            let outcome = self.http.execute(current).await;
            let Some(next) = replay else {
                return self.last_attempt(&method, retry + 1, outcome);
            };

            match outcome {
                Ok(response) if self.retry.should_retry_status(&method, response.status()) => {
                    retry += 1;
                    let delay = self
                        .retry
                        .retry_after(&response)
                        .unwrap_or_else(|| self.retry.backoff(retry));
                    drop(response);
                    self.wait_before_retry(retry, delay).await;
                }
                Ok(response) => return Ok(response),
                Err(err) if self.retry.should_retry_transport(&method, &err) => {
                    retry += 1;
                    self.wait_before_retry(retry, self.retry.backoff(retry)).await;
                }
                Err(err) => return Err(ElectronBondError::Transport(err)),
            }
            current = next;
        }
    }

    fn last_attempt(
        &self,
        method: &Method,
        attempts: u32,
        outcome: reqwest::Result<Response>,
    ) -> Result<Response> {
        let response = outcome?;
        let status = response.status();
        if self.retry.raise_on_status && self.retry.should_retry_status(method, status) {
            #[cfg(feature = "tracing")]
            tracing::warn!(%method, %status, attempts, "retries exhausted");
            return Err(ElectronBondError::RetriesExhausted {
                status: status.as_u16(),
                attempts,
            });
        }
        Ok(response)
    }

    async fn wait_before_retry(&self, retry: u32, delay: Duration) {
        #[cfg(feature = "tracing")]
        tracing::debug!(retry, delay_ms = delay.as_millis() as u64, "retrying request");

        #[cfg(not(feature = "tracing"))]
        let _ = retry;

        if !delay.is_zero() {
            sleep(delay).await;
        }
    }
}
