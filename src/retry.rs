use std::time::Duration;

use reqwest::{header, Method, Response, StatusCode};

/// Longest sleep between two attempts.
const BACKOFF_MAX: Duration = Duration::from_secs(120);

/// Statuses for which a `Retry-After` header is honored.
const RETRY_AFTER_STATUSES: [StatusCode; 3] = [
    StatusCode::PAYLOAD_TOO_LARGE,
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::SERVICE_UNAVAILABLE,
];

/// Bounded automatic retry applied to every request sent through a session.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Maximum retries after the initial attempt. Bounds connect, read and status retries.
    pub retries: u32,
    /// Seconds; the first retry is immediate, the `n`th after it waits `backoff_factor * 2^(n-1)`.
    pub backoff_factor: f64,
    /// Response statuses that trigger a retry.
    pub status_forcelist: Vec<u16>,
    /// Methods whose responses and read failures may be retried.
    pub allowed_methods: Vec<Method>,
    /// Fail with [`ElectronBondError::RetriesExhausted`](crate::ElectronBondError::RetriesExhausted)
    /// instead of returning the last forcelisted response.
    pub raise_on_status: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, 0.3, [500, 502, 503, 504])
    }
}

impl RetryPolicy {
    pub fn new(retries: u32, backoff_factor: f64, status_forcelist: impl Into<Vec<u16>>) -> Self {
        Self {
            retries,
            backoff_factor,
            status_forcelist: status_forcelist.into(),
            allowed_methods: vec![
                Method::HEAD,
                Method::GET,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
                Method::TRACE,
            ],
            raise_on_status: true,
        }
    }

    /// Policy that sends every request exactly once.
    pub fn none() -> Self {
        Self::new(0, 0.0, Vec::new())
    }

    pub(crate) fn is_idempotent(&self, method: &Method) -> bool {
        self.allowed_methods.contains(method)
    }

    pub(crate) fn is_forcelisted(&self, status: StatusCode) -> bool {
        self.status_forcelist.contains(&status.as_u16())
    }

    pub(crate) fn should_retry_status(&self, method: &Method, status: StatusCode) -> bool {
        self.is_idempotent(method) && self.is_forcelisted(status)
    }

    /// Connect failures never reached the server, so they are safe for any method.
    pub(crate) fn should_retry_transport(&self, method: &Method, err: &reqwest::Error) -> bool {
        if err.is_connect() {
            return true;
        }
        (err.is_timeout() || err.is_request() || err.is_body()) && self.is_idempotent(method)
    }

    /// Delay before retry number `retry` (1-based). The first retry is immediate.
    pub(crate) fn backoff(&self, retry: u32) -> Duration {
        if retry <= 1 || self.backoff_factor <= 0.0 {
            return Duration::ZERO;
        }
        let exp = (retry - 1).min(30) as i32;
        let secs = self.backoff_factor * 2f64.powi(exp);
        Duration::try_from_secs_f64(secs)
            .unwrap_or(BACKOFF_MAX)
            .min(BACKOFF_MAX)
    }

    /// Delay requested by the server, when it sent one we honor.
    pub(crate) fn retry_after(&self, response: &Response) -> Option<Duration> {
        if !RETRY_AFTER_STATUSES.contains(&response.status()) {
            return None;
        }
        let value = response.headers().get(header::RETRY_AFTER)?.to_str().ok()?;
        let secs: u64 = value.trim().parse().ok()?;
        Some(Duration::from_secs(secs).min(BACKOFF_MAX))
    }
}
