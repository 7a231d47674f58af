use serde::{Deserialize, Serialize};

/// Configures HTTP timeout, retry and pagination behavior.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    /// Maximum number of retries after the initial attempt.
    pub retries: u32,
    /// Base retry backoff in seconds (exponential strategy).
    pub backoff_factor: f64,
    /// Response statuses that trigger a retry.
    pub status_forcelist: Vec<u16>,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Upper bound on pages fetched by one paged stream. `None` means unbounded.
    pub max_pages: Option<u32>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            retries: 5,
            backoff_factor: 0.3,
            status_forcelist: vec![500, 502, 503, 504],
            timeout_ms: 30_000,
            max_pages: Some(10_000),
        }
    }
}
