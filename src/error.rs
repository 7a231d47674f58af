/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum ElectronBondError {
    /// Missing or invalid client configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// Network or request execution error from `reqwest`, after retries.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// Every attempt answered with a status from the retry forcelist.
    #[error("retries exhausted after {attempts} attempts, last status {status}")]
    RetriesExhausted { status: u16, attempts: u32 },
    /// Non-success HTTP status code with raw response body.
    #[error("http error {status}: {body}")]
    Http { status: u16, body: String },
    /// Response body was not the JSON document the call required.
    #[error("decode error: {0}")]
    Decode(String),
    /// Authentication against the token or OAuth endpoint failed.
    #[error(transparent)]
    Auth(#[from] AuthError),
    /// A paged endpoint answered with something other than `{results, next}`.
    #[error(transparent)]
    Return(#[from] ReturnError),
    /// Pagination was stopped before fetching more than `max_pages` pages.
    #[error("pagination stopped after {max_pages} pages")]
    PageLimit { max_pages: u32 },
}

/// Failure of one of the two authentication flows.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The token endpoint answered with a status other than 200 or 201.
    #[error("failed to authorize with status: {status}")]
    Status { status: u16, body: String },
    /// The token endpoint answered 2xx but the body has no usable `token`.
    #[error("token response could not be parsed: {source}")]
    MalformedResponse {
        body: String,
        #[source]
        source: serde_json::Error,
    },
    /// The token contains bytes that are not allowed in a header value.
    #[error("token is not a valid header value")]
    InvalidToken(#[source] reqwest::header::InvalidHeaderValue),
    /// Any failure while building the OAuth client or fetching its token.
    #[error("failed to authorize OAuth with message: {message}")]
    OAuth {
        message: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// A paged response that does not match the `{results, next}` shape.
#[derive(Debug, thiserror::Error)]
#[error("get_paged doesn't know how to handle {payload}: {reason}")]
pub struct ReturnError {
    /// The parsed response body, kept for diagnosis.
    pub payload: serde_json::Value,
    /// What was wrong with it.
    pub reason: String,
}

impl AuthError {
    pub(crate) fn oauth<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::OAuth {
            message: err.to_string(),
            source: Box::new(err),
        }
    }
}
