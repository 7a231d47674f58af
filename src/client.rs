use std::fmt;
use std::time::Duration;

use reqwest::Method;

use crate::{
    build_session, urls::prefix_url, ApiRequest, ClientConfig, HttpMethods, PagedRequest,
    Result, Session,
};

#[derive(Clone)]
/// HTTP client for a Project Electron REST API.
///
/// Every request goes to `config.baseurl`, carries the session's default
/// headers, and is retried as [`ClientOptions`](crate::ClientOptions) allow.
pub struct ElectronBondClient {
    config: ClientConfig,
    session: Session,
}

impl fmt::Debug for ElectronBondClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElectronBondClient")
            .field("config", &self.config)
            .field("session", &self.session)
            .finish()
    }
}

impl ElectronBondClient {
    /// Creates a client with a new retrying session built from `config.options`.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let options = &config.options;
        let session = build_session(
            options.retries,
            options.backoff_factor,
            options.status_forcelist.clone(),
            None,
        )
        .with_timeout(Duration::from_millis(options.timeout_ms));
        Ok(Self { config, session })
    }

    /// Creates a client that reuses a pre-built session.
    ///
    /// The session keeps its own retry policy and timeout; only the default
    /// `Accept` and `User-Agent` headers are applied to it.
    pub fn with_session(config: ClientConfig, mut session: Session) -> Result<Self> {
        config.validate()?;
        session.apply_default_headers();
        Ok(Self { config, session })
    }

    /// Creates a client over a pre-built `reqwest::Client`, with retry and
    /// timeout taken from `config.options`.
    pub fn with_http_client(config: ClientConfig, http: reqwest::Client) -> Result<Self> {
        config.validate()?;
        let options = &config.options;
        let existing = Session::with_client(http, Default::default());
        let session = build_session(
            options.retries,
            options.backoff_factor,
            options.status_forcelist.clone(),
            Some(existing),
        )
        .with_timeout(Duration::from_millis(options.timeout_ms));
        Ok(Self { config, session })
    }

    /// Builds the client from `ELECTRONBOND_*` environment variables.
    ///
    /// See [`ClientConfig::from_env`].
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub(crate) fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Absolute URL a proxied request for `url` is sent to.
    pub fn url_for(&self, url: &str) -> String {
        prefix_url(&self.config.baseurl, url)
    }

    /// Starts a paged listing of `url`; see [`PagedRequest`].
    pub fn get_paged(&self, url: &str) -> PagedRequest<'_> {
        PagedRequest::new(self, url).max_pages(self.config.options.max_pages)
    }
}

impl HttpMethods for ElectronBondClient {
    fn request(&self, method: Method, url: &str) -> ApiRequest<'_> {
        ApiRequest::new(&self.session, method, &self.url_for(url))
    }
}
