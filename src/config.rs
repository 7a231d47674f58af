use std::fmt;

use reqwest::Url;
use serde::Deserialize;

use crate::{ClientOptions, ElectronBondError, Result};

const ENV_PREFIX: &str = "ELECTRONBOND_";

/// Connection settings for one API client.
///
/// Field names match the keys used by the Project Electron services' client
/// configuration files, so a config can be deserialized straight from them.
#[derive(Clone, Deserialize)]
pub struct ClientConfig {
    /// Base URL every proxied request is rewritten onto.
    pub baseurl: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub oauth_client_id: Option<String>,
    #[serde(default)]
    pub oauth_client_secret: Option<String>,
    /// Base URL of the OAuth provider; the token lives at `/oauth2/token` below it.
    #[serde(default)]
    pub oauth_client_baseurl: Option<String>,
    #[serde(flatten)]
    pub options: ClientOptions,
}

/// Borrowed username/password pair for the token flow.
#[derive(Clone, Copy)]
pub(crate) struct PasswordCredentials<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Borrowed client-credentials triple for the OAuth flow.
#[derive(Clone, Copy)]
pub(crate) struct OAuthCredentials<'a> {
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub baseurl: &'a str,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("baseurl", &self.baseurl)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("oauth_client_id", &self.oauth_client_id)
            .field(
                "oauth_client_secret",
                &self.oauth_client_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("oauth_client_baseurl", &self.oauth_client_baseurl)
            .field("options", &self.options)
            .finish()
    }
}

impl ClientConfig {
    /// Creates a config with only a base URL and default options.
    pub fn new(baseurl: impl Into<String>) -> Self {
        Self {
            baseurl: baseurl.into(),
            username: None,
            password: None,
            oauth_client_id: None,
            oauth_client_secret: None,
            oauth_client_baseurl: None,
            options: ClientOptions::default(),
        }
    }

    /// Adds credentials for [`ElectronBondClient::authorize`](crate::ElectronBondClient::authorize).
    pub fn with_password(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Adds credentials for
    /// [`ElectronBondClient::authorize_oauth`](crate::ElectronBondClient::authorize_oauth).
    pub fn with_oauth(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        baseurl: impl Into<String>,
    ) -> Self {
        self.oauth_client_id = Some(client_id.into());
        self.oauth_client_secret = Some(client_secret.into());
        self.oauth_client_baseurl = Some(baseurl.into());
        self
    }

    /// Replaces the timeout, retry and pagination options.
    pub fn with_options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds a config from `ELECTRONBOND_*` environment variables.
    ///
    /// Reads `ELECTRONBOND_BASEURL` (required) and, when present,
    /// `ELECTRONBOND_USERNAME` / `ELECTRONBOND_PASSWORD` and
    /// `ELECTRONBOND_OAUTH_CLIENT_ID` / `ELECTRONBOND_OAUTH_CLIENT_SECRET` /
    /// `ELECTRONBOND_OAUTH_CLIENT_BASEURL`. Empty variables count as unset.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(format!("{ENV_PREFIX}{key}")).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let baseurl = get("BASEURL").ok_or_else(|| {
            ElectronBondError::Config(format!("missing {ENV_PREFIX}BASEURL environment variable"))
        })?;

        let config = Self {
            username: get("USERNAME"),
            password: get("PASSWORD"),
            oauth_client_id: get("OAUTH_CLIENT_ID"),
            oauth_client_secret: get("OAUTH_CLIENT_SECRET"),
            oauth_client_baseurl: get("OAUTH_CLIENT_BASEURL"),
            ..Self::new(baseurl)
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks that the base URLs parse and that each auth flow is either
    /// fully configured or not configured at all.
    pub fn validate(&self) -> Result<()> {
        validate_http_url("baseurl", &self.baseurl)?;

        match (&self.username, &self.password) {
            (Some(_), None) | (None, Some(_)) => {
                return Err(ElectronBondError::Config(
                    "username and password must be configured together".to_owned(),
                ));
            }
            _ => {}
        }

        let oauth = [
            &self.oauth_client_id,
            &self.oauth_client_secret,
            &self.oauth_client_baseurl,
        ];
        let configured = oauth.iter().filter(|value| value.is_some()).count();
        if configured != 0 && configured != oauth.len() {
            return Err(ElectronBondError::Config(
                "oauth_client_id, oauth_client_secret and oauth_client_baseurl must be configured together"
                    .to_owned(),
            ));
        }
        if let Some(url) = &self.oauth_client_baseurl {
            validate_http_url("oauth_client_baseurl", url)?;
        }

        let options = &self.options;
        if !options.backoff_factor.is_finite() || options.backoff_factor < 0.0 {
            return Err(ElectronBondError::Config(format!(
                "backoff_factor must be a non-negative number, got {}",
                options.backoff_factor
            )));
        }
        if options.timeout_ms == 0 {
            return Err(ElectronBondError::Config(
                "timeout_ms must be greater than zero".to_owned(),
            ));
        }
        if let Some(status) = options
            .status_forcelist
            .iter()
            .find(|status| !(100..=599).contains(*status))
        {
            return Err(ElectronBondError::Config(format!(
                "status_forcelist contains invalid status {status}"
            )));
        }
        if options.max_pages == Some(0) {
            return Err(ElectronBondError::Config(
                "max_pages must be at least 1, use null to disable the limit".to_owned(),
            ));
        }
        Ok(())
    }

    pub(crate) fn password_credentials(&self) -> Result<PasswordCredentials<'_>> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Ok(PasswordCredentials { username, password }),
            _ => Err(ElectronBondError::Config(
                "username and password are required for token authorization".to_owned(),
            )),
        }
    }

    pub(crate) fn oauth_credentials(&self) -> Result<OAuthCredentials<'_>> {
        match (
            &self.oauth_client_id,
            &self.oauth_client_secret,
            &self.oauth_client_baseurl,
        ) {
            (Some(client_id), Some(client_secret), Some(baseurl)) => Ok(OAuthCredentials {
                client_id,
                client_secret,
                baseurl,
            }),
            _ => Err(ElectronBondError::Config(
                "oauth_client_id, oauth_client_secret and oauth_client_baseurl are required for OAuth authorization"
                    .to_owned(),
            )),
        }
    }
}

fn validate_http_url(key: &str, value: &str) -> Result<()> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ElectronBondError::Config(format!("{key} must not be empty")));
    }
    let url = Url::parse(trimmed)
        .map_err(|err| ElectronBondError::Config(format!("{key} is not a valid URL: {err}")))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ElectronBondError::Config(format!(
            "{key} must use http or https, got '{other}'"
        ))),
    }
}
