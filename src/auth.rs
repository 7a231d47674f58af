use std::sync::atomic::{AtomicU16, Ordering};

use oauth2::basic::BasicClient;
use oauth2::{
    AsyncHttpClient, ClientId, ClientSecret, HttpClientError, HttpRequest, RequestTokenError,
    TokenResponse, TokenUrl,
};
use reqwest::header::{self, HeaderValue};
use reqwest::{redirect, StatusCode};

use crate::{
    wire::{OAuthTokenResponse, TokenRequest, TokenResponse as PasswordTokenResponse},
    AuthError, ElectronBondClient, HttpMethods, Result, USER_AGENT,
};

const TOKEN_PATH: &str = "get-token/";
const OAUTH_TOKEN_PATH: &str = "oauth2/token";

impl ElectronBondClient {
    /// Exchanges the configured username and password for a bearer token.
    ///
    /// Sends `POST {baseurl}/get-token/` and, on 200 or 201, installs
    /// `Authorization: Bearer <token>` on the session for all later requests.
    pub async fn authorize(&mut self) -> Result<String> {
        let credentials = self.config().password_credentials()?;
        let form = TokenRequest {
            username: credentials.username,
            password: credentials.password,
        };

        let response = self.post(TOKEN_PATH).form(&form).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !matches!(status, StatusCode::OK | StatusCode::CREATED) {
            return Err(AuthError::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let token = match serde_json::from_str::<PasswordTokenResponse>(&body) {
            Ok(parsed) => parsed.token,
            Err(source) => return Err(AuthError::MalformedResponse { body, source }.into()),
        };
        self.set_bearer_token(&token)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(baseurl = %self.config().baseurl, "authorized with password token");

        Ok(token)
    }

    /// Fetches an access token with the OAuth2 client-credentials grant.
    ///
    /// The token endpoint is `{oauth_client_baseurl}/oauth2/token`. Any failure
    /// while talking to it is reported as [`AuthError::OAuth`] with the
    /// original error as its source.
    pub async fn authorize_oauth(&mut self) -> Result<String> {
        let credentials = self.config().oauth_credentials()?;
        let token_url = format!(
            "{}/{OAUTH_TOKEN_PATH}",
            credentials.baseurl.trim_end_matches('/')
        );

        let client = BasicClient::new(ClientId::new(credentials.client_id.to_owned()))
            .set_client_secret(ClientSecret::new(credentials.client_secret.to_owned()))
            .set_token_uri(TokenUrl::new(token_url).map_err(AuthError::oauth)?);

        // Token requests must not follow redirects.
        let http = reqwest::Client::builder()
            .redirect(redirect::Policy::none())
            .timeout(self.session().timeout())
            .user_agent(USER_AGENT)
            .build()
            .map_err(AuthError::oauth)?;

        // Parse failures also come from unreadable error bodies, so the status is kept.
        let status = AtomicU16::new(0);
        let send = |request: HttpRequest| {
            let (http, status) = (&http, &status);
            async move {
                let response = http.call(request).await?;
                status.store(response.status().as_u16(), Ordering::Relaxed);
                Ok::<_, HttpClientError<reqwest::Error>>(response)
            }
        };

        let access_token = match client
            .exchange_client_credentials()
            .request_async(&send)
            .await
        {
            Ok(token) => token.access_token().secret().to_owned(),
            // Providers may leave out `token_type`; only `access_token` is required.
            Err(RequestTokenError::Parse(err, body))
                if status.load(Ordering::Relaxed) == StatusCode::OK.as_u16() =>
            {
                match serde_json::from_slice::<OAuthTokenResponse>(&body) {
                    Ok(token) => token.access_token,
                    Err(_) => {
                        return Err(AuthError::oauth(RequestTokenError::<HttpClientError<reqwest::Error>, oauth2::basic::BasicErrorResponse>::Parse(err, body)).into());
                    }
                }
            }
            Err(err) => return Err(AuthError::oauth(err).into()),
        };
        self.set_bearer_token(&access_token)?;

        #[cfg(feature = "tracing")]
        tracing::debug!("authorized with OAuth client credentials");

        Ok(access_token)
    }

    /// Installs `Authorization: Bearer <token>` on the session.
    pub fn set_bearer_token(&mut self, token: &str) -> Result<()> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
            .map_err(AuthError::InvalidToken)?;
        value.set_sensitive(true);
        self.session_mut().set_header(header::AUTHORIZATION, value);
        Ok(())
    }

    /// Whether the session currently sends an `Authorization` header.
    pub fn is_authorized(&self) -> bool {
        self.session().headers().contains_key(header::AUTHORIZATION)
    }

    /// Removes the session's `Authorization` header.
    pub fn clear_authorization(&mut self) {
        self.session_mut().remove_header(&header::AUTHORIZATION);
    }
}

#[cfg(test)]
mod tests {
    use reqwest::header;

    use crate::{AuthError, ClientConfig, ElectronBondClient, ElectronBondError};

    fn client() -> ElectronBondClient {
        ElectronBondClient::new(ClientConfig::new("http://127.0.0.1:9/api")).expect("valid config")
    }

    #[test]
    fn bearer_token_is_sensitive_and_clearable() {
        let mut client = client();
        client.set_bearer_token(" abc ").expect("token is a valid header");

        let value = client
            .session()
            .headers()
            .get(header::AUTHORIZATION)
            .expect("header must be set");
        assert_eq!(value, "Bearer abc");
        assert!(value.is_sensitive());
        assert!(client.is_authorized());

        client.clear_authorization();
        assert!(!client.is_authorized());
    }

    #[test]
    fn invalid_token_is_rejected() {
        let mut client = client();
        let err = client
            .set_bearer_token("line\nbreak")
            .expect_err("newline is not a header value");
        assert!(matches!(
            err,
            ElectronBondError::Auth(AuthError::InvalidToken(_))
        ));
    }

    #[tokio::test]
    async fn authorize_without_credentials_is_config_error() {
        let mut client = client();
        let err = client.authorize().await.expect_err("no credentials configured");
        assert!(matches!(err, ElectronBondError::Config(_)));

        let err = client.authorize_oauth().await.expect_err("no oauth configured");
        assert!(matches!(err, ElectronBondError::Config(_)));
    }
}
