use std::fmt;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Body, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};

use crate::{ElectronBondError, Result, Session};

/// The seven HTTP verbs, each rewriting its URL onto the client's base URL.
///
/// Implementors only provide [`HttpMethods::request`]; the verb methods are
/// thin forwards to it.
pub trait HttpMethods {
    /// Starts a request with an arbitrary method.
    fn request(&self, method: Method, url: &str) -> ApiRequest<'_>;

    fn get(&self, url: &str) -> ApiRequest<'_> {
        self.request(Method::GET, url)
    }

    fn post(&self, url: &str) -> ApiRequest<'_> {
        self.request(Method::POST, url)
    }

    fn head(&self, url: &str) -> ApiRequest<'_> {
        self.request(Method::HEAD, url)
    }

    fn put(&self, url: &str) -> ApiRequest<'_> {
        self.request(Method::PUT, url)
    }

    fn patch(&self, url: &str) -> ApiRequest<'_> {
        self.request(Method::PATCH, url)
    }

    fn delete(&self, url: &str) -> ApiRequest<'_> {
        self.request(Method::DELETE, url)
    }

    fn options(&self, url: &str) -> ApiRequest<'_> {
        self.request(Method::OPTIONS, url)
    }
}

/// A request being built against a [`Session`].
///
/// Wraps [`reqwest::RequestBuilder`]; [`ApiRequest::send`] runs it through the
/// session's default headers, timeout and retry policy.
#[must_use = "requests do nothing until sent"]
pub struct ApiRequest<'a> {
    session: &'a Session,
    builder: RequestBuilder,
}

impl<'a> ApiRequest<'a> {
    pub(crate) fn new(session: &'a Session, method: Method, url: &str) -> Self {
        Self {
            session,
            builder: session.http().request(method, url),
        }
    }

    /// Appends query parameters.
    pub fn query<T: Serialize + ?Sized>(self, query: &T) -> Self {
        self.map(|builder| builder.query(query))
    }

    /// Sets a form-encoded body.
    pub fn form<T: Serialize + ?Sized>(self, form: &T) -> Self {
        self.map(|builder| builder.form(form))
    }

    /// Sets a JSON body.
    pub fn json<T: Serialize + ?Sized>(self, json: &T) -> Self {
        self.map(|builder| builder.json(json))
    }

    pub fn body(self, body: impl Into<Body>) -> Self {
        self.map(|builder| builder.body(body))
    }

    /// Sets a header, overriding a session default of the same name.
    pub fn header(self, name: HeaderName, value: HeaderValue) -> Self {
        self.map(|builder| builder.header(name, value))
    }

    pub fn headers(self, headers: HeaderMap) -> Self {
        self.map(|builder| builder.headers(headers))
    }

    pub fn basic_auth<U, P>(self, username: U, password: Option<P>) -> Self
    where
        U: fmt::Display,
        P: fmt::Display,
    {
        self.map(|builder| builder.basic_auth(username, password))
    }

    /// Overrides the session timeout for this request.
    pub fn timeout(self, timeout: Duration) -> Self {
        self.map(|builder| builder.timeout(timeout))
    }

    /// Applies any other [`reqwest::RequestBuilder`] option.
    pub fn map<F>(mut self, f: F) -> Self
    where
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        self.builder = f(self.builder);
        self
    }

    /// Sends the request.
    pub async fn send(self) -> Result<Response> {
        let request = self.builder.build()?;
        self.session.execute(request).await
    }

    /// Sends the request and deserializes a JSON response body.
    ///
    /// Non-success statuses fail with [`ElectronBondError::Http`].
    pub async fn send_json<T: DeserializeOwned>(self) -> Result<T> {
        let response = self.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ElectronBondError::Http {
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|err| {
            ElectronBondError::Decode(format!("invalid response JSON: {err}; body: {body}"))
        })
    }
}
