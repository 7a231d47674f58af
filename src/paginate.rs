use std::collections::VecDeque;
use std::time::Duration;

use futures::stream::{self, Stream};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;

use crate::{ElectronBondClient, ElectronBondError, HttpMethods, Result, ReturnError};

const PAGE_PARAM: &str = "page";

/// A listing of a paged endpoint, consumed as a stream of items.
///
/// The endpoint is expected to answer `{"results": [...], "next": ...}`.
/// Pages are requested with `?page=1`, `?page=2`, ... until a page has no
/// results or no `next`. Query params, headers and timeout set here are sent
/// with every page.
#[must_use = "paged requests do nothing until streamed"]
pub struct PagedRequest<'a> {
    client: &'a ElectronBondClient,
    url: String,
    params: Vec<(String, String)>,
    headers: HeaderMap,
    timeout: Option<Duration>,
    start_page: u64,
    max_pages: Option<u32>,
    invalid: Option<String>,
}

impl<'a> PagedRequest<'a> {
    pub(crate) fn new(client: &'a ElectronBondClient, url: &str) -> Self {
        Self {
            client,
            url: url.to_owned(),
            params: Vec::new(),
            headers: HeaderMap::new(),
            timeout: None,
            start_page: 1,
            max_pages: None,
            invalid: None,
        }
    }

    /// Adds a query parameter. A `page` parameter sets the first page fetched.
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        let key = key.into();
        let value = value.to_string();
        if key == PAGE_PARAM {
            match value.trim().parse::<u64>() {
                Ok(page) if page >= 1 => self.start_page = page,
                _ => {
                    self.invalid =
                        Some(format!("page parameter must be a positive integer, got '{value}'"));
                }
            }
        } else {
            self.params.push((key, value));
        }
        self
    }

    pub fn params<I, K, V>(self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        params
            .into_iter()
            .fold(self, |request, (key, value)| request.param(key, value))
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn start_page(mut self, page: u64) -> Self {
        self.start_page = page.max(1);
        self
    }

    /// Caps the number of pages fetched. `None` removes the cap.
    pub fn max_pages(mut self, max_pages: Option<u32>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Streams the items of every page in order.
    ///
    /// The stream ends after the first error. Dropping it abandons any
    /// in-flight page request.
    pub fn into_stream(self) -> impl Stream<Item = Result<Value>> + 'a {
        stream::try_unfold(self.into_cursor(), Cursor::advance)
    }

    fn into_cursor(self) -> Cursor<'a> {
        Cursor {
            pending_error: self.invalid.map(ElectronBondError::Config),
            page: self.start_page,
            pages_fetched: 0,
            buffer: VecDeque::new(),
            exhausted: false,
            request: PageTemplate {
                client: self.client,
                url: self.url,
                params: self.params,
                headers: self.headers,
                timeout: self.timeout,
                max_pages: self.max_pages,
            },
        }
    }
}

struct PageTemplate<'a> {
    client: &'a ElectronBondClient,
    url: String,
    params: Vec<(String, String)>,
    headers: HeaderMap,
    timeout: Option<Duration>,
    max_pages: Option<u32>,
}

struct Cursor<'a> {
    request: PageTemplate<'a>,
    pending_error: Option<ElectronBondError>,
    page: u64,
    pages_fetched: u32,
    buffer: VecDeque<Value>,
    exhausted: bool,
}

impl<'a> Cursor<'a> {
    /// Yields the next buffered item, fetching pages as needed.
    async fn advance(mut self) -> Result<Option<(Value, Self)>> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Ok(Some((item, self)));
            }
            if self.exhausted {
                return Ok(None);
            }
            if let Some(err) = self.pending_error.take() {
                return Err(err);
            }
            self.fetch_next_page().await?;
        }
    }

    fn check_page_limit(&self) -> Result<()> {
        match self.request.max_pages {
            Some(max_pages) if self.pages_fetched >= max_pages => {
                #[cfg(feature = "tracing")]
                tracing::warn!(url = %self.request.url, max_pages, "page limit reached");
                Err(ElectronBondError::PageLimit { max_pages })
            }
            _ => Ok(()),
        }
    }

    /// Uncapped listings may outlive the counter; it saturates.
    fn record_page(&mut self) {
        self.pages_fetched = self.pages_fetched.saturating_add(1);
    }

    async fn fetch_next_page(&mut self) -> Result<()> {
        self.check_page_limit()?;

        let payload = self.request.fetch(self.page).await?;
        self.record_page();
        let page = Page::from_payload(payload)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            url = %self.request.url,
            page = self.page,
            items = page.results.len(),
            has_next = page.has_next,
            "fetched page"
        );

        if page.results.is_empty() {
            self.exhausted = true;
            return Ok(());
        }
        if page.has_next {
            self.page += 1;
        } else {
            self.exhausted = true;
        }
        self.buffer.extend(page.results);
        Ok(())
    }
}

impl PageTemplate<'_> {
    async fn fetch(&self, page: u64) -> Result<Value> {
        let mut query: Vec<(&str, String)> = Vec::with_capacity(self.params.len() + 1);
        query.push((PAGE_PARAM, page.to_string()));
        query.extend(
            self.params
                .iter()
                .map(|(key, value)| (key.as_str(), value.clone())),
        );

        let mut request = self
            .client
            .get(&self.url)
            .query(&query)
            .headers(self.headers.clone());
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ElectronBondError::Http {
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|err| {
            ElectronBondError::Decode(format!("invalid paged response JSON: {err}; body: {body}"))
        })
    }
}

/// One parsed `{results, next}` page.
#[derive(Debug)]
struct Page {
    results: Vec<Value>,
    has_next: bool,
}

impl Page {
    fn from_payload(payload: Value) -> std::result::Result<Self, ReturnError> {
        let mut map = match payload {
            Value::Object(map) => map,
            other => {
                let reason = format!("expected an object, got {}", kind_of(&other));
                return Err(ReturnError {
                    payload: other,
                    reason,
                });
            }
        };
        let has_next = map.get("next").is_some_and(is_truthy);
        let reason = match map.remove("results") {
            Some(Value::Array(results)) => return Ok(Self { results, has_next }),
            Some(other) => {
                let reason = format!("`results` must be an array, got {}", kind_of(&other));
                map.insert("results".to_owned(), other);
                reason
            }
            None => "missing `results`".to_owned(),
        };
        Err(ReturnError {
            payload: Value::Object(map),
            reason,
        })
    }
}

/// Null, false, zero and empty strings, arrays or objects mean "no next page".
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
