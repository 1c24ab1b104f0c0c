//! HTTP plumbing under the ClickUp client.
//!
//! [`Transport`] is the seam to the raw HTTP stack; [`UreqTransport`] is the
//! production implementation. [`AuthenticatedTransport`] wraps any transport
//! with the token, the user agent, the shared rate limiter, the single retry
//! on 429 and the classification of 401 responses.

use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::errors::ApiError;
use super::rate_limit::{HeaderSource, RateLimiter};
use crate::fanout::Deadline;

/// Per-request timeout when no tighter deadline applies.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Marker ClickUp puts in the body of a 401 caused by missing permissions
/// rather than by a bad token.
pub const PERMISSION_ERROR_MARKER: &str = "ECODE";

/// Response bodies larger than this are truncated.
const MAX_BODY_BYTES: u64 = 16 * 1024 * 1024;

pub fn user_agent() -> String {
    format!("clickup-cli/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    method: Method,
    url: String,
    headers: Vec<(String, String)>,
    body: Option<Vec<u8>>,
    deadline: Option<Deadline>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            deadline: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::Put, url)
    }

    /// Set a header, replacing any existing value with the same name.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_json<B: Serialize + ?Sized>(self, body: &B) -> Result<Self, ApiError> {
        let bytes = serde_json::to_vec(body).map_err(|e| ApiError::Decode(e.to_string()))?;
        let mut request = self.with_header("Content-Type", "application/json");
        request.body = Some(bytes);
        Ok(request)
    }

    pub fn with_form(self, fields: &[(&str, &str)]) -> Self {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        let mut request = self.with_header("Content-Type", "application/x-www-form-urlencoded");
        request.body = Some(encoded.into_bytes());
        request
    }

    pub fn with_deadline(mut self, deadline: Option<Deadline>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    pub fn deadline(&self) -> Option<Deadline> {
        self.deadline
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_slice(&self.body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

impl HeaderSource for HttpResponse {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Sends one HTTP request. Non-2xx statuses are ordinary responses; only
/// failures to get a response at all are errors.
pub trait Transport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).send(request)
    }
}

/// [`Transport`] backed by a `ureq` agent.
pub struct UreqTransport {
    agent: ureq::Agent,
    timeout: Duration,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self { agent, timeout }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let mut call = self.agent.request(request.method().as_str(), request.url());
        for (name, value) in request.headers() {
            call = call.set(name, value);
        }
        if let Some(deadline) = request.deadline() {
            call = call.timeout(deadline.remaining().min(self.timeout));
        }

        let result = match request.body() {
            Some(body) => call.send_bytes(body),
            None => call.call(),
        };

        let response = match result {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(err)) => {
                if request.deadline().is_some_and(|d| d.is_expired()) {
                    return Err(ApiError::Cancelled);
                }
                return Err(ApiError::Network(err.to_string()));
            }
        };

        let status = response.status();
        let headers = response
            .headers_names()
            .into_iter()
            .filter_map(|name| {
                let value = response.header(&name)?.to_string();
                Some((name, value))
            })
            .collect();

        let mut body = Vec::new();
        response
            .into_reader()
            .take(MAX_BODY_BYTES)
            .read_to_end(&mut body)
            .map_err(|e| ApiError::Network(format!("failed to read response body: {}", e)))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Transport that signs every request and applies the rate-limit policy.
pub struct AuthenticatedTransport<T: Transport = UreqTransport> {
    inner: T,
    token: String,
    user_agent: String,
    limiter: Arc<RateLimiter>,
}

impl<T: Transport> AuthenticatedTransport<T> {
    pub fn new(inner: T, token: impl Into<String>) -> Self {
        Self {
            inner,
            token: token.into(),
            user_agent: user_agent(),
            limiter: Arc::new(RateLimiter::new()),
        }
    }

    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Send `request` with credentials attached.
    ///
    /// A 429 is retried exactly once after waiting for the reported reset.
    /// A final 401 becomes [`ApiError::AuthExpired`] unless its body carries
    /// the service's permission marker, in which case it is reported as an
    /// ordinary status error. Every other status is returned as-is.
    pub fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let request = request
            .with_header("Authorization", &self.token)
            .with_header("User-Agent", &self.user_agent);

        let mut response = self.send_once(&request)?;

        if self.limiter.should_retry(response.status()) {
            tracing::debug!(url = request.url(), "rate limited (429), retrying once");
            drop(response);
            response = self.send_once(&request)?;
        }

        if response.status() == 401 {
            let body = response.text();
            if body.contains(PERMISSION_ERROR_MARKER) {
                return Err(ApiError::Status {
                    status: 401,
                    message: body,
                });
            }
            tracing::debug!("401 without permission marker, treating token as expired");
            return Err(ApiError::AuthExpired { detail: body });
        }

        Ok(response)
    }

    fn send_once(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let expired = || request.deadline().is_some_and(|d| d.is_expired());

        if expired() {
            return Err(ApiError::Cancelled);
        }
        self.limiter.wait_within(request.deadline());
        if expired() {
            return Err(ApiError::Cancelled);
        }

        tracing::trace!(method = request.method().as_str(), url = request.url(), "sending request");
        let response = self.inner.send(request)?;
        self.limiter.update(&response);
        tracing::trace!(status = response.status(), url = request.url(), "received response");
        Ok(response)
    }
}
