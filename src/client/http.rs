//! Request/response types and the reqwest-backed transport.
//!
//! A [`HttpTransport`] performs exactly one HTTP exchange against one URL.
//! It reports `Ok` for every response that arrives, whatever its status, and
//! `Err` only when no response arrived at all. Interpreting status codes is
//! left to callers.

use crate::errors::{TransportError, TransportErrorKind};
use crate::PortalError;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::Client;
use serde::Serialize;
use std::borrow::Cow;
use std::time::Duration;
use tracing::warn;

/// HTTP method subset used by the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
    /// HEAD
    Head,
}

impl Method {
    fn as_reqwest(self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Head => reqwest::Method::HEAD,
        }
    }
}

/// Method, headers and body exactly as they should reach the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    /// HTTP method.
    pub method: Method,
    /// Header name/value pairs, in order.
    pub headers: Vec<(String, String)>,
    /// Request body, if any.
    pub body: Option<Vec<u8>>,
}

impl RequestSpec {
    /// A GET that accepts JSON.
    pub fn get() -> Self {
        Self {
            method: Method::Get,
            headers: vec![(ACCEPT.to_string(), "application/json".to_string())],
            body: None,
        }
    }

    /// A POST with an empty JSON-typed body.
    pub fn post_empty() -> Self {
        Self {
            method: Method::Post,
            headers: vec![
                (CONTENT_TYPE.to_string(), "application/json".to_string()),
                (ACCEPT.to_string(), "application/json".to_string()),
            ],
            body: Some(Vec::new()),
        }
    }

    /// A POST carrying `payload` serialized as JSON.
    pub fn post_json<T: Serialize>(payload: &T) -> Result<Self, PortalError> {
        let body = serde_json::to_vec(payload)
            .map_err(|e| PortalError::ConfigError(format!("Failed to serialize body: {}", e)))?;
        Ok(Self {
            body: Some(body),
            ..Self::post_empty()
        })
    }

    /// Attach `Authorization: Bearer <token>`.
    pub fn bearer(self, token: &str) -> Self {
        self.header(AUTHORIZATION.as_str(), &format!("Bearer {}", token))
    }

    /// Append a header.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Look up the first header with this name (case-insensitive).
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A response that arrived, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Build a response.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text, replacing invalid UTF-8.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// One HTTP exchange against one URL.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send `request` to `url`, giving up after `timeout`.
    async fn execute(
        &self,
        url: &str,
        request: &RequestSpec,
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError>;
}

/// Production transport on an async reqwest client.
pub struct ReqwestTransport {
    client: Client,
    user_agent: String,
}

impl ReqwestTransport {
    /// Create a transport that identifies itself with `user_agent`.
    pub fn new(user_agent: &str) -> Result<Self, PortalError> {
        let client = Client::builder()
            .build()
            .map_err(|e| PortalError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            user_agent: user_agent.to_string(),
        })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(
        &self,
        url: &str,
        request: &RequestSpec,
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method.as_reqwest(), url)
            .timeout(timeout)
            .header(USER_AGENT, &self.user_agent);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map(|b| b.to_vec());

        Ok(settle(status, body))
    }
}

/// A status line arrived, so the exchange counts as answered even when the
/// body could not be read; retrying elsewhere could repeat a processed POST.
fn settle<E: std::fmt::Display>(status: u16, body: Result<Vec<u8>, E>) -> HttpResponse {
    match body {
        Ok(body) => HttpResponse { status, body },
        Err(error) => {
            warn!(status, error = %error, "response body unreadable");
            HttpResponse {
                status,
                body: Vec::new(),
            }
        }
    }
}

/// Map a reqwest failure to the transport taxonomy.
fn classify(error: reqwest::Error) -> TransportError {
    let kind = if error.is_timeout() {
        TransportErrorKind::Timeout
    } else if error.is_connect() {
        TransportErrorKind::Connect
    } else {
        TransportErrorKind::Other
    };
    TransportError::new(kind, error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_json_sets_content_type_and_body() {
        let spec = RequestSpec::post_json(&serde_json::json!({ "code": "123456" })).unwrap();
        assert_eq!(spec.method, Method::Post);
        assert_eq!(spec.header_value("content-type"), Some("application/json"));
        assert_eq!(spec.body.as_deref(), Some(br#"{"code":"123456"}"#.as_slice()));
    }

    #[test]
    fn bearer_appends_authorization() {
        let spec = RequestSpec::get().bearer("abc");
        assert_eq!(spec.header_value("Authorization"), Some("Bearer abc"));
        assert_eq!(spec.header_value("accept"), Some("application/json"));
    }

    #[test]
    fn post_empty_has_empty_body() {
        let spec = RequestSpec::post_empty();
        assert_eq!(spec.body, Some(Vec::new()));
    }

    #[test]
    fn response_success_range() {
        assert!(HttpResponse::new(201, "").is_success());
        assert!(!HttpResponse::new(401, "").is_success());
        assert!(!HttpResponse::new(302, "").is_success());
    }

    #[test]
    fn response_text_is_lossy() {
        let response = HttpResponse::new(500, vec![b'o', b'k', 0xFF]);
        assert!(response.text().starts_with("ok"));
    }

    #[test]
    fn unreadable_body_keeps_status() {
        let response = settle(201, Err::<Vec<u8>, _>("connection reset"));
        assert_eq!(response, HttpResponse::new(201, Vec::new()));
        assert!(response.is_success());
    }

    #[test]
    fn readable_body_passes_through() {
        let response = settle::<String>(400, Ok(b"{}".to_vec()));
        assert_eq!(response.body, b"{}".to_vec());
    }

    #[test]
    fn transport_creation() {
        assert!(ReqwestTransport::new("portalwarden-test").is_ok());
    }
}
