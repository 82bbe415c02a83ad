//! HTTP plumbing under the client.
//!
//! The client builds [`ApiRequest`]s and hands them to a [`Transport`]. The
//! production transport is a blocking reqwest client; tests substitute a
//! scripted one to drive multi-step refresh sequences.

use std::borrow::Cow;
use std::time::Duration;

use reqwest::Method;

use crate::error::TableauError;

pub const AUTH_HEADER: &str = "x-tableau-auth";

/// One outgoing request, fully resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: Option<Vec<u8>>,
}

impl ApiRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: vec![("accept", "application/json".to_string())],
            body: None,
        }
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn json_body(mut self, body: &serde_json::Value) -> Self {
        self.headers.push(("content-type", "application/json".to_string()));
        self.body = Some(body.to_string().into_bytes());
        self
    }

    /// Value of the first header named `name` (case-insensitive).
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status, headers and body exactly as the server sent them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Sends one request and returns whatever came back. Only a failure to get
/// any response at all is an error; HTTP statuses are the caller's business.
pub trait Transport {
    fn execute(&self, request: ApiRequest) -> Result<RawResponse, TableauError>;
}

/// Blocking reqwest transport. Keeps one connection pool for the session.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration, accept_invalid_certs: bool) -> Result<Self, TableauError> {
        if accept_invalid_certs {
            tracing::warn!("TLS certificate verification disabled for Tableau requests");
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn execute(&self, request: ApiRequest) -> Result<RawResponse, TableauError> {
        let mut builder = self.client.request(request.method.clone(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send()?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
            .collect();
        let body = response.bytes()?.to_vec();
        tracing::trace!(method = %request.method, url = %request.url, status, bytes = body.len(), "tableau response");
        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults_to_json_accept() {
        let req = ApiRequest::new(Method::GET, "https://tableau.example.com/api/3.19/sites/s/jobs/j");
        assert_eq!(req.header_value("Accept"), Some("application/json"));
        assert!(req.body.is_none());
    }

    #[test]
    fn test_json_body_sets_content_type() {
        let req = ApiRequest::new(Method::POST, "https://x").json_body(&serde_json::json!({}));
        assert_eq!(req.header_value("content-type"), Some("application/json"));
        assert_eq!(req.body.as_deref(), Some(&b"{}"[..]));
    }

    #[test]
    fn test_raw_response_success_range() {
        let mut resp = RawResponse {
            status: 202,
            headers: Vec::new(),
            body: b"ok".to_vec(),
        };
        assert!(resp.is_success());
        resp.status = 409;
        assert!(!resp.is_success());
        assert_eq!(resp.text(), "ok");
    }
}
