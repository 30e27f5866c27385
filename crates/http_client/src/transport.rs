//! Transport abstraction — lets tests exercise the SSRF/redirect lifecycle
//! without ever touching the network (spec.md §8 seed test 4: "no network
//! call issued").

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::HttpClientError;

/// A fully-resolved request ready to be sent.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    pub timeout: Duration,
}

/// What came back over the wire (or out of a mock).
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self.status, 301 | 302 | 303 | 307 | 308)
    }
}

/// Anything capable of sending a prepared request and returning a raw
/// response. Production code uses [`ReqwestTransport`]; tests use a fake.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, req: &PreparedRequest) -> Result<RawResponse, HttpClientError>;
}

/// Default production transport, built on `reqwest`.
///
/// Redirects are followed manually by [`crate::HttpClient`], not by
/// `reqwest` itself, so every hop can be re-validated against the SSRF
/// policy — hence `redirect::Policy::none()`.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("reqwest client builder should not fail with these options");
        Self { client }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, req: &PreparedRequest) -> Result<RawResponse, HttpClientError> {
        let method = reqwest::Method::from_bytes(req.method.as_bytes())
            .map_err(|_| HttpClientError::NetworkError(format!("invalid method '{}'", req.method)))?;

        let mut builder = self.client.request(method, &req.url).timeout(req.timeout);
        for (k, v) in &req.headers {
            builder = builder.header(k, v);
        }
        if let Some(body) = &req.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                HttpClientError::Timeout
            } else {
                HttpClientError::NetworkError(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or_default().to_string()))
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| HttpClientError::NetworkError(e.to_string()))?
            .to_vec();

        Ok(RawResponse { status, headers, body })
    }
}

/// A deterministic, in-memory transport for tests. Records every request
/// it was asked to send (so tests can assert "no network call issued")
/// and returns a queued response per call.
#[derive(Default)]
pub struct MockTransport {
    pub requests: std::sync::Mutex<Vec<PreparedRequest>>,
    pub responses: std::sync::Mutex<Vec<RawResponse>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_response(&self, response: RawResponse) {
        self.responses.lock().unwrap().push(response);
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, req: &PreparedRequest) -> Result<RawResponse, HttpClientError> {
        self.requests.lock().unwrap().push(req.clone());
        let mut queue = self.responses.lock().unwrap();
        if queue.is_empty() {
            Ok(RawResponse { status: 200, headers: Vec::new(), body: Vec::new() })
        } else {
            Ok(queue.remove(0))
        }
    }
}

pub type HeaderMap = HashMap<String, String>;
