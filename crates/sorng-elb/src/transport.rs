//! HTTP transport abstraction.
//!
//! The signing pipeline produces a plain [`HttpRequest`]; how it reaches the
//! service is up to an [`HttpTransport`]. [`ReqwestTransport`] is the real
//! network back-end, [`MockTransport`] replays canned responses and records
//! what was sent, for tests and offline use.

use crate::error::{ElbError, ElbResult};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// An outgoing HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    /// Lower-cased header names.
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl HttpRequest {
    /// Decode an `application/x-www-form-urlencoded` body.
    pub fn form_params(&self) -> BTreeMap<String, String> {
        url::form_urlencoded::parse(self.body.as_bytes())
            .into_owned()
            .collect()
    }
}

/// A received HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Lower-cased header names.
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl HttpResponse {
    /// A response with the given status and body and no headers.
    pub fn new(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: body.to_string(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_lowercase(), value.to_string());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(|s| s.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one request and returns one response.
#[async_trait]
pub trait HttpTransport: Send + Sync + std::fmt::Debug {
    async fn send(&self, request: HttpRequest) -> ElbResult<HttpResponse>;
}

// ── reqwest back-end ────────────────────────────────────────────────────

/// Network transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> ElbResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| ElbError::config(&format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { http })
    }

    pub fn from_client(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> ElbResult<HttpResponse> {
        let method: reqwest::Method = request
            .method
            .parse()
            .map_err(|_| ElbError::http(&format!("Invalid HTTP method: {}", request.method)))?;

        let mut req = self.http.request(method, &request.url);
        for (key, value) in &request.headers {
            req = req.header(key.as_str(), value.as_str());
        }
        if !request.body.is_empty() {
            req = req.body(request.body);
        }

        let resp = req.send().await?;

        let status = resp.status().as_u16();
        let mut headers = BTreeMap::new();
        for (key, value) in resp.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(key.as_str().to_lowercase(), v.to_string());
            }
        }
        let body = resp.text().await?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

// ── In-memory back-end ──────────────────────────────────────────────────

/// Transport that replays queued responses and records every request.
///
/// With nothing queued, `send` fails with an `Http` error.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<HttpResponse>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a response for the next request.
    pub async fn push_response(&self, response: HttpResponse) {
        self.responses.lock().await.push_back(response);
    }

    /// Queue a `200 OK` XML response.
    pub async fn push_xml(&self, body: &str) {
        self.push_response(
            HttpResponse::new(200, body)
                .with_header("content-type", "text/xml")
                .with_header("x-amzn-requestid", "cc77e3f2-4ecf-11df-9f81-21ac009b4e49"),
        )
        .await;
    }

    /// All requests sent so far.
    pub async fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn last_request(&self) -> Option<HttpRequest> {
        self.requests.lock().await.last().cloned()
    }

    pub async fn request_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> ElbResult<HttpResponse> {
        self.requests.lock().await.push(request);
        self.responses
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| ElbError::http("Error in request to AWS service: no response queued"))
    }
}
