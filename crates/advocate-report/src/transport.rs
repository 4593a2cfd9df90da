//! Transport abstraction for the remote report service.
//!
//! The engine only needs "send a request, get status and body back".
//! [`HttpTransport`] is the reqwest-backed implementation; tests substitute
//! their own.

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::types::{ReportError, ReportResult};

/// HTTP method of a transport request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A request as shaped by the engine.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// Raw response from the remote service.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends a single request to the report service.
///
/// Implementations must not retry on their own: a failed send is reported
/// as [`ReportError::TransportFailure`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> ReportResult<TransportResponse>;
}

/// Transport over HTTP(S) to a fixed API endpoint.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpTransport {
    /// Create a transport for `endpoint` with a per-request timeout.
    pub fn new(endpoint: Url, timeout: Duration) -> ReportResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| ReportError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> ReportResult<TransportResponse> {
        let mut builder = match request.method {
            Method::Get => self.client.get(self.endpoint.clone()),
            Method::Post => self.client.post(self.endpoint.clone()),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .body(request.body)
            .send()
            .await
            .map_err(|e| ReportError::TransportFailure(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ReportError::TransportFailure(e.to_string()))?;

        Ok(TransportResponse { status, body })
    }
}
