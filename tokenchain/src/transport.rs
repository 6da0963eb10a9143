//! HTTP seam between the orchestrator and the network.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use crate::error::{FlowError, FlowResult, TransportError};
use crate::session::Step;

/// A fully assembled request for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub step: Step,
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

impl OutboundRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status and undecoded body of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send the request. Only failures to get any response are errors here;
    /// status handling is left to the caller.
    async fn send(&self, request: OutboundRequest) -> Result<RawResponse, TransportError>;
}

#[async_trait]
impl<T: HttpTransport + ?Sized> HttpTransport for std::sync::Arc<T> {
    async fn send(&self, request: OutboundRequest) -> Result<RawResponse, TransportError> {
        (**self).send(request).await
    }
}

/// Production transport backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> FlowResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("tokenchain/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FlowError::Config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: OutboundRequest) -> Result<RawResponse, TransportError> {
        let step = request.step;
        debug!(step = %step, method = %request.method, url = %request.url, "Sending request");

        // Headers are pre-merged, so the body is attached raw rather than via
        // `.json()`, which would add a second content type.
        let mut builder = self.client.request(request.method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = builder.body(request.body.to_string());

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::network(step, format!("Request failed: {}", e)))?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            TransportError::network(step, format!("Failed to read response body: {}", e))
        })?;

        debug!(step = %step, status, bytes = body.len(), "Received response");
        Ok(RawResponse { status, body })
    }
}
