//! The signed HTTP transport the orchestration layer runs on.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use url::Url;

use crate::errors::TransportError;
use crate::oauth::OAuthSigner;
use crate::types::Method;

/// Request timeout for API calls. This is the only bound on a hung request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_USER_AGENT: &str = concat!("xero_api/", env!("CARGO_PKG_VERSION"));

/// One request, ready to be signed and sent.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub method: Method,
    pub url: Url,
    pub body: Option<Vec<u8>>,
    pub content_type: Option<String>,
}

/// Performs a signed network call and returns the raw response body.
///
/// Non-success responses must come back as [`TransportError::Status`] with
/// the body attached, so the dispatcher can look for a structured error.
#[async_trait]
pub trait SignedRequestExecutor: Send + Sync {
    async fn execute(&self, request: SignedRequest) -> Result<String, TransportError>;
}

/// [`SignedRequestExecutor`] backed by `reqwest`, signing each request with
/// an OAuth 1.0a header.
pub struct HttpExecutor {
    client: reqwest::Client,
    signer: OAuthSigner,
    headers: Vec<(String, String)>,
}

impl HttpExecutor {
    pub fn new(signer: OAuthSigner) -> Result<Self, TransportError> {
        Self::with_timeout(signer, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(signer: OAuthSigner, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            signer,
            headers: vec![(USER_AGENT.as_str().to_string(), DEFAULT_USER_AGENT.to_string())],
        })
    }

    /// Adds a header sent with every request, replacing any earlier value
    /// for the same name.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

#[async_trait]
impl SignedRequestExecutor for HttpExecutor {
    async fn execute(&self, request: SignedRequest) -> Result<String, TransportError> {
        let authorization = self.signer.authorization(request.method, &request.url)?;

        let mut builder = self
            .client
            .request(request.method.into(), request.url)
            .header(AUTHORIZATION, authorization)
            .header(ACCEPT, "application/json");
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(content_type) = request.content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let resp = builder.send().await.map_err(|e| {
            tracing::error!("Failed to send request: {}", e);
            TransportError::Network(e)
        })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| {
            tracing::error!("Failed to read response body: {}", e);
            TransportError::Network(e)
        })?;

        if !status.is_success() {
            tracing::warn!(
                "Request failed with status {}: {}",
                status,
                truncate_body(&body)
            );
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 2000;
    if body.len() <= MAX {
        body.to_string()
    } else {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...[truncated]", &body[..end])
    }
}
