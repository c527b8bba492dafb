//! Single-request dispatch with response decoding and error normalization.

use std::sync::Arc;

use serde_json::Value;
use url::Url;

use crate::batch::BatchDescriptor;
use crate::codec::PayloadCodec;
use crate::endpoint::path_and_query;
use crate::errors::{ErrorBody, ServiceError, TransportError};
use crate::transport::{SignedRequest, SignedRequestExecutor};
use crate::types::{Method, Payload};
use crate::Error;

/// Issues one request through the executor and interprets the outcome.
///
/// Holds no per-call state, so one instance serves every call of a client.
#[derive(Clone)]
pub(crate) struct Dispatcher {
    executor: Arc<dyn SignedRequestExecutor>,
    codec: Arc<dyn PayloadCodec>,
}

impl Dispatcher {
    pub(crate) fn new(
        executor: Arc<dyn SignedRequestExecutor>,
        codec: Arc<dyn PayloadCodec>,
    ) -> Self {
        Self { executor, codec }
    }

    pub(crate) fn codec(&self) -> &dyn PayloadCodec {
        self.codec.as_ref()
    }

    pub(crate) fn with_codec(&self, codec: Arc<dyn PayloadCodec>) -> Self {
        Self {
            executor: Arc::clone(&self.executor),
            codec,
        }
    }

    pub(crate) async fn dispatch(
        &self,
        method: Method,
        url: Url,
        body: Option<Vec<u8>>,
        batch: Option<&BatchDescriptor>,
    ) -> Result<Payload, Error> {
        match batch {
            Some(batch) => tracing::info!("{} {} [{}]", method, path_and_query(&url), batch),
            None => tracing::info!("{} {}", method, path_and_query(&url)),
        }

        let content_type = body
            .as_ref()
            .map(|_| self.codec.content_type().to_string());
        self.send(method, url, body, content_type).await
    }

    /// Sends `body` untouched, with `content_type` only when one is given.
    pub(crate) async fn dispatch_raw(
        &self,
        method: Method,
        url: Url,
        body: Vec<u8>,
        content_type: Option<String>,
    ) -> Result<Payload, Error> {
        tracing::info!("{} {} ({} raw bytes)", method, path_and_query(&url), body.len());
        self.send(method, url, Some(body), content_type).await
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<Vec<u8>>,
        content_type: Option<String>,
    ) -> Result<Payload, Error> {
        let request = SignedRequest {
            method,
            url,
            body,
            content_type,
        };

        match self.executor.execute(request).await {
            Ok(body) => self.decode_success(body),
            Err(err) => Err(normalize_error(err)),
        }
    }

    fn decode_success(&self, body: String) -> Result<Payload, Error> {
        let value = match self.codec.decode(&body) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!("Response is not structured ({}), returning raw body", e);
                return Ok(Payload::Raw(body));
            }
        };

        match value.get("Status").and_then(Value::as_str).map(str::to_string) {
            Some(status) if status != "OK" => {
                tracing::error!("Response reported status {}", status);
                let detail = serde_json::from_value::<ServiceError>(value).unwrap_or(ServiceError {
                    status: Some(status),
                    ..ServiceError::default()
                });
                Err(Error::Service { status: None, detail })
            }
            _ => Ok(Payload::Json(value)),
        }
    }
}

/// Attaches the parsed error document to a transport failure when its body
/// has one; otherwise hands the failure back unchanged.
pub(crate) fn normalize_error(err: TransportError) -> Error {
    let status = err.status();
    match err.body().map(ErrorBody::classify) {
        Some(ErrorBody::Parsed(detail)) => {
            tracing::error!(
                "Request rejected ({}): {} validation errors",
                status.map_or_else(|| "no status".to_string(), |s| s.to_string()),
                detail.validation_messages().len()
            );
            Error::Service { status, detail }
        }
        _ => {
            tracing::error!("Request failed: {}", err);
            Error::Transport(err)
        }
    }
}
