//! Entry point for calls against the accounting API.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::batch::BatchPlanner;
use crate::codec::{PayloadCodec, XmlJsonCodec};
use crate::config::ClientConfig;
use crate::dispatch::Dispatcher;
use crate::endpoint::Endpoint;
use crate::errors::CodecError;
use crate::paginate::Paginator;
use crate::transport::SignedRequestExecutor;
use crate::types::{Method, Params, Response};
use crate::Error;

/// Client for the accounting API.
///
/// Reads without an explicit `page` are paginated until an empty page comes
/// back, and writes are split into several requests when they exceed the
/// service's size or element budgets. Both happen behind [`Client::call`].
/// Rounds within one call are strictly sequential; separate calls share
/// nothing mutable and may run concurrently on clones of the same client.
#[derive(Clone)]
pub struct Client {
    config: Arc<ClientConfig>,
    dispatcher: Dispatcher,
}

impl Client {
    /// Creates a client for the production API with default limits.
    pub fn new(executor: impl SignedRequestExecutor + 'static) -> Self {
        Self::from_parts(Arc::new(executor), ClientConfig::default())
    }

    /// Creates a client with explicit configuration, rejecting invalid limits
    /// or base URLs up front.
    pub fn with_config(
        executor: impl SignedRequestExecutor + 'static,
        config: ClientConfig,
    ) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self::from_parts(Arc::new(executor), config))
    }

    /// Creates a client with a custom base URL. Used for testing with wiremock.
    pub fn with_base_url(base_url: &str, executor: impl SignedRequestExecutor + 'static) -> Self {
        Self::from_parts(
            Arc::new(executor),
            ClientConfig {
                base_url: base_url.to_string(),
                ..ClientConfig::default()
            },
        )
    }

    fn from_parts(executor: Arc<dyn SignedRequestExecutor>, config: ClientConfig) -> Self {
        Self {
            config: Arc::new(config),
            dispatcher: Dispatcher::new(executor, Arc::new(XmlJsonCodec::new())),
        }
    }

    /// Replaces the wire codec.
    pub fn with_codec(self, codec: impl PayloadCodec + 'static) -> Self {
        Self {
            dispatcher: self.dispatcher.with_codec(Arc::new(codec)),
            config: self.config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Performs one logical call.
    ///
    /// * A mutating method with a non-empty `body` is planned into as many
    ///   requests as the budgets require; the echoed records come back as
    ///   [`Response::Records`].
    /// * `GET` without a `page` parameter fetches every page and returns
    ///   [`Response::Records`], or the first page itself as
    ///   [`Response::Payload`] when it is not structured.
    /// * Anything else is one request returning [`Response::Payload`]: a
    ///   `GET` for a specific page, a write without a body, or an empty body
    ///   sent as an empty collection.
    ///
    /// `body` is ignored for `GET`.
    pub async fn call<R: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&[R]>,
        params: Option<&Params>,
    ) -> Result<Response, Error> {
        let endpoint = Endpoint::new(&self.config, path)?;

        if method.is_mutating() {
            if let Some(body) = body {
                let records = to_records(body)?;
                if !records.is_empty() {
                    return BatchPlanner::new(&self.dispatcher, &self.config.limits)
                        .send(method, &endpoint, &records, params)
                        .await
                        .map(Response::Records);
                }
                let encoded = self.dispatcher.codec().encode(endpoint.resource(), &records)?;
                return self
                    .dispatcher
                    .dispatch(method, endpoint.url(params, None), Some(encoded), None)
                    .await
                    .map(Response::Payload);
            }
        } else if !endpoint.has_explicit_page(params) {
            return Paginator::new(&self.dispatcher)
                .fetch_all(&endpoint, params)
                .await;
        }

        self.dispatcher
            .dispatch(method, endpoint.url(params, None), None, None)
            .await
            .map(Response::Payload)
    }

    /// Sends `body` as-is in one request, for uploads such as attachments.
    ///
    /// The bytes skip the codec, batching and paging. `content_type` is sent
    /// only when given. The response is decoded like any other.
    pub async fn send_raw(
        &self,
        method: Method,
        path: &str,
        body: Vec<u8>,
        content_type: Option<&str>,
        params: Option<&Params>,
    ) -> Result<Response, Error> {
        let endpoint = Endpoint::new(&self.config, path)?;
        self.dispatcher
            .dispatch_raw(
                method,
                endpoint.url(params, None),
                body,
                content_type.map(str::to_string),
            )
            .await
            .map(Response::Payload)
    }

    /// `GET` a resource; see [`Client::call`].
    pub async fn get(&self, path: &str, params: Option<&Params>) -> Result<Response, Error> {
        self.call::<Value>(Method::Get, path, None, params).await
    }

    /// `PUT` records to a resource; see [`Client::call`].
    pub async fn put<R: Serialize>(
        &self,
        path: &str,
        body: &[R],
        params: Option<&Params>,
    ) -> Result<Response, Error> {
        self.call(Method::Put, path, Some(body), params).await
    }

    /// `POST` records to a resource; see [`Client::call`].
    pub async fn post<R: Serialize>(
        &self,
        path: &str,
        body: &[R],
        params: Option<&Params>,
    ) -> Result<Response, Error> {
        self.call(Method::Post, path, Some(body), params).await
    }

    /// `DELETE` a resource; see [`Client::call`].
    pub async fn delete(&self, path: &str, params: Option<&Params>) -> Result<Response, Error> {
        self.call::<Value>(Method::Delete, path, None, params).await
    }
}

fn to_records<R: Serialize>(body: &[R]) -> Result<Vec<Value>, Error> {
    body.iter()
        .map(|record| serde_json::to_value(record).map_err(|e| Error::Encode(CodecError::from(e))))
        .collect()
}
