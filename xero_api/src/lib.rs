//! Client for the Xero accounting API.
//!
//! Requests are signed with OAuth 1.0a and sent through a
//! [`SignedRequestExecutor`]. [`Client::call`] hides two service limits from
//! callers: collections are fetched page by page until an empty page comes
//! back, and writes too large or too long for one request are split into
//! sequential batches.

pub mod batch;
mod client;
pub mod codec;
pub mod config;
mod dispatch;
mod endpoint;
mod errors;
pub mod oauth;
mod paginate;
pub mod split;
mod transport;
mod types;

pub use async_trait::async_trait;

pub use self::batch::{BatchDescriptor, BatchPlan};
pub use self::client::Client;
pub use self::codec::{PayloadCodec, XmlJsonCodec};
pub use self::config::{ClientConfig, Limits};
pub use self::errors::{
    CodecError, Error, ErrorBody, ErrorElement, ServiceError, TransportError, ValidationError,
};
pub use self::oauth::{Credentials, OAuthSigner, Plaintext, RsaSha1, SignatureMethod};
pub use self::transport::{HttpExecutor, SignedRequest, SignedRequestExecutor};
pub use self::types::{Method, Params, Payload, Response, PAGE_PARAM};
