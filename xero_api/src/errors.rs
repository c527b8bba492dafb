//! Error types for the API client.

use serde::{Deserialize, Serialize};

use crate::batch::BatchDescriptor;

/// Errors that can occur when making API requests.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The signed request could not complete and no structured error body came back.
    #[error("Request failed: {0}")]
    Transport(#[from] TransportError),
    /// The API rejected the request with a structured error body.
    #[error("Service rejected request{}: {}", fmt_status(.status), .detail.summary())]
    Service {
        /// HTTP status, or `None` when a 200 response carried a non-OK `Status`.
        status: Option<u16>,
        detail: ServiceError,
    },
    /// A split write stopped part-way. Requests before `failed` were committed
    /// remotely and are not rolled back.
    #[error("{failed} failed after {completed} of {total} requests succeeded")]
    PartialBatchFailure {
        completed: usize,
        total: usize,
        failed: BatchDescriptor,
        #[source]
        source: Box<Error>,
    },
    /// A page after the first came back without a structured body, so the
    /// collection could not be completed.
    #[error("Page {page} returned an unstructured body after {fetched} records")]
    UnstructuredPage {
        page: u32,
        fetched: usize,
        body: String,
    },
    /// The request body could not be encoded.
    #[error("Failed to encode payload: {0}")]
    Encode(#[from] CodecError),
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The request path has no leading resource segment.
    #[error("Invalid resource path: {0:?}")]
    InvalidPath(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

fn fmt_status(status: &Option<u16>) -> String {
    match status {
        Some(status) => format!(" with status {}", status),
        None => String::new(),
    }
}

/// Failures raised by a [`SignedRequestExecutor`](crate::SignedRequestExecutor).
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    /// The API answered with a non-success status.
    #[error("Request failed with status {status}")]
    Status { status: u16, body: String },
    /// The OAuth header could not be produced.
    #[error("Failed to sign request: {0}")]
    Signing(String),
}

impl TransportError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            Self::Status { status, .. } => Some(*status),
            Self::Signing(_) => None,
        }
    }

    /// The response body attached to the failure, if the server sent one.
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Status { body, .. } => Some(body.as_str()),
            _ => None,
        }
    }
}

/// Failures raised by a [`PayloadCodec`](crate::PayloadCodec).
#[derive(thiserror::Error, Debug)]
pub enum CodecError {
    #[error("XML write failed: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("JSON conversion failed: {0}")]
    Json(#[from] serde_json::Error),
    /// A record was not a JSON object and has no element representation.
    #[error("Record {index} is not an object")]
    NotAnObject { index: usize },
}

/// Structured error document returned by the accounting API.
///
/// Distinguishes the overall outcome (`error_number`, `kind`, `message`,
/// `status`) from the per-element validation messages in `elements`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceError {
    #[serde(default)]
    pub error_number: Option<i64>,
    #[serde(default, rename = "Type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub elements: Vec<ErrorElement>,
}

/// Validation outcome for one element of the submitted collection.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorElement {
    #[serde(default)]
    pub validation_errors: Vec<ValidationError>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ValidationError {
    #[serde(default)]
    pub message: String,
}

impl ServiceError {
    /// All per-element validation messages, in element order.
    pub fn validation_messages(&self) -> Vec<&str> {
        self.elements
            .iter()
            .flat_map(|e| e.validation_errors.iter())
            .map(|v| v.message.as_str())
            .collect()
    }

    fn summary(&self) -> String {
        let head = self
            .message
            .as_deref()
            .or(self.kind.as_deref())
            .or(self.status.as_deref())
            .unwrap_or("unknown error");
        match self.validation_messages().len() {
            0 => head.to_string(),
            n => format!("{} ({} validation errors)", head, n),
        }
    }
}

/// An error response body after classification.
///
/// Bodies that match the [`ServiceError`] shape are `Parsed`; anything else is
/// kept verbatim as `Raw`.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorBody {
    Parsed(ServiceError),
    Raw(String),
}

impl ErrorBody {
    pub fn classify(body: &str) -> Self {
        match serde_json::from_str::<ServiceError>(body) {
            Ok(detail) => Self::Parsed(detail),
            Err(_) => Self::Raw(body.to_string()),
        }
    }
}
