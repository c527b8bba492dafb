//! Request and response shapes shared by the orchestration layers.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde_json::Value;

/// Query parameters attached to a call, kept sorted for stable URLs.
pub type Params = BTreeMap<String, String>;

/// Query parameter carrying the 1-indexed page number.
pub const PAGE_PARAM: &str = "page";

/// HTTP methods accepted by the accounting API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }

    /// Whether the method writes to the remote side.
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Method::Get)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "PUT" => Ok(Method::Put),
            "POST" => Ok(Method::Post),
            "DELETE" => Ok(Method::Delete),
            other => Err(format!("unsupported method {:?}", other)),
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Put => reqwest::Method::PUT,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A decoded response body.
///
/// Some endpoints answer with plain text (or nothing at all), so a body that
/// does not decode is kept as `Raw` instead of being treated as a failure.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Raw(String),
}

impl Payload {
    /// Takes the records stored under `resource`.
    ///
    /// An array yields its elements and a lone object yields itself. A missing
    /// key, any other value, or a `Raw` body yields no records.
    pub fn into_records(self, resource: &str) -> Vec<Value> {
        let Payload::Json(Value::Object(mut map)) = self else {
            return Vec::new();
        };
        match map.remove(resource) {
            Some(Value::Array(items)) => items,
            Some(obj @ Value::Object(_)) => vec![obj],
            _ => Vec::new(),
        }
    }
}

/// What [`Client::call`](crate::Client::call) hands back.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Records gathered across every page or batch of the call.
    Records(Vec<Value>),
    /// The body of a single, directly dispatched request.
    Payload(Payload),
}

impl Response {
    /// Records of an aggregated call, or the records under `resource` for a
    /// direct one.
    pub fn into_records(self, resource: &str) -> Vec<Value> {
        match self {
            Response::Records(records) => records,
            Response::Payload(payload) => payload.into_records(resource),
        }
    }
}
