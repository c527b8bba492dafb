#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use xero_api::{async_trait, SignedRequest, SignedRequestExecutor, TransportError};

type Responder = dyn Fn(usize, &SignedRequest) -> Result<String, TransportError> + Send + Sync;

/// In-memory executor that records every request and answers from a script.
///
/// The responder receives the 0-based request index and the request.
#[derive(Clone)]
pub struct ScriptedExecutor {
    log: Arc<Mutex<Vec<SignedRequest>>>,
    respond: Arc<Responder>,
}

impl ScriptedExecutor {
    pub fn new(
        respond: impl Fn(usize, &SignedRequest) -> Result<String, TransportError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            log: Arc::new(Mutex::new(Vec::new())),
            respond: Arc::new(respond),
        }
    }

    pub fn requests(&self) -> Vec<SignedRequest> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl SignedRequestExecutor for ScriptedExecutor {
    async fn execute(&self, request: SignedRequest) -> Result<String, TransportError> {
        let index = {
            let mut log = self.log.lock().unwrap();
            log.push(request.clone());
            log.len() - 1
        };
        (self.respond)(index, &request)
    }
}

pub fn query(request: &SignedRequest, key: &str) -> Option<String> {
    request
        .url
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

pub fn contacts(names: impl IntoIterator<Item = String>) -> Vec<Value> {
    names.into_iter().map(|name| json!({ "Name": name })).collect()
}

pub fn numbered_contacts(count: usize) -> Vec<Value> {
    contacts((0..count).map(|i| format!("Contact {:04}", i)))
}

/// Names inside `<Name>` elements of an encoded body, in document order.
pub fn names_in(body: &[u8]) -> Vec<String> {
    let text = String::from_utf8_lossy(body);
    text.split("<Name>")
        .skip(1)
        .filter_map(|chunk| chunk.split("</Name>").next())
        .map(str::to_string)
        .collect()
}

/// Success body echoing the contacts found in a write request.
pub fn echo(request: &SignedRequest) -> String {
    let names = request.body.as_deref().map(names_in).unwrap_or_default();
    json!({ "Status": "OK", "Contacts": contacts(names) }).to_string()
}

pub fn contact_page(page: usize, size: usize) -> String {
    let names = (0..size).map(|i| format!("p{}-{}", page, i));
    json!({ "Status": "OK", "Contacts": contacts(names) }).to_string()
}

pub fn validation_failure(message: &str) -> TransportError {
    TransportError::Status {
        status: 400,
        body: json!({
            "ErrorNumber": 10,
            "Type": "ValidationException",
            "Message": "A validation exception occurred",
            "Elements": [{ "ValidationErrors": [{ "Message": message }] }]
        })
        .to_string(),
    }
}

pub fn record_names(records: &[Value]) -> Vec<String> {
    records
        .iter()
        .map(|r| r["Name"].as_str().unwrap_or_default().to_string())
        .collect()
}
