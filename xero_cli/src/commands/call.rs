use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use serde_json::Value;
use xero_api::{Client, Method, Params, Response, PAGE_PARAM};

use crate::output::{print_response, OutputFormat};

#[derive(Args)]
pub struct CallArgs {
    /// HTTP method: GET, PUT, POST or DELETE
    pub method: String,

    /// Resource path below the API root (e.g. /Contacts, /Invoices/INV-001)
    pub path: String,

    /// Query parameter as key=value (repeatable)
    #[arg(long = "param", value_parser = parse_param)]
    pub params: Vec<(String, String)>,

    /// JSON file holding the records to send (an array, or a single object)
    #[arg(long)]
    pub body: Option<PathBuf>,

    /// File sent byte for byte as the request body (e.g. an attachment)
    #[arg(long, conflicts_with = "body")]
    pub raw_body: Option<PathBuf>,

    /// Content type sent with --raw-body
    #[arg(long, requires = "raw_body")]
    pub content_type: Option<String>,

    /// Fetch only this page instead of every page
    #[arg(long)]
    pub page: Option<u32>,
}

pub async fn run(args: &CallArgs, client: &Client, format: &OutputFormat) -> Result<()> {
    let method: Method = args.method.parse().map_err(anyhow::Error::msg)?;

    let mut params: Params = args.params.iter().cloned().collect();
    if let Some(page) = args.page {
        params.insert(PAGE_PARAM.to_string(), page.to_string());
    }

    if let Some(path) = &args.raw_body {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        tracing::debug!("{} {} with {} raw bytes", method, args.path, bytes.len());
        let response = client
            .send_raw(
                method,
                &args.path,
                bytes,
                args.content_type.as_deref(),
                Some(&params),
            )
            .await?;
        return print_response(&resource_of(&args.path), response, format);
    }

    let body = match &args.body {
        Some(path) => Some(load_records(path)?),
        None => None,
    };

    tracing::debug!(
        "{} {} with {} params and {} records",
        method,
        args.path,
        params.len(),
        body.as_ref().map_or(0, Vec::len)
    );
    let response = client
        .call(method, &args.path, body.as_deref(), Some(&params))
        .await?;

    if let Response::Records(records) = &response {
        eprintln!("{} records", records.len());
    }
    print_response(&resource_of(&args.path), response, format)
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got {:?}", raw)),
    }
}

fn load_records(path: &Path) -> Result<Vec<Value>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: Value = serde_json::from_str(&text)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    records_from(value)
}

fn records_from(value: Value) -> Result<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        obj @ Value::Object(_) => Ok(vec![obj]),
        other => bail!("body must be a JSON array or object, got {}", other),
    }
}

/// First path segment, used as the XML root and the result key.
fn resource_of(path: &str) -> String {
    path.split(['/', '?'])
        .find(|segment| !segment.is_empty())
        .unwrap_or_default()
        .to_string()
}
