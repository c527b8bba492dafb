use anyhow::Result;
use serde_json::Value;
use xero_api::{Payload, PayloadCodec, Response, XmlJsonCodec};

#[derive(Clone, Debug)]
pub enum OutputFormat {
    Json,
    Xml,
}

pub fn print_response(resource: &str, response: Response, format: &OutputFormat) -> Result<()> {
    println!("{}", render_response(resource, response, format)?);
    Ok(())
}

/// Renders a call result. Raw bodies are passed through untouched in either
/// format; XML output wraps the records under `resource`.
fn render_response(resource: &str, response: Response, format: &OutputFormat) -> Result<String> {
    match (response, format) {
        (Response::Payload(Payload::Raw(body)), _) => Ok(body),
        (Response::Payload(Payload::Json(value)), OutputFormat::Json) => {
            Ok(serde_json::to_string_pretty(&value)?)
        }
        (Response::Records(records), OutputFormat::Json) => {
            Ok(serde_json::to_string_pretty(&records)?)
        }
        (response, OutputFormat::Xml) => {
            let records = response.into_records(resource);
            render_xml(resource, &records)
        }
    }
}

fn render_xml(resource: &str, records: &[Value]) -> Result<String> {
    let bytes = XmlJsonCodec::new().encode(resource, records)?;
    Ok(String::from_utf8(bytes)?)
}
