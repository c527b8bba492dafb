//! Wire encoding: XML request bodies and JSON responses.

use std::io::Cursor;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde_json::Value;

use crate::errors::CodecError;

/// Converts records to request bodies and response bodies back to values.
pub trait PayloadCodec: Send + Sync {
    /// Content type sent alongside encoded bodies.
    fn content_type(&self) -> &str;

    /// Encodes `records` as the body of a write to the `resource` collection.
    fn encode(&self, resource: &str, records: &[Value]) -> Result<Vec<u8>, CodecError>;

    /// Decodes a response body. Callers fall back to the raw text on error.
    fn decode(&self, body: &str) -> Result<Value, CodecError>;
}

/// Maps a collection name to the name of one of its elements.
pub type Singularize = fn(&str) -> String;

/// Default [`Singularize`] covering the plural forms used by the API's
/// collection names (`Invoices`, `TrackingCategories`, `Addresses`, ...).
pub fn singularize(word: &str) -> String {
    if let Some(stem) = word.strip_suffix("ies") {
        if !stem.is_empty() {
            return format!("{}y", stem);
        }
    }
    for suffix in ["sses", "xes", "ches", "shes"] {
        if word.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }
    if word.ends_with("ss") || word.ends_with("us") || word.ends_with("is") {
        return word.to_string();
    }
    word.strip_suffix('s').unwrap_or(word).to_string()
}

/// Writes XML documents rooted at the collection name and reads JSON.
///
/// A write of `[{"Name": "A"}]` to `Contacts` becomes
/// `<Contacts><Contact><Name>A</Name></Contact></Contacts>`. Null fields are
/// omitted, arrays wrap singular children, and nested objects nest.
#[derive(Clone)]
pub struct XmlJsonCodec {
    singularize: Singularize,
}

impl Default for XmlJsonCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlJsonCodec {
    pub fn new() -> Self {
        Self { singularize }
    }

    /// Uses a custom naming rule for element names.
    pub fn with_singularizer(singularize: Singularize) -> Self {
        Self { singularize }
    }

    fn write_document(
        &self,
        resource: &str,
        records: &[Value],
    ) -> Result<Vec<u8>, quick_xml::Error> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        if records.is_empty() {
            writer.write_event(Event::Empty(BytesStart::new(resource)))?;
        } else {
            let item_tag = (self.singularize)(resource);
            writer.write_event(Event::Start(BytesStart::new(resource)))?;
            for record in records {
                self.write_value(&mut writer, &item_tag, record)?;
            }
            writer.write_event(Event::End(BytesEnd::new(resource)))?;
        }

        Ok(writer.into_inner().into_inner())
    }

    fn write_value<W: std::io::Write>(
        &self,
        writer: &mut Writer<W>,
        tag: &str,
        value: &Value,
    ) -> Result<(), quick_xml::Error> {
        match value {
            Value::Null => {}
            Value::Bool(b) => write_text(writer, tag, if *b { "true" } else { "false" })?,
            Value::Number(n) => write_text(writer, tag, &n.to_string())?,
            Value::String(s) => write_text(writer, tag, s)?,
            Value::Array(items) => {
                writer.write_event(Event::Start(BytesStart::new(tag)))?;
                let child = (self.singularize)(tag);
                for item in items {
                    self.write_value(writer, &child, item)?;
                }
                writer.write_event(Event::End(BytesEnd::new(tag)))?;
            }
            Value::Object(map) => {
                writer.write_event(Event::Start(BytesStart::new(tag)))?;
                for (key, val) in map {
                    self.write_value(writer, key, val)?;
                }
                writer.write_event(Event::End(BytesEnd::new(tag)))?;
            }
        }
        Ok(())
    }
}

fn write_text<W: std::io::Write>(
    writer: &mut Writer<W>,
    tag: &str,
    text: &str,
) -> Result<(), quick_xml::Error> {
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

impl PayloadCodec for XmlJsonCodec {
    fn content_type(&self) -> &str {
        "application/xml"
    }

    fn encode(&self, resource: &str, records: &[Value]) -> Result<Vec<u8>, CodecError> {
        if let Some(index) = records.iter().position(|r| !r.is_object()) {
            return Err(CodecError::NotAnObject { index });
        }
        Ok(self.write_document(resource, records)?)
    }

    fn decode(&self, body: &str) -> Result<Value, CodecError> {
        Ok(serde_json::from_str(body)?)
    }
}
