//! Declarative request-body encoding.
//!
//! SOAP method bodies are described as nested JSON mappings whose single
//! top-level key names the method. The reserved `_attributes` key holds XML
//! attributes for the enclosing element; every other key becomes an ordered
//! child element. The encoder is purely structural and performs no schema
//! validation; callers supply schema-correct mappings (see
//! [`crate::templates`]).

use crate::error::ClientError;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde_json::Value;

/// Reserved mapping key that carries XML attributes instead of children.
pub const ATTRIBUTES_KEY: &str = "_attributes";

/// An XML element under construction.
///
/// Names are stored verbatim, prefix included; namespace declarations are
/// ordinary attributes at this level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
    pub text: Option<String>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            text: None,
        }
    }

    /// Leaf element carrying only text content.
    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        let mut element = Self::new(name);
        element.text = Some(text.into());
        element
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.push((name.into(), value.into()));
    }

    pub fn push(&mut self, child: XmlElement) {
        self.children.push(child);
    }

    /// Serialize this element (and its subtree) without an XML declaration.
    pub fn to_xml(&self) -> Result<String, ClientError> {
        let mut writer = Writer::new(Vec::new());
        self.write_into(&mut writer)?;
        Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
    }

    /// Serialize as a standalone document, declaration included.
    pub fn to_document(&self) -> Result<String, ClientError> {
        let mut writer = Writer::new(Vec::new());
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        self.write_into(&mut writer)?;
        Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
    }

    fn write_into(&self, writer: &mut Writer<Vec<u8>>) -> Result<(), ClientError> {
        let mut start = BytesStart::new(self.name.as_str());
        for (name, value) in &self.attributes {
            start.push_attribute((name.as_str(), value.as_str()));
        }

        if self.children.is_empty() && self.text.is_none() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        if let Some(text) = &self.text {
            writer.write_event(Event::Text(BytesText::new(text)))?;
        }
        for child in &self.children {
            child.write_into(writer)?;
        }
        writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))?;
        Ok(())
    }
}

/// Build the body element for a SOAP method call from its schema mapping.
///
/// The mapping's single top-level key names the method; its value describes
/// the children. Child ordering follows the mapping's declared order.
pub fn encode_body(schema: &Value) -> Result<XmlElement, ClientError> {
    let map = schema
        .as_object()
        .ok_or_else(|| invalid("top-level schema must be a mapping"))?;
    let (method, value) = map
        .iter()
        .next()
        .ok_or_else(|| invalid("schema mapping is empty"))?;
    encode_element(method, value)
}

fn encode_element(name: &str, value: &Value) -> Result<XmlElement, ClientError> {
    let children = value
        .as_object()
        .ok_or_else(|| invalid(format!("element {name} must map to a mapping")))?;

    let mut element = XmlElement::new(name);
    for (key, child) in children {
        if key == ATTRIBUTES_KEY {
            let attributes = child
                .as_object()
                .ok_or_else(|| invalid(format!("{name}: {ATTRIBUTES_KEY} must be a flat mapping")))?;
            for (attr_name, attr_value) in attributes {
                element.set_attribute(attr_name, scalar_text(attr_value));
            }
        } else if child.is_object() {
            // Recurse into the child's own key/value pairs, scoped to its
            // parent. Recursing with the parent's full mapping here would
            // duplicate siblings into the child element.
            element.push(encode_element(key, child)?);
        } else {
            element.push(XmlElement::with_text(key, scalar_text(child)));
        }
    }
    Ok(element)
}

/// String form of a scalar schema value.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn invalid(message: impl Into<String>) -> ClientError {
    ClientError::InvalidSchema(message.into())
}
