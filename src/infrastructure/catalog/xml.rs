//! Object to XML marshalling for schema catalogs
//!
//! Objects map to elements. Scalar lower-camel keys become attributes,
//! `$` holds explicit attributes and `_` holds element text. Parsing is the
//! mirror image: attributes fold back into the object, repeated child
//! elements are always arrays and `true`/`false` literals become booleans.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde_json::{Map, Value};

use crate::domain::DomainError;

const ATTRIBUTES_KEY: &str = "$";
const TEXT_KEY: &str = "_";
const DEFAULT_ROOT: &str = "root";

/// Serializes an object into an XML document.
///
/// A single-key object names the root element, anything else is wrapped
/// in `<root>`.
pub fn build_schema(input: &Value) -> Result<String, DomainError> {
    let prepared = prepare(input.clone());

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
        .map_err(xml_error)?;

    match &prepared {
        Value::Object(map) if map.len() == 1 => {
            for (name, value) in map {
                write_element(&mut writer, name, value)?;
            }
        }
        other => write_element(&mut writer, DEFAULT_ROOT, other)?,
    }

    String::from_utf8(writer.into_inner()).map_err(|e| DomainError::catalog(e.to_string()))
}

/// Parses an XML document back into an object keyed by its root element
pub fn parse_schema(input: &str) -> Result<Value, DomainError> {
    let mut reader = Reader::from_str(input);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<(String, Value)> = None;

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(start) => stack.push(Node::open(&start)?),
            Event::Empty(start) => {
                let node = Node::open(&start)?;
                close(node, &mut stack, &mut root);
            }
            Event::Text(text) => {
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&text.unescape().map_err(xml_error)?);
                }
            }
            Event::CData(data) => {
                if let Some(node) = stack.last_mut() {
                    let data = std::str::from_utf8(data.as_ref())
                        .map_err(|e| DomainError::catalog(e.to_string()))?;
                    node.text.push_str(data);
                }
            }
            Event::End(_) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| DomainError::catalog("Unbalanced closing tag"))?;
                close(node, &mut stack, &mut root);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(DomainError::catalog("Unexpected end of document"));
    }

    let (name, value) = root.ok_or_else(|| DomainError::catalog("Document has no root element"))?;
    let mut document = Map::new();
    document.insert(name, value);
    Ok(Value::Object(document))
}

/// Lower-camel keys are the ones lodash-style camel casing leaves unchanged
fn is_lower_camel(key: &str) -> bool {
    let mut chars = key.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_ascii_lowercase() {
        return false;
    }

    let mut previous_upper = false;
    for c in chars {
        if !c.is_ascii_alphanumeric() {
            return false;
        }
        let upper = c.is_ascii_uppercase();
        if upper && previous_upper {
            return false;
        }
        previous_upper = upper;
    }
    true
}

fn is_internal_key(key: &str) -> bool {
    key.len() > 4 && key.starts_with("__") && key.ends_with("__")
}

fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

/// Strips internal and null keys and moves scalar lower-camel keys into `$`
fn prepare(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.into_iter().map(prepare).collect()),
        Value::Object(map) => {
            let mut attributes = Map::new();
            let mut object = Map::new();

            for (key, value) in map {
                if value.is_null() || is_internal_key(&key) {
                    continue;
                }
                if key == ATTRIBUTES_KEY {
                    if let Value::Object(explicit) = value {
                        attributes.extend(explicit.into_iter().filter(|(_, v)| !v.is_null()));
                    }
                } else if key == TEXT_KEY {
                    object.insert(key, value);
                } else if is_lower_camel(&key) && is_scalar(&value) {
                    attributes.insert(key, value);
                } else {
                    object.insert(key, prepare(value));
                }
            }

            if !attributes.is_empty() {
                object.insert(ATTRIBUTES_KEY.to_string(), Value::Object(attributes));
            }
            Value::Object(object)
        }
        scalar => scalar,
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    value: &Value,
) -> Result<(), DomainError> {
    match value {
        Value::Null => Ok(()),
        Value::Array(items) => {
            for item in items {
                write_element(writer, name, item)?;
            }
            Ok(())
        }
        Value::Object(map) => {
            let mut start = BytesStart::new(name);
            if let Some(Value::Object(attributes)) = map.get(ATTRIBUTES_KEY) {
                for (key, value) in attributes {
                    let text = scalar_text(value);
                    start.push_attribute((key.as_str(), text.as_str()));
                }
            }

            let text = map.get(TEXT_KEY).map(scalar_text);
            let children: Vec<_> = map
                .iter()
                .filter(|(key, _)| *key != ATTRIBUTES_KEY && *key != TEXT_KEY)
                .collect();

            if children.is_empty() && text.is_none() {
                return writer.write_event(Event::Empty(start)).map_err(xml_error);
            }

            writer.write_event(Event::Start(start)).map_err(xml_error)?;
            if let Some(text) = text {
                writer
                    .write_event(Event::Text(BytesText::new(&text)))
                    .map_err(xml_error)?;
            }
            for (key, value) in children {
                write_element(writer, key, value)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new(name)))
                .map_err(xml_error)
        }
        scalar => {
            let text = scalar_text(scalar);
            if text.is_empty() {
                return writer
                    .write_event(Event::Empty(BytesStart::new(name)))
                    .map_err(xml_error);
            }
            writer
                .write_event(Event::Start(BytesStart::new(name)))
                .map_err(xml_error)?;
            writer
                .write_event(Event::Text(BytesText::new(&text)))
                .map_err(xml_error)?;
            writer
                .write_event(Event::End(BytesEnd::new(name)))
                .map_err(xml_error)
        }
    }
}

/// Element under construction while parsing
struct Node {
    name: String,
    attributes: Map<String, Value>,
    children: Map<String, Value>,
    text: String,
}

impl Node {
    fn open(start: &BytesStart<'_>) -> Result<Self, DomainError> {
        let name = std::str::from_utf8(start.name().as_ref())
            .map_err(|e| DomainError::catalog(e.to_string()))?
            .to_string();

        let mut attributes = Map::new();
        for attribute in start.attributes() {
            let attribute = attribute.map_err(xml_error)?;
            let key = std::str::from_utf8(attribute.key.as_ref())
                .map_err(|e| DomainError::catalog(e.to_string()))?
                .to_string();
            let value = attribute.unescape_value().map_err(xml_error)?;
            attributes.insert(key, coerce_boolean(&value));
        }

        Ok(Self {
            name,
            attributes,
            children: Map::new(),
            text: String::new(),
        })
    }

    fn into_value(self) -> Value {
        if self.attributes.is_empty() && self.children.is_empty() {
            return coerce_boolean(&self.text);
        }

        let mut object = self.children;
        if !self.text.is_empty() {
            object.insert(TEXT_KEY.to_string(), coerce_boolean(&self.text));
        }
        object.extend(self.attributes);
        Value::Object(object)
    }
}

fn close(node: Node, stack: &mut [Node], root: &mut Option<(String, Value)>) {
    let name = node.name.clone();
    let value = node.into_value();

    match stack.last_mut() {
        Some(parent) => match parent.children.get_mut(&name) {
            Some(Value::Array(siblings)) => siblings.push(value),
            _ => {
                parent.children.insert(name, Value::Array(vec![value]));
            }
        },
        None => *root = Some((name, value)),
    }
}

fn coerce_boolean(text: &str) -> Value {
    if text.eq_ignore_ascii_case("true") {
        Value::Bool(true)
    } else if text.eq_ignore_ascii_case("false") {
        Value::Bool(false)
    } else {
        Value::String(text.to_string())
    }
}

fn xml_error(error: impl std::fmt::Display) -> DomainError {
    DomainError::catalog(format!("XML error: {}", error))
}
