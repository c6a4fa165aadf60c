//! Schema document construction from a semantic model

use serde_json::{Map, Value};

use crate::domain::model::{RoleBinding, SemanticModel};

/// Builds the `Schema` document published for a model.
///
/// Collection keys such as `cubes` or `hierarchies` become singular element
/// names (`Cube`, `Hierarchy`). Role bindings are rendered as `Role` elements.
pub fn schema_document(model: &SemanticModel, schema: &Value) -> Value {
    let mut root = Map::new();
    root.insert("name".to_string(), Value::String(model.name().to_string()));

    if let Value::Object(fields) = schema {
        for (key, value) in fields {
            if key == "name" {
                continue;
            }
            let (key, value) = convert_entry(key, value);
            root.insert(key, value);
        }
    }

    let roles: Vec<Value> = model.roles().iter().map(role_element).collect();
    if !roles.is_empty() {
        root.insert("Role".to_string(), Value::Array(roles));
    }

    let mut document = Map::new();
    document.insert("Schema".to_string(), Value::Object(root));
    Value::Object(document)
}

/// Number of cubes declared in a schema
pub fn cube_count(schema: &Value) -> usize {
    schema
        .get("cubes")
        .and_then(Value::as_array)
        .map(Vec::len)
        .unwrap_or(0)
}

fn role_element(role: &RoleBinding) -> Value {
    let mut element = match convert_value(&role.options) {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    element.insert("name".to_string(), Value::String(role.name.clone()));
    Value::Object(element)
}

fn convert_entry(key: &str, value: &Value) -> (String, Value) {
    match value {
        Value::Array(_) | Value::Object(_) => (element_name(key), convert_value(value)),
        _ => (key.to_string(), value.clone()),
    }
}

fn convert_value(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(convert_value).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| {
                    if key.starts_with('$') || key == "_" {
                        (key.clone(), value.clone())
                    } else {
                        convert_entry(key, value)
                    }
                })
                .collect(),
        ),
        scalar => scalar.clone(),
    }
}

/// `cubes` -> `Cube`, `hierarchies` -> `Hierarchy`, `Table` stays `Table`
fn element_name(key: &str) -> String {
    if key.starts_with("__") || key.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
        return key.to_string();
    }

    let singular = if let Some(stem) = key.strip_suffix("ies") {
        format!("{}y", stem)
    } else if key.ends_with('s') && !key.ends_with("ss") {
        key[..key.len() - 1].to_string()
    } else {
        key.to_string()
    };

    let mut chars = singular.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => singular,
    }
}
