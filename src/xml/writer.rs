// Object tree -> XML text
//
// Tree conventions:
// - `"@_name": value`     attribute on the enclosing element
// - `"#text": value`      text content of the enclosing element
// - any other key         child element (usually `alias:name`)
// - arrays                repeated elements with the same name
// - `null`                omitted

use quick_xml::escape::escape;
use serde_json::{Map, Value};

use crate::core::errors::AdtError;

pub const ATTRIBUTE_PREFIX: &str = "@_";
pub const TEXT_KEY: &str = "#text";

const DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Serialise an object tree into an XML document
///
/// The tree must have exactly one non-null top-level key, the document element.
/// Only syntactic correctness is guaranteed; the element vocabulary is the caller's business.
pub fn build(tree: &Value) -> Result<String, AdtError> {
    let map = tree
        .as_object()
        .ok_or_else(|| AdtError::Xml("XML tree root must be an object".to_string()))?;

    let mut root: Option<(&String, &Value)> = None;
    for (key, value) in map {
        if key.starts_with(ATTRIBUTE_PREFIX) || key == TEXT_KEY {
            return Err(AdtError::Xml(format!(
                "'{}' is not allowed outside an element",
                key
            )));
        }
        if value.is_null() {
            continue;
        }
        if let Some((first, _)) = root {
            return Err(AdtError::Xml(format!(
                "XML tree has more than one root element: <{}> and <{}>",
                first, key
            )));
        }
        root = Some((key, value));
    }

    let (name, value) =
        root.ok_or_else(|| AdtError::Xml("XML tree has no root element".to_string()))?;
    if value.is_array() {
        return Err(AdtError::Xml(format!(
            "Root element <{}> cannot be repeated",
            name
        )));
    }

    let mut out = String::from(DECLARATION);
    write_element(name, value, &mut out)?;
    Ok(out)
}

fn write_element(name: &str, value: &Value, out: &mut String) -> Result<(), AdtError> {
    validate_name(name)?;
    match value {
        Value::Null => Ok(()),
        Value::Array(items) => {
            for item in items {
                write_element(name, item, out)?;
            }
            Ok(())
        }
        Value::Object(map) => write_object(name, map, out),
        scalar => {
            let text = scalar_text(scalar);
            out.push('<');
            out.push_str(name);
            out.push('>');
            out.push_str(&escape(&text));
            out.push_str("</");
            out.push_str(name);
            out.push('>');
            Ok(())
        }
    }
}

fn write_object(name: &str, map: &Map<String, Value>, out: &mut String) -> Result<(), AdtError> {
    out.push('<');
    out.push_str(name);

    let mut text: Option<String> = None;
    let mut children: Vec<(&String, &Value)> = Vec::new();
    for (key, value) in map {
        if value.is_null() {
            continue;
        }
        if let Some(attr) = key.strip_prefix(ATTRIBUTE_PREFIX) {
            validate_name(attr)?;
            if value.is_object() || value.is_array() {
                return Err(AdtError::Xml(format!(
                    "Attribute '{}' on <{}> must be a scalar",
                    attr, name
                )));
            }
            out.push(' ');
            out.push_str(attr);
            out.push_str("=\"");
            out.push_str(&escape(&scalar_text(value)));
            out.push('"');
        } else if key == TEXT_KEY {
            text = Some(scalar_text(value));
        } else {
            children.push((key, value));
        }
    }

    if text.is_none() && children.is_empty() {
        out.push_str("/>");
        return Ok(());
    }

    out.push('>');
    if let Some(text) = text {
        out.push_str(&escape(&text));
    }
    for (key, value) in children {
        write_element(key, value, out)?;
    }
    out.push_str("</");
    out.push_str(name);
    out.push('>');
    Ok(())
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn validate_name(name: &str) -> Result<(), AdtError> {
    let valid = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '.')
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'));
    if valid {
        Ok(())
    } else {
        Err(AdtError::Xml(format!("Invalid XML name '{}'", name)))
    }
}
