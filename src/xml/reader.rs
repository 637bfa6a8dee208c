// quick-xml events -> XmlNode tree

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::BTreeMap;

use super::XmlNode;
use crate::core::errors::AdtError;

/// Parse a document into a namespace-preserving tree rooted at its document element
pub fn parse(xml: &str) -> Result<XmlNode, AdtError> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                stack.push(open_element(e)?);
            }
            Ok(Event::Empty(ref e)) => {
                let node = open_element(e)?;
                attach(&mut stack, &mut root, node)?;
            }
            Ok(Event::End(_)) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| AdtError::Xml("Unexpected closing tag".to_string()))?;
                attach(&mut stack, &mut root, node)?;
            }
            Ok(Event::Text(ref e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| AdtError::Xml(format!("Invalid text: {}", err)))?;
                append_text(&mut stack, &text);
            }
            Ok(Event::CData(ref e)) => {
                let text = std::str::from_utf8(e.as_ref())
                    .map_err(|err| AdtError::Xml(format!("Invalid CDATA: {}", err)))?;
                append_text(&mut stack, text);
            }
            Ok(Event::Eof) => break,
            // declarations, comments, processing instructions, doctype
            Ok(_) => {}
            Err(err) => {
                return Err(AdtError::Xml(format!(
                    "Parse error at position {}: {}",
                    reader.buffer_position(),
                    err
                )))
            }
        }
    }

    if let Some(open) = stack.last() {
        return Err(AdtError::Xml(format!("Unclosed element <{}>", open.name)));
    }
    root.ok_or_else(|| AdtError::Xml("Empty document: no root element".to_string()))
}

fn open_element(e: &BytesStart) -> Result<XmlNode, AdtError> {
    let name = std::str::from_utf8(e.name().as_ref())
        .map_err(|err| AdtError::Xml(format!("Invalid element name: {}", err)))?
        .to_string();

    let mut attributes = BTreeMap::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| AdtError::Xml(format!("Invalid attribute: {}", err)))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|err| AdtError::Xml(format!("Invalid attribute name: {}", err)))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|err| AdtError::Xml(format!("Invalid attribute value: {}", err)))?
            .into_owned();
        attributes.insert(key, value);
    }

    Ok(XmlNode {
        name,
        attributes,
        children: Vec::new(),
        text: None,
    })
}

fn attach(
    stack: &mut [XmlNode],
    root: &mut Option<XmlNode>,
    node: XmlNode,
) -> Result<(), AdtError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
        return Ok(());
    }
    if root.is_some() {
        return Err(AdtError::Xml(format!(
            "Multiple root elements: <{}> after document element",
            node.name
        )));
    }
    *root = Some(node);
    Ok(())
}

// Whitespace-only runs between elements are formatting, not content
fn append_text(stack: &mut [XmlNode], text: &str) {
    let Some(parent) = stack.last_mut() else {
        return;
    };
    if text.chars().all(char::is_whitespace) && parent.text.is_none() {
        return;
    }
    match parent.text.as_mut() {
        Some(existing) => existing.push_str(text),
        None => parent.text = Some(text.to_string()),
    }
}
