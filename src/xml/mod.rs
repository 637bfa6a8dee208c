// XML codec - namespace-agnostic tree reader and object-tree builder
//
// The backend emits the same logical element under different namespace
// prefixes depending on release, so every lookup matches on the local
// part of a name only.

mod reader;
mod writer;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use reader::parse;
pub use writer::{build, ATTRIBUTE_PREFIX, TEXT_KEY};

/// A parsed element: qualified name, attributes, child elements, and text
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct XmlNode {
    /// Namespace-qualified tag name as written in the document (`adtcore:name`)
    pub name: String,
    pub attributes: BTreeMap<String, String>,
    pub children: Vec<XmlNode>,
    /// Concatenated text content, `None` when the element has no non-whitespace text
    pub text: Option<String>,
}

impl XmlNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    /// First direct child with the given local name
    pub fn child(&self, local: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.local_name() == local)
    }

    pub fn attribute(&self, local: &str) -> Option<&str> {
        get_attribute(self, local)
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

/// Part of a qualified name after the last `:`
pub fn local_name(name: &str) -> &str {
    match name.rfind(':') {
        Some(idx) => &name[idx + 1..],
        None => name,
    }
}

/// Every element in `tree` (including `tree` itself) whose local name matches, in document order
pub fn find_elements<'a>(tree: &'a XmlNode, local: &str) -> Vec<&'a XmlNode> {
    let mut found = Vec::new();
    collect(tree, local, &mut found);
    found
}

fn collect<'a>(node: &'a XmlNode, local: &str, found: &mut Vec<&'a XmlNode>) {
    if node.local_name() == local {
        found.push(node);
    }
    for child in &node.children {
        collect(child, local, found);
    }
}

/// Text of the first element matching `local`, trimmed
pub fn find_text<'a>(tree: &'a XmlNode, local: &str) -> Option<&'a str> {
    find_elements(tree, local)
        .into_iter()
        .find_map(|node| node.text.as_deref())
        .map(str::trim)
        .filter(|text| !text.is_empty())
}

/// Attribute value matched on local name; namespace declarations never match
pub fn get_attribute<'a>(node: &'a XmlNode, local: &str) -> Option<&'a str> {
    node.attributes
        .iter()
        .filter(|(key, _)| *key != "xmlns" && !key.starts_with("xmlns:"))
        .find(|(key, _)| local_name(key) == local)
        .map(|(_, value)| value.as_str())
}
