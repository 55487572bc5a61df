use std::io::Write;

use log::debug;

use crate::error::{Error, Result};
use crate::from_xml::{is_name_char, HEADER_KEY};
use crate::json::format_double;
use crate::options::XmlOptions;
use crate::tree::*;

struct XmlWriter<'o> {
    buf: String,
    placeholder: &'o str,
}

fn unsupported(reason: impl Into<String>) -> Error {
    Error::unsupported("XML", reason)
}

/// Text for a scalar leaf; `None` for containers, null and blobs.
fn scalar_text(value: &PropertyTree) -> Option<String> {
    match value {
        PropertyTree::Bool(b) => Some(b.to_string()),
        PropertyTree::Integer(i) => Some(i.to_string()),
        PropertyTree::Double(d) => Some(format_double(*d).unwrap_or_else(|| d.to_string())),
        PropertyTree::String(s) => Some(s.clone()),
        PropertyTree::Uuid(u) => Some(u.to_string()),
        PropertyTree::Null
        | PropertyTree::Blob(_)
        | PropertyTree::Array(_)
        | PropertyTree::Object(_) => None,
    }
}

impl XmlWriter<'_> {
    fn write_node(&mut self, node: &PropertyTree) -> Result<()> {
        match node {
            PropertyTree::Null => {}
            PropertyTree::Bool(_)
            | PropertyTree::Integer(_)
            | PropertyTree::Double(_)
            | PropertyTree::String(_)
            | PropertyTree::Uuid(_) => {
                let text = scalar_text(node).unwrap_or_default();
                self.write_text(&text)?;
            }
            PropertyTree::Blob(_) => return Err(unsupported("binary blobs are not supported")),
            PropertyTree::Array(items) => {
                for item in items {
                    self.write_node(item)?;
                }
            }
            PropertyTree::Object(entries) => {
                for (name, value) in entries {
                    self.write_element(name, value)?;
                }
            }
        }
        Ok(())
    }

    /// Raw text. Text containing markup goes into a CDATA section.
    fn write_text(&mut self, text: &str) -> Result<()> {
        if !text.contains('<') {
            self.buf.push_str(text);
            return Ok(());
        }
        if text.contains("]]>") {
            return Err(unsupported("text contains both '<' and ']]>'"));
        }
        self.buf.push_str("<![CDATA[");
        self.buf.push_str(text);
        self.buf.push_str("]]>");
        Ok(())
    }

    fn write_element(&mut self, name: &str, value: &PropertyTree) -> Result<()> {
        if name == HEADER_KEY {
            let attributes = value
                .as_object()
                .ok_or_else(|| unsupported("the ?xml header must hold an object"))?;
            self.buf.push_str("<?xml");
            self.write_attributes(attributes)?;
            self.buf.push_str("?>");
            return Ok(());
        }
        if name == self.placeholder {
            return Err(unsupported("attributes outside of an element"));
        }
        if name.is_empty() || !name.chars().all(is_name_char) {
            return Err(unsupported(format!("invalid element name {name:?}")));
        }

        let mut attributes = None;
        let mut content = Vec::new();
        match value {
            PropertyTree::Null => {}
            PropertyTree::Array(items) => {
                for item in items {
                    match self.attribute_map(item) {
                        Some(map) => attributes = Some(map),
                        None => content.push(item),
                    }
                }
            }
            other => content.push(other),
        }

        self.buf.push('<');
        self.buf.push_str(name);
        if let Some(map) = attributes {
            self.write_attributes(map)?;
        }
        if content.is_empty() {
            self.buf.push_str("/>");
            return Ok(());
        }
        self.buf.push('>');
        for child in content {
            self.write_node(child)?;
        }
        self.buf.push_str("</");
        self.buf.push_str(name);
        self.buf.push('>');
        Ok(())
    }

    /// `{placeholder: {...}}` children carry an element's attributes.
    fn attribute_map<'t>(&self, item: &'t PropertyTree) -> Option<&'t Object> {
        let entries = item.as_object()?;
        if entries.len() != 1 {
            return None;
        }
        entries.get(self.placeholder)?.as_object()
    }

    fn write_attributes(&mut self, attributes: &Object) -> Result<()> {
        for (name, value) in attributes {
            if name.is_empty() || !name.chars().all(is_name_char) {
                return Err(unsupported(format!("invalid attribute name {name:?}")));
            }
            let text = scalar_text(value)
                .ok_or_else(|| unsupported(format!("attribute {name} is a {}", value.kind())))?;
            let quote = if !text.contains('"') {
                '"'
            } else if !text.contains('\'') {
                '\''
            } else {
                return Err(unsupported(format!("attribute {name} mixes both quote styles")));
            };
            self.buf.push(' ');
            self.buf.push_str(name);
            self.buf.push('=');
            self.buf.push(quote);
            self.buf.push_str(&text);
            self.buf.push(quote);
        }
        Ok(())
    }
}

/// Serialize an XML-shaped tree, the inverse of
/// [`from_xml`](crate::from_xml::from_xml) for the default placeholder.
///
/// Arrays become node sequences and single-key objects become elements.
/// The mapping is lossy: text whitespace and comments do not survive.
pub fn to_xml(tree: &PropertyTree) -> Result<String> {
    to_xml_with(tree, &XmlOptions::default())
}

pub fn to_xml_with(tree: &PropertyTree, options: &XmlOptions) -> Result<String> {
    debug!("writing xml ({})", tree.kind());
    let mut w = XmlWriter {
        buf: String::new(),
        placeholder: &options.attribute_placeholder,
    };
    w.write_node(tree)?;
    Ok(w.buf)
}

pub fn write_xml(tree: &PropertyTree, sink: impl Write) -> Result<()> {
    write_xml_with(tree, &XmlOptions::default(), sink)
}

pub fn write_xml_with(tree: &PropertyTree, options: &XmlOptions, sink: impl Write) -> Result<()> {
    crate::write_sink(sink, &to_xml_with(tree, options)?)
}
