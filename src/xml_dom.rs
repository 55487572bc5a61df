//! Read-only element/text view over the tree produced by
//! [`from_xml`](crate::from_xml::from_xml).
//!
//! Lookups never fail: asking for a missing child yields a node of kind
//! [`XmlNodeKind::Invalid`], which answers every further query with
//! nothing, so chains like `doc.child("a").child("b").value()` are safe.

use std::str::FromStr;

use crate::from_xml::HEADER_KEY;
use crate::options::DEFAULT_ATTRIBUTE_PLACEHOLDER;
use crate::tree::{Object, PropertyTree};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlNodeKind {
    Document,
    Element,
    Text,
    Invalid,
}

#[derive(Debug, Clone, Copy)]
pub struct XmlDocument<'a> {
    tree: &'a PropertyTree,
    placeholder: &'a str,
}

impl<'a> XmlDocument<'a> {
    pub fn new(tree: &'a PropertyTree) -> Self {
        Self::with_placeholder(tree, DEFAULT_ATTRIBUTE_PLACEHOLDER)
    }

    pub fn with_placeholder(tree: &'a PropertyTree, placeholder: &'a str) -> Self {
        XmlDocument { tree, placeholder }
    }

    pub fn root(&self) -> XmlNode<'a> {
        XmlNode {
            placeholder: self.placeholder,
            tree: Some(self.tree),
            name: None,
            kind: XmlNodeKind::Document,
        }
    }

    pub fn children(&self) -> Vec<XmlNode<'a>> {
        self.root().children()
    }

    pub fn children_named(&self, name: &str) -> Vec<XmlNode<'a>> {
        self.root().children_named(name)
    }

    pub fn child(&self, name: &str) -> XmlNode<'a> {
        self.root().child(name)
    }

    /// Attributes of the `<?xml ...?>` header; empty when there is none.
    pub fn declaration(&self) -> XmlAttributes<'a> {
        let map = self
            .tree
            .as_array()
            .into_iter()
            .flatten()
            .find_map(|node| node.get(HEADER_KEY))
            .and_then(PropertyTree::as_object);
        XmlAttributes { map }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct XmlNode<'a> {
    placeholder: &'a str,
    tree: Option<&'a PropertyTree>,
    name: Option<&'a str>,
    kind: XmlNodeKind,
}

impl<'a> XmlNode<'a> {
    fn invalid(placeholder: &'a str) -> Self {
        XmlNode {
            placeholder,
            tree: None,
            name: None,
            kind: XmlNodeKind::Invalid,
        }
    }

    pub fn kind(&self) -> XmlNodeKind {
        self.kind
    }

    pub fn is_valid(&self) -> bool {
        self.kind != XmlNodeKind::Invalid
    }

    /// Element name; `None` for text, the document and invalid nodes.
    pub fn name(&self) -> Option<&'a str> {
        self.name
    }

    /// Content of a text node.
    pub fn value(&self) -> Option<&'a str> {
        match self.kind {
            XmlNodeKind::Text => self.tree.and_then(PropertyTree::as_str),
            _ => None,
        }
    }

    pub fn has_value(&self) -> bool {
        self.value().is_some()
    }

    /// Text content parsed as `T`, e.g. `value_as::<f32>()`.
    pub fn value_as<T: FromStr>(&self) -> Option<T> {
        self.value()?.parse().ok()
    }

    fn nodes(&self) -> impl Iterator<Item = XmlNode<'a>> + 'a {
        let placeholder = self.placeholder;
        let items = match self.kind {
            XmlNodeKind::Document | XmlNodeKind::Element => {
                self.tree.and_then(PropertyTree::as_array)
            }
            XmlNodeKind::Text | XmlNodeKind::Invalid => None,
        };
        items.into_iter().flatten().filter_map(move |item| match item {
            PropertyTree::String(_) => Some(XmlNode {
                placeholder,
                tree: Some(item),
                name: None,
                kind: XmlNodeKind::Text,
            }),
            PropertyTree::Object(entries) if entries.len() == 1 => {
                let (name, value) = entries.iter().next()?;
                if name == placeholder || name == HEADER_KEY {
                    return None;
                }
                Some(XmlNode {
                    placeholder,
                    tree: Some(value),
                    name: Some(name.as_str()),
                    kind: XmlNodeKind::Element,
                })
            }
            _ => None,
        })
    }

    /// Elements and text nodes, in document order.
    pub fn children(&self) -> Vec<XmlNode<'a>> {
        self.nodes().collect()
    }

    pub fn children_named(&self, name: &str) -> Vec<XmlNode<'a>> {
        self.nodes().filter(|n| n.name == Some(name)).collect()
    }

    /// First element called `name`, or an invalid node.
    pub fn child(&self, name: &str) -> XmlNode<'a> {
        self.nodes()
            .find(|n| n.name == Some(name))
            .unwrap_or_else(|| XmlNode::invalid(self.placeholder))
    }

    /// First element or text node, or an invalid node.
    pub fn first_child(&self) -> XmlNode<'a> {
        self.nodes()
            .next()
            .unwrap_or_else(|| XmlNode::invalid(self.placeholder))
    }

    pub fn attributes(&self) -> XmlAttributes<'a> {
        let map = match self.kind {
            XmlNodeKind::Element => self
                .tree
                .and_then(PropertyTree::as_array)
                .into_iter()
                .flatten()
                .find_map(|item| item.get(self.placeholder))
                .and_then(PropertyTree::as_object),
            _ => None,
        };
        XmlAttributes { map }
    }

    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        self.attributes().get(name)
    }
}

/// Attribute view of one element.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlAttributes<'a> {
    map: Option<&'a Object>,
}

impl<'a> XmlAttributes<'a> {
    pub fn get(&self, name: &str) -> Option<&'a str> {
        self.map?.get(name)?.as_str()
    }

    pub fn get_as<T: FromStr>(&self, name: &str) -> Option<T> {
        self.get(name)?.parse().ok()
    }

    pub fn len(&self) -> usize {
        self.map.map_or(0, Object::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.map
            .into_iter()
            .flatten()
            .filter_map(|(k, v)| Some((k.as_str(), v.as_str()?)))
    }
}
