//! Configuration tree describing the LED assembly.
//!
//! The tree is a static, already-parsed hierarchy of [`ConfigNode`]s. A node
//! tagged with a matching `compatible` string is handed to the driver, and
//! each of its children describes one LED:
//!
//! ```toml
//! name = "rgb-leds"
//! compatible = ["arrow,RGBleds"]
//!
//! [[children]]
//! name = "led-red"
//! properties = { label = "ledred", gpios = [17, 0] }
//! ```
//!
//! The reader performs no validation. [`ResourceDescriptor`] exposes fallible
//! accessors so that a malformed child is rejected by the registrar instead
//! of aborting the walk.

pub mod loader;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::line::LineRef;

/// Property holding the human-readable resource label.
pub const LABEL_PROPERTY: &str = "label";

/// Property holding the line reference cells.
pub const LINE_PROPERTY: &str = "gpios";

/// Errors reading a single node property.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PropertyError {
    /// Property is not present on the node
    #[error("property not found")]
    Missing,

    /// Property has the wrong value type
    #[error("expected {expected}")]
    WrongType { expected: &'static str },

    /// Cell value does not fit in 32 bits
    #[error("cell value {value} out of range")]
    OutOfRange { value: i64 },

    /// Cell list is empty
    #[error("no cells")]
    Empty,
}

/// One node of the configuration tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigNode {
    /// Node name, unique among its siblings
    pub name: String,

    /// Compatibility identifiers used to match a driver
    #[serde(default)]
    pub compatible: Vec<String>,

    /// Arbitrary node properties
    #[serde(default)]
    pub properties: BTreeMap<String, toml::Value>,

    /// Child nodes in document order
    #[serde(default)]
    pub children: Vec<ConfigNode>,
}

impl ConfigNode {
    /// Create an empty node.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add a compatibility identifier.
    pub fn with_compatible(mut self, compatible: impl Into<String>) -> Self {
        self.compatible.push(compatible.into());
        self
    }

    /// Set a property value.
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<toml::Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Append a child node.
    pub fn with_child(mut self, child: ConfigNode) -> Self {
        self.children.push(child);
        self
    }

    /// Raw property lookup.
    pub fn property(&self, name: &str) -> Option<&toml::Value> {
        self.properties.get(name)
    }

    /// Read a string property.
    pub fn property_str(&self, name: &str) -> Result<&str, PropertyError> {
        match self.property(name) {
            None => Err(PropertyError::Missing),
            Some(toml::Value::String(s)) => Ok(s.as_str()),
            Some(_) => Err(PropertyError::WrongType { expected: "string" }),
        }
    }

    /// Read a property as a list of 32-bit cells.
    ///
    /// A bare integer is accepted as a single cell.
    pub fn property_cells(&self, name: &str) -> Result<Vec<u32>, PropertyError> {
        match self.property(name) {
            None => Err(PropertyError::Missing),
            Some(toml::Value::Integer(n)) => Ok(vec![to_cell(*n)?]),
            Some(toml::Value::Array(items)) => {
                if items.is_empty() {
                    return Err(PropertyError::Empty);
                }
                items
                    .iter()
                    .map(|item| match item {
                        toml::Value::Integer(n) => to_cell(*n),
                        _ => Err(PropertyError::WrongType {
                            expected: "integer cells",
                        }),
                    })
                    .collect()
            }
            Some(_) => Err(PropertyError::WrongType {
                expected: "integer cells",
            }),
        }
    }

    /// Check whether any of this node's compatible strings is in `table`.
    pub fn is_compatible<S: AsRef<str>>(&self, table: &[S]) -> bool {
        self.compatible
            .iter()
            .any(|c| table.iter().any(|t| t.as_ref() == c))
    }

    /// Iterate the children as resource descriptors, in document order.
    pub fn children(&self) -> impl Iterator<Item = ResourceDescriptor<'_>> {
        self.children.iter().map(ResourceDescriptor::new)
    }

    /// Depth-first, pre-order walk of this node and all its descendants.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// Pre-order walk yielding each node with its full path from this node.
    ///
    /// Paths are `/`-separated node names rooted at `/`, so nodes that share
    /// a name under different parents stay distinct.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            stack: vec![(node_path(None, &self.name), self)],
        }
    }
}

/// Path of a node named `name` below `parent`, or of a root when `parent` is
/// `None`. A root named `/` is the path `/` itself.
pub fn node_path(parent: Option<&str>, name: &str) -> String {
    let parent = parent.unwrap_or("").trim_end_matches('/');
    let name = name.trim_start_matches('/');
    format!("{}/{}", parent, name)
}

fn to_cell(value: i64) -> Result<u32, PropertyError> {
    u32::try_from(value).map_err(|_| PropertyError::OutOfRange { value })
}

/// Iterator returned by [`ConfigNode::descendants`].
pub struct Descendants<'a> {
    stack: Vec<&'a ConfigNode>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a ConfigNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Iterator returned by [`ConfigNode::walk`].
pub struct Walk<'a> {
    stack: Vec<(String, &'a ConfigNode)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (String, &'a ConfigNode);

    fn next(&mut self) -> Option<Self::Item> {
        let (path, node) = self.stack.pop()?;
        for child in node.children.iter().rev() {
            self.stack.push((node_path(Some(&path), &child.name), child));
        }
        Some((path, node))
    }
}

/// View of one child node as a candidate resource.
///
/// Borrowed from the tree for the duration of a single registration attempt.
#[derive(Debug, Clone, Copy)]
pub struct ResourceDescriptor<'a> {
    node: &'a ConfigNode,
}

impl<'a> ResourceDescriptor<'a> {
    /// Wrap a child node.
    pub fn new(node: &'a ConfigNode) -> Self {
        Self { node }
    }

    /// Name of the underlying tree node.
    pub fn node_name(&self) -> &'a str {
        &self.node.name
    }

    /// The resource label.
    pub fn label(&self) -> Result<&'a str, PropertyError> {
        self.node.property_str(LABEL_PROPERTY)
    }

    /// The physical line reference.
    pub fn line_ref(&self) -> Result<LineRef, PropertyError> {
        let cells = self.node.property_cells(LINE_PROPERTY)?;
        LineRef::from_cells(&cells)
    }
}
