//! Bridge between box graphs and a generic metadata tree.
//!
//! Every box kind maps to one node name. Decoded fields become string
//! attributes; binary fields are lowercase hex; lists are comma-separated.
//! Container boxes map their children to child nodes in order.

use crate::boxes::{ContainerBox, FourCC, Jp2Box, OpaqueBox};
use crate::error::{BoxError, Result};
use crate::registry::{BoxShape, Registry, default_registry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

/// Root node wrapping a sequence of top-level boxes.
pub const ROOT_NODE_NAME: &str = "JP2KMetadata";
/// Node for boxes kept as raw bytes.
pub const OPAQUE_NODE_NAME: &str = "JP2KOpaqueBox";
/// Node for containers whose tag has no registered node name.
pub const GENERIC_CONTAINER_NODE_NAME: &str = "JP2KContainerBox";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MetadataNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MetadataNode>,
}

impl MetadataNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_attr(mut self, key: &str, value: impl ToString) -> Self {
        self.attributes.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_child(mut self, child: MetadataNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = MetadataNode>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn malformed(&self, reason: impl Into<String>) -> BoxError {
        BoxError::MalformedTree {
            node: self.name.clone(),
            reason: reason.into(),
        }
    }

    pub fn expect_name(&self, name: &str) -> Result<()> {
        if self.name != name {
            return Err(self.malformed(format!("expected a `{name}` node")));
        }
        Ok(())
    }

    pub fn required(&self, key: &str) -> Result<&str> {
        self.attr(key)
            .ok_or_else(|| self.malformed(format!("missing attribute `{key}`")))
    }

    pub fn parse_attr<T: FromStr>(&self, key: &str) -> Result<T> {
        let raw = self.required(key)?;
        raw.parse()
            .map_err(|_| self.malformed(format!("attribute `{key}` has invalid value `{raw}`")))
    }

    /// Comma-separated list; the empty string is the empty list.
    pub fn list_attr<T: FromStr>(&self, key: &str) -> Result<Vec<T>> {
        let raw = self.required(key)?;
        if raw.is_empty() {
            return Ok(Vec::new());
        }
        raw.split(',')
            .map(|item| {
                item.parse()
                    .map_err(|_| self.malformed(format!("attribute `{key}` has invalid item `{item}`")))
            })
            .collect()
    }

    pub fn hex_attr(&self, key: &str) -> Result<Vec<u8>> {
        let raw = self.required(key)?;
        hex::decode(raw).map_err(|e| self.malformed(format!("attribute `{key}`: {e}")))
    }

    pub fn fourcc_attr(&self, key: &str) -> Result<FourCC> {
        let raw = self.required(key)?;
        fourcc_from_attr(raw)
            .ok_or_else(|| self.malformed(format!("attribute `{key}` is not a box type: `{raw}`")))
    }

    pub fn fourcc_list_attr(&self, key: &str) -> Result<Vec<FourCC>> {
        let raw = self.required(key)?;
        if raw.is_empty() {
            return Ok(Vec::new());
        }
        raw.split(',')
            .map(|item| {
                fourcc_from_attr(item)
                    .ok_or_else(|| self.malformed(format!("attribute `{key}` has invalid item `{item}`")))
            })
            .collect()
    }
}

/// Four characters when the tag is printable and comma-free, `0x` and eight
/// hex digits otherwise.
pub fn fourcc_to_attr(cc: FourCC) -> String {
    if cc.is_printable() && !cc.0.contains(&b',') {
        cc.as_str_lossy()
    } else {
        format!("{:#010x}", cc.as_u32())
    }
}

pub fn fourcc_from_attr(s: &str) -> Option<FourCC> {
    if s.len() == 4 {
        return FourCC::from_str(s);
    }
    let digits = s.strip_prefix("0x")?;
    if digits.len() != 8 {
        return None;
    }
    u32::from_str_radix(digits, 16).ok().map(FourCC::from_u32)
}

pub fn join_list<I>(items: I) -> String
where
    I: IntoIterator,
    I::Item: Display,
{
    items
        .into_iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

impl OpaqueBox {
    pub fn to_node(&self) -> MetadataNode {
        MetadataNode::new(OPAQUE_NODE_NAME)
            .with_attr("Type", fourcc_to_attr(self.typ()))
            .with_attr("Data", hex::encode(self.data()))
    }

    pub fn from_node(node: &MetadataNode) -> Result<Self> {
        Ok(OpaqueBox::new(node.fourcc_attr("Type")?, node.hex_attr("Data")?))
    }
}

impl Registry {
    pub fn box_to_node(&self, b: &Jp2Box) -> MetadataNode {
        match b {
            Jp2Box::Container(c) => {
                let node = match self.node_name(c.typ()) {
                    Some(name) => MetadataNode::new(name),
                    None => MetadataNode::new(GENERIC_CONTAINER_NODE_NAME)
                        .with_attr("Type", fourcc_to_attr(c.typ())),
                };
                node.with_children(c.children().iter().map(|child| self.box_to_node(child)))
            }
            Jp2Box::Opaque(o) => o.to_node(),
            leaf => leaf.leaf_node().unwrap_or_default(),
        }
    }

    pub fn box_from_node(&self, node: &MetadataNode) -> Result<Jp2Box> {
        match node.name.as_str() {
            OPAQUE_NODE_NAME => return OpaqueBox::from_node(node).map(Jp2Box::from),
            GENERIC_CONTAINER_NODE_NAME => {
                let typ = node.fourcc_attr("Type")?;
                return Ok(ContainerBox::new(typ, self.children_from_node(node)?).into());
            }
            _ => {}
        }
        let spec = self
            .by_node_name(&node.name)
            .ok_or_else(|| node.malformed("no box kind has this node name"))?;
        match spec.shape {
            BoxShape::Leaf { from_node, .. } => from_node(node),
            BoxShape::Container => {
                Ok(ContainerBox::new(spec.typ, self.children_from_node(node)?).into())
            }
            BoxShape::Opaque => OpaqueBox::from_node(node).map(Jp2Box::from),
        }
    }

    fn children_from_node(&self, node: &MetadataNode) -> Result<Vec<Jp2Box>> {
        node.children
            .iter()
            .map(|child| self.box_from_node(child))
            .collect()
    }
}

pub fn to_tree(b: &Jp2Box) -> MetadataNode {
    default_registry().box_to_node(b)
}

pub fn from_tree(node: &MetadataNode) -> Result<Jp2Box> {
    default_registry().box_from_node(node)
}

pub fn boxes_to_tree(boxes: &[Jp2Box]) -> MetadataNode {
    MetadataNode::new(ROOT_NODE_NAME).with_children(boxes.iter().map(to_tree))
}

pub fn boxes_from_tree(root: &MetadataNode) -> Result<Vec<Jp2Box>> {
    root.expect_name(ROOT_NODE_NAME)?;
    root.children.iter().map(from_tree).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fourcc_attr_forms() {
        assert_eq!(fourcc_to_attr(FourCC(*b"jp2 ")), "jp2 ");
        assert_eq!(fourcc_to_attr(FourCC(*b"a,bc")), "0x612c6263");
        assert_eq!(fourcc_to_attr(FourCC([0, 1, 2, 3])), "0x00010203");
        assert_eq!(fourcc_from_attr("0x00010203"), Some(FourCC([0, 1, 2, 3])));
        assert_eq!(fourcc_from_attr("jp2 "), Some(FourCC(*b"jp2 ")));
        assert_eq!(fourcc_from_attr("jp2"), None);
        assert_eq!(fourcc_from_attr("0x0001020"), None);
    }

    #[test]
    fn list_attr_handles_empty() {
        let node = MetadataNode::new("n").with_attr("L", "");
        assert!(node.list_attr::<u8>("L").unwrap().is_empty());
        let node = MetadataNode::new("n").with_attr("L", "1,x");
        assert!(matches!(node.list_attr::<u8>("L"), Err(BoxError::MalformedTree { .. })));
    }
}
