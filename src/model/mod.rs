//! Immutable rich-text document model.
//!
//! Documents are trees of [`Node`]s. A node's children live in a
//! [`Fragment`]; a [`Slice`] is a fragment cut out of a larger document
//! together with the depth of the structure left open at each edge.
//!
//! All three are cheap-to-clone `Rc` handles. Nothing here is ever mutated
//! after construction, so an unchanged sub-tree can be handed back by
//! reference and callers can detect no-op rewrites with `ptr_eq`.
//! `PartialEq` compares structure.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

pub mod content;
pub mod json;
pub mod schema;
pub mod slice;

pub use content::{ContentExpr, ContentTerm, Quantifier};
pub use schema::{
    AttrSpec, DEFAULT_PRIORITY, DomSpec, GetAttrs, NodeSpec, NodeType, ParseRule, Schema,
    SchemaSpec,
};
pub use slice::Slice;

pub type Attrs = BTreeMap<String, Value>;

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("invalid content expression `{expr}`: {reason}")]
    InvalidContentExpr { expr: String, reason: String },
    #[error("unknown node type `{0}`")]
    UnknownNodeType(String),
    #[error("node type `{0}` is defined twice")]
    DuplicateNodeType(String),
    #[error("top node type `{0}` is not defined")]
    MissingTopNode(String),
    #[error("node type `{node_type}` requires attribute `{attr}`")]
    MissingAttr { node_type: String, attr: String },
    #[error("invalid content for node type `{node_type}`: {content}")]
    InvalidContent { node_type: String, content: String },
    #[error("text nodes must not be empty")]
    EmptyText,
    #[error("position {pos} outside of content of size {size}")]
    PositionOutOfRange { pos: usize, size: usize },
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}

struct NodeData {
    node_type: Rc<NodeType>,
    attrs: Attrs,
    content: Fragment,
    text: Option<String>,
}

#[derive(Clone)]
pub struct Node(Rc<NodeData>);

impl Node {
    pub(crate) fn from_parts(
        node_type: Rc<NodeType>,
        attrs: Attrs,
        content: Fragment,
        text: Option<String>,
    ) -> Self {
        Node(Rc::new(NodeData {
            node_type,
            attrs,
            content,
            text,
        }))
    }

    pub fn node_type(&self) -> &Rc<NodeType> {
        &self.0.node_type
    }

    pub fn type_name(&self) -> &str {
        self.0.node_type.name()
    }

    pub fn attrs(&self) -> &Attrs {
        &self.0.attrs
    }

    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.0.attrs.get(name)
    }

    pub fn content(&self) -> &Fragment {
        &self.0.content
    }

    /// Text of a text node, `None` for everything else.
    pub fn text(&self) -> Option<&str> {
        self.0.text.as_deref()
    }

    pub fn is_text(&self) -> bool {
        self.0.text.is_some()
    }

    pub fn is_textblock(&self) -> bool {
        self.0.node_type.is_textblock()
    }

    pub fn is_inline(&self) -> bool {
        self.0.node_type.is_inline()
    }

    pub fn is_block(&self) -> bool {
        self.0.node_type.is_block()
    }

    /// Leaves have no content slot at all. Text nodes are leaves.
    pub fn is_leaf(&self) -> bool {
        self.0.node_type.is_leaf()
    }

    pub fn is_atom(&self) -> bool {
        self.0.node_type.is_atom()
    }

    pub fn child_count(&self) -> usize {
        self.0.content.child_count()
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.0.content.child(index)
    }

    pub fn first_child(&self) -> Option<&Node> {
        self.0.content.first_child()
    }

    pub fn last_child(&self) -> Option<&Node> {
        self.0.content.last_child()
    }

    /// Size in positions: text length in chars, 1 for other leaves, and the
    /// content size plus the two boundaries for everything else.
    pub fn node_size(&self) -> usize {
        match &self.0.text {
            Some(text) => text.chars().count(),
            None if self.is_leaf() => 1,
            None => self.0.content.size() + 2,
        }
    }

    /// Same type and attributes, new content.
    pub fn copy(&self, content: Fragment) -> Node {
        Node::from_parts(
            Rc::clone(&self.0.node_type),
            self.0.attrs.clone(),
            content,
            None,
        )
    }

    /// Same text node type with different text.
    pub fn with_text(&self, text: String) -> Node {
        Node::from_parts(
            Rc::clone(&self.0.node_type),
            self.0.attrs.clone(),
            Fragment::empty(),
            Some(text),
        )
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self) -> String {
        match &self.0.text {
            Some(text) => text.clone(),
            None => self.0.content.text_content(),
        }
    }

    /// Cuts the node down to the content between `from` and `to`, given
    /// relative to the start of its content (or of its text).
    pub fn cut(&self, from: usize, to: usize) -> Node {
        if let Some(text) = &self.0.text {
            let len = text.chars().count();
            if from == 0 && to >= len {
                return self.clone();
            }
            let cut: String = text.chars().skip(from).take(to.saturating_sub(from)).collect();
            return self.with_text(cut);
        }
        if from == 0 && to >= self.0.content.size() {
            return self.clone();
        }
        self.copy(self.0.content.cut(from, to))
    }

    pub fn ptr_eq(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
            || (self.type_name() == other.type_name()
                && self.0.attrs == other.0.attrs
                && self.0.text == other.0.text
                && self.0.content == other.0.content)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(text) = &self.0.text {
            return write!(f, "{text:?}");
        }
        f.write_str(self.type_name())?;
        if self.0.content.child_count() > 0 {
            write!(f, "({})", self.0.content.display_inner())?;
        }
        Ok(())
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Ordered children of a node.
#[derive(Clone)]
pub struct Fragment {
    nodes: Rc<[Node]>,
    size: usize,
}

impl Fragment {
    pub fn empty() -> Self {
        Self::from_joined(Vec::new())
    }

    /// Builds a fragment in canonical form: adjacent text nodes are joined
    /// and empty text nodes dropped.
    pub fn from_nodes<I>(nodes: I) -> Self
    where
        I: IntoIterator<Item = Node>,
    {
        let mut joined: Vec<Node> = Vec::new();
        for node in nodes {
            if node.text().is_some_and(str::is_empty) {
                continue;
            }
            if let (Some(prev), Some(next)) = (joined.last().and_then(Node::text), node.text()) {
                let merged = format!("{prev}{next}");
                if let Some(last) = joined.last_mut() {
                    *last = last.with_text(merged);
                }
                continue;
            }
            joined.push(node);
        }
        Self::from_joined(joined)
    }

    fn from_joined(nodes: Vec<Node>) -> Self {
        let size = nodes.iter().map(Node::node_size).sum();
        Self {
            nodes: nodes.into(),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn child_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    pub fn first_child(&self) -> Option<&Node> {
        self.nodes.first()
    }

    pub fn last_child(&self) -> Option<&Node> {
        self.nodes.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.nodes.iter()
    }

    /// A new fragment with `node` added at the end. Text is not joined.
    pub fn append(&self, node: Node) -> Fragment {
        let mut nodes = self.nodes.to_vec();
        nodes.push(node);
        Self::from_joined(nodes)
    }

    /// The part of this fragment between two positions.
    pub fn cut(&self, from: usize, to: usize) -> Fragment {
        let to = to.min(self.size);
        if from == 0 && to == self.size {
            return self.clone();
        }
        if from >= to {
            return Fragment::empty();
        }
        let mut result = Vec::new();
        let mut pos = 0;
        for child in self.nodes.iter() {
            if pos >= to {
                break;
            }
            let end = pos + child.node_size();
            if end > from {
                let child = if pos < from || end > to {
                    if child.is_text() {
                        child.cut(from.saturating_sub(pos), to - pos)
                    } else {
                        child.cut(
                            from.saturating_sub(pos + 1),
                            (to - pos).saturating_sub(1).min(child.content().size()),
                        )
                    }
                } else {
                    child.clone()
                };
                result.push(child);
            }
            pos = end;
        }
        Self::from_joined(result)
    }

    /// Index of the child containing or starting at `pos`, with that child's
    /// start offset. Positions at the very end yield `child_count()`.
    pub fn find_index(&self, pos: usize) -> (usize, usize) {
        let mut offset = 0;
        for (index, child) in self.nodes.iter().enumerate() {
            let end = offset + child.node_size();
            if end > pos {
                return (index, offset);
            }
            offset = end;
        }
        (self.nodes.len(), offset)
    }

    pub fn text_content(&self) -> String {
        self.nodes.iter().map(Node::text_content).collect()
    }

    /// Plain text of the whole fragment: `block_separator` between text
    /// blocks (and text-bearing leaf blocks), leaves rendered through their
    /// spec's `leaf_text`.
    pub fn text_between_all(&self, block_separator: &str) -> String {
        let mut out = String::new();
        let mut first = true;
        for node in self.nodes.iter() {
            collect_text(node, block_separator, &mut first, &mut out);
        }
        out
    }

    pub fn ptr_eq(&self, other: &Fragment) -> bool {
        Rc::ptr_eq(&self.nodes, &other.nodes)
    }

    fn display_inner(&self) -> String {
        self.nodes
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn collect_text(node: &Node, separator: &str, first: &mut bool, out: &mut String) {
    let own = match node.text() {
        Some(text) => text.to_string(),
        None if node.is_leaf() => node
            .node_type()
            .spec()
            .leaf_text
            .clone()
            .unwrap_or_default(),
        None => String::new(),
    };
    if node.is_block() && ((node.is_leaf() && !own.is_empty()) || node.is_textblock()) {
        if *first {
            *first = false;
        } else {
            out.push_str(separator);
        }
    }
    out.push_str(&own);
    for child in node.content().iter() {
        collect_text(child, separator, first, out);
    }
}

impl Default for Fragment {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for Fragment {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.nodes[..] == other.nodes[..]
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.display_inner())
    }
}

impl fmt::Debug for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl From<Node> for Fragment {
    fn from(node: Node) -> Self {
        Fragment::from_nodes([node])
    }
}

impl From<Vec<Node>> for Fragment {
    fn from(nodes: Vec<Node>) -> Self {
        Fragment::from_nodes(nodes)
    }
}

impl FromIterator<Node> for Fragment {
    fn from_iter<I: IntoIterator<Item = Node>>(iter: I) -> Self {
        Fragment::from_nodes(iter)
    }
}

impl<'a> IntoIterator for &'a Fragment {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

#[cfg(test)]
pub(crate) mod test_schema {
    use super::*;

    /// Minimal schema for unit tests inside the model.
    pub fn schema() -> Schema {
        let spec = SchemaSpec::new()
            .node(
                "doc",
                NodeSpec {
                    content: "block+".into(),
                    ..Default::default()
                },
            )
            .node(
                "paragraph",
                NodeSpec {
                    content: "inline*".into(),
                    group: Some("block".into()),
                    ..Default::default()
                },
            )
            .node(
                "blockquote",
                NodeSpec {
                    content: "block+".into(),
                    group: Some("block".into()),
                    ..Default::default()
                },
            )
            .node(
                "text",
                NodeSpec {
                    group: Some("inline".into()),
                    ..Default::default()
                },
            )
            .node(
                "hard_break",
                NodeSpec {
                    inline: true,
                    group: Some("inline".into()),
                    leaf_text: Some("\n".into()),
                    ..Default::default()
                },
            );
        match Schema::new(spec) {
            Ok(schema) => schema,
            Err(err) => panic!("test schema is invalid: {err}"),
        }
    }
}
