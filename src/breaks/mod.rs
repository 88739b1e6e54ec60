//! Adding and removing trailing break markers.
//!
//! [`add_trailing_breaks`] appends a marker to every text block that a
//! rendering engine would prop up with a synthetic `<br>`:
//!
//! 1. the block has no children;
//! 2. its last child is not text (a hard break, an image, ...);
//! 3. its last child is text ending in `\n`.
//!
//! The marker is skipped when the block's content expression rejects it, so
//! code blocks and other restricted blocks come back unchanged.
//!
//! [`remove_trailing_breaks`] drops every marker at any depth.
//!
//! Both rewrites share one walk over nodes, fragments and slices. The walk
//! hands back the input itself, not an equal copy, for every sub-tree it
//! leaves alone, so `ptr_eq` on the result tells whether anything changed.

use crate::model::{Fragment, ModelError, Node, Schema, Slice};
use serde_json::Value;
use tracing::debug;

pub mod marker;

pub use marker::{
    MARKER_ATTR, TRAILING_BREAK, cached_trailing_break, is_trailing_break, trailing_break_spec,
};

#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("not a node, fragment, or slice: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Content either rewrite accepts, when the shape is only known at runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyContent {
    Node(Node),
    Fragment(Fragment),
    Slice(Slice),
}

const SLICE_KEYS: [&str; 3] = ["content", "openStart", "openEnd"];

impl AnyContent {
    /// Classifies and decodes a JSON value: an object with a `type` is a
    /// node, an array is a fragment, an object with only slice fields is a
    /// slice. Anything else, including values that only look like one of
    /// those on the outside (`[1, 2]`, `{"content": "x"}`), is an
    /// [`TransformError::InvalidArgument`]. Well-formed content the schema
    /// refuses is a [`TransformError::Model`].
    pub fn from_json(schema: &Schema, value: &Value) -> Result<Self, TransformError> {
        let decoded = match value {
            Value::Array(_) => Fragment::from_json(schema, value).map(AnyContent::Fragment),
            Value::Object(map) if map.contains_key("type") => {
                Node::from_json(schema, value).map(AnyContent::Node)
            }
            Value::Object(map) if map.keys().all(|key| SLICE_KEYS.contains(&key.as_str())) => {
                Slice::from_json(schema, value).map(AnyContent::Slice)
            }
            other => return Err(TransformError::InvalidArgument(other.to_string())),
        };
        decoded.map_err(|err| match err {
            ModelError::Json(_) => TransformError::InvalidArgument(value.to_string()),
            other => TransformError::Model(other),
        })
    }

    pub fn to_json(&self) -> Value {
        match self {
            AnyContent::Node(node) => node.to_json(),
            AnyContent::Fragment(fragment) => fragment.to_json(),
            AnyContent::Slice(slice) => slice.to_json(),
        }
    }
}

impl From<Node> for AnyContent {
    fn from(node: Node) -> Self {
        AnyContent::Node(node)
    }
}

impl From<Fragment> for AnyContent {
    fn from(fragment: Fragment) -> Self {
        AnyContent::Fragment(fragment)
    }
}

impl From<Slice> for AnyContent {
    fn from(slice: Slice) -> Self {
        AnyContent::Slice(slice)
    }
}

/// The shapes both rewrites are defined on.
pub trait Transformable: Sized {
    fn with_trailing_breaks(&self) -> Self;
    fn without_trailing_breaks(&self) -> Self;
}

impl Transformable for Node {
    fn with_trailing_breaks(&self) -> Self {
        AddBreaks.node(self)
    }

    /// A marker passed in directly is returned as is; markers are only
    /// dropped from their parent's content.
    fn without_trailing_breaks(&self) -> Self {
        RemoveBreaks.node(self)
    }
}

impl Transformable for Fragment {
    fn with_trailing_breaks(&self) -> Self {
        walk_fragment(&AddBreaks, self)
    }

    fn without_trailing_breaks(&self) -> Self {
        walk_fragment(&RemoveBreaks, self)
    }
}

impl Transformable for Slice {
    fn with_trailing_breaks(&self) -> Self {
        walk_slice(&AddBreaks, self)
    }

    fn without_trailing_breaks(&self) -> Self {
        walk_slice(&RemoveBreaks, self)
    }
}

impl Transformable for AnyContent {
    fn with_trailing_breaks(&self) -> Self {
        match self {
            AnyContent::Node(node) => AnyContent::Node(node.with_trailing_breaks()),
            AnyContent::Fragment(fragment) => AnyContent::Fragment(fragment.with_trailing_breaks()),
            AnyContent::Slice(slice) => AnyContent::Slice(slice.with_trailing_breaks()),
        }
    }

    fn without_trailing_breaks(&self) -> Self {
        match self {
            AnyContent::Node(node) => AnyContent::Node(node.without_trailing_breaks()),
            AnyContent::Fragment(fragment) => {
                AnyContent::Fragment(fragment.without_trailing_breaks())
            }
            AnyContent::Slice(slice) => AnyContent::Slice(slice.without_trailing_breaks()),
        }
    }
}

/// Adds trailing break markers where text blocks need them.
pub fn add_trailing_breaks<T: Transformable>(content: &T) -> T {
    content.with_trailing_breaks()
}

/// Removes every trailing break marker.
pub fn remove_trailing_breaks<T: Transformable>(content: &T) -> T {
    content.without_trailing_breaks()
}

/// [`add_trailing_breaks`] over JSON of unknown shape.
pub fn add_trailing_breaks_json(schema: &Schema, value: &Value) -> Result<Value, TransformError> {
    let content = AnyContent::from_json(schema, value)?;
    Ok(add_trailing_breaks(&content).to_json())
}

/// [`remove_trailing_breaks`] over JSON of unknown shape.
pub fn remove_trailing_breaks_json(
    schema: &Schema,
    value: &Value,
) -> Result<Value, TransformError> {
    let content = AnyContent::from_json(schema, value)?;
    Ok(remove_trailing_breaks(&content).to_json())
}

/// Per-node behaviour of a rewrite. Recursion into children always goes
/// through [`walk_fragment`].
trait Rewrite {
    fn node(&self, node: &Node) -> Node;

    /// Whether `child` stays in its parent's content at all.
    fn keep(&self, _child: &Node) -> bool {
        true
    }
}

fn walk_children<R: Rewrite>(rewrite: &R, node: &Node) -> Node {
    if node.is_leaf() {
        return node.clone();
    }
    let content = walk_fragment(rewrite, node.content());
    if content.ptr_eq(node.content()) {
        node.clone()
    } else {
        node.copy(content)
    }
}

fn walk_fragment<R: Rewrite>(rewrite: &R, fragment: &Fragment) -> Fragment {
    let mut changed = false;
    let mut mapped = Vec::with_capacity(fragment.child_count());
    for child in fragment {
        if !rewrite.keep(child) {
            changed = true;
            continue;
        }
        let processed = rewrite.node(child);
        changed |= !processed.ptr_eq(child);
        mapped.push(processed);
    }
    if changed {
        Fragment::from_nodes(mapped)
    } else {
        fragment.clone()
    }
}

fn walk_slice<R: Rewrite>(rewrite: &R, slice: &Slice) -> Slice {
    let content = walk_fragment(rewrite, slice.content());
    if content.ptr_eq(slice.content()) {
        slice.clone()
    } else {
        Slice::new(content, slice.open_start(), slice.open_end())
    }
}

struct AddBreaks;

impl Rewrite for AddBreaks {
    fn node(&self, node: &Node) -> Node {
        if !node.is_textblock() {
            return walk_children(self, node);
        }
        if !needs_trailing_break(node) {
            return node.clone();
        }
        let Some(marker) = cached_trailing_break(node.node_type().schema()) else {
            return node.clone();
        };
        match append_trailing_break(node, marker) {
            Ok(with_marker) => with_marker,
            Err(ContentRejected) => node.clone(),
        }
    }
}

/// Mirrors when rendering engines insert their own break hack.
fn needs_trailing_break(textblock: &Node) -> bool {
    match textblock.last_child() {
        None => true,
        Some(last) => match last.text() {
            None => true,
            Some(text) => text.ends_with('\n'),
        },
    }
}

/// The text block's type does not accept a marker at its end.
struct ContentRejected;

fn append_trailing_break(textblock: &Node, marker: Node) -> Result<Node, ContentRejected> {
    let content = textblock.content().append(marker);
    if !textblock.node_type().valid_content(&content) {
        debug!(
            node_type = textblock.type_name(),
            "content expression rejects trailing break"
        );
        return Err(ContentRejected);
    }
    Ok(textblock.copy(content))
}

struct RemoveBreaks;

impl Rewrite for RemoveBreaks {
    fn node(&self, node: &Node) -> Node {
        walk_children(self, node)
    }

    fn keep(&self, child: &Node) -> bool {
        !is_trailing_break(child)
    }
}
