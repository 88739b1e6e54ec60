//! Clipboard serialization of slices.
//!
//! The HTML flavour carries the slice's open depths in a `data-pm-slice`
//! attribute on its first element, `"<openStart> <openEnd> <context>"`.
//! `context` is a JSON array of alternating node type names and attributes
//! for the single-child wrappers that were unwrapped to get at the content,
//! so a paste target can rebuild them.

use crate::html::DomSerializer;
use crate::model::{Fragment, Node, Slice};
use serde::Serialize;
use serde_json::Value;

pub const SLICE_ATTRIBUTE: &str = "data-pm-slice";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardConfig {
    /// Whether to emit the `data-pm-slice` attribute.
    pub slice_attribute: bool,
    /// Separator between text blocks in the plain-text flavour.
    pub block_separator: String,
}

impl Default for ClipboardConfig {
    fn default() -> Self {
        Self {
            slice_attribute: true,
            block_separator: "\n\n".to_string(),
        }
    }
}

impl ClipboardConfig {
    /// Plain HTML without slice metadata.
    pub fn bare() -> Self {
        Self {
            slice_attribute: false,
            ..Self::default()
        }
    }
}

/// What a copy puts on the clipboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClipboardPayload {
    pub html: String,
    pub text: String,
}

pub fn serialize_for_clipboard(
    serializer: &DomSerializer,
    slice: &Slice,
    config: &ClipboardConfig,
) -> ClipboardPayload {
    let mut content: Fragment = slice.content().clone();
    let mut open_start = slice.open_start();
    let mut open_end = slice.open_end();
    let mut context: Vec<Value> = Vec::new();

    while open_start > 1 && open_end > 1 && content.child_count() == 1 {
        let Some(wrapper) = content.first_child().cloned() else {
            break;
        };
        if wrapper.child_count() != 1 {
            break;
        }
        open_start -= 1;
        open_end -= 1;
        context.push(Value::String(wrapper.type_name().to_string()));
        context.push(attrs_for_context(&wrapper));
        content = wrapper.content().clone();
    }

    let marker = format!("{open_start} {open_end} {}", Value::Array(context));
    let first_attr = config
        .slice_attribute
        .then_some((SLICE_ATTRIBUTE, marker.as_str()));

    ClipboardPayload {
        html: serializer.serialize_fragment_with_attr(&content, first_attr),
        text: slice.content().text_between_all(&config.block_separator),
    }
}

/// `null` when the wrapper only carries its type's default attributes.
fn attrs_for_context(node: &Node) -> Value {
    let defaults = node.node_type().compute_attrs(None).ok();
    if defaults.as_ref() == Some(node.attrs()) {
        return Value::Null;
    }
    serde_json::to_value(node.attrs()).unwrap_or(Value::Null)
}
