//! A minimal editor surface: a document under a schema, the plugins that
//! hook into copying, and HTML export.

use crate::breaks::add_trailing_breaks;
use crate::html::{DomParser, DomSerializer};
use crate::model::{ModelError, Node, Schema};
use serde_json::Value;
use tracing::trace;

pub mod clipboard;
pub mod plugin;

pub use clipboard::{ClipboardConfig, ClipboardPayload, SLICE_ATTRIBUTE, serialize_for_clipboard};
pub use plugin::{Plugin, TrailingBreakPlugin};

#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("document is a `{found}` node, expected `{expected}`")]
    NotTopNode { expected: String, found: String },
}

/// How [`Editor::get_html_with`] renders the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportConfig {
    /// Add trailing break markers before serializing.
    pub trailing_breaks: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self::with_trailing_breaks()
    }
}

impl ExportConfig {
    /// Output that matches what the editor draws.
    pub fn with_trailing_breaks() -> Self {
        Self {
            trailing_breaks: true,
        }
    }

    /// The document's own content, nothing added.
    pub fn plain() -> Self {
        Self {
            trailing_breaks: false,
        }
    }
}

/// A document together with the schema it was built from.
#[derive(Debug, Clone)]
pub struct EditorState {
    schema: Schema,
    doc: Node,
}

impl EditorState {
    pub fn new(schema: Schema, doc: Node) -> Result<Self, EditorError> {
        let top = schema.top_node_type();
        if doc.type_name() != top.name() {
            return Err(EditorError::NotTopNode {
                expected: top.name().to_string(),
                found: doc.type_name().to_string(),
            });
        }
        Ok(Self { schema, doc })
    }

    /// A state holding the smallest valid document.
    pub fn empty(schema: Schema) -> Result<Self, EditorError> {
        let top = schema.top_node_type();
        let doc = top
            .create_and_fill()
            .ok_or_else(|| ModelError::MissingTopNode(top.name().to_string()))?;
        Self::new(schema, doc)
    }

    pub fn from_json(schema: Schema, value: &Value) -> Result<Self, EditorError> {
        let doc = Node::from_json(&schema, value)?;
        Self::new(schema, doc)
    }

    pub fn from_html(schema: Schema, html: &str) -> Result<Self, EditorError> {
        let doc = DomParser::from_schema(&schema).parse(html)?;
        Self::new(schema, doc)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn doc(&self) -> &Node {
        &self.doc
    }
}

/// The document's HTML with trailing break markers added, as exported for
/// external consumers.
pub fn serialize_with_trailing_breaks(state: &EditorState) -> String {
    let content = add_trailing_breaks(state.doc().content());
    DomSerializer::from_schema(state.schema()).serialize_fragment(&content)
}

pub struct Editor {
    state: EditorState,
    plugins: Vec<Box<dyn Plugin>>,
    clipboard: ClipboardConfig,
}

impl Editor {
    pub fn new(state: EditorState) -> Self {
        Self {
            state,
            plugins: Vec::new(),
            clipboard: ClipboardConfig::default(),
        }
    }

    pub fn with_plugin(mut self, plugin: impl Plugin + 'static) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    pub fn with_clipboard_config(mut self, config: ClipboardConfig) -> Self {
        self.clipboard = config;
        self
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn set_state(&mut self, state: EditorState) {
        self.state = state;
    }

    pub fn plugins(&self) -> impl Iterator<Item = &dyn Plugin> {
        self.plugins.iter().map(|plugin| plugin.as_ref())
    }

    /// The document as HTML, exactly as stored.
    pub fn get_html(&self) -> String {
        self.get_html_with(ExportConfig::plain())
    }

    pub fn get_html_with(&self, config: ExportConfig) -> String {
        if config.trailing_breaks {
            return serialize_with_trailing_breaks(&self.state);
        }
        DomSerializer::from_schema(self.state.schema())
            .serialize_fragment(self.state.doc().content())
    }

    /// Serializes the range `from..to` for the clipboard after letting every
    /// plugin transform the copied slice.
    pub fn copy(&self, from: usize, to: usize) -> Result<ClipboardPayload, EditorError> {
        let mut slice = self.state.doc().slice(from, to)?;
        for plugin in &self.plugins {
            trace!(plugin = plugin.name(), "transform_copied");
            slice = plugin.transform_copied(slice);
        }
        let serializer = DomSerializer::from_schema(self.state.schema());
        Ok(serialize_for_clipboard(&serializer, &slice, &self.clipboard))
    }
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("state", &self.state)
            .field(
                "plugins",
                &self.plugins.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .field("clipboard", &self.clipboard)
            .finish()
    }
}
