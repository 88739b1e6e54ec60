//! trailing-breaks: keep exported rich text looking the way the editor draws it.
//!
//! Editors render an empty line, or a line ending in a hard break, by
//! propping it up with a synthetic `<br>` that never appears in the
//! document. HTML exported from such a document collapses those lines. This
//! crate inserts a dedicated marker node wherever the editor would add its
//! synthetic break, so exported and copied HTML keeps the same line layout.
//!
//! It includes:
//!
//! - **Document model** - schemas, nodes, fragments, slices and their JSON form
//! - **Trailing breaks** - the marker node kind and the add/remove rewrites
//! - **HTML** - DOM-spec serializer and a rule-based parser that ignores markers
//! - **Editor surface** - export helper, plugins and clipboard serialization
//!
//! # Quick Start
//!
//! ```rust
//! use trailing_breaks::{Fragment, add_trailing_breaks, basic, remove_trailing_breaks};
//!
//! let schema = basic::schema().unwrap();
//! let empty = schema.node("paragraph", None, Fragment::empty()).unwrap();
//! let doc = schema.node("doc", None, empty).unwrap();
//!
//! let with_breaks = add_trailing_breaks(&doc);
//! assert_eq!(with_breaks.to_string(), "doc(paragraph(externalTrailingBreak))");
//! assert_eq!(remove_trailing_breaks(&with_breaks), doc);
//! ```
//!
//! # Features
//!
//! - `cli` - Builds the `trailing-breaks` command line tool (default)

// Document model
pub mod model;

// Trailing break marker and transforms
pub mod breaks;

// Stock schema
pub mod basic;

// HTML serialization and parsing
pub mod html;

// Editor state, plugins and clipboard
pub mod editor;

pub use breaks::{
    AnyContent, TransformError, Transformable, add_trailing_breaks, add_trailing_breaks_json,
    remove_trailing_breaks, remove_trailing_breaks_json,
};
pub use editor::{
    ClipboardConfig, ClipboardPayload, Editor, EditorError, EditorState, ExportConfig, Plugin,
    TrailingBreakPlugin, serialize_with_trailing_breaks,
};
pub use html::{DomParser, DomSerializer};
pub use model::{Attrs, Fragment, ModelError, Node, NodeSpec, NodeType, Schema, SchemaSpec, Slice};
