//! Schemas and node types.
//!
//! A [`Schema`] is built once from a [`SchemaSpec`] and shared by every node
//! created from it. Besides the node type registry it carries a small cache of
//! nodes keyed by namespaced strings, used to memoize singletons such as the
//! trailing break marker.
//!
//! Schemas and nodes are `Rc`-based and therefore bound to one thread. The
//! cache relies on that: its read-then-insert sequence is not atomic.
//!
//! Every node type holds a strong handle to its schema, so any node reaches
//! the registry and cache no matter which handles the caller kept. The
//! registry in turn owns its node types. That cycle is never broken: a
//! schema, its types and its cached nodes live until the process exits.
//! Build schemas once and share them.

use super::content::ContentExpr;
use super::{Attrs, Fragment, ModelError, Node};
use serde_json::Value;
use std::cell::{OnceCell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

/// Priority of parse rules that don't set one.
pub const DEFAULT_PRIORITY: u32 = 50;

/// The element a node renders to. `hole` marks where the node's children go;
/// elements without a hole are rendered empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomSpec {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub hole: bool,
}

impl DomSpec {
    pub fn container(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attrs: Vec::new(),
            hole: true,
        }
    }

    pub fn empty(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attrs: Vec::new(),
            hole: false,
        }
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attrs.push((name.to_string(), value.into()));
        self
    }
}

/// Maps an HTML element's attributes to node attributes. Returning `None`
/// means the rule does not match the element.
pub type GetAttrs = fn(&BTreeMap<String, String>) -> Option<Attrs>;

/// Describes which HTML elements parse into a node type.
///
/// `tag` is a tiny selector: `name`, `name[attr]` or `name[attr=value]`.
/// Rules with `ignore` set swallow the matching element and its content.
#[derive(Debug, Clone)]
pub struct ParseRule {
    pub tag: String,
    pub priority: u32,
    pub ignore: bool,
    pub attrs: Attrs,
    pub get_attrs: Option<GetAttrs>,
}

impl ParseRule {
    pub fn tag(selector: &str) -> Self {
        Self {
            tag: selector.to_string(),
            priority: DEFAULT_PRIORITY,
            ignore: false,
            attrs: Attrs::new(),
            get_attrs: None,
        }
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn ignored(mut self) -> Self {
        self.ignore = true;
        self
    }

    pub fn with_attr(mut self, name: &str, value: Value) -> Self {
        self.attrs.insert(name.to_string(), value);
        self
    }

    pub fn with_get_attrs(mut self, get_attrs: GetAttrs) -> Self {
        self.get_attrs = Some(get_attrs);
        self
    }

    /// Checks the selector against an element. Names compare
    /// case-insensitively, attribute values exactly.
    pub fn matches(&self, name: &str, attrs: &BTreeMap<String, String>) -> bool {
        let (tag, condition) = match self.tag.split_once('[') {
            Some((tag, rest)) => (tag, Some(rest.trim_end_matches(']'))),
            None => (self.tag.as_str(), None),
        };
        if !tag.eq_ignore_ascii_case(name) {
            return false;
        }
        match condition {
            None => true,
            Some(condition) => match condition.split_once('=') {
                None => attrs.contains_key(condition),
                Some((attr, expected)) => {
                    let expected = expected.trim_matches(|c| c == '"' || c == '\'');
                    attrs.get(attr).is_some_and(|actual| actual == expected)
                }
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttrSpec {
    pub name: String,
    /// `None` makes the attribute required.
    pub default: Option<Value>,
}

impl AttrSpec {
    pub fn required(name: &str) -> Self {
        Self {
            name: name.to_string(),
            default: None,
        }
    }

    pub fn with_default(name: &str, default: Value) -> Self {
        Self {
            name: name.to_string(),
            default: Some(default),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NodeSpec {
    /// Content expression; empty for leaves.
    pub content: String,
    /// Space separated group names.
    pub group: Option<String>,
    pub inline: bool,
    pub atom: bool,
    pub selectable: bool,
    pub code: bool,
    pub attrs: Vec<AttrSpec>,
    /// Plain-text rendering of a leaf, used for clipboard text.
    pub leaf_text: Option<String>,
    pub to_dom: Option<fn(&Node) -> DomSpec>,
    pub parse_dom: Vec<ParseRule>,
}

impl Default for NodeSpec {
    fn default() -> Self {
        Self {
            content: String::new(),
            group: None,
            inline: false,
            atom: false,
            selectable: true,
            code: false,
            attrs: Vec::new(),
            leaf_text: None,
            to_dom: None,
            parse_dom: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SchemaSpec {
    pub nodes: Vec<(String, NodeSpec)>,
    /// Defaults to `doc`.
    pub top_node: Option<String>,
}

impl SchemaSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(mut self, name: &str, spec: NodeSpec) -> Self {
        self.nodes.push((name.to_string(), spec));
        self
    }

    pub fn top_node(mut self, name: &str) -> Self {
        self.top_node = Some(name.to_string());
        self
    }
}

pub struct NodeType {
    name: String,
    spec: NodeSpec,
    groups: Vec<String>,
    content: ContentExpr,
    inline_content: bool,
    schema: Schema,
}

impl NodeType {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn spec(&self) -> &NodeSpec {
        &self.spec
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn content_expr(&self) -> &ContentExpr {
        &self.content
    }

    pub fn is_text(&self) -> bool {
        self.name == "text"
    }

    pub fn is_inline(&self) -> bool {
        self.spec.inline || self.is_text()
    }

    pub fn is_block(&self) -> bool {
        !self.is_inline()
    }

    /// A block whose children are inline content.
    pub fn is_textblock(&self) -> bool {
        self.is_block() && self.inline_content
    }

    pub fn inline_content(&self) -> bool {
        self.inline_content
    }

    pub fn is_leaf(&self) -> bool {
        self.content.is_empty()
    }

    pub fn is_atom(&self) -> bool {
        self.is_leaf() || self.spec.atom
    }

    pub fn is_code(&self) -> bool {
        self.spec.code
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn valid_content(&self, content: &Fragment) -> bool {
        self.content
            .accepts(content.iter().map(|child| child.type_name()))
    }

    /// Fills in attribute defaults. Unknown attributes are dropped.
    pub fn compute_attrs(&self, given: Option<&Attrs>) -> Result<Attrs, ModelError> {
        let mut attrs = Attrs::new();
        for attr in &self.spec.attrs {
            let value = given
                .and_then(|given| given.get(&attr.name))
                .cloned()
                .or_else(|| attr.default.clone())
                .ok_or_else(|| ModelError::MissingAttr {
                    node_type: self.name.clone(),
                    attr: attr.name.clone(),
                })?;
            attrs.insert(attr.name.clone(), value);
        }
        Ok(attrs)
    }

    /// Creates a node without checking its content.
    pub fn create(
        self: &Rc<Self>,
        attrs: Option<&Attrs>,
        content: Fragment,
    ) -> Result<Node, ModelError> {
        let attrs = self.compute_attrs(attrs)?;
        Ok(Node::from_parts(Rc::clone(self), attrs, content, None))
    }

    /// Creates a node, failing if `content` does not fit the content expression.
    pub fn create_checked(
        self: &Rc<Self>,
        attrs: Option<&Attrs>,
        content: Fragment,
    ) -> Result<Node, ModelError> {
        if !self.valid_content(&content) {
            return Err(ModelError::InvalidContent {
                node_type: self.name.clone(),
                content: content.to_string(),
            });
        }
        self.create(attrs, content)
    }

    /// Creates a node with default attributes and the minimal content its
    /// expression requires. Returns `None` when that is impossible, e.g. a
    /// required attribute or a required text child.
    pub fn create_and_fill(self: &Rc<Self>) -> Option<Node> {
        self.create_and_fill_at(0)
    }

    fn create_and_fill_at(self: &Rc<Self>, depth: usize) -> Option<Node> {
        const MAX_FILL_DEPTH: usize = 16;
        if depth > MAX_FILL_DEPTH {
            return None;
        }
        let schema = self.schema();
        let mut children = Vec::new();
        for name in self.content.required() {
            let child_type = schema.node_type(name)?;
            if child_type.is_text() {
                return None;
            }
            children.push(child_type.create_and_fill_at(depth + 1)?);
        }
        self.create(None, Fragment::from_nodes(children)).ok()
    }
}

impl fmt::Debug for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeType")
            .field("name", &self.name)
            .field("groups", &self.groups)
            .field("content", &self.spec.content)
            .finish()
    }
}

struct SchemaInner {
    /// Set once, right after the schema is allocated.
    types: OnceCell<Vec<Rc<NodeType>>>,
    index: BTreeMap<String, usize>,
    top: usize,
    cached: RefCell<BTreeMap<String, Node>>,
}

/// Shared handle to a schema. Cloning is cheap.
#[derive(Clone)]
pub struct Schema(Rc<SchemaInner>);

impl Schema {
    pub fn new(spec: SchemaSpec) -> Result<Self, ModelError> {
        let mut index = BTreeMap::new();
        let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (position, (name, node)) in spec.nodes.iter().enumerate() {
            if index.insert(name.clone(), position).is_some() {
                return Err(ModelError::DuplicateNodeType(name.clone()));
            }
            for group in node.group.iter().flat_map(|group| group.split_whitespace()) {
                groups.entry(group.to_string()).or_default().push(name.clone());
            }
        }

        let top_name = spec.top_node.clone().unwrap_or_else(|| "doc".to_string());
        let top = *index
            .get(&top_name)
            .ok_or(ModelError::MissingTopNode(top_name))?;

        let resolve = |name: &str| {
            if index.contains_key(name) {
                Some(vec![name.to_string()])
            } else {
                groups.get(name).cloned()
            }
        };
        let inline_types: BTreeSet<String> = spec
            .nodes
            .iter()
            .filter(|(name, node)| node.inline || name == "text")
            .map(|(name, _)| name.clone())
            .collect();
        let is_inline = |name: &str| inline_types.contains(name);

        let mut parts = Vec::with_capacity(spec.nodes.len());
        for (name, node) in spec.nodes {
            let content = ContentExpr::parse(&node.content, resolve)?;
            let inline_content = content.mentioned().into_iter().any(is_inline);
            let node_groups = node
                .group
                .as_deref()
                .map(|group| group.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default();
            parts.push((name, node, node_groups, content, inline_content));
        }

        let schema = Schema(Rc::new(SchemaInner {
            types: OnceCell::new(),
            index,
            top,
            cached: RefCell::new(BTreeMap::new()),
        }));
        let types = parts
            .into_iter()
            .map(|(name, spec, groups, content, inline_content)| {
                Rc::new(NodeType {
                    name,
                    spec,
                    groups,
                    content,
                    inline_content,
                    schema: schema.clone(),
                })
            })
            .collect();
        // Freshly allocated, so the cell is still empty.
        let _ = schema.0.types.set(types);
        Ok(schema)
    }

    fn types(&self) -> &[Rc<NodeType>] {
        self.0.types.get().map(Vec::as_slice).unwrap_or_default()
    }

    pub fn node_type(&self, name: &str) -> Option<Rc<NodeType>> {
        self.0
            .index
            .get(name)
            .and_then(|position| self.types().get(*position))
            .cloned()
    }

    /// Node types in declaration order.
    pub fn node_types(&self) -> impl Iterator<Item = &Rc<NodeType>> {
        self.types().iter()
    }

    pub fn top_node_type(&self) -> Rc<NodeType> {
        Rc::clone(&self.types()[self.0.top])
    }

    /// Creates a checked node of the named type.
    pub fn node(
        &self,
        name: &str,
        attrs: Option<&Attrs>,
        content: impl Into<Fragment>,
    ) -> Result<Node, ModelError> {
        let node_type = self
            .node_type(name)
            .ok_or_else(|| ModelError::UnknownNodeType(name.to_string()))?;
        node_type.create_checked(attrs, content.into())
    }

    /// Creates a text node. Empty text is not allowed.
    pub fn text(&self, text: &str) -> Result<Node, ModelError> {
        let node_type = self
            .node_type("text")
            .ok_or_else(|| ModelError::UnknownNodeType("text".to_string()))?;
        if text.is_empty() {
            return Err(ModelError::EmptyText);
        }
        Ok(Node::from_parts(
            node_type,
            Attrs::new(),
            Fragment::empty(),
            Some(text.to_string()),
        ))
    }

    pub fn cached(&self, key: &str) -> Option<Node> {
        self.0.cached.borrow().get(key).cloned()
    }

    /// Returns the node cached under `key`, building and storing it first if
    /// absent. `make` runs without the cache borrowed.
    pub fn cached_or_insert_with<F>(&self, key: &str, make: F) -> Option<Node>
    where
        F: FnOnce(&Schema) -> Option<Node>,
    {
        if let Some(existing) = self.cached(key) {
            return Some(existing);
        }
        let created = make(self)?;
        self.0
            .cached
            .borrow_mut()
            .insert(key.to_string(), created.clone());
        Some(created)
    }

    pub fn ptr_eq(&self, other: &Schema) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field(
                "nodes",
                &self.types().iter().map(|t| t.name()).collect::<Vec<_>>(),
            )
            .field("top_node", &self.top_node_type().name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec() -> SchemaSpec {
        SchemaSpec::new()
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
                "heading",
                NodeSpec {
                    content: "inline*".into(),
                    group: Some("block".into()),
                    attrs: vec![AttrSpec::required("level")],
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
    }

    #[test]
    fn test_type_classification() {
        let schema = Schema::new(spec()).unwrap();
        let paragraph = schema.node_type("paragraph").unwrap();
        let text = schema.node_type("text").unwrap();
        let doc = schema.top_node_type();

        assert!(paragraph.is_textblock());
        assert!(paragraph.is_block());
        assert!(!paragraph.is_leaf());
        assert!(text.is_text() && text.is_inline() && text.is_leaf());
        assert!(!doc.is_textblock());
        assert_eq!(doc.name(), "doc");
    }

    #[test]
    fn test_duplicate_and_missing_top() {
        let dup = spec().node("text", NodeSpec::default());
        assert!(matches!(
            Schema::new(dup),
            Err(ModelError::DuplicateNodeType(name)) if name == "text"
        ));

        let missing = spec().top_node("root");
        assert!(matches!(
            Schema::new(missing),
            Err(ModelError::MissingTopNode(_))
        ));
    }

    #[test]
    fn test_required_attrs() {
        let schema = Schema::new(spec()).unwrap();
        let heading = schema.node_type("heading").unwrap();
        assert!(matches!(
            heading.create(None, Fragment::empty()),
            Err(ModelError::MissingAttr { .. })
        ));

        let attrs = Attrs::from([("level".to_string(), json!(2))]);
        let node = heading.create(Some(&attrs), Fragment::empty()).unwrap();
        assert_eq!(node.attr("level"), Some(&json!(2)));
        assert!(heading.create_and_fill().is_none());
    }

    #[test]
    fn test_create_and_fill_doc() {
        let schema = Schema::new(spec()).unwrap();
        let doc = schema.top_node_type().create_and_fill().unwrap();
        assert_eq!(doc.to_string(), "doc(paragraph)");
    }

    #[test]
    fn test_parse_rule_selectors() {
        let attrs = BTreeMap::from([("data-x".to_string(), "true".to_string())]);
        assert!(ParseRule::tag("br").matches("BR", &attrs));
        assert!(ParseRule::tag("br[data-x]").matches("br", &attrs));
        assert!(ParseRule::tag("br[data-x=true]").matches("br", &attrs));
        assert!(!ParseRule::tag("br[data-x=\"false\"]").matches("br", &attrs));
        assert!(!ParseRule::tag("br[data-y]").matches("br", &attrs));
        assert!(!ParseRule::tag("p").matches("br", &attrs));
    }

    #[test]
    fn test_cache_builds_once() {
        let schema = Schema::new(spec()).unwrap();
        let mut calls = 0;
        let first = schema
            .cached_or_insert_with("test.instance", |schema| {
                calls += 1;
                schema.text("x").ok()
            })
            .unwrap();
        let second = schema
            .cached_or_insert_with("test.instance", |_| unreachable!())
            .unwrap();
        assert_eq!(calls, 1);
        assert!(first.ptr_eq(&second));
        assert!(schema.cached("other.instance").is_none());
    }
}
