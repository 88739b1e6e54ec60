//! The trailing break marker node kind.
//!
//! Rendering engines prop up empty lines with a synthetic `<br>` that never
//! reaches exported HTML. The marker stands in for it in serialization-bound
//! copies of a document. It renders as
//! `<br data-external-trailing-break="true">` and its parse rule ignores that
//! markup, so a marker can never find its way back into a live document.

use crate::model::{DomSpec, Node, NodeSpec, ParseRule, Schema};
use tracing::{debug, trace};

/// Node type name of the marker.
pub const TRAILING_BREAK: &str = "externalTrailingBreak";

/// Attribute carried by rendered markers.
pub const MARKER_ATTR: &str = "data-external-trailing-break";

/// Outranks the default priority of plain `br` rules such as the hard break.
pub const PARSE_PRIORITY: u32 = 200;

const CACHE_KEY: &str = "externalTrailingBreak.instance";

/// Node spec to register under [`TRAILING_BREAK`].
pub fn trailing_break_spec() -> NodeSpec {
    NodeSpec {
        inline: true,
        atom: true,
        selectable: false,
        group: Some("inline".into()),
        to_dom: Some(render_marker),
        parse_dom: vec![
            ParseRule::tag(&format!("br[{MARKER_ATTR}]"))
                .with_priority(PARSE_PRIORITY)
                .ignored(),
        ],
        ..Default::default()
    }
}

fn render_marker(_: &Node) -> DomSpec {
    DomSpec::empty("br").with_attr(MARKER_ATTR, "true")
}

pub fn is_trailing_break(node: &Node) -> bool {
    node.type_name() == TRAILING_BREAK
}

/// The schema's canonical marker node, created on first use. Returns `None`
/// when the schema doesn't define the marker kind.
pub fn cached_trailing_break(schema: &Schema) -> Option<Node> {
    schema.cached_or_insert_with(CACHE_KEY, |schema| {
        let Some(node_type) = schema.node_type(TRAILING_BREAK) else {
            debug!("schema has no `{TRAILING_BREAK}` node type");
            return None;
        };
        trace!("caching trailing break instance");
        node_type.create(None, Default::default()).ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic;
    use std::collections::BTreeMap;

    #[test]
    fn test_marker_is_reference_stable() {
        let schema = basic::schema().unwrap();
        let first = cached_trailing_break(&schema).unwrap();
        let second = cached_trailing_break(&schema).unwrap();
        assert!(first.ptr_eq(&second));
        assert!(is_trailing_break(&first));
    }

    #[test]
    fn test_marker_is_per_schema() {
        let a = basic::schema().unwrap();
        let b = basic::schema().unwrap();
        let marker_a = cached_trailing_break(&a).unwrap();
        let marker_b = cached_trailing_break(&b).unwrap();
        assert!(!marker_a.ptr_eq(&marker_b));
        assert_eq!(marker_a, marker_b);
    }

    #[test]
    fn test_marker_type_flags() {
        let schema = basic::schema().unwrap();
        let marker = cached_trailing_break(&schema).unwrap();
        let node_type = marker.node_type();
        assert!(node_type.is_inline());
        assert!(node_type.is_leaf() && node_type.is_atom());
        assert!(!node_type.spec().selectable);
        assert_eq!(marker.node_size(), 1);
    }

    #[test]
    fn test_parse_rule_only_matches_marked_br() {
        let rule = &trailing_break_spec().parse_dom[0];
        assert!(rule.ignore);
        let marked = BTreeMap::from([(MARKER_ATTR.to_string(), "true".to_string())]);
        assert!(rule.matches("br", &marked));
        assert!(!rule.matches("br", &BTreeMap::new()));
    }

    #[test]
    fn test_schema_without_marker_kind() {
        let schema = crate::model::Schema::new(
            crate::model::SchemaSpec::new()
                .node(
                    "doc",
                    NodeSpec {
                        content: "text*".into(),
                        ..Default::default()
                    },
                )
                .node("text", NodeSpec::default()),
        )
        .unwrap();
        assert!(cached_trailing_break(&schema).is_none());
    }
}
