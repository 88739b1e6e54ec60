//! HTML serialization and parsing driven by the schema's node specs.
//!
//! [`DomSerializer`] renders each node through its spec's `to_dom`; nodes
//! without one (the top node, text) contribute only their content.
//! [`DomParser`] goes the other way using the specs' `parse_dom` rules.

use crate::model::{DomSpec, Fragment, Node, Schema};
use std::collections::BTreeMap;

pub mod dom;
pub mod parse;

pub use dom::{DomNode, Element, VOID_ELEMENTS, parse_html};
pub use parse::DomParser;

type ToDom = fn(&Node) -> DomSpec;

/// Renders document content to an HTML string.
#[derive(Debug, Clone)]
pub struct DomSerializer {
    renderers: BTreeMap<String, ToDom>,
}

impl DomSerializer {
    pub fn from_schema(schema: &Schema) -> Self {
        let renderers = schema
            .node_types()
            .filter_map(|node_type| {
                node_type
                    .spec()
                    .to_dom
                    .map(|to_dom| (node_type.name().to_string(), to_dom))
            })
            .collect();
        Self { renderers }
    }

    pub fn serialize_fragment(&self, fragment: &Fragment) -> String {
        self.serialize_fragment_with_attr(fragment, None)
    }

    pub fn serialize_node(&self, node: &Node) -> String {
        let mut out = String::new();
        self.render_node(node, None, &mut out);
        out
    }

    /// Like [`serialize_fragment`](Self::serialize_fragment), with an extra
    /// attribute on the first rendered element. The attribute is dropped if
    /// the fragment starts with text.
    pub fn serialize_fragment_with_attr(
        &self,
        fragment: &Fragment,
        first_attr: Option<(&str, &str)>,
    ) -> String {
        let mut out = String::new();
        let mut extra = first_attr;
        for node in fragment {
            self.render_node(node, extra.take(), &mut out);
        }
        out
    }

    fn render_node(&self, node: &Node, extra: Option<(&str, &str)>, out: &mut String) {
        if let Some(text) = node.text() {
            out.push_str(&html_escape::encode_text(text));
            return;
        }
        let Some(to_dom) = self.renderers.get(node.type_name()) else {
            let mut extra = extra;
            for child in node.content() {
                self.render_node(child, extra.take(), out);
            }
            return;
        };

        let spec = to_dom(node);
        out.push('<');
        out.push_str(&spec.tag);
        let attrs = spec
            .attrs
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .chain(extra);
        for (name, value) in attrs {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&html_escape::encode_double_quoted_attribute(value));
            out.push('"');
        }
        out.push('>');

        if dom::is_void(&spec.tag) {
            return;
        }
        if spec.hole {
            for child in node.content() {
                self.render_node(child, None, out);
            }
        }
        out.push_str("</");
        out.push_str(&spec.tag);
        out.push('>');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic;
    use crate::breaks::add_trailing_breaks;
    use serde_json::json;

    fn doc(schema: &Schema, value: serde_json::Value) -> Node {
        Node::from_json(schema, &value).unwrap()
    }

    #[test]
    fn test_serialize_blocks() {
        let schema = basic::schema().unwrap();
        let doc = doc(
            &schema,
            json!({"type": "doc", "content": [
                {"type": "heading", "attrs": {"level": 2}, "content": [{"type": "text", "text": "Title"}]},
                {"type": "paragraph", "content": [
                    {"type": "text", "text": "a < b"},
                    {"type": "hard_break"},
                    {"type": "image", "attrs": {"src": "x.png", "alt": "\"x\""}}
                ]},
                {"type": "horizontal_rule"}
            ]}),
        );
        let html = DomSerializer::from_schema(&schema).serialize_node(&doc);
        assert_eq!(
            html,
            "<h2>Title</h2><p>a &lt; b<br><img src=\"x.png\" alt=\"&quot;x&quot;\"></p><hr>"
        );
    }

    #[test]
    fn test_marker_renders_as_flagged_br() {
        let schema = basic::schema().unwrap();
        let doc = doc(
            &schema,
            json!({"type": "doc", "content": [{"type": "paragraph"}]}),
        );
        let serializer = DomSerializer::from_schema(&schema);
        assert_eq!(serializer.serialize_node(&doc), "<p></p>");
        assert_eq!(
            serializer.serialize_node(&add_trailing_breaks(&doc)),
            "<p><br data-external-trailing-break=\"true\"></p>"
        );
    }

    #[test]
    fn test_first_attr_lands_on_first_element() {
        let schema = basic::schema().unwrap();
        let doc = doc(
            &schema,
            json!({"type": "doc", "content": [
                {"type": "paragraph", "content": [{"type": "text", "text": "a"}]},
                {"type": "paragraph", "content": [{"type": "text", "text": "b"}]}
            ]}),
        );
        let html = DomSerializer::from_schema(&schema)
            .serialize_fragment_with_attr(doc.content(), Some(("data-pm-slice", "0 0 []")));
        assert_eq!(html, "<p data-pm-slice=\"0 0 []\">a</p><p>b</p>");
    }
}
