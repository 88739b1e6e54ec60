//! A stock schema covering common prose: paragraphs, headings, quotes, code,
//! lists, images, hard breaks, and the trailing break marker.

use crate::breaks::{TRAILING_BREAK, trailing_break_spec};
use crate::model::{
    AttrSpec, Attrs, DomSpec, ModelError, Node, NodeSpec, ParseRule, Schema, SchemaSpec,
};
use serde_json::{Value, json};
use std::collections::BTreeMap;

/// Builds a fresh schema. Each call yields an independent schema with its
/// own node cache.
pub fn schema() -> Result<Schema, ModelError> {
    Schema::new(spec())
}

/// The node specs behind [`schema`], for callers that want to extend them.
pub fn spec() -> SchemaSpec {
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
                to_dom: Some(|_| DomSpec::container("p")),
                parse_dom: vec![ParseRule::tag("p")],
                ..Default::default()
            },
        )
        .node(
            "heading",
            NodeSpec {
                content: "inline*".into(),
                group: Some("block".into()),
                attrs: vec![AttrSpec::with_default("level", json!(1))],
                to_dom: Some(heading_dom),
                parse_dom: (1..=6)
                    .map(|level| {
                        ParseRule::tag(&format!("h{level}")).with_attr("level", json!(level))
                    })
                    .collect(),
                ..Default::default()
            },
        )
        .node(
            "blockquote",
            NodeSpec {
                content: "block+".into(),
                group: Some("block".into()),
                to_dom: Some(|_| DomSpec::container("blockquote")),
                parse_dom: vec![ParseRule::tag("blockquote")],
                ..Default::default()
            },
        )
        .node(
            "code_block",
            NodeSpec {
                content: "text*".into(),
                group: Some("block".into()),
                code: true,
                to_dom: Some(|_| DomSpec::container("pre")),
                parse_dom: vec![ParseRule::tag("pre")],
                ..Default::default()
            },
        )
        .node(
            "horizontal_rule",
            NodeSpec {
                group: Some("block".into()),
                to_dom: Some(|_| DomSpec::empty("hr")),
                parse_dom: vec![ParseRule::tag("hr")],
                ..Default::default()
            },
        )
        .node(
            "bullet_list",
            NodeSpec {
                content: "list_item+".into(),
                group: Some("block".into()),
                to_dom: Some(|_| DomSpec::container("ul")),
                parse_dom: vec![ParseRule::tag("ul")],
                ..Default::default()
            },
        )
        .node(
            "list_item",
            NodeSpec {
                content: "paragraph block*".into(),
                to_dom: Some(|_| DomSpec::container("li")),
                parse_dom: vec![ParseRule::tag("li")],
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
            "image",
            NodeSpec {
                inline: true,
                group: Some("inline".into()),
                attrs: vec![
                    AttrSpec::required("src"),
                    AttrSpec::with_default("alt", Value::Null),
                ],
                to_dom: Some(image_dom),
                parse_dom: vec![ParseRule::tag("img[src]").with_get_attrs(image_attrs)],
                ..Default::default()
            },
        )
        .node(
            "hard_break",
            NodeSpec {
                inline: true,
                group: Some("inline".into()),
                selectable: false,
                leaf_text: Some("\n".into()),
                to_dom: Some(|_| DomSpec::empty("br")),
                parse_dom: vec![ParseRule::tag("br")],
                ..Default::default()
            },
        )
        .node(TRAILING_BREAK, trailing_break_spec())
}

fn heading_dom(node: &Node) -> DomSpec {
    let level = node
        .attr("level")
        .and_then(Value::as_u64)
        .unwrap_or(1)
        .clamp(1, 6);
    DomSpec::container(&format!("h{level}"))
}

fn image_dom(node: &Node) -> DomSpec {
    let mut dom = DomSpec::empty("img");
    if let Some(src) = node.attr("src").and_then(Value::as_str) {
        dom = dom.with_attr("src", src);
    }
    if let Some(alt) = node.attr("alt").and_then(Value::as_str) {
        dom = dom.with_attr("alt", alt);
    }
    dom
}

fn image_attrs(attrs: &BTreeMap<String, String>) -> Option<Attrs> {
    let src = attrs.get("src")?;
    let mut parsed = Attrs::from([("src".to_string(), json!(src))]);
    if let Some(alt) = attrs.get("alt") {
        parsed.insert("alt".to_string(), json!(alt));
    }
    Some(parsed)
}
