//! Rule-based HTML to document parsing.
//!
//! Every node type contributes its `parse_dom` rules. For each element the
//! highest priority matching rule wins; declaration order breaks ties. A
//! winning rule with `ignore` set drops the element and everything inside
//! it. Elements no rule matches are transparent: their children are parsed
//! in place.
//!
//! Inline content showing up where blocks are expected is wrapped in the
//! schema's first text block type. Content that fits nowhere is dropped.

use super::dom::{self, DomNode, Element};
use crate::model::{Attrs, Fragment, ModelError, Node, NodeType, ParseRule, Schema};
use std::rc::Rc;
use tracing::{debug, trace};

/// Elements that end any implicitly opened text block.
const BLOCK_ELEMENTS: [&str; 12] = [
    "address", "article", "aside", "body", "div", "footer", "header", "html", "main", "nav",
    "section", "table",
];

#[derive(Debug, Clone)]
pub struct DomParser {
    schema: Schema,
    rules: Vec<(Rc<NodeType>, ParseRule)>,
    default_textblock: Option<Rc<NodeType>>,
}

impl DomParser {
    pub fn from_schema(schema: &Schema) -> Self {
        let mut rules: Vec<(Rc<NodeType>, ParseRule)> = schema
            .node_types()
            .flat_map(|node_type| {
                node_type
                    .spec()
                    .parse_dom
                    .iter()
                    .map(move |rule| (Rc::clone(node_type), rule.clone()))
            })
            .collect();
        // Stable, so equal priorities keep declaration order.
        rules.sort_by(|a, b| b.1.priority.cmp(&a.1.priority));

        let default_textblock = schema
            .node_types()
            .find(|node_type| {
                node_type.is_textblock()
                    && !node_type.is_code()
                    && node_type.compute_attrs(None).is_ok()
            })
            .cloned();

        Self {
            schema: schema.clone(),
            rules,
            default_textblock,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Parses HTML into a top node of the schema.
    pub fn parse(&self, html: &str) -> Result<Node, ModelError> {
        let nodes = dom::parse_html(html);
        let mut context = ParseContext::new(self, self.schema.top_node_type());
        context.add_all(&nodes);
        context.finish()
    }

    /// Parses HTML into a fragment of blocks, as the top node would hold them.
    pub fn parse_fragment(&self, html: &str) -> Result<Fragment, ModelError> {
        Ok(self.parse(html)?.content().clone())
    }

    fn match_element(&self, element: &Element) -> Option<Match<'_>> {
        self.rules.iter().find_map(|(node_type, rule)| {
            if !rule.matches(&element.name, &element.attrs) {
                return None;
            }
            if rule.ignore {
                return Some(Match::Ignore);
            }
            let mut attrs = rule.attrs.clone();
            if let Some(get_attrs) = rule.get_attrs {
                attrs.extend(get_attrs(&element.attrs)?);
            }
            Some(Match::Node(node_type, attrs))
        })
    }
}

enum Match<'a> {
    Ignore,
    Node(&'a Rc<NodeType>, Attrs),
}

struct Frame {
    node_type: Rc<NodeType>,
    attrs: Attrs,
    content: Vec<Node>,
    /// Opened to hold stray inline content, not by an element.
    implicit: bool,
}

impl Frame {
    /// The nodes to append before a `node_type` child fits at the end of
    /// this frame's content. `None` when it cannot be made to fit.
    fn fill_before(&self, node_type: &NodeType) -> Option<Vec<Node>> {
        let names = self
            .node_type
            .content_expr()
            .fill_before(self.content.iter().map(Node::type_name), node_type.name())?;
        let schema = self.node_type.schema();
        names
            .into_iter()
            .map(|name| schema.node_type(name)?.create_and_fill())
            .collect()
    }
}

struct ParseContext<'p> {
    parser: &'p DomParser,
    frames: Vec<Frame>,
}

impl<'p> ParseContext<'p> {
    fn new(parser: &'p DomParser, top: Rc<NodeType>) -> Self {
        Self {
            parser,
            frames: vec![Frame {
                node_type: top,
                attrs: Attrs::new(),
                content: Vec::new(),
                implicit: false,
            }],
        }
    }

    fn top(&mut self) -> &mut Frame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    fn add_all(&mut self, nodes: &[DomNode]) {
        for node in nodes {
            match node {
                DomNode::Text(text) => self.add_text(text),
                DomNode::Element(element) => self.add_element(element),
            }
        }
    }

    fn add_element(&mut self, element: &Element) {
        let parser = self.parser;
        match parser.match_element(element) {
            Some(Match::Ignore) => {
                trace!(tag = %element.name, "ignoring element");
            }
            Some(Match::Node(node_type, attrs)) => {
                let node_type = Rc::clone(node_type);
                if node_type.is_leaf() {
                    self.insert_leaf(&node_type, attrs);
                } else {
                    self.add_container(node_type, attrs, element);
                }
            }
            None if BLOCK_ELEMENTS.contains(&element.name.as_str()) => {
                self.close_implicit();
                self.add_all(&element.children);
                self.close_implicit();
            }
            None => self.add_all(&element.children),
        }
    }

    fn add_container(&mut self, node_type: Rc<NodeType>, attrs: Attrs, element: &Element) {
        if !self.find_place(&node_type) {
            debug!(node_type = node_type.name(), "no place for node, parsing its content in place");
            self.add_all(&element.children);
            return;
        }
        let depth = self.frames.len();
        self.frames.push(Frame {
            node_type,
            attrs,
            content: Vec::new(),
            implicit: false,
        });
        self.add_all(&element.children);
        while self.frames.len() > depth {
            self.close_top();
        }
    }

    fn insert_leaf(&mut self, node_type: &Rc<NodeType>, attrs: Attrs) {
        if !self.find_place(node_type) {
            debug!(node_type = node_type.name(), "dropping leaf with no place");
            return;
        }
        match node_type.create(Some(&attrs), Fragment::empty()) {
            Ok(node) => self.top().content.push(node),
            Err(err) => debug!(node_type = node_type.name(), %err, "dropping leaf"),
        }
    }

    fn add_text(&mut self, raw: &str) {
        let preserve = self.frames.last().is_some_and(|frame| frame.node_type.is_code());
        let text = if preserve {
            raw.to_string()
        } else {
            let inline_context = self
                .frames
                .last()
                .is_some_and(|frame| frame.node_type.inline_content());
            if !inline_context && raw.chars().all(char::is_whitespace) {
                return;
            }
            collapse_whitespace(raw)
        };
        let Some(text_type) = self.parser.schema.node_type("text") else {
            return;
        };
        if !self.find_place(&text_type) {
            debug!("dropping text with no place");
            return;
        }

        let frame = self.top();
        let text = if preserve || !starts_after_space(&frame.content) {
            text
        } else {
            text.trim_start_matches(' ').to_string()
        };
        if text.is_empty() {
            return;
        }
        frame.content.push(Node::from_parts(
            text_type,
            Attrs::new(),
            Fragment::empty(),
            Some(text),
        ));
    }

    /// Makes the innermost frame one that can hold `node_type`, closing
    /// implicit text blocks or opening one as needed.
    fn find_place(&mut self, node_type: &Rc<NodeType>) -> bool {
        let parser = self.parser;
        loop {
            let Some(frame) = self.frames.last() else {
                return false;
            };
            if let Some(fill) = frame.fill_before(node_type) {
                self.top().content.extend(fill);
                return true;
            }
            if node_type.is_inline() && !frame.node_type.inline_content() {
                let Some(textblock) = parser.default_textblock.clone() else {
                    return false;
                };
                if !textblock.content_expr().allows(node_type.name()) {
                    return false;
                }
                let Some(fill) = frame.fill_before(&textblock) else {
                    return false;
                };
                self.top().content.extend(fill);
                self.frames.push(Frame {
                    node_type: textblock,
                    attrs: Attrs::new(),
                    content: Vec::new(),
                    implicit: true,
                });
                return true;
            }
            if frame.implicit && self.frames.len() > 1 {
                self.close_top();
                continue;
            }
            return false;
        }
    }

    fn close_implicit(&mut self) {
        while self.frames.len() > 1 && self.frames.last().is_some_and(|frame| frame.implicit) {
            self.close_top();
        }
    }

    fn close_top(&mut self) {
        if self.frames.len() < 2 {
            return;
        }
        let Some(frame) = self.frames.pop() else {
            return;
        };
        let node_type = Rc::clone(&frame.node_type);
        match finish_frame(frame) {
            Some(node) => self.top().content.push(node),
            None => debug!(node_type = node_type.name(), "dropping node with invalid content"),
        }
    }

    fn finish(mut self) -> Result<Node, ModelError> {
        while self.frames.len() > 1 {
            self.close_top();
        }
        let Some(frame) = self.frames.pop() else {
            let top = self.parser.schema.top_node_type();
            return Err(ModelError::MissingTopNode(top.name().to_string()));
        };
        let node_type = Rc::clone(&frame.node_type);
        match finish_frame(frame) {
            Some(node) => Ok(node),
            None => Err(ModelError::InvalidContent {
                node_type: node_type.name().to_string(),
                content: "<>".to_string(),
            }),
        }
    }
}

/// Builds the frame's node. Empty frames whose type requires content are
/// filled with the minimal valid content.
fn finish_frame(mut frame: Frame) -> Option<Node> {
    if !frame.node_type.is_code() {
        trim_trailing_space(&mut frame.content);
    }
    let content = Fragment::from_nodes(frame.content);
    if frame.node_type.valid_content(&content) {
        return frame.node_type.create(Some(&frame.attrs), content).ok();
    }
    if content.is_empty() {
        let filled = frame.node_type.create_and_fill()?;
        return frame.node_type.create(Some(&frame.attrs), filled.content().clone()).ok();
    }
    None
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(ch);
            in_space = false;
        }
    }
    out
}

/// Whether a leading space in new text would be redundant: at the start of
/// a block, after a space or after a line break.
fn starts_after_space(content: &[Node]) -> bool {
    match content.last() {
        None => true,
        Some(last) => match last.text() {
            Some(text) => text.ends_with(' '),
            None => last.node_type().spec().leaf_text.as_deref() == Some("\n"),
        },
    }
}

fn trim_trailing_space(content: &mut Vec<Node>) {
    let Some(last) = content.last() else {
        return;
    };
    let Some(text) = last.text() else {
        return;
    };
    let trimmed = text.trim_end_matches(' ');
    if trimmed.len() == text.len() {
        return;
    }
    if trimmed.is_empty() {
        content.pop();
    } else {
        let trimmed = trimmed.to_string();
        if let Some(last) = content.last_mut() {
            *last = last.with_text(trimmed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic;

    fn parse(html: &str) -> String {
        let schema = basic::schema().unwrap();
        DomParser::from_schema(&schema).parse(html).unwrap().to_string()
    }

    #[test]
    fn test_parses_blocks_and_inline() {
        assert_eq!(
            parse("<h2>Title</h2><p>one<br>two</p><hr>"),
            "doc(heading(\"Title\"), paragraph(\"one\", hard_break, \"two\"), horizontal_rule)"
        );
    }

    #[test]
    fn test_heading_level_from_tag() {
        let schema = basic::schema().unwrap();
        let doc = DomParser::from_schema(&schema).parse("<h4>x</h4>").unwrap();
        assert_eq!(doc.child(0).unwrap().attr("level"), Some(&serde_json::json!(4)));
    }

    #[test]
    fn test_marker_markup_is_ignored() {
        assert_eq!(
            parse("<p><br data-external-trailing-break=\"true\"></p>"),
            "doc(paragraph)"
        );
        assert_eq!(
            parse("<p>a<br><br data-external-trailing-break=\"true\"></p>"),
            "doc(paragraph(\"a\", hard_break))"
        );
    }

    #[test]
    fn test_stray_inline_is_wrapped() {
        assert_eq!(parse("hello <b>world</b>"), "doc(paragraph(\"hello world\"))");
        assert_eq!(
            parse("<div>a</div><div>b</div>"),
            "doc(paragraph(\"a\"), paragraph(\"b\"))"
        );
    }

    #[test]
    fn test_whitespace_collapses_outside_code() {
        assert_eq!(
            parse("<p>  a \n  b  </p>\n<pre>x\n  y</pre>"),
            "doc(paragraph(\"a b\"), code_block(\"x\\n  y\"))"
        );
    }

    #[test]
    fn test_lists_and_required_content() {
        assert_eq!(
            parse("<ul><li><p>a</p></li><li>b</li></ul>"),
            "doc(bullet_list(list_item(paragraph(\"a\")), list_item(paragraph(\"b\"))))"
        );
        assert_eq!(parse("<blockquote></blockquote>"), "doc(blockquote(paragraph))");
        assert_eq!(parse(""), "doc(paragraph)");
    }

    #[test]
    fn test_list_item_gets_leading_paragraph() {
        assert_eq!(
            parse("<ul><li><h1>x</h1><p>y</p></li></ul>"),
            "doc(bullet_list(list_item(paragraph, heading(\"x\"), paragraph(\"y\"))))"
        );
        assert_eq!(
            parse("<ul><li><hr></li></ul>"),
            "doc(bullet_list(list_item(paragraph, horizontal_rule)))"
        );
    }

    #[test]
    fn test_images_need_src() {
        assert_eq!(
            parse("<p><img src=\"a.png\"><img></p>"),
            "doc(paragraph(image))"
        );
    }
}
