//! A forgiving HTML tokenizer that builds a small element tree.
//!
//! No implied end tags or foster parenting: end tags close the nearest open
//! element of the same name and stray end tags are dropped. Comments,
//! doctypes, processing instructions and `script`/`style` bodies are skipped.

use std::collections::BTreeMap;

/// Elements that never have content or an end tag.
pub const VOID_ELEMENTS: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

pub fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomNode {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Lowercased tag name.
    pub name: String,
    pub attrs: BTreeMap<String, String>,
    pub children: Vec<DomNode>,
}

impl Element {
    fn new(name: String, attrs: BTreeMap<String, String>) -> Self {
        Self {
            name,
            attrs,
            children: Vec::new(),
        }
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let decoded = html_escape::decode_html_entities(text);
        if let Some(DomNode::Text(last)) = self.children.last_mut() {
            last.push_str(&decoded);
        } else {
            self.children.push(DomNode::Text(decoded.into_owned()));
        }
    }
}

/// Parses an HTML fragment into its top-level nodes.
pub fn parse_html(input: &str) -> Vec<DomNode> {
    let bytes = input.as_bytes();
    let mut stack = vec![Element::new(String::new(), BTreeMap::new())];
    let mut idx = 0_usize;

    while idx < bytes.len() {
        if bytes[idx] != b'<' {
            let next = find_byte(bytes, idx, b'<').unwrap_or(bytes.len());
            top(&mut stack).push_text(&input[idx..next]);
            idx = next;
            continue;
        }

        if starts_with(bytes, idx, b"<!--") {
            idx = skip_comment(bytes, idx);
            continue;
        }

        if starts_with(bytes, idx, b"<!") || starts_with(bytes, idx, b"<?") {
            idx = skip_to_gt(bytes, idx.saturating_add(2));
            continue;
        }

        let Some((tag, next_idx)) = parse_tag(input, idx) else {
            top(&mut stack).push_text("<");
            idx = idx.saturating_add(1);
            continue;
        };

        if tag.is_end {
            close_element(&mut stack, &tag.name);
            idx = next_idx;
            continue;
        }

        if !tag.self_closing && (tag.name == "script" || tag.name == "style") {
            idx = skip_raw_text(bytes, next_idx, &tag.name);
            continue;
        }

        let element = Element::new(tag.name, tag.attrs);
        if tag.self_closing || is_void(&element.name) {
            top(&mut stack).children.push(DomNode::Element(element));
        } else {
            stack.push(element);
        }
        idx = next_idx;
    }

    while stack.len() > 1 {
        pop_into_parent(&mut stack);
    }
    stack.pop().map(|root| root.children).unwrap_or_default()
}

fn top(stack: &mut [Element]) -> &mut Element {
    // The root is never popped before the end of input.
    let last = stack.len() - 1;
    &mut stack[last]
}

fn pop_into_parent(stack: &mut Vec<Element>) {
    if stack.len() < 2 {
        return;
    }
    if let Some(element) = stack.pop() {
        top(stack).children.push(DomNode::Element(element));
    }
}

fn close_element(stack: &mut Vec<Element>, name: &str) {
    let Some(position) = stack.iter().skip(1).rposition(|open| open.name == name) else {
        return;
    };
    while stack.len() > position + 1 {
        pop_into_parent(stack);
    }
}

#[derive(Debug)]
struct ParsedTag {
    name: String,
    attrs: BTreeMap<String, String>,
    is_end: bool,
    self_closing: bool,
}

fn parse_tag(input: &str, start: usize) -> Option<(ParsedTag, usize)> {
    let bytes = input.as_bytes();
    let mut idx = start.saturating_add(1);
    let mut is_end = false;
    if bytes.get(idx).copied() == Some(b'/') {
        is_end = true;
        idx = idx.saturating_add(1);
    }

    let name_start = idx;
    while idx < bytes.len() && is_tag_name_char(bytes[idx]) {
        idx = idx.saturating_add(1);
    }
    if idx == name_start {
        return None;
    }
    let name = input[name_start..idx].to_ascii_lowercase();

    let mut attrs = BTreeMap::new();
    loop {
        idx = skip_spaces(bytes, idx);
        match bytes.get(idx).copied() {
            None => return None,
            Some(b'>') => {
                let tag = ParsedTag {
                    name,
                    attrs,
                    is_end,
                    self_closing: false,
                };
                return Some((tag, idx.saturating_add(1)));
            }
            Some(b'/') if bytes.get(idx.saturating_add(1)).copied() == Some(b'>') => {
                let tag = ParsedTag {
                    name,
                    attrs,
                    is_end,
                    self_closing: true,
                };
                return Some((tag, idx.saturating_add(2)));
            }
            Some(_) => {}
        }

        let attr_start = idx;
        while idx < bytes.len() && !is_attr_delimiter(bytes[idx]) {
            idx = idx.saturating_add(1);
        }
        if idx == attr_start {
            // A lone `=` or `/`.
            idx = idx.saturating_add(1);
            continue;
        }
        let attr_name = input[attr_start..idx].to_ascii_lowercase();

        idx = skip_spaces(bytes, idx);
        let mut value = String::new();
        if bytes.get(idx).copied() == Some(b'=') {
            idx = skip_spaces(bytes, idx.saturating_add(1));
            let (raw, after) = read_attr_value(input, idx)?;
            value = html_escape::decode_html_entities(raw).into_owned();
            idx = after;
        }
        attrs.entry(attr_name).or_insert(value);
    }
}

fn read_attr_value(input: &str, start: usize) -> Option<(&str, usize)> {
    let bytes = input.as_bytes();
    match bytes.get(start).copied() {
        Some(quote @ (b'"' | b'\'')) => {
            let end = find_byte(bytes, start.saturating_add(1), quote)?;
            Some((&input[start + 1..end], end.saturating_add(1)))
        }
        Some(_) => {
            let mut idx = start;
            while idx < bytes.len() && !bytes[idx].is_ascii_whitespace() && bytes[idx] != b'>' {
                idx = idx.saturating_add(1);
            }
            Some((&input[start..idx], idx))
        }
        None => None,
    }
}

fn skip_raw_text(bytes: &[u8], start: usize, tag_name: &str) -> usize {
    let tag_bytes = tag_name.as_bytes();
    let mut idx = start;
    while idx < bytes.len() {
        if bytes[idx] == b'<'
            && bytes.get(idx.saturating_add(1)).copied() == Some(b'/')
            && starts_with_ignore_ascii_case(bytes, idx.saturating_add(2), tag_bytes)
        {
            return skip_to_gt(bytes, idx);
        }
        idx = idx.saturating_add(1);
    }
    bytes.len()
}

fn skip_comment(bytes: &[u8], start: usize) -> usize {
    find_subslice(bytes, start.saturating_add(4), b"-->")
        .map(|end| end.saturating_add(3))
        .unwrap_or(bytes.len())
}

fn skip_to_gt(bytes: &[u8], mut idx: usize) -> usize {
    while idx < bytes.len() {
        if bytes[idx] == b'>' {
            return idx.saturating_add(1);
        }
        idx = idx.saturating_add(1);
    }
    bytes.len()
}

fn skip_spaces(bytes: &[u8], mut idx: usize) -> usize {
    while idx < bytes.len() && bytes[idx].is_ascii_whitespace() {
        idx = idx.saturating_add(1);
    }
    idx
}

fn is_tag_name_char(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b':')
}

fn is_attr_delimiter(byte: u8) -> bool {
    byte.is_ascii_whitespace() || matches!(byte, b'=' | b'>' | b'/' | b'"' | b'\'')
}

fn starts_with(bytes: &[u8], idx: usize, pattern: &[u8]) -> bool {
    let end = idx.saturating_add(pattern.len());
    end <= bytes.len() && bytes[idx..end] == *pattern
}

fn starts_with_ignore_ascii_case(bytes: &[u8], idx: usize, pattern: &[u8]) -> bool {
    let end = idx.saturating_add(pattern.len());
    end <= bytes.len()
        && bytes[idx..end]
            .iter()
            .zip(pattern.iter())
            .all(|(left, right)| left.eq_ignore_ascii_case(right))
}

fn find_subslice(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from >= bytes.len() {
        return None;
    }
    bytes[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|offset| from + offset)
}

fn find_byte(bytes: &[u8], from: usize, byte: u8) -> Option<usize> {
    bytes
        .get(from..)?
        .iter()
        .position(|candidate| *candidate == byte)
        .map(|offset| from + offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(node: &DomNode) -> &Element {
        match node {
            DomNode::Element(element) => element,
            DomNode::Text(text) => panic!("expected element, got text {text:?}"),
        }
    }

    #[test]
    fn test_nested_elements_and_text() {
        let nodes = parse_html("<p>a &amp; b<br>c</p>");
        assert_eq!(nodes.len(), 1);
        let p = element(&nodes[0]);
        assert_eq!(p.name, "p");
        assert_eq!(p.children.len(), 3);
        assert_eq!(p.children[0], DomNode::Text("a & b".into()));
        assert_eq!(element(&p.children[1]).name, "br");
    }

    #[test]
    fn test_attributes() {
        let nodes = parse_html(
            r#"<BR data-external-trailing-break="true"><img src='a.png' alt=cat hidden/>"#,
        );
        let br = element(&nodes[0]);
        assert_eq!(br.name, "br");
        assert_eq!(br.attrs["data-external-trailing-break"], "true");
        let img = element(&nodes[1]);
        assert_eq!(img.attrs["src"], "a.png");
        assert_eq!(img.attrs["alt"], "cat");
        assert_eq!(img.attrs["hidden"], "");
    }

    #[test]
    fn test_unclosed_and_stray_tags() {
        let nodes = parse_html("<blockquote><p>x</span></blockquote>tail");
        assert_eq!(nodes.len(), 2);
        let quote = element(&nodes[0]);
        assert_eq!(element(&quote.children[0]).name, "p");
        assert_eq!(nodes[1], DomNode::Text("tail".into()));
    }

    #[test]
    fn test_skips_comments_and_scripts() {
        let nodes = parse_html("<!doctype html><!-- c --><p>a<script>x < y</script>b</p>");
        let p = element(&nodes[0]);
        assert_eq!(p.children, vec![DomNode::Text("ab".into())]);
    }

    #[test]
    fn test_lone_angle_bracket_is_text() {
        let nodes = parse_html("1 < 2");
        assert_eq!(nodes, vec![DomNode::Text("1 < 2".into())]);
    }
}
