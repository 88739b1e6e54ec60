//! A naive, simple oracle implementation for differential testing.
//!
//! Rebuilds every node it visits and creates a fresh marker each time, so it
//! shares nothing with its input. Results must be structurally equal to the
//! real transforms.
use trailing_breaks::breaks::{TRAILING_BREAK, is_trailing_break};
use trailing_breaks::{Fragment, Node, Slice};

fn copy_leaf(node: &Node) -> Node {
    match node.text() {
        Some(text) => node.with_text(text.to_string()),
        None => node.copy(Fragment::empty()),
    }
}

fn fresh_marker(node: &Node) -> Option<Node> {
    let marker_type = node.node_type().schema().node_type(TRAILING_BREAK)?;
    marker_type.create(None, Fragment::empty()).ok()
}

fn wants_marker(children: &[Node]) -> bool {
    match children.last() {
        None => true,
        Some(last) if !last.is_text() => true,
        Some(last) => last.text().unwrap_or_default().ends_with('\n'),
    }
}

pub fn add(node: &Node) -> Node {
    if node.is_leaf() {
        return copy_leaf(node);
    }
    let children: Vec<Node> = node.content().iter().map(add).collect();
    if node.is_textblock() && wants_marker(&children) {
        if let Some(marker) = fresh_marker(node) {
            let mut with_marker = children.clone();
            with_marker.push(marker);
            let candidate = Fragment::from_nodes(with_marker);
            if node.node_type().valid_content(&candidate) {
                return node.copy(candidate);
            }
        }
    }
    node.copy(Fragment::from_nodes(children))
}

pub fn remove(node: &Node) -> Node {
    if node.is_leaf() {
        return copy_leaf(node);
    }
    node.copy(remove_fragment(node.content()))
}

pub fn add_fragment(fragment: &Fragment) -> Fragment {
    Fragment::from_nodes(fragment.iter().map(add).collect::<Vec<_>>())
}

pub fn remove_fragment(fragment: &Fragment) -> Fragment {
    Fragment::from_nodes(
        fragment
            .iter()
            .filter(|child| !is_trailing_break(child))
            .map(remove)
            .collect::<Vec<_>>(),
    )
}

pub fn add_slice(slice: &Slice) -> Slice {
    Slice::new(
        add_fragment(slice.content()),
        slice.open_start(),
        slice.open_end(),
    )
}

pub fn remove_slice(slice: &Slice) -> Slice {
    Slice::new(
        remove_fragment(slice.content()),
        slice.open_start(),
        slice.open_end(),
    )
}

/// Number of markers anywhere in the tree.
pub fn count_markers(node: &Node) -> usize {
    usize::from(is_trailing_break(node))
        + node.content().iter().map(count_markers).sum::<usize>()
}
