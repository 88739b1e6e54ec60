//! Slices and position resolution.

use super::{Fragment, ModelError, Node};

/// A piece of a document. `open_start` and `open_end` count the levels of
/// structure cut open at each edge.
#[derive(Debug, Clone, PartialEq)]
pub struct Slice {
    content: Fragment,
    open_start: usize,
    open_end: usize,
}

impl Slice {
    pub fn new(content: Fragment, open_start: usize, open_end: usize) -> Self {
        Self {
            content,
            open_start,
            open_end,
        }
    }

    pub fn empty() -> Self {
        Self::new(Fragment::empty(), 0, 0)
    }

    pub fn content(&self) -> &Fragment {
        &self.content
    }

    pub fn open_start(&self) -> usize {
        self.open_start
    }

    pub fn open_end(&self) -> usize {
        self.open_end
    }

    /// Size of the content once inserted, excluding the open boundaries.
    pub fn size(&self) -> usize {
        self.content
            .size()
            .saturating_sub(self.open_start + self.open_end)
    }

    /// Same content fragment by reference and same open depths.
    pub fn ptr_eq(&self, other: &Slice) -> bool {
        self.content.ptr_eq(&other.content)
            && self.open_start == other.open_start
            && self.open_end == other.open_end
    }
}

/// A position resolved into the chain of nodes that contain it.
struct ResolvedPos {
    pos: usize,
    /// `(node, absolute start of its content)`, outermost first.
    path: Vec<(Node, usize)>,
}

impl ResolvedPos {
    fn resolve(root: &Node, pos: usize) -> Result<Self, ModelError> {
        let size = root.content().size();
        if pos > size {
            return Err(ModelError::PositionOutOfRange { pos, size });
        }

        let mut path = Vec::new();
        let mut node = root.clone();
        let mut start = 0;
        loop {
            let (index, offset) = node.content().find_index(pos - start);
            path.push((node.clone(), start));
            if offset == pos - start {
                break;
            }
            let Some(child) = node.child(index).cloned() else {
                break;
            };
            if child.is_leaf() {
                break;
            }
            start += offset + 1;
            node = child;
        }
        Ok(Self { pos, path })
    }

    fn depth(&self) -> usize {
        self.path.len() - 1
    }

    fn start(&self, depth: usize) -> usize {
        self.path[depth].1
    }

    fn end(&self, depth: usize) -> usize {
        self.path[depth].1 + self.path[depth].0.content().size()
    }

    fn node(&self, depth: usize) -> &Node {
        &self.path[depth].0
    }

    /// Deepest depth whose node contains both this position and `pos`.
    fn shared_depth(&self, pos: usize) -> usize {
        (0..=self.depth())
            .rev()
            .find(|&depth| self.start(depth) <= pos && pos <= self.end(depth))
            .unwrap_or(0)
    }
}

impl Node {
    /// Cuts the content between two positions out of this node.
    pub fn slice(&self, from: usize, to: usize) -> Result<Slice, ModelError> {
        let size = self.content().size();
        if to > size {
            return Err(ModelError::PositionOutOfRange { pos: to, size });
        }
        if from >= to {
            if from > size {
                return Err(ModelError::PositionOutOfRange { pos: from, size });
            }
            return Ok(Slice::empty());
        }

        let start_pos = ResolvedPos::resolve(self, from)?;
        let end_pos = ResolvedPos::resolve(self, to)?;
        let depth = start_pos.shared_depth(to);
        let start = start_pos.start(depth);
        let content = start_pos
            .node(depth)
            .content()
            .cut(start_pos.pos - start, end_pos.pos - start);
        Ok(Slice::new(
            content,
            start_pos.depth() - depth,
            end_pos.depth() - depth,
        ))
    }
}
