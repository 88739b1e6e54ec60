//! Editor plugins.

use crate::breaks::{TRAILING_BREAK, add_trailing_breaks};
use crate::model::Slice;
use tracing::trace;

/// Hooks an editor runs at fixed points. Every hook defaults to a no-op.
pub trait Plugin {
    fn name(&self) -> &str;

    /// Rewrites a slice on its way to the clipboard. Plugins run in
    /// registration order, each seeing the previous one's output.
    fn transform_copied(&self, slice: Slice) -> Slice {
        slice
    }
}

/// Adds trailing break markers to copied content so pasted HTML keeps the
/// editor's empty lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrailingBreakPlugin;

impl Plugin for TrailingBreakPlugin {
    fn name(&self) -> &str {
        TRAILING_BREAK
    }

    fn transform_copied(&self, slice: Slice) -> Slice {
        let transformed = add_trailing_breaks(&slice);
        if !transformed.ptr_eq(&slice) {
            trace!("added trailing breaks to copied slice");
        }
        transformed
    }
}
