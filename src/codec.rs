//! Interval arithmetic for the nested-set encoding.

use crate::error::CodecError;
use crate::node::Interval;

/// Translation applied to every bound at or past `from`.
///
/// Lefts and rights are shifted independently: `left += delta` where
/// `left >= from`, and `right += delta` where `right >= from`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Shift {
    pub from: i64,
    pub delta: i64,
}

impl Shift {
    /// Applies the shift to a single interval in place.
    pub fn apply(&self, interval: &mut Interval) {
        if interval.left >= self.from {
            interval.left += self.delta;
        }
        if interval.right >= self.from {
            interval.right += self.delta;
        }
    }
}

/// Removal of a closed interval range followed by the shift closing the gap.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Deletion {
    /// Nodes with `left >= left` and `right <= right` are removed.
    pub left: i64,
    pub right: i64,
    pub shift: Shift,
}

impl Deletion {
    /// Number of rows the removal takes out of a well-formed tree.
    pub fn rows(&self) -> i64 {
        (self.right - self.left + 1) / 2
    }
}

pub fn root_bounds() -> Interval {
    Interval {
        left: 1,
        right: 2,
        depth: 0,
    }
}

/// Bounds of a new rightmost child of `parent`.
pub fn insertion_bounds(parent: &Interval) -> Interval {
    Interval {
        left: parent.right,
        right: parent.right + 1,
        depth: parent.depth + 1,
    }
}

/// Opens a gap of width 2 at `left_of_new_node`.
pub fn insertion_shift(left_of_new_node: i64) -> Shift {
    Shift {
        from: left_of_new_node,
        delta: 2,
    }
}

/// Computes the removal and gap-closing shift for `node`.
///
/// Fails without producing a plan when `node` has descendants and
/// `with_children` is false.
pub fn deletion_shift(node: &Interval, with_children: bool) -> Result<Deletion, CodecError> {
    let span = node.span();
    if span > 2 && !with_children {
        return Err(CodecError::HasChildren { span });
    }
    Ok(Deletion {
        left: node.left,
        right: node.right,
        shift: Shift {
            from: node.left,
            delta: -span,
        },
    })
}
