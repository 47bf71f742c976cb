use crate::attr_value::AttrValue;
use crate::node_id::NodeId;
use serde_derive::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};

/// Position of a node in the nested-set encoding.
///
/// `left < right` always holds. A node `b` is a descendant of `a` exactly
/// when `a.left < b.left && b.right < a.right`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub left: i64,
    pub right: i64,
    pub depth: u32,
}

impl Interval {
    /// `right - left + 1`; always even for a well-formed node.
    pub fn span(&self) -> i64 {
        self.right - self.left + 1
    }

    /// Number of strict descendants implied by the interval width.
    pub fn descendants(&self) -> i64 {
        (self.right - self.left - 1) / 2
    }

    pub fn is_leaf(&self) -> bool {
        self.right - self.left == 1
    }

    /// Strict containment: `other` lies inside this interval.
    pub fn contains(&self, other: &Interval) -> bool {
        self.left < other.left && other.right < self.right
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]@{}", self.left, self.right, self.depth)
    }
}

pub type Attributes = BTreeMap<String, AttrValue>;

/// A node that has not been placed in a tree yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewNode {
    pub attrs: Attributes,
}

impl NewNode {
    pub fn new() -> NewNode {
        NewNode::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<AttrValue>) -> NewNode {
        self.attrs.insert(name.to_owned(), value.into());
        self
    }
}

/// A stored node.
///
/// The interval is owned by the tree manager: it can be read but not set
/// from outside the crate. Equality and hashing go by id alone.
#[derive(Debug, Clone, Serialize)]
pub struct Node {
    id: NodeId,
    interval: Interval,
    pub attrs: Attributes,
    /// Annotation filled by `annotate_child_counts`; never persisted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direct_children_count: Option<u64>,
    /// Annotation filled by `annotate_child_counts`; never persisted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children_count: Option<u64>,
}

impl Node {
    pub(crate) fn from_parts(id: NodeId, interval: Interval, attrs: Attributes) -> Node {
        Node {
            id,
            interval,
            attrs,
            direct_children_count: None,
            children_count: None,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    pub fn left(&self) -> i64 {
        self.interval.left
    }

    pub fn right(&self) -> i64 {
        self.interval.right
    }

    pub fn depth(&self) -> u32 {
        self.interval.depth
    }

    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }

    /// Convenience accessor for string attributes.
    pub fn str_attr(&self, name: &str) -> Option<&str> {
        match self.attrs.get(name) {
            Some(AttrValue::String(s)) => Some(s),
            _ => None,
        }
    }

    pub(crate) fn interval_mut(&mut self) -> &mut Interval {
        &mut self.interval
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state)
    }
}

impl Display for Node {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.id, self.interval)?;
        if let Some(name) = self.str_attr("name") {
            write!(f, " {:?}", name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interval(left: i64, right: i64, depth: u32) -> Interval {
        Interval { left, right, depth }
    }

    #[test]
    fn test_span_and_descendants() {
        let root = interval(1, 10, 0);
        assert_eq!(root.span(), 10);
        assert_eq!(root.descendants(), 4);
        assert!(!root.is_leaf());
        assert!(interval(4, 5, 2).is_leaf());
        assert_eq!(interval(4, 5, 2).descendants(), 0);
    }

    #[test]
    fn test_contains_is_strict() {
        let parent = interval(1, 6, 0);
        assert!(parent.contains(&interval(2, 3, 1)));
        assert!(!parent.contains(&parent));
        assert!(!interval(2, 3, 1).contains(&parent));
        assert!(!interval(2, 5, 1).contains(&interval(4, 7, 1)));
    }

    #[test]
    fn test_equality_by_id() {
        let a = Node::from_parts(NodeId::from_u64(1), interval(1, 2, 0), Attributes::new());
        let mut b = Node::from_parts(
            NodeId::from_u64(1),
            interval(5, 6, 3),
            NewNode::new().with("name", "other").attrs,
        );
        assert_eq!(a, b);
        b.id = NodeId::from_u64(2);
        assert_ne!(a, b);
    }

    #[test]
    fn test_display() {
        let node = Node::from_parts(
            NodeId::from_u64(3),
            interval(2, 3, 1),
            NewNode::new().with("name", "leaf").attrs,
        );
        assert_eq!(node.to_string(), "#3 [2, 3]@1 \"leaf\"");
    }
}
