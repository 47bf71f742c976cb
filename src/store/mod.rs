//! Contract between the tree manager and the transactional node store.
//!
//! The store owns persistence and atomicity. The manager only ever talks to
//! it through a scoped unit of work: [`NodeStore::read`] for queries and
//! [`NodeStore::write`] for structural changes, which commits when the
//! closure returns `Ok` and rolls back otherwise.

use crate::attr_value::AttrValue;
use crate::error::{ConfigError, StoreError};
use crate::node::{Interval, NewNode, Node};
use crate::node_id::NodeId;
use std::cmp::Ordering;

pub mod memory;

pub use memory::MemoryStore;

/// Comparison of one interval bound against a constant.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Cmp {
    Any,
    Eq(i64),
    Lt(i64),
    Le(i64),
    Gt(i64),
    Ge(i64),
}

impl Cmp {
    pub fn matches(&self, value: i64) -> bool {
        match *self {
            Cmp::Any => true,
            Cmp::Eq(v) => value == v,
            Cmp::Lt(v) => value < v,
            Cmp::Le(v) => value <= v,
            Cmp::Gt(v) => value > v,
            Cmp::Ge(v) => value >= v,
        }
    }
}

/// Interval predicate: a range condition on `left` and `right`, optionally
/// narrowed to one depth.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Filter {
    pub left: Cmp,
    pub right: Cmp,
    pub depth: Option<u32>,
}

impl Filter {
    pub fn all() -> Filter {
        Filter {
            left: Cmp::Any,
            right: Cmp::Any,
            depth: None,
        }
    }

    /// Strict descendants of `parent`.
    pub fn inside(parent: &Interval) -> Filter {
        Filter {
            left: Cmp::Gt(parent.left),
            right: Cmp::Lt(parent.right),
            depth: None,
        }
    }

    /// Strict ancestors of `child`.
    pub fn around(child: &Interval) -> Filter {
        Filter {
            left: Cmp::Lt(child.left),
            right: Cmp::Gt(child.right),
            depth: None,
        }
    }

    /// Every node whose interval lies within `[left, right]`, bounds included.
    pub fn within(left: i64, right: i64) -> Filter {
        Filter {
            left: Cmp::Ge(left),
            right: Cmp::Le(right),
            depth: None,
        }
    }

    pub fn root() -> Filter {
        Filter {
            left: Cmp::Eq(1),
            right: Cmp::Any,
            depth: None,
        }
    }

    pub fn at_depth(mut self, depth: u32) -> Filter {
        self.depth = Some(depth);
        self
    }

    pub fn matches(&self, interval: &Interval) -> bool {
        self.left.matches(interval.left)
            && self.right.matches(interval.right)
            && self.depth.map_or(true, |d| d == interval.depth)
    }
}

/// Which bound a bulk shift rewrites.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IntervalField {
    Left,
    Right,
}

/// Sort column for ordered range scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Column {
    Left,
    Right,
    Depth,
    Id,
    Attr(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: Column,
    pub descending: bool,
}

impl OrderBy {
    pub fn asc(column: Column) -> OrderBy {
        OrderBy {
            column,
            descending: false,
        }
    }

    pub fn desc(column: Column) -> OrderBy {
        OrderBy {
            column,
            descending: true,
        }
    }

    pub fn attr(name: &str) -> OrderBy {
        OrderBy::asc(Column::Attr(name.to_owned()))
    }

    /// Parses a comma separated list of sort keys such as `"name, left desc"`.
    ///
    /// `left`, `right`, `depth` and `id` name the interval and identity
    /// columns; anything else is an attribute (a leading `:` is dropped).
    pub fn parse(spec: &str) -> Result<Vec<OrderBy>, ConfigError> {
        let mut keys = Vec::new();
        for part in spec.split(',') {
            let mut words = part.split_whitespace();
            let name = match words.next() {
                Some(name) => name,
                None => {
                    return Err(ConfigError::Invalid {
                        key: "order-by".to_owned(),
                        reason: format!("empty sort key in {:?}", spec),
                    })
                }
            };
            let descending = match words.next().map(|w| w.to_ascii_lowercase()) {
                None => false,
                Some(ref w) if w == "asc" => false,
                Some(ref w) if w == "desc" => true,
                Some(w) => {
                    return Err(ConfigError::Invalid {
                        key: "order-by".to_owned(),
                        reason: format!("unknown sort direction {:?}", w),
                    })
                }
            };
            if let Some(extra) = words.next() {
                return Err(ConfigError::Invalid {
                    key: "order-by".to_owned(),
                    reason: format!("unexpected {:?} after sort key {:?}", extra, name),
                });
            }
            let column = match name {
                "left" => Column::Left,
                "right" => Column::Right,
                "depth" => Column::Depth,
                "id" => Column::Id,
                attr => Column::Attr(attr.trim_start_matches(':').to_owned()),
            };
            keys.push(OrderBy { column, descending });
        }
        Ok(keys)
    }

    fn compare(&self, a: &Node, b: &Node) -> Ordering {
        let ordering = match &self.column {
            Column::Left => a.left().cmp(&b.left()),
            Column::Right => a.right().cmp(&b.right()),
            Column::Depth => a.depth().cmp(&b.depth()),
            Column::Id => a.id().cmp(&b.id()),
            Column::Attr(name) => {
                let x: Option<&AttrValue> = a.attr(name);
                x.cmp(&b.attr(name))
            }
        };
        if self.descending {
            ordering.reverse()
        } else {
            ordering
        }
    }
}

/// Orders two nodes by `order`, falling back to document order (`left`).
pub fn compare_nodes(order: &[OrderBy], a: &Node, b: &Node) -> Ordering {
    order
        .iter()
        .map(|key| key.compare(a, b))
        .find(|o| *o != Ordering::Equal)
        .unwrap_or_else(|| a.left().cmp(&b.left()))
}

/// Read access inside a unit of work.
pub trait ReadTxn {
    fn get(&self, id: NodeId) -> Result<Option<Node>, StoreError>;

    fn find(&self, filter: &Filter, order: &[OrderBy]) -> Result<Vec<Node>, StoreError>;

    fn count(&self, filter: &Filter) -> Result<u64, StoreError>;
}

/// Write access inside a unit of work.
pub trait Transaction: ReadTxn {
    /// Persists a node at `interval`, assigning it a fresh id.
    fn insert(&mut self, node: NewNode, interval: Interval) -> Result<Node, StoreError>;

    /// Adds `delta` to `field` on every node where `field >= from`.
    /// Returns the number of rows touched.
    fn shift(&mut self, field: IntervalField, from: i64, delta: i64) -> Result<usize, StoreError>;

    /// Removes every node matching `filter`, returning how many were removed.
    fn delete(&mut self, filter: &Filter) -> Result<usize, StoreError>;
}

/// A transactional store of nodes for one tree instance.
pub trait NodeStore {
    fn read<R, E, F>(&self, f: F) -> Result<R, E>
    where
        E: From<StoreError>,
        F: FnOnce(&dyn ReadTxn) -> Result<R, E>;

    /// Runs `f` in a write unit of work. Commits when `f` returns `Ok`;
    /// otherwise nothing `f` did becomes visible.
    fn write<R, E, F>(&self, f: F) -> Result<R, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut dyn Transaction) -> Result<R, E>;
}
