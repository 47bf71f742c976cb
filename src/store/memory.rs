//! In-memory node store. Writes work on a copy that is swapped in on commit.

use super::{compare_nodes, Filter, IntervalField, NodeStore, OrderBy, ReadTxn, Transaction};
use crate::error::StoreError;
use crate::node::{Interval, NewNode, Node};
use crate::node_id::{NodeId, TransactionId};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, trace};

#[derive(Debug, Clone)]
struct Table {
    rows: BTreeMap<NodeId, Node>,
    next_id: u64,
    version: TransactionId,
}

impl Default for Table {
    fn default() -> Self {
        Table {
            rows: BTreeMap::new(),
            next_id: 1,
            version: TransactionId::from_u64(0),
        }
    }
}

impl Table {
    fn get(&self, id: NodeId) -> Option<Node> {
        self.rows.get(&id).cloned()
    }

    fn find(&self, filter: &Filter, order: &[OrderBy]) -> Vec<Node> {
        let mut found: Vec<Node> = self
            .rows
            .values()
            .filter(|node| filter.matches(&node.interval()))
            .cloned()
            .collect();
        found.sort_by(|a, b| compare_nodes(order, a, b));
        found
    }

    fn count(&self, filter: &Filter) -> u64 {
        self.rows
            .values()
            .filter(|node| filter.matches(&node.interval()))
            .count() as u64
    }
}

/// Cheaply clonable handle; clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    table: Arc<RwLock<Table>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    pub fn len(&self) -> usize {
        self.table.read().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Version of the last committed unit of work.
    pub fn version(&self) -> TransactionId {
        self.table.read().version
    }

    /// Every committed node in document order.
    pub fn snapshot(&self) -> Vec<Node> {
        self.table.read().find(&Filter::all(), &[])
    }
}

struct ReadView<'a> {
    table: &'a Table,
}

impl<'a> ReadTxn for ReadView<'a> {
    fn get(&self, id: NodeId) -> Result<Option<Node>, StoreError> {
        Ok(self.table.get(id))
    }

    fn find(&self, filter: &Filter, order: &[OrderBy]) -> Result<Vec<Node>, StoreError> {
        Ok(self.table.find(filter, order))
    }

    fn count(&self, filter: &Filter) -> Result<u64, StoreError> {
        Ok(self.table.count(filter))
    }
}

struct WriteView {
    work: Table,
}

impl ReadTxn for WriteView {
    fn get(&self, id: NodeId) -> Result<Option<Node>, StoreError> {
        Ok(self.work.get(id))
    }

    fn find(&self, filter: &Filter, order: &[OrderBy]) -> Result<Vec<Node>, StoreError> {
        Ok(self.work.find(filter, order))
    }

    fn count(&self, filter: &Filter) -> Result<u64, StoreError> {
        Ok(self.work.count(filter))
    }
}

impl Transaction for WriteView {
    fn insert(&mut self, node: NewNode, interval: Interval) -> Result<Node, StoreError> {
        let id = NodeId::from_u64(self.work.next_id);
        self.work.next_id += 1;
        let stored = Node::from_parts(id, interval, node.attrs);
        self.work.rows.insert(id, stored.clone());
        trace!(%id, %interval, "row inserted");
        Ok(stored)
    }

    fn shift(&mut self, field: IntervalField, from: i64, delta: i64) -> Result<usize, StoreError> {
        let mut touched = 0;
        for node in self.work.rows.values_mut() {
            let interval = node.interval_mut();
            let bound = match field {
                IntervalField::Left => &mut interval.left,
                IntervalField::Right => &mut interval.right,
            };
            if *bound >= from {
                *bound += delta;
                touched += 1;
            }
        }
        trace!(?field, from, delta, touched, "rows shifted");
        Ok(touched)
    }

    fn delete(&mut self, filter: &Filter) -> Result<usize, StoreError> {
        let before = self.work.rows.len();
        self.work
            .rows
            .retain(|_, node| !filter.matches(&node.interval()));
        Ok(before - self.work.rows.len())
    }
}

impl NodeStore for MemoryStore {
    fn read<R, E, F>(&self, f: F) -> Result<R, E>
    where
        E: From<StoreError>,
        F: FnOnce(&dyn ReadTxn) -> Result<R, E>,
    {
        let table = self.table.read();
        f(&ReadView { table: &*table })
    }

    fn write<R, E, F>(&self, f: F) -> Result<R, E>
    where
        E: From<StoreError>,
        F: FnOnce(&mut dyn Transaction) -> Result<R, E>,
    {
        let work = self.table.read().clone();
        let base = work.version;
        let mut view = WriteView { work };
        let result = f(&mut view)?;

        let mut committed = self.table.write();
        if committed.version != base {
            return Err(StoreError::Conflict {
                expected: base,
                found: committed.version,
            }
            .into());
        }
        view.work.version = base.next();
        *committed = view.work;
        debug!(version = %committed.version, rows = committed.rows.len(), "committed");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::root_bounds;

    #[test]
    fn test_commit_assigns_ids_and_versions() {
        let store = MemoryStore::new();
        let node = store
            .write(|txn| txn.insert(NewNode::new().with("name", "r"), root_bounds()))
            .unwrap();
        assert_eq!(node.id(), NodeId::from_u64(1));
        assert_eq!(store.len(), 1);
        assert_eq!(store.version(), TransactionId::from_u64(1));
    }

    #[test]
    fn test_error_rolls_back() {
        let store = MemoryStore::new();
        let result: Result<(), StoreError> = store.write(|txn| {
            txn.insert(NewNode::new(), root_bounds())?;
            Err(StoreError::Backend("boom".to_owned()))
        });
        assert!(result.is_err());
        assert!(store.is_empty());
        assert_eq!(store.version(), TransactionId::from_u64(0));
    }

    #[test]
    fn test_concurrent_commit_conflicts() {
        let store = MemoryStore::new();
        let other = store.clone();
        let result: Result<(), StoreError> = store.write(|txn| {
            txn.insert(NewNode::new(), root_bounds())?;
            other.write(|inner| inner.insert(NewNode::new(), root_bounds()).map(|_| ()))?;
            Ok(())
        });
        assert_eq!(
            result,
            Err(StoreError::Conflict {
                expected: TransactionId::from_u64(0),
                found: TransactionId::from_u64(1),
            })
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_shift_and_delete() {
        let store = MemoryStore::new();
        store
            .write(|txn| {
                txn.insert(NewNode::new(), Interval { left: 1, right: 4, depth: 0 })?;
                txn.insert(NewNode::new(), Interval { left: 2, right: 3, depth: 1 })?;
                Ok::<_, StoreError>(())
            })
            .unwrap();
        let removed = store
            .write(|txn| {
                let removed = txn.delete(&Filter::within(2, 3))?;
                txn.shift(IntervalField::Left, 2, -2)?;
                txn.shift(IntervalField::Right, 2, -2)?;
                Ok::<_, StoreError>(removed)
            })
            .unwrap();
        assert_eq!(removed, 1);
        let nodes = store.snapshot();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].interval(), Interval { left: 1, right: 2, depth: 0 });
    }
}
