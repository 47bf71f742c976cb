//! The nested-set tree manager.
//!
//! Structural changes (`insert`, `insert_root`, `delete`) take the tree's
//! [`MutationLock`] before opening a write unit of work and release it only
//! once that unit of work has committed or rolled back. Shifts rewrite an
//! unbounded set of rows and do not commute, so two of them must never
//! interleave on the same tree. Queries take no lock and run in a read unit
//! of work.

use crate::codec::{self, Shift};
use crate::config::TreeConfig;
use crate::error::{Result, TreeError};
use crate::node::{Interval, NewNode, Node};
use crate::node_id::{NodeId, TreeId};
use crate::store::{Filter, IntervalField, NodeStore, OrderBy, ReadTxn, Transaction};
use crate::verify::{self, TreeStats};
use parking_lot::{Mutex, MutexGuard};
use std::convert::TryFrom;
use std::sync::Arc;
use tracing::{debug, debug_span, error};

/// Mutual exclusion for structural changes to one tree instance.
///
/// Clones share the same underlying mutex; hand a clone to every manager
/// that mutates the same tree.
#[derive(Debug, Clone, Default)]
pub struct MutationLock(Arc<Mutex<()>>);

impl MutationLock {
    pub fn new() -> MutationLock {
        MutationLock::default()
    }

    fn acquire(&self) -> MutexGuard<'_, ()> {
        self.0.lock()
    }
}

/// Which child counts to attach to query results.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Annotate {
    None,
    Direct,
    Recursive,
    Both,
}

#[derive(Debug, Clone)]
pub struct TreeManager<S> {
    tree: TreeId,
    store: S,
    lock: MutationLock,
    config: TreeConfig,
}

fn corrupt(message: String) -> TreeError {
    error!(%message, "tree invariant violated");
    TreeError::CorruptTree(message)
}

fn require<T: ReadTxn + ?Sized>(txn: &T, id: NodeId) -> Result<Node> {
    txn.get(id)?.ok_or(TreeError::NotFound(id))
}

pub(crate) fn find_root<T: ReadTxn + ?Sized>(txn: &T) -> Result<Option<Node>> {
    let mut roots = txn.find(&Filter::root(), &[])?;
    match roots.len() {
        0 => Ok(None),
        1 => Ok(roots.pop()),
        n => Err(corrupt(format!("{} nodes have left bound 1", n))),
    }
}

fn children_filter(parent: &Interval, direct_only: bool) -> Filter {
    let filter = Filter::inside(parent);
    if direct_only {
        filter.at_depth(parent.depth + 1)
    } else {
        filter
    }
}

fn annotate_in<T: ReadTxn + ?Sized>(txn: &T, nodes: &mut [Node], direct_only: bool) -> Result<()> {
    for node in nodes.iter_mut() {
        let stored = require(txn, node.id())?;
        let count = txn.count(&children_filter(&stored.interval(), direct_only))?;
        if direct_only {
            node.direct_children_count = Some(count);
        } else {
            node.children_count = Some(count);
        }
    }
    Ok(())
}

fn apply_shift(txn: &mut dyn Transaction, shift: Shift) -> Result<()> {
    let lefts = txn.shift(IntervalField::Left, shift.from, shift.delta)?;
    let rights = txn.shift(IntervalField::Right, shift.from, shift.delta)?;
    debug!(from = shift.from, delta = shift.delta, lefts, rights, "applied shift");
    Ok(())
}

fn place_under(txn: &mut dyn Transaction, node: NewNode, parent: &Node) -> Result<Node> {
    let bounds = codec::insertion_bounds(&parent.interval());
    apply_shift(txn, codec::insertion_shift(bounds.left))?;
    let inserted = txn.insert(node, bounds)?;
    debug!(parent = %parent.id(), id = %inserted.id(), interval = %bounds, "inserted node");
    Ok(inserted)
}

/// Inserts `node` under `parent` inside an already open unit of work.
/// The caller must hold the mutation lock.
pub(crate) fn insert_in(
    txn: &mut dyn Transaction,
    node: NewNode,
    parent: Option<NodeId>,
) -> Result<Node> {
    match parent {
        Some(id) => {
            let parent = txn.get(id)?.ok_or(TreeError::InvalidParent(Some(id)))?;
            place_under(txn, node, &parent)
        }
        None => match find_root(&*txn)? {
            Some(root) => place_under(txn, node, &root),
            None => insert_root_in(txn, node),
        },
    }
}

pub(crate) fn insert_root_in(txn: &mut dyn Transaction, node: NewNode) -> Result<Node> {
    if let Some(root) = find_root(&*txn)? {
        return Err(TreeError::RootAlreadyExists(root.id()));
    }
    let inserted = txn.insert(node, codec::root_bounds())?;
    debug!(id = %inserted.id(), "inserted root");
    Ok(inserted)
}

impl<S: NodeStore> TreeManager<S> {
    pub fn new(store: S) -> TreeManager<S> {
        TreeManager {
            tree: TreeId::new(),
            store,
            lock: MutationLock::new(),
            config: TreeConfig::default(),
        }
    }

    /// Shares `lock` (and `tree`'s identity) with other handles on the same
    /// tree instance.
    pub fn with_lock(mut self, tree: TreeId, lock: MutationLock) -> TreeManager<S> {
        self.tree = tree;
        self.lock = lock;
        self
    }

    pub fn with_config(mut self, config: TreeConfig) -> TreeManager<S> {
        self.config = config;
        self
    }

    pub fn tree_id(&self) -> TreeId {
        self.tree
    }

    pub fn lock(&self) -> &MutationLock {
        &self.lock
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Runs `f` in a write unit of work while holding the mutation lock.
    pub(crate) fn mutate<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut dyn Transaction) -> Result<R>,
    {
        let _guard = self.lock.acquire();
        self.store.write(f)
    }

    fn order<'a>(&'a self, order: &'a [OrderBy]) -> &'a [OrderBy] {
        if order.is_empty() {
            &self.config.default_order
        } else {
            order
        }
    }

    /// Inserts `node` as the rightmost child of `parent`.
    ///
    /// With no parent the node becomes the root of an empty tree, or the
    /// rightmost child of the existing root.
    pub fn insert(&self, node: NewNode, parent: Option<NodeId>) -> Result<Node> {
        let _span = debug_span!("insert", tree = %self.tree).entered();
        self.mutate(|txn| insert_in(txn, node, parent))
    }

    pub fn insert_root(&self, node: NewNode) -> Result<Node> {
        let _span = debug_span!("insert_root", tree = %self.tree).entered();
        self.mutate(|txn| insert_root_in(txn, node))
    }

    /// Removes `id`, and its descendants when `with_children` is set, then
    /// closes the gap. Returns the number of nodes removed.
    pub fn delete(&self, id: NodeId, with_children: bool) -> Result<usize> {
        let _span = debug_span!("delete", tree = %self.tree, %id, with_children).entered();
        self.mutate(|txn| {
            let node = require(&*txn, id)?;
            let interval = node.interval();
            let deletion = codec::deletion_shift(&interval, with_children).map_err(|_| {
                TreeError::HasChildren {
                    id,
                    descendants: interval.descendants(),
                }
            })?;
            let removed = txn.delete(&Filter::within(deletion.left, deletion.right))?;
            if removed as i64 != deletion.rows() {
                return Err(corrupt(format!(
                    "interval {} of {} spans {} nodes but {} were stored",
                    interval,
                    id,
                    deletion.rows(),
                    removed
                )));
            }
            apply_shift(txn, deletion.shift)?;
            debug!(removed, "deleted subtree");
            Ok(removed)
        })
    }

    pub fn get(&self, id: NodeId) -> Result<Node> {
        self.store.read(|txn| require(txn, id))
    }

    /// Descendants of `parent` ordered by `order` (the configured default
    /// order when empty). `direct_only` keeps immediate children only.
    pub fn children_of(&self, parent: NodeId, order: &[OrderBy], direct_only: bool) -> Result<Vec<Node>> {
        self.children_of_annotated(parent, order, direct_only, Annotate::None)
    }

    pub fn children_of_annotated(
        &self,
        parent: NodeId,
        order: &[OrderBy],
        direct_only: bool,
        annotate: Annotate,
    ) -> Result<Vec<Node>> {
        let order = self.order(order);
        self.store.read(|txn| {
            let parent = require(txn, parent)?;
            let mut children = txn.find(&children_filter(&parent.interval(), direct_only), order)?;
            match annotate {
                Annotate::None => {}
                Annotate::Direct => annotate_in(txn, &mut children, true)?,
                Annotate::Recursive => annotate_in(txn, &mut children, false)?,
                Annotate::Both => {
                    annotate_in(txn, &mut children, true)?;
                    annotate_in(txn, &mut children, false)?;
                }
            }
            Ok(children)
        })
    }

    pub fn child_count(&self, parent: NodeId, direct_only: bool) -> Result<u64> {
        self.store.read(|txn| {
            let parent = require(txn, parent)?;
            Ok(txn.count(&children_filter(&parent.interval(), direct_only))?)
        })
    }

    /// Ancestor of `child` at `depth`.
    ///
    /// A negative `depth` is relative (`-1` is the immediate parent), any
    /// other value is an absolute depth. Returns `None` when no ancestor
    /// sits at that depth.
    pub fn parent_of(&self, child: NodeId, depth: i64) -> Result<Option<Node>> {
        self.store.read(|txn| {
            let child = require(txn, child)?;
            let target = if depth < 0 {
                let target = i64::from(child.depth()) + depth;
                if target < 0 {
                    return Err(TreeError::InvalidDepth {
                        child_depth: child.depth(),
                        requested: depth,
                    });
                }
                target
            } else {
                depth
            };
            let target = match u32::try_from(target) {
                Ok(target) => target,
                Err(_) => return Ok(None),
            };
            let mut found = txn.find(&Filter::around(&child.interval()).at_depth(target), &[])?;
            match found.len() {
                0 | 1 => Ok(found.pop()),
                n => Err(corrupt(format!(
                    "{} ancestors of {} at depth {}",
                    n,
                    child.id(),
                    target
                ))),
            }
        })
    }

    pub fn root_node(&self) -> Result<Option<Node>> {
        self.store.read(|txn| find_root(txn))
    }

    pub fn require_root(&self) -> Result<Node> {
        self.root_node()?.ok_or(TreeError::RootMissing)
    }

    /// Attaches child counts to `nodes`. Only the annotation fields change.
    pub fn annotate_child_counts(&self, nodes: &mut [Node], direct_only: bool) -> Result<()> {
        self.store.read(|txn| annotate_in(txn, nodes, direct_only))
    }

    /// Every node in document order.
    pub fn nodes(&self) -> Result<Vec<Node>> {
        self.store.read(|txn| Ok(txn.find(&Filter::all(), &[])?))
    }

    /// Scans the whole tree and checks the interval and depth invariants.
    pub fn verify(&self) -> Result<TreeStats> {
        let nodes = self.nodes()?;
        verify::check(&nodes).map_err(|violation| corrupt(violation.to_string()))
    }
}
