use crate::node_id::{NodeId, TransactionId};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TreeError>;

/// Failures surfaced by the tree manager and the forest importer.
#[derive(Debug, Error, PartialEq)]
pub enum TreeError {
    #[error("Node {0} does not exist")]
    NotFound(NodeId),

    #[error("Parent {0:?} does not resolve to an existing node")]
    InvalidParent(Option<NodeId>),

    #[error("Tree already has a root node ({0})")]
    RootAlreadyExists(NodeId),

    #[error("Tree has no root node")]
    RootMissing,

    /// Delete without cascade on a node that still has descendants.
    #[error("Node {id} has {descendants} descendant(s) and children deletion was not requested")]
    HasChildren { id: NodeId, descendants: i64 },

    #[error("Requested ancestor depth {requested} is above the root (child depth {child_depth})")]
    InvalidDepth { child_depth: u32, requested: i64 },

    /// An interval or depth invariant is broken in the stored data. Never
    /// retryable.
    #[error("Tree is corrupt: {0}")]
    CorruptTree(String),

    #[error("External node {external_id:?} references parent {parent} which is not part of the import")]
    DanglingParent {
        external_id: Option<u64>,
        parent: u64,
    },

    /// Nodes whose parent chain never reaches the import root, i.e. cyclic
    /// parent references.
    #[error("{count} node(s) of the import are not reachable from its root")]
    UnreachableImport { count: usize },

    #[error("External id {0} appears more than once in the import")]
    DuplicateExternalId(u64),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failures raised by a node store backend. These propagate unchanged.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error("Write conflict: transaction began at {expected} but the store is at {found}")]
    Conflict {
        expected: TransactionId,
        found: TransactionId,
    },

    #[error("Store backend failure: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, Copy, Error, PartialEq)]
pub enum CodecError {
    #[error("Interval of span {span} contains descendants")]
    HasChildren { span: i64 },
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("Could not parse configuration: {0}")]
    Parse(String),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum EncodingError {
    #[error("Node id {0} does not fit in an EDN integer")]
    RefOutOfRange(NodeId),

    #[error("Value {value} of {key} does not fit in an EDN integer")]
    IntegerOutOfRange { key: String, value: u64 },
}
