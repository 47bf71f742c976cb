use serde_derive::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Identifier of a stored node. Assigned by the store on insert and never
/// changed afterwards.
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct NodeId(u64);

impl NodeId {
    pub fn from_u64(id: u64) -> NodeId {
        NodeId(id)
    }

    pub fn to_u64(&self) -> u64 {
        self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity of one tree instance. Every manager handle on the same tree
/// shares it, along with the mutation lock.
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct TreeId(Uuid);

impl TreeId {
    pub fn new() -> TreeId {
        TreeId(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> TreeId {
        TreeId(uuid)
    }

    pub fn to_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for TreeId {
    fn default() -> Self {
        TreeId::new()
    }
}

impl Display for TreeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic commit counter kept by a store, used to detect writers that
/// raced past the mutation lock.
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct TransactionId(u64);

impl TransactionId {
    pub fn from_u64(id: u64) -> TransactionId {
        TransactionId(id)
    }

    pub fn to_u64(&self) -> u64 {
        self.0
    }

    pub fn next(&self) -> TransactionId {
        TransactionId(self.0 + 1)
    }
}

impl Display for TransactionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "tx{}", self.0)
    }
}
