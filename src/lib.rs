//! Hierarchical data kept in a flat table with the nested-set encoding.
//!
//! ```
//! use nestedset::{MemoryStore, NewNode, TreeManager};
//!
//! let tree = TreeManager::new(MemoryStore::new());
//! let root = tree.insert_root(NewNode::new().with("name", "R")).unwrap();
//! let a = tree.insert(NewNode::new().with("name", "A"), Some(root.id())).unwrap();
//! assert_eq!((a.left(), a.right(), a.depth()), (2, 3, 1));
//! assert_eq!(tree.child_count(root.id(), true).unwrap(), 1);
//! ```

pub mod attr_value;
pub mod codec;
pub mod config;
pub mod edn_decode;
pub mod error;
pub mod import;
pub mod manager;
pub mod node;
pub mod node_id;
pub mod store;
pub mod verify;
pub mod view;

pub use crate::attr_value::AttrValue;
pub use crate::config::{DanglingPolicy, ImportConfig, TreeConfig};
pub use crate::error::{EncodingError, Result, StoreError, TreeError};
pub use crate::import::{ForestImporter, ImportReport};
pub use crate::manager::{Annotate, MutationLock, TreeManager};
pub use crate::node::{Interval, NewNode, Node};
pub use crate::node_id::{NodeId, TreeId};
pub use crate::store::{Column, MemoryStore, NodeStore, OrderBy};
pub use crate::view::{ExternalNode, Hierarchic, HierarchyView, NodeView};
