use crate::attr_value::AttrValue;
use crate::edn_decode::{self, keyword_from_qualified, DecodingError};
use crate::error::{EncodingError, Result};
use crate::manager::{find_root, insert_in, insert_root_in, Annotate, TreeManager};
use crate::node::{Attributes, NewNode, Node};
use crate::node_id::NodeId;
use crate::store::{NodeStore, OrderBy};
use edn_format as edn;
use serde_derive::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::convert::TryFrom;

pub trait NodeView: Sized {
    fn to_new_node(&self) -> NewNode;

    fn from_node(node: &Node) -> Self;
}

/// An external node that knows its own id and its parent's id.
pub trait Hierarchic {
    fn external_id(&self) -> Option<u64>;

    fn external_parent(&self) -> Option<u64>;

    fn set_parent(&mut self, parent: Option<u64>);
}

/// General purpose external node: an id, a parent reference and the
/// attributes, plus whatever child counts were annotated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalNode {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub parent: Option<u64>,
    #[serde(default)]
    pub attrs: Attributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direct_children_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children_count: Option<u64>,
}

impl ExternalNode {
    pub fn new(id: u64, parent: Option<u64>) -> ExternalNode {
        ExternalNode {
            id: Some(id),
            parent,
            ..ExternalNode::default()
        }
    }

    pub fn with(mut self, name: &str, value: impl Into<AttrValue>) -> ExternalNode {
        self.attrs.insert(name.to_owned(), value.into());
        self
    }
}

const EDN_KEYS: &[&str] = &["id", "parent", "attrs", "direct-children-count", "children-count"];

fn optional_u64(entries: &BTreeMap<String, &edn::Value>, key: &str) -> std::result::Result<Option<u64>, DecodingError> {
    match entries.get(key) {
        Some(value) => edn_decode::nilable(value, &edn_decode::non_negative),
        None => Ok(None),
    }
}

fn edn_integer(key: &str, value: u64) -> std::result::Result<edn::Value, EncodingError> {
    i64::try_from(value)
        .map(edn::Value::Integer)
        .map_err(|_| EncodingError::IntegerOutOfRange {
            key: key.to_owned(),
            value,
        })
}

/// EDN form of a forest:
///
/// ```edn
/// [{:id 1 :attrs {:name "docs"}}
///  {:id 2 :parent 1 :attrs {:name "a.txt" :kind :file/text}}]
/// ```
impl ExternalNode {
    pub fn from_edn(value: &edn::Value) -> std::result::Result<ExternalNode, DecodingError> {
        let entries = edn_decode::keyword_map(value)?;
        if let Some(key) = entries.keys().find(|k| !EDN_KEYS.contains(&k.as_str())) {
            return Err(DecodingError(format!("unknown node key :{}", key)));
        }
        let mut attrs = Attributes::new();
        if let Some(value) = entries.get("attrs") {
            for (name, value) in edn_decode::keyword_map(value)? {
                attrs.insert(name, AttrValue::try_from(value)?);
            }
        }
        Ok(ExternalNode {
            id: optional_u64(&entries, "id")?,
            parent: optional_u64(&entries, "parent")?,
            attrs,
            direct_children_count: optional_u64(&entries, "direct-children-count")?,
            children_count: optional_u64(&entries, "children-count")?,
        })
    }

    pub fn to_edn(&self) -> std::result::Result<edn::Value, EncodingError> {
        let key = |name: &str| edn::Value::Keyword(edn::Keyword::from_name(name));
        let mut entries = BTreeMap::new();
        let numbers = [
            ("id", self.id),
            ("parent", self.parent),
            ("direct-children-count", self.direct_children_count),
            ("children-count", self.children_count),
        ];
        for &(name, number) in numbers.iter() {
            if let Some(number) = number {
                entries.insert(key(name), edn_integer(name, number)?);
            }
        }
        let mut attrs = BTreeMap::new();
        for (name, value) in &self.attrs {
            attrs.insert(
                edn::Value::Keyword(keyword_from_qualified(name)),
                edn::Value::try_from(value.clone())?,
            );
        }
        entries.insert(key("attrs"), edn::Value::Map(attrs));
        Ok(edn::Value::Map(entries))
    }

    pub fn parse_forest(source: &str) -> std::result::Result<Vec<ExternalNode>, DecodingError> {
        let value = edn::parse_str(source).map_err(|e| DecodingError(format!("{:?}", e)))?;
        edn_decode::vector(&value, &ExternalNode::from_edn)
    }

    pub fn emit_forest(nodes: &[ExternalNode]) -> std::result::Result<String, EncodingError> {
        let values = nodes
            .iter()
            .map(ExternalNode::to_edn)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(edn::emit_str(&edn::Value::Vector(values)))
    }
}

impl NodeView for ExternalNode {
    fn to_new_node(&self) -> NewNode {
        NewNode {
            attrs: self.attrs.clone(),
        }
    }

    fn from_node(node: &Node) -> Self {
        ExternalNode {
            id: Some(node.id().to_u64()),
            parent: None,
            attrs: node.attrs.clone(),
            direct_children_count: node.direct_children_count,
            children_count: node.children_count,
        }
    }
}

impl Hierarchic for ExternalNode {
    fn external_id(&self) -> Option<u64> {
        self.id
    }

    fn external_parent(&self) -> Option<u64> {
        self.parent
    }

    fn set_parent(&mut self, parent: Option<u64>) {
        self.parent = parent;
    }
}

/// Tree operations expressed in terms of an external view type. Ids in the
/// view are the internal node ids.
#[derive(Debug)]
pub struct HierarchyView<'a, S> {
    manager: &'a TreeManager<S>,
}

impl<'a, S: NodeStore> HierarchyView<'a, S> {
    pub fn new(manager: &'a TreeManager<S>) -> HierarchyView<'a, S> {
        HierarchyView { manager }
    }

    pub fn by_id<V: NodeView>(&self, id: NodeId) -> Result<V> {
        self.manager.get(id).map(|node| V::from_node(&node))
    }

    /// Direct children of `parent` (the root when `None`), each with its
    /// parent reference pointing back at `parent`.
    pub fn children_of<V: NodeView + Hierarchic>(
        &self,
        parent: Option<NodeId>,
        order: &[OrderBy],
        annotate: Annotate,
    ) -> Result<Vec<V>> {
        let parent = match parent {
            Some(id) => id,
            None => self.manager.require_root()?.id(),
        };
        let children = self
            .manager
            .children_of_annotated(parent, order, true, annotate)?;
        Ok(children
            .iter()
            .map(|node| {
                let mut view = V::from_node(node);
                view.set_parent(Some(parent.to_u64()));
                view
            })
            .collect())
    }

    /// Inserts `view` under its parent reference, or under the root when it
    /// has none. An empty root is created first if the tree has no root.
    pub fn save<V: NodeView + Hierarchic>(&self, view: &V) -> Result<V> {
        let node = view.to_new_node();
        let parent = view.external_parent().map(NodeId::from_u64);
        let inserted = self.manager.mutate(|txn| {
            let parent = match parent {
                Some(id) => id,
                None => match find_root(&*txn)? {
                    Some(root) => root.id(),
                    None => insert_root_in(txn, NewNode::new())?.id(),
                },
            };
            insert_in(txn, node, Some(parent)).map(|node| (node, parent))
        })?;
        let (node, parent) = inserted;
        let mut saved = V::from_node(&node);
        saved.set_parent(Some(parent.to_u64()));
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TreeError;
    use crate::store::MemoryStore;

    #[test]
    fn test_forest_from_edn() {
        let forest = ExternalNode::parse_forest(
            "[{:id 1 :attrs {:name \"docs\" :owner #nestedset/ref 7}}
              {:id 2 :parent 1 :attrs {:name \"a.txt\" :kind :file/text :size 12}}]",
        )
        .unwrap();
        assert_eq!(forest.len(), 2);
        assert_eq!(forest[0].parent, None);
        assert_eq!(forest[0].attrs["owner"], AttrValue::Ref(NodeId::from_u64(7)));
        assert_eq!(forest[1].parent, Some(1));
        assert_eq!(forest[1].attrs["kind"], AttrValue::Keyword("file/text".to_owned()));
        assert_eq!(forest[1].attrs["size"], AttrValue::Long(12));

        let emitted = ExternalNode::emit_forest(&forest).unwrap();
        assert_eq!(ExternalNode::parse_forest(&emitted).unwrap(), forest);
    }

    #[test]
    fn test_forest_edn_errors() {
        assert!(ExternalNode::parse_forest("[{:id 1 :colour :red}]").is_err());
        assert!(ExternalNode::parse_forest("[{:id -4}]").is_err());
        assert!(ExternalNode::parse_forest("{:id 1}").is_err());
        assert!(ExternalNode::parse_forest("[{:id").is_err());

        let unrepresentable = ExternalNode::new(u64::MAX, None);
        assert_eq!(
            unrepresentable.to_edn(),
            Err(EncodingError::IntegerOutOfRange {
                key: "id".to_owned(),
                value: u64::MAX
            })
        );
        let far_ref = ExternalNode::new(1, None).with("link", AttrValue::Ref(NodeId::from_u64(u64::MAX)));
        assert_eq!(
            ExternalNode::emit_forest(&[far_ref]),
            Err(EncodingError::RefOutOfRange(NodeId::from_u64(u64::MAX)))
        );
    }

    #[test]
    fn test_save_creates_root_and_sets_parent() {
        let manager = TreeManager::new(MemoryStore::new());
        let view = HierarchyView::new(&manager);
        let saved: ExternalNode = view
            .save(&ExternalNode::default().with("name", "first"))
            .unwrap();
        let root = manager.require_root().unwrap();
        assert_eq!(saved.parent, Some(root.id().to_u64()));
        assert_eq!(saved.attrs.get("name"), Some(&AttrValue::from("first")));
        assert!(root.attrs.is_empty());

        let child: ExternalNode = view
            .save(&ExternalNode {
                parent: saved.id,
                ..ExternalNode::default().with("name", "second")
            })
            .unwrap();
        assert_eq!(child.parent, saved.id);
        manager.verify().unwrap();
    }

    #[test]
    fn test_children_of_root_requires_root() {
        let manager = TreeManager::new(MemoryStore::new());
        let view = HierarchyView::new(&manager);
        let result: Result<Vec<ExternalNode>> = view.children_of(None, &[], Annotate::None);
        assert_eq!(result, Err(TreeError::RootMissing));
    }

    #[test]
    fn test_children_of_with_annotation() {
        let manager = TreeManager::new(MemoryStore::new());
        let root = manager.insert_root(NewNode::new()).unwrap();
        let a = manager
            .insert(NewNode::new().with("name", "b-folder"), Some(root.id()))
            .unwrap();
        manager
            .insert(NewNode::new().with("name", "a-folder"), Some(root.id()))
            .unwrap();
        manager.insert(NewNode::new(), Some(a.id())).unwrap();

        let view = HierarchyView::new(&manager);
        let children: Vec<ExternalNode> = view
            .children_of(None, &[OrderBy::attr("name")], Annotate::Both)
            .unwrap();
        let names: Vec<_> = children.iter().map(|c| c.attrs["name"].clone()).collect();
        assert_eq!(names, vec![AttrValue::from("a-folder"), AttrValue::from("b-folder")]);
        assert!(children.iter().all(|c| c.parent == Some(root.id().to_u64())));
        assert_eq!(children[1].direct_children_count, Some(1));
        assert_eq!(children[0].children_count, Some(0));

        let by_id: ExternalNode = view.by_id(a.id()).unwrap();
        assert_eq!(by_id.id, Some(a.id().to_u64()));
    }
}
