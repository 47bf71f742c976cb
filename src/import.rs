//! Bulk import of an external parent-pointer forest, level by level.

use crate::config::{DanglingPolicy, ImportConfig};
use crate::error::{Result, TreeError};
use crate::manager::{insert_in, TreeManager};
use crate::node_id::NodeId;
use crate::store::NodeStore;
use crate::view::{Hierarchic, NodeView};
use itertools::Itertools;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use tracing::{debug, info, info_span, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub inserted: usize,
    /// External id to the internal id it was inserted as. The first
    /// occurrence wins when an external id repeats.
    pub id_map: BTreeMap<u64, NodeId>,
    /// Positions in the input of nodes that were never inserted.
    pub dropped: Vec<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct ForestImporter {
    config: ImportConfig,
}

impl ForestImporter {
    pub fn new(config: ImportConfig) -> ForestImporter {
        ForestImporter { config }
    }

    fn is_top_level<V: Hierarchic>(&self, node: &V) -> bool {
        match node.external_parent() {
            None => true,
            Some(parent) => self.config.root_sentinel == Some(parent),
        }
    }

    /// Rejects duplicate ids and parent references that do not resolve.
    fn check_references<V: Hierarchic>(&self, forest: &[V]) -> Result<()> {
        let mut ids = HashSet::new();
        for id in forest.iter().filter_map(|n| n.external_id()) {
            if !ids.insert(id) {
                return Err(TreeError::DuplicateExternalId(id));
            }
        }
        for node in forest.iter().filter(|n| !self.is_top_level(*n)) {
            if let Some(parent) = node.external_parent() {
                if !ids.contains(&parent) {
                    return Err(TreeError::DanglingParent {
                        external_id: node.external_id(),
                        parent,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn import<S, V>(&self, manager: &TreeManager<S>, forest: &[V], parent: NodeId) -> Result<ImportReport>
    where
        S: NodeStore,
        V: NodeView + Hierarchic,
    {
        let _span = info_span!("import", tree = %manager.tree_id(), %parent, nodes = forest.len()).entered();

        if self.config.dangling == DanglingPolicy::Fail {
            self.check_references(forest)?;
        }

        let children: HashMap<u64, Vec<usize>> = forest
            .iter()
            .enumerate()
            .filter(|(_, node)| !self.is_top_level(*node))
            .filter_map(|(i, node)| node.external_parent().map(|p| (p, i)))
            .into_group_map();

        let report = manager.mutate(|txn| {
            if txn.get(parent)?.is_none() {
                return Err(TreeError::InvalidParent(Some(parent)));
            }

            let mut report = ImportReport::default();
            let mut visited = vec![false; forest.len()];
            let mut queue: VecDeque<(usize, NodeId)> = forest
                .iter()
                .enumerate()
                .filter(|(_, node)| self.is_top_level(*node))
                .map(|(i, _)| (i, parent))
                .collect();

            while let Some((i, internal_parent)) = queue.pop_front() {
                if visited[i] {
                    continue;
                }
                visited[i] = true;
                let external = &forest[i];
                let inserted = insert_in(txn, external.to_new_node(), Some(internal_parent))?;
                report.inserted += 1;
                if let Some(id) = external.external_id() {
                    report.id_map.entry(id).or_insert_with(|| inserted.id());
                    if let Some(kids) = children.get(&id) {
                        debug!(external = id, internal = %inserted.id(), children = kids.len(), "queued children");
                        queue.extend(kids.iter().map(|&k| (k, inserted.id())));
                    }
                }
            }

            report.dropped = visited
                .iter()
                .enumerate()
                .filter(|(_, seen)| !**seen)
                .map(|(i, _)| i)
                .collect();
            if !report.dropped.is_empty() && self.config.dangling == DanglingPolicy::Fail {
                return Err(TreeError::UnreachableImport {
                    count: report.dropped.len(),
                });
            }
            Ok(report)
        })?;

        if !report.dropped.is_empty() {
            warn!(
                dropped = report.dropped.len(),
                positions = ?report.dropped,
                "skipped nodes whose parent reference does not resolve within the import"
            );
        }
        info!(inserted = report.inserted, "imported forest");
        Ok(report)
    }
}

impl<S: NodeStore> TreeManager<S> {
    /// Imports `forest` under `parent` using the manager's import settings.
    pub fn import_forest<V: NodeView + Hierarchic>(&self, forest: &[V], parent: NodeId) -> Result<ImportReport> {
        ForestImporter::new(self.config().import.clone()).import(self, forest, parent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NewNode;
    use crate::store::MemoryStore;
    use crate::view::ExternalNode;

    fn setup() -> (TreeManager<MemoryStore>, NodeId) {
        let manager = TreeManager::new(MemoryStore::new());
        let root = manager.insert_root(NewNode::new().with("name", "R")).unwrap();
        (manager, root.id())
    }

    #[test]
    fn test_sentinel_parent_is_top_level() {
        let (manager, root) = setup();
        let forest = vec![ExternalNode::new(5, Some(0)), ExternalNode::new(6, Some(5))];
        let report = manager.import_forest(&forest, root).unwrap();
        assert_eq!(report.inserted, 2);
        assert_eq!(
            manager.parent_of(report.id_map[&6], -1).unwrap().map(|n| n.id()),
            Some(report.id_map[&5])
        );
    }

    #[test]
    fn test_dangling_reference_dropped_by_default() {
        let (manager, root) = setup();
        let forest = vec![
            ExternalNode::new(1, None),
            ExternalNode::new(2, Some(42)),
            ExternalNode::new(3, Some(2)),
        ];
        let report = manager.import_forest(&forest, root).unwrap();
        assert_eq!(report.inserted, 1);
        assert_eq!(report.dropped, vec![1, 2]);
        assert_eq!(manager.store().len(), 2);
    }

    #[test]
    fn test_fail_policy_rejects_before_mutating() {
        let (manager, root) = setup();
        let importer = ForestImporter::new(ImportConfig {
            root_sentinel: None,
            dangling: DanglingPolicy::Fail,
        });
        let dangling = vec![ExternalNode::new(1, None), ExternalNode::new(2, Some(42))];
        assert_eq!(
            importer.import(&manager, &dangling, root),
            Err(TreeError::DanglingParent {
                external_id: Some(2),
                parent: 42
            })
        );
        let duplicate = vec![ExternalNode::new(1, None), ExternalNode::new(1, None)];
        assert_eq!(
            importer.import(&manager, &duplicate, root),
            Err(TreeError::DuplicateExternalId(1))
        );
        let cycle = vec![
            ExternalNode::new(1, None),
            ExternalNode::new(2, Some(3)),
            ExternalNode::new(3, Some(2)),
        ];
        assert_eq!(
            importer.import(&manager, &cycle, root),
            Err(TreeError::UnreachableImport { count: 2 })
        );
        assert_eq!(manager.store().len(), 1);
    }

    #[test]
    fn test_unknown_target_parent() {
        let (manager, _) = setup();
        let missing = NodeId::from_u64(77);
        assert_eq!(
            manager.import_forest(&[ExternalNode::new(1, None)], missing),
            Err(TreeError::InvalidParent(Some(missing)))
        );
    }
}
