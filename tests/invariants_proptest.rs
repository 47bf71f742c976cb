//! Property-based tests: random insert/delete sequences keep the nested-set
//! invariants and agree with a plain parent-pointer model.

use nestedset::{MemoryStore, NewNode, NodeId, TreeError, TreeManager};
use proptest::prelude::*;
use std::collections::BTreeMap;

#[derive(Clone, Debug)]
enum Op {
    Insert { pick: usize },
    Delete { pick: usize, cascade: bool },
}

fn arbitrary_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => any::<usize>().prop_map(|pick| Op::Insert { pick }),
        1 => (any::<usize>(), any::<bool>()).prop_map(|(pick, cascade)| Op::Delete { pick, cascade }),
    ]
}

/// Parent pointers of every live node; the root maps to `None`.
#[derive(Default)]
struct Model {
    parents: BTreeMap<NodeId, Option<NodeId>>,
}

impl Model {
    fn pick(&self, pick: usize) -> Option<NodeId> {
        if self.parents.is_empty() {
            return None;
        }
        self.parents.keys().nth(pick % self.parents.len()).copied()
    }

    fn direct_children(&self, id: NodeId) -> Vec<NodeId> {
        self.parents
            .iter()
            .filter(|(_, parent)| **parent == Some(id))
            .map(|(child, _)| *child)
            .collect()
    }

    fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut found = vec![id];
        let mut i = 0;
        while i < found.len() {
            found.extend(self.direct_children(found[i]));
            i += 1;
        }
        found
    }
}

fn apply(tree: &TreeManager<MemoryStore>, model: &mut Model, op: &Op) -> Result<(), TestCaseError> {
    match *op {
        Op::Insert { pick } => {
            let parent = model.pick(pick);
            let inserted = tree.insert(NewNode::new(), parent).unwrap();
            model.parents.insert(inserted.id(), parent);
        }
        Op::Delete { pick, cascade } => {
            let id = match model.pick(pick) {
                Some(id) => id,
                None => return Ok(()),
            };
            let subtree = model.subtree(id);
            let before = tree.store().snapshot();
            match tree.delete(id, cascade) {
                Ok(removed) => {
                    prop_assert_eq!(removed, subtree.len());
                    for gone in subtree {
                        model.parents.remove(&gone);
                    }
                }
                Err(TreeError::HasChildren { descendants, .. }) => {
                    prop_assert!(!cascade);
                    prop_assert_eq!(descendants as usize, subtree.len() - 1);
                    let after = tree.store().snapshot();
                    prop_assert_eq!(
                        after.iter().map(|n| n.interval()).collect::<Vec<_>>(),
                        before.iter().map(|n| n.interval()).collect::<Vec<_>>()
                    );
                }
                Err(other) => return Err(TestCaseError::fail(format!("unexpected error {}", other))),
            }
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn random_edits_preserve_invariants(ops in prop::collection::vec(arbitrary_op(), 1..60)) {
        let tree = TreeManager::new(MemoryStore::new());
        let mut model = Model::default();

        for op in &ops {
            apply(&tree, &mut model, op)?;
            let stats = tree.verify();
            prop_assert!(stats.is_ok(), "{:?} after {:?}", stats, op);
            prop_assert_eq!(tree.store().len(), model.parents.len());
        }

        for (&id, &parent) in &model.parents {
            let direct = tree.child_count(id, true).unwrap();
            prop_assert_eq!(direct as usize, model.direct_children(id).len());
            let all = tree.child_count(id, false).unwrap();
            prop_assert_eq!(all as usize, model.subtree(id).len() - 1);
            let found = tree.parent_of(id, -1).ok().flatten().map(|n| n.id());
            prop_assert_eq!(found, parent);
        }
    }

    #[test]
    fn root_spans_the_whole_tree(inserts in prop::collection::vec(any::<usize>(), 0..40)) {
        let tree = TreeManager::new(MemoryStore::new());
        let mut model = Model::default();
        for pick in inserts {
            apply(&tree, &mut model, &Op::Insert { pick })?;
        }
        match tree.root_node().unwrap() {
            None => prop_assert!(model.parents.is_empty()),
            Some(root) => {
                prop_assert_eq!(root.left(), 1);
                prop_assert_eq!(root.right(), 2 * model.parents.len() as i64);
            }
        }
    }
}
