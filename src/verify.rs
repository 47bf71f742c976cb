use crate::node::Node;
use crate::node_id::NodeId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("no node has left bound 1")]
    MissingRoot,

    #[error("{0} nodes have left bound 1")]
    DuplicateRoot(usize),

    #[error("root {id} has depth {depth}")]
    RootDepth { id: NodeId, depth: u32 },

    #[error("{id} has right bound {right} not greater than left bound {left}")]
    Inverted { id: NodeId, left: i64, right: i64 },

    #[error("{id} lies outside the root interval")]
    Outside { id: NodeId },

    #[error("{inner} partially overlaps {outer}")]
    Overlap { outer: NodeId, inner: NodeId },

    #[error("{id} has depth {found}, expected {expected}")]
    Depth { id: NodeId, expected: u32, found: u32 },

    #[error("{id} has width {width} but {descendants} descendant(s)")]
    Width {
        id: NodeId,
        width: i64,
        descendants: usize,
    },
}

/// Summary of a tree that passed [`check`].
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct TreeStats {
    pub nodes: usize,
    pub leaves: usize,
    pub max_depth: u32,
}

pub fn check(nodes: &[Node]) -> Result<TreeStats, Violation> {
    if nodes.is_empty() {
        return Ok(TreeStats::default());
    }

    let mut sorted: Vec<&Node> = nodes.iter().collect();
    sorted.sort_by_key(|n| (n.left(), n.right()));

    match sorted.iter().filter(|n| n.left() == 1).count() {
        0 => return Err(Violation::MissingRoot),
        1 => {}
        n => return Err(Violation::DuplicateRoot(n)),
    }
    let root = sorted[0];
    if root.left() != 1 {
        return Err(Violation::Outside { id: root.id() });
    }
    if root.depth() != 0 {
        return Err(Violation::RootDepth {
            id: root.id(),
            depth: root.depth(),
        });
    }

    let lefts: Vec<i64> = sorted.iter().map(|n| n.left()).collect();
    let mut stats = TreeStats::default();
    let mut open: Vec<&Node> = Vec::new();

    for (i, node) in sorted.iter().copied().enumerate() {
        if node.right() <= node.left() {
            return Err(Violation::Inverted {
                id: node.id(),
                left: node.left(),
                right: node.right(),
            });
        }

        while open.last().map_or(false, |top| top.right() < node.left()) {
            open.pop();
        }
        match open.last() {
            None if i > 0 => return Err(Violation::Outside { id: node.id() }),
            None => {}
            Some(parent) => {
                if !parent.interval().contains(&node.interval()) {
                    return Err(Violation::Overlap {
                        outer: parent.id(),
                        inner: node.id(),
                    });
                }
                if node.depth() != parent.depth() + 1 {
                    return Err(Violation::Depth {
                        id: node.id(),
                        expected: parent.depth() + 1,
                        found: node.depth(),
                    });
                }
            }
        }

        let descendants = lefts.partition_point(|&l| l <= node.right()) - i - 1;
        let width = node.right() - node.left();
        if width != 1 + 2 * descendants as i64 {
            return Err(Violation::Width {
                id: node.id(),
                width,
                descendants,
            });
        }

        stats.nodes += 1;
        if descendants == 0 {
            stats.leaves += 1;
        }
        stats.max_depth = stats.max_depth.max(node.depth());
        open.push(node);
    }

    Ok(stats)
}
