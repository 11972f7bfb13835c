//! Reachability over the permanent graph.
//!
//! Breadth-first walks in either direction. Placeholders are never visited:
//! not-loaded parents are dead ends, and an upward walk started at a
//! placeholder continues from its loaded children.

use std::collections::{HashSet, VecDeque};

use crate::graph::store::PermanentLinearGraph;
use crate::types::{Direction, NodeId};

/// Reachability queries bound to one linear graph.
pub struct ReachableNodes<'a> {
    graph: &'a PermanentLinearGraph,
}

impl<'a> ReachableNodes<'a> {
    pub fn new(graph: &'a PermanentLinearGraph) -> Self {
        Self { graph }
    }

    /// Visit every node reachable from `starts` in `direction` exactly once,
    /// starts included.
    pub fn walk(
        &self,
        starts: impl IntoIterator<Item = NodeId>,
        direction: Direction,
        mut visitor: impl FnMut(usize),
    ) {
        let mut visited = vec![false; self.graph.node_count()];
        let mut queue = VecDeque::new();

        for start in starts {
            if self.graph.is_loaded_node(start) {
                let node = start as usize;
                if !visited[node] {
                    visited[node] = true;
                    queue.push_back(node);
                }
            } else if direction == Direction::Up {
                for child in self.graph.up_nodes(start) {
                    if !visited[child] {
                        visited[child] = true;
                        queue.push_back(child);
                    }
                }
            }
        }

        while let Some(node) = queue.pop_front() {
            visitor(node);
            match direction {
                Direction::Down => {
                    for next in self.graph.down_nodes(node) {
                        if !visited[next] {
                            visited[next] = true;
                            queue.push_back(next);
                        }
                    }
                }
                Direction::Up => {
                    for next in self.graph.up_nodes(node as NodeId) {
                        if !visited[next] {
                            visited[next] = true;
                            queue.push_back(next);
                        }
                    }
                }
            }
        }
    }

    /// Every ancestor of `heads`, heads included, as node ids.
    pub fn reachable_from(&self, heads: impl IntoIterator<Item = NodeId>) -> HashSet<NodeId> {
        let mut reachable = HashSet::new();
        self.walk(heads, Direction::Down, |node| {
            reachable.insert(node as NodeId);
        });
        reachable
    }

    /// The members of `branch_nodes` that have `node` as an ancestor
    /// (or are `node` itself).
    pub fn containing_branches(
        &self,
        node: NodeId,
        branch_nodes: &HashSet<NodeId>,
    ) -> HashSet<NodeId> {
        let mut result = HashSet::new();
        if branch_nodes.contains(&node) {
            result.insert(node);
        }
        self.walk([node], Direction::Up, |reached| {
            let reached = reached as NodeId;
            if branch_nodes.contains(&reached) {
                result.insert(reached);
            }
        });
        result
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
