//! Merging Bek branches into one topological order.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use super::branches::BekBranches;
use crate::graph::layout::GraphLayout;
use crate::graph::store::PermanentLinearGraph;
use crate::types::NodeId;

/// A node whose children have all been emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ReadyNode {
    timestamp: i64,
    layout_index: u32,
    node: usize,
}

impl Ord for ReadyNode {
    /// Newest first, then the more important lane, then the earlier node.
    fn cmp(&self, other: &Self) -> Ordering {
        self.timestamp
            .cmp(&other.timestamp)
            .then_with(|| Reverse(self.layout_index).cmp(&Reverse(other.layout_index)))
            .then_with(|| Reverse(self.node).cmp(&Reverse(other.node)))
    }
}

impl PartialOrd for ReadyNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Emit every node after all of its children. After each node, its branch
/// successor goes next when it is ready; otherwise the newest ready node.
pub(crate) fn merge_branches(
    graph: &PermanentLinearGraph,
    layout: &GraphLayout,
    branches: &BekBranches,
    timestamp: impl Fn(usize) -> i64,
) -> Vec<usize> {
    let node_count = graph.node_count();
    let mut remaining_up: Vec<u32> = (0..node_count)
        .map(|node| graph.up_nodes(node as NodeId).count() as u32)
        .collect();
    let mut emitted = vec![false; node_count];
    let ready = |node: usize| ReadyNode {
        timestamp: timestamp(node),
        layout_index: layout.layout_index(node),
        node,
    };

    let mut heap: BinaryHeap<ReadyNode> = (0..node_count)
        .filter(|&node| remaining_up[node] == 0)
        .map(ready)
        .collect();

    let mut order = Vec::with_capacity(node_count);
    let mut last: Option<usize> = None;

    while order.len() < node_count {
        let continuation = last
            .and_then(|node| branches.next_in_branch(node))
            .filter(|&next| !emitted[next] && remaining_up[next] == 0);

        let next = match continuation {
            Some(next) => Some(next),
            None => {
                let mut popped = None;
                while let Some(candidate) = heap.pop() {
                    if !emitted[candidate.node] {
                        popped = Some(candidate.node);
                        break;
                    }
                }
                popped
            }
        };
        let Some(node) = next else {
            break;
        };

        emitted[node] = true;
        order.push(node);
        for parent in graph.down_nodes(node) {
            remaining_up[parent] -= 1;
            if remaining_up[parent] == 0 {
                heap.push(ready(parent));
            }
        }
        last = Some(node);
    }

    // The store rejects parent cycles, so every node becomes ready.
    debug_assert_eq!(order.len(), node_count, "bek merge stalled");
    order
}
