//! Splitting the graph into Bek branches.
//!
//! A branch is a path of nodes, top to bottom, that the rebase order tries to
//! keep contiguous. Nodes are considered in lane order; each unassigned node
//! starts a branch that grows along the first suitable parent.

use crate::graph::layout::GraphLayout;
use crate::graph::store::PermanentLinearGraph;
use crate::types::NodeId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BekBranches {
    pub(crate) branches: Vec<Vec<usize>>,
    branch_of: Vec<u32>,
    position: Vec<u32>,
}

impl BekBranches {
    pub(crate) fn create(graph: &PermanentLinearGraph, layout: &GraphLayout) -> Self {
        let node_count = graph.node_count();
        let mut order: Vec<usize> = (0..node_count).collect();
        order.sort_by_key(|&node| (layout.layout_index(node), node));

        let mut done = vec![false; node_count];
        let mut branches = Vec::new();
        let mut branch_of = vec![0u32; node_count];
        let mut position = vec![0u32; node_count];

        for start in order {
            if done[start] {
                continue;
            }
            done[start] = true;
            let mut branch = vec![start];
            let mut current = start;

            while let Some(next) = next_branch_node(graph, layout, &done, current) {
                done[next] = true;
                branch.push(next);
                current = next;
            }

            let branch_index = branches.len() as u32;
            for (offset, &node) in branch.iter().enumerate() {
                branch_of[node] = branch_index;
                position[node] = offset as u32;
            }
            branches.push(branch);
        }

        Self {
            branches,
            branch_of,
            position,
        }
    }

    /// The node following `node` on its branch, if any.
    pub(crate) fn next_in_branch(&self, node: usize) -> Option<usize> {
        let branch = &self.branches[self.branch_of[node] as usize];
        branch.get(self.position[node] as usize + 1).copied()
    }
}

/// First parent of `current` that stays in the same or a less important lane
/// and has no unassigned child in a lane at least as important as its own.
fn next_branch_node(
    graph: &PermanentLinearGraph,
    layout: &GraphLayout,
    done: &[bool],
    current: usize,
) -> Option<usize> {
    let current_layout = layout.layout_index(current);
    graph.down_nodes(current).find(|&parent| {
        let parent_layout = layout.layout_index(parent);
        !done[parent]
            && parent_layout >= current_layout
            && graph
                .up_nodes(parent as NodeId)
                .all(|child| done[child] || layout.layout_index(child) > parent_layout)
    })
}
