//! Layout lanes for multi-branch ordering.
//!
//! Heads are ordered with a caller comparator and each head's history is
//! walked depth-first; every maximal first-unvisited-parent path gets its own
//! lane. The lanes of one head form a contiguous region starting at
//! [`GraphLayout::start_layout_index`].

use std::cmp::Ordering;

use tracing::debug;

use crate::graph::store::PermanentLinearGraph;
use crate::types::NodeId;

/// Lane assignment for every loaded node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphLayout {
    layout_index: Vec<u32>,
    head_nodes: Vec<usize>,
    start_layout_index: Vec<u32>,
}

impl GraphLayout {
    /// Compute the layout. `compare_heads` decides which of two head nodes
    /// is more important (`Less` gets the lower lanes). It must be a total
    /// order; `sort_by` may panic otherwise.
    pub fn build(
        graph: &PermanentLinearGraph,
        mut compare_heads: impl FnMut(usize, usize) -> Ordering,
    ) -> Self {
        let node_count = graph.node_count();
        let mut head_nodes: Vec<usize> = (0..node_count)
            .filter(|&node| graph.up_nodes(node as NodeId).next().is_none())
            .collect();
        head_nodes.sort_by(|&a, &b| compare_heads(a, b));

        let mut builder = LayoutBuilder {
            graph,
            layout_index: vec![0; node_count],
            current_layout_index: 1,
        };

        let mut start_layout_index = Vec::with_capacity(head_nodes.len());
        for &head in &head_nodes {
            start_layout_index.push(builder.current_layout_index);
            builder.walk(head);
        }

        debug!(
            nodes = node_count,
            heads = head_nodes.len(),
            lanes = builder.current_layout_index - 1,
            "built graph layout"
        );

        Self {
            layout_index: builder.layout_index,
            head_nodes,
            start_layout_index,
        }
    }

    /// Lane of `node` (lanes start at 1).
    pub fn layout_index(&self, node: usize) -> u32 {
        self.layout_index[node]
    }

    /// Head nodes in comparator order.
    pub fn head_nodes(&self) -> &[usize] {
        &self.head_nodes
    }

    /// First lane of the region owned by the head at `head_position`.
    pub fn start_layout_index(&self, head_position: usize) -> u32 {
        self.start_layout_index[head_position]
    }

    /// Position (in [`head_nodes`](Self::head_nodes)) of the head whose
    /// lane region contains `node`.
    pub fn head_position_of(&self, node: usize) -> usize {
        let layout_index = self.layout_index[node];
        self.start_layout_index
            .partition_point(|&start| start <= layout_index)
            .saturating_sub(1)
    }

    /// The head whose lane region contains `node`.
    pub fn one_of_head_nodes(&self, node: usize) -> usize {
        self.head_nodes[self.head_position_of(node)]
    }

    pub fn node_count(&self) -> usize {
        self.layout_index.len()
    }
}

struct LayoutBuilder<'a> {
    graph: &'a PermanentLinearGraph,
    layout_index: Vec<u32>,
    current_layout_index: u32,
}

impl LayoutBuilder<'_> {
    fn walk(&mut self, start: usize) {
        let mut stack = vec![start];
        while let Some(&node) = stack.last() {
            let first_visit = self.layout_index[node] == 0;
            if first_visit {
                self.layout_index[node] = self.current_layout_index;
            }

            let next = self
                .graph
                .down_nodes(node)
                .find(|&parent| self.layout_index[parent] == 0);
            match next {
                Some(parent) => stack.push(parent),
                None => {
                    if first_visit {
                        self.current_layout_index += 1;
                    }
                    stack.pop();
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
