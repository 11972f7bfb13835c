//! Bek ("rebase") ordering.
//!
//! The graph is split into branches ([`branches`]) and the branches are
//! merged back into one topological order ([`merger`]) that keeps each branch
//! contiguous where possible and otherwise prefers newer commits. The result
//! is a [`BekIntMap`]: a permutation between Bek rows and node indices.

pub(crate) mod branches;
pub(crate) mod merger;

use tracing::debug;

use crate::graph::layout::GraphLayout;
use crate::graph::store::PermanentLinearGraph;
use branches::BekBranches;

/// Bijection between Bek order positions and node indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BekIntMap {
    bek_to_usual: Vec<u32>,
    usual_to_bek: Vec<u32>,
}

impl BekIntMap {
    /// Build from `order`, where `order[bek] = usual`. `order` must be a
    /// permutation of `0..order.len()`.
    pub(crate) fn from_order(order: Vec<usize>) -> Self {
        let mut usual_to_bek = vec![u32::MAX; order.len()];
        for (bek, &usual) in order.iter().enumerate() {
            usual_to_bek[usual] = bek as u32;
        }
        debug_assert!(
            usual_to_bek.iter().all(|&bek| bek != u32::MAX),
            "bek order is not a permutation"
        );
        Self {
            bek_to_usual: order.into_iter().map(|usual| usual as u32).collect(),
            usual_to_bek,
        }
    }

    pub fn size(&self) -> usize {
        self.bek_to_usual.len()
    }

    /// Node index shown at Bek row `bek_index`.
    pub fn usual_index(&self, bek_index: usize) -> usize {
        self.bek_to_usual[bek_index] as usize
    }

    /// Bek row of node index `usual_index`.
    pub fn bek_index(&self, usual_index: usize) -> usize {
        self.usual_to_bek[usual_index] as usize
    }
}

/// Compute the Bek order of `graph`. `timestamp` is queried per node index.
pub fn create_bek_map(
    graph: &PermanentLinearGraph,
    layout: &GraphLayout,
    timestamp: impl Fn(usize) -> i64,
) -> BekIntMap {
    let branches = BekBranches::create(graph, layout);
    let order = merger::merge_branches(graph, layout, &branches, timestamp);
    debug!(
        nodes = order.len(),
        branches = branches.branches.len(),
        "built bek order"
    );
    BekIntMap::from_order(order)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::store::NotLoadedIdsGenerator;
    use crate::types::{GraphCommit, NodeId};
    use pretty_assertions::assert_eq as pa_eq;

    fn bek(commits: &[(&'static str, &[&'static str], i64)]) -> (PermanentLinearGraph, BekIntMap) {
        let commits: Vec<_> = commits
            .iter()
            .map(|(id, parents, ts)| GraphCommit::new(*id, parents.to_vec(), *ts))
            .collect();
        let graph =
            PermanentLinearGraph::build(&commits, &mut NotLoadedIdsGenerator::new()).unwrap();
        let layout = GraphLayout::build(&graph, |a, b| a.cmp(&b));
        let map = create_bek_map(&graph, &layout, |node| commits[node].timestamp);
        (graph, map)
    }

    fn order(map: &BekIntMap) -> Vec<usize> {
        (0..map.size()).map(|bek| map.usual_index(bek)).collect()
    }

    #[test]
    fn from_order_builds_the_inverse() {
        let map = BekIntMap::from_order(vec![2, 0, 1]);
        pa_eq!(map.size(), 3);
        pa_eq!(map.usual_index(0), 2);
        pa_eq!(map.bek_index(2), 0);
        pa_eq!(map.bek_index(0), 1);
        pa_eq!(map.bek_index(1), 2);
    }

    #[test]
    fn linear_history_keeps_input_order() {
        let (_, map) = bek(&[("c", &["b"], 3), ("b", &["a"], 2), ("a", &[], 1)]);
        pa_eq!(order(&map), vec![0, 1, 2]);
    }

    #[test]
    fn branch_continuation_beats_newer_ready_nodes() {
        // m merges x (old) and y (new); x follows m on the same branch.
        let (_, map) = bek(&[
            ("m", &["x", "y"], 5),
            ("x", &["base"], 1),
            ("y", &["base"], 4),
            ("base", &[], 0),
        ]);
        pa_eq!(order(&map), vec![0, 1, 2, 3]);
    }

    #[test]
    fn independent_heads_interleave_by_time() {
        // x and y are both heads over r; y is newer.
        let (_, map) = bek(&[("x", &["r"], 10), ("y", &["r"], 20), ("r", &[], 1)]);
        pa_eq!(order(&map), vec![1, 0, 2]);
    }

    #[test]
    fn order_is_a_topological_permutation() {
        let (graph, map) = bek(&[
            ("h", &["f", "g"], 8),
            ("g", &["e"], 7),
            ("f", &["d", "e"], 6),
            ("e", &["c"], 5),
            ("d", &["b", "missing"], 4),
            ("c", &["a"], 3),
            ("b", &["a"], 2),
            ("a", &[], 1),
        ]);

        let mut sorted = order(&map);
        sorted.sort_unstable();
        pa_eq!(sorted, (0..8).collect::<Vec<_>>());

        for node in 0..graph.node_count() {
            for parent in graph.down_nodes(node) {
                assert!(
                    map.bek_index(node) < map.bek_index(parent),
                    "child {node} must precede parent {parent}"
                );
            }
            for child in graph.up_nodes(node as NodeId) {
                assert!(map.bek_index(child) < map.bek_index(node));
            }
        }
    }

    #[test]
    fn empty_graph_has_empty_map() {
        let (_, map) = bek(&[]);
        pa_eq!(map.size(), 0);
    }
}
