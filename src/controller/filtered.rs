//! Commit filter layer.
//!
//! Only matching commits stay visible. A path from a visible row through
//! hidden rows is replaced by a dotted edge to each nearest visible
//! descendant at the end of such a path.

use std::collections::HashSet;

use tracing::debug;

use super::{DerivedGraph, GraphController, LinearGraphView};
use crate::types::{Direction, GraphEdge, NodeId};

#[derive(Debug)]
pub struct FilteredController {
    inner: Box<GraphController>,
    derived: DerivedGraph,
}

impl FilteredController {
    pub fn new(inner: GraphController, matching: &HashSet<NodeId>) -> Self {
        let row_count = inner.node_count();
        let visible: Vec<bool> = (0..row_count)
            .map(|row| matching.contains(&inner.node_id(row)))
            .collect();

        // Rows are topological, so every down neighbour of a hidden row has
        // its bridges computed before the row itself.
        let mut bridges: Vec<Vec<usize>> = vec![Vec::new(); row_count];
        for row in (0..row_count).rev() {
            if visible[row] {
                continue;
            }
            let mut nearest = Vec::new();
            for down in inner.down_rows(row) {
                if visible[down] {
                    nearest.push(down);
                } else {
                    nearest.extend_from_slice(&bridges[down]);
                }
            }
            nearest.sort_unstable();
            nearest.dedup();
            bridges[row] = nearest;
        }

        let derived = DerivedGraph::project(&inner, &visible, &bridges);
        debug!(
            rows = row_count,
            visible = derived.node_count(),
            "applied commit filter"
        );
        Self {
            inner: Box::new(inner),
            derived,
        }
    }

    pub fn inner(&self) -> &GraphController {
        &self.inner
    }
}

impl LinearGraphView for FilteredController {
    fn node_count(&self) -> usize {
        self.derived.node_count()
    }

    fn node_id(&self, row: usize) -> NodeId {
        self.derived.node_id(&self.inner, row)
    }

    fn row_of(&self, node_id: NodeId) -> Option<usize> {
        self.derived.row_of(&self.inner, node_id)
    }

    fn edges(&self, row: usize, direction: Direction) -> Vec<GraphEdge> {
        self.derived.edges(row, direction)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::super::test_support::{assert_consistent, base, node_ids, row_edges};
    use super::*;
    use crate::types::EdgeKind::{Dotted, Usual};
    use pretty_assertions::assert_eq as pa_eq;

    fn filtered(commits: &[(&'static str, &[&'static str])], matching: &[NodeId]) -> FilteredController {
        FilteredController::new(base(commits), &matching.iter().copied().collect())
    }

    #[test]
    fn direct_edges_between_matches_stay_usual() {
        let f = filtered(&[("c", &["b"]), ("b", &["a"]), ("a", &[])], &[0, 1]);
        pa_eq!(node_ids(&f), vec![0, 1]);
        pa_eq!(row_edges(&f), vec![(0, 1, Usual)]);
        assert_consistent(&f);
    }

    #[test]
    fn hidden_paths_become_dotted_edges() {
        // e -> d -> c -> b -> a; keep e, b and a.
        let f = filtered(
            &[("e", &["d"]), ("d", &["c"]), ("c", &["b"]), ("b", &["a"]), ("a", &[])],
            &[0, 3, 4],
        );
        pa_eq!(node_ids(&f), vec![0, 3, 4]);
        pa_eq!(row_edges(&f), vec![(0, 1, Dotted), (1, 2, Usual)]);
        assert_consistent(&f);
    }

    #[test]
    fn hidden_fork_reaches_every_nearest_match() {
        // m -> h; h -> x, y (both kept); x, y -> r (hidden).
        let f = filtered(
            &[("m", &["h"]), ("h", &["x", "y"]), ("x", &["r"]), ("y", &["r"]), ("r", &[])],
            &[0, 2, 3],
        );
        pa_eq!(row_edges(&f), vec![(0, 1, Dotted), (0, 2, Dotted)]);
        pa_eq!(f.up_rows(2), vec![0]);
        assert_consistent(&f);
    }

    #[test]
    fn usual_edge_wins_over_a_parallel_hidden_path() {
        // d -> b, c; c -> b; keep d and b.
        let f = filtered(&[("d", &["b", "c"]), ("c", &["b"]), ("b", &[])], &[0, 2]);
        pa_eq!(row_edges(&f), vec![(0, 1, Usual)]);
    }

    #[test]
    fn not_loaded_edges_of_visible_rows_are_kept() {
        let f = filtered(&[("b", &["a", "gone"]), ("a", &["lost"])], &[0]);
        pa_eq!(
            f.edges(0, Direction::Down),
            vec![GraphEdge::not_loaded(0, -2)]
        );
    }

    #[test]
    fn no_matches_gives_an_empty_layer() {
        let f = filtered(&[("a", &[])], &[]);
        pa_eq!(f.node_count(), 0);
        pa_eq!(f.row_of(0), None);
    }
}
