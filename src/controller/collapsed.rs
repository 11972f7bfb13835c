//! Collapse layer.
//!
//! A row is *uninteresting* when it has exactly one up edge and one down
//! edge, both usual, and is not a branch head. Collapsing hides every
//! maximal run of uninteresting rows that is at least `min_run_length` long
//! and links the rows around it with a dotted edge. Expanding shows the
//! inner layer unchanged.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use super::{DerivedGraph, GraphController, LinearGraphView};
use crate::types::{Direction, EdgeKind, GraphEdge, NodeId};

#[derive(Debug)]
pub struct CollapsedController {
    inner: Box<GraphController>,
    branch_nodes: Arc<HashSet<NodeId>>,
    min_run_length: usize,
    collapsed: bool,
    derived: DerivedGraph,
}

impl CollapsedController {
    /// Starts expanded.
    pub fn new(
        inner: GraphController,
        branch_nodes: Arc<HashSet<NodeId>>,
        min_run_length: usize,
    ) -> Self {
        let derived = DerivedGraph::identity(&inner);
        Self {
            inner: Box::new(inner),
            branch_nodes,
            min_run_length: min_run_length.max(1),
            collapsed: false,
            derived,
        }
    }

    pub fn inner(&self) -> &GraphController {
        &self.inner
    }

    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    pub fn collapse_all(&mut self) {
        if self.collapsed {
            return;
        }
        let (visible, bridges, runs) = self.find_runs();
        self.derived = DerivedGraph::project(&self.inner, &visible, &bridges);
        self.collapsed = true;
        debug!(
            runs,
            rows = self.inner.node_count(),
            visible = self.derived.node_count(),
            "collapsed linear runs"
        );
    }

    pub fn expand_all(&mut self) {
        if !self.collapsed {
            return;
        }
        self.derived = DerivedGraph::identity(&self.inner);
        self.collapsed = false;
    }

    fn is_uninteresting(&self, row: usize) -> bool {
        let up = self.inner.edges(row, Direction::Up);
        let down = self.inner.edges(row, Direction::Down);
        up.len() == 1
            && down.len() == 1
            && up[0].kind == EdgeKind::Usual
            && down[0].kind == EdgeKind::Usual
            && !self.branch_nodes.contains(&self.inner.node_id(row))
    }

    /// Visibility per inner row, the dotted bridge of every hidden row and
    /// the number of collapsed runs.
    fn find_runs(&self) -> (Vec<bool>, Vec<Vec<usize>>, usize) {
        let row_count = self.inner.node_count();
        let uninteresting: Vec<bool> = (0..row_count).map(|row| self.is_uninteresting(row)).collect();
        let mut visible = vec![true; row_count];
        let mut bridges = vec![Vec::new(); row_count];
        let mut runs = 0;

        for start in 0..row_count {
            if !uninteresting[start] {
                continue;
            }
            // Runs are entered from their single interesting parent row.
            let above = self.inner.up_rows(start);
            if above.iter().any(|&row| uninteresting[row]) {
                continue;
            }

            let mut run = vec![start];
            let mut end = start;
            let below = loop {
                let Some(&next) = self.inner.down_rows(end).first() else {
                    break None;
                };
                if !uninteresting[next] {
                    break Some(next);
                }
                run.push(next);
                end = next;
            };
            let Some(below) = below else {
                continue;
            };
            if run.len() < self.min_run_length {
                continue;
            }

            runs += 1;
            for &row in &run {
                visible[row] = false;
                bridges[row] = vec![below];
            }
        }

        (visible, bridges, runs)
    }
}

impl LinearGraphView for CollapsedController {
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
    use test_case::test_case;

    /// Two branches over a long shared stem:
    /// `x` and `y` -> `s1` -> `s2` -> `s3` -> `root`.
    fn stem() -> GraphController {
        base(&[
            ("x", &["s1"]),
            ("y", &["s1"]),
            ("s1", &["s2"]),
            ("s2", &["s3"]),
            ("s3", &["root"]),
            ("root", &[]),
        ])
    }

    fn collapsed(inner: GraphController, branch_nodes: &[NodeId], min: usize) -> CollapsedController {
        let mut c = CollapsedController::new(
            inner,
            Arc::new(branch_nodes.iter().copied().collect()),
            min,
        );
        c.collapse_all();
        c
    }

    #[test]
    fn starts_expanded() {
        let c = CollapsedController::new(stem(), Arc::new(HashSet::new()), 1);
        assert!(!c.is_collapsed());
        pa_eq!(c.node_count(), 6);
    }

    #[test]
    fn collapses_the_single_parent_run() {
        let c = collapsed(stem(), &[0, 1], 1);
        // s1 has two children; s2 and s3 form the run.
        pa_eq!(node_ids(&c), vec![0, 1, 2, 5]);
        pa_eq!(
            row_edges(&c),
            vec![(0, 2, Usual), (1, 2, Usual), (2, 3, Dotted)]
        );
        assert_consistent(&c);
    }

    #[test_case(1, 4 ; "short runs collapse")]
    #[test_case(2, 4 ; "run of exactly the minimum collapses")]
    #[test_case(3, 6 ; "run below the minimum stays")]
    fn min_run_length_is_respected(min: usize, visible: usize) {
        let c = collapsed(stem(), &[0, 1], min);
        pa_eq!(c.node_count(), visible);
    }

    #[test]
    fn branch_heads_interrupt_runs() {
        // s2 is a branch head, leaving only s3 in a run.
        let c = collapsed(stem(), &[0, 1, 3], 1);
        pa_eq!(node_ids(&c), vec![0, 1, 2, 3, 5]);
        pa_eq!(row_edges(&c).last().copied(), Some((3, 4, Dotted)));
    }

    #[test]
    fn expand_all_restores_the_inner_layer() {
        let mut c = collapsed(stem(), &[], 1);
        assert!(c.is_collapsed());
        c.expand_all();
        assert!(!c.is_collapsed());
        pa_eq!(node_ids(&c), vec![0, 1, 2, 3, 4, 5]);
        pa_eq!(row_edges(&c).len(), 5);
        c.collapse_all();
        pa_eq!(c.node_count(), 4);
    }

    #[test]
    fn runs_ending_at_a_placeholder_stay_visible() {
        // top -> mid -> (not loaded)
        let c = collapsed(base(&[("top", &["mid"]), ("mid", &["gone"])]), &[], 1);
        pa_eq!(c.node_count(), 2);
    }
}
