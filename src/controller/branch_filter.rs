//! Branch filter layer: restricts a layer to the nodes reachable from a set
//! of visible heads.

use std::collections::HashSet;

use tracing::debug;

use super::{DerivedGraph, GraphController, LinearGraphView};
use crate::types::{Direction, GraphEdge, NodeId};

#[derive(Debug)]
pub struct BranchFilterController {
    inner: Box<GraphController>,
    derived: DerivedGraph,
}

impl BranchFilterController {
    /// `reachable` is the down closure of the visible heads in the
    /// permanent graph. Edges leaving it are dropped.
    pub fn new(inner: GraphController, reachable: &HashSet<NodeId>) -> Self {
        let row_count = inner.node_count();
        let visible: Vec<bool> = (0..row_count)
            .map(|row| reachable.contains(&inner.node_id(row)))
            .collect();
        let bridges = vec![Vec::new(); row_count];
        let derived = DerivedGraph::project(&inner, &visible, &bridges);
        debug!(
            rows = row_count,
            visible = derived.node_count(),
            "applied branch filter"
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

impl LinearGraphView for BranchFilterController {
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

#[cfg(test)]
mod tests {
    use super::super::test_support::{assert_consistent, base, node_ids, row_edges};
    use super::*;
    use crate::types::EdgeKind::Usual;
    use pretty_assertions::assert_eq as pa_eq;

    #[test]
    fn keeps_only_the_reachable_rows() {
        // main -> base; topic -> base (not reachable from main).
        let inner = base(&[("main", &["base"]), ("topic", &["base"]), ("base", &[])]);
        let filter = BranchFilterController::new(inner, &HashSet::from([0, 2]));
        pa_eq!(node_ids(&filter), vec![0, 2]);
        pa_eq!(row_edges(&filter), vec![(0, 1, Usual)]);
        pa_eq!(filter.row_of(1), None);
        pa_eq!(filter.up_rows(1), vec![0]);
        assert_consistent(&filter);
    }

    #[test]
    fn empty_reachable_set_hides_everything() {
        let filter = BranchFilterController::new(base(&[("a", &[])]), &HashSet::new());
        pa_eq!(filter.node_count(), 0);
    }
}
