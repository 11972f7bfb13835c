//! Base layer: the permanent graph in Normal or Bek row order.

use std::sync::Arc;

use super::LinearGraphView;
use crate::bek::BekIntMap;
use crate::graph::store::PermanentLinearGraph;
use crate::types::{Direction, GraphEdge, NodeId};

#[derive(Debug, Clone)]
enum BaseOrder {
    Normal,
    Bek(Arc<BekIntMap>),
}

/// Every loaded node, one per row. Placeholders have no row; edges to them
/// are reported as not-loaded edges.
#[derive(Debug, Clone)]
pub struct BaseController {
    graph: Arc<PermanentLinearGraph>,
    order: BaseOrder,
}

impl BaseController {
    /// Rows in input order, or the store's stable topological order when
    /// the input lists parents before children.
    pub fn normal(graph: Arc<PermanentLinearGraph>) -> Self {
        Self {
            graph,
            order: BaseOrder::Normal,
        }
    }

    /// Rows in Bek order.
    pub fn bek(graph: Arc<PermanentLinearGraph>, bek_map: Arc<BekIntMap>) -> Self {
        Self {
            graph,
            order: BaseOrder::Bek(bek_map),
        }
    }

    fn node_of_row(&self, row: usize) -> usize {
        match &self.order {
            BaseOrder::Normal => self.graph.normal_node(row),
            BaseOrder::Bek(map) => map.usual_index(row),
        }
    }

    fn row_of_node(&self, node: usize) -> usize {
        match &self.order {
            BaseOrder::Normal => self.graph.normal_row(node),
            BaseOrder::Bek(map) => map.bek_index(node),
        }
    }
}

impl LinearGraphView for BaseController {
    fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    fn node_id(&self, row: usize) -> NodeId {
        self.node_of_row(row) as NodeId
    }

    fn row_of(&self, node_id: NodeId) -> Option<usize> {
        self.graph
            .is_loaded_node(node_id)
            .then(|| self.row_of_node(node_id as usize))
    }

    fn edges(&self, row: usize, direction: Direction) -> Vec<GraphEdge> {
        let node = self.node_of_row(row);
        match direction {
            Direction::Down => self
                .graph
                .down_nodes_including_not_loaded(node)
                .iter()
                .map(|&target| {
                    if target >= 0 {
                        GraphEdge::usual(row, self.row_of_node(target as usize))
                    } else {
                        GraphEdge::not_loaded(row, target)
                    }
                })
                .collect(),
            Direction::Up => self
                .graph
                .up_nodes(node as NodeId)
                .map(|child| GraphEdge::usual(self.row_of_node(child), row))
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::super::test_support::{assert_consistent, graph, node_ids, row_edges};
    use super::*;
    use crate::types::EdgeKind;
    use pretty_assertions::assert_eq as pa_eq;

    fn diamond() -> Arc<PermanentLinearGraph> {
        graph(&[("d", &["b", "c"]), ("b", &["a"]), ("c", &["a", "gone"]), ("a", &[])])
    }

    #[test]
    fn normal_order_is_input_order() {
        let base = BaseController::normal(diamond());
        pa_eq!(node_ids(&base), vec![0, 1, 2, 3]);
        pa_eq!(
            row_edges(&base),
            vec![
                (0, 1, EdgeKind::Usual),
                (0, 2, EdgeKind::Usual),
                (1, 3, EdgeKind::Usual),
                (2, 3, EdgeKind::Usual),
            ]
        );
        pa_eq!(
            base.edges(2, Direction::Down),
            vec![GraphEdge::usual(2, 3), GraphEdge::not_loaded(2, -2)]
        );
        pa_eq!(base.up_rows(3), vec![1, 2]);
        assert_consistent(&base);
    }

    #[test]
    fn bek_order_permutes_rows() {
        // Show c before b.
        let map = Arc::new(BekIntMap::from_order(vec![0, 2, 1, 3]));
        let base = BaseController::bek(diamond(), map);
        pa_eq!(node_ids(&base), vec![0, 2, 1, 3]);
        pa_eq!(base.row_of(2), Some(1));
        pa_eq!(base.down_rows(0), vec![2, 1]);
        pa_eq!(base.down_rows(1), vec![3]);
        assert_consistent(&base);
    }

    #[test]
    fn parents_first_input_is_shown_children_first() {
        let base = BaseController::normal(graph(&[
            ("a", &[]),
            ("b", &["a"]),
            ("c", &["a"]),
            ("d", &["b", "c"]),
        ]));
        pa_eq!(node_ids(&base), vec![3, 1, 2, 0]);
        pa_eq!(base.row_of(0), Some(3));
        pa_eq!(base.down_rows(0), vec![1, 2]);
        pa_eq!(base.up_rows(3), vec![1, 2]);
        assert_consistent(&base);
    }

    #[test]
    fn placeholders_have_no_row() {
        let base = BaseController::normal(diamond());
        pa_eq!(base.row_of(-2), None);
        pa_eq!(base.row_of(-1), None);
        pa_eq!(base.row_of(4), None);
    }
}
