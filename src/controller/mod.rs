//! Controller chain: composable adjacency layers over the permanent graph.
//!
//! A [`BaseController`] exposes the permanent graph in Normal or Bek order.
//! Decorators each own the layer below them and present a derived row space:
//! a subset and/or reordering of the inner rows with their own edges. Every
//! layer keeps its rows topologically ordered (down edges point to larger
//! rows) and resolves node ids by recursing to the base.

pub mod base;
pub mod branch_filter;
pub mod collapsed;
pub mod filtered;
pub mod linear_bek;

pub use base::BaseController;
pub use branch_filter::BranchFilterController;
pub use collapsed::CollapsedController;
pub use filtered::FilteredController;
pub use linear_bek::LinearBekController;

use crate::types::{Direction, EdgeKind, GraphEdge, NodeId};

// ---------------------------------------------------------------------------
// LinearGraphView
// ---------------------------------------------------------------------------

/// Row-level adjacency queries answered by every controller layer.
pub trait LinearGraphView {
    /// Number of rows in this layer.
    fn node_count(&self) -> usize;

    /// Permanent node shown at `row`.
    fn node_id(&self, row: usize) -> NodeId;

    /// Row showing `node_id`, if this layer shows it.
    fn row_of(&self, node_id: NodeId) -> Option<usize>;

    /// Edges touching `row`: toward parents for [`Direction::Down`] (the
    /// edge's `up` is `row`), toward children for [`Direction::Up`].
    fn edges(&self, row: usize, direction: Direction) -> Vec<GraphEdge>;

    fn down_rows(&self, row: usize) -> Vec<usize> {
        self.edges(row, Direction::Down)
            .into_iter()
            .filter_map(|edge| edge.down)
            .collect()
    }

    fn up_rows(&self, row: usize) -> Vec<usize> {
        self.edges(row, Direction::Up)
            .into_iter()
            .map(|edge| edge.up)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// GraphController
// ---------------------------------------------------------------------------

/// One layer of the chain, outermost first.
#[derive(Debug)]
pub enum GraphController {
    Base(BaseController),
    LinearBek(LinearBekController),
    CommitFilter(FilteredController),
    BranchFilter(BranchFilterController),
    Collapsed(CollapsedController),
}

impl GraphController {
    /// Short layer name used in logs and diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Base(_) => "base",
            Self::LinearBek(_) => "linear-bek",
            Self::CommitFilter(_) => "commit-filter",
            Self::BranchFilter(_) => "branch-filter",
            Self::Collapsed(_) => "collapsed",
        }
    }

    /// The layer this one decorates; `None` for the base.
    pub fn inner(&self) -> Option<&GraphController> {
        match self {
            Self::Base(_) => None,
            Self::LinearBek(c) => Some(c.inner()),
            Self::CommitFilter(c) => Some(c.inner()),
            Self::BranchFilter(c) => Some(c.inner()),
            Self::Collapsed(c) => Some(c.inner()),
        }
    }

    /// Layer names from this layer down to the base.
    pub fn layers(&self) -> Vec<&'static str> {
        let mut names = vec![self.name()];
        let mut current = self.inner();
        while let Some(layer) = current {
            names.push(layer.name());
            current = layer.inner();
        }
        names
    }

    /// The outermost collapse layer, for toggling from a preprocessor.
    pub fn as_collapsed_mut(&mut self) -> Option<&mut CollapsedController> {
        match self {
            Self::Collapsed(c) => Some(c),
            _ => None,
        }
    }

    fn view(&self) -> &dyn LinearGraphView {
        match self {
            Self::Base(c) => c,
            Self::LinearBek(c) => c,
            Self::CommitFilter(c) => c,
            Self::BranchFilter(c) => c,
            Self::Collapsed(c) => c,
        }
    }
}

impl LinearGraphView for GraphController {
    fn node_count(&self) -> usize {
        self.view().node_count()
    }

    fn node_id(&self, row: usize) -> NodeId {
        self.view().node_id(row)
    }

    fn row_of(&self, node_id: NodeId) -> Option<usize> {
        self.view().row_of(node_id)
    }

    fn edges(&self, row: usize, direction: Direction) -> Vec<GraphEdge> {
        self.view().edges(row, direction)
    }
}

// ---------------------------------------------------------------------------
// DerivedGraph
// ---------------------------------------------------------------------------

/// Where a derived down edge points, before rows are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DownTarget {
    /// A row of the derived layer.
    Row(usize, EdgeKind),
    /// A placeholder that was never loaded.
    NotLoaded(NodeId),
}

/// Row space and edges of a decorator layer.
#[derive(Debug, Clone, Default)]
pub(crate) struct DerivedGraph {
    /// Inner row shown at each derived row.
    inner_rows: Vec<usize>,
    /// Derived row of each inner row, `None` when hidden.
    row_by_inner: Vec<Option<usize>>,
    down: Vec<Vec<GraphEdge>>,
    up: Vec<Vec<GraphEdge>>,
}

impl DerivedGraph {
    /// `inner_rows[row]` is the inner row shown at `row`; `targets[row]` are
    /// its down edges. Duplicate targets collapse into one edge, preferring
    /// a usual edge over a dotted one.
    pub(crate) fn new(
        inner_rows: Vec<usize>,
        inner_count: usize,
        targets: Vec<Vec<DownTarget>>,
    ) -> Self {
        let mut row_by_inner = vec![None; inner_count];
        for (row, &inner) in inner_rows.iter().enumerate() {
            row_by_inner[inner] = Some(row);
        }

        let row_count = inner_rows.len();
        let mut down: Vec<Vec<GraphEdge>> = Vec::with_capacity(row_count);
        let mut up: Vec<Vec<GraphEdge>> = vec![Vec::new(); row_count];

        for (row, row_targets) in targets.into_iter().enumerate() {
            let mut edges: Vec<GraphEdge> = Vec::with_capacity(row_targets.len());
            for target in row_targets {
                let edge = match target {
                    DownTarget::Row(down_row, kind) => {
                        debug_assert!(down_row > row, "derived edge {row}->{down_row} points up");
                        GraphEdge {
                            up: row,
                            down: Some(down_row),
                            target: None,
                            kind,
                        }
                    }
                    DownTarget::NotLoaded(node_id) => GraphEdge::not_loaded(row, node_id),
                };
                match edges
                    .iter_mut()
                    .find(|existing| existing.down == edge.down && existing.target == edge.target)
                {
                    Some(existing) => {
                        if edge.kind == EdgeKind::Usual {
                            existing.kind = EdgeKind::Usual;
                        }
                    }
                    None => edges.push(edge),
                }
            }
            down.push(edges);
        }

        for row_edges in &down {
            for edge in row_edges {
                if let Some(down_row) = edge.down {
                    up[down_row].push(*edge);
                }
            }
        }

        Self {
            inner_rows,
            row_by_inner,
            down,
            up,
        }
    }

    /// Keep the inner rows marked `visible`, in inner order. Edges between
    /// visible rows are kept with their kind and not-loaded edges of visible
    /// rows are kept. An edge into a hidden row `h` becomes dotted edges to
    /// `bridges[h]` (inner rows, all visible).
    pub(crate) fn project(
        inner: &GraphController,
        visible: &[bool],
        bridges: &[Vec<usize>],
    ) -> Self {
        let inner_count = inner.node_count();
        let inner_rows: Vec<usize> = (0..inner_count).filter(|&row| visible[row]).collect();

        let mut own_row = vec![usize::MAX; inner_count];
        for (row, &inner_row) in inner_rows.iter().enumerate() {
            own_row[inner_row] = row;
        }

        let targets = inner_rows
            .iter()
            .map(|&inner_row| {
                let mut row_targets = Vec::new();
                for edge in inner.edges(inner_row, Direction::Down) {
                    match (edge.down, edge.target) {
                        (Some(down), _) if visible[down] => {
                            row_targets.push(DownTarget::Row(own_row[down], edge.kind));
                        }
                        (Some(down), _) => {
                            row_targets.extend(bridges[down].iter().map(|&bridge| {
                                DownTarget::Row(own_row[bridge], EdgeKind::Dotted)
                            }));
                        }
                        (None, Some(node_id)) => row_targets.push(DownTarget::NotLoaded(node_id)),
                        (None, None) => {}
                    }
                }
                row_targets
            })
            .collect();

        Self::new(inner_rows, inner_count, targets)
    }

    /// Every inner row and edge, unchanged.
    pub(crate) fn identity(inner: &GraphController) -> Self {
        let visible = vec![true; inner.node_count()];
        Self::project(inner, &visible, &[])
    }

    pub(crate) fn node_count(&self) -> usize {
        self.inner_rows.len()
    }

    pub(crate) fn row_of_inner(&self, inner_row: usize) -> Option<usize> {
        self.row_by_inner.get(inner_row).copied().flatten()
    }

    pub(crate) fn edges(&self, row: usize, direction: Direction) -> Vec<GraphEdge> {
        match direction {
            Direction::Down => self.down[row].clone(),
            Direction::Up => self.up[row].clone(),
        }
    }

    /// Node id at `row`, resolved through `inner`.
    pub(crate) fn node_id(&self, inner: &GraphController, row: usize) -> NodeId {
        inner.node_id(self.inner_rows[row])
    }

    /// Row of `node_id`, resolved through `inner`.
    pub(crate) fn row_of(&self, inner: &GraphController, node_id: NodeId) -> Option<usize> {
        inner
            .row_of(node_id)
            .and_then(|inner_row| self.row_of_inner(inner_row))
    }
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use pretty_assertions::assert_eq as pa_eq;

    #[test]
    fn derived_graph_prefers_usual_over_dotted_duplicates() {
        let derived = DerivedGraph::new(
            vec![0, 1, 2],
            3,
            vec![
                vec![
                    DownTarget::Row(2, EdgeKind::Dotted),
                    DownTarget::Row(2, EdgeKind::Usual),
                    DownTarget::Row(1, EdgeKind::Usual),
                    DownTarget::Row(1, EdgeKind::Usual),
                ],
                vec![DownTarget::NotLoaded(-2), DownTarget::NotLoaded(-2)],
                vec![],
            ],
        );
        pa_eq!(
            derived.edges(0, Direction::Down),
            vec![GraphEdge::usual(0, 2), GraphEdge::usual(0, 1)]
        );
        pa_eq!(derived.edges(1, Direction::Down), vec![GraphEdge::not_loaded(1, -2)]);
        pa_eq!(derived.edges(2, Direction::Up), vec![GraphEdge::usual(0, 2)]);
    }

    #[test]
    fn identity_projection_mirrors_the_inner_layer() {
        let inner = base(&[("c", &["b", "gone"]), ("b", &["a"]), ("a", &[])]);
        let derived = DerivedGraph::identity(&inner);
        pa_eq!(derived.node_count(), 3);
        for row in 0..3 {
            pa_eq!(derived.inner_rows[row], row);
            pa_eq!(
                derived.edges(row, Direction::Down),
                inner.edges(row, Direction::Down)
            );
            pa_eq!(derived.edges(row, Direction::Up), inner.edges(row, Direction::Up));
        }
    }

    #[test]
    fn projection_bridges_hidden_rows() {
        // c -> b -> a, b hidden and bridged to a.
        let inner = base(&[("c", &["b"]), ("b", &["a"]), ("a", &[])]);
        let derived =
            DerivedGraph::project(&inner, &[true, false, true], &[vec![], vec![2], vec![]]);
        pa_eq!(derived.node_count(), 2);
        pa_eq!(derived.edges(0, Direction::Down), vec![GraphEdge::dotted(0, 1)]);
        pa_eq!(derived.row_of_inner(1), None);
        pa_eq!(derived.row_of(&inner, 2), Some(1));
        pa_eq!(derived.node_id(&inner, 1), 2);
    }

    #[test]
    fn layer_names_walk_to_the_base() {
        let inner = base(&[("a", &[])]);
        let filtered = GraphController::BranchFilter(BranchFilterController::new(
            inner,
            &[0].into_iter().collect(),
        ));
        pa_eq!(filtered.layers(), vec!["branch-filter", "base"]);
        pa_eq!(filtered.node_count(), 1);
    }
}
