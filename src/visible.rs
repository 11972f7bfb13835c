//! The read-only view handed to consumers.
//!
//! A [`VisibleGraph`] pairs a composed controller chain with the permanent
//! commit index, the layout and the color manager. It answers row-level
//! queries in terms of caller commit ids and never touches the shared
//! permanent structures.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use seahash::SeaHasher;
use serde::Serialize;

use crate::controller::{GraphController, LinearGraphView};
use crate::graph::commits_info::PermanentCommitsInfo;
use crate::graph::layout::GraphLayout;
use crate::types::{CommitId, Direction, GraphEdge, NodeId, SortType};

// ---------------------------------------------------------------------------
// Color manager
// ---------------------------------------------------------------------------

/// Decides head importance and colors of branches and their fragments.
pub trait GraphColorManager<C>: Send + Sync {
    /// `Less` when `head1` is more important (gets the lower lanes).
    ///
    /// Must be a consistent total order: the layout sorts heads with it,
    /// and sorting may panic on an inconsistent comparator.
    fn compare_heads(&self, head1: &C, head2: &C) -> Ordering;

    /// Color of the lane a head itself lives in.
    fn color_of_branch(&self, head: &C) -> u32;

    /// Color of another lane in the region owned by `head`.
    fn color_of_fragment(&self, head: &C, layout_index: u32) -> u32;
}

/// Treats all heads as equally important; colors come from a fixed-key
/// SeaHash of the commit id, so they stay the same across builds.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultColorManager;

impl DefaultColorManager {
    fn hash_of(value: impl Hash) -> u32 {
        let mut hasher = SeaHasher::new();
        value.hash(&mut hasher);
        hasher.finish() as u32
    }
}

impl<C: Hash> GraphColorManager<C> for DefaultColorManager {
    fn compare_heads(&self, _head1: &C, _head2: &C) -> Ordering {
        Ordering::Equal
    }

    fn color_of_branch(&self, head: &C) -> u32 {
        Self::hash_of(head)
    }

    fn color_of_fragment(&self, head: &C, layout_index: u32) -> u32 {
        Self::hash_of((head, layout_index))
    }
}

// ---------------------------------------------------------------------------
// VisibleGraph
// ---------------------------------------------------------------------------

/// Everything known about one visible row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowInfo<C> {
    pub row: usize,
    pub commit: C,
    pub node_id: NodeId,
    pub layout_index: u32,
    /// The head whose lane region contains this commit.
    pub head: C,
}

pub struct VisibleGraph<C> {
    controller: GraphController,
    commits_info: Arc<PermanentCommitsInfo<C>>,
    layout: Arc<GraphLayout>,
    color_manager: Arc<dyn GraphColorManager<C>>,
    sort: SortType,
}

impl<C: CommitId> VisibleGraph<C> {
    pub(crate) fn new(
        controller: GraphController,
        commits_info: Arc<PermanentCommitsInfo<C>>,
        layout: Arc<GraphLayout>,
        color_manager: Arc<dyn GraphColorManager<C>>,
        sort: SortType,
    ) -> Self {
        Self {
            controller,
            commits_info,
            layout,
            color_manager,
            sort,
        }
    }

    pub fn visible_commit_count(&self) -> usize {
        self.controller.node_count()
    }

    fn node_at(&self, row: usize) -> Option<NodeId> {
        (row < self.visible_commit_count()).then(|| self.controller.node_id(row))
    }

    pub fn commit_at(&self, row: usize) -> Option<&C> {
        self.node_at(row)
            .and_then(|node_id| self.commits_info.commit_id(node_id))
    }

    /// Commits of every visible row, top to bottom.
    pub fn commits(&self) -> Vec<C> {
        self.commits_info
            .convert_to_commit_ids((0..self.visible_commit_count()).map(|row| self.controller.node_id(row)))
    }

    pub fn row_info(&self, row: usize) -> Option<RowInfo<C>> {
        let node_id = self.node_at(row)?;
        let node = usize::try_from(node_id).ok()?;
        let head = self.layout.one_of_head_nodes(node) as NodeId;
        Some(RowInfo {
            row,
            commit: self.commits_info.commit_id(node_id)?.clone(),
            node_id,
            layout_index: self.layout.layout_index(node),
            head: self.commits_info.commit_id(head)?.clone(),
        })
    }

    /// Row showing `commit`, if it is visible.
    pub fn row_of(&self, commit: &C) -> Option<usize> {
        self.commits_info
            .try_node_id(commit)
            .and_then(|node_id| self.controller.row_of(node_id))
    }

    pub fn down_rows(&self, row: usize) -> Vec<usize> {
        if row >= self.visible_commit_count() {
            return Vec::new();
        }
        self.controller.down_rows(row)
    }

    pub fn up_rows(&self, row: usize) -> Vec<usize> {
        if row >= self.visible_commit_count() {
            return Vec::new();
        }
        self.controller.up_rows(row)
    }

    pub fn edges(&self, row: usize, direction: Direction) -> Vec<GraphEdge> {
        if row >= self.visible_commit_count() {
            return Vec::new();
        }
        self.controller.edges(row, direction)
    }

    /// Branch color when the row sits in its head's own lane, fragment color
    /// for the other lanes of that head's region.
    pub fn node_color(&self, row: usize) -> Option<u32> {
        let node = usize::try_from(self.node_at(row)?).ok()?;
        let head_position = self.layout.head_position_of(node);
        let head_node = *self.layout.head_nodes().get(head_position)?;
        let head = self.commits_info.commit_id(head_node as NodeId)?;
        let layout_index = self.layout.layout_index(node);
        if layout_index == self.layout.start_layout_index(head_position) {
            Some(self.color_manager.color_of_branch(head))
        } else {
            Some(self.color_manager.color_of_fragment(head, layout_index))
        }
    }

    pub fn sort_type(&self) -> SortType {
        self.sort
    }

    pub fn controller(&self) -> &GraphController {
        &self.controller
    }

    pub fn commits_info(&self) -> &PermanentCommitsInfo<C> {
        &self.commits_info
    }

    pub fn color_manager(&self) -> &dyn GraphColorManager<C> {
        self.color_manager.as_ref()
    }
}

impl<C> std::fmt::Debug for VisibleGraph<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisibleGraph")
            .field("sort", &self.sort)
            .field("layers", &self.controller.layers())
            .field("rows", &self.controller.node_count())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::BaseController;
    use crate::graph::store::{NotLoadedIdsGenerator, PermanentLinearGraph};
    use crate::types::GraphCommit;
    use pretty_assertions::assert_eq as pa_eq;

    /// Fixed colors so assertions do not depend on hashing.
    struct FixedColors;

    impl GraphColorManager<&'static str> for FixedColors {
        fn compare_heads(&self, a: &&'static str, b: &&'static str) -> Ordering {
            a.cmp(b)
        }
        fn color_of_branch(&self, _head: &&'static str) -> u32 {
            1
        }
        fn color_of_fragment(&self, _head: &&'static str, layout_index: u32) -> u32 {
            100 + layout_index
        }
    }

    fn visible() -> VisibleGraph<&'static str> {
        // d merges b and c over a.
        let commits = vec![
            GraphCommit::new("d", vec!["b", "c"], 4),
            GraphCommit::new("b", vec!["a"], 3),
            GraphCommit::new("c", vec!["a"], 2),
            GraphCommit::new("a", vec![], 1),
        ];
        let mut ids = NotLoadedIdsGenerator::new();
        let graph = Arc::new(PermanentLinearGraph::build(&commits, &mut ids).unwrap());
        let layout = Arc::new(GraphLayout::build(&graph, |a, b| a.cmp(&b)));
        let info = Arc::new(PermanentCommitsInfo::new(&commits, ids.into_not_loaded()));
        VisibleGraph::new(
            GraphController::Base(BaseController::normal(graph)),
            info,
            layout,
            Arc::new(FixedColors),
            SortType::Normal,
        )
    }

    #[test]
    fn rows_translate_to_commits() {
        let v = visible();
        pa_eq!(v.visible_commit_count(), 4);
        pa_eq!(v.commit_at(2), Some(&"c"));
        pa_eq!(v.commit_at(4), None);
        pa_eq!(v.row_of(&"b"), Some(1));
        pa_eq!(v.row_of(&"zz"), None);
        pa_eq!(v.commits(), vec!["d", "b", "c", "a"]);
    }

    #[test]
    fn adjacency_is_row_based() {
        let v = visible();
        pa_eq!(v.down_rows(0), vec![1, 2]);
        pa_eq!(v.up_rows(3), vec![1, 2]);
        pa_eq!(v.edges(3, Direction::Down), Vec::<GraphEdge>::new());
        pa_eq!(v.down_rows(9), Vec::<usize>::new());
    }

    #[test]
    fn row_info_reports_lane_and_head() {
        let v = visible();
        let info = v.row_info(2).unwrap();
        pa_eq!(info.commit, "c");
        pa_eq!(info.layout_index, 2);
        pa_eq!(info.head, "d");
        assert!(v.row_info(7).is_none());
    }

    #[test]
    fn head_lane_gets_branch_color_other_lanes_fragment_color() {
        let v = visible();
        pa_eq!(v.node_color(0), Some(1));
        pa_eq!(v.node_color(1), Some(1));
        pa_eq!(v.node_color(2), Some(102));
        pa_eq!(v.node_color(5), None);
    }

    #[test]
    fn default_color_manager_is_stable() {
        let manager = DefaultColorManager;
        pa_eq!(
            GraphColorManager::<&str>::color_of_branch(&manager, &"x"),
            GraphColorManager::<&str>::color_of_branch(&manager, &"x")
        );
        pa_eq!(
            GraphColorManager::<&str>::compare_heads(&manager, &"a", &"b"),
            Ordering::Equal
        );
    }

    #[test]
    fn default_colors_use_fixed_key_seahash() {
        let manager = DefaultColorManager;
        let mut hasher = SeaHasher::new();
        "x".hash(&mut hasher);
        pa_eq!(
            GraphColorManager::<&str>::color_of_branch(&manager, &"x"),
            hasher.finish() as u32
        );
        assert_ne!(
            GraphColorManager::<&str>::color_of_fragment(&manager, &"x", 1),
            GraphColorManager::<&str>::color_of_fragment(&manager, &"x", 2)
        );
    }
}
