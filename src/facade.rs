//! Public entry point: the permanent commit graph.
//!
//! [`PermanentGraph`] owns the immutable store, commit index and layout
//! (shared through `Arc`), answers history queries directly against them,
//! and composes controller chains into [`VisibleGraph`]s on demand. The Bek
//! order is computed on first use and cached for the lifetime of the graph.

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use tracing::{debug, info};

use crate::bek::{create_bek_map, BekIntMap};
use crate::config::GraphConfig;
use crate::controller::{
    BaseController, BranchFilterController, CollapsedController, FilteredController,
    GraphController, LinearBekController,
};
use crate::error::{GraphError, Result};
use crate::graph::commits_info::PermanentCommitsInfo;
use crate::graph::layout::GraphLayout;
use crate::graph::store::{NotLoadedIdsGenerator, PermanentLinearGraph};
use crate::graph::traversal::ReachableNodes;
use crate::types::{CommitId, GraphCommit, NodeId, SortType};
use crate::visible::{GraphColorManager, VisibleGraph};

// ---------------------------------------------------------------------------
// PermanentGraphInfo
// ---------------------------------------------------------------------------

/// Read access to the permanent structures, handed to view preprocessors.
pub trait PermanentGraphInfo<C> {
    fn commits_info(&self) -> &PermanentCommitsInfo<C>;
    fn linear_graph(&self) -> &PermanentLinearGraph;
    fn layout(&self) -> &GraphLayout;
    fn branch_node_ids(&self) -> &HashSet<NodeId>;
}

// ---------------------------------------------------------------------------
// ContainedInBranchCondition
// ---------------------------------------------------------------------------

/// "Is this commit contained in one of these heads?", computed once with a
/// single walk and reusable for any number of lookups.
#[derive(Debug, Clone)]
pub struct ContainedInBranchCondition<C> {
    commits_info: Arc<PermanentCommitsInfo<C>>,
    contained: HashSet<NodeId>,
}

impl<C: CommitId> ContainedInBranchCondition<C> {
    /// Unknown commits are never contained.
    pub fn contains(&self, commit: &C) -> bool {
        self.commits_info
            .try_node_id(commit)
            .is_some_and(|node_id| self.contained.contains(&node_id))
    }

    pub fn len(&self) -> usize {
        self.contained.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contained.is_empty()
    }
}

// ---------------------------------------------------------------------------
// PermanentGraph
// ---------------------------------------------------------------------------

pub struct PermanentGraph<C> {
    linear_graph: Arc<PermanentLinearGraph>,
    layout: Arc<GraphLayout>,
    commits_info: Arc<PermanentCommitsInfo<C>>,
    branch_node_ids: Arc<HashSet<NodeId>>,
    color_manager: Arc<dyn GraphColorManager<C>>,
    config: GraphConfig,
    bek_map: OnceLock<Arc<BekIntMap>>,
    #[cfg(test)]
    bek_builds: std::sync::atomic::AtomicUsize,
}

impl<C: CommitId> PermanentGraph<C> {
    /// Build the graph with the default configuration.
    pub fn new(
        commits: &[GraphCommit<C>],
        color_manager: Arc<dyn GraphColorManager<C>>,
        branch_heads: &HashSet<C>,
    ) -> Result<Self> {
        Self::with_config(commits, color_manager, branch_heads, GraphConfig::default())
    }

    /// Build the graph. `commits` are in display order (children before
    /// parents). Branch heads that are not in `commits` get placeholder
    /// nodes.
    pub fn with_config(
        commits: &[GraphCommit<C>],
        color_manager: Arc<dyn GraphColorManager<C>>,
        branch_heads: &HashSet<C>,
        config: GraphConfig,
    ) -> Result<Self> {
        let mut ids = NotLoadedIdsGenerator::new();
        let linear_graph = PermanentLinearGraph::build(commits, &mut ids)?;

        let loaded: HashSet<&C> = commits.iter().map(|commit| &commit.id).collect();
        for head in branch_heads {
            if !loaded.contains(head) {
                ids.id_for(head);
            }
        }

        let commits_info = PermanentCommitsInfo::new(commits, ids.into_not_loaded());
        if commits_info.loaded_count() != linear_graph.node_count() {
            return Err(GraphError::InvariantViolation(format!(
                "commit index has {} nodes, linear graph has {}",
                commits_info.loaded_count(),
                linear_graph.node_count()
            )));
        }

        let branch_node_ids = commits_info.convert_to_node_ids(branch_heads, true);
        let layout = GraphLayout::build(&linear_graph, |a, b| {
            match (
                commits_info.commit_id(a as NodeId),
                commits_info.commit_id(b as NodeId),
            ) {
                (Some(head1), Some(head2)) => color_manager.compare_heads(head1, head2),
                _ => a.cmp(&b),
            }
        });

        info!(
            commits = linear_graph.node_count(),
            edges = linear_graph.edge_count(),
            not_loaded = commits_info.not_loaded_count(),
            branches = branch_node_ids.len(),
            heads = layout.head_nodes().len(),
            "built permanent commit graph"
        );

        Ok(Self {
            linear_graph: Arc::new(linear_graph),
            layout: Arc::new(layout),
            commits_info: Arc::new(commits_info),
            branch_node_ids: Arc::new(branch_node_ids),
            color_manager,
            config,
            bek_map: OnceLock::new(),
            #[cfg(test)]
            bek_builds: std::sync::atomic::AtomicUsize::new(0),
        })
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn color_manager(&self) -> &Arc<dyn GraphColorManager<C>> {
        &self.color_manager
    }

    // -- history queries ----------------------------------------------------

    /// Every loaded commit in input order, with not-loaded parents reported
    /// by their original ids.
    pub fn all_commits(&self) -> Vec<GraphCommit<C>> {
        (0..self.linear_graph.node_count())
            .filter_map(|node| {
                let node_id = node as NodeId;
                let id = self.commits_info.commit_id(node_id)?.clone();
                let parents = self.commits_info.convert_to_commit_ids(
                    self.linear_graph
                        .down_nodes_including_not_loaded(node)
                        .iter()
                        .copied(),
                );
                Some(GraphCommit::new(id, parents, self.commits_info.timestamp(node_id)))
            })
            .collect()
    }

    /// Loaded children of `commit`. Works for placeholder commits too.
    pub fn children(&self, commit: &C) -> Result<Vec<C>> {
        let node_id = self.commits_info.node_id(commit)?;
        Ok(self.commits_info.convert_to_commit_ids(
            self.linear_graph
                .up_nodes(node_id)
                .map(|child| child as NodeId),
        ))
    }

    /// Branch heads that contain `commit` (including `commit` itself when it
    /// is a branch head).
    pub fn containing_branches(&self, commit: &C) -> Result<HashSet<C>> {
        let node_id = self.commits_info.node_id(commit)?;
        let branches = ReachableNodes::new(&self.linear_graph)
            .containing_branches(node_id, &self.branch_node_ids);
        Ok(self.commits_info.convert_to_commit_id_set(branches))
    }

    /// Predicate over "ancestor of (or equal to) one of `heads`".
    pub fn contained_in_branch_condition<'a>(
        &self,
        heads: impl IntoIterator<Item = &'a C>,
    ) -> Result<ContainedInBranchCondition<C>>
    where
        C: 'a,
    {
        let head_ids = heads
            .into_iter()
            .map(|head| self.commits_info.node_id(head))
            .collect::<Result<Vec<_>>>()?;
        let mut contained =
            ReachableNodes::new(&self.linear_graph).reachable_from(head_ids.iter().copied());
        contained.extend(head_ids);
        debug!(contained = contained.len(), "built branch condition");
        Ok(ContainedInBranchCondition {
            commits_info: Arc::clone(&self.commits_info),
            contained,
        })
    }

    // -- views ----------------------------------------------------------------

    /// The Bek order, computed on first request.
    pub fn bek_map(&self) -> Arc<BekIntMap> {
        let map = self.bek_map.get_or_init(|| {
            #[cfg(test)]
            self.bek_builds
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            let commits_info = &self.commits_info;
            Arc::new(create_bek_map(&self.linear_graph, &self.layout, |node| {
                commits_info.timestamp(node as NodeId)
            }))
        });
        Arc::clone(map)
    }

    /// Compose a visible graph.
    ///
    /// With `matching_commits` the view shows only those commits (further
    /// restricted to `visible_heads` when given). Otherwise `visible_heads`
    /// restricts the view to their history, which is collapsed except under
    /// [`SortType::LinearBek`]. Unknown commit ids are logged and dropped.
    pub fn create_visible_graph(
        &self,
        sort: SortType,
        visible_heads: Option<&HashSet<C>>,
        matching_commits: Option<&HashSet<C>>,
    ) -> VisibleGraph<C> {
        self.create_visible_graph_with(sort, visible_heads, matching_commits, |_, _| {})
    }

    /// [`create_visible_graph`](Self::create_visible_graph) with a hook that
    /// may adjust the composed chain before the view is finalized.
    pub fn create_visible_graph_with(
        &self,
        sort: SortType,
        visible_heads: Option<&HashSet<C>>,
        matching_commits: Option<&HashSet<C>>,
        preprocessor: impl FnOnce(&mut GraphController, &dyn PermanentGraphInfo<C>),
    ) -> VisibleGraph<C> {
        let reachable = visible_heads.map(|heads| {
            let head_ids = self.commits_info.convert_to_node_ids(heads, true);
            ReachableNodes::new(&self.linear_graph).reachable_from(head_ids)
        });

        let base = self.base_controller(sort);
        let mut controller = match (matching_commits, reachable) {
            (Some(matching), reachable) => {
                let matching_ids = self.commits_info.convert_to_node_ids(matching, true);
                let filtered =
                    GraphController::CommitFilter(FilteredController::new(base, &matching_ids));
                match reachable {
                    Some(reachable) => GraphController::BranchFilter(
                        BranchFilterController::new(filtered, &reachable),
                    ),
                    None => filtered,
                }
            }
            (None, Some(reachable)) if sort == SortType::LinearBek => {
                GraphController::BranchFilter(BranchFilterController::new(base, &reachable))
            }
            (None, None) if sort == SortType::LinearBek => base,
            (None, Some(reachable)) => {
                let restricted =
                    GraphController::BranchFilter(BranchFilterController::new(base, &reachable));
                let mut collapsed = CollapsedController::new(
                    restricted,
                    Arc::clone(&self.branch_node_ids),
                    self.config.collapse.min_run_length,
                );
                collapsed.collapse_all();
                GraphController::Collapsed(collapsed)
            }
            (None, None) => GraphController::Collapsed(CollapsedController::new(
                base,
                Arc::clone(&self.branch_node_ids),
                self.config.collapse.min_run_length,
            )),
        };

        preprocessor(&mut controller, self);

        debug!(
            sort = %sort,
            layers = ?controller.layers(),
            "composed visible graph"
        );

        VisibleGraph::new(
            controller,
            Arc::clone(&self.commits_info),
            Arc::clone(&self.layout),
            Arc::clone(&self.color_manager),
            sort,
        )
    }

    fn base_controller(&self, sort: SortType) -> GraphController {
        let graph = Arc::clone(&self.linear_graph);
        match sort {
            SortType::Normal => GraphController::Base(BaseController::normal(graph)),
            SortType::Bek => GraphController::Base(BaseController::bek(graph, self.bek_map())),
            SortType::LinearBek => {
                let bek = GraphController::Base(BaseController::bek(graph, self.bek_map()));
                GraphController::LinearBek(LinearBekController::new(
                    bek,
                    self.config.linear_bek.max_block_size,
                ))
            }
        }
    }
}

impl<C: CommitId> PermanentGraphInfo<C> for PermanentGraph<C> {
    fn commits_info(&self) -> &PermanentCommitsInfo<C> {
        &self.commits_info
    }

    fn linear_graph(&self) -> &PermanentLinearGraph {
        &self.linear_graph
    }

    fn layout(&self) -> &GraphLayout {
        &self.layout
    }

    fn branch_node_ids(&self) -> &HashSet<NodeId> {
        &self.branch_node_ids
    }
}

impl<C> std::fmt::Debug for PermanentGraph<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermanentGraph")
            .field("nodes", &self.linear_graph.node_count())
            .field("branches", &self.branch_node_ids.len())
            .field("bek_cached", &self.bek_map.get().is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::LinearGraphView;
    use crate::visible::DefaultColorManager;
    use pretty_assertions::assert_eq as pa_eq;
    use std::sync::atomic::Ordering;

    fn graph(
        commits: &[(&'static str, &[&'static str], i64)],
        heads: &[&'static str],
    ) -> PermanentGraph<&'static str> {
        let commits: Vec<_> = commits
            .iter()
            .map(|(id, parents, ts)| GraphCommit::new(*id, parents.to_vec(), *ts))
            .collect();
        PermanentGraph::new(
            &commits,
            Arc::new(DefaultColorManager),
            &heads.iter().copied().collect(),
        )
        .unwrap()
    }

    /// `D(B, C)`, `B(A)`, `C(A)`, `A`, plus an unrelated root `E`.
    fn diamond() -> PermanentGraph<&'static str> {
        graph(
            &[
                ("D", &["B", "C"], 4),
                ("B", &["A"], 3),
                ("C", &["A"], 2),
                ("A", &[], 1),
                ("E", &[], 0),
            ],
            &["D"],
        )
    }

    fn set(ids: &[&'static str]) -> HashSet<&'static str> {
        ids.iter().copied().collect()
    }

    #[test]
    fn children_and_containing_branches() {
        let g = diamond();
        pa_eq!(set(&g.children(&"A").unwrap()), set(&["B", "C"]));
        pa_eq!(g.containing_branches(&"B").unwrap(), set(&["D"]));
        pa_eq!(g.containing_branches(&"D").unwrap(), set(&["D"]));
        assert!(g.containing_branches(&"E").unwrap().is_empty());
    }

    #[test]
    fn branch_condition_accepts_history_of_the_heads() {
        let g = diamond();
        let condition = g.contained_in_branch_condition(&["D"]).unwrap();
        for commit in ["A", "B", "C", "D"] {
            assert!(condition.contains(&commit), "{commit} should be contained");
        }
        assert!(!condition.contains(&"E"));
        assert!(!condition.contains(&"nope"));
        pa_eq!(condition.len(), 4);
    }

    #[test]
    fn unknown_commits_are_errors() {
        let g = diamond();
        assert!(matches!(g.children(&"X"), Err(GraphError::UnknownCommit(_))));
        assert!(matches!(
            g.containing_branches(&"X"),
            Err(GraphError::UnknownCommit(_))
        ));
        assert!(matches!(
            g.contained_in_branch_condition(&["D", "X"]),
            Err(GraphError::UnknownCommit(_))
        ));
    }

    #[test]
    fn all_commits_maps_placeholders_back() {
        let g = graph(&[("B", &["A", "gone"], 2), ("A", &["gone"], 1)], &[]);
        pa_eq!(
            g.all_commits(),
            vec![
                GraphCommit::new("B", vec!["A", "gone"], 2),
                GraphCommit::new("A", vec!["gone"], 1),
            ]
        );
        pa_eq!(g.children(&"gone").unwrap(), vec!["B", "A"]);
    }

    #[test]
    fn missing_branch_head_gets_a_placeholder() {
        let g = graph(&[("A", &[], 1)], &["A", "ghost"]);
        pa_eq!(g.containing_branches(&"ghost").unwrap(), set(&["ghost"]));
        pa_eq!(g.children(&"ghost").unwrap(), Vec::<&str>::new());
        pa_eq!(g.branch_node_ids().len(), 2);
        pa_eq!(g.all_commits().len(), 1);
    }

    #[test]
    fn malformed_input_is_rejected() {
        let commits = vec![GraphCommit::new("A", vec![], 1), GraphCommit::new("A", vec![], 2)];
        let err = PermanentGraph::new(&commits, Arc::new(DefaultColorManager), &HashSet::new())
            .unwrap_err();
        assert!(matches!(err, GraphError::MalformedInput(_)));
    }

    // -- composition ------------------------------------------------------------

    #[test]
    fn commit_filter_with_heads_never_collapses() {
        let g = diamond();
        let v = g.create_visible_graph(SortType::Normal, Some(&set(&["B"])), Some(&set(&["B", "A", "E"])));
        pa_eq!(v.controller().layers(), vec!["branch-filter", "commit-filter", "base"]);
        pa_eq!(v.commits(), vec!["B", "A"]);
    }

    #[test]
    fn linear_bek_with_heads_only_restricts() {
        let g = diamond();
        let v = g.create_visible_graph(SortType::LinearBek, Some(&set(&["B"])), None);
        pa_eq!(v.controller().layers(), vec!["branch-filter", "linear-bek", "base"]);
        pa_eq!(v.commits(), vec!["B", "A"]);

        let v = g.create_visible_graph(SortType::LinearBek, None, None);
        pa_eq!(v.controller().layers(), vec!["linear-bek", "base"]);
        pa_eq!(v.visible_commit_count(), 5);
    }

    #[test]
    fn heads_under_normal_sort_restrict_and_collapse() {
        // h -> x -> y -> z -> r, with h the only head.
        let g = graph(
            &[
                ("h", &["x"], 5),
                ("x", &["y"], 4),
                ("y", &["z"], 3),
                ("z", &["r"], 2),
                ("r", &[], 1),
                ("other", &[], 0),
            ],
            &["h"],
        );
        let v = g.create_visible_graph(SortType::Normal, Some(&set(&["h"])), None);
        pa_eq!(v.controller().layers(), vec!["collapsed", "branch-filter", "base"]);
        pa_eq!(v.commits(), vec!["h", "r"]);
        pa_eq!(v.edges(0, crate::types::Direction::Down).len(), 1);
    }

    #[test]
    fn no_heads_starts_expanded_and_preprocessor_can_collapse() {
        let g = diamond();
        let v = g.create_visible_graph(SortType::Bek, None, None);
        pa_eq!(v.controller().layers(), vec!["collapsed", "base"]);
        pa_eq!(v.visible_commit_count(), 5);

        let v = g.create_visible_graph_with(SortType::Normal, None, None, |controller, info| {
            pa_eq!(info.branch_node_ids().len(), 1);
            if let Some(collapsed) = controller.as_collapsed_mut() {
                collapsed.collapse_all();
            }
        });
        // B and C are plain commits between D and A.
        pa_eq!(v.commits(), vec!["D", "A", "E"]);
    }

    #[test]
    fn unknown_visible_heads_and_matches_are_dropped() {
        let g = diamond();
        let v = g.create_visible_graph(SortType::Normal, None, Some(&set(&["A", "nope"])));
        pa_eq!(v.commits(), vec!["A"]);
        let v = g.create_visible_graph(SortType::LinearBek, Some(&set(&["nope"])), None);
        pa_eq!(v.visible_commit_count(), 0);
    }

    #[test]
    fn identical_arguments_give_identical_views() {
        let g = diamond();
        let heads = set(&["D"]);
        let first = g.create_visible_graph(SortType::Bek, Some(&heads), None);
        let second = g.create_visible_graph(SortType::Bek, Some(&heads), None);
        pa_eq!(first.commits(), second.commits());
        for row in 0..first.visible_commit_count() {
            pa_eq!(
                first.controller().edges(row, crate::types::Direction::Down),
                second.controller().edges(row, crate::types::Direction::Down)
            );
        }
    }

    // -- bek memoization --------------------------------------------------------

    #[test]
    fn bek_map_is_computed_once_under_concurrent_access() {
        let g = diamond();
        let maps: Vec<Arc<BekIntMap>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8).map(|_| scope.spawn(|| g.bek_map())).collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for map in &maps {
            assert!(Arc::ptr_eq(map, &maps[0]));
        }
        pa_eq!(g.bek_builds.load(Ordering::SeqCst), 1);

        g.create_visible_graph(SortType::LinearBek, None, None);
        pa_eq!(g.bek_builds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn normal_views_never_build_the_bek_map() {
        let g = diamond();
        g.create_visible_graph(SortType::Normal, Some(&set(&["D"])), None);
        pa_eq!(g.bek_builds.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn graph_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PermanentGraph<String>>();
    }
}
