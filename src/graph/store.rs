//! Immutable linear graph store.
//!
//! One node per loaded commit, in input order. Parent references that are
//! not part of the input become not-loaded placeholder ids handed out by a
//! [`NotLoadedIdsGenerator`]. Adjacency lives in compact CSR arrays: one
//! offset table and one flat target array per direction.
//!
//! Node indices never move, but the Normal display order does: when the
//! input lists a parent before one of its children, the store keeps a
//! stable topological permutation so every child is shown above its parents.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use tracing::{debug, warn};

use crate::error::{GraphError, Result};
use crate::types::{not_loaded_id, not_loaded_slot, CommitId, GraphCommit, NodeId};

// ---------------------------------------------------------------------------
// NotLoadedIdsGenerator
// ---------------------------------------------------------------------------

/// Hands out placeholder ids for commits that are referenced but not loaded.
///
/// The first distinct commit gets `-2`, the next `-3`, and so on. Asking
/// again for a commit already seen returns its existing id.
#[derive(Debug)]
pub struct NotLoadedIdsGenerator<C> {
    ids: HashMap<C, NodeId>,
    commits: Vec<C>,
}

impl<C: CommitId> Default for NotLoadedIdsGenerator<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: CommitId> NotLoadedIdsGenerator<C> {
    pub fn new() -> Self {
        Self {
            ids: HashMap::new(),
            commits: Vec::new(),
        }
    }

    /// Placeholder id for `commit`, allocating one on first request.
    pub fn id_for(&mut self, commit: &C) -> NodeId {
        if let Some(&id) = self.ids.get(commit) {
            return id;
        }
        let id = not_loaded_id(self.commits.len());
        self.ids.insert(commit.clone(), id);
        self.commits.push(commit.clone());
        id
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    /// The not-loaded commits, indexed by placeholder slot (`-2` is slot 0).
    pub fn into_not_loaded(self) -> Vec<C> {
        self.commits
    }
}

// ---------------------------------------------------------------------------
// PermanentLinearGraph
// ---------------------------------------------------------------------------

/// The immutable commit DAG over integer node indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermanentLinearGraph {
    down_offsets: Vec<u32>,
    down_targets: Vec<NodeId>,
    up_offsets: Vec<u32>,
    up_sources: Vec<u32>,
    /// Children of each placeholder, indexed by placeholder slot.
    not_loaded_up: Vec<Vec<u32>>,
    /// Normal row of each node. Empty when input order is already
    /// topological.
    normal_rows: Vec<u32>,
    /// Node shown at each Normal row. Empty like `normal_rows`.
    normal_nodes: Vec<u32>,
}

impl PermanentLinearGraph {
    /// Build the graph from commits in input order.
    ///
    /// Parents missing from `commits` are resolved through `ids`. Rejects
    /// duplicate commit ids, commits that list themselves as a parent and
    /// parent cycles.
    pub fn build<C: CommitId>(
        commits: &[GraphCommit<C>],
        ids: &mut NotLoadedIdsGenerator<C>,
    ) -> Result<Self> {
        let node_count = commits.len();
        if node_count > NodeId::MAX as usize {
            return Err(GraphError::MalformedInput(format!(
                "{node_count} commits exceed the addressable node range"
            )));
        }

        let mut index: HashMap<&C, usize> = HashMap::with_capacity(node_count);
        for (node, commit) in commits.iter().enumerate() {
            if index.insert(&commit.id, node).is_some() {
                return Err(GraphError::MalformedInput(format!(
                    "commit {:?} appears more than once",
                    commit.id
                )));
            }
        }

        let mut down_offsets = Vec::with_capacity(node_count + 1);
        let mut down_targets = Vec::new();
        let mut up_counts = vec![0u32; node_count];
        let mut parents_before_children = 0usize;

        down_offsets.push(0);
        for (node, commit) in commits.iter().enumerate() {
            for parent in &commit.parents {
                if *parent == commit.id {
                    return Err(GraphError::MalformedInput(format!(
                        "commit {:?} lists itself as a parent",
                        commit.id
                    )));
                }
                let target = match index.get(parent) {
                    Some(&parent_node) => {
                        if parent_node < node {
                            parents_before_children += 1;
                        }
                        up_counts[parent_node] += 1;
                        parent_node as NodeId
                    }
                    None => ids.id_for(parent),
                };
                down_targets.push(target);
            }
            down_offsets.push(down_targets.len() as u32);
        }

        // Without a parent listed before its child every edge points to a
        // larger index, so input order is already topological and acyclic.
        let normal_nodes = if parents_before_children > 0 {
            warn!(
                parents_before_children,
                "commit list is not topologically sorted; reordering rows for display"
            );
            stable_topological_order(&down_offsets, &down_targets, up_counts.clone())
                .ok_or_else(|| {
                    GraphError::MalformedInput("parent references form a cycle".to_string())
                })?
        } else {
            Vec::new()
        };
        let mut normal_rows = vec![0u32; normal_nodes.len()];
        for (row, &node) in normal_nodes.iter().enumerate() {
            normal_rows[node as usize] = row as u32;
        }

        let mut up_offsets = Vec::with_capacity(node_count + 1);
        up_offsets.push(0u32);
        for count in &up_counts {
            let last = up_offsets[up_offsets.len() - 1];
            up_offsets.push(last + count);
        }

        let mut fill = up_offsets[..node_count].to_vec();
        let mut up_sources = vec![0u32; down_targets.len()];
        let mut not_loaded_up: Vec<Vec<u32>> = vec![Vec::new(); ids.len()];
        for child in 0..node_count {
            let start = down_offsets[child] as usize;
            let end = down_offsets[child + 1] as usize;
            for &target in &down_targets[start..end] {
                if let Some(slot) = not_loaded_slot(target) {
                    not_loaded_up[slot].push(child as u32);
                } else {
                    let parent = target as usize;
                    up_sources[fill[parent] as usize] = child as u32;
                    fill[parent] += 1;
                }
            }
        }
        let loaded_edges = up_offsets[node_count] as usize;
        up_sources.truncate(loaded_edges);

        debug!(
            nodes = node_count,
            edges = down_targets.len(),
            not_loaded = ids.len(),
            "built linear graph"
        );

        Ok(Self {
            down_offsets,
            down_targets,
            up_offsets,
            up_sources,
            not_loaded_up,
            normal_rows,
            normal_nodes,
        })
    }

    /// Number of loaded nodes.
    pub fn node_count(&self) -> usize {
        self.down_offsets.len() - 1
    }

    /// Total number of parent references, including not-loaded ones.
    pub fn edge_count(&self) -> usize {
        self.down_targets.len()
    }

    /// Row of `node` in Normal order.
    pub fn normal_row(&self, node: usize) -> usize {
        self.normal_rows.get(node).map_or(node, |&row| row as usize)
    }

    /// Node shown at Normal `row`.
    pub fn normal_node(&self, row: usize) -> usize {
        self.normal_nodes.get(row).map_or(row, |&node| node as usize)
    }

    /// Whether `node_id` is a loaded node of this graph.
    pub fn is_loaded_node(&self, node_id: NodeId) -> bool {
        node_id >= 0 && (node_id as usize) < self.node_count()
    }

    /// All parents of `node` in parent order, placeholders included.
    pub fn down_nodes_including_not_loaded(&self, node: usize) -> &[NodeId] {
        let start = self.down_offsets[node] as usize;
        let end = self.down_offsets[node + 1] as usize;
        &self.down_targets[start..end]
    }

    /// Loaded parents of `node` in parent order. Placeholders are dead ends.
    pub fn down_nodes(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        self.down_nodes_including_not_loaded(node)
            .iter()
            .filter(|&&target| target >= 0)
            .map(|&target| target as usize)
    }

    /// Children of `node_id`, which may also be a placeholder id.
    ///
    /// Unknown ids have no children.
    pub fn up_nodes(&self, node_id: NodeId) -> impl Iterator<Item = usize> + '_ {
        let sources: &[u32] = if self.is_loaded_node(node_id) {
            let node = node_id as usize;
            let start = self.up_offsets[node] as usize;
            let end = self.up_offsets[node + 1] as usize;
            &self.up_sources[start..end]
        } else {
            not_loaded_slot(node_id)
                .and_then(|slot| self.not_loaded_up.get(slot))
                .map(Vec::as_slice)
                .unwrap_or(&[])
        };
        sources.iter().map(|&source| source as usize)
    }
}

/// Kahn emission that always picks the lowest ready input index, so nodes
/// keep their input order wherever the edges allow it. `None` on a cycle.
fn stable_topological_order(
    down_offsets: &[u32],
    down_targets: &[NodeId],
    mut remaining_up: Vec<u32>,
) -> Option<Vec<u32>> {
    let node_count = remaining_up.len();
    let mut ready: BinaryHeap<Reverse<usize>> = (0..node_count)
        .filter(|&node| remaining_up[node] == 0)
        .map(Reverse)
        .collect();
    let mut order = Vec::with_capacity(node_count);

    while let Some(Reverse(node)) = ready.pop() {
        order.push(node as u32);
        let start = down_offsets[node] as usize;
        let end = down_offsets[node + 1] as usize;
        for &target in &down_targets[start..end] {
            if target < 0 {
                continue;
            }
            let parent = target as usize;
            remaining_up[parent] -= 1;
            if remaining_up[parent] == 0 {
                ready.push(Reverse(parent));
            }
        }
    }

    (order.len() == node_count).then_some(order)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
