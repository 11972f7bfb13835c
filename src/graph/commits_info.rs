//! Bidirectional commit id ↔ node id index with per-node timestamps.

use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::error::{GraphError, Result};
use crate::types::{not_loaded_id, not_loaded_slot, CommitId, GraphCommit, NodeId};

/// Immutable translation tables between caller commit ids and node ids.
///
/// Placeholder (not-loaded) commits are part of the index: they translate
/// both ways like loaded commits and report a timestamp of `0`.
#[derive(Debug)]
pub struct PermanentCommitsInfo<C> {
    commit_ids: Vec<C>,
    timestamps: Vec<i64>,
    not_loaded: Vec<C>,
    node_ids: HashMap<C, NodeId>,
}

impl<C: CommitId> PermanentCommitsInfo<C> {
    /// Index `commits` (node order) and the not-loaded commits (slot order).
    pub fn new(commits: &[GraphCommit<C>], not_loaded: Vec<C>) -> Self {
        let mut node_ids = HashMap::with_capacity(commits.len() + not_loaded.len());
        let mut commit_ids = Vec::with_capacity(commits.len());
        let mut timestamps = Vec::with_capacity(commits.len());

        for (node, commit) in commits.iter().enumerate() {
            node_ids.insert(commit.id.clone(), node as NodeId);
            commit_ids.push(commit.id.clone());
            timestamps.push(commit.timestamp);
        }
        for (slot, commit) in not_loaded.iter().enumerate() {
            node_ids.insert(commit.clone(), not_loaded_id(slot));
        }

        Self {
            commit_ids,
            timestamps,
            not_loaded,
            node_ids,
        }
    }

    /// Number of loaded commits.
    pub fn loaded_count(&self) -> usize {
        self.commit_ids.len()
    }

    /// Number of placeholder commits.
    pub fn not_loaded_count(&self) -> usize {
        self.not_loaded.len()
    }

    /// Commit id of a loaded node or placeholder.
    pub fn commit_id(&self, node_id: NodeId) -> Option<&C> {
        if node_id >= 0 {
            self.commit_ids.get(node_id as usize)
        } else {
            not_loaded_slot(node_id).and_then(|slot| self.not_loaded.get(slot))
        }
    }

    /// Timestamp of a node; placeholders and unknown ids report `0`.
    pub fn timestamp(&self, node_id: NodeId) -> i64 {
        if node_id >= 0 {
            self.timestamps.get(node_id as usize).copied().unwrap_or(0)
        } else {
            0
        }
    }

    pub fn try_node_id(&self, commit: &C) -> Option<NodeId> {
        self.node_ids.get(commit).copied()
    }

    /// Node id of `commit`, or [`GraphError::UnknownCommit`].
    pub fn node_id(&self, commit: &C) -> Result<NodeId> {
        self.try_node_id(commit)
            .ok_or_else(|| GraphError::unknown_commit(commit))
    }

    /// Translate commit ids to node ids, dropping the ones that do not
    /// resolve. With `report_not_found` the dropped ids are logged.
    pub fn convert_to_node_ids<'a>(
        &self,
        commits: impl IntoIterator<Item = &'a C>,
        report_not_found: bool,
    ) -> HashSet<NodeId>
    where
        C: 'a,
    {
        let mut result = HashSet::new();
        let mut not_found = Vec::new();
        for commit in commits {
            match self.try_node_id(commit) {
                Some(node_id) => {
                    result.insert(node_id);
                }
                None => not_found.push(commit),
            }
        }
        if report_not_found && !not_found.is_empty() {
            warn!(count = not_found.len(), commits = ?not_found, "commits not found in graph");
        }
        result
    }

    /// Translate node ids to commit ids in order, dropping unknown ids.
    pub fn convert_to_commit_ids(&self, node_ids: impl IntoIterator<Item = NodeId>) -> Vec<C> {
        node_ids
            .into_iter()
            .filter_map(|node_id| self.commit_id(node_id).cloned())
            .collect()
    }

    pub fn convert_to_commit_id_set(
        &self,
        node_ids: impl IntoIterator<Item = NodeId>,
    ) -> HashSet<C> {
        node_ids
            .into_iter()
            .filter_map(|node_id| self.commit_id(node_id).cloned())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
