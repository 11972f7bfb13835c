//! Core domain types shared by the store, the controllers and the facade.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

// ---------------------------------------------------------------------------
// Commit ids and node ids
// ---------------------------------------------------------------------------

/// Caller-supplied opaque commit identifier (a hash, an integer, ...).
///
/// Debug formatting is only used to report unknown commits.
pub trait CommitId: Clone + Eq + Hash + fmt::Debug {}

impl<T: Clone + Eq + Hash + fmt::Debug> CommitId for T {}

/// Internal identity of a node.
///
/// Loaded commits use dense non-negative indices in input order. Parents
/// that were never loaded get placeholder ids `-2, -3, ...`.
pub type NodeId = i32;

/// Sentinel for "no node".
pub const NO_NODE: NodeId = -1;

/// The first placeholder id handed out by the not-loaded id generator.
pub const FIRST_NOT_LOADED_ID: NodeId = -2;

/// Whether `node_id` denotes a not-loaded placeholder commit.
pub fn is_not_loaded(node_id: NodeId) -> bool {
    node_id <= FIRST_NOT_LOADED_ID
}

/// Position of a placeholder id in the not-loaded table.
pub(crate) fn not_loaded_slot(node_id: NodeId) -> Option<usize> {
    if is_not_loaded(node_id) {
        Some((FIRST_NOT_LOADED_ID - node_id) as usize)
    } else {
        None
    }
}

/// Placeholder id for a position in the not-loaded table.
pub(crate) fn not_loaded_id(slot: usize) -> NodeId {
    FIRST_NOT_LOADED_ID - slot as NodeId
}

// ---------------------------------------------------------------------------
// GraphCommit
// ---------------------------------------------------------------------------

/// One commit record: the unit of input and of [`all_commits`] output.
///
/// [`all_commits`]: crate::facade::PermanentGraph::all_commits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphCommit<C> {
    pub id: C,
    pub parents: Vec<C>,
    /// Ordering key, usually the commit time in seconds. Ties are allowed.
    pub timestamp: i64,
}

impl<C> GraphCommit<C> {
    pub fn new(id: C, parents: Vec<C>, timestamp: i64) -> Self {
        Self {
            id,
            parents,
            timestamp,
        }
    }
}

// ---------------------------------------------------------------------------
// SortType
// ---------------------------------------------------------------------------

/// Base ordering of a visible graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortType {
    /// Native input order.
    #[default]
    Normal,
    /// Rebase order: branches kept together, interleaved by time.
    Bek,
    /// Bek order with simple merge bubbles straightened into lines.
    LinearBek,
}

impl SortType {
    /// Parse from a string (case-insensitive, accepts `_` and `-` spellings).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "normal" => Some(Self::Normal),
            "bek" => Some(Self::Bek),
            "linear-bek" | "linearbek" => Some(Self::LinearBek),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Bek => "bek",
            Self::LinearBek => "linear-bek",
        }
    }
}

impl fmt::Display for SortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Edges
// ---------------------------------------------------------------------------

/// Which way to follow edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Toward parents.
    Down,
    /// Toward children.
    Up,
}

/// Kind of an edge in a controller layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeKind {
    /// A real parent edge.
    Usual,
    /// Stands for a path through hidden rows.
    Dotted,
    /// Points at a placeholder commit that was never loaded.
    NotLoaded,
}

/// An edge between two rows of a controller layer.
///
/// `down` is `None` only for [`EdgeKind::NotLoaded`] edges, whose target is
/// the placeholder id in `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct GraphEdge {
    pub up: usize,
    pub down: Option<usize>,
    pub target: Option<NodeId>,
    pub kind: EdgeKind,
}

impl GraphEdge {
    pub fn usual(up: usize, down: usize) -> Self {
        Self {
            up,
            down: Some(down),
            target: None,
            kind: EdgeKind::Usual,
        }
    }

    pub fn dotted(up: usize, down: usize) -> Self {
        Self {
            up,
            down: Some(down),
            target: None,
            kind: EdgeKind::Dotted,
        }
    }

    pub fn not_loaded(up: usize, target: NodeId) -> Self {
        Self {
            up,
            down: None,
            target: Some(target),
            kind: EdgeKind::NotLoaded,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
