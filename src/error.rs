//! Error taxonomy for commit graph construction and queries.

use thiserror::Error;

/// Errors surfaced by graph construction, lookups and configuration parsing.
///
/// Build-time variants abort construction entirely; query-time variants are
/// local to the failing call and never touch the shared immutable structures.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A commit id with no node in the graph.
    #[error("unknown commit: {0}")]
    UnknownCommit(String),

    /// The commit list cannot be turned into a graph.
    #[error("malformed commit list: {0}")]
    MalformedInput(String),

    /// Internal structures disagree with each other.
    #[error("graph invariant violated: {0}")]
    InvariantViolation(String),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_yaml::Error),
}

impl GraphError {
    /// Build an [`GraphError::UnknownCommit`] from any debuggable commit id.
    pub fn unknown_commit(commit: &impl std::fmt::Debug) -> Self {
        Self::UnknownCommit(format!("{commit:?}"))
    }
}

pub type Result<T> = std::result::Result<T, GraphError>;
