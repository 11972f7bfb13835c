//! commit-graph: an immutable commit DAG with composable views.
//!
//! Builds a compact, read-only representation of a version-control history
//! once and answers layout, branch containment and filtered/collapsed view
//! queries against it without rebuilding anything.

pub mod bek;
pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod facade;
pub mod graph;
pub mod observability;
pub mod types;
pub mod visible;

pub use config::GraphConfig;
pub use controller::{GraphController, LinearGraphView};
pub use error::{GraphError, Result};
pub use facade::{ContainedInBranchCondition, PermanentGraph, PermanentGraphInfo};
pub use types::{CommitId, Direction, EdgeKind, GraphCommit, GraphEdge, NodeId, SortType};
pub use visible::{DefaultColorManager, GraphColorManager, RowInfo, VisibleGraph};
