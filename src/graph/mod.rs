//! Permanent graph layer: linear graph store, commit index, layout and
//! reachability. Everything here is built once and never mutated.

pub mod commits_info;
pub mod layout;
pub mod store;
pub mod traversal;

pub use commits_info::PermanentCommitsInfo;
pub use layout::GraphLayout;
pub use store::{NotLoadedIdsGenerator, PermanentLinearGraph};
pub use traversal::ReachableNodes;
