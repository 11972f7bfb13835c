//! Graph configuration (YAML / JSON via serde).

pub mod schema;

pub use schema::{CollapseConfig, GraphConfig, LinearBekConfig};
