//! Command-line front end.
//!
//! Commits are read from text, one per line: `<id> <timestamp> [<parent>...]`.
//! Blank lines and lines starting with `#` are ignored. Every command prints
//! JSON.

use std::collections::HashSet;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing::debug;

use crate::config::GraphConfig;
use crate::error::{GraphError, Result};
use crate::facade::PermanentGraph;
use crate::types::{Direction, GraphCommit, SortType};
use crate::visible::{DefaultColorManager, VisibleGraph};

#[derive(Parser, Debug)]
#[command(author, version, about = "Query a commit graph read from stdin", long_about = None)]
pub struct Args {
    /// Branch head commit (repeatable)
    #[arg(long = "head", global = true)]
    pub heads: Vec<String>,

    /// Inline YAML configuration
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print every commit with its parents
    List,
    /// Print the children of a commit
    Children { commit: String },
    /// Print the branch heads containing a commit
    Branches { commit: String },
    /// Check which commits are contained in a set of heads
    Contains {
        /// Head of the set (repeatable)
        #[arg(long = "head-set", required = true)]
        head_set: Vec<String>,
        /// Commits to check
        #[arg(required = true)]
        commits: Vec<String>,
    },
    /// Print the rows of a visible graph
    View {
        /// normal, bek or linear-bek (defaults to the configured sort)
        #[arg(long, value_parser = parse_sort)]
        sort: Option<SortType>,
        /// Restrict the view to the history of these heads (repeatable)
        #[arg(long = "visible-head")]
        visible_heads: Vec<String>,
        /// Show only these commits (repeatable)
        #[arg(long = "match")]
        matching: Vec<String>,
    },
}

fn parse_sort(s: &str) -> std::result::Result<SortType, String> {
    SortType::from_str_loose(s).ok_or_else(|| format!("unknown sort '{s}'"))
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Parse the line-oriented commit list.
pub fn parse_commits(input: &str) -> Result<Vec<GraphCommit<String>>> {
    let mut commits = Vec::new();
    for (index, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split_whitespace();
        let (Some(id), Some(timestamp)) = (fields.next(), fields.next()) else {
            return Err(GraphError::MalformedInput(format!(
                "line {}: expected '<id> <timestamp> [<parent>...]'",
                index + 1
            )));
        };
        let timestamp: i64 = timestamp.parse().map_err(|_| {
            GraphError::MalformedInput(format!(
                "line {}: timestamp '{timestamp}' is not an integer",
                index + 1
            ))
        })?;
        commits.push(GraphCommit::new(
            id.to_string(),
            fields.map(str::to_string).collect(),
            timestamp,
        ));
    }
    debug!(commits = commits.len(), "parsed commit list");
    Ok(commits)
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Run `args` against the commit list in `input`.
pub fn run(args: &Args, input: &str) -> Result<Value> {
    let config = match &args.config {
        Some(yaml) => GraphConfig::from_yaml_str(yaml)?,
        None => GraphConfig::default(),
    };
    let commits = parse_commits(input)?;
    let heads: HashSet<String> = args.heads.iter().cloned().collect();
    let graph =
        PermanentGraph::with_config(&commits, Arc::new(DefaultColorManager), &heads, config)?;

    match &args.command {
        Command::List => Ok(json!(graph.all_commits())),
        Command::Children { commit } => Ok(json!(graph.children(commit)?)),
        Command::Branches { commit } => Ok(json!(sorted(graph.containing_branches(commit)?))),
        Command::Contains { head_set, commits } => {
            let condition = graph.contained_in_branch_condition(head_set)?;
            let result: serde_json::Map<String, Value> = commits
                .iter()
                .map(|commit| (commit.clone(), Value::Bool(condition.contains(commit))))
                .collect();
            Ok(Value::Object(result))
        }
        Command::View {
            sort,
            visible_heads,
            matching,
        } => {
            let sort = sort.unwrap_or(graph.config().default_sort);
            let visible_heads: Option<HashSet<String>> =
                (!visible_heads.is_empty()).then(|| visible_heads.iter().cloned().collect());
            let matching: Option<HashSet<String>> =
                (!matching.is_empty()).then(|| matching.iter().cloned().collect());
            let view = graph.create_visible_graph(sort, visible_heads.as_ref(), matching.as_ref());
            Ok(view_to_json(&view))
        }
    }
}

fn sorted(set: HashSet<String>) -> Vec<String> {
    let mut items: Vec<String> = set.into_iter().collect();
    items.sort();
    items
}

fn view_to_json(view: &VisibleGraph<String>) -> Value {
    let rows: Vec<Value> = (0..view.visible_commit_count())
        .filter_map(|row| {
            let info = view.row_info(row)?;
            let edges: Vec<Value> = view
                .edges(row, Direction::Down)
                .into_iter()
                .map(|edge| match edge.down {
                    Some(down) => json!({ "row": down, "kind": edge.kind }),
                    None => json!({
                        "commit": edge.target.and_then(|id| view.commits_info().commit_id(id)),
                        "kind": edge.kind,
                    }),
                })
                .collect();
            Some(json!({
                "row": info.row,
                "commit": info.commit,
                "lane": info.layout_index,
                "head": info.head,
                "color": view.node_color(row),
                "down": edges,
            }))
        })
        .collect();
    json!({
        "sort": view.sort_type(),
        "layers": view.controller().layers(),
        "rows": rows,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
