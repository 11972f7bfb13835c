//! Linear Bek layer: straightens simple merge bubbles of the Bek order.
//!
//! For a merge `M(P1, P2)` whose second-parent chain `P2 .. T` is a plain
//! line ending at a fork base `B`, and whose first-parent path `P1 .. B` is
//! a plain line as well, the layer shows `M, P2 .. T, P1 .. B` as one line:
//! the edge `M -> P1` is hidden, `T -> B` becomes a dotted `T -> P1` (unless
//! `P1` is `B` itself), and the chain rows are moved directly under `M`.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::{DerivedGraph, DownTarget, GraphController, LinearGraphView};
use crate::types::{Direction, EdgeKind, GraphEdge, NodeId};

/// One straightened bubble, in inner rows.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Bubble {
    merge: usize,
    first_parent: usize,
    chain: Vec<usize>,
    base: usize,
}

#[derive(Debug)]
pub struct LinearBekController {
    inner: Box<GraphController>,
    derived: DerivedGraph,
}

impl LinearBekController {
    /// `max_block_size` bounds both sides of a bubble.
    pub fn new(inner: GraphController, max_block_size: usize) -> Self {
        let bubbles = find_bubbles(&inner, max_block_size);
        let derived = straighten(&inner, &bubbles);
        debug!(
            rows = inner.node_count(),
            bubbles = bubbles.len(),
            "straightened merge bubbles"
        );
        Self {
            inner: Box::new(inner),
            derived,
        }
    }

    pub fn inner(&self) -> &GraphController {
        &self.inner
    }
}

impl LinearGraphView for LinearBekController {
    fn node_count(&self) -> usize {
        self.derived.node_count()
    }

    fn node_id(&self, row: usize) -> NodeId {
        self.derived.node_id(&self.inner, row)
    }

    fn row_of(&self, node_id: NodeId) -> Option<usize> {
        self.derived.row_of(&self.inner, node_id)
    }

    fn edges(&self, row: usize, direction: Direction) -> Vec<GraphEdge> {
        self.derived.edges(row, direction)
    }
}

// ---------------------------------------------------------------------------
// Bubble detection
// ---------------------------------------------------------------------------

/// The single usual parent of `row`, if that is its only down edge.
fn single_parent(inner: &GraphController, row: usize) -> Option<usize> {
    match inner.edges(row, Direction::Down).as_slice() {
        [edge] if edge.kind == EdgeKind::Usual => edge.down,
        _ => None,
    }
}

fn up_count(inner: &GraphController, row: usize) -> usize {
    inner.edges(row, Direction::Up).len()
}

fn find_bubbles(inner: &GraphController, max_block_size: usize) -> Vec<Bubble> {
    let mut used = vec![false; inner.node_count()];
    let mut bubbles = Vec::new();

    for merge in 0..inner.node_count() {
        if used[merge] {
            continue;
        }
        let Some(bubble) = bubble_at(inner, merge, &used, max_block_size) else {
            continue;
        };
        used[merge] = true;
        for &row in &bubble.chain {
            used[row] = true;
        }
        let mut row = bubble.first_parent;
        while row != bubble.base {
            used[row] = true;
            match single_parent(inner, row) {
                Some(next) => row = next,
                None => break,
            }
        }
        bubbles.push(bubble);
    }

    bubbles
}

fn bubble_at(
    inner: &GraphController,
    merge: usize,
    used: &[bool],
    max_block_size: usize,
) -> Option<Bubble> {
    let (first_parent, second_parent) = match inner.edges(merge, Direction::Down).as_slice() {
        [p1, p2] if p1.kind == EdgeKind::Usual && p2.kind == EdgeKind::Usual => {
            (p1.down?, p2.down?)
        }
        _ => return None,
    };
    if first_parent == second_parent {
        return None;
    }

    // Second-parent chain: plain rows down to the first row with several
    // children.
    let mut chain = Vec::new();
    let mut row = second_parent;
    let base = loop {
        if used[row] || up_count(inner, row) != 1 || chain.len() >= max_block_size {
            return None;
        }
        chain.push(row);
        let next = single_parent(inner, row)?;
        if up_count(inner, next) >= 2 {
            break next;
        }
        row = next;
    };
    if used[base] {
        return None;
    }

    // First-parent path: plain rows that reach the same base.
    let mut row = first_parent;
    let mut steps = 0;
    while row != base {
        if used[row] || up_count(inner, row) != 1 || steps >= max_block_size {
            return None;
        }
        row = single_parent(inner, row)?;
        steps += 1;
    }

    Some(Bubble {
        merge,
        first_parent,
        chain,
        base,
    })
}

// ---------------------------------------------------------------------------
// Rewriting
// ---------------------------------------------------------------------------

fn straighten(inner: &GraphController, bubbles: &[Bubble]) -> DerivedGraph {
    let inner_count = inner.node_count();
    if bubbles.is_empty() {
        return DerivedGraph::identity(inner);
    }

    let moved: HashSet<usize> = bubbles.iter().flat_map(|b| b.chain.iter().copied()).collect();
    let chain_of: HashMap<usize, &Bubble> = bubbles.iter().map(|b| (b.merge, b)).collect();
    let mut hidden: HashSet<(usize, usize)> = HashSet::new();
    let mut redirected: HashMap<(usize, usize), usize> = HashMap::new();
    for bubble in bubbles {
        hidden.insert((bubble.merge, bubble.first_parent));
        if bubble.first_parent != bubble.base {
            if let Some(&tail) = bubble.chain.last() {
                redirected.insert((tail, bubble.base), bubble.first_parent);
            }
        }
    }

    let mut inner_rows = Vec::with_capacity(inner_count);
    for row in 0..inner_count {
        if moved.contains(&row) {
            continue;
        }
        inner_rows.push(row);
        if let Some(bubble) = chain_of.get(&row) {
            inner_rows.extend_from_slice(&bubble.chain);
        }
    }

    let mut own_row = vec![0usize; inner_count];
    for (row, &inner_row) in inner_rows.iter().enumerate() {
        own_row[inner_row] = row;
    }

    let targets = inner_rows
        .iter()
        .map(|&up| {
            inner
                .edges(up, Direction::Down)
                .into_iter()
                .filter_map(|edge| match (edge.down, edge.target) {
                    (Some(down), _) if hidden.contains(&(up, down)) => None,
                    (Some(down), _) => Some(match redirected.get(&(up, down)) {
                        Some(&first_parent) => {
                            DownTarget::Row(own_row[first_parent], EdgeKind::Dotted)
                        }
                        None => DownTarget::Row(own_row[down], edge.kind),
                    }),
                    (None, Some(node_id)) => Some(DownTarget::NotLoaded(node_id)),
                    (None, None) => None,
                })
                .collect()
        })
        .collect();

    DerivedGraph::new(inner_rows, inner_count, targets)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
