//! CLI command implementations.

pub mod config;
pub mod diff;
pub mod layout;
pub mod seek;
pub mod watch;

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use petgraph::unionfind::UnionFind;
use petgraph::visit::{EdgeRef, IntoEdgeReferences, IntoNodeReferences, NodeIndexable};
use topograph_core::GraphModel;
use topograph_scene::TopologyView;

/// Simulated frame length when driving the tick loop offline.
pub const FRAME_MS: f64 = 1000.0 / 60.0;

/// Read and decode a snapshot file.
pub fn load_snapshot(path: &Path) -> Result<GraphModel> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
    GraphModel::from_json(&contents)
        .with_context(|| format!("Failed to parse snapshot {}", path.display()))
}

/// Number of weakly connected components in a snapshot.
pub fn component_count(model: &GraphModel) -> usize {
    let (graph, _) = model.to_petgraph();
    let mut sets = UnionFind::new(NodeIndexable::node_bound(&graph));
    for edge in IntoEdgeReferences::edge_references(&graph) {
        sets.union(edge.source().index(), edge.target().index());
    }
    IntoNodeReferences::node_references(&graph)
        .map(|(index, _)| sets.find(index.index()))
        .collect::<HashSet<_>>()
        .len()
}

/// Tick the view until its force simulation settles or `max_ticks` pass.
/// Returns the ticks run.
pub fn settle(view: &mut TopologyView, max_ticks: u32) -> u32 {
    let mut ticks = 0;
    while view.context().simulation().is_running() && ticks < max_ticks {
        ticks += 1;
        view.tick(f64::from(ticks) * FRAME_MS);
    }
    ticks
}
