//! `topo layout`: place a snapshot file and print entity positions.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use topograph_scene::{LayoutMode, SceneSettings, TopologyView};

use super::{component_count, load_snapshot, settle};

#[derive(Debug, Serialize)]
struct LayoutSummary {
    mode: &'static str,
    entities: usize,
    connectors: usize,
    skipped_edges: usize,
    fallback_placements: usize,
    components: usize,
    ticks: u32,
    settled: bool,
}

/// Execute the layout command.
pub fn execute(
    settings: &SceneSettings,
    path: &Path,
    max_ticks: u32,
    output: Option<PathBuf>,
) -> Result<()> {
    let model = load_snapshot(path)?;
    let mut view = TopologyView::new(settings.clone());
    let report = view.on_model_updated(&model);

    let ticks = match settings.layout_mode {
        LayoutMode::Force => settle(&mut view, max_ticks),
        LayoutMode::Placement => 0,
    };
    let ctx = view.context();
    if ctx.simulation().is_running() {
        tracing::warn!(ticks, "force layout did not settle within the tick budget");
    }

    let positions: BTreeMap<String, [f32; 3]> = ctx.registry().positions();
    let json = serde_json::to_string_pretty(&positions)?;
    match &output {
        Some(file) => std::fs::write(file, &json)
            .with_context(|| format!("Failed to write {}", file.display()))?,
        None => println!("{json}"),
    }

    let summary = LayoutSummary {
        mode: settings.layout_mode.label(),
        entities: positions.len(),
        connectors: ctx.connectors().count(),
        skipped_edges: report.skipped_edges.len(),
        fallback_placements: report.fallback_placements.len(),
        components: component_count(&model),
        ticks,
        settled: settings.layout_mode == LayoutMode::Placement || ctx.simulation().is_settled(),
    };
    tracing::info!(?summary, "layout finished");

    eprintln!("📐 Layout ({})", summary.mode);
    eprintln!("   Entities:    {}", summary.entities);
    eprintln!("   Connectors:  {}", summary.connectors);
    eprintln!("   Components:  {}", summary.components);
    if summary.skipped_edges > 0 {
        eprintln!("   Skipped:     {} edges with missing endpoints", summary.skipped_edges);
    }
    if summary.fallback_placements > 0 {
        eprintln!("   Fallback:    {} entities", summary.fallback_placements);
    }
    if settings.layout_mode == LayoutMode::Force {
        eprintln!(
            "   Simulation:  {} ticks, {}",
            summary.ticks,
            if summary.settled { "settled" } else { "not settled" }
        );
    }
    if let Some(file) = output {
        eprintln!("💾 Positions written to {}", file.display());
    }

    Ok(())
}
