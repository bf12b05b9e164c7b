//! `topo diff`: reconcile two snapshots in order and report the changes.

use std::path::Path;

use anyhow::Result;
use topograph_scene::{ReconcileReport, SceneSettings, TopologyView};

use super::load_snapshot;

/// Reconcile `before` then `after`; returns the report of the second pass.
pub fn diff_snapshots(settings: &SceneSettings, before: &Path, after: &Path) -> Result<ReconcileReport> {
    let before = load_snapshot(before)?;
    let after = load_snapshot(after)?;
    let mut view = TopologyView::new(settings.clone());
    view.on_model_updated(&before);
    Ok(view.on_model_updated(&after))
}

fn print_ids(marker: &str, title: &str, ids: &[String]) {
    if ids.is_empty() {
        return;
    }
    println!("{title} ({}):", ids.len());
    for id in ids {
        println!("   {marker} {id}");
    }
}

/// Execute the diff command.
pub fn execute(settings: &SceneSettings, before: &Path, after: &Path, json: bool) -> Result<()> {
    let report = diff_snapshots(settings, before, after)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if report.is_noop() {
        println!("No changes");
        return Ok(());
    }
    print_ids("+", "Added vertices", &report.added_vertices);
    print_ids("-", "Removed vertices", &report.removed_vertices);
    print_ids("~", "Updated vertices", &report.updated_vertices);
    print_ids("+", "Added edges", &report.added_edges);
    print_ids("-", "Removed edges", &report.removed_edges);
    print_ids("~", "Restyled edges", &report.restyled_edges);
    print_ids("!", "Skipped edges", &report.skipped_edges);
    Ok(())
}
