//! Replay a growing topology through a `TopologyView` and watch it reconcile.
//!
//! Run with: RUST_LOG=info cargo run -p topograph-scene --example replay

use topograph_core::{layers, Edge, GraphModel, Layer, Vertex, VertexKind};
use topograph_scene::{LayoutMode, SceneSettings, TopologyView};

const FRAME_MS: f64 = 1000.0 / 60.0;

/// A router with `switches` switches and one alarm on every other switch.
fn snapshot(switches: usize) -> GraphModel {
    let mut model = GraphModel {
        layers: vec![
            Layer::new(layers::INVENTORY, "Inventory", 0),
            Layer::new(layers::ALARMS, "Alarms", 1),
        ],
        ..GraphModel::default()
    };
    model.vertices.push(Vertex::new(
        "core",
        "core router",
        VertexKind::Node,
        layers::INVENTORY,
    ));
    for i in 0..switches {
        let id = format!("sw{i}");
        model.vertices.push(Vertex::new(&id, &id, VertexKind::Node, layers::INVENTORY));
        model.edges.push(Edge::new(format!("p{i}"), "parent", &id, "core"));
        if i % 2 == 0 {
            let alarm = format!("a{i}");
            model.vertices.push(
                Vertex::new(&alarm, "link down", VertexKind::Alarm, layers::ALARMS)
                    .with_attribute("severity", "major"),
            );
            model.edges.push(Edge::new(format!("x{i}"), "alarm-to-io", &alarm, &id));
        }
    }
    model
}

fn main() {
    tracing_subscriber::fmt::init();

    let mode = match std::env::args().nth(1).as_deref() {
        Some("force") => LayoutMode::Force,
        _ => LayoutMode::Placement,
    };
    let mut view = TopologyView::new(SceneSettings {
        layout_mode: mode,
        ..SceneSettings::default()
    });

    let mut now = 0.0;
    for switches in [4, 8, 6] {
        let report = view.on_model_updated(&snapshot(switches));
        println!(
            "{switches} switches: +{} -{} vertices, +{} -{} edges, {} restyled",
            report.added_vertices.len(),
            report.removed_vertices.len(),
            report.added_edges.len(),
            report.removed_edges.len(),
            report.restyled_edges.len(),
        );

        let mut frames = 0;
        while view.context().simulation().is_running() && frames < 2000 {
            now += FRAME_MS;
            view.tick(now);
            frames += 1;
        }
        if frames > 0 {
            println!("  settled after {frames} frames");
        }
    }

    for (id, [x, y, z]) in view.context().registry().positions() {
        println!("{id:>6}  ({x:8.2}, {y:6.2}, {z:8.2})");
    }
    println!("scene objects: {}", view.context().scene().len());
}
