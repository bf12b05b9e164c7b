//! Display toggles and the snapshot view filter.

use std::collections::HashSet;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::model::{edge_types, layers, Edge, GraphModel, Layer, Severity, Vertex, VertexKind};

/// Toggles applied to every fetched snapshot before it reaches the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub show_inventory: bool,
    pub show_alarms: bool,
    pub show_situations: bool,
    pub show_labels: bool,
    /// Synthetic alarms generated per vertex (testing aid, 0 disables).
    pub alarms_per_vertex: usize,
    /// Synthetic situations grouping the synthetic alarms.
    pub situations: usize,
    /// Animate flow markers between random entities.
    pub flow_simulation: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            show_inventory: true,
            show_alarms: true,
            show_situations: true,
            show_labels: true,
            alarms_per_vertex: 0,
            situations: 0,
            flow_simulation: false,
        }
    }
}

impl DisplaySettings {
    /// Whether vertices of `layer_id` survive the filter.
    pub fn shows_layer(&self, layer_id: &str) -> bool {
        match layer_id {
            layers::INVENTORY => self.show_inventory,
            layers::ALARMS => self.show_alarms,
            layers::SITUATIONS => self.show_situations,
            _ => true,
        }
    }
}

/// Applies [`DisplaySettings`] to raw snapshots.
#[derive(Debug, Clone, Default)]
pub struct ModelView {
    pub settings: DisplaySettings,
}

impl ModelView {
    pub fn new(settings: DisplaySettings) -> Self {
        Self { settings }
    }

    /// Filter `raw` and append synthetic alarms/situations when requested.
    pub fn apply<R: Rng + ?Sized>(&self, raw: &GraphModel, rng: &mut R) -> GraphModel {
        let vertices: Vec<Vertex> = raw
            .vertices
            .iter()
            .filter(|v| self.settings.shows_layer(&v.layer_id))
            .cloned()
            .collect();
        let kept: HashSet<&str> = vertices.iter().map(|v| v.id.as_str()).collect();
        let edges: Vec<Edge> = raw
            .edges
            .iter()
            .filter(|e| kept.contains(e.source_id.as_str()) && kept.contains(e.target_id.as_str()))
            .cloned()
            .collect();
        let dropped = raw.edges.len() - edges.len();

        let mut model = GraphModel {
            vertices,
            edges,
            layers: raw.layers.clone(),
        };

        if dropped > 0 {
            tracing::debug!(dropped, "Dropped edges with filtered endpoints");
        }

        if self.settings.alarms_per_vertex > 0 && self.settings.show_alarms {
            self.add_synthetic(&mut model, rng);
        }

        model
    }

    fn add_synthetic<R: Rng + ?Sized>(&self, model: &mut GraphModel, rng: &mut R) {
        let mut alarms = Vec::new();
        let mut alarm_edges = Vec::new();

        let mut n = 1usize;
        for owner in &model.vertices {
            for _ in 0..self.settings.alarms_per_vertex {
                let alarm = Vertex::new(
                    format!("synalarm-vertex-{n}"),
                    format!("alarm #{n}"),
                    VertexKind::Alarm,
                    layers::ALARMS,
                )
                .with_attribute("severity", random_severity(rng).label());
                alarm_edges.push(Edge::new(
                    format!("synalarm-edge-{n}"),
                    edge_types::ALARM_TO_IO,
                    alarm.id.clone(),
                    owner.id.clone(),
                ));
                alarms.push(alarm);
                n += 1;
            }
        }

        let mut situations = Vec::new();
        let mut situation_edges = Vec::new();
        let requested = self.settings.situations;
        if requested > 0 && self.settings.show_situations && !alarms.is_empty() {
            let count = if requested > alarms.len() { 1 } else { requested };
            let per_situation = alarms.len() / count;

            let mut m = 0usize;
            for index in 0..count {
                let situation = Vertex::new(
                    format!("situation-vertex-{index}"),
                    format!("situation #{index}"),
                    VertexKind::Situation,
                    layers::SITUATIONS,
                )
                .with_attribute("severity", random_severity(rng).label());
                for _ in 0..per_situation {
                    situation_edges.push(Edge::new(
                        format!("situation-edge-{index}-{m}"),
                        edge_types::SITUATION_TO_ALARM,
                        situation.id.clone(),
                        alarms[m].id.clone(),
                    ));
                    m += 1;
                }
                situations.push(situation);
            }
        }

        tracing::debug!(
            alarms = alarms.len(),
            situations = situations.len(),
            "Added synthetic entities"
        );

        model.vertices.extend(alarms);
        model.edges.extend(alarm_edges);
        model.vertices.extend(situations);
        model.edges.extend(situation_edges);

        if !model.has_layer(layers::ALARMS) {
            model.layers.push(Layer::new(layers::ALARMS, "Alarms", 1));
        }
        if !model.has_layer(layers::SITUATIONS) {
            model.layers.push(Layer::new(layers::SITUATIONS, "Situations", 2));
        }
    }
}

fn random_severity<R: Rng + ?Sized>(rng: &mut R) -> Severity {
    Severity::ALL[rng.gen_range(0..Severity::ALL.len())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn raw() -> GraphModel {
        GraphModel {
            vertices: vec![
                Vertex::new("d1", "d1", VertexKind::InventoryDevice, layers::INVENTORY),
                Vertex::new("d2", "d2", VertexKind::InventoryDevice, layers::INVENTORY),
                Vertex::new("a1", "a1", VertexKind::Alarm, layers::ALARMS),
            ],
            edges: vec![
                Edge::new("p", edge_types::PARENT, "d2", "d1"),
                Edge::new("x", edge_types::ALARM_TO_IO, "a1", "d1"),
            ],
            layers: vec![Layer::new(layers::INVENTORY, "Inventory", 0)],
        }
    }

    #[test]
    fn test_hidden_layer_drops_vertices_and_edges() {
        let view = ModelView::new(DisplaySettings {
            show_alarms: false,
            ..Default::default()
        });
        let model = view.apply(&raw(), &mut StdRng::seed_from_u64(1));
        assert_eq!(model.vertices.len(), 2);
        assert_eq!(model.edges.len(), 1);
        assert_eq!(model.edges[0].id, "p");
    }

    #[test]
    fn test_synthetic_alarms_and_situations() {
        let view = ModelView::new(DisplaySettings {
            show_alarms: false,
            alarms_per_vertex: 0,
            ..Default::default()
        });
        let untouched = view.apply(&raw(), &mut StdRng::seed_from_u64(1));
        assert!(!untouched.has_layer(layers::ALARMS));

        let view = ModelView::new(DisplaySettings {
            alarms_per_vertex: 2,
            situations: 2,
            ..Default::default()
        });
        let model = view.apply(&raw(), &mut StdRng::seed_from_u64(7));
        // 3 original vertices, 2 alarms each, 2 situations.
        assert_eq!(model.vertices.len(), 3 + 6 + 2);
        assert_eq!(model.edges_of_type(edge_types::ALARM_TO_IO).count(), 1 + 6);
        assert_eq!(model.edges_of_type(edge_types::SITUATION_TO_ALARM).count(), 6);
        assert!(model.vertex("synalarm-vertex-6").unwrap().severity().is_some());
        assert!(model.has_layer(layers::ALARMS));
        assert!(model.has_layer(layers::SITUATIONS));
    }

    #[test]
    fn test_more_situations_than_alarms_collapses_to_one() {
        let view = ModelView::new(DisplaySettings {
            alarms_per_vertex: 1,
            situations: 10,
            ..Default::default()
        });
        let model = view.apply(&raw(), &mut StdRng::seed_from_u64(3));
        assert_eq!(model.vertices_in_layer(layers::SITUATIONS).count(), 1);
        assert_eq!(model.edges_of_type(edge_types::SITUATION_TO_ALARM).count(), 3);
    }
}
