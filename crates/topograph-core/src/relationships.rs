//! Relationship tables derived from a snapshot.
//!
//! The placement engine never walks raw edges. It consumes these groupings:
//! device hierarchy (parent → children), peers, alarms per device and
//! situations per alarm cluster.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::model::{edge_types, layers, Edge, GraphModel, Severity, Vertex};

/// A parent device and its direct children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub parent_id: String,
    pub parent: Vertex,
    pub show: bool,
    pub sources: Vec<Vertex>,
}

/// Alarms raised on one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmConnection {
    pub parent_id: String,
    pub show: bool,
    pub alarms: Vec<Vertex>,
}

/// A situation and the alarms (and through them, devices) it correlates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SituationConnection {
    pub situation_id: String,
    pub situation: Vertex,
    pub show: bool,
    pub alarms: Vec<Vertex>,
    /// Devices owning at least one grouped alarm, in first-appearance order.
    pub device_ids: Vec<String>,
}

/// All relationship tables for one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Relationships {
    pub parents: Vec<Connection>,
    pub peers: Vec<Connection>,
    pub alarms: Vec<AlarmConnection>,
    pub situations: Vec<SituationConnection>,
}

/// Group edges by a key while keeping first-appearance order of the keys.
fn group_ordered<'a>(
    edges: impl Iterator<Item = &'a Edge>,
    key: impl Fn(&Edge) -> &str,
) -> Vec<(String, Vec<&'a Edge>)> {
    let mut order: Vec<(String, Vec<&'a Edge>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for edge in edges {
        let k = key(edge);
        match index.get(k) {
            Some(&i) => order[i].1.push(edge),
            None => {
                index.insert(k.to_string(), order.len());
                order.push((k.to_string(), vec![edge]));
            }
        }
    }
    order
}

impl Relationships {
    /// Derive every table from a (view-filtered) snapshot.
    pub fn build(model: &GraphModel) -> Self {
        let inventory: HashMap<&str, &Vertex> = model
            .vertices_in_layer(layers::INVENTORY)
            .map(|v| (v.id.as_str(), v))
            .collect();
        let alarm_vertices: HashMap<&str, &Vertex> = model
            .vertices_in_layer(layers::ALARMS)
            .map(|v| (v.id.as_str(), v))
            .collect();

        let mut mentioned: HashSet<&str> = HashSet::new();

        let mut peers = Vec::new();
        for (source_id, edges) in group_ordered(model.edges_of_type(edge_types::PEER), |e| {
            e.source_id.as_str()
        }) {
            let mut sources = Vec::new();
            for edge in edges {
                if let Some(&peer) = inventory.get(edge.target_id.as_str()) {
                    mentioned.insert(peer.id.as_str());
                    sources.push(peer.clone());
                }
            }
            if let Some(&parent) = inventory.get(source_id.as_str()) {
                mentioned.insert(parent.id.as_str());
                peers.push(Connection {
                    parent_id: source_id,
                    parent: parent.clone(),
                    show: true,
                    sources,
                });
            }
        }

        let mut parents = Vec::new();
        for (target_id, edges) in group_ordered(model.edges_of_type(edge_types::PARENT), |e| {
            e.target_id.as_str()
        }) {
            let mut sources = Vec::new();
            for edge in edges {
                if let Some(&child) = inventory.get(edge.source_id.as_str()) {
                    mentioned.insert(child.id.as_str());
                    sources.push(child.clone());
                }
            }
            if let Some(&parent) = inventory.get(target_id.as_str()) {
                mentioned.insert(parent.id.as_str());
                parents.push(Connection {
                    parent_id: target_id,
                    parent: parent.clone(),
                    show: true,
                    sources,
                });
            }
        }

        for vertex in model.vertices_in_layer(layers::INVENTORY) {
            if !mentioned.contains(vertex.id.as_str()) {
                parents.push(Connection {
                    parent_id: vertex.id.clone(),
                    parent: vertex.clone(),
                    show: true,
                    sources: Vec::new(),
                });
            }
        }

        let alarms: Vec<AlarmConnection> =
            group_ordered(model.edges_of_type(edge_types::ALARM_TO_IO), |e| {
                e.target_id.as_str()
            })
            .into_iter()
            .map(|(device_id, edges)| AlarmConnection {
                parent_id: device_id,
                show: true,
                alarms: edges
                    .iter()
                    .filter_map(|e| alarm_vertices.get(e.source_id.as_str()))
                    .map(|v| (*v).clone())
                    .collect(),
            })
            .collect();

        let mut situations = Vec::new();
        for (situation_id, edges) in
            group_ordered(model.edges_of_type(edge_types::SITUATION_TO_ALARM), |e| {
                e.source_id.as_str()
            })
        {
            let Some(situation) = model
                .vertices_in_layer(layers::SITUATIONS)
                .find(|v| v.id == situation_id)
            else {
                tracing::debug!(situation_id, "situation vertex missing, group skipped");
                continue;
            };

            let grouped: Vec<Vertex> = edges
                .iter()
                .filter_map(|e| alarm_vertices.get(e.target_id.as_str()))
                .map(|v| (*v).clone())
                .collect();

            let mut device_ids: Vec<String> = Vec::new();
            for alarm in &grouped {
                for owner in &alarms {
                    if owner.alarms.iter().any(|a| a.id == alarm.id)
                        && !device_ids.contains(&owner.parent_id)
                    {
                        device_ids.push(owner.parent_id.clone());
                    }
                }
            }

            situations.push(SituationConnection {
                situation_id,
                situation: situation.clone(),
                show: true,
                alarms: grouped,
                device_ids,
            });
        }

        tracing::debug!(
            parents = parents.len(),
            peers = peers.len(),
            alarm_groups = alarms.len(),
            situations = situations.len(),
            "Built relationship tables"
        );

        Self {
            parents,
            peers,
            alarms,
            situations,
        }
    }

    /// Ids of devices that appear as a child in some parent group.
    pub fn child_ids(&self) -> Vec<&str> {
        self.parents
            .iter()
            .flat_map(|c| c.sources.iter().map(|v| v.id.as_str()))
            .collect()
    }

    /// Group whose parent is `device_id`.
    pub fn parent_group(&self, device_id: &str) -> Option<&Connection> {
        self.parents.iter().find(|c| c.parent_id == device_id)
    }

    /// Id of the device that lists `device_id` among its children.
    pub fn parent_of(&self, device_id: &str) -> Option<&str> {
        self.parents
            .iter()
            .find(|c| c.sources.iter().any(|v| v.id == device_id))
            .map(|c| c.parent_id.as_str())
    }

    /// Alarm group raised on `device_id`.
    pub fn alarms_of(&self, device_id: &str) -> Option<&AlarmConnection> {
        self.alarms.iter().find(|a| a.parent_id == device_id)
    }

    /// Device owning `alarm_id`.
    pub fn device_of_alarm(&self, alarm_id: &str) -> Option<&str> {
        self.alarms
            .iter()
            .find(|g| g.alarms.iter().any(|a| a.id == alarm_id))
            .map(|g| g.parent_id.as_str())
    }

    /// Flip visibility of a device group and of every situation touching the
    /// device or one of its children.
    pub fn toggle_visibility(&mut self, device_id: &str) {
        let Some(group) = self.parents.iter_mut().find(|c| c.parent_id == device_id) else {
            return;
        };
        group.show = !group.show;

        let mut touched: Vec<String> = vec![device_id.to_string()];
        touched.extend(group.sources.iter().map(|v| v.id.clone()));

        for id in &touched {
            for situation in &mut self.situations {
                if situation.device_ids.contains(id) {
                    situation.show = !situation.show;
                }
            }
        }
    }
}

/// Severity filter map with every severity present in `vertices` enabled.
pub fn severity_filters<'a>(vertices: impl IntoIterator<Item = &'a Vertex>) -> BTreeMap<Severity, bool> {
    vertices
        .into_iter()
        .filter_map(Vertex::severity)
        .map(|s| (s, true))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Edge, VertexKind};

    fn device(id: &str) -> Vertex {
        Vertex::new(id, id, VertexKind::InventoryDevice, layers::INVENTORY)
    }

    fn alarm(id: &str, severity: &str) -> Vertex {
        Vertex::new(id, id, VertexKind::Alarm, layers::ALARMS).with_attribute("severity", severity)
    }

    fn sample() -> GraphModel {
        GraphModel {
            vertices: vec![
                device("core"),
                device("edge-1"),
                device("edge-2"),
                device("lonely"),
                alarm("a1", "major"),
                alarm("a2", "minor"),
                alarm("a3", "major"),
                Vertex::new("s1", "s1", VertexKind::Situation, layers::SITUATIONS),
            ],
            edges: vec![
                Edge::new("p1", edge_types::PARENT, "edge-1", "core"),
                Edge::new("p2", edge_types::PARENT, "edge-2", "core"),
                Edge::new("p3", edge_types::PARENT, "ghost", "core"),
                Edge::new("i1", edge_types::ALARM_TO_IO, "a1", "edge-1"),
                Edge::new("i2", edge_types::ALARM_TO_IO, "a2", "edge-1"),
                Edge::new("i3", edge_types::ALARM_TO_IO, "a3", "core"),
                Edge::new("s-a1", edge_types::SITUATION_TO_ALARM, "s1", "a1"),
                Edge::new("s-a3", edge_types::SITUATION_TO_ALARM, "s1", "a3"),
                Edge::new("s-x", edge_types::SITUATION_TO_ALARM, "missing", "a2"),
            ],
            layers: vec![],
        }
    }

    #[test]
    fn test_parent_groups() {
        let rel = Relationships::build(&sample());
        assert_eq!(rel.parents.len(), 2);
        let core = rel.parent_group("core").unwrap();
        let ids: Vec<_> = core.sources.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["edge-1", "edge-2"]);
        // Isolated device becomes its own group.
        assert!(rel.parent_group("lonely").unwrap().sources.is_empty());
        assert_eq!(rel.parent_of("edge-2"), Some("core"));
    }

    #[test]
    fn test_alarm_and_situation_groups() {
        let rel = Relationships::build(&sample());
        assert_eq!(rel.alarms_of("edge-1").unwrap().alarms.len(), 2);
        assert_eq!(rel.device_of_alarm("a3"), Some("core"));

        assert_eq!(rel.situations.len(), 1);
        let s1 = &rel.situations[0];
        assert_eq!(s1.alarms.len(), 2);
        assert_eq!(s1.device_ids, vec!["edge-1".to_string(), "core".to_string()]);
    }

    #[test]
    fn test_toggle_visibility_cascades_to_situations() {
        let mut rel = Relationships::build(&sample());
        rel.toggle_visibility("lonely");
        assert!(!rel.parent_group("lonely").unwrap().show);
        assert!(rel.situations[0].show);

        let mut rel = Relationships::build(&sample());
        rel.toggle_visibility("edge-2");
        // edge-2 is a child, not a group parent.
        assert!(rel.situations[0].show);

        // core and its child edge-1 both touch s1: two flips cancel out.
        rel.toggle_visibility("core");
        assert!(!rel.parent_group("core").unwrap().show);
        assert!(rel.situations[0].show);
    }

    #[test]
    fn test_severity_filters() {
        let model = sample();
        let filters = severity_filters(model.vertices_in_layer(layers::ALARMS));
        assert_eq!(filters.len(), 2);
        assert_eq!(filters.get(&Severity::Major), Some(&true));
    }

    #[test]
    fn test_wide_hierarchy_keeps_only_unlinked_devices_isolated() {
        let mut model = GraphModel::default();
        model.vertices.push(device("hub"));
        for i in 0..200 {
            let id = format!("leaf-{i}");
            model.vertices.push(device(&id));
            model.edges.push(Edge::new(format!("p{i}"), edge_types::PARENT, &id, "hub"));
            if i % 2 == 0 {
                model.edges.push(Edge::new(format!("r{i}"), edge_types::PEER, "hub", &id));
            }
        }
        model.vertices.push(device("spare-1"));
        model.vertices.push(device("spare-2"));

        let rel = Relationships::build(&model);
        let ids: Vec<_> = rel.parents.iter().map(|c| c.parent_id.as_str()).collect();
        assert_eq!(ids, vec!["hub", "spare-1", "spare-2"]);
        assert_eq!(rel.parent_group("hub").unwrap().sources.len(), 200);
    }
}
