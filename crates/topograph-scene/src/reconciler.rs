//! Incremental reconciliation of graph snapshots into the scene.
//!
//! [`reconcile`] diffs a snapshot against the [`SceneContext`], places new
//! entities, builds connectors for new edges and removes whatever the
//! snapshot no longer contains. The whole pass runs inside one call, so a
//! frame never observes a half-applied diff.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use serde::Serialize;
use topograph_core::{edge_types, layers, Edge, GraphModel, Relationships, Vertex};
use topograph_layout::placement::{
    alarm_position, child_position, grid_position, layer_height, phyllotaxis, situation_position,
};
use topograph_layout::{NodeInfo, NodeRegistry, PlacementConfig, PlacementStrategy, Vec3};

use crate::connectors::{self, connector_name, ConnectorParams, ConnectorStyle};
use crate::meshes::{self, EntityRole};
use crate::scene_graph::{EntityTag, ObjectId, SceneGraph, SceneObject};
use crate::settings::{LayoutMode, SceneSettings};
use crate::simulation::SimulationAdapter;

/// Where the reconciler is in its per-snapshot cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcilePhase {
    Idle,
    Diffing,
    Building,
    /// A force simulation is running (or has just settled).
    SimulatingOrSteady,
}

/// Bookkeeping for one rendered connector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectorRecord {
    #[serde(skip)]
    pub object: ObjectId,
    pub kind: String,
    pub source_id: String,
    pub target_id: String,
    /// Endpoint the builder starts from.
    pub origin_id: String,
    /// Endpoint the builder ends at.
    pub destination_id: String,
    pub style: ConnectorStyle,
    pub color: String,
}

impl ConnectorRecord {
    pub fn touches(&self, entity_id: &str) -> bool {
        self.source_id == entity_id || self.target_id == entity_id
    }
}

/// Outcome of one [`reconcile`] pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconcileReport {
    pub added_vertices: Vec<String>,
    /// Existing vertices whose colour or label changed in place.
    pub updated_vertices: Vec<String>,
    pub removed_vertices: Vec<String>,
    pub added_edges: Vec<String>,
    /// Existing connectors rebuilt with a different style.
    pub restyled_edges: Vec<String>,
    pub removed_edges: Vec<String>,
    /// Edges left out because an endpoint is not rendered.
    pub skipped_edges: Vec<String>,
    /// Vertices placed on the fallback spiral (unknown layer or missing anchor).
    pub fallback_placements: Vec<String>,
    pub simulation_restarted: bool,
}

impl ReconcileReport {
    /// Whether any entity or connector was added or removed.
    pub fn topology_changed(&self) -> bool {
        !(self.added_vertices.is_empty()
            && self.removed_vertices.is_empty()
            && self.added_edges.is_empty()
            && self.removed_edges.is_empty())
    }

    /// Whether the pass left the scene untouched.
    pub fn is_noop(&self) -> bool {
        !self.topology_changed()
            && self.updated_vertices.is_empty()
            && self.restyled_edges.is_empty()
    }
}

/// Everything one scene owns: the object tree, the node registry, the
/// connector registry and the simulation.
#[derive(Debug)]
pub struct SceneContext {
    pub(crate) scene: SceneGraph,
    pub(crate) registry: NodeRegistry,
    pub(crate) entities: BTreeMap<String, ObjectId>,
    pub(crate) connectors: BTreeMap<String, ConnectorRecord>,
    pub(crate) vertices: HashMap<String, Vertex>,
    pub(crate) relationships: Relationships,
    pub(crate) simulation: SimulationAdapter,
    vertex_group: ObjectId,
    edge_group: ObjectId,
    pub(crate) phase: ReconcilePhase,
    fallback_count: usize,
}

impl Default for SceneContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneContext {
    pub fn new() -> Self {
        let mut scene = SceneGraph::new();
        let vertex_group = scene.add(None, SceneObject::group("vertices"));
        let edge_group = scene.add(None, SceneObject::group("edges"));
        Self {
            scene,
            registry: NodeRegistry::new(),
            entities: BTreeMap::new(),
            connectors: BTreeMap::new(),
            vertices: HashMap::new(),
            relationships: Relationships::default(),
            simulation: SimulationAdapter::default(),
            vertex_group,
            edge_group,
            phase: ReconcilePhase::Idle,
            fallback_count: 0,
        }
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn relationships(&self) -> &Relationships {
        &self.relationships
    }

    pub fn phase(&self) -> ReconcilePhase {
        self.phase
    }

    pub fn simulation(&self) -> &SimulationAdapter {
        &self.simulation
    }

    pub fn get_position(&self, id: &str) -> Option<Vec3> {
        self.registry.get_position(id)
    }

    pub fn entity_object(&self, id: &str) -> Option<ObjectId> {
        self.entities.get(id).copied()
    }

    pub fn entity_ids(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    pub fn connector(&self, edge_id: &str) -> Option<&ConnectorRecord> {
        self.connectors.get(edge_id)
    }

    pub fn connectors(&self) -> impl Iterator<Item = (&str, &ConnectorRecord)> {
        self.connectors.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn vertex(&self, id: &str) -> Option<&Vertex> {
        self.vertices.get(id)
    }

    /// Ids of connectors with `entity_id` as an endpoint.
    pub fn connectors_touching(&self, entity_id: &str) -> Vec<String> {
        self.connectors
            .iter()
            .filter(|(_, r)| r.touches(entity_id))
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Remove an entity's object and its registry entry together.
    fn remove_entity(&mut self, id: &str) -> bool {
        let Some(object) = self.entities.remove(id) else {
            return false;
        };
        self.scene.remove(object);
        self.registry.remove(id);
        self.vertices.remove(id);
        true
    }

    fn remove_connector(&mut self, edge_id: &str) -> bool {
        let Some(record) = self.connectors.remove(edge_id) else {
            return false;
        };
        self.scene.remove(record.object);
        true
    }

    /// Move an entity's object to its registry position.
    pub(crate) fn sync_entity_object(&mut self, id: &str) {
        let (Some(&object), Some(position)) = (self.entities.get(id), self.registry.get_position(id))
        else {
            return;
        };
        if let Some(obj) = self.scene.get_mut(object) {
            obj.position = position;
        }
    }

    /// Rebuild one connector from current endpoint positions.
    pub(crate) fn rebuild_connector(&mut self, edge_id: &str, settings: &SceneSettings) -> bool {
        let Some(record) = self.connectors.get(edge_id) else {
            return false;
        };
        let (Some(origin), Some(destination)) = (
            self.registry.get_position(&record.origin_id),
            self.registry.get_position(&record.destination_id),
        ) else {
            tracing::warn!(edge_id, "connector endpoint vanished, not rebuilt");
            return false;
        };
        let parts = connectors::build(
            record.style,
            origin,
            destination,
            ConnectorParams {
                color: &record.color,
                device_scale: settings.style.device_scale,
                settled: self.simulation.is_settled(),
            },
        );
        let object = record.object;
        self.scene.clear_children(object);
        for part in parts {
            self.scene.add(Some(object), part);
        }
        true
    }

    /// Rebuild every connector, e.g. after a simulation tick.
    pub(crate) fn rebuild_all_connectors(&mut self, settings: &SceneSettings) -> usize {
        let ids: Vec<String> = self.connectors.keys().cloned().collect();
        let mut rebuilt = 0;
        for id in &ids {
            if self.rebuild_connector(id, settings) {
                rebuilt += 1;
            }
        }
        rebuilt
    }

    /// Apply `show` flags from the relationship tables to device children
    /// and situations.
    pub(crate) fn apply_visibility(&mut self) {
        let mut flags: Vec<(String, bool)> = Vec::new();
        for group in &self.relationships.parents {
            flags.extend(group.sources.iter().map(|v| (v.id.clone(), group.show)));
        }
        for situation in &self.relationships.situations {
            flags.push((situation.situation_id.clone(), situation.show));
        }
        for (id, show) in flags {
            if let Some(obj) = self
                .entities
                .get(&id)
                .and_then(|&o| self.scene.get_mut(o))
            {
                obj.visible = show;
            }
        }

        // A connector is shown only while both of its endpoints are.
        let visible = |ctx: &Self, id: &str| {
            ctx.entities
                .get(id)
                .and_then(|&o| ctx.scene.get(o))
                .is_some_and(|o| o.visible)
        };
        let connector_flags: Vec<(ObjectId, bool)> = self
            .connectors
            .values()
            .map(|r| {
                (
                    r.object,
                    visible(self, &r.source_id) && visible(self, &r.target_id),
                )
            })
            .collect();
        for (object, show) in connector_flags {
            if let Some(obj) = self.scene.get_mut(object) {
                obj.visible = show;
            }
        }
    }
}

/// Ground-plane cell a grid slot occupies.
fn slot_key(position: Vec3) -> (i64, i64) {
    (position.x.round() as i64, position.z.round() as i64)
}

/// Positions planned for entities that are not rendered yet.
struct Planner<'a> {
    config: &'a PlacementConfig,
    registry: &'a NodeRegistry,
    relationships: &'a Relationships,
    model: &'a GraphModel,
    planned: HashMap<String, NodeInfo>,
    fallbacks: Vec<String>,
    fallback_base: usize,
}

impl<'a> Planner<'a> {
    fn position(&self, id: &str) -> Option<Vec3> {
        self.planned
            .get(id)
            .map(|n| n.position)
            .or_else(|| self.registry.get_position(id))
    }

    fn is_placed(&self, id: &str) -> bool {
        self.planned.contains_key(id) || self.registry.contains(id)
    }

    fn place(&mut self, id: &str, position: Vec3, layer_id: &str, parent_id: Option<&str>) {
        if self.is_placed(id) {
            return;
        }
        self.planned.insert(
            id.to_string(),
            NodeInfo::new(position, layer_id, parent_id.map(str::to_string)),
        );
    }

    fn place_fallback(&mut self, id: &str, layer_id: &str) {
        if self.is_placed(id) {
            return;
        }
        let height = layer_height(self.model.layer_order(layer_id), self.config);
        let index = self.fallback_base + self.fallbacks.len();
        self.place(id, phyllotaxis(index, height), layer_id, None);
        self.fallbacks.push(id.to_string());
    }

    fn plan(mut self) -> (HashMap<String, NodeInfo>, Vec<String>) {
        self.place_devices();
        self.place_alarms();
        self.place_situations();

        for vertex in &self.model.vertices {
            if !self.is_placed(&vertex.id) {
                tracing::debug!(id = %vertex.id, layer = %vertex.layer_id, "no anchor for vertex, using fallback placement");
                self.place_fallback(&vertex.id, &vertex.layer_id);
            }
        }

        (self.planned, self.fallbacks)
    }

    fn place_devices(&mut self) {
        let rel = self.relationships;
        let tier = layer_height(self.model.layer_order(layers::INVENTORY), self.config);
        let child_ids: HashSet<&str> = rel.child_ids().into_iter().collect();

        let slots: Vec<&str> = rel
            .parents
            .iter()
            .filter(|g| {
                self.config.strategy == PlacementStrategy::Grid
                    || !child_ids.contains(g.parent_id.as_str())
            })
            .map(|g| g.parent_id.as_str())
            .collect();

        // New roots take the first grid slots no placed root sits on.
        let count = slots.len();
        let mut occupied: HashSet<(i64, i64)> = slots
            .iter()
            .filter_map(|id| self.position(id))
            .map(slot_key)
            .collect();
        let mut next = 0;
        for id in &slots {
            if self.is_placed(id) {
                continue;
            }
            let slot = loop {
                let candidate = grid_position(next, count, self.config) + Vec3::new(0.0, tier, 0.0);
                next += 1;
                if occupied.insert(slot_key(candidate)) {
                    break candidate;
                }
            };
            self.place(id, slot, layers::INVENTORY, None);
        }

        // Grow children outward from each placed parent, nested groups included.
        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = slots.into_iter().collect();
        let mut pending = rel.parents.iter().map(|g| g.parent_id.as_str());
        loop {
            let Some(parent_id) = queue.pop_front().or_else(|| {
                // Unreached groups (e.g. parent cycles) start from a fallback anchor.
                pending.find(|id| !visited.contains(id))
            }) else {
                break;
            };
            if !visited.insert(parent_id) {
                continue;
            }
            let Some(group) = rel.parent_group(parent_id) else {
                continue;
            };
            if !self.is_placed(parent_id) {
                self.place_fallback(parent_id, layers::INVENTORY);
            }
            let Some(parent_pos) = self.position(parent_id) else {
                continue;
            };
            let n = group.sources.len();
            for (j, child) in group.sources.iter().enumerate() {
                let p = child_position(parent_pos, j, n, self.config);
                self.place(&child.id, p, layers::INVENTORY, Some(parent_id));
                if rel.parent_group(&child.id).is_some() && !visited.contains(child.id.as_str()) {
                    queue.push_back(child.id.as_str());
                }
            }
        }

        for group in &rel.peers {
            if !self.is_placed(&group.parent_id) {
                self.place_fallback(&group.parent_id, layers::INVENTORY);
            }
            let Some(anchor) = self.position(&group.parent_id) else {
                continue;
            };
            let n = group.sources.len();
            for (j, peer) in group.sources.iter().enumerate() {
                let p = child_position(anchor, j, n, self.config);
                self.place(&peer.id, p, layers::INVENTORY, None);
            }
        }
    }

    fn place_alarms(&mut self) {
        let rel = self.relationships;
        for group in &rel.alarms {
            let device = self.position(&group.parent_id);
            let n = group.alarms.len();
            for (j, alarm) in group.alarms.iter().enumerate() {
                match device {
                    Some(device) => {
                        let p = alarm_position(device, j, n, self.config);
                        self.place(&alarm.id, p, layers::ALARMS, Some(group.parent_id.as_str()));
                    }
                    None => {
                        tracing::warn!(alarm = %alarm.id, device = %group.parent_id, "alarm owner not rendered, using fallback placement");
                        self.place_fallback(&alarm.id, layers::ALARMS);
                    }
                }
            }
        }
    }

    fn place_situations(&mut self) {
        let rel = self.relationships;
        for group in &rel.situations {
            let alarms: Vec<Vec3> = group
                .alarms
                .iter()
                .filter_map(|a| self.position(&a.id))
                .collect();
            let device_id = group.device_ids.first().map(String::as_str);
            let device = device_id.and_then(|d| self.position(d));
            let device_parent = device_id
                .and_then(|d| rel.parent_of(d))
                .and_then(|p| self.position(p));

            match situation_position(
                &alarms,
                group.device_ids.len() == 1,
                device,
                device_parent,
                self.config,
            ) {
                Some(p) => self.place(&group.situation_id, p, layers::SITUATIONS, device_id),
                None => {
                    tracing::warn!(situation = %group.situation_id, "situation has no placed alarms, using fallback placement");
                    self.place_fallback(&group.situation_id, layers::SITUATIONS);
                }
            }
        }
    }
}

/// Alarm ids whose alarm-to-io connector carries the main trunk: the
/// highest alarm of every device.
fn trunk_alarms(relationships: &Relationships) -> HashSet<&str> {
    relationships
        .alarms
        .iter()
        .filter_map(|g| g.alarms.last())
        .map(|a| a.id.as_str())
        .collect()
}

/// Style, origin/destination and colour for an edge.
fn connector_plan(
    edge: &Edge,
    ctx: &SceneContext,
    trunks: &HashSet<&str>,
    settings: &SceneSettings,
) -> (ConnectorStyle, String, String, String) {
    let mut style = ConnectorStyle::for_edge(&edge.kind, settings.layout_mode);
    let (origin, destination) = match edge.kind.as_str() {
        // alarm → device: build from the device out to the alarm
        edge_types::ALARM_TO_IO => (edge.target_id.clone(), edge.source_id.clone()),
        _ => (edge.source_id.clone(), edge.target_id.clone()),
    };
    if style == ConnectorStyle::Alarm && trunks.contains(edge.source_id.as_str()) {
        style = ConnectorStyle::MainTrunk;
    }
    let color = match style {
        ConnectorStyle::Inventory => settings.style.inventory_edge_color.clone(),
        ConnectorStyle::Alarm | ConnectorStyle::MainTrunk => {
            meshes::severity_color(ctx.vertices.get(&destination)).to_string()
        }
        ConnectorStyle::Situation => meshes::severity_color(ctx.vertices.get(&origin)).to_string(),
        ConnectorStyle::Hybrid => ctx
            .vertices
            .get(&edge.source_id)
            .and_then(Vertex::severity)
            .map(|s| s.color().to_string())
            .unwrap_or_else(|| settings.style.inventory_edge_color.clone()),
    };
    (style, origin, destination, color)
}

/// Reconcile `model` (already view-filtered) into `ctx`.
pub fn reconcile(ctx: &mut SceneContext, model: &GraphModel, settings: &SceneSettings) -> ReconcileReport {
    let _span = tracing::debug_span!(
        "reconcile",
        vertices = model.vertices.len(),
        edges = model.edges.len()
    )
    .entered();

    let mut report = ReconcileReport::default();

    // Diff
    ctx.phase = ReconcilePhase::Diffing;
    let present_vertices = model.vertex_ids();
    let present_edges = model.edge_ids();
    let relationships = Relationships::build(model);

    let stale_vertices: Vec<String> = ctx
        .entities
        .keys()
        .filter(|id| !present_vertices.contains(id.as_str()))
        .cloned()
        .collect();
    for id in stale_vertices {
        if ctx.remove_entity(&id) {
            tracing::debug!(%id, "removed vertex");
            report.removed_vertices.push(id);
        }
    }

    let stale_edges: Vec<String> = ctx
        .connectors
        .iter()
        .filter(|(id, record)| {
            !present_edges.contains(id.as_str())
                || !ctx.registry.contains(&record.source_id)
                || !ctx.registry.contains(&record.target_id)
        })
        .map(|(id, _)| id.clone())
        .collect();
    for id in stale_edges {
        if ctx.remove_connector(&id) {
            tracing::debug!(%id, "removed connector");
            report.removed_edges.push(id);
        }
    }

    // Build vertices
    ctx.phase = ReconcilePhase::Building;
    let (mut planned, fallbacks) = Planner {
        config: &settings.placement,
        registry: &ctx.registry,
        relationships: &relationships,
        model,
        planned: HashMap::new(),
        fallbacks: Vec::new(),
        fallback_base: ctx.fallback_count,
    }
    .plan();
    ctx.fallback_count += fallbacks.len();
    report.fallback_placements = fallbacks;

    for vertex in &model.vertices {
        let has_children = relationships
            .parent_group(&vertex.id)
            .is_some_and(|g| !g.sources.is_empty());
        let role = EntityRole::of(vertex, has_children);

        if let Some(&object) = ctx.entities.get(&vertex.id) {
            let color = meshes::vertex_color(vertex, &settings.style);
            let label = settings
                .display
                .show_labels
                .then(|| vertex.label.clone())
                .filter(|l| !l.is_empty());
            if let Some(obj) = ctx.scene.get_mut(object) {
                if obj.color != color || obj.label != label {
                    obj.color = color;
                    obj.label = label;
                    report.updated_vertices.push(vertex.id.clone());
                }
            }
            ctx.vertices.insert(vertex.id.clone(), vertex.clone());
            continue;
        }

        let Some(mut info) = planned.remove(&vertex.id) else {
            // Duplicate id in the snapshot; the first occurrence won.
            continue;
        };
        if settings.layout_mode == LayoutMode::Force {
            info.position.y = layer_height(model.layer_order(&vertex.layer_id), &settings.placement);
        }

        let object = ctx.scene.add(
            Some(ctx.vertex_group),
            meshes::vertex_object(
                vertex,
                role,
                info.position,
                settings.placement.alarm_size,
                settings.display.show_labels,
                &settings.style,
            ),
        );
        ctx.scene.set_tag(
            object,
            EntityTag {
                entity_id: vertex.id.clone(),
                layer_id: vertex.layer_id.clone(),
                parent_id: info.parent_id.clone(),
            },
        );
        tracing::debug!(id = %vertex.id, position = ?info.position, "added vertex");
        ctx.registry.insert(vertex.id.clone(), info);
        ctx.entities.insert(vertex.id.clone(), object);
        ctx.vertices.insert(vertex.id.clone(), vertex.clone());
        report.added_vertices.push(vertex.id.clone());
    }

    // Build connectors
    let trunks = trunk_alarms(&relationships);
    for edge in &model.edges {
        let (style, origin_id, destination_id, color) =
            connector_plan(edge, ctx, &trunks, settings);

        if let Some(record) = ctx.connectors.get_mut(&edge.id) {
            if record.style != style || record.color != color {
                record.style = style;
                record.color = color;
                ctx.rebuild_connector(&edge.id, settings);
                report.restyled_edges.push(edge.id.clone());
            }
            continue;
        }

        if !(ctx.registry.contains(&edge.source_id) && ctx.registry.contains(&edge.target_id)) {
            tracing::warn!(
                edge = %edge.id,
                source = %edge.source_id,
                target = %edge.target_id,
                "edge endpoint not rendered, skipping"
            );
            report.skipped_edges.push(edge.id.clone());
            continue;
        }

        let group = ctx
            .scene
            .add(Some(ctx.edge_group), SceneObject::group(connector_name(&edge.id)));
        ctx.connectors.insert(
            edge.id.clone(),
            ConnectorRecord {
                object: group,
                kind: edge.kind.clone(),
                source_id: edge.source_id.clone(),
                target_id: edge.target_id.clone(),
                origin_id,
                destination_id,
                style,
                color,
            },
        );
        ctx.rebuild_connector(&edge.id, settings);
        report.added_edges.push(edge.id.clone());
    }

    ctx.relationships = relationships;
    ctx.apply_visibility();

    if report.topology_changed() && settings.layout_mode == LayoutMode::Force {
        let links: Vec<(String, String)> = ctx
            .connectors
            .values()
            .map(|r| (r.source_id.clone(), r.target_id.clone()))
            .collect();
        ctx.simulation
            .restart(&ctx.registry, links, &settings.simulation);
        report.simulation_restarted = true;
    }

    ctx.phase = if ctx.simulation.is_running() {
        ReconcilePhase::SimulatingOrSteady
    } else {
        ReconcilePhase::Idle
    };

    if report.is_noop() {
        tracing::debug!("snapshot unchanged");
    } else {
        tracing::info!(
            added_vertices = report.added_vertices.len(),
            removed_vertices = report.removed_vertices.len(),
            added_edges = report.added_edges.len(),
            removed_edges = report.removed_edges.len(),
            skipped_edges = report.skipped_edges.len(),
            "reconciled snapshot"
        );
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use topograph_core::{Layer, VertexKind};

    fn device(id: &str) -> Vertex {
        Vertex::new(id, id, VertexKind::InventoryDevice, layers::INVENTORY)
    }

    fn alarm(id: &str) -> Vertex {
        Vertex::new(id, id, VertexKind::Alarm, layers::ALARMS).with_attribute("severity", "major")
    }

    fn model() -> GraphModel {
        GraphModel {
            vertices: vec![device("core"), device("leaf"), alarm("a1"), alarm("a2")],
            edges: vec![
                Edge::new("p", edge_types::PARENT, "leaf", "core"),
                Edge::new("x1", edge_types::ALARM_TO_IO, "a1", "core"),
                Edge::new("x2", edge_types::ALARM_TO_IO, "a2", "core"),
            ],
            layers: vec![
                Layer::new(layers::INVENTORY, "Inventory", 0),
                Layer::new(layers::ALARMS, "Alarms", 1),
            ],
        }
    }

    #[test]
    fn test_first_pass_adds_everything() {
        let settings = SceneSettings::default();
        let mut ctx = SceneContext::new();
        let report = reconcile(&mut ctx, &model(), &settings);
        assert_eq!(report.added_vertices.len(), 4);
        assert_eq!(report.added_edges.len(), 3);
        assert!(report.skipped_edges.is_empty());
        assert_eq!(ctx.phase(), ReconcilePhase::Idle);
        assert_eq!(ctx.get_position("core"), Some(Vec3::ZERO));
        // Lone child goes straight up.
        assert_eq!(ctx.get_position("leaf"), Some(Vec3::new(0.0, 30.0, 0.0)));
    }

    #[test]
    fn test_last_alarm_carries_trunk() {
        let settings = SceneSettings::default();
        let mut ctx = SceneContext::new();
        reconcile(&mut ctx, &model(), &settings);
        assert_eq!(ctx.connector("x1").unwrap().style, ConnectorStyle::Alarm);
        assert_eq!(ctx.connector("x2").unwrap().style, ConnectorStyle::MainTrunk);
        assert_eq!(ctx.connector("x2").unwrap().origin_id, "core");
        assert_eq!(ctx.connector("x2").unwrap().color, "#DE582A");
    }

    #[test]
    fn test_new_alarm_moves_trunk() {
        let settings = SceneSettings::default();
        let mut ctx = SceneContext::new();
        reconcile(&mut ctx, &model(), &settings);

        let mut next = model();
        next.vertices.push(alarm("a3"));
        next.edges.push(Edge::new("x3", edge_types::ALARM_TO_IO, "a3", "core"));
        let report = reconcile(&mut ctx, &next, &settings);
        assert_eq!(report.added_edges, vec!["x3".to_string()]);
        assert_eq!(report.restyled_edges, vec!["x2".to_string()]);
        assert_eq!(ctx.connector("x3").unwrap().style, ConnectorStyle::MainTrunk);
    }

    #[test]
    fn test_severity_change_updates_in_place() {
        let settings = SceneSettings::default();
        let mut ctx = SceneContext::new();
        reconcile(&mut ctx, &model(), &settings);
        let object = ctx.entity_object("a1").unwrap();

        let mut next = model();
        next.vertices[2] = alarm("a1").with_attribute("severity", "critical");
        let report = reconcile(&mut ctx, &next, &settings);
        assert!(!report.topology_changed());
        assert_eq!(report.updated_vertices, vec!["a1".to_string()]);
        assert_eq!(ctx.entity_object("a1"), Some(object));
        assert_eq!(ctx.scene().get(object).unwrap().color, "#FC1717");
    }

    #[test]
    fn test_unknown_layer_uses_fallback() {
        let settings = SceneSettings::default();
        let mut ctx = SceneContext::new();
        let mut m = model();
        m.vertices.push(Vertex::new("w", "w", VertexKind::Other("widget".into()), "custom"));
        let report = reconcile(&mut ctx, &m, &settings);
        assert_eq!(report.fallback_placements, vec!["w".to_string()]);
        assert!(ctx.get_position("w").is_some());
    }

    #[test]
    fn test_force_mode_restarts_simulation_only_on_change() {
        let settings = SceneSettings {
            layout_mode: LayoutMode::Force,
            ..Default::default()
        };
        let mut ctx = SceneContext::new();
        let report = reconcile(&mut ctx, &model(), &settings);
        assert!(report.simulation_restarted);
        assert_eq!(ctx.phase(), ReconcilePhase::SimulatingOrSteady);
        // Heights follow layer tiers.
        assert_eq!(ctx.get_position("a1").unwrap().y, 50.0);
        assert_eq!(ctx.connector("p").unwrap().style, ConnectorStyle::Hybrid);

        let again = reconcile(&mut ctx, &model(), &settings);
        assert!(!again.simulation_restarted);
        assert_eq!(ctx.simulation().restarts(), 1);
    }
}
