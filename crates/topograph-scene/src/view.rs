//! The outbound surface of the scene: one [`TopologyView`] per rendered
//! topology.
//!
//! Input handling and the render loop live outside this crate and call in
//! through the `on_*` entry points and [`TopologyView::tick`]. Every entry
//! point runs to completion before returning, so the render loop only ever
//! observes a fully reconciled scene.

use std::collections::{BTreeMap, BTreeSet};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use topograph_core::{severity_filters, GraphModel, ModelView, Severity};
use topograph_layout::{TickOutcome, Vec3};

use crate::error::{SceneError, SceneResult};
use crate::flows::FlowSimulator;
use crate::interaction::{self, CameraRig, DragSession, Hit, HoverDiff, HoverTracker, OrbitControls};
use crate::reconciler::{reconcile, ReconcileReport, SceneContext};
use crate::refresh::{RefreshGate, RefreshOutcome, RefreshTicket};
use crate::scene_graph::{ObjectId, SceneObject, Shape};
use crate::settings::SceneSettings;
use crate::simulation;
use crate::tween::{spin_tween, Tween};

const HIGHLIGHT_COLOR: &str = "#FFFFFF";

/// Most results [`TopologyView::search`] returns.
pub const SEARCH_LIMIT: usize = 10;

/// A vertex matched by [`TopologyView::search`]; its id feeds
/// [`TopologyView::on_focus`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub id: String,
    pub label: String,
}

#[derive(Debug)]
struct Highlight {
    object: ObjectId,
    spin: Tween<f32>,
}

/// A topology scene together with its camera, interaction state and
/// refresh ordering.
#[derive(Debug)]
pub struct TopologyView {
    settings: SceneSettings,
    ctx: SceneContext,
    model_view: ModelView,
    rng: StdRng,
    gate: RefreshGate,
    camera: CameraRig,
    controls: OrbitControls,
    drag: Option<DragSession>,
    hover: HoverTracker,
    highlights: BTreeMap<String, Highlight>,
    highlight_group: Option<ObjectId>,
    flows: FlowSimulator,
    collapsed: BTreeSet<String>,
    framed: bool,
    last_report: Option<ReconcileReport>,
}

impl TopologyView {
    pub fn new(settings: SceneSettings) -> Self {
        let seed = settings.simulation.seed;
        Self {
            model_view: ModelView::new(settings.display.clone()),
            camera: CameraRig::new(settings.camera.clone()),
            settings,
            ctx: SceneContext::new(),
            rng: StdRng::seed_from_u64(seed),
            gate: RefreshGate::new(),
            controls: OrbitControls::default(),
            drag: None,
            hover: HoverTracker::default(),
            highlights: BTreeMap::new(),
            highlight_group: None,
            flows: FlowSimulator::new(seed.wrapping_add(1)),
            collapsed: BTreeSet::new(),
            framed: false,
            last_report: None,
        }
    }

    pub fn settings(&self) -> &SceneSettings {
        &self.settings
    }

    pub fn context(&self) -> &SceneContext {
        &self.ctx
    }

    pub fn camera(&self) -> &CameraRig {
        &self.camera
    }

    pub fn controls(&self) -> &OrbitControls {
        &self.controls
    }

    pub fn last_report(&self) -> Option<&ReconcileReport> {
        self.last_report.as_ref()
    }

    pub fn flow_count(&self) -> usize {
        self.flows.len()
    }

    pub fn get_position(&self, id: &str) -> Option<Vec3> {
        self.ctx.get_position(id)
    }

    /// Reconcile a freshly fetched snapshot into the scene.
    pub fn on_model_updated(&mut self, raw: &GraphModel) -> ReconcileReport {
        let filtered = self.model_view.apply(raw, &mut self.rng);
        let report = reconcile(&mut self.ctx, &filtered, &self.settings);

        for id in &report.removed_vertices {
            self.drop_highlight(id);
            if self.drag.as_ref().is_some_and(|d| d.entity_id() == id) {
                tracing::warn!(%id, "dragged entity removed, cancelling drag");
                self.drag = None;
            }
        }

        // Relationship tables are rebuilt per snapshot; re-apply collapsed devices.
        self.collapsed.retain(|id| self.ctx.registry.contains(id));
        for id in &self.collapsed {
            self.ctx.relationships.toggle_visibility(id);
        }
        if !self.collapsed.is_empty() {
            self.ctx.apply_visibility();
        }

        if !self.framed && !self.ctx.registry.is_empty() {
            let distance = self.camera.frame(&self.ctx.registry);
            tracing::debug!(distance, "framed camera");
            self.framed = true;
        }

        self.last_report = Some(report.clone());
        report
    }

    /// Issue a ticket for a refresh request about to be sent.
    pub fn begin_refresh(&mut self) -> RefreshTicket {
        self.gate.begin()
    }

    /// Apply a refresh response unless a response to a newer request has
    /// already been applied. Returns `None` for stale responses.
    pub fn on_refresh_response(
        &mut self,
        ticket: RefreshTicket,
        raw: &GraphModel,
    ) -> Option<ReconcileReport> {
        match self.gate.complete(ticket, raw) {
            RefreshOutcome::Apply(raw) => Some(self.on_model_updated(raw)),
            RefreshOutcome::Stale { .. } => None,
        }
    }

    /// Per-frame callback. Returns whether anything in the scene or camera
    /// changed.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        let mut changed = false;

        if self.ctx.simulation.is_running() {
            let outcome = simulation::advance(&mut self.ctx, &self.settings);
            changed |= outcome != TickOutcome::Idle;
        }

        changed |= self.camera.tick(now_ms);

        for (id, highlight) in &self.highlights {
            let position = self.ctx.registry.get_position(id);
            if let Some(obj) = self.ctx.scene.get_mut(highlight.object) {
                obj.rotation_y = highlight.spin.sample(now_ms);
                if let Some(position) = position {
                    obj.position = position;
                }
                changed = true;
            }
        }

        if self.settings.display.flow_simulation {
            self.flows.tick(&mut self.ctx, now_ms, &self.settings.style);
            changed |= !self.flows.is_empty();
        } else if !self.flows.is_empty() {
            self.flows.clear(&mut self.ctx);
            changed = true;
        }

        changed
    }

    /// Start the camera move towards an entity.
    pub fn on_focus(&mut self, entity_id: &str, now_ms: f64) -> SceneResult<()> {
        let target = self
            .ctx
            .get_position(entity_id)
            .ok_or_else(|| SceneError::UnknownEntity(entity_id.to_string()))?;
        self.camera.focus(target, now_ms);
        Ok(())
    }

    /// Start dragging an entity. Orbit controls stay off until the drag ends
    /// or is cancelled.
    pub fn begin_drag(&mut self, entity_id: &str) -> SceneResult<()> {
        if !self.ctx.registry.contains(entity_id) {
            return Err(SceneError::UnknownEntity(entity_id.to_string()));
        }
        if let Some(active) = &self.drag {
            return Err(SceneError::DragInProgress(active.entity_id().to_string()));
        }
        self.drag = Some(self.controls.begin_drag(entity_id)?);
        Ok(())
    }

    /// Finish the active drag at `position`. Returns the number of
    /// connectors rebuilt.
    pub fn on_drag_end(&mut self, entity_id: &str, position: Vec3) -> SceneResult<usize> {
        let session = self.drag.take().ok_or(SceneError::NoDragSession)?;
        if session.entity_id() != entity_id {
            tracing::warn!(
                started = session.entity_id(),
                ended = entity_id,
                "drag ended on a different entity"
            );
        }
        let rebuilt = interaction::on_drag_end(&mut self.ctx, entity_id, position, &self.settings)?;
        if let Some(highlight) = self.highlights.get(entity_id) {
            if let Some(obj) = self.ctx.scene.get_mut(highlight.object) {
                obj.position = position;
            }
        }
        drop(session);
        Ok(rebuilt)
    }

    /// Abandon the active drag, if any.
    pub fn cancel_drag(&mut self) -> bool {
        self.drag.take().is_some()
    }

    /// Update the hovered set. Entered entities get a spinning highlight
    /// ring, left ones lose it.
    pub fn on_hover_changed(
        &mut self,
        ids: impl IntoIterator<Item = String>,
        now_ms: f64,
    ) -> HoverDiff {
        let known: Vec<String> = ids
            .into_iter()
            .filter(|id| self.ctx.registry.contains(id))
            .collect();
        let diff = self.hover.update(known);

        for id in &diff.left {
            self.drop_highlight(id);
        }
        for id in &diff.entered {
            let Some(position) = self.ctx.get_position(id) else {
                continue;
            };
            let group = self.highlight_group();
            let object = self.ctx.scene.add(
                Some(group),
                SceneObject::new(
                    format!("highlight-{id}"),
                    Shape::Ring {
                        radius: self.settings.style.parent_device_size,
                    },
                    position,
                    HIGHLIGHT_COLOR,
                ),
            );
            self.highlights.insert(
                id.clone(),
                Highlight {
                    object,
                    spin: spin_tween(now_ms, self.settings.style.hover_spin_ms),
                },
            );
        }
        diff
    }

    fn highlight_group(&mut self) -> ObjectId {
        match self.highlight_group {
            Some(group) if self.ctx.scene.contains(group) => group,
            _ => {
                let group = self.ctx.scene.add(None, SceneObject::group("highlights"));
                self.highlight_group = Some(group);
                group
            }
        }
    }

    fn drop_highlight(&mut self, id: &str) {
        if let Some(highlight) = self.highlights.remove(id) {
            self.ctx.scene.remove(highlight.object);
        }
    }

    pub fn is_highlighted(&self, id: &str) -> bool {
        self.highlights.contains_key(id)
    }

    /// Pick at a pointer position in normalized device coordinates.
    pub fn pick(&self, ndc_x: f32, ndc_y: f32) -> Vec<Hit> {
        let ray = self.camera.camera().ray_from_ndc(ndc_x, ndc_y);
        interaction::pick(&self.ctx.scene, &ray)
    }

    pub fn reset_view(&mut self) {
        self.camera.frame(&self.ctx.registry);
    }

    pub fn set_spin(&mut self, spinning: bool) {
        self.camera.set_spin(spinning);
    }

    /// Collapse or expand a device's children and the situations over them.
    pub fn toggle_device_visibility(&mut self, device_id: &str) -> SceneResult<()> {
        if self.ctx.relationships.parent_group(device_id).is_none() {
            return Err(SceneError::UnknownEntity(device_id.to_string()));
        }
        if !self.collapsed.remove(device_id) {
            self.collapsed.insert(device_id.to_string());
        }
        self.ctx.relationships.toggle_visibility(device_id);
        self.ctx.apply_visibility();
        Ok(())
    }

    /// Rendered vertices whose label contains `term`, case-insensitively,
    /// in id order and capped at [`SEARCH_LIMIT`]. Vertices without a label
    /// never match; an empty term matches every labelled vertex.
    pub fn search(&self, term: &str) -> Vec<SearchResult> {
        let needle = term.to_lowercase();
        self.ctx
            .entity_ids()
            .filter_map(|id| self.ctx.vertex(id))
            .filter(|v| !v.label.is_empty() && v.label.to_lowercase().contains(&needle))
            .take(SEARCH_LIMIT)
            .map(|v| SearchResult {
                id: v.id.clone(),
                label: v.label.clone(),
            })
            .collect()
    }

    /// Severities present in the scene.
    pub fn severity_filters(&self) -> BTreeMap<Severity, bool> {
        severity_filters(self.ctx.vertices.values())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::LayoutMode;
    use topograph_core::{edge_types, layers, Edge, Layer, Vertex, VertexKind};

    fn snapshot() -> GraphModel {
        GraphModel {
            vertices: vec![
                Vertex::new("core", "core", VertexKind::InventoryDevice, layers::INVENTORY),
                Vertex::new("leaf", "leaf", VertexKind::InventoryDevice, layers::INVENTORY),
            ],
            edges: vec![Edge::new("p", edge_types::PARENT, "leaf", "core")],
            layers: vec![Layer::new(layers::INVENTORY, "Inventory", 0)],
        }
    }

    #[test]
    fn test_first_update_frames_camera() {
        let mut view = TopologyView::new(SceneSettings::default());
        view.on_model_updated(&snapshot());
        // leaf sits 30 above core
        assert!((view.camera().distance() - 33.0).abs() < 1e-3);
    }

    #[test]
    fn test_tick_is_noop_when_idle() {
        let mut view = TopologyView::new(SceneSettings::default());
        view.on_model_updated(&snapshot());
        assert!(!view.tick(16.0));
    }

    #[test]
    fn test_hover_ring_follows_hover_set() {
        let mut view = TopologyView::new(SceneSettings::default());
        view.on_model_updated(&snapshot());

        let diff = view.on_hover_changed(["core".to_string(), "ghost".to_string()], 0.0);
        assert_eq!(diff.entered, vec!["core"]);
        assert!(view.is_highlighted("core"));
        assert!(view.context().scene().find_by_name("highlight-core").is_some());
        assert!(view.tick(1250.0));

        view.on_hover_changed(Vec::new(), 2000.0);
        assert!(!view.is_highlighted("core"));
        assert!(view.context().scene().find_by_name("highlight-core").is_none());
    }

    fn labelled(count: usize) -> GraphModel {
        let mut vertices = vec![Vertex::new("anon", "", VertexKind::InventoryDevice, layers::INVENTORY)];
        for i in 0..count {
            vertices.push(Vertex::new(
                format!("r{i:02}"),
                format!("Edge Router {i}"),
                VertexKind::InventoryDevice,
                layers::INVENTORY,
            ));
        }
        vertices.push(Vertex::new("sw", "core switch", VertexKind::InventoryDevice, layers::INVENTORY));
        GraphModel {
            vertices,
            edges: Vec::new(),
            layers: vec![Layer::new(layers::INVENTORY, "Inventory", 0)],
        }
    }

    #[test]
    fn test_search_is_case_insensitive_and_capped() {
        let mut view = TopologyView::new(SceneSettings::default());
        view.on_model_updated(&labelled(12));

        let results = view.search("ROUTER");
        assert_eq!(results.len(), SEARCH_LIMIT);
        assert_eq!(
            results[0],
            SearchResult {
                id: "r00".to_string(),
                label: "Edge Router 0".to_string()
            }
        );
        assert!(results.iter().all(|r| r.label.contains("Router")));

        assert_eq!(view.search("switch").len(), 1);
        assert!(view.search("firewall").is_empty());
    }

    #[test]
    fn test_search_empty_term_skips_unlabelled() {
        let mut view = TopologyView::new(SceneSettings::default());
        view.on_model_updated(&labelled(3));

        let ids: Vec<String> = view.search("").into_iter().map(|r| r.id).collect();
        assert_eq!(ids, ["r00", "r01", "r02", "sw"]);
        assert!(view.on_focus(&ids[0], 0.0).is_ok());
    }

    #[test]
    fn test_search_before_any_snapshot() {
        let view = TopologyView::new(SceneSettings::default());
        assert!(view.search("").is_empty());
    }

    #[test]
    fn test_hover_ring_tracks_force_layout() {
        let mut view = TopologyView::new(SceneSettings {
            layout_mode: LayoutMode::Force,
            ..SceneSettings::default()
        });
        view.on_model_updated(&snapshot());
        assert!(view.context().simulation().is_running());
        view.on_hover_changed(["leaf".to_string()], 0.0);

        for frame in 1..=30 {
            view.tick(f64::from(frame) * 16.0);
        }
        let ring = view.context().scene().find_by_name("highlight-leaf").unwrap();
        assert_eq!(
            view.context().scene().get(ring).unwrap().position,
            view.get_position("leaf").unwrap()
        );
    }

    #[test]
    fn test_focus_unknown_entity() {
        let mut view = TopologyView::new(SceneSettings::default());
        assert!(matches!(
            view.on_focus("nope", 0.0),
            Err(SceneError::UnknownEntity(_))
        ));
    }

    #[test]
    fn test_toggle_hides_children_and_their_links() {
        let mut view = TopologyView::new(SceneSettings::default());
        view.on_model_updated(&snapshot());
        view.toggle_device_visibility("core").unwrap();

        let scene = view.context().scene();
        let leaf = view.context().entity_object("leaf").unwrap();
        assert!(!scene.get(leaf).unwrap().visible);
        let link = view.context().connector("p").unwrap().object;
        assert!(!scene.get(link).unwrap().visible);

        // Collapsed state survives the next snapshot.
        view.on_model_updated(&snapshot());
        let leaf = view.context().entity_object("leaf").unwrap();
        assert!(!view.context().scene().get(leaf).unwrap().visible);

        view.toggle_device_visibility("core").unwrap();
        assert!(view.context().scene().get(leaf).unwrap().visible);
    }
}
