//! Picking, hover tracking, drag sessions and camera moves.

use std::cell::Cell;
use std::collections::BTreeSet;
use std::rc::Rc;

use ordered_float::OrderedFloat;
use serde::Serialize;
use topograph_layout::{NodeRegistry, Vec3};

use crate::error::{SceneError, SceneResult};
use crate::reconciler::SceneContext;
use crate::scene_graph::{ObjectId, SceneGraph, Shape};
use crate::settings::{CameraConfig, SceneSettings};
use crate::tween::{Easing, Tween};

/// Lines have no width; pick them within this distance.
const LINE_PICK_TOLERANCE: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit length.
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Perspective camera looking from `position` at `target`, y up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub fov_degrees: f32,
    pub aspect: f32,
}

impl Camera {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, config.min_distance),
            target: Vec3::ZERO,
            fov_degrees: config.fov_degrees,
            aspect: config.aspect,
        }
    }

    /// Ray through a pointer position in normalized device coordinates
    /// (`[-1, 1]` on both axes, +y up).
    pub fn ray_from_ndc(&self, x: f32, y: f32) -> Ray {
        let forward = (self.target - self.position).normalize_or_zero();
        let mut right = forward.cross(Vec3::new(0.0, 1.0, 0.0)).normalize_or_zero();
        if right == Vec3::ZERO {
            // Looking straight up or down.
            right = Vec3::new(1.0, 0.0, 0.0);
        }
        let up = right.cross(forward);
        let half_height = (self.fov_degrees.to_radians() / 2.0).tan();
        let direction =
            forward + right * (x * half_height * self.aspect) + up * (y * half_height);
        Ray::new(self.position, direction)
    }
}

/// One pick result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hit {
    #[serde(skip)]
    pub object: ObjectId,
    /// Entity owning the object, if any (connector parts have none).
    pub entity_id: Option<String>,
    pub distance: f32,
}

fn ray_box(ray: &Ray, center: Vec3, half: f32) -> Option<f32> {
    let mut t_min = f32::NEG_INFINITY;
    let mut t_max = f32::INFINITY;
    let axes = [
        (ray.origin.x, ray.direction.x, center.x),
        (ray.origin.y, ray.direction.y, center.y),
        (ray.origin.z, ray.direction.z, center.z),
    ];
    for (o, d, c) in axes {
        let (lo, hi) = (c - half, c + half);
        if d.abs() < f32::EPSILON {
            if o < lo || o > hi {
                return None;
            }
            continue;
        }
        let (mut t0, mut t1) = ((lo - o) / d, (hi - o) / d);
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }
        t_min = t_min.max(t0);
        t_max = t_max.min(t1);
        if t_min > t_max {
            return None;
        }
    }
    if t_max < 0.0 {
        return None;
    }
    Some(t_min.max(0.0))
}

fn ray_sphere(ray: &Ray, center: Vec3, radius: f32) -> Option<f32> {
    let oc = ray.origin - center;
    let b = oc.dot(ray.direction);
    let c = oc.dot(oc) - radius * radius;
    let disc = b * b - c;
    if disc < 0.0 {
        return None;
    }
    let sqrt = disc.sqrt();
    let t = if -b - sqrt >= 0.0 { -b - sqrt } else { -b + sqrt };
    (t >= 0.0).then_some(t)
}

/// Distance along the ray to its closest approach with segment `a..b`, if
/// that approach is within `radius`.
fn ray_segment(ray: &Ray, a: Vec3, b: Vec3, radius: f32) -> Option<f32> {
    let u = ray.direction;
    let v = b - a;
    let w = ray.origin - a;
    let (uu, uv, vv) = (u.dot(u), u.dot(v), v.dot(v));
    let (uw, vw) = (u.dot(w), v.dot(w));
    let denom = uu * vv - uv * uv;

    let s = if vv <= f32::EPSILON {
        0.0
    } else if denom.abs() <= f32::EPSILON {
        (vw / vv).clamp(0.0, 1.0)
    } else {
        ((uu * vw - uv * uw) / denom).clamp(0.0, 1.0)
    };
    let on_segment = a + v * s;
    let t = (on_segment - ray.origin).dot(u).max(0.0);
    (ray.at(t).distance(on_segment) <= radius).then_some(t)
}

/// Intersect `ray` with every visible leaf, nearest first.
pub fn pick(scene: &SceneGraph, ray: &Ray) -> Vec<Hit> {
    let mut hits: Vec<Hit> = scene
        .visible_leaves()
        .into_iter()
        .filter_map(|id| {
            let object = scene.get(id)?;
            let distance = match object.shape {
                Shape::Box { size } => ray_box(ray, object.position, size / 2.0),
                Shape::Sphere { radius } => ray_sphere(ray, object.position, radius),
                Shape::Tube { from, to, radius } => ray_segment(ray, from, to, radius),
                Shape::Line { from, to } => ray_segment(ray, from, to, LINE_PICK_TOLERANCE),
                Shape::Group | Shape::Ring { .. } => None,
            }?;
            Some(Hit {
                object: id,
                entity_id: scene.owning_tag(id).map(|t| t.entity_id.clone()),
                distance,
            })
        })
        .collect();
    hits.sort_by_key(|h| OrderedFloat(h.distance));
    hits
}

/// Entities that entered and left the hovered set on one update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HoverDiff {
    pub entered: Vec<String>,
    pub left: Vec<String>,
}

impl HoverDiff {
    pub fn is_empty(&self) -> bool {
        self.entered.is_empty() && self.left.is_empty()
    }
}

/// The currently hovered set, diffed per frame.
#[derive(Debug, Clone, Default)]
pub struct HoverTracker {
    hovered: BTreeSet<String>,
}

impl HoverTracker {
    pub fn update(&mut self, now: impl IntoIterator<Item = String>) -> HoverDiff {
        let next: BTreeSet<String> = now.into_iter().collect();
        let diff = HoverDiff {
            entered: next.difference(&self.hovered).cloned().collect(),
            left: self.hovered.difference(&next).cloned().collect(),
        };
        self.hovered = next;
        diff
    }

    pub fn hovered(&self) -> impl Iterator<Item = &str> {
        self.hovered.iter().map(String::as_str)
    }

    pub fn is_hovered(&self, id: &str) -> bool {
        self.hovered.contains(id)
    }
}

/// Camera orbit controls that drags switch off.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    enabled: Rc<Cell<bool>>,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self {
            enabled: Rc::new(Cell::new(true)),
        }
    }
}

impl OrbitControls {
    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    /// Disable orbiting until the returned session is dropped.
    pub fn begin_drag(&self, entity_id: impl Into<String>) -> SceneResult<DragSession> {
        if !self.enabled.get() {
            return Err(SceneError::DragInProgress(entity_id.into()));
        }
        self.enabled.set(false);
        Ok(DragSession {
            entity_id: entity_id.into(),
            controls: Rc::clone(&self.enabled),
        })
    }
}

/// An active drag. Orbit controls come back on drop, whether the drag
/// ended normally or was abandoned.
#[derive(Debug)]
pub struct DragSession {
    entity_id: String,
    controls: Rc<Cell<bool>>,
}

impl DragSession {
    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }
}

impl Drop for DragSession {
    fn drop(&mut self) {
        self.controls.set(true);
    }
}

/// Move a dropped entity and rebuild the connectors touching it.
/// Returns the number of connectors rebuilt.
pub fn on_drag_end(
    ctx: &mut SceneContext,
    entity_id: &str,
    position: Vec3,
    settings: &SceneSettings,
) -> SceneResult<usize> {
    if !ctx.registry.contains(entity_id) {
        return Err(SceneError::UnknownEntity(entity_id.to_string()));
    }
    ctx.registry.set_position(entity_id, position)?;
    ctx.sync_entity_object(entity_id);
    ctx.simulation
        .set_position(entity_id, position.x, position.z)?;

    let touching = ctx.connectors_touching(entity_id);
    let mut rebuilt = 0;
    for edge_id in &touching {
        if ctx.rebuild_connector(edge_id, settings) {
            rebuilt += 1;
        }
    }
    tracing::debug!(entity_id, rebuilt, "drag ended");
    Ok(rebuilt)
}

#[derive(Debug, Clone)]
struct FocusMove {
    position: Tween<Vec3>,
    target: Tween<Vec3>,
}

/// Camera state machine: framing, reset, spin and focus tweens.
#[derive(Debug, Clone)]
pub struct CameraRig {
    camera: Camera,
    config: CameraConfig,
    distance: f32,
    spin_angle: f32,
    spinning: bool,
    focus: Option<FocusMove>,
}

impl CameraRig {
    pub fn new(config: CameraConfig) -> Self {
        Self {
            camera: Camera::new(&config),
            distance: config.min_distance,
            config,
            spin_angle: 0.0,
            spinning: false,
            focus: None,
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn is_spinning(&self) -> bool {
        self.spinning
    }

    pub fn is_animating(&self) -> bool {
        self.focus.is_some()
    }

    /// Distance that fits every registered position in view.
    pub fn fit_distance(&self, registry: &NodeRegistry) -> f32 {
        registry
            .bounds()
            .map(|b| b.max_extent() * self.config.fit_margin)
            .filter(|d| *d > 0.0)
            .unwrap_or(self.config.min_distance)
    }

    /// Recompute the fit distance and reset the view to it.
    pub fn frame(&mut self, registry: &NodeRegistry) -> f32 {
        self.distance = self.fit_distance(registry);
        self.reset_view();
        self.distance
    }

    /// Camera at `(0, 0, distance)` looking at the origin.
    pub fn reset_view(&mut self) {
        self.focus = None;
        self.spin_angle = 0.0;
        self.camera.target = Vec3::ZERO;
        self.camera.position = Vec3::new(0.0, 0.0, self.distance);
    }

    pub fn set_spin(&mut self, spinning: bool) {
        self.spinning = spinning;
    }

    /// Start a tween to `target + focus_offset`, looking at `target`.
    pub fn focus(&mut self, target: Vec3, now_ms: f64) {
        let duration = self.config.focus_duration_ms;
        self.focus = Some(FocusMove {
            position: Tween::new(
                self.camera.position,
                target + self.config.focus_offset,
                now_ms,
                duration,
                Easing::QuadraticIn,
            ),
            target: Tween::new(self.camera.target, target, now_ms, duration, Easing::QuadraticIn),
        });
    }

    /// Advance one frame. Returns whether the camera moved.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        if let Some(focus) = &self.focus {
            self.camera.position = focus.position.sample(now_ms);
            self.camera.target = focus.target.sample(now_ms);
            if focus.position.is_finished(now_ms) {
                self.focus = None;
            }
            return true;
        }
        if self.spinning {
            self.spin_angle = (self.spin_angle + self.config.spin_step) % std::f32::consts::TAU;
            let t = self.camera.target;
            self.camera.position = Vec3::new(
                t.x + self.distance * self.spin_angle.sin(),
                self.camera.position.y,
                t.z + self.distance * self.spin_angle.cos(),
            );
            return true;
        }
        false
    }
}
