//! Explicit ownership tree of renderable objects.
//!
//! Objects live in a slotmap arena. Entity metadata is kept in a side table
//! keyed by object id rather than on the objects themselves, so a renderer
//! can mirror the tree without knowing about graph ids.

use std::collections::HashMap;

use serde::Serialize;
use slotmap::{SecondaryMap, SlotMap};
use topograph_layout::Vec3;

slotmap::new_key_type! {
    /// Identity of an object in the scene graph.
    pub struct ObjectId;
}

/// Geometry of a scene object. Coordinates are world space.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shape {
    /// Pure container.
    Group,
    /// Axis-aligned cube centered on the object position.
    Box { size: f32 },
    Sphere { radius: f32 },
    /// Cylinder between two points.
    Tube { from: Vec3, to: Vec3, radius: f32 },
    /// Zero-width segment.
    Line { from: Vec3, to: Vec3 },
    /// Flat highlight ring around the object position.
    Ring { radius: f32 },
}

/// A node of the scene tree.
#[derive(Debug, Clone, Serialize)]
pub struct SceneObject {
    pub name: String,
    pub shape: Shape,
    pub position: Vec3,
    /// Rotation about the vertical axis, radians.
    pub rotation_y: f32,
    pub color: String,
    pub visible: bool,
    pub label: Option<String>,
    #[serde(skip)]
    parent: Option<ObjectId>,
    #[serde(skip)]
    children: Vec<ObjectId>,
}

impl SceneObject {
    pub fn new(name: impl Into<String>, shape: Shape, position: Vec3, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shape,
            position,
            rotation_y: 0.0,
            color: color.into(),
            visible: true,
            label: None,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self::new(name, Shape::Group, Vec3::ZERO, "")
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn parent(&self) -> Option<ObjectId> {
        self.parent
    }

    pub fn children(&self) -> &[ObjectId] {
        &self.children
    }
}

/// Typed entity record attached to an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityTag {
    pub entity_id: String,
    pub layer_id: String,
    pub parent_id: Option<String>,
}

/// Arena-backed scene tree with a root group.
#[derive(Debug)]
pub struct SceneGraph {
    root: ObjectId,
    objects: SlotMap<ObjectId, SceneObject>,
    tags: SecondaryMap<ObjectId, EntityTag>,
    by_name: HashMap<String, ObjectId>,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        let mut objects = SlotMap::with_key();
        let root = objects.insert(SceneObject::group("scene"));
        let mut by_name = HashMap::new();
        by_name.insert("scene".to_string(), root);
        Self {
            root,
            objects,
            tags: SecondaryMap::new(),
            by_name,
        }
    }

    pub fn root(&self) -> ObjectId {
        self.root
    }

    /// Number of objects, root included.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.len() <= 1
    }

    /// Attach `object` under `parent` (the root when `None`).
    ///
    /// A later object with the same name shadows the earlier one in
    /// [`SceneGraph::find_by_name`].
    pub fn add(&mut self, parent: Option<ObjectId>, mut object: SceneObject) -> ObjectId {
        let parent = parent
            .filter(|p| self.objects.contains_key(*p))
            .unwrap_or(self.root);
        object.parent = Some(parent);
        let name = object.name.clone();
        let id = self.objects.insert(object);
        if let Some(p) = self.objects.get_mut(parent) {
            p.children.push(id);
        }
        self.by_name.insert(name, id);
        id
    }

    /// Remove an object and its whole subtree. Returns how many were removed.
    pub fn remove(&mut self, id: ObjectId) -> usize {
        if id == self.root || !self.objects.contains_key(id) {
            return 0;
        }
        if let Some(parent) = self.objects.get(id).and_then(|o| o.parent) {
            if let Some(p) = self.objects.get_mut(parent) {
                p.children.retain(|c| *c != id);
            }
        }

        let mut removed = 0;
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(object) = self.objects.remove(current) {
                if self.by_name.get(&object.name) == Some(&current) {
                    self.by_name.remove(&object.name);
                }
                self.tags.remove(current);
                stack.extend(object.children);
                removed += 1;
            }
        }
        removed
    }

    /// Remove every child of `id`, keeping `id` itself.
    pub fn clear_children(&mut self, id: ObjectId) -> usize {
        let children = self
            .objects
            .get(id)
            .map(|o| o.children.clone())
            .unwrap_or_default();
        children.into_iter().map(|c| self.remove(c)).sum()
    }

    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.get_mut(id)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<ObjectId> {
        self.by_name.get(name).copied()
    }

    pub fn set_tag(&mut self, id: ObjectId, tag: EntityTag) {
        if self.objects.contains_key(id) {
            self.tags.insert(id, tag);
        }
    }

    pub fn tag(&self, id: ObjectId) -> Option<&EntityTag> {
        self.tags.get(id)
    }

    /// Tag of `id` or of its nearest tagged ancestor.
    pub fn owning_tag(&self, id: ObjectId) -> Option<&EntityTag> {
        let mut current = Some(id);
        while let Some(c) = current {
            if let Some(tag) = self.tags.get(c) {
                return Some(tag);
            }
            current = self.objects.get(c).and_then(|o| o.parent);
        }
        None
    }

    /// Visible leaf objects in depth-first order, skipping hidden subtrees.
    pub fn visible_leaves(&self) -> Vec<ObjectId> {
        let mut leaves = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let Some(object) = self.objects.get(id) else {
                continue;
            };
            if !object.visible {
                continue;
            }
            if object.children.is_empty() {
                if id != self.root {
                    leaves.push(id);
                }
            } else {
                stack.extend(object.children.iter().rev());
            }
        }
        leaves
    }

    /// Every object id in the subtree under `id`, `id` included.
    pub fn subtree(&self, id: ObjectId) -> Vec<ObjectId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(object) = self.objects.get(current) {
                out.push(current);
                stack.extend(object.children.iter().rev());
            }
        }
        out
    }

    /// Entity ids of every tagged object.
    pub fn entity_ids(&self) -> impl Iterator<Item = &str> {
        self.tags.values().map(|t| t.entity_id.as_str())
    }
}
