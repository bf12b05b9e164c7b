//! Scene objects for vertices.

use topograph_core::{layers, Severity, Vertex};
use topograph_layout::Vec3;

use crate::scene_graph::{SceneObject, Shape};
use crate::settings::SettingsStyle;

/// How a vertex is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityRole {
    /// Device with children of its own.
    ParentDevice,
    /// Leaf device.
    ChildDevice,
    Alarm,
    Situation,
    /// Vertex in a layer the viewer has no role for.
    Other,
}

impl EntityRole {
    pub fn of(vertex: &Vertex, has_children: bool) -> Self {
        match vertex.layer_id.as_str() {
            layers::INVENTORY if has_children => EntityRole::ParentDevice,
            layers::INVENTORY => EntityRole::ChildDevice,
            layers::ALARMS => EntityRole::Alarm,
            layers::SITUATIONS => EntityRole::Situation,
            _ => EntityRole::Other,
        }
    }
}

/// Colour for a vertex: severity colour when it carries one.
pub fn vertex_color(vertex: &Vertex, style: &SettingsStyle) -> String {
    vertex
        .severity()
        .map(|s| s.color().to_string())
        .unwrap_or_else(|| style.device_color.clone())
}

/// Colour of connectors leading to `vertex`.
pub fn severity_color(vertex: Option<&Vertex>) -> &'static str {
    vertex
        .and_then(Vertex::severity)
        .unwrap_or(Severity::Indeterminate)
        .color()
}

/// Build the object for one vertex at `position`.
pub fn vertex_object(
    vertex: &Vertex,
    role: EntityRole,
    position: Vec3,
    alarm_size: f32,
    show_label: bool,
    style: &SettingsStyle,
) -> SceneObject {
    let shape = match role {
        EntityRole::ParentDevice => Shape::Box {
            size: style.parent_device_size,
        },
        EntityRole::ChildDevice | EntityRole::Other => Shape::Box {
            size: style.child_device_size,
        },
        EntityRole::Alarm => Shape::Box { size: alarm_size },
        EntityRole::Situation => Shape::Sphere {
            radius: style.situation_radius,
        },
    };
    let object = SceneObject::new(
        format!("vertex-{}", vertex.id),
        shape,
        position,
        vertex_color(vertex, style),
    );
    if show_label && !vertex.label.is_empty() {
        object.with_label(vertex.label.clone())
    } else {
        object
    }
}
