//! Pure connector builders.
//!
//! A builder turns two resolved endpoint positions into the scene objects of
//! one connector. Builders never see the node registry; the reconciler passes
//! positions in and attaches the parts under a group named `edge-<edge id>`.

use serde::{Deserialize, Serialize};
use topograph_core::edge_types;
use topograph_layout::Vec3;

use crate::scene_graph::{SceneObject, Shape};
use crate::settings::LayoutMode;

/// Tube radius of inventory links.
const INVENTORY_RADIUS: f32 = 0.32;
/// Fixed height inventory links are drawn at, just above the ground.
const INVENTORY_HEIGHT: f32 = 0.32;
const ALARM_RADIUS: f32 = 0.3;
const SITUATION_RADIUS: f32 = 0.5;
const TRUNK_RADIUS: f32 = 0.6;
const TRUNK_MARKER_RADIUS: f32 = 1.4;
/// Trunks start on top of the device model.
const TRUNK_BASE_FACTOR: f32 = 5.5;
const HYBRID_RADIUS: f32 = 1.0;

/// Visual family of a connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorStyle {
    /// Device ↔ device link hugging the ground.
    Inventory,
    /// Horizontal link from above a device out to one alarm.
    Alarm,
    /// Situation to one of its alarms.
    Situation,
    /// Vertical trunk from a device up to its alarm cluster, with a joint marker.
    MainTrunk,
    /// Force-layout link: a line while simulating, a tube once settled.
    Hybrid,
}

impl ConnectorStyle {
    /// Style for an edge type. Unknown types fall back to inventory.
    pub fn for_edge(kind: &str, mode: LayoutMode) -> Self {
        if mode == LayoutMode::Force {
            return ConnectorStyle::Hybrid;
        }
        match kind {
            edge_types::ALARM_TO_IO => ConnectorStyle::Alarm,
            edge_types::SITUATION_TO_ALARM => ConnectorStyle::Situation,
            _ => ConnectorStyle::Inventory,
        }
    }
}

/// Scene object name of the connector for `edge_id`.
pub fn connector_name(edge_id: &str) -> String {
    format!("edge-{edge_id}")
}

/// Knobs shared by every builder.
#[derive(Debug, Clone, Copy)]
pub struct ConnectorParams<'a> {
    pub color: &'a str,
    pub device_scale: f32,
    /// Whether the force layout has settled (hybrid only).
    pub settled: bool,
}

fn tube(name: &str, from: Vec3, to: Vec3, radius: f32, color: &str) -> Option<SceneObject> {
    if from.distance(to) <= f32::EPSILON {
        return None;
    }
    Some(SceneObject::new(
        name,
        Shape::Tube { from, to, radius },
        from,
        color,
    ))
}

/// Ground-hugging link between two devices.
pub fn inventory(origin: Vec3, destination: Vec3, color: &str) -> Vec<SceneObject> {
    tube(
        "tube",
        origin.with_y(INVENTORY_HEIGHT),
        destination.with_y(INVENTORY_HEIGHT),
        INVENTORY_RADIUS,
        color,
    )
    .into_iter()
    .collect()
}

/// Link from the trunk above `origin` (a device) to `destination` (an alarm),
/// drawn at the alarm's height.
pub fn alarm(origin: Vec3, destination: Vec3, color: &str) -> Vec<SceneObject> {
    tube(
        "tube",
        origin.with_y(destination.y),
        destination,
        ALARM_RADIUS,
        color,
    )
    .into_iter()
    .collect()
}

/// Straight link from a situation to one of its alarms.
pub fn situation(origin: Vec3, destination: Vec3, color: &str) -> Vec<SceneObject> {
    tube("tube", origin, destination, SITUATION_RADIUS, color)
        .into_iter()
        .collect()
}

/// Vertical trunk from the top of the device at `origin` up to the height of
/// `destination`, a sphere marker at the joint, and the alarm link itself.
pub fn main_trunk(origin: Vec3, destination: Vec3, color: &str, device_scale: f32) -> Vec<SceneObject> {
    let base = origin.with_y(TRUNK_BASE_FACTOR * device_scale);
    let joint = origin.with_y(destination.y);

    let mut parts: Vec<SceneObject> = tube("trunk", base, joint, TRUNK_RADIUS, color)
        .into_iter()
        .collect();
    parts.push(SceneObject::new(
        "marker",
        Shape::Sphere {
            radius: TRUNK_MARKER_RADIUS,
        },
        joint,
        color,
    ));
    parts.extend(alarm(origin, destination, color));
    parts
}

/// Cheap line until the layout settles, then a tube.
pub fn hybrid(origin: Vec3, destination: Vec3, color: &str, settled: bool) -> Vec<SceneObject> {
    if settled {
        return tube("tube", origin, destination, HYBRID_RADIUS, color)
            .into_iter()
            .collect();
    }
    vec![SceneObject::new(
        "line",
        Shape::Line {
            from: origin,
            to: destination,
        },
        origin,
        color,
    )]
}

/// Dispatch on `style`.
pub fn build(
    style: ConnectorStyle,
    origin: Vec3,
    destination: Vec3,
    params: ConnectorParams<'_>,
) -> Vec<SceneObject> {
    match style {
        ConnectorStyle::Inventory => inventory(origin, destination, params.color),
        ConnectorStyle::Alarm => alarm(origin, destination, params.color),
        ConnectorStyle::Situation => situation(origin, destination, params.color),
        ConnectorStyle::MainTrunk => {
            main_trunk(origin, destination, params.color, params.device_scale)
        }
        ConnectorStyle::Hybrid => hybrid(origin, destination, params.color, params.settled),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoints(part: &SceneObject) -> (Vec3, Vec3) {
        match part.shape {
            Shape::Tube { from, to, .. } | Shape::Line { from, to } => (from, to),
            ref other => panic!("not a segment: {other:?}"),
        }
    }

    #[test]
    fn test_inventory_hugs_ground() {
        let parts = inventory(Vec3::new(0.0, 5.0, 0.0), Vec3::new(10.0, 9.0, 0.0), "#000");
        assert_eq!(parts.len(), 1);
        let (from, to) = endpoints(&parts[0]);
        assert_eq!(from.y, INVENTORY_HEIGHT);
        assert_eq!(to.y, INVENTORY_HEIGHT);
    }

    #[test]
    fn test_alarm_origin_raised_to_destination() {
        let parts = alarm(Vec3::ZERO, Vec3::new(10.0, 24.0, 0.0), "#f00");
        let (from, to) = endpoints(&parts[0]);
        assert_eq!(from, Vec3::new(0.0, 24.0, 0.0));
        assert_eq!(to, Vec3::new(10.0, 24.0, 0.0));
    }

    #[test]
    fn test_main_trunk_has_marker_at_joint() {
        let parts = main_trunk(Vec3::ZERO, Vec3::new(10.0, 40.0, 0.0), "#f00", 2.0);
        assert_eq!(parts.len(), 3);
        let (base, joint) = endpoints(&parts[0]);
        assert_eq!(base.y, 11.0);
        assert_eq!(joint.y, 40.0);
        assert!(matches!(parts[1].shape, Shape::Sphere { .. }));
        assert_eq!(parts[1].position, joint);
    }

    #[test]
    fn test_lone_alarm_trunk_skips_zero_length_link() {
        // Alarm straight above the device: the horizontal link degenerates.
        let parts = main_trunk(Vec3::ZERO, Vec3::new(0.0, 20.0, 0.0), "#f00", 2.0);
        assert_eq!(parts.len(), 2);
    }

    #[test]
    fn test_hybrid_switches_on_settle() {
        let a = Vec3::ZERO;
        let b = Vec3::new(3.0, 0.0, 4.0);
        assert!(matches!(hybrid(a, b, "#000", false)[0].shape, Shape::Line { .. }));
        assert!(matches!(hybrid(a, b, "#000", true)[0].shape, Shape::Tube { radius, .. } if radius == 1.0));
    }

    #[test]
    fn test_style_for_edge() {
        assert_eq!(
            ConnectorStyle::for_edge("alarm-to-io", LayoutMode::Placement),
            ConnectorStyle::Alarm
        );
        assert_eq!(
            ConnectorStyle::for_edge("mystery", LayoutMode::Placement),
            ConnectorStyle::Inventory
        );
        assert_eq!(
            ConnectorStyle::for_edge("parent", LayoutMode::Force),
            ConnectorStyle::Hybrid
        );
        assert_eq!(connector_name("e1"), "edge-e1");
    }
}
