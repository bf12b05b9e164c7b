//! Deterministic placement of newly appearing entities.
//!
//! Every function here is pure: same inputs, same coordinate. Callers look up
//! parent positions in the [`NodeRegistry`](crate::NodeRegistry) and persist
//! the returned position themselves.

use std::f32::consts::PI;

use serde::{Deserialize, Serialize};

use crate::geometry::Vec3;

/// Which placement family lays out devices and alarms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementStrategy {
    /// Every parent group takes a grid slot; alarms sit on a single ring.
    Grid,
    /// Only root devices take grid slots, nested devices grow around their
    /// parent; alarms climb an outward spiral.
    #[default]
    TreeGrowing,
}

impl PlacementStrategy {
    pub fn spiral_alarms(self) -> bool {
        matches!(self, PlacementStrategy::TreeGrowing)
    }
}

/// Scale constants for placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    pub strategy: PlacementStrategy,
    /// Spacing between parent groups on the grid.
    pub dist_parent: f32,
    /// Radius of the child ring around a parent.
    pub dist_children: f32,
    /// Side of an alarm box.
    pub alarm_size: f32,
    /// Alarms per spiral row before the row widens.
    pub min_count_by_row: usize,
    /// Height step between consecutive alarms on the spiral.
    pub height_between_nodes: f32,
    /// Height of the first alarm above its device.
    pub alarm_offset_from_parent: f32,
    /// Height of a lone child above its parent.
    pub single_child_height: f32,
    /// Height of a situation above its alarms.
    pub situation_height: f32,
    /// Outward offset of a situation away from the device's parent.
    pub situation_offset: f32,
    /// Height between layer tiers.
    pub layer_spacing: f32,
    /// Height used for vertices whose layer is unknown.
    pub fallback_height: f32,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            strategy: PlacementStrategy::default(),
            dist_parent: 150.0,
            dist_children: 40.0,
            alarm_size: 8.0,
            min_count_by_row: 9,
            height_between_nodes: 4.0,
            alarm_offset_from_parent: 20.0,
            single_child_height: 30.0,
            situation_height: 60.0,
            situation_offset: 30.0,
            layer_spacing: 50.0,
            fallback_height: 0.0,
        }
    }
}

/// Ground-plane or vertical axis selector for [`direction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    fn of(self, v: Vec3) -> f32 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
            Axis::Z => v.z,
        }
    }
}

/// Sign of `child - parent` on one axis, `1.0` when they coincide.
pub fn direction(child: Vec3, parent: Vec3, axis: Axis) -> f32 {
    let diff = axis.of(child) - axis.of(parent);
    if diff < 0.0 {
        -1.0
    } else {
        1.0
    }
}

/// Slot `index` of `count` parent groups on the square grid.
pub fn grid_position(index: usize, count: usize, config: &PlacementConfig) -> Vec3 {
    let rows = ((count as f32).sqrt().floor() as usize).max(1);
    let column = index % rows;
    let row = index / rows;
    Vec3::new(
        column as f32 * config.dist_parent,
        0.0,
        row as f32 * config.dist_parent,
    )
}

/// Point on a horizontal ring around `center`.
fn ring_point(center: Vec3, radius: f32, angle_degrees: f32) -> Vec3 {
    let angle = angle_degrees.to_radians();
    Vec3::new(
        center.x + radius * angle.cos(),
        center.y,
        center.z + radius * angle.sin(),
    )
}

/// Child `index` of `count` around `parent`.
///
/// A lone child sits straight above the parent instead of on a 0° ring.
pub fn child_position(parent: Vec3, index: usize, count: usize, config: &PlacementConfig) -> Vec3 {
    if count <= 1 {
        return parent + Vec3::new(0.0, config.single_child_height, 0.0);
    }
    let angle_step = 360.0 / count as f32;
    ring_point(parent, config.dist_children, angle_step * index as f32)
}

/// Spiral row width for alarm `index`.
pub fn count_by_row(index: usize, config: &PlacementConfig) -> usize {
    let min = config.min_count_by_row.max(1);
    min + index / min
}

/// Spiral radius for alarm `index`.
pub fn alarm_spiral_distance(index: usize, config: &PlacementConfig) -> f32 {
    let per_row = count_by_row(index, config) as f32;
    config.alarm_size * ((index + 1) as f32 / per_row) + config.alarm_size * 2.0
}

/// Alarm `index` of `count` raised on the device at `device`.
pub fn alarm_position(device: Vec3, index: usize, count: usize, config: &PlacementConfig) -> Vec3 {
    if count <= 1 {
        return device + Vec3::new(0.0, config.alarm_offset_from_parent, 0.0);
    }

    if !config.strategy.spiral_alarms() {
        let ring = ring_point(device, config.dist_children, 360.0 / count as f32 * index as f32);
        return ring.with_y(device.y + config.alarm_offset_from_parent);
    }

    let angle_step = if count < 10 { 360.0 / count as f32 } else { 36.0 };
    let distance = alarm_spiral_distance(index, config);
    let ring = ring_point(device, distance, angle_step * index as f32);
    ring.with_y(
        device.y + config.height_between_nodes * index as f32 + config.alarm_offset_from_parent,
    )
}

/// Position of a situation marker.
///
/// `alarms` are the resolved positions of its constituent alarms. With a
/// single device the last alarm anchors the marker, otherwise their mean.
/// The marker is pushed up and away from the device's own parent
/// (`[1, 1]` on the ground plane when the device has none).
pub fn situation_position(
    alarms: &[Vec3],
    single_device: bool,
    device: Option<Vec3>,
    device_parent: Option<Vec3>,
    config: &PlacementConfig,
) -> Option<Vec3> {
    let anchor = if single_device {
        *alarms.last()?
    } else {
        Vec3::mean(alarms)?
    };

    let (dx, dz) = match (device, device_parent) {
        (Some(device), Some(parent)) => (
            direction(device, parent, Axis::X),
            direction(device, parent, Axis::Z),
        ),
        _ => (1.0, 1.0),
    };

    Some(Vec3::new(
        anchor.x + dx * config.situation_offset,
        anchor.y + config.situation_height,
        anchor.z + dz * config.situation_offset,
    ))
}

/// Height of a layer tier. Unknown layers use the fallback height.
pub fn layer_height(order: Option<i32>, config: &PlacementConfig) -> f32 {
    match order {
        Some(order) => order.max(0) as f32 * config.layer_spacing,
        None => config.fallback_height,
    }
}

/// Deterministic sunflower spiral for entities with no anchor.
pub fn phyllotaxis(index: usize, height: f32) -> Vec3 {
    let i = index as f32;
    let radius = 10.0 * (0.5 + i).sqrt();
    let angle = i * PI * (3.0 - 5.0_f32.sqrt());
    Vec3::new(radius * angle.cos(), height, radius * angle.sin())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-3;

    fn close(a: Vec3, b: Vec3) -> bool {
        a.distance(b) < EPS
    }

    #[test]
    fn test_four_children_at_quarter_turns() {
        let config = PlacementConfig::default();
        let parent = Vec3::new(100.0, 0.0, 50.0);
        let expected = [
            Vec3::new(140.0, 0.0, 50.0),
            Vec3::new(100.0, 0.0, 90.0),
            Vec3::new(60.0, 0.0, 50.0),
            Vec3::new(100.0, 0.0, 10.0),
        ];
        for (i, want) in expected.iter().enumerate() {
            let got = child_position(parent, i, 4, &config);
            assert!(close(got, *want), "child {i}: {got:?} != {want:?}");
        }
    }

    #[test]
    fn test_child_ring_radius_and_spacing() {
        let config = PlacementConfig::default();
        let parent = Vec3::ZERO;
        for count in 2..=12 {
            let step = 360.0 / count as f32;
            for i in 0..count {
                let p = child_position(parent, i, count, &config);
                assert!((p.planar_distance(parent) - config.dist_children).abs() < EPS);
                let angle = p.z.atan2(p.x).to_degrees().rem_euclid(360.0);
                let want = (step * i as f32).rem_euclid(360.0);
                let diff = (angle - want).abs();
                assert!(diff < 0.01 || (360.0 - diff) < 0.01, "count {count} index {i}");
            }
        }
    }

    #[test]
    fn test_single_child_goes_straight_up() {
        let config = PlacementConfig::default();
        let parent = Vec3::new(7.0, 3.0, -2.0);
        let child = child_position(parent, 0, 1, &config);
        assert_eq!(child.x, parent.x);
        assert_eq!(child.z, parent.z);
        assert!(child.y > parent.y);

        let alarm = alarm_position(parent, 0, 1, &config);
        assert_eq!((alarm.x, alarm.z), (parent.x, parent.z));
        assert_eq!(alarm.y, parent.y + config.alarm_offset_from_parent);
    }

    #[test]
    fn test_spiral_row_wraps_after_min_count() {
        let config = PlacementConfig::default();
        assert_eq!(count_by_row(8, &config), 9);
        assert_eq!(count_by_row(9, &config), 10);

        let row0_step = alarm_spiral_distance(1, &config) - alarm_spiral_distance(0, &config);
        let row1_step = config.alarm_size / count_by_row(9, &config) as f32;
        assert!(row1_step < row0_step);

        let device = Vec3::ZERO;
        let tenth = alarm_position(device, 9, 10, &config);
        // Ten alarms use the fixed 36° step.
        let angle = tenth.z.atan2(tenth.x).to_degrees().rem_euclid(360.0);
        assert!((angle - 324.0).abs() < 0.01);
        assert!((tenth.planar_distance(device) - alarm_spiral_distance(9, &config)).abs() < EPS);
        assert_eq!(tenth.y, 4.0 * 9.0 + 20.0);
    }

    #[test]
    fn test_fixed_angle_alarms_share_height() {
        let config = PlacementConfig {
            strategy: PlacementStrategy::Grid,
            ..Default::default()
        };
        let a = alarm_position(Vec3::ZERO, 0, 3, &config);
        let b = alarm_position(Vec3::ZERO, 2, 3, &config);
        assert_eq!(a.y, b.y);
        assert!((b.planar_distance(Vec3::ZERO) - config.dist_children).abs() < EPS);
    }

    #[test]
    fn test_direction_never_degenerate() {
        let a = Vec3::new(5.0, 0.0, -3.0);
        let b = Vec3::new(1.0, 0.0, 2.0);
        assert_eq!(direction(a, b, Axis::X), 1.0);
        assert_eq!(direction(a, b, Axis::Z), -1.0);
        assert_eq!(direction(a, a, Axis::X), 1.0);
        assert_eq!(direction(a, b, Axis::Y), 1.0);
    }

    #[test]
    fn test_grid_is_roughly_square() {
        let config = PlacementConfig::default();
        assert_eq!(grid_position(0, 9, &config), Vec3::ZERO);
        assert_eq!(grid_position(4, 9, &config), Vec3::new(150.0, 0.0, 150.0));
        assert_eq!(grid_position(3, 10, &config), Vec3::new(0.0, 0.0, 150.0));
        assert_eq!(grid_position(1, 1, &config), Vec3::new(0.0, 0.0, 150.0));
    }

    #[test]
    fn test_situation_offsets_away_from_parent() {
        let config = PlacementConfig::default();
        let alarms = [Vec3::new(0.0, 20.0, 0.0), Vec3::new(10.0, 30.0, 10.0)];
        let device = Vec3::new(0.0, 0.0, 0.0);
        let parent = Vec3::new(50.0, 0.0, -50.0);

        let multi = situation_position(&alarms, false, Some(device), Some(parent), &config).unwrap();
        assert_eq!(multi, Vec3::new(5.0 - 30.0, 25.0 + 60.0, 5.0 + 30.0));

        let single = situation_position(&alarms, true, Some(device), None, &config).unwrap();
        assert_eq!(single, Vec3::new(40.0, 90.0, 40.0));

        assert!(situation_position(&[], false, None, None, &config).is_none());
    }

    #[test]
    fn test_layer_height_and_phyllotaxis() {
        let config = PlacementConfig::default();
        assert_eq!(layer_height(Some(2), &config), 100.0);
        assert_eq!(layer_height(Some(-1), &config), 0.0);
        assert_eq!(layer_height(None, &config), config.fallback_height);

        let p = phyllotaxis(3, 12.0);
        assert_eq!(p, phyllotaxis(3, 12.0));
        assert!((p.planar_distance(Vec3::new(0.0, 12.0, 0.0)) - 10.0 * 3.5_f32.sqrt()).abs() < EPS);
    }
}
