//! Settings structures for the scene.

use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};
use topograph_core::DisplaySettings;
use topograph_layout::{PlacementConfig, SimulationConfig, Vec3};

/// Which layout drives entity positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    /// Deterministic layered/radial placement.
    #[default]
    Placement,
    /// Force-directed layout over the ground plane, heights by layer tier.
    Force,
}

impl LayoutMode {
    pub fn label(self) -> &'static str {
        match self {
            LayoutMode::Placement => "placement",
            LayoutMode::Force => "force",
        }
    }
}

/// Camera framing and animation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view, degrees.
    pub fov_degrees: f32,
    pub aspect: f32,
    /// Fit distance multiplier over the largest extent.
    pub fit_margin: f32,
    /// Distance used when the graph has no extent.
    pub min_distance: f32,
    /// Orbit step per frame while spinning, radians.
    pub spin_step: f32,
    /// Camera offset from a focused entity.
    pub focus_offset: Vec3,
    pub focus_duration_ms: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 45.0,
            aspect: 16.0 / 9.0,
            fit_margin: 1.1,
            min_distance: 100.0,
            spin_step: TAU / 1200.0,
            focus_offset: Vec3::new(0.0, 40.0, 120.0),
            focus_duration_ms: 1000.0,
        }
    }
}

/// Visual sizes and animation timings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsStyle {
    pub parent_device_size: f32,
    pub child_device_size: f32,
    pub situation_radius: f32,
    /// Scale of device models; the main trunk starts at `5.5 * device_scale`.
    pub device_scale: f32,
    pub device_color: String,
    pub inventory_edge_color: String,
    /// Period of the hover ring rotation.
    pub hover_spin_ms: f64,
    pub max_flows: usize,
    pub flow_duration_ms: f64,
}

impl Default for SettingsStyle {
    fn default() -> Self {
        Self {
            parent_device_size: 22.0,
            child_device_size: 14.0,
            situation_radius: 10.0,
            device_scale: 2.0,
            device_color: "#36576B".to_string(),
            inventory_edge_color: "#000000".to_string(),
            hover_spin_ms: 5000.0,
            max_flows: 25,
            flow_duration_ms: 1000.0,
        }
    }
}

/// Everything a [`TopologyView`](crate::TopologyView) is configured with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneSettings {
    pub layout_mode: LayoutMode,
    pub placement: PlacementConfig,
    pub simulation: SimulationConfig,
    pub camera: CameraConfig,
    pub display: DisplaySettings,
    pub style: SettingsStyle,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings_fill_defaults() {
        let settings: SceneSettings =
            serde_json::from_str(r#"{"layout_mode":"force","placement":{"dist_children":25}}"#)
                .unwrap();
        assert_eq!(settings.layout_mode, LayoutMode::Force);
        assert_eq!(settings.placement.dist_children, 25.0);
        assert_eq!(settings.placement.dist_parent, 150.0);
        assert_eq!(settings.style.max_flows, 25);
        assert!(settings.display.show_alarms);
    }
}
