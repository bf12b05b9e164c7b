//! CLI configuration management.
//!
//! Precedence, lowest first: built-in defaults, the JSON config file in the
//! platform config directory, `.env`, environment variables, CLI flags.

use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use topograph_scene::{LayoutMode, SceneSettings};

/// Application-wide configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the graph server.
    pub server_url: String,

    /// Graph id requested from the server.
    pub graph_id: String,

    /// Seconds between refreshes in `topo watch`.
    pub poll_secs: u64,

    /// Subtree size limit sent as `szl`.
    pub szl: u32,

    /// Ask the server to drop devices without alarms.
    pub remove_inventory_with_no_alarms: bool,

    /// Layout, display and camera settings for the scene.
    pub scene: SceneSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8080".to_string(),
            graph_id: "0".to_string(),
            poll_secs: 10,
            szl: 3,
            remove_inventory_with_no_alarms: true,
            scene: SceneSettings::default(),
        }
    }
}

impl Config {
    /// Load configuration from the config file and environment variables.
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_file_path() {
            Some(path) if path.exists() => {
                let contents = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config from {}", path.display()))?;
                serde_json::from_str(&contents).with_context(|| "Failed to parse config file")?
            }
            _ => Self::default(),
        };

        // Load .env file if present (silently ignore if missing)
        let _ = dotenvy::dotenv();

        if let Ok(url) = std::env::var("TOPO_SERVER_URL") {
            config.server_url = url;
        }
        if let Ok(id) = std::env::var("TOPO_GRAPH_ID") {
            config.graph_id = id;
        }
        if let Ok(secs) = std::env::var("TOPO_POLL_SECS") {
            config.poll_secs = secs
                .parse()
                .with_context(|| format!("TOPO_POLL_SECS is not a number: {secs}"))?;
        }
        if let Ok(szl) = std::env::var("TOPO_SZL") {
            config.szl = szl
                .parse()
                .with_context(|| format!("TOPO_SZL is not a number: {szl}"))?;
        }

        Ok(config)
    }

    /// Save current configuration to the config file.
    pub fn save(&self) -> Result<()> {
        if let Some(config_path) = Self::config_file_path() {
            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create config directory: {}", parent.display())
                })?;
            }
            let contents = serde_json::to_string_pretty(self)?;
            std::fs::write(&config_path, contents)
                .with_context(|| format!("Failed to write config to {}", config_path.display()))?;
        }
        Ok(())
    }

    /// Get the path to the config file.
    pub fn config_file_path() -> Option<PathBuf> {
        ProjectDirs::from("dev", "topograph", "topo")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// URL of the configured graph.
    pub fn graph_url(&self) -> String {
        format!("{}/{}", self.server_url.trim_end_matches('/'), self.graph_id)
    }
}

/// Parse a layout mode name.
pub fn parse_layout_mode(value: &str) -> Result<LayoutMode> {
    match value {
        "placement" => Ok(LayoutMode::Placement),
        "force" => Ok(LayoutMode::Force),
        other => anyhow::bail!("Unknown layout mode: {other}. Valid modes: placement, force"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"graph_id":"7","scene":{"layout_mode":"force"}}"#).unwrap();
        assert_eq!(config.graph_id, "7");
        assert_eq!(config.szl, 3);
        assert_eq!(config.scene.layout_mode, LayoutMode::Force);
        assert_eq!(config.scene.placement.dist_children, 40.0);
    }

    #[test]
    fn test_graph_url_joins_cleanly() {
        let config = Config {
            server_url: "http://example.test/graphs/".to_string(),
            ..Default::default()
        };
        assert_eq!(config.graph_url(), "http://example.test/graphs/0");
    }

    #[test]
    fn test_parse_layout_mode() {
        assert_eq!(parse_layout_mode("force").unwrap(), LayoutMode::Force);
        assert!(parse_layout_mode("spring").is_err());
    }
}
