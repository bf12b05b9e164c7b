//! Config command implementation.
//!
//! Manages CLI configuration.

use anyhow::Result;

use crate::config::{parse_layout_mode, Config};

/// Show current configuration.
pub fn show(config: &Config) -> Result<()> {
    println!("Topograph CLI Configuration");
    println!("{:-<40}", "");
    println!("Server URL:          {}", config.server_url);
    println!("Graph ID:            {}", config.graph_id);
    println!("Poll Interval:       {}s", config.poll_secs);
    println!("Subtree Size Limit:  {}", config.szl);
    println!(
        "Prune Inventory:     {}",
        config.remove_inventory_with_no_alarms
    );
    println!("Layout Mode:         {}", config.scene.layout_mode.label());

    if let Some(config_path) = Config::config_file_path() {
        println!("\nConfig file: {}", config_path.display());
    }

    Ok(())
}

/// Set a configuration value.
pub fn set(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "server-url" | "url" => config.server_url = value.to_string(),
        "graph-id" | "graph" => config.graph_id = value.to_string(),
        "poll-secs" | "interval" => config.poll_secs = value.parse()?,
        "szl" => config.szl = value.parse()?,
        "prune" => config.remove_inventory_with_no_alarms = value.parse()?,
        "layout-mode" | "mode" => config.scene.layout_mode = parse_layout_mode(value)?,
        _ => {
            anyhow::bail!(
                "Unknown config key: {}. Valid keys: server-url, graph-id, poll-secs, szl, prune, layout-mode",
                key
            );
        }
    }
    println!("Set {} to: {}", key, value);

    config.save()?;
    Ok(())
}

/// Get a configuration value.
pub fn get(config: &Config, key: &str) -> Result<()> {
    let value = match key {
        "server-url" | "url" => config.server_url.clone(),
        "graph-id" | "graph" => config.graph_id.clone(),
        "poll-secs" | "interval" => config.poll_secs.to_string(),
        "szl" => config.szl.to_string(),
        "prune" => config.remove_inventory_with_no_alarms.to_string(),
        "layout-mode" | "mode" => config.scene.layout_mode.label().to_string(),
        _ => {
            anyhow::bail!("Unknown config key: {}", key);
        }
    };

    println!("{}", value);
    Ok(())
}

/// Reset configuration to defaults.
pub fn reset() -> Result<()> {
    let config = Config::default();
    config.save()?;
    println!("Configuration reset to defaults");
    Ok(())
}
