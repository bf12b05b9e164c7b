//! HTTP client for the graph server.

use anyhow::{Context, Result};
use topograph_core::{GraphMetadata, GraphModel};

use crate::config::Config;

/// Query parameters of a graph fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphQuery {
    /// Point in time, epoch milliseconds.
    pub time: i64,
    pub szl: u32,
    pub remove_inventory_with_no_alarms: bool,
    pub focal_point: Option<String>,
}

impl GraphQuery {
    pub fn new(config: &Config, time: i64) -> Self {
        Self {
            time,
            szl: config.szl,
            remove_inventory_with_no_alarms: config.remove_inventory_with_no_alarms,
            focal_point: None,
        }
    }

    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("time", self.time.to_string()),
            ("szl", self.szl.to_string()),
            (
                "removeInventoryWithNoAlarms",
                self.remove_inventory_with_no_alarms.to_string(),
            ),
        ];
        if let Some(focal) = &self.focal_point {
            params.push(("focalPoint", focal.clone()));
        }
        params
    }
}

/// Fetches snapshots and metadata of one graph.
#[derive(Debug, Clone)]
pub struct ModelClient {
    http: reqwest::Client,
    graph_url: String,
}

impl ModelClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            graph_url: config.graph_url(),
        }
    }

    pub async fn fetch(&self, query: &GraphQuery) -> Result<GraphModel> {
        tracing::debug!(url = %self.graph_url, time = query.time, "fetching graph");
        let body = self
            .http
            .get(&self.graph_url)
            .query(&query.params())
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", self.graph_url))?
            .error_for_status()?
            .text()
            .await?;
        GraphModel::from_json(&body).context("Failed to decode graph")
    }

    pub async fn metadata(&self) -> Result<GraphMetadata> {
        let url = format!("{}/metadata", self.graph_url);
        let metadata = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to reach {url}"))?
            .error_for_status()?
            .json::<GraphMetadata>()
            .await
            .context("Failed to decode graph metadata")?;
        Ok(metadata)
    }
}
