//! `topo watch`: poll the graph server and keep a live scene up to date.
//!
//! Fetches run as background tasks so a slow server never stalls the frame
//! loop. Every fetch carries a refresh ticket; a response older than the last
//! applied one is dropped by the view.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use topograph_core::GraphModel;
use topograph_scene::{RefreshTicket, TopologyView};

use super::{settle, FRAME_MS};
use crate::client::{GraphQuery, ModelClient};
use crate::config::Config;

/// Per-invocation options on top of [`Config`].
#[derive(Debug, Clone, Default)]
pub struct WatchOptions {
    /// Fixed point in time; the current time when unset.
    pub time: Option<i64>,
    pub focal_point: Option<String>,
    /// Exit after the first applied snapshot.
    pub once: bool,
    /// Tick budget for settling the force layout in `once` mode.
    pub max_ticks: u32,
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

type FetchResult = (RefreshTicket, Result<GraphModel>);

/// Execute the watch command until Ctrl-C (or after one snapshot with `once`).
pub async fn execute(config: &Config, options: WatchOptions) -> Result<()> {
    let client = ModelClient::new(config);
    let mut view = TopologyView::new(config.scene.clone());

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            cancel.cancel();
        });
    }

    let (tx, mut rx) = mpsc::channel::<FetchResult>(8);
    let mut poll = interval(Duration::from_secs(config.poll_secs.max(1)));
    let mut frame = interval(Duration::from_secs_f64(FRAME_MS / 1000.0));
    frame.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let started = Instant::now();

    eprintln!("👀 Watching {} every {}s", config.graph_url(), config.poll_secs.max(1));
    eprintln!("   Press Ctrl+C to stop");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                eprintln!("\n👋 Shutting down.");
                break;
            }

            _ = poll.tick() => {
                let ticket = view.begin_refresh();
                let mut query = GraphQuery::new(config, options.time.unwrap_or_else(now_ms));
                query.focal_point = options.focal_point.clone();
                let client = client.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    let result = client.fetch(&query).await;
                    let _ = tx.send((ticket, result)).await;
                });
            }

            Some((ticket, result)) = rx.recv() => {
                let model = match result {
                    Ok(model) => model,
                    Err(e) if options.once => return Err(e),
                    Err(e) => {
                        tracing::warn!(error = %e, ticket = ticket.generation(), "refresh failed");
                        continue;
                    }
                };
                let Some(report) = view.on_refresh_response(ticket, &model) else {
                    continue;
                };
                if !report.is_noop() {
                    eprintln!(
                        "🔄 +{} -{} vertices, +{} -{} edges ({} entities)",
                        report.added_vertices.len(),
                        report.removed_vertices.len(),
                        report.added_edges.len(),
                        report.removed_edges.len(),
                        view.context().registry().len(),
                    );
                }
                if options.once {
                    settle(&mut view, options.max_ticks);
                    let positions = view.context().registry().positions();
                    println!("{}", serde_json::to_string_pretty(&positions)?);
                    break;
                }
            }

            _ = frame.tick() => {
                view.tick(started.elapsed().as_secs_f64() * 1000.0);
            }
        }
    }

    cancel.cancel();
    Ok(())
}
