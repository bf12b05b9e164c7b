//! `topo seek`: time travel to the nearest point with data.

use anyhow::{Context, Result};
use clap::ValueEnum;
use topograph_core::TimeMetadata;

use crate::client::{GraphQuery, ModelClient};
use crate::config::Config;

/// One step of the time slider.
pub const STEP_MS: i64 = 60_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SeekDirection {
    Back,
    Forward,
}

/// Next point in time one step away, or `None` once it leaves the window.
pub fn next_time(time: i64, direction: SeekDirection, window: &TimeMetadata) -> Option<i64> {
    let next = match direction {
        SeekDirection::Back => time.checked_sub(STEP_MS)?,
        SeekDirection::Forward => time.checked_add(STEP_MS)?,
    };
    window.contains(next).then_some(next)
}

/// Execute the seek command.
pub async fn execute(
    config: &Config,
    time: Option<i64>,
    direction: SeekDirection,
    max_steps: u32,
) -> Result<()> {
    let client = ModelClient::new(config);
    let metadata = client.metadata().await?;
    let window = metadata.time_metadata;
    window.validate().context("Server sent an invalid time window")?;

    let mut time = time.unwrap_or_else(|| window.midpoint_ms()).clamp(window.start_ms, window.end_ms);
    for step in 0..=max_steps {
        let model = client.fetch(&GraphQuery::new(config, time)).await?;
        if !model.is_empty() {
            tracing::info!(time, step, "found data");
            println!("{time}");
            eprintln!(
                "🕐 {} vertices, {} edges at {time} ({step} steps)",
                model.vertices.len(),
                model.edges.len()
            );
            return Ok(());
        }
        tracing::debug!(time, "empty snapshot");
        match next_time(time, direction, &window) {
            Some(next) => time = next,
            None => break,
        }
    }

    anyhow::bail!(
        "No data found {} from the requested time within [{}, {}]",
        match direction {
            SeekDirection::Back => "before",
            SeekDirection::Forward => "after",
        },
        window.start_ms,
        window.end_ms
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> TimeMetadata {
        TimeMetadata {
            start_ms: 0,
            end_ms: 180_000,
            annotations: Vec::new(),
        }
    }

    #[test]
    fn test_steps_one_minute() {
        assert_eq!(next_time(60_000, SeekDirection::Forward, &window()), Some(120_000));
        assert_eq!(next_time(60_000, SeekDirection::Back, &window()), Some(0));
    }

    #[test]
    fn test_never_leaves_window() {
        assert_eq!(next_time(0, SeekDirection::Back, &window()), None);
        assert_eq!(next_time(150_000, SeekDirection::Forward, &window()), None);
    }
}
