//! Topograph CLI - lay out, diff and watch network topology graphs.
//!
//! Snapshots come from files (`layout`, `diff`) or from a graph server
//! (`watch`, `seek`).

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

mod client;
mod commands;
mod config;

use commands::{config as config_cmd, seek::SeekDirection, watch::WatchOptions};
use config::{parse_layout_mode, Config};

/// Topograph CLI - 3D layout for network topologies.
#[derive(Parser, Debug)]
#[command(
    name = "topo",
    author,
    version,
    about = "Topograph: lay out, diff and watch network topology graphs",
    long_about = None
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Server connection flags shared by `watch` and `seek`.
#[derive(clap::Args, Debug, Default)]
struct ServerArgs {
    /// Graph server base URL.
    #[arg(long)]
    url: Option<String>,

    /// Graph id on the server.
    #[arg(long)]
    graph: Option<String>,

    /// Subtree size limit.
    #[arg(long)]
    szl: Option<u32>,

    /// Ask the server to drop devices without alarms.
    #[arg(long)]
    prune: Option<bool>,
}

impl ServerArgs {
    fn apply(self, config: &mut Config) {
        if let Some(url) = self.url {
            config.server_url = url;
        }
        if let Some(graph) = self.graph {
            config.graph_id = graph;
        }
        if let Some(szl) = self.szl {
            config.szl = szl;
        }
        if let Some(prune) = self.prune {
            config.remove_inventory_with_no_alarms = prune;
        }
    }
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Lay out a snapshot file and print `{id: [x, y, z]}` as JSON.
    Layout {
        /// Snapshot JSON (`vertices`, `edges`, `layers`).
        path: PathBuf,

        /// Layout mode: placement or force.
        #[arg(short, long)]
        mode: Option<String>,

        /// Tick budget for the force layout.
        #[arg(long, default_value_t = 2000)]
        max_ticks: u32,

        /// Write positions to a file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Reconcile two snapshots in order and report what changed.
    Diff {
        /// Earlier snapshot.
        before: PathBuf,

        /// Later snapshot.
        after: PathBuf,

        /// Print the full report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Poll the graph server and keep a live scene.
    Watch {
        #[command(flatten)]
        server: ServerArgs,

        /// Seconds between refreshes.
        #[arg(short, long)]
        interval: Option<u64>,

        /// Point in time (epoch ms); defaults to now.
        #[arg(long)]
        time: Option<i64>,

        /// Center the fetched subtree on this entity.
        #[arg(long)]
        focal_point: Option<String>,

        /// Layout mode: placement or force.
        #[arg(short, long)]
        mode: Option<String>,

        /// Exit after the first snapshot and print its positions.
        #[arg(long)]
        once: bool,
    },

    /// Step through time until a non-empty snapshot is found.
    Seek {
        #[command(flatten)]
        server: ServerArgs,

        /// Starting point (epoch ms); defaults to the middle of the window.
        #[arg(long)]
        time: Option<i64>,

        /// Direction to step in.
        #[arg(short, long, value_enum, default_value = "back")]
        direction: SeekDirection,

        /// Give up after this many one-minute steps.
        #[arg(long, default_value_t = 1440)]
        max_steps: u32,
    },

    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration.
    Show,

    /// Set a configuration value.
    Set {
        /// Configuration key.
        key: String,
        /// Configuration value.
        value: String,
    },

    /// Get a configuration value.
    Get {
        /// Configuration key.
        key: String,
    },

    /// Reset configuration to defaults.
    Reset,

    /// Show path to config file.
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing based on verbosity; RUST_LOG wins when set
    let level = if cli.quiet {
        Level::ERROR
    } else if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::load()?;

    match cli.command {
        Commands::Layout {
            path,
            mode,
            max_ticks,
            output,
        } => {
            if let Some(mode) = mode {
                config.scene.layout_mode = parse_layout_mode(&mode)?;
            }
            commands::layout::execute(&config.scene, &path, max_ticks, output)?;
        }

        Commands::Diff {
            before,
            after,
            json,
        } => {
            commands::diff::execute(&config.scene, &before, &after, json)?;
        }

        Commands::Watch {
            server,
            interval,
            time,
            focal_point,
            mode,
            once,
        } => {
            server.apply(&mut config);
            if let Some(interval) = interval {
                config.poll_secs = interval;
            }
            if let Some(mode) = mode {
                config.scene.layout_mode = parse_layout_mode(&mode)?;
            }
            let options = WatchOptions {
                time,
                focal_point,
                once,
                max_ticks: 2000,
            };
            commands::watch::execute(&config, options).await?;
        }

        Commands::Seek {
            server,
            time,
            direction,
            max_steps,
        } => {
            server.apply(&mut config);
            commands::seek::execute(&config, time, direction, max_steps).await?;
        }

        Commands::Config(config_cmd_inner) => match config_cmd_inner {
            ConfigCommands::Show => {
                config_cmd::show(&config)?;
            }
            ConfigCommands::Set { key, value } => {
                config_cmd::set(&mut config, &key, &value)?;
            }
            ConfigCommands::Get { key } => {
                config_cmd::get(&config, &key)?;
            }
            ConfigCommands::Reset => {
                config_cmd::reset()?;
            }
            ConfigCommands::Path => {
                if let Some(path) = Config::config_file_path() {
                    println!("{}", path.display());
                } else {
                    println!("(no config file path available)");
                }
            }
        },
    }

    Ok(())
}
