use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tdv", about = concat!("todoview v", env!("CARGO_PKG_VERSION"), " - a bounded to-do board from sync payloads"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Config file (default: ./todoview.toml)
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a starter config file
    Init(InitArgs),
    /// Run one sync cycle from payload files and print the board
    Render(RenderArgs),
    /// Re-render whenever the payload directory changes or the interval elapses
    Watch(WatchArgs),
    /// Fetch once and republish to several receive configs
    Fanout(FanoutArgs),
    /// List the projects in a payload (for filling in `entry.projects`)
    Projects(ProjectsArgs),
    /// Validate the config and show the normalized rules
    Check,
}

#[derive(Args)]
pub struct InitArgs {
    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct RenderArgs {
    /// Sync payload (JSON)
    #[arg(long)]
    pub payload: PathBuf,
    /// Completed-tasks payload (JSON)
    #[arg(long)]
    pub completed: Option<PathBuf>,
    /// Store the returned sync token in the config file
    #[arg(long)]
    pub save_token: bool,
    /// Evaluate due dates as of this instant (RFC 3339)
    #[arg(long, hide = true)]
    pub at: Option<DateTime<Utc>>,
}

#[derive(Args)]
pub struct WatchArgs {
    /// Directory holding sync.json (and optionally completed.json)
    #[arg(long)]
    pub dir: PathBuf,
    /// Stop after this many cycles
    #[arg(long)]
    pub cycles: Option<usize>,
}

#[derive(Args)]
pub struct FanoutArgs {
    /// Sync payload (JSON)
    #[arg(long)]
    pub payload: PathBuf,
    /// Completed-tasks payload (JSON)
    #[arg(long)]
    pub completed: Option<PathBuf>,
    /// Receive-role config to render (repeatable)
    #[arg(long = "view", required = true)]
    pub views: Vec<PathBuf>,
    /// Evaluate due dates as of this instant (RFC 3339)
    #[arg(long, hide = true)]
    pub at: Option<DateTime<Utc>>,
}

#[derive(Args)]
pub struct ProjectsArgs {
    /// Sync payload (JSON)
    #[arg(long)]
    pub payload: PathBuf,
}
