use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// Personal task manager.
/// Storage defaults to ~/.taskdeck/tasks.json or a path passed via --db.
#[derive(Parser)]
#[command(name = "td", version, about = "Tasks, sub-tasks and a tidy list")]
pub struct Cli {
    /// Path to the JSON task store.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Path to the config file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}
