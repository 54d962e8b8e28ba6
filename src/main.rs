//! # td
//!
//! Terminal front end for taskdeck.
//!
//! ```bash
//! # Capture something quickly (starts as upcoming)
//! td quick "Call the dentist" --due fri
//!
//! # Add a task with a checklist (starts as ongoing)
//! td add "Move flat" --sub "Book van" --sub "Pack kitchen" --due 2024-06-01 --priority high
//!
//! # Tick things off; the last one completes the task
//! td sub done 2 1
//!
//! # High-priority work due this week, soonest first
//! td list --priority high --due this-week --sort due-date --dir asc
//! ```
//!
//! Data lives in `~/.taskdeck/tasks.json`; settings in `~/.taskdeck/config.toml`.
//! Set `TASKDECK_LOG=debug` to see what the board is doing.

use chrono::Local;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

mod cli;
mod cmd;

use cli::Cli;
use cmd::*;
use taskdeck::board::{Board, BoardSettings};
use taskdeck::config::{self, Config};
use taskdeck::error::Result;
use taskdeck::query::{FilterState, SortState};
use taskdeck::store::JsonStore;
use taskdeck::task::Session;

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_env("TASKDECK_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let config = match config::load_from_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };
    init_tracing(config.log_level());

    if let Err(e) = run(cli, &config) {
        error!(error = %e, "command failed");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli, config: &Config) -> Result<()> {
    let db_path = cli.db.unwrap_or_else(|| config.db_path(&config::data_dir()));
    let today = Local::now().date_naive();

    let store = JsonStore::open(&db_path)?;
    let settings = BoardSettings {
        invariant_policy: config.invariant_policy(),
    };
    let mut board = Board::open(store, Session::new(config.user()), settings, today)?;

    match cli.command {
        Commands::Completions { shell } => {
            cmd_completions(shell);
            Ok(())
        }

        Commands::Add { title, subtasks, desc, due, priority } =>
            cmd_add(&mut board, title, subtasks, desc, due, priority, today),

        Commands::Quick { title, due, priority } => cmd_quick(&mut board, title, due, priority, today),

        Commands::List { priorities, statuses, due, search, sort, dir, limit } => {
            let defaults = config.default_sort();
            let args = ListArgs {
                filters: FilterState { priorities, statuses, due },
                search,
                sort: SortState::new(sort.unwrap_or(defaults.key), dir.unwrap_or(defaults.direction)),
                limit,
            };
            cmd_list(&board, args, today);
            Ok(())
        }

        Commands::View { id } => cmd_view(&board, id, today),

        Commands::Status { id, status } => cmd_status(&mut board, id, status, today),

        Commands::Edit { id, title, desc, due, clear_due, priority } =>
            cmd_edit(&mut board, id, title, desc, due, clear_due, priority, today),

        Commands::Sub { action } => cmd_sub(&mut board, action, today),

        Commands::Delete { id } => cmd_delete(&mut board, id, today),
    }
}
