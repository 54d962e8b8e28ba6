//! Command implementations for the CLI interface.
//!
//! Each handler talks to the board, never to the store directly, so every
//! mutation goes through the lifecycle rules and ends with a reload.

use chrono::NaiveDate;
use clap::{CommandFactory, Subcommand};
use clap_complete::{generate, Shell};

use taskdeck::board::{Board, TaskForm};
use taskdeck::dates::parse_due_input;
use taskdeck::display::{print_detail, print_table};
use taskdeck::error::{Result, TaskError};
use taskdeck::fields::*;
use taskdeck::query::{FilterState, SortState, TaskQuery};
use taskdeck::store::TaskStore;
use taskdeck::task::TaskPatch;

use crate::cli::Cli;

#[derive(Subcommand)]
pub enum Commands {
    /// Add a task with its sub-tasks. Starts as ongoing.
    Add {
        /// Short title for the task.
        title: String,
        /// Sub-task title. Repeat for more; at least one is required.
        #[arg(long = "sub", required = true)]
        subtasks: Vec<String>,
        /// Optional longer description.
        #[arg(long)]
        desc: Option<String>,
        /// Due date: YYYY-MM-DD, "today", "tomorrow", "fri", or "in Nd".
        #[arg(long)]
        due: Option<String>,
        /// Priority: low | medium | high.
        #[arg(long, value_enum, ignore_case = true, default_value_t = Priority::Medium)]
        priority: Priority,
    },

    /// Quickly capture a task. Starts as upcoming.
    Quick {
        title: String,
        #[arg(long)]
        due: Option<String>,
        #[arg(long, value_enum, ignore_case = true, default_value_t = Priority::Medium)]
        priority: Priority,
    },

    /// List tasks with optional filters.
    List {
        /// Filter by priority. May be repeated.
        #[arg(long = "priority", value_enum, ignore_case = true)]
        priorities: Vec<Priority>,
        /// Filter by status. May be repeated.
        #[arg(long = "status", value_enum, ignore_case = true)]
        statuses: Vec<Status>,
        /// Due filter: today | this-week | overdue.
        #[arg(long, value_enum)]
        due: Option<DueFilter>,
        /// Case-insensitive text to find in title or description.
        #[arg(long, short)]
        search: Option<String>,
        /// Sort key. Defaults to the configured key (created-at).
        #[arg(long, value_enum)]
        sort: Option<SortKey>,
        /// Sort direction. Defaults to the configured direction (desc).
        #[arg(long, value_enum)]
        dir: Option<SortDirection>,
        /// Limit number of rows printed.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// View a single task and its sub-tasks.
    View { id: u64 },

    /// Set a task's status explicitly.
    Status {
        id: u64,
        #[arg(value_enum, ignore_case = true)]
        status: Status,
    },

    /// Edit task fields.
    Edit {
        id: u64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        desc: Option<String>,
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<String>,
        #[arg(long)]
        clear_due: bool,
        #[arg(long, value_enum, ignore_case = true)]
        priority: Option<Priority>,
    },

    /// Manage sub-tasks.
    Sub {
        #[command(subcommand)]
        action: SubAction,
    },

    /// Delete a task and its sub-tasks.
    Delete { id: u64 },

    /// Generate shell completion scripts.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum SubAction {
    /// Add a sub-task. Reopens a completed task.
    Add { task: u64, title: String },
    /// Mark a sub-task done.
    Done { task: u64, sub: u64 },
    /// Mark a sub-task not done.
    Undo { task: u64, sub: u64 },
    /// Remove a sub-task.
    Rm { task: u64, sub: u64 },
}

/// Options for `list` after defaults have been applied.
pub struct ListArgs {
    pub filters: FilterState,
    pub search: Option<String>,
    pub sort: SortState,
    pub limit: Option<usize>,
}

fn parse_due(raw: Option<String>, today: NaiveDate) -> Result<Option<NaiveDate>> {
    match raw {
        None => Ok(None),
        Some(s) => parse_due_input(&s, today)
            .map(Some)
            .ok_or_else(|| TaskError::Validation(format!("could not understand due date '{s}'"))),
    }
}

pub fn cmd_add<S: TaskStore>(
    board: &mut Board<S>,
    title: String,
    subtasks: Vec<String>,
    desc: Option<String>,
    due: Option<String>,
    priority: Priority,
    today: NaiveDate,
) -> Result<()> {
    let form = TaskForm {
        title,
        description: desc,
        due_date: parse_due(due, today)?,
        priority,
    };
    let id = board.create_task(form, &subtasks, today)?;
    println!("Added {id}");
    Ok(())
}

pub fn cmd_quick<S: TaskStore>(
    board: &mut Board<S>,
    title: String,
    due: Option<String>,
    priority: Priority,
    today: NaiveDate,
) -> Result<()> {
    let form = TaskForm {
        title,
        description: None,
        due_date: parse_due(due, today)?,
        priority,
    };
    let id = board.quick_add(form, today)?;
    println!("Added {id}");
    Ok(())
}

pub fn cmd_list<S: TaskStore>(board: &Board<S>, args: ListArgs, today: NaiveDate) {
    let query = TaskQuery {
        filters: args.filters,
        search: args.search.unwrap_or_default(),
        sort: args.sort,
    };
    let mut rows = board.visible(&query, today);
    if let Some(n) = args.limit {
        rows.truncate(n);
    }
    if rows.is_empty() {
        if query.filters.has_active_filters() || !query.search.trim().is_empty() {
            println!("No tasks match.");
        } else {
            println!("No tasks yet.");
        }
        return;
    }
    print_table(&rows, today);
}

pub fn cmd_view<S: TaskStore>(board: &Board<S>, id: u64, today: NaiveDate) -> Result<()> {
    let task = board.task(id).ok_or(TaskError::NotFound { entity: "task", id })?;
    print_detail(&board.view_of(task, today), board.subtasks(id));
    Ok(())
}

pub fn cmd_status<S: TaskStore>(board: &mut Board<S>, id: u64, status: Status, today: NaiveDate) -> Result<()> {
    board.set_status(id, status, today)?;
    println!("{id} is now {status}");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn cmd_edit<S: TaskStore>(
    board: &mut Board<S>,
    id: u64,
    title: Option<String>,
    desc: Option<String>,
    due: Option<String>,
    clear_due: bool,
    priority: Option<Priority>,
    today: NaiveDate,
) -> Result<()> {
    let due_date = if clear_due {
        Some(None)
    } else {
        parse_due(due, today)?.map(Some)
    };
    let patch = TaskPatch {
        title,
        description: desc.map(|d| if d.trim().is_empty() { None } else { Some(d) }),
        due_date,
        priority,
        status: None,
    };
    if patch.is_empty() {
        println!("Nothing to change.");
        return Ok(());
    }
    board.update_task(id, patch, today)?;
    println!("Updated {id}");
    Ok(())
}

pub fn cmd_sub<S: TaskStore>(board: &mut Board<S>, action: SubAction, today: NaiveDate) -> Result<()> {
    let (task, outcome) = match action {
        SubAction::Add { task, title } => (task, board.add_subtask(task, &title, today)?),
        SubAction::Done { task, sub } => (task, board.set_subtask_completed(task, sub, true, today)?),
        SubAction::Undo { task, sub } => (task, board.set_subtask_completed(task, sub, false, today)?),
        SubAction::Rm { task, sub } => (task, board.remove_subtask(task, sub, today)?),
    };
    match outcome.transition {
        Some(status) => println!("{task}: {}% done, now {status}", outcome.progress),
        None => println!("{task}: {}% done", outcome.progress),
    }
    Ok(())
}

pub fn cmd_delete<S: TaskStore>(board: &mut Board<S>, id: u64, today: NaiveDate) -> Result<()> {
    board.delete_task(id, today)?;
    println!("Deleted {id}");
    Ok(())
}

pub fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "td", &mut std::io::stdout());
}
