//! # taskdeck
//!
//! Core of a personal task manager: tasks with sub-tasks, a status lifecycle
//! driven by due dates and sub-task completion, and a filter → search → sort
//! pipeline over the task list.
//!
//! ## Pieces
//!
//! - [`lifecycle`]: progress, the overdue predicate, promotion of upcoming
//!   tasks once their due date arrives, and the sub-task driven transitions
//!   (`completed` at 100 %, back to `ongoing` when a completed task gains a
//!   new sub-task).
//! - [`query`]: the pure list pipeline plus the filter and sort state the UI
//!   toggles.
//! - [`store`]: the [`store::TaskStore`] trait the core talks to, and a JSON
//!   file implementation.
//! - [`board`]: the snapshot a UI renders from. Every mutation is sent to the
//!   store and followed by a full reload.
//!
//! ```no_run
//! use chrono::Local;
//! use taskdeck::board::{Board, BoardSettings, TaskForm};
//! use taskdeck::query::TaskQuery;
//! use taskdeck::store::JsonStore;
//! use taskdeck::task::Session;
//!
//! # fn main() -> taskdeck::error::Result<()> {
//! let today = Local::now().date_naive();
//! let store = JsonStore::open("tasks.json")?;
//! let mut board = Board::open(store, Session::new("me"), BoardSettings::default(), today)?;
//! let id = board.quick_add(TaskForm { title: "Renew passport".into(), ..TaskForm::default() }, today)?;
//! board.add_subtask(id, "Book photo appointment", today)?;
//! for row in board.visible(&TaskQuery::default(), today) {
//!     println!("{} {}%", row.task.title, row.progress);
//! }
//! # Ok(())
//! # }
//! ```

pub mod board;
pub mod config;
pub mod dates;
pub mod display;
pub mod error;
pub mod fields;
pub mod lifecycle;
pub mod query;
pub mod store;
pub mod task;
