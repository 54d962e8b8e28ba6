//! Task data structures.
//!
//! `Task` and `SubTask` mirror the rows held by the persistence collaborator.
//! `NewTask` and `TaskPatch` are the insert and partial-update payloads sent
//! to it; neither can carry a progress value.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::fields::*;

/// A user-owned unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub priority: Priority,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    /// Derived from sub-tasks on every load; never stored.
    #[serde(skip)]
    pub progress: u8,
}

/// A checklist item belonging to exactly one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubTask {
    pub id: u64,
    pub task_id: u64,
    pub title: String,
    #[serde(default)]
    pub is_completed: bool,
}

/// Insert payload for a task. The store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub priority: Priority,
    pub status: Status,
}

/// Partial update. `None` leaves a field as it is; `due_date: Some(None)`
/// clears the due date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub due_date: Option<Option<NaiveDate>>,
    pub priority: Option<Priority>,
    pub status: Option<Status>,
}

impl TaskPatch {
    pub fn status(status: Status) -> Self {
        TaskPatch {
            status: Some(status),
            ..TaskPatch::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.due_date.is_none()
            && self.priority.is_none()
            && self.status.is_none()
    }

    /// Apply the patch to a task in place.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(desc) = &self.description {
            task.description = desc.clone();
        }
        if let Some(due) = self.due_date {
            task.due_date = due;
        }
        if let Some(p) = self.priority {
            task.priority = p;
        }
        if let Some(s) = self.status {
            task.status = s;
        }
    }
}

/// The signed-in user, injected into the board instead of read from a global.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
}

impl Session {
    pub fn new(user_id: impl Into<String>) -> Self {
        Session {
            user_id: user_id.into(),
        }
    }
}
