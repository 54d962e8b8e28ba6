//! The task board: the in-memory snapshot the UI renders from.
//!
//! The board owns a `TaskStore`, the signed-in `Session`, and the last
//! snapshot the store confirmed. Every mutation goes to the store first and
//! is followed by a full `reload`, so the snapshot is never patched locally.
//! When a store call fails the snapshot is left exactly as it was.

use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::error::{Result, TaskError};
use crate::fields::{Priority, Status};
use crate::lifecycle::{
    is_due_today, is_overdue, on_subtask_change, reconcile_upcoming, resolve_progress, InvariantPolicy,
    Reconciliation, SubtaskChange, SubtaskOutcome,
};
use crate::query::TaskQuery;
use crate::store::TaskStore;
use crate::task::{NewTask, Session, SubTask, Task, TaskPatch};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoardSettings {
    pub invariant_policy: InvariantPolicy,
}

/// User-entered fields shared by the full form and quick-add.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskForm {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub priority: Priority,
}

/// One row of the rendered list.
#[derive(Debug, Clone, Copy)]
pub struct TaskView<'a> {
    pub task: &'a Task,
    pub progress: u8,
    pub overdue: bool,
    pub due_today: bool,
}

pub struct Board<S: TaskStore> {
    store: S,
    session: Session,
    settings: BoardSettings,
    tasks: Vec<Task>,
    subtasks: HashMap<u64, Vec<SubTask>>,
}

impl<S: TaskStore> Board<S> {
    /// An empty board. Call `reload` before reading from it.
    pub fn new(store: S, session: Session, settings: BoardSettings) -> Self {
        Board {
            store,
            session,
            settings,
            tasks: Vec::new(),
            subtasks: HashMap::new(),
        }
    }

    /// Create a board and load its first snapshot.
    pub fn open(store: S, session: Session, settings: BoardSettings, today: NaiveDate) -> Result<Self> {
        let mut board = Board::new(store, session, settings);
        board.reload(today)?;
        Ok(board)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Invalidate and reload: fetch the user's tasks, promote upcoming tasks
    /// whose due date has arrived, then fetch again and hydrate progress.
    pub fn reload(&mut self, today: NaiveDate) -> Result<Reconciliation> {
        let user = self.session.user_id.clone();
        let listed = self.store.list_tasks(&user)?;
        let rec = reconcile_upcoming(&listed, today);
        for id in &rec.to_promote {
            self.store.update_task(*id, &TaskPatch::status(Status::Ongoing))?;
            info!(task = id, "promoted upcoming task to ongoing");
        }
        let mut tasks = if rec.is_noop() {
            listed
        } else {
            self.store.list_tasks(&user)?
        };

        let mut subtasks = HashMap::with_capacity(tasks.len());
        for t in &mut tasks {
            let subs = self.store.list_subtasks(t.id)?;
            let done = subs.iter().filter(|s| s.is_completed).count();
            t.progress = resolve_progress(done, subs.len(), self.settings.invariant_policy)?;
            subtasks.insert(t.id, subs);
        }

        info!(user = %user, tasks = tasks.len(), promoted = rec.to_promote.len(), "board reloaded");
        self.tasks = tasks;
        self.subtasks = subtasks;
        Ok(rec)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: u64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn subtasks(&self, task_id: u64) -> &[SubTask] {
        self.subtasks.get(&task_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The filtered, searched and sorted list with derived flags.
    pub fn visible(&self, query: &TaskQuery, today: NaiveDate) -> Vec<TaskView<'_>> {
        query
            .run(&self.tasks, today)
            .into_iter()
            .map(|task| self.view_of(task, today))
            .collect()
    }

    pub fn view_of<'a>(&'a self, task: &'a Task, today: NaiveDate) -> TaskView<'a> {
        TaskView {
            task,
            progress: task.progress,
            overdue: is_overdue(task, today),
            due_today: is_due_today(task, today),
        }
    }

    /// Full form: starts `ongoing` and needs at least one sub-task.
    pub fn create_task(&mut self, form: TaskForm, subtask_titles: &[String], today: NaiveDate) -> Result<u64> {
        let title = require_title(&form.title)?;
        let subs: Vec<&str> = subtask_titles
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect();
        if subs.is_empty() {
            return Err(TaskError::Validation("add at least one sub-task".into()));
        }

        let new = self.new_task(title, form, Status::Ongoing);
        let task = self.store.insert_task(new)?;
        for s in subs {
            if let Err(e) = self.store.insert_subtask(task.id, s) {
                // Never leave a full-form task behind without its checklist.
                if let Err(undo) = self.store.delete_task(task.id) {
                    warn!(task = task.id, error = %undo, "could not roll back partially created task");
                }
                return Err(e);
            }
        }
        info!(task = task.id, "task created");
        self.reload(today)?;
        Ok(task.id)
    }

    /// Quick-add: title plus optional due date and priority, starts `upcoming`.
    pub fn quick_add(&mut self, form: TaskForm, today: NaiveDate) -> Result<u64> {
        let title = require_title(&form.title)?;
        let new = self.new_task(title, form, Status::Upcoming);
        let task = self.store.insert_task(new)?;
        info!(task = task.id, "task quick-added");
        self.reload(today)?;
        Ok(task.id)
    }

    /// Explicit status change. Bypasses the sub-task rules.
    pub fn set_status(&mut self, id: u64, status: Status, today: NaiveDate) -> Result<()> {
        self.owned(id)?;
        self.store.update_task(id, &TaskPatch::status(status))?;
        info!(task = id, status = %status, "status set");
        self.reload(today)?;
        Ok(())
    }

    pub fn update_task(&mut self, id: u64, mut patch: TaskPatch, today: NaiveDate) -> Result<()> {
        self.owned(id)?;
        if let Some(title) = patch.title.take() {
            patch.title = Some(require_title(&title)?);
        }
        if patch.is_empty() {
            return Ok(());
        }
        self.store.update_task(id, &patch)?;
        info!(task = id, "task updated");
        self.reload(today)?;
        Ok(())
    }

    pub fn delete_task(&mut self, id: u64, today: NaiveDate) -> Result<()> {
        self.owned(id)?;
        self.store.delete_task(id)?;
        info!(task = id, "task deleted");
        self.reload(today)?;
        Ok(())
    }

    pub fn add_subtask(&mut self, task_id: u64, title: &str, today: NaiveDate) -> Result<SubtaskOutcome> {
        self.owned(task_id)?;
        let title = title.trim();
        if title.is_empty() {
            return Err(TaskError::Validation("sub-task title cannot be empty".into()));
        }
        self.store.insert_subtask(task_id, title)?;
        self.after_subtask_change(task_id, SubtaskChange::Added, today)
    }

    pub fn set_subtask_completed(
        &mut self,
        task_id: u64,
        subtask_id: u64,
        completed: bool,
        today: NaiveDate,
    ) -> Result<SubtaskOutcome> {
        self.owned_subtask(task_id, subtask_id)?;
        self.store.set_subtask_completed(subtask_id, completed)?;
        self.after_subtask_change(task_id, SubtaskChange::Toggled, today)
    }

    pub fn toggle_subtask(&mut self, task_id: u64, subtask_id: u64, today: NaiveDate) -> Result<SubtaskOutcome> {
        let completed = self.owned_subtask(task_id, subtask_id)?.is_completed;
        self.set_subtask_completed(task_id, subtask_id, !completed, today)
    }

    pub fn remove_subtask(&mut self, task_id: u64, subtask_id: u64, today: NaiveDate) -> Result<SubtaskOutcome> {
        self.owned_subtask(task_id, subtask_id)?;
        self.store.delete_subtask(subtask_id)?;
        self.after_subtask_change(task_id, SubtaskChange::Removed, today)
    }

    fn after_subtask_change(&mut self, task_id: u64, change: SubtaskChange, today: NaiveDate) -> Result<SubtaskOutcome> {
        let task = self.owned(task_id)?.clone();
        let subs = self.store.list_subtasks(task_id)?;
        let outcome = on_subtask_change(&task, &subs, change);
        if let Some(status) = outcome.transition {
            self.store.update_task(task_id, &TaskPatch::status(status))?;
            info!(task = task_id, progress = outcome.progress, status = %status, "sub-task change moved task");
        }
        self.reload(today)?;
        Ok(outcome)
    }

    fn new_task(&self, title: String, form: TaskForm, status: Status) -> NewTask {
        NewTask {
            user_id: self.session.user_id.clone(),
            title,
            description: form.description.filter(|d| !d.trim().is_empty()),
            due_date: form.due_date,
            priority: form.priority,
            status,
        }
    }

    fn owned(&self, id: u64) -> Result<&Task> {
        self.task(id).ok_or(TaskError::NotFound { entity: "task", id })
    }

    fn owned_subtask(&self, task_id: u64, subtask_id: u64) -> Result<&SubTask> {
        self.owned(task_id)?;
        self.subtasks(task_id)
            .iter()
            .find(|s| s.id == subtask_id)
            .ok_or(TaskError::NotFound {
                entity: "sub-task",
                id: subtask_id,
            })
    }
}

fn require_title(title: &str) -> Result<String> {
    let t = title.trim();
    if t.is_empty() {
        return Err(TaskError::Validation("task title is required".into()));
    }
    Ok(t.to_string())
}
