//! The persistence collaborator.
//!
//! `TaskStore` is the request/response surface the board talks to. Any
//! backend error surfaces as `TaskError::PersistenceFailure`. `JsonStore`
//! keeps everything in one JSON document and rewrites it atomically on
//! every mutation.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, TaskError};
use crate::task::{NewTask, SubTask, Task, TaskPatch};

/// Operations the core needs from the backing store.
pub trait TaskStore {
    /// Tasks owned by `user_id`, newest first.
    fn list_tasks(&self, user_id: &str) -> Result<Vec<Task>>;
    fn insert_task(&mut self, new: NewTask) -> Result<Task>;
    fn update_task(&mut self, id: u64, patch: &TaskPatch) -> Result<()>;
    /// Deletes the task together with its sub-tasks.
    fn delete_task(&mut self, id: u64) -> Result<()>;

    fn list_subtasks(&self, task_id: u64) -> Result<Vec<SubTask>>;
    fn insert_subtask(&mut self, task_id: u64, title: &str) -> Result<SubTask>;
    fn set_subtask_completed(&mut self, id: u64, completed: bool) -> Result<()>;
    fn delete_subtask(&mut self, id: u64) -> Result<()>;
}

/// On-disk document.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Database {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub subtasks: Vec<SubTask>,
    /// Highest task id ever handed out. Ids are never reused after a delete.
    #[serde(default)]
    pub last_task_id: u64,
    #[serde(default)]
    pub last_subtask_id: u64,
}

impl Database {
    /// Hand out the next task ID.
    pub fn next_task_id(&mut self) -> u64 {
        let seen = self.tasks.iter().map(|t| t.id).max().unwrap_or(0);
        self.last_task_id = self.last_task_id.max(seen) + 1;
        self.last_task_id
    }

    pub fn next_subtask_id(&mut self) -> u64 {
        let seen = self.subtasks.iter().map(|s| s.id).max().unwrap_or(0);
        self.last_subtask_id = self.last_subtask_id.max(seen) + 1;
        self.last_subtask_id
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }
}

/// File-backed store: `{ "tasks": [...], "subtasks": [...] }`.
#[derive(Debug)]
pub struct JsonStore {
    path: PathBuf,
    db: Database,
}

impl JsonStore {
    /// Open the store at `path`. A missing file is an empty store; an
    /// unreadable or corrupt one is an error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            debug!(path = %path.display(), "no store file yet, starting empty");
            return Ok(JsonStore {
                path,
                db: Database::default(),
            });
        }
        let raw = fs::read_to_string(&path)
            .map_err(|e| TaskError::storage(&format!("reading {}", path.display()), e))?;
        let db: Database = serde_json::from_str(&raw)
            .map_err(|e| TaskError::storage(&format!("parsing {}", path.display()), e))?;
        Ok(JsonStore { path, db })
    }

    /// Apply `f` to a copy of the document, write it, then commit it.
    /// A failed write leaves the in-memory document untouched.
    fn mutate<T>(&mut self, f: impl FnOnce(&mut Database) -> Result<T>) -> Result<T> {
        let mut next = self.db.clone();
        let out = f(&mut next)?;
        save(&next, &self.path).map_err(|e| {
            warn!(path = %self.path.display(), error = %e, "store write failed");
            TaskError::storage(&format!("writing {}", self.path.display()), e)
        })?;
        self.db = next;
        Ok(out)
    }
}

/// Atomic-ish write via temp file + rename.
fn save(db: &Database, path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp = path.with_extension("json.tmp");
    let data = serde_json::to_string_pretty(db)?;
    let mut f = File::create(&tmp)?;
    f.write_all(data.as_bytes())?;
    f.flush()?;
    fs::rename(tmp, path)?;
    Ok(())
}

impl TaskStore for JsonStore {
    fn list_tasks(&self, user_id: &str) -> Result<Vec<Task>> {
        let mut tasks: Vec<Task> = self
            .db
            .tasks
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(tasks)
    }

    fn insert_task(&mut self, new: NewTask) -> Result<Task> {
        self.mutate(|db| {
            let task = Task {
                id: db.next_task_id(),
                user_id: new.user_id,
                title: new.title,
                description: new.description,
                due_date: new.due_date,
                priority: new.priority,
                status: new.status,
                created_at: Utc::now(),
                progress: 0,
            };
            db.tasks.push(task.clone());
            Ok(task)
        })
    }

    fn update_task(&mut self, id: u64, patch: &TaskPatch) -> Result<()> {
        self.mutate(|db| {
            let task = db
                .get_mut(id)
                .ok_or(TaskError::NotFound { entity: "task", id })?;
            patch.apply_to(task);
            Ok(())
        })
    }

    fn delete_task(&mut self, id: u64) -> Result<()> {
        self.mutate(|db| {
            let before = db.tasks.len();
            db.tasks.retain(|t| t.id != id);
            if db.tasks.len() == before {
                return Err(TaskError::NotFound { entity: "task", id });
            }
            db.subtasks.retain(|s| s.task_id != id);
            Ok(())
        })
    }

    fn list_subtasks(&self, task_id: u64) -> Result<Vec<SubTask>> {
        Ok(self
            .db
            .subtasks
            .iter()
            .filter(|s| s.task_id == task_id)
            .cloned()
            .collect())
    }

    fn insert_subtask(&mut self, task_id: u64, title: &str) -> Result<SubTask> {
        self.mutate(|db| {
            if !db.tasks.iter().any(|t| t.id == task_id) {
                return Err(TaskError::NotFound { entity: "task", id: task_id });
            }
            let sub = SubTask {
                id: db.next_subtask_id(),
                task_id,
                title: title.to_string(),
                is_completed: false,
            };
            db.subtasks.push(sub.clone());
            Ok(sub)
        })
    }

    fn set_subtask_completed(&mut self, id: u64, completed: bool) -> Result<()> {
        self.mutate(|db| {
            let sub = db
                .subtasks
                .iter_mut()
                .find(|s| s.id == id)
                .ok_or(TaskError::NotFound { entity: "sub-task", id })?;
            sub.is_completed = completed;
            Ok(())
        })
    }

    fn delete_subtask(&mut self, id: u64) -> Result<()> {
        self.mutate(|db| {
            let before = db.subtasks.len();
            db.subtasks.retain(|s| s.id != id);
            if db.subtasks.len() == before {
                return Err(TaskError::NotFound { entity: "sub-task", id });
            }
            Ok(())
        })
    }
}
