//! Status lifecycle rules.
//!
//! Keeps a task's status and progress consistent with its sub-tasks and due
//! date. Everything here is a pure function over data already fetched from
//! the store; the board persists whatever transitions these return.

use chrono::NaiveDate;
use tracing::warn;

use crate::error::{Result, TaskError};
use crate::fields::Status;
use crate::task::{SubTask, Task};

/// What to do with sub-task counts that cannot be real (`completed > total`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InvariantPolicy {
    /// Report `InvariantViolation`.
    #[default]
    Strict,
    /// Clamp `completed` to `total` and log a warning.
    Clamp,
}

/// `round_half_up(100 * completed / total)`, or 0 when there are no sub-tasks.
pub fn progress_from_counts(completed: usize, total: usize) -> Result<u8> {
    if completed > total {
        return Err(TaskError::InvariantViolation { completed, total });
    }
    if total == 0 {
        return Ok(0);
    }
    let pct = (200 * completed + total) / (2 * total);
    Ok(pct as u8)
}

/// `progress_from_counts` with the given policy for inconsistent counts.
pub fn resolve_progress(completed: usize, total: usize, policy: InvariantPolicy) -> Result<u8> {
    match progress_from_counts(completed, total) {
        Err(TaskError::InvariantViolation { completed, total }) if policy == InvariantPolicy::Clamp => {
            warn!(completed, total, "clamping inconsistent sub-task counts");
            progress_from_counts(total, total)
        }
        other => other,
    }
}

/// Percentage of completed sub-tasks.
pub fn compute_progress(subtasks: &[SubTask]) -> u8 {
    let done = subtasks.iter().filter(|s| s.is_completed).count();
    // A slice cannot hold more completed items than items.
    progress_from_counts(done, subtasks.len()).unwrap_or(0)
}

/// Not completed and due strictly before today.
pub fn is_overdue(task: &Task, today: NaiveDate) -> bool {
    if task.status == Status::Completed {
        return false;
    }
    matches!(task.due_date, Some(due) if due < today)
}

/// Not completed and due exactly today.
pub fn is_due_today(task: &Task, today: NaiveDate) -> bool {
    task.status != Status::Completed && task.due_date == Some(today)
}

/// Result of one reconciliation pass over a task collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Upcoming tasks whose due date has arrived.
    pub to_promote: Vec<u64>,
    pub unchanged: Vec<u64>,
}

impl Reconciliation {
    pub fn is_noop(&self) -> bool {
        self.to_promote.is_empty()
    }

    /// A copy of `tasks` with every promoted task set to `ongoing`.
    pub fn apply(&self, tasks: &[Task]) -> Vec<Task> {
        tasks
            .iter()
            .map(|t| {
                let mut t = t.clone();
                if self.to_promote.contains(&t.id) {
                    t.status = Status::Ongoing;
                }
                t
            })
            .collect()
    }
}

/// Find upcoming tasks due today or earlier.
///
/// Run once per load; running it on an already reconciled collection finds
/// nothing to promote.
pub fn reconcile_upcoming(tasks: &[Task], today: NaiveDate) -> Reconciliation {
    let mut out = Reconciliation::default();
    for t in tasks {
        let due_arrived = matches!(t.due_date, Some(due) if due <= today);
        if t.status == Status::Upcoming && due_arrived {
            out.to_promote.push(t.id);
        } else {
            out.unchanged.push(t.id);
        }
    }
    out
}

/// The sub-task mutation that triggered a recompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtaskChange {
    Added,
    Toggled,
    Removed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubtaskOutcome {
    pub progress: u8,
    pub transition: Option<Status>,
}

/// Recompute progress after a sub-task mutation and decide the implicit
/// status transition, if any.
///
/// `subtasks` is the task's full sub-task list after the change. Transitions
/// look at the counts, not the rounded percentage: 199 of 200 shows as 100
/// but is not done.
pub fn on_subtask_change(task: &Task, subtasks: &[SubTask], change: SubtaskChange) -> SubtaskOutcome {
    let progress = compute_progress(subtasks);
    let any_open = subtasks.iter().any(|s| !s.is_completed);
    let all_done = !subtasks.is_empty() && !any_open;
    let transition = if all_done && task.status != Status::Completed {
        Some(Status::Completed)
    } else if change == SubtaskChange::Added && task.status == Status::Completed && any_open {
        Some(Status::Ongoing)
    } else {
        None
    };
    SubtaskOutcome { progress, transition }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::fields::Priority;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 15).unwrap()
    }

    fn task(id: u64, status: Status, due: Option<NaiveDate>) -> Task {
        Task {
            id,
            user_id: "u1".into(),
            title: format!("task {id}"),
            description: None,
            due_date: due,
            priority: Priority::Medium,
            status,
            created_at: Utc::now(),
            progress: 0,
        }
    }

    fn subs(done: usize, total: usize) -> Vec<SubTask> {
        (0..total)
            .map(|i| SubTask {
                id: i as u64 + 1,
                task_id: 1,
                title: format!("step {i}"),
                is_completed: i < done,
            })
            .collect()
    }

    #[test]
    fn test_progress_rounding() {
        assert_eq!(progress_from_counts(0, 0).unwrap(), 0);
        assert_eq!(progress_from_counts(2, 4).unwrap(), 50);
        assert_eq!(progress_from_counts(2, 3).unwrap(), 67);
        assert_eq!(progress_from_counts(1, 3).unwrap(), 33);
        assert_eq!(progress_from_counts(1, 8).unwrap(), 13);
        assert_eq!(progress_from_counts(3, 3).unwrap(), 100);
        assert_eq!(compute_progress(&[]), 0);
        assert_eq!(compute_progress(&subs(1, 2)), 50);
    }

    #[test]
    fn test_progress_rejects_impossible_counts() {
        assert_eq!(
            progress_from_counts(3, 2),
            Err(TaskError::InvariantViolation { completed: 3, total: 2 })
        );
        assert!(resolve_progress(3, 2, InvariantPolicy::Strict).is_err());
        assert_eq!(resolve_progress(3, 2, InvariantPolicy::Clamp).unwrap(), 100);
        assert_eq!(resolve_progress(1, 0, InvariantPolicy::Clamp).unwrap(), 0);
    }

    #[test]
    fn test_overdue_boundaries() {
        let yesterday = today() - Duration::days(1);
        assert!(is_overdue(&task(1, Status::Ongoing, Some(yesterday)), today()));
        assert!(is_overdue(&task(1, Status::Upcoming, Some(yesterday)), today()));
        assert!(!is_overdue(&task(1, Status::Ongoing, Some(today())), today()));
        assert!(!is_overdue(&task(1, Status::Ongoing, None), today()));
        assert!(!is_overdue(&task(1, Status::Completed, Some(yesterday)), today()));
        assert!(is_due_today(&task(1, Status::Ongoing, Some(today())), today()));
        assert!(!is_due_today(&task(1, Status::Completed, Some(today())), today()));
    }

    #[test]
    fn test_reconcile_promotes_due_upcoming() {
        let tasks = vec![
            task(1, Status::Upcoming, Some(today() - Duration::days(1))),
            task(2, Status::Upcoming, Some(today())),
            task(3, Status::Upcoming, Some(today() + Duration::days(1))),
            task(4, Status::Upcoming, None),
            task(5, Status::Completed, Some(today() - Duration::days(3))),
        ];
        let rec = reconcile_upcoming(&tasks, today());
        assert_eq!(rec.to_promote, vec![1, 2]);
        assert_eq!(rec.unchanged, vec![3, 4, 5]);

        let applied = rec.apply(&tasks);
        assert_eq!(applied[0].status, Status::Ongoing);
        assert_eq!(applied[4].status, Status::Completed);
        assert!(reconcile_upcoming(&applied, today()).is_noop());
        assert_eq!(reconcile_upcoming(&applied, today()).apply(&applied), applied);
    }

    #[test]
    fn test_completing_last_subtask_completes_task() {
        let t = task(1, Status::Ongoing, None);
        let out = on_subtask_change(&t, &subs(2, 4), SubtaskChange::Toggled);
        assert_eq!(out, SubtaskOutcome { progress: 50, transition: None });

        let out = on_subtask_change(&t, &subs(4, 4), SubtaskChange::Toggled);
        assert_eq!(out.progress, 100);
        assert_eq!(out.transition, Some(Status::Completed));
    }

    #[test]
    fn test_adding_subtask_reopens_completed_task() {
        let t = task(1, Status::Completed, None);
        let out = on_subtask_change(&t, &subs(2, 3), SubtaskChange::Added);
        assert_eq!(out.progress, 67);
        assert_eq!(out.transition, Some(Status::Ongoing));
    }

    #[test]
    fn test_no_other_implicit_transitions() {
        // Unticking a sub-task of a completed task leaves the status alone.
        let t = task(1, Status::Completed, None);
        assert_eq!(on_subtask_change(&t, &subs(1, 2), SubtaskChange::Toggled).transition, None);

        // Removing every sub-task never completes or reopens anything.
        let t = task(1, Status::Ongoing, None);
        assert_eq!(
            on_subtask_change(&t, &[], SubtaskChange::Removed),
            SubtaskOutcome { progress: 0, transition: None }
        );

        // Already completed at 100% stays put.
        let t = task(1, Status::Completed, None);
        assert_eq!(on_subtask_change(&t, &subs(2, 2), SubtaskChange::Toggled).transition, None);
    }

    #[test]
    fn test_rounded_hundred_is_not_done() {
        let t = task(1, Status::Ongoing, None);
        let out = on_subtask_change(&t, &subs(199, 200), SubtaskChange::Toggled);
        assert_eq!(out, SubtaskOutcome { progress: 100, transition: None });

        let t = task(1, Status::Completed, None);
        let out = on_subtask_change(&t, &subs(199, 200), SubtaskChange::Added);
        assert_eq!(out, SubtaskOutcome { progress: 100, transition: Some(Status::Ongoing) });
    }

    #[test]
    fn test_removing_last_open_subtask_completes_task() {
        let t = task(1, Status::Upcoming, None);
        let out = on_subtask_change(&t, &subs(2, 2), SubtaskChange::Removed);
        assert_eq!(out.transition, Some(Status::Completed));
    }
}
