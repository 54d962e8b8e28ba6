//! The task list query pipeline.
//!
//! Filter, then search, then sort. Each stage borrows from the input
//! collection and never mutates it, so the pipeline can be rerun on every
//! parameter change.

use std::cmp::Ordering;

use chrono::NaiveDate;
use tracing::debug;

use crate::dates::end_of_week;
use crate::error::Result;
use crate::fields::*;
use crate::lifecycle::is_overdue;
use crate::task::Task;

/// Active filters. Dimensions are ANDed; values within a dimension are ORed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub priorities: Vec<Priority>,
    pub statuses: Vec<Status>,
    pub due: Option<DueFilter>,
}

impl FilterState {
    /// Build filters from raw UI strings. An empty `due` means no due-date filter.
    pub fn from_raw(priorities: &[&str], statuses: &[&str], due: &str) -> Result<Self> {
        let priorities = priorities
            .iter()
            .map(|p| p.parse())
            .collect::<Result<Vec<Priority>>>()?;
        let statuses = statuses
            .iter()
            .map(|s| s.parse())
            .collect::<Result<Vec<Status>>>()?;
        let due = if due.trim().is_empty() {
            None
        } else {
            Some(due.parse()?)
        };
        Ok(FilterState {
            priorities,
            statuses,
            due,
        })
    }

    pub fn toggle_priority(&mut self, p: Priority) {
        if let Some(pos) = self.priorities.iter().position(|x| *x == p) {
            self.priorities.remove(pos);
        } else {
            self.priorities.push(p);
        }
    }

    pub fn toggle_status(&mut self, s: Status) {
        if let Some(pos) = self.statuses.iter().position(|x| *x == s) {
            self.statuses.remove(pos);
        } else {
            self.statuses.push(s);
        }
    }

    /// Single-select: picking the active value clears it, anything else replaces it.
    pub fn select_due(&mut self, f: DueFilter) {
        self.due = if self.due == Some(f) { None } else { Some(f) };
    }

    pub fn has_active_filters(&self) -> bool {
        !self.priorities.is_empty() || !self.statuses.is_empty() || self.due.is_some()
    }

    /// Whether a task survives every active filter.
    pub fn matches(&self, task: &Task, today: NaiveDate) -> bool {
        matches_priority(task, &self.priorities)
            && matches_status(task, &self.statuses)
            && matches_due(task, self.due, today)
    }
}

pub fn clear_filters() -> FilterState {
    FilterState::default()
}

fn matches_priority(task: &Task, priorities: &[Priority]) -> bool {
    priorities.is_empty() || priorities.contains(&task.priority)
}

fn matches_status(task: &Task, statuses: &[Status]) -> bool {
    statuses.is_empty() || statuses.contains(&task.status)
}

fn matches_due(task: &Task, due: Option<DueFilter>, today: NaiveDate) -> bool {
    match due {
        None => true,
        Some(DueFilter::Today) => task.due_date == Some(today),
        Some(DueFilter::ThisWeek) => match task.due_date {
            Some(d) => d >= today && d <= end_of_week(today),
            None => false,
        },
        Some(DueFilter::Overdue) => is_overdue(task, today),
    }
}

/// Active sort key and direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortState {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortState {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        SortState { key, direction }
    }

    pub fn from_raw(key: &str, direction: &str) -> Result<Self> {
        Ok(SortState {
            key: key.parse()?,
            direction: direction.parse()?,
        })
    }

    /// Selecting the active key flips direction; a new key starts descending.
    pub fn select(&mut self, key: SortKey) {
        if self.key == key {
            self.direction = self.direction.flipped();
        } else {
            self.key = key;
            self.direction = SortDirection::Desc;
        }
    }

    /// Back to newest first.
    pub fn reset(&mut self) {
        *self = SortState::default();
    }
}

/// Everything the pipeline needs besides the tasks and the date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    pub filters: FilterState,
    pub search: String,
    pub sort: SortState,
}

impl TaskQuery {
    pub fn run<'a>(&self, tasks: &'a [Task], today: NaiveDate) -> Vec<&'a Task> {
        apply_filters_search_and_sort(tasks, &self.filters, &self.search, self.sort, today)
    }
}

/// Filter stage.
pub fn apply_filters<'a>(tasks: &'a [Task], filters: &FilterState, today: NaiveDate) -> Vec<&'a Task> {
    tasks.iter().filter(|t| filters.matches(t, today)).collect()
}

/// Search stage: trimmed, case-insensitive substring over title or description.
pub fn search_tasks<'a>(tasks: Vec<&'a Task>, query: &str) -> Vec<&'a Task> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return tasks;
    }
    tasks
        .into_iter()
        .filter(|t| {
            t.title.to_lowercase().contains(&needle)
                || t.description
                    .as_deref()
                    .is_some_and(|d| d.to_lowercase().contains(&needle))
        })
        .collect()
}

/// Sort stage. Stable, so equal keys keep their input order.
pub fn sort_tasks(tasks: &mut [&Task], sort: SortState) {
    tasks.sort_by(|a, b| compare(a, b, sort));
}

fn compare(a: &Task, b: &Task, sort: SortState) -> Ordering {
    let dir = sort.direction;
    match sort.key {
        SortKey::CreatedAt => directed(a.created_at.cmp(&b.created_at), dir),
        SortKey::DueDate => nulls_last(a.due_date, b.due_date, dir),
        SortKey::Priority => directed(a.priority.rank().cmp(&b.priority.rank()), dir),
        SortKey::Progress => directed(a.progress.cmp(&b.progress), dir),
    }
}

fn directed(ord: Ordering, dir: SortDirection) -> Ordering {
    match dir {
        SortDirection::Asc => ord,
        SortDirection::Desc => ord.reverse(),
    }
}

/// Missing values go last in both directions.
fn nulls_last<T: Ord>(a: Option<T>, b: Option<T>, dir: SortDirection) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => directed(a.cmp(&b), dir),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// The full pipeline: filter, search, sort.
pub fn apply_filters_search_and_sort<'a>(
    tasks: &'a [Task],
    filters: &FilterState,
    query: &str,
    sort: SortState,
    today: NaiveDate,
) -> Vec<&'a Task> {
    let filtered = apply_filters(tasks, filters, today);
    let filtered_len = filtered.len();
    let mut out = search_tasks(filtered, query);
    sort_tasks(&mut out, sort);
    debug!(
        input = tasks.len(),
        filtered = filtered_len,
        visible = out.len(),
        "query pipeline"
    );
    out
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::TaskError;

    // Wednesday.
    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 15).unwrap()
    }

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, minute, 0).unwrap()
    }

    fn task(id: u64, title: &str) -> Task {
        Task {
            id,
            user_id: "u1".into(),
            title: title.into(),
            description: None,
            due_date: None,
            priority: Priority::Medium,
            status: Status::Ongoing,
            created_at: at(id as u32),
            progress: 0,
        }
    }

    fn ids(tasks: &[&Task]) -> Vec<u64> {
        tasks.iter().map(|t| t.id).collect()
    }

    #[test]
    fn test_priority_filter_keeps_only_selected() {
        let mut high = task(1, "ship");
        high.priority = Priority::High;
        high.due_date = Some(today());
        let mut low = task(2, "tidy");
        low.priority = Priority::Low;
        low.due_date = Some(today() - Duration::days(1));
        let tasks = vec![high, low];

        let filters = FilterState::from_raw(&["High"], &[], "").unwrap();
        assert_eq!(ids(&apply_filters(&tasks, &filters, today())), vec![1]);
    }

    #[test]
    fn test_filters_are_anded_across_dimensions() {
        let mut a = task(1, "a");
        a.priority = Priority::High;
        a.status = Status::Upcoming;
        let mut b = task(2, "b");
        b.priority = Priority::High;
        b.status = Status::Completed;
        let mut c = task(3, "c");
        c.priority = Priority::Low;
        c.status = Status::Upcoming;
        let tasks = vec![a, b, c];

        let filters = FilterState::from_raw(&["high", "medium"], &["Upcoming"], "").unwrap();
        assert_eq!(ids(&apply_filters(&tasks, &filters, today())), vec![1]);
    }

    #[test]
    fn test_due_filters() {
        let mut due_today = task(1, "today");
        due_today.due_date = Some(today());
        let mut sunday = task(2, "sunday");
        sunday.due_date = Some(today() + Duration::days(4));
        let mut next_monday = task(3, "next monday");
        next_monday.due_date = Some(today() + Duration::days(5));
        let mut late = task(4, "late");
        late.due_date = Some(today() - Duration::days(2));
        let mut late_done = task(5, "late but done");
        late_done.due_date = Some(today() - Duration::days(2));
        late_done.status = Status::Completed;
        let undated = task(6, "whenever");
        let tasks = vec![due_today, sunday, next_monday, late, late_done, undated];

        let run = |f: DueFilter| {
            let filters = FilterState {
                due: Some(f),
                ..FilterState::default()
            };
            ids(&apply_filters(&tasks, &filters, today()))
        };
        assert_eq!(run(DueFilter::Today), vec![1]);
        assert_eq!(run(DueFilter::ThisWeek), vec![1, 2]);
        assert_eq!(run(DueFilter::Overdue), vec![4]);
    }

    #[test]
    fn test_unknown_keys_are_invalid_parameters() {
        assert!(matches!(
            FilterState::from_raw(&["Urgent"], &[], ""),
            Err(TaskError::InvalidParameter { kind: "priority", .. })
        ));
        assert!(matches!(
            FilterState::from_raw(&[], &["blocked"], ""),
            Err(TaskError::InvalidParameter { kind: "status", .. })
        ));
        assert!(matches!(
            FilterState::from_raw(&[], &[], "Next Month"),
            Err(TaskError::InvalidParameter { .. })
        ));
        assert!(matches!(
            SortState::from_raw("title", "asc"),
            Err(TaskError::InvalidParameter { kind: "sort key", .. })
        ));
        assert!(matches!(
            SortState::from_raw("priority", "up"),
            Err(TaskError::InvalidParameter { kind: "sort direction", .. })
        ));
    }

    #[test]
    fn test_search_matches_title_or_description() {
        let mut a = task(1, "Write Report");
        a.description = Some("quarterly numbers".into());
        let b = task(2, "Call plumber");
        let mut c = task(3, "Groceries");
        c.description = Some("milk, eggs, REPORT card".into());
        let tasks = vec![a, b, c];
        let all: Vec<&Task> = tasks.iter().collect();

        assert_eq!(ids(&search_tasks(all.clone(), "  report ")), vec![1, 3]);
        assert_eq!(ids(&search_tasks(all.clone(), "PLUMB")), vec![2]);
        assert_eq!(ids(&search_tasks(all.clone(), "   ")), vec![1, 2, 3]);
        assert_eq!(ids(&search_tasks(all, "")), vec![1, 2, 3]);
    }

    #[test]
    fn test_due_date_sort_puts_undated_last_both_ways() {
        let mut a = task(1, "a");
        a.due_date = Some(today() + Duration::days(3));
        let b = task(2, "undated");
        let mut c = task(3, "c");
        c.due_date = Some(today());
        let tasks = vec![a, b, c];

        let asc = apply_filters_search_and_sort(
            &tasks,
            &clear_filters(),
            "",
            SortState::new(SortKey::DueDate, SortDirection::Asc),
            today(),
        );
        assert_eq!(ids(&asc), vec![3, 1, 2]);

        let desc = apply_filters_search_and_sort(
            &tasks,
            &clear_filters(),
            "",
            SortState::new(SortKey::DueDate, SortDirection::Desc),
            today(),
        );
        assert_eq!(ids(&desc), vec![1, 3, 2]);
    }

    #[test]
    fn test_sort_is_stable_for_ties() {
        let mut tasks: Vec<Task> = (1..=5).map(|i| task(i, "same")).collect();
        tasks[1].priority = Priority::High;
        tasks[3].priority = Priority::High;

        let sorted = apply_filters_search_and_sort(
            &tasks,
            &clear_filters(),
            "",
            SortState::new(SortKey::Priority, SortDirection::Desc),
            today(),
        );
        assert_eq!(ids(&sorted), vec![2, 4, 1, 3, 5]);

        let sorted = apply_filters_search_and_sort(
            &tasks,
            &clear_filters(),
            "",
            SortState::new(SortKey::Priority, SortDirection::Asc),
            today(),
        );
        assert_eq!(ids(&sorted), vec![1, 3, 5, 2, 4]);
    }

    #[test]
    fn test_progress_sort() {
        let mut tasks: Vec<Task> = (1..=3).map(|i| task(i, "t")).collect();
        tasks[0].progress = 50;
        tasks[1].progress = 100;
        tasks[2].progress = 0;
        let sorted = apply_filters_search_and_sort(
            &tasks,
            &clear_filters(),
            "",
            SortState::new(SortKey::Progress, SortDirection::Asc),
            today(),
        );
        assert_eq!(ids(&sorted), vec![3, 1, 2]);
    }

    #[test]
    fn test_default_view_is_newest_first() {
        let tasks: Vec<Task> = vec![task(2, "b"), task(5, "e"), task(1, "a"), task(3, "c")];
        let out = apply_filters_search_and_sort(&tasks, &clear_filters(), "", SortState::default(), today());
        assert_eq!(ids(&out), vec![5, 3, 2, 1]);
    }

    #[test]
    fn test_filter_toggles() {
        let mut f = FilterState::default();
        assert!(!f.has_active_filters());

        f.toggle_priority(Priority::High);
        f.toggle_priority(Priority::Low);
        assert_eq!(f.priorities, vec![Priority::High, Priority::Low]);
        f.toggle_priority(Priority::High);
        assert_eq!(f.priorities, vec![Priority::Low]);

        f.toggle_status(Status::Ongoing);
        f.toggle_status(Status::Ongoing);
        assert!(f.statuses.is_empty());

        f.select_due(DueFilter::Today);
        assert_eq!(f.due, Some(DueFilter::Today));
        f.select_due(DueFilter::Overdue);
        assert_eq!(f.due, Some(DueFilter::Overdue));
        f.select_due(DueFilter::Overdue);
        assert_eq!(f.due, None);

        assert!(f.has_active_filters());
        assert_eq!(clear_filters(), FilterState::default());
    }

    #[test]
    fn test_sort_selection() {
        let mut s = SortState::default();
        assert_eq!(s, SortState::new(SortKey::CreatedAt, SortDirection::Desc));

        s.select(SortKey::CreatedAt);
        assert_eq!(s.direction, SortDirection::Asc);

        s.select(SortKey::Priority);
        assert_eq!(s, SortState::new(SortKey::Priority, SortDirection::Desc));

        s.reset();
        assert_eq!(s, SortState::default());
    }
}
