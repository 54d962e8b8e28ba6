//! Terminal rendering for task lists and details.

use chrono::NaiveDate;

use crate::board::TaskView;
use crate::dates::{format_date, format_due_relative};
use crate::task::SubTask;

/// Print tasks in a formatted table.
pub fn print_table(rows: &[TaskView<'_>], today: NaiveDate) {
    println!(
        "{:<5} {:<10} {:<7} {:<10} {:<5} {}",
        "ID", "Status", "Pri", "Due", "Done", "Title"
    );
    for row in rows {
        println!("{}", format_row(row, today));
    }
}

pub fn format_row(row: &TaskView<'_>, today: NaiveDate) -> String {
    let t = row.task;
    let flag = if row.overdue {
        " [overdue]"
    } else if row.due_today {
        " [due today]"
    } else {
        ""
    };
    format!(
        "{:<5} {:<10} {:<7} {:<10} {:<5} {}{}",
        t.id,
        t.status.as_str(),
        t.priority.as_str(),
        format_due_relative(t.due_date, today),
        format!("{}%", row.progress),
        truncate(&t.title, 60),
        flag
    )
}

/// Detailed view of one task with its checklist.
pub fn print_detail(row: &TaskView<'_>, subtasks: &[SubTask]) {
    let t = row.task;
    println!("#{} {}", t.id, t.title);
    println!("  status:   {}", t.status);
    println!("  priority: {}", t.priority);
    let due = format_date(t.due_date);
    println!("  due:      {}", if due.is_empty() { "-" } else { due.as_str() });
    if row.overdue {
        println!("            overdue");
    }
    println!("  created:  {}", t.created_at.format("%Y-%m-%d %H:%M"));
    println!("  progress: {}% {}", row.progress, progress_bar(row.progress, 20));
    if let Some(desc) = &t.description {
        println!();
        for line in desc.lines() {
            println!("  {line}");
        }
    }
    if !subtasks.is_empty() {
        println!();
        for s in subtasks {
            println!("  [{}] {:<4} {}", if s.is_completed { 'x' } else { ' ' }, s.id, s.title);
        }
    }
}

pub fn progress_bar(progress: u8, width: usize) -> String {
    let filled = (progress as usize * width + 50) / 100;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled.min(width)))
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::fields::{Priority, Status};
    use crate::task::Task;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a long title", 6), "a lon…");
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0, 4), "[----]");
        assert_eq!(progress_bar(50, 4), "[##--]");
        assert_eq!(progress_bar(100, 4), "[####]");
    }

    #[test]
    fn test_row_flags_overdue() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 15).unwrap();
        let task = Task {
            id: 7,
            user_id: "me".into(),
            title: "File taxes".into(),
            description: None,
            due_date: NaiveDate::from_ymd_opt(2024, 5, 13),
            priority: Priority::High,
            status: Status::Ongoing,
            created_at: Utc::now(),
            progress: 50,
        };
        let row = TaskView {
            task: &task,
            progress: 50,
            overdue: true,
            due_today: false,
        };
        let line = format_row(&row, today);
        assert!(line.starts_with("7 "));
        assert!(line.contains("2d late"));
        assert!(line.contains("50%"));
        assert!(line.ends_with("File taxes [overdue]"));
    }
}
