//! Enumerations and field types for task management.
//!
//! Statuses and priorities are closed sets with one canonical spelling.
//! Text from users or from the store is normalised once, through `FromStr`
//! or serde aliases, and compared as enums everywhere else.

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::TaskError;

/// Task importance, ordered `Low < Medium < High`.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, ValueEnum, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub enum Priority {
    #[serde(alias = "low", alias = "LOW")]
    Low,
    #[default]
    #[serde(alias = "medium", alias = "MEDIUM")]
    Medium,
    #[serde(alias = "high", alias = "HIGH")]
    High,
}

impl Priority {
    /// Ordinal used by the priority sort: High=3, Medium=2, Low=1.
    pub fn rank(self) -> u8 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }
}

impl FromStr for Priority {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(TaskError::invalid("priority", s)),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[serde(alias = "Upcoming", alias = "UPCOMING")]
    Upcoming,
    #[serde(alias = "Ongoing", alias = "ONGOING")]
    Ongoing,
    #[serde(alias = "Completed", alias = "COMPLETED")]
    Completed,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Upcoming => "upcoming",
            Status::Ongoing => "ongoing",
            Status::Completed => "completed",
        }
    }
}

impl FromStr for Status {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "upcoming" => Ok(Status::Upcoming),
            "ongoing" => Ok(Status::Ongoing),
            "completed" => Ok(Status::Completed),
            _ => Err(TaskError::invalid("status", s)),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keys the task list can be sorted by.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    CreatedAt,
    DueDate,
    Priority,
    Progress,
}

impl FromStr for SortKey {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "created_at" => Ok(SortKey::CreatedAt),
            "due_date" => Ok(SortKey::DueDate),
            "priority" => Ok(SortKey::Priority),
            "progress" => Ok(SortKey::Progress),
            _ => Err(TaskError::invalid("sort key", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

impl FromStr for SortDirection {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            _ => Err(TaskError::invalid("sort direction", s)),
        }
    }
}

/// Filtering options for tasks based on due dates.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum DueFilter {
    Today,
    ThisWeek,
    Overdue,
}

impl FromStr for DueFilter {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect();
        match norm.as_str() {
            "today" => Ok(DueFilter::Today),
            "thisweek" => Ok(DueFilter::ThisWeek),
            "overdue" => Ok(DueFilter::Overdue),
            _ => Err(TaskError::invalid("due-date filter", s)),
        }
    }
}
