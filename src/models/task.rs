//! Follow-up task records.

use super::CustomerId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskPriority {
    /// Can wait.
    Low,
    /// Default priority.
    #[default]
    Normal,
    /// Should be handled today.
    High,
    /// Needs immediate attention.
    Urgent,
}

impl TaskPriority {
    /// Returns the stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Normal => "NORMAL",
            Self::High => "HIGH",
            Self::Urgent => "URGENT",
        }
    }

    /// Parses a priority string (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "LOW" => Some(Self::Low),
            "NORMAL" | "MEDIUM" => Some(Self::Normal),
            "HIGH" => Some(Self::High),
            "URGENT" => Some(Self::Urgent),
            _ => None,
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Newly created, not yet worked on.
    #[default]
    Pending,
    /// Being worked on.
    InProgress,
    /// Finished.
    Completed,
}

impl TaskStatus {
    /// Returns the stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
        }
    }
}

/// A follow-up task to be created for a customer.
///
/// Tasks always start in [`TaskStatus::Pending`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    /// Customer the task belongs to.
    pub customer_id: CustomerId,
    /// Short title.
    pub title: String,
    /// Longer description.
    pub description: String,
    /// Optional due date.
    pub due_date: Option<DateTime<Utc>>,
    /// Priority, `NORMAL` unless specified.
    pub priority: TaskPriority,
}

impl NewTask {
    /// Creates a task with no due date and normal priority.
    #[must_use]
    pub fn new(
        customer_id: impl Into<CustomerId>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            customer_id: customer_id.into(),
            title: title.into(),
            description: description.into(),
            due_date: None,
            priority: TaskPriority::default(),
        }
    }

    /// Sets the due date.
    #[must_use]
    pub const fn with_due_date(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Sets the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Returns the initial status of every new task.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        TaskStatus::Pending
    }
}
