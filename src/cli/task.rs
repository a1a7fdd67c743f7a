//! Task command.

use super::CommandOutput;
use crate::models::{NewTask, TaskPriority};
use crate::services::PersistenceAdapter;
use anyhow::{Result, anyhow};
use chrono::{DateTime, NaiveDate, Utc};

pub fn create(
    adapter: &PersistenceAdapter,
    customer_id: &str,
    title: &str,
    description: &str,
    due: Option<&str>,
    priority: &str,
) -> Result<CommandOutput> {
    let priority = TaskPriority::parse(priority)
        .ok_or_else(|| anyhow!("unknown priority '{priority}' (low, normal, high, urgent)"))?;

    let mut task = NewTask::new(customer_id, title, description).with_priority(priority);
    if let Some(raw) = due {
        task = task.with_due_date(parse_due(raw)?);
    }

    let outcome = adapter.tasks().create_task_outcome(&task);
    Ok(CommandOutput::from_outcome(outcome, "created"))
}

/// Accepts RFC 3339 or a bare date (midnight UTC).
fn parse_due(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| anyhow!("invalid due date '{raw}' (YYYY-MM-DD or RFC 3339)"))
}
