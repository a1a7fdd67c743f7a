//! Task adapter.
//!
//! The file backend does not persist tasks: it logs the intent and reports
//! success as [`OutcomeStatus::Simulated`](crate::OutcomeStatus::Simulated).
//! Callers that need the task stored must run in relational mode.

use super::dispatch::{Dispatcher, Outcome, Served};
use crate::models::{EntityKind, NewTask};
use std::sync::Arc;
use tracing::instrument;

/// Follow-up task operations.
#[derive(Debug, Clone)]
pub struct TaskAdapter {
    dispatcher: Arc<Dispatcher>,
}

impl TaskAdapter {
    /// Creates a task adapter.
    #[must_use]
    pub const fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Creates a task with status `PENDING`.
    ///
    /// Always `true` in file mode (simulated, nothing written).
    pub fn create_task(&self, task: &NewTask) -> bool {
        self.create_task_outcome(task).is_success()
    }

    /// Creates a task, reporting which backend served the call.
    #[instrument(skip(self, task), fields(customer_id = %task.customer_id, priority = task.priority.as_str()))]
    pub fn create_task_outcome(&self, task: &NewTask) -> Outcome {
        self.dispatcher.dispatch(
            EntityKind::Task,
            "create_task",
            |store| store.insert_task(task).map(Served::Applied),
            || {
                tracing::info!(
                    customer_id = %task.customer_id,
                    title = %task.title,
                    "Task not persisted by the file backend (simulated)"
                );
                Ok(Served::Simulated(()))
            },
        )
    }
}
