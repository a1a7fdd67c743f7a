//! Dispatch and fallback policy shared by the entity adapters.
//!
//! Every operation has the same shape:
//!
//! 1. File mode: run the file path.
//! 2. Relational mode with a connection: run the relational path.
//!    - success or "not found": done, no fallback
//!    - error: fall through to the file path
//! 3. Relational mode without a connection: run the file path.
//!
//! The result is an [`Outcome`] naming the backend that served the call and
//! the fallback reason, if any. The same facts are logged, counted and
//! published as a [`StorageEvent`].

use crate::models::{
    BackendKind, EntityKind, EventMeta, FallbackReason, OutcomeStatus, StorageEvent,
};
use crate::observability::{EventBus, record_fallback, record_operation};
use crate::storage::{BackendSelector, RelationalStore};
use crate::{Error, Result};
use std::sync::Arc;

/// What one backend did with a call.
#[derive(Debug)]
pub enum Served<T> {
    /// The change was persisted or the read succeeded.
    Applied(T),
    /// The target does not exist. Never falls through.
    NotFound,
    /// Accepted without persisting.
    Simulated(T),
    /// The backend lacks the capability.
    Unsupported,
}

/// Result of an adapter operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T = ()> {
    /// Backend that produced the result.
    pub served_by: BackendKind,
    /// Result class.
    pub status: OutcomeStatus,
    /// Set when a relational-mode call was served by the file backend.
    pub fallback: Option<FallbackReason>,
    /// Returned value for applied or simulated calls.
    pub value: Option<T>,
}

impl<T> Outcome<T> {
    /// Returns true for applied and simulated calls.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns true if the relational path fell through to the file path.
    #[must_use]
    pub const fn fell_back(&self) -> bool {
        self.fallback.is_some()
    }

    /// Consumes the outcome, returning the value.
    #[must_use]
    pub fn into_value(self) -> Option<T> {
        self.value
    }
}

/// Runs operations against the selected backend.
#[derive(Debug)]
pub struct Dispatcher {
    selector: Arc<BackendSelector>,
    events: EventBus,
}

impl Dispatcher {
    /// Creates a dispatcher.
    #[must_use]
    pub const fn new(selector: Arc<BackendSelector>, events: EventBus) -> Self {
        Self { selector, events }
    }

    /// Returns the backend selector.
    #[must_use]
    pub fn selector(&self) -> &BackendSelector {
        &self.selector
    }

    /// Runs an operation that both backends implement.
    pub fn dispatch<T, R, F>(
        &self,
        entity: EntityKind,
        operation: &'static str,
        relational: R,
        file: F,
    ) -> Outcome<T>
    where
        R: FnOnce(&dyn RelationalStore) -> Result<Served<T>>,
        F: FnOnce() -> Result<Served<T>>,
    {
        if self.selector.select_backend() == BackendKind::File {
            return self.finish(entity, operation, BackendKind::File, None, file());
        }

        let Some(store) = self.selector.connection() else {
            return self.fall_back(entity, operation, FallbackReason::ConnectionUnavailable, file);
        };

        match relational(store.as_ref()) {
            Ok(served) => self.finish(entity, operation, BackendKind::Relational, None, Ok(served)),
            Err(e) => {
                tracing::warn!(
                    entity = entity.as_str(),
                    operation,
                    backend = store.backend_name(),
                    error = %e,
                    "Relational operation failed, falling back to file backend"
                );
                self.fall_back(entity, operation, FallbackReason::RelationalError(e.to_string()), file)
            },
        }
    }

    /// Runs an operation only the file backend implements.
    ///
    /// In relational mode the call is reported as a fallback with
    /// [`FallbackReason::NotProvided`].
    pub fn file_only<T, F>(&self, entity: EntityKind, operation: &'static str, file: F) -> Outcome<T>
    where
        F: FnOnce() -> Result<Served<T>>,
    {
        if self.selector.select_backend() == BackendKind::File {
            self.finish(entity, operation, BackendKind::File, None, file())
        } else {
            self.fall_back(entity, operation, FallbackReason::NotProvided, file)
        }
    }

    /// Reports a call rejected before any backend was attempted.
    pub fn reject<T>(&self, entity: EntityKind, operation: &'static str, error: Error) -> Outcome<T> {
        let backend = self.selector.select_backend();
        self.finish(entity, operation, backend, None, Err(error))
    }

    fn fall_back<T, F>(
        &self,
        entity: EntityKind,
        operation: &'static str,
        reason: FallbackReason,
        file: F,
    ) -> Outcome<T>
    where
        F: FnOnce() -> Result<Served<T>>,
    {
        record_fallback(entity, &reason);
        self.finish(entity, operation, BackendKind::File, Some(reason), file())
    }

    fn finish<T>(
        &self,
        entity: EntityKind,
        operation: &'static str,
        served_by: BackendKind,
        fallback: Option<FallbackReason>,
        result: Result<Served<T>>,
    ) -> Outcome<T> {
        let (status, value) = match result {
            Ok(Served::Applied(v)) => (OutcomeStatus::Applied, Some(v)),
            Ok(Served::Simulated(v)) => (OutcomeStatus::Simulated, Some(v)),
            Ok(Served::NotFound) => (OutcomeStatus::NotFound, None),
            Ok(Served::Unsupported) => (OutcomeStatus::Unsupported, None),
            Err(e) => {
                tracing::warn!(
                    entity = entity.as_str(),
                    operation,
                    backend = served_by.as_str(),
                    error = %e,
                    "Storage operation failed"
                );
                (OutcomeStatus::Failed, None)
            },
        };

        tracing::debug!(
            entity = entity.as_str(),
            operation,
            backend = served_by.as_str(),
            status = status.as_str(),
            fallback = fallback.as_ref().map(FallbackReason::as_str),
            "Storage operation finished"
        );
        record_operation(entity, served_by, status);

        self.events.publish(StorageEvent {
            meta: EventMeta::new("storage"),
            entity,
            operation,
            served_by,
            fallback: fallback.clone(),
            status,
        });

        Outcome {
            served_by,
            status,
            fallback,
            value,
        }
    }
}
