//! Storage event types.
//!
//! Every adapter call publishes one [`StorageEvent`] naming the backend that
//! actually served it and whether the relational path fell through to the
//! file path on the way.

use super::{BackendKind, EntityKind};
use crate::current_timestamp;
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// Shared event metadata.
#[derive(Debug, Clone, Serialize)]
pub struct EventMeta {
    /// Unique identifier for this event.
    pub event_id: String,
    /// Event source component.
    pub source: &'static str,
    /// Timestamp (Unix epoch seconds).
    pub timestamp: u64,
}

impl EventMeta {
    /// Creates new event metadata using the current timestamp.
    #[must_use]
    pub fn new(source: &'static str) -> Self {
        Self::with_timestamp(source, current_timestamp())
    }

    /// Creates new event metadata with a specified timestamp.
    #[must_use]
    pub fn with_timestamp(source: &'static str, timestamp: u64) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            source,
            timestamp,
        }
    }
}

/// Result class of one adapter operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// The change was persisted (or the read succeeded).
    Applied,
    /// The identifier resolved to nothing.
    NotFound,
    /// The backend accepted the call without persisting anything.
    Simulated,
    /// The backend does not provide the capability.
    Unsupported,
    /// The operation was attempted and failed.
    Failed,
}

impl OutcomeStatus {
    /// Returns true for statuses reported to callers as success.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Applied | Self::Simulated)
    }

    /// Returns the status name as used in metrics labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::NotFound => "not_found",
            Self::Simulated => "simulated",
            Self::Unsupported => "unsupported",
            Self::Failed => "failed",
        }
    }
}

/// Why a relational-mode call was served by the file backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum FallbackReason {
    /// No connection could be established.
    ConnectionUnavailable,
    /// The relational statement failed.
    RelationalError(String),
    /// The relational backend does not provide the operation.
    NotProvided,
}

impl FallbackReason {
    /// Returns the reason name as used in metrics labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ConnectionUnavailable => "connection_unavailable",
            Self::RelationalError(_) => "relational_error",
            Self::NotProvided => "not_provided",
        }
    }
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RelationalError(cause) => write!(f, "relational_error: {cause}"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Event emitted for each adapter operation.
#[derive(Debug, Clone, Serialize)]
pub struct StorageEvent {
    /// Event metadata.
    pub meta: EventMeta,
    /// Entity the operation touched.
    pub entity: EntityKind,
    /// Operation name (`update_customer_intelligence`, ...).
    pub operation: &'static str,
    /// Backend that served the request.
    pub served_by: BackendKind,
    /// Present when a relational attempt fell through to the file backend.
    pub fallback: Option<FallbackReason>,
    /// Result class.
    pub status: OutcomeStatus,
}

impl StorageEvent {
    /// Returns the event type name.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        if self.fallback.is_some() {
            "storage.fallback"
        } else {
            "storage.served"
        }
    }
}
