//! # crmstore
//!
//! Persistence adapter for a customer-relationship application.
//!
//! crmstore stores and updates customer intelligence records, chat message
//! history and follow-up tasks against either a flat-file JSON record space or
//! a relational database, selected at runtime. A companion job pulls campaign
//! metadata and daily performance metrics from the marketing API and writes
//! them through the same adapter.
//!
//! ## Architecture
//!
//! ```text
//! caller → Entity Adapter → dispatch policy
//!            ├── Relational: BackendSelector::connection() → RelationalStore
//!            └── File:       IdentifierResolver → RecordMerger → record space
//! ```
//!
//! - Backend selection is an explicit [`AdapterConfig`] injected into the
//!   [`PersistenceAdapter`] container, never ambient process state.
//! - A relational failure falls through to the file backend; a relational
//!   "not found" does not. Every call reports which backend served it.
//! - Partial updates merge over existing intelligence, never replace it.
//!
//! ## Example
//!
//! ```rust,ignore
//! use crmstore::{AdapterConfig, PersistenceAdapter};
//! use serde_json::json;
//!
//! let adapter = PersistenceAdapter::new(AdapterConfig::from_env());
//! let patch = json!({ "tag": "vip" }).as_object().cloned().unwrap_or_default();
//! let ok = adapter.customers().update_customer_intelligence("FB999", &patch);
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod cli;
pub mod config;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;
pub mod sync;

pub use config::{AdapterConfig, BackendMode, MarketingConfig};
pub use models::{
    AdDailyMetric, BackendKind, ConversationId, CustomerId, Document, MarketingBundle, NewTask,
    StorageEvent, TaskPriority, TaskStatus,
};
pub use services::{
    ChatAdapter, CustomerAdapter, MarketingAdapter, Outcome, OutcomeStatus, PersistenceAdapter,
    TaskAdapter,
};
pub use storage::{BackendSelector, IdentifierResolver, RecordMerger, RelationalStore};
pub use sync::{MarketingSource, MarketingSyncJob, SyncReport};

/// Error type for crmstore operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Unsafe identifiers, malformed JSON patches, bad connection strings |
/// | `OperationFailed` | I/O errors, JSON (de)serialisation, SQL statement failures |
/// | `ConfigurationMissing` | Credentials or a connection string are absent |
/// | `ConnectionUnavailable` | The relational backend cannot be reached |
/// | `FeatureNotEnabled` | A backend requires a compile-time feature |
///
/// A missing record or a capability the backend lacks is not an error; both
/// are reported through [`OutcomeStatus`].
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    ///
    /// Raised when:
    /// - Filesystem reads or writes fail
    /// - A record cannot be parsed as JSON
    /// - A SQL statement fails
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// Required configuration is absent.
    #[error("configuration missing: {0}")]
    ConfigurationMissing(String),

    /// The relational backend could not be reached.
    #[error("connection unavailable: {0}")]
    ConnectionUnavailable(String),

    /// Feature not enabled (requires feature flag).
    #[error("feature not enabled: {0} (compile with --features {0})")]
    FeatureNotEnabled(String),
}

impl Error {
    /// Builds an [`Error::OperationFailed`] from an operation name and any displayable cause.
    pub fn failed(operation: &str, cause: impl std::fmt::Display) -> Self {
        Self::OperationFailed {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }
}

/// Result type alias for crmstore operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns the current Unix timestamp in seconds.
#[must_use]
pub fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Returns the current UTC time as ISO-8601 with second precision (`2024-05-01T09:30:00Z`).
///
/// This is the format stamped into `intelligence.last_update` and
/// conversation `updated_time` fields.
#[must_use]
pub fn iso_timestamp() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%SZ")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("test error".to_string());
        assert_eq!(err.to_string(), "invalid input: test error");

        let err = Error::failed("test", "failed");
        assert_eq!(err.to_string(), "operation 'test' failed: failed");

        let err = Error::FeatureNotEnabled("postgres".to_string());
        assert_eq!(
            err.to_string(),
            "feature not enabled: postgres (compile with --features postgres)"
        );
    }

    #[test]
    fn test_iso_timestamp_shape() {
        let ts = iso_timestamp();
        assert_eq!(ts.len(), 20);
        assert!(ts.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }
}
