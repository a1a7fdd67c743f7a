//! Data models for crmstore.
//!
//! Customer and conversation records are schemaless JSON documents: the
//! adapter only interprets the handful of keys it resolves or merges on and
//! preserves everything else byte-for-byte through a read-modify-write.

mod backend;
mod events;
mod ids;
mod marketing;
mod task;

pub use backend::{BackendKind, EntityKind};
pub use events::{EventMeta, FallbackReason, OutcomeStatus, StorageEvent};
pub use ids::{ConversationId, CustomerId, LEGACY_MESSAGE_PREFIX};
pub use marketing::{AdDailyMetric, MarketingBundle, MarketingKind, MarketingRow};
pub use task::{NewTask, TaskPriority, TaskStatus};

/// A JSON object document (customer profile, conversation, intelligence patch).
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Key of the intelligence sub-document on a customer record.
pub const INTELLIGENCE_KEY: &str = "intelligence";

/// Key stamped into the intelligence sub-document on every merge.
pub const LAST_UPDATE_KEY: &str = "last_update";
