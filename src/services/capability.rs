//! Per-operation backend support.

use crate::models::{BackendKind, EntityKind};
use serde::Serialize;

/// How a backend handles an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Support {
    /// Persisted by this backend.
    Full,
    /// Persisted in part (e.g. only a timestamp marker).
    Partial,
    /// Accepted and reported as success, nothing persisted.
    Simulated,
    /// Not handled; relational mode serves it from the file backend.
    FileOnly,
    /// Not handled at all.
    Unsupported,
}

/// One row of the capability matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capability {
    /// Entity the operation acts on.
    pub entity: EntityKind,
    /// Operation name.
    pub operation: &'static str,
    /// File backend support.
    pub file: Support,
    /// Relational backend support.
    pub relational: Support,
}

impl Capability {
    /// Returns the support level of `backend`.
    #[must_use]
    pub const fn support(&self, backend: BackendKind) -> Support {
        match backend {
            BackendKind::File => self.file,
            BackendKind::Relational => self.relational,
        }
    }
}

const fn row(
    entity: EntityKind,
    operation: &'static str,
    file: Support,
    relational: Support,
) -> Capability {
    Capability {
        entity,
        operation,
        file,
        relational,
    }
}

/// Every adapter operation and what each backend does with it.
pub const CAPABILITIES: &[Capability] = &[
    row(EntityKind::Customer, "update_customer_intelligence", Support::Full, Support::Full),
    row(EntityKind::Customer, "get_customer", Support::Full, Support::Full),
    row(EntityKind::Customer, "list_customers", Support::Full, Support::Full),
    row(EntityKind::Customer, "upsert_customer", Support::Full, Support::Full),
    row(EntityKind::Conversation, "save_chat_messages", Support::Full, Support::Partial),
    row(EntityKind::Conversation, "load_chat_messages", Support::Full, Support::FileOnly),
    row(EntityKind::Task, "create_task", Support::Simulated, Support::Full),
    row(EntityKind::Marketing, "upsert_marketing_data", Support::Unsupported, Support::Full),
    row(EntityKind::Marketing, "upsert_ad_daily_metrics", Support::Unsupported, Support::Full),
];

/// Looks up an operation by name.
#[must_use]
pub fn capability(operation: &str) -> Option<&'static Capability> {
    CAPABILITIES.iter().find(|c| c.operation == operation)
}
