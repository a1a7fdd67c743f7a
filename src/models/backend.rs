//! Backend identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The two persistence strategies an operation can be served by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// JSON documents in the record space on the filesystem.
    File,
    /// Rows in a SQL database.
    Relational,
}

impl BackendKind {
    /// Returns the backend name as used in logs and metrics labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Relational => "relational",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entity kinds handled by the adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// Customer profile and intelligence.
    Customer,
    /// Chat thread.
    Conversation,
    /// Follow-up task.
    Task,
    /// Campaign metadata and daily metrics.
    Marketing,
}

impl EntityKind {
    /// Returns the entity name as used in logs and metrics labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Conversation => "conversation",
            Self::Task => "task",
            Self::Marketing => "marketing",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
