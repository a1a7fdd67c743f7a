//! Customer and conversation identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix carried by identifiers that originate from the legacy message system.
pub const LEGACY_MESSAGE_PREFIX: &str = "MSG-";

/// Customer-facing identifier.
///
/// May be a canonical customer ID (`CUST-1`, `TVS-CUS-0042`), a legacy
/// message-system ID (`MSG-123`) or a social-platform ID (`FB999`). The
/// identifier space is heterogeneous; resolution to a physical record is the
/// job of [`crate::storage::IdentifierResolver`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(String);

impl CustomerId {
    /// Creates a new customer ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the ID with the legacy `MSG-` prefix removed.
    ///
    /// Only the first occurrence is stripped, and only when it is a prefix.
    #[must_use]
    pub fn without_legacy_prefix(&self) -> &str {
        self.0
            .strip_prefix(LEGACY_MESSAGE_PREFIX)
            .unwrap_or(&self.0)
    }

    /// Returns true if this ID matches an alternate identifier verbatim or
    /// once the legacy prefix is stripped.
    #[must_use]
    pub fn matches_alias(&self, alias: &str) -> bool {
        !alias.is_empty() && (self.0 == alias || self.without_legacy_prefix() == alias)
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for CustomerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CustomerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier of one chat thread.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    /// Creates a new conversation ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ConversationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ConversationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
