//! Storage layer.
//!
//! Two backends behind one set of entity adapters:
//!
//! - **File**: JSON documents in a record space directory ([`file`])
//! - **Relational**: PostgreSQL or `SQLite` ([`relational`])
//!
//! The [`BackendSelector`] decides which one an operation targets first and
//! owns the relational connection handle.

// Allow significant_drop_tightening - the connection guard is held for the
// whole statement on purpose.
#![allow(clippy::significant_drop_tightening)]
// Allow manual_let_else for clearer error handling in some contexts.
#![allow(clippy::manual_let_else)]

pub mod file;
pub mod merge;
pub mod relational;
mod selector;
pub mod traits;

pub use file::{
    AliasIndex, FileChatStore, FileCustomerStore, IdentifierResolver, MatchFields, RecordMerger,
    RecordSpace, Resolution, ResolveTier,
};
pub use relational::{PostgresStore, RelationalKind, SqliteStore};
pub use selector::{BackendSelector, Connector, UrlConnector};
pub use traits::RelationalStore;
