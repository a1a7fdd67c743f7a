//! File backend.
//!
//! Customers, conversations and their intelligence as JSON documents in a
//! record space directory. See [`layout`] for the on-disk structure.
//!
//! | Component | Role |
//! |-----------|------|
//! | [`IdentifierResolver`] | identifier → profile path (direct, index, scan) |
//! | [`RecordMerger`] | shallow intelligence merge, read-modify-write |
//! | [`FileCustomerStore`] | profile reads, writes, intelligence updates |
//! | [`FileChatStore`] | conversation lookup and message replacement |

mod alias_index;
mod chat;
mod customer;
pub mod layout;
mod merger;
mod resolver;

pub use alias_index::AliasIndex;
pub use chat::FileChatStore;
pub use customer::FileCustomerStore;
pub use layout::RecordSpace;
pub use merger::RecordMerger;
pub use resolver::{IdentifierResolver, MatchFields, Resolution, ResolveTier, social_id};
