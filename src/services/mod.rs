//! Entity adapters.
//!
//! The adapters orchestrate the backend selector and the two storage backends
//! and provide the public operations. [`PersistenceAdapter`] wires them to one
//! configuration, one selector and one event bus.

mod capability;
mod chat;
mod customer;
mod dispatch;
mod marketing;
mod task;

pub use capability::{CAPABILITIES, Capability, Support, capability};
pub use chat::ChatAdapter;
pub use customer::CustomerAdapter;
pub use dispatch::{Dispatcher, Outcome, Served};
pub use marketing::MarketingAdapter;
pub use task::TaskAdapter;

pub use crate::models::OutcomeStatus;

use crate::config::{AdapterConfig, BackendMode};
use crate::observability::{EventBus, global_event_bus};
use crate::storage::{
    BackendSelector, FileChatStore, FileCustomerStore, IdentifierResolver, RecordSpace,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Container for the entity adapters.
///
/// # Example
///
/// ```rust,ignore
/// use crmstore::{AdapterConfig, NewTask, PersistenceAdapter};
///
/// let adapter = PersistenceAdapter::new(AdapterConfig::from_env());
/// adapter.tasks().create_task(&NewTask::new("CUST-1", "Call back", "Asked for a quote"));
/// ```
#[derive(Debug)]
pub struct PersistenceAdapter {
    config: AdapterConfig,
    selector: Arc<BackendSelector>,
    customers: CustomerAdapter,
    chats: ChatAdapter,
    tasks: TaskAdapter,
    marketing: MarketingAdapter,
}

impl PersistenceAdapter {
    /// Creates an adapter from configuration, publishing to the global event bus.
    ///
    /// No connection is opened until the first relational call.
    #[must_use]
    pub fn new(config: AdapterConfig) -> Self {
        let selector = Arc::new(BackendSelector::from_config(&config));
        Self::with_parts(config, selector, global_event_bus().clone())
    }

    /// Creates an adapter around an existing selector and event bus.
    #[must_use]
    pub fn with_parts(
        config: AdapterConfig,
        selector: Arc<BackendSelector>,
        events: EventBus,
    ) -> Self {
        let space = RecordSpace::new(config.data_dir.clone());
        let resolver = if config.alias_index {
            IdentifierResolver::new(space.clone()).with_alias_index()
        } else {
            IdentifierResolver::new(space.clone())
        };

        let dispatcher = Arc::new(dispatch::Dispatcher::new(Arc::clone(&selector), events));
        let customers =
            CustomerAdapter::new(Arc::clone(&dispatcher), Arc::new(FileCustomerStore::new(resolver)));
        let chats = ChatAdapter::new(Arc::clone(&dispatcher), FileChatStore::new(space));
        let tasks = TaskAdapter::new(Arc::clone(&dispatcher));
        let marketing = MarketingAdapter::new(dispatcher);

        tracing::debug!(
            backend = config.backend.as_str(),
            data_dir = %config.data_dir.display(),
            alias_index = config.alias_index,
            "Persistence adapter created"
        );

        Self {
            config,
            selector,
            customers,
            chats,
            tasks,
            marketing,
        }
    }

    /// Returns the customer adapter.
    #[must_use]
    pub const fn customers(&self) -> &CustomerAdapter {
        &self.customers
    }

    /// Returns the chat adapter.
    #[must_use]
    pub const fn chats(&self) -> &ChatAdapter {
        &self.chats
    }

    /// Returns the task adapter.
    #[must_use]
    pub const fn tasks(&self) -> &TaskAdapter {
        &self.tasks
    }

    /// Returns the marketing adapter.
    #[must_use]
    pub const fn marketing(&self) -> &MarketingAdapter {
        &self.marketing
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Returns the backend selector.
    #[must_use]
    pub fn selector(&self) -> &BackendSelector {
        &self.selector
    }

    /// Describes the adapter's configuration and capabilities.
    #[must_use]
    pub fn adapter_info(&self) -> AdapterInfo {
        AdapterInfo {
            version: env!("CARGO_PKG_VERSION"),
            mode: self.config.backend,
            description: match self.config.backend {
                BackendMode::File => "JSON documents in the record space",
                BackendMode::Relational => "Relational database with file fallback",
            },
            data_dir: self.config.data_dir.clone(),
            data_dir_exists: self.config.data_dir.is_dir(),
            database_configured: self.config.database_url.is_some(),
            connected: self.selector.is_connected(),
            alias_index: self.config.alias_index,
            capabilities: CAPABILITIES,
        }
    }

    /// Drops the relational connection. The next relational call reconnects.
    pub fn close(&self) {
        self.selector.close();
    }
}

/// Static description of an adapter, as printed by `crmstore info`.
#[derive(Debug, Clone, Serialize)]
pub struct AdapterInfo {
    /// Crate version.
    pub version: &'static str,
    /// Configured backend mode.
    pub mode: BackendMode,
    /// Human-readable backend description.
    pub description: &'static str,
    /// Record space root.
    pub data_dir: PathBuf,
    /// Whether the record space root exists.
    pub data_dir_exists: bool,
    /// Whether a connection string is configured.
    pub database_configured: bool,
    /// Whether a relational connection is currently open.
    pub connected: bool,
    /// Whether the alias index is enabled.
    pub alias_index: bool,
    /// Per-operation backend support.
    pub capabilities: &'static [Capability],
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_adapter_info_file_mode() {
        let dir = TempDir::new().unwrap();
        let adapter = PersistenceAdapter::with_parts(
            AdapterConfig::new().with_data_dir(dir.path()),
            Arc::new(BackendSelector::file()),
            EventBus::new(8),
        );

        let info = adapter.adapter_info();
        assert_eq!(info.mode, BackendMode::File);
        assert!(info.data_dir_exists);
        assert!(!info.database_configured);
        assert!(!info.connected);
        assert_eq!(info.capabilities.len(), CAPABILITIES.len());

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["mode"], "file");
    }

    #[test]
    fn test_new_does_not_connect() {
        let config = AdapterConfig::new()
            .with_backend(BackendMode::Relational)
            .with_database_url("sqlite::memory:");
        let adapter = PersistenceAdapter::new(config);
        assert!(!adapter.adapter_info().connected);
        assert!(adapter.adapter_info().database_configured);
    }
}
