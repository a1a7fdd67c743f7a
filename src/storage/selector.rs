//! Backend Selector.
//!
//! Holds the configured [`BackendMode`] and the single relational connection
//! handle. The handle is created on first use and then reused until
//! [`BackendSelector::close`]. If establishing it fails, the failure is logged,
//! the caller gets `None` and serves the call from the file backend; the next
//! call tries again. There is no pooling and no health check: a dropped
//! connection surfaces as a failed statement.

use crate::config::{AdapterConfig, BackendMode};
use crate::models::BackendKind;
use crate::storage::relational;
use crate::storage::traits::RelationalStore;
use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::sync::{Arc, Mutex};

/// Establishes relational connections.
pub trait Connector: Send + Sync {
    /// Opens a connection.
    fn connect(&self) -> Result<Arc<dyn RelationalStore>>;
}

/// Connects using a connection string.
pub struct UrlConnector {
    url: SecretString,
}

impl UrlConnector {
    /// Creates a connector for a connection string.
    #[must_use]
    pub const fn new(url: SecretString) -> Self {
        Self { url }
    }
}

impl Connector for UrlConnector {
    fn connect(&self) -> Result<Arc<dyn RelationalStore>> {
        relational::connect(self.url.expose_secret())
    }
}

impl fmt::Debug for UrlConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlConnector").finish_non_exhaustive()
    }
}

/// Hands out an already opened store.
struct Established(Arc<dyn RelationalStore>);

impl Connector for Established {
    fn connect(&self) -> Result<Arc<dyn RelationalStore>> {
        Ok(Arc::clone(&self.0))
    }
}

/// Chooses the backend and owns the relational connection handle.
pub struct BackendSelector {
    mode: BackendMode,
    connector: Option<Box<dyn Connector>>,
    connection: Mutex<Option<Arc<dyn RelationalStore>>>,
}

impl BackendSelector {
    /// Creates a selector.
    #[must_use]
    pub fn new(mode: BackendMode, connector: Option<Box<dyn Connector>>) -> Self {
        Self {
            mode,
            connector,
            connection: Mutex::new(None),
        }
    }

    /// Creates a file-mode selector.
    #[must_use]
    pub fn file() -> Self {
        Self::new(BackendMode::File, None)
    }

    /// Creates a relational-mode selector around an open store.
    #[must_use]
    pub fn with_store(store: Arc<dyn RelationalStore>) -> Self {
        Self::new(BackendMode::Relational, Some(Box::new(Established(store))))
    }

    /// Creates a selector from configuration.
    ///
    /// Relational mode without a connection string is kept; every call then
    /// falls back to the file backend.
    #[must_use]
    pub fn from_config(config: &AdapterConfig) -> Self {
        let connector = config
            .database_url
            .clone()
            .map(|url| Box::new(UrlConnector::new(url)) as Box<dyn Connector>);

        if config.backend == BackendMode::Relational && connector.is_none() {
            tracing::warn!("Relational mode configured without DATABASE_URL; using file backend");
        }

        Self::new(config.backend, connector)
    }

    /// Returns the configured mode.
    #[must_use]
    pub const fn mode(&self) -> BackendMode {
        self.mode
    }

    /// Returns the backend operations should target first.
    #[must_use]
    pub const fn select_backend(&self) -> BackendKind {
        match self.mode {
            BackendMode::File => BackendKind::File,
            BackendMode::Relational => BackendKind::Relational,
        }
    }

    /// Returns the relational connection, establishing it on first use.
    ///
    /// Returns `None` in file mode, or if the connection cannot be established.
    #[must_use]
    pub fn connection(&self) -> Option<Arc<dyn RelationalStore>> {
        if self.mode == BackendMode::File {
            return None;
        }
        match self.try_connection() {
            Ok(store) => Some(store),
            Err(e) => {
                tracing::warn!(error = %e, "Relational backend unavailable");
                None
            },
        }
    }

    /// Returns the relational connection or the reason there is none.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationMissing`] without a connection string,
    /// or the connector's error.
    pub fn try_connection(&self) -> Result<Arc<dyn RelationalStore>> {
        let mut guard = self
            .connection
            .lock()
            .map_err(|e| Error::failed("lock_connection", e))?;

        if let Some(store) = guard.as_ref() {
            return Ok(Arc::clone(store));
        }

        let connector = self
            .connector
            .as_ref()
            .ok_or_else(|| Error::ConfigurationMissing("DATABASE_URL".to_string()))?;

        let store = connector.connect()?;
        tracing::info!(backend = store.backend_name(), "Relational connection established");
        *guard = Some(Arc::clone(&store));
        Ok(store)
    }

    /// Returns true if a connection handle is held.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection.lock().is_ok_and(|guard| guard.is_some())
    }

    /// Drops the connection handle. A later call reconnects.
    pub fn close(&self) {
        if let Ok(mut guard) = self.connection.lock() {
            if guard.take().is_some() {
                tracing::debug!("Relational connection closed");
            }
        }
    }
}

impl fmt::Debug for BackendSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendSelector")
            .field("mode", &self.mode)
            .field("has_connector", &self.connector.is_some())
            .field("connected", &self.is_connected())
            .finish()
    }
}
