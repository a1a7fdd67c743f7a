//! Relational backends.
//!
//! | Scheme | Store |
//! |--------|-------|
//! | `postgres://`, `postgresql://` | [`PostgresStore`] (feature `postgres`) |
//! | `sqlite://<path>`, `sqlite::memory:` | [`SqliteStore`] |

mod postgresql;
mod sqlite;

pub use postgresql::PostgresStore;
pub use sqlite::{SQLITE_MEMORY_URL, SqliteStore};

use crate::storage::traits::RelationalStore;
use crate::{Error, Result};
use std::sync::Arc;

/// Relational store kind, chosen by connection string scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationalKind {
    /// PostgreSQL server.
    Postgres,
    /// `SQLite` file or in-memory database.
    Sqlite,
}

impl RelationalKind {
    /// Classifies a connection string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for unknown schemes.
    pub fn from_url(url: &str) -> Result<Self> {
        let scheme = url.split(':').next().unwrap_or_default().to_lowercase();
        match scheme.as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "sqlite" => Ok(Self::Sqlite),
            _ => Err(Error::InvalidInput(format!(
                "unsupported database url scheme: {scheme}"
            ))),
        }
    }
}

/// Opens the store a connection string names.
///
/// # Errors
///
/// Returns an error if the scheme is unknown or the store cannot be opened.
pub fn connect(url: &str) -> Result<Arc<dyn RelationalStore>> {
    match RelationalKind::from_url(url)? {
        RelationalKind::Postgres => Ok(Arc::new(PostgresStore::connect(url)?)),
        RelationalKind::Sqlite => Ok(Arc::new(SqliteStore::from_url(url)?)),
    }
}
