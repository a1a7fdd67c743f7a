//! SQLite relational store.
//!
//! Used for local development and tests. Creates its own schema on open;
//! JSON columns are stored as text.

use crate::models::{
    AdDailyMetric, ConversationId, CustomerId, Document, INTELLIGENCE_KEY, MarketingKind,
    MarketingRow, NewTask,
};
use crate::storage::merge::intelligence_from_value;
use crate::storage::traits::RelationalStore;
use crate::{Error, Result};
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// In-memory database marker accepted by [`SqliteStore::from_url`].
pub const SQLITE_MEMORY_URL: &str = "sqlite::memory:";

/// `SQLite`-backed relational store.
pub struct SqliteStore {
    /// Connection to the `SQLite` database.
    conn: Mutex<Connection>,
    /// Path to the `SQLite` database.
    db_path: PathBuf,
}

impl SqliteStore {
    /// Opens (or creates) a database file.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::failed("create_db_dir", e))?;
        }

        let conn = Connection::open(&db_path).map_err(|e| Error::failed("open_sqlite_db", e))?;
        let store = Self {
            conn: Mutex::new(conn),
            db_path,
        };
        store.initialize()?;
        Ok(store)
    }

    /// Creates an in-memory store.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| Error::failed("open_sqlite_db_memory", e))?;
        let store = Self {
            conn: Mutex::new(conn),
            db_path: PathBuf::from(":memory:"),
        };
        store.initialize()?;
        Ok(store)
    }

    /// Opens a store from `sqlite::memory:` or `sqlite://<path>`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for other schemes, or an error if the
    /// database cannot be opened.
    pub fn from_url(url: &str) -> Result<Self> {
        if url == SQLITE_MEMORY_URL || url == "sqlite://:memory:" {
            return Self::in_memory();
        }
        url.strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .filter(|path| !path.is_empty())
            .map_or_else(
                || Err(Error::InvalidInput(format!("not a sqlite url: {url}"))),
                Self::open,
            )
    }

    /// Returns the database path.
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Initializes the database schema.
    fn initialize(&self) -> Result<()> {
        let conn = self.lock_conn()?;

        let mut schema = String::from(
            "CREATE TABLE IF NOT EXISTS customers (
                customer_id TEXT PRIMARY KEY,
                profile TEXT NOT NULL DEFAULT '{}',
                intelligence TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS conversations (
                id TEXT PRIMARY KEY,
                updated_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                customer_id TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                due_date TEXT,
                status TEXT NOT NULL,
                priority TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_tasks_customer ON tasks(customer_id);
            CREATE TABLE IF NOT EXISTS ad_daily_metrics (
                ad_id TEXT NOT NULL,
                date TEXT NOT NULL,
                spend REAL NOT NULL DEFAULT 0,
                impressions INTEGER NOT NULL DEFAULT 0,
                clicks INTEGER NOT NULL DEFAULT 0,
                leads INTEGER NOT NULL DEFAULT 0,
                purchases INTEGER NOT NULL DEFAULT 0,
                synced_at TEXT NOT NULL,
                PRIMARY KEY (ad_id, date)
            );",
        );
        for kind in MarketingKind::ALL {
            schema.push_str(&format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    id TEXT PRIMARY KEY,
                    name TEXT,
                    status TEXT,
                    parent_id TEXT,
                    payload TEXT NOT NULL,
                    synced_at TEXT NOT NULL
                );",
                kind.table()
            ));
        }

        conn.execute_batch(&schema)
            .map_err(|e| Error::failed("create_relational_schema", e))
    }

    /// Locks the connection and returns a guard.
    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::failed("lock_sqlite_db", e))
    }
}

fn to_json_text(value: &impl serde::Serialize, operation: &str) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::failed(operation, e))
}

/// Parses a JSON text column. SQL `NULL` is `None`; unparseable text is an error.
fn parse_json_text(text: Option<String>, operation: &str) -> Result<Option<Value>> {
    text.map(|t| serde_json::from_str(&t).map_err(|e| Error::failed(operation, e)))
        .transpose()
}

type CustomerRow = (String, Option<String>, Option<String>);

fn customer_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CustomerRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

/// Builds the customer document returned to callers from a row.
fn customer_document((customer_id, profile, intelligence): CustomerRow) -> Result<Document> {
    let mut doc = match parse_json_text(profile, "parse_profile")? {
        Some(Value::Object(map)) => map,
        _ => Document::new(),
    };
    doc.insert("customer_id".to_string(), Value::String(customer_id));
    if let Some(intel) = parse_json_text(intelligence, "parse_intelligence")? {
        doc.insert(INTELLIGENCE_KEY.to_string(), intel);
    }
    Ok(doc)
}

impl RelationalStore for SqliteStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn ping(&self) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.query_row("SELECT 1", [], |_| Ok(()))
            .map_err(|e| Error::failed("ping_sqlite", e))
    }

    fn load_intelligence(&self, customer_id: &CustomerId) -> Result<Option<Document>> {
        let conn = self.lock_conn()?;
        let row: Option<Option<String>> = conn
            .query_row(
                "SELECT intelligence FROM customers WHERE customer_id = ?1",
                params![customer_id.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| Error::failed("select_intelligence", e))?;

        row.map(|text| parse_json_text(text, "parse_intelligence").map(intelligence_from_value))
            .transpose()
    }

    fn store_intelligence(
        &self,
        customer_id: &CustomerId,
        intelligence: &Document,
    ) -> Result<bool> {
        let json = to_json_text(intelligence, "serialize_intelligence")?;
        let conn = self.lock_conn()?;
        let updated = conn
            .execute(
                "UPDATE customers SET intelligence = ?1, updated_at = ?2 WHERE customer_id = ?3",
                params![json, crate::iso_timestamp(), customer_id.as_str()],
            )
            .map_err(|e| Error::failed("update_intelligence", e))?;
        Ok(updated > 0)
    }

    fn get_customer(&self, customer_id: &CustomerId) -> Result<Option<Document>> {
        let conn = self.lock_conn()?;
        conn.query_row(
            "SELECT customer_id, profile, intelligence FROM customers WHERE customer_id = ?1",
            params![customer_id.as_str()],
            customer_row,
        )
        .optional()
        .map_err(|e| Error::failed("select_customer", e))?
        .map(customer_document)
        .transpose()
    }

    fn list_customers(&self) -> Result<Vec<Document>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn
            .prepare("SELECT customer_id, profile, intelligence FROM customers ORDER BY customer_id")
            .map_err(|e| Error::failed("prepare_list_customers", e))?;

        let rows = stmt
            .query_map([], customer_row)
            .map_err(|e| Error::failed("list_customers", e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::failed("read_customer_row", e))?;

        rows.into_iter().map(customer_document).collect()
    }

    fn upsert_customer(&self, customer_id: &CustomerId, document: &Document) -> Result<()> {
        let mut profile = document.clone();
        let intelligence = profile.remove(INTELLIGENCE_KEY);
        let profile_json = to_json_text(&profile, "serialize_profile")?;
        let intelligence_json = intelligence
            .as_ref()
            .map(|v| to_json_text(v, "serialize_intelligence"))
            .transpose()?;
        let now = crate::iso_timestamp();

        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO customers (customer_id, profile, intelligence, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT (customer_id) DO UPDATE SET
                profile = excluded.profile,
                intelligence = COALESCE(excluded.intelligence, customers.intelligence),
                updated_at = excluded.updated_at",
            params![customer_id.as_str(), profile_json, intelligence_json, now],
        )
        .map_err(|e| Error::failed("upsert_customer", e))?;
        Ok(())
    }

    fn touch_conversation(
        &self,
        conversation_id: &ConversationId,
        updated_time: &str,
    ) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO conversations (id, updated_at) VALUES (?1, ?2)
             ON CONFLICT (id) DO UPDATE SET updated_at = excluded.updated_at",
            params![conversation_id.as_str(), updated_time],
        )
        .map_err(|e| Error::failed("upsert_conversation", e))?;
        Ok(())
    }

    fn insert_task(&self, task: &NewTask) -> Result<()> {
        let now = crate::iso_timestamp();
        let due = task
            .due_date
            .map(|d| d.format("%Y-%m-%dT%H:%M:%SZ").to_string());

        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO tasks (id, customer_id, title, description, due_date, status, priority, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
            params![
                uuid::Uuid::now_v7().to_string(),
                task.customer_id.as_str(),
                task.title,
                task.description,
                due,
                task.status().as_str(),
                task.priority.as_str(),
                now,
            ],
        )
        .map_err(|e| Error::failed("insert_task", e))?;
        Ok(())
    }

    fn upsert_marketing(&self, kind: MarketingKind, rows: &[MarketingRow]) -> Result<usize> {
        let now = crate::iso_timestamp();
        let conn = self.lock_conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "INSERT INTO {} (id, name, status, parent_id, payload, synced_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT (id) DO UPDATE SET
                    name = excluded.name,
                    status = excluded.status,
                    parent_id = excluded.parent_id,
                    payload = excluded.payload,
                    synced_at = excluded.synced_at",
                kind.table()
            ))
            .map_err(|e| Error::failed("prepare_upsert_marketing", e))?;

        for row in rows {
            let payload = to_json_text(&row.payload, "serialize_marketing_payload")?;
            stmt.execute(params![row.id, row.name, row.status, row.parent_id, payload, now])
                .map_err(|e| Error::failed("upsert_marketing", e))?;
        }
        Ok(rows.len())
    }

    fn upsert_ad_daily_metrics(&self, metrics: &[AdDailyMetric]) -> Result<usize> {
        let now = crate::iso_timestamp();
        let conn = self.lock_conn()?;
        let mut stmt = conn
            .prepare(
                "INSERT INTO ad_daily_metrics (ad_id, date, spend, impressions, clicks, leads, purchases, synced_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT (ad_id, date) DO UPDATE SET
                    spend = excluded.spend,
                    impressions = excluded.impressions,
                    clicks = excluded.clicks,
                    leads = excluded.leads,
                    purchases = excluded.purchases,
                    synced_at = excluded.synced_at",
            )
            .map_err(|e| Error::failed("prepare_upsert_metrics", e))?;

        for m in metrics {
            stmt.execute(params![
                m.ad_id,
                m.date.format("%Y-%m-%d").to_string(),
                m.spend,
                m.impressions,
                m.clicks,
                m.leads,
                m.purchases,
                now,
            ])
            .map_err(|e| Error::failed("upsert_ad_daily_metric", e))?;
        }
        Ok(metrics.len())
    }
}
