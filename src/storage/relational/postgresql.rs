//! PostgreSQL relational store.
//!
//! One pooled connection, created on connect and reused for the lifetime of
//! the store. Statements run in autocommit mode; nothing is wrapped in a
//! transaction. The schema below is created with `IF NOT EXISTS` so an
//! existing deployment's tables are left alone.

#[cfg(feature = "postgres")]
mod implementation {
    use crate::models::{
        AdDailyMetric, ConversationId, CustomerId, Document, INTELLIGENCE_KEY, MarketingKind,
        MarketingRow, NewTask,
    };
    use crate::storage::merge::intelligence_from_value;
    use crate::storage::traits::RelationalStore;
    use crate::{Error, Result};
    use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
    use serde_json::Value;
    use std::sync::Arc;
    use tokio::runtime::Runtime as TokioRuntime;
    use tokio_postgres::NoTls;

    /// Base schema.
    const SCHEMA: &str = r"
        CREATE TABLE IF NOT EXISTS customers (
            customer_id TEXT PRIMARY KEY,
            profile JSONB NOT NULL DEFAULT '{}'::jsonb,
            intelligence JSONB,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        );
        CREATE TABLE IF NOT EXISTS conversations (
            id TEXT PRIMARY KEY,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        );
        CREATE TABLE IF NOT EXISTS tasks (
            id TEXT PRIMARY KEY,
            customer_id TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            due_date TIMESTAMPTZ,
            status TEXT NOT NULL,
            priority TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        );
        CREATE INDEX IF NOT EXISTS idx_tasks_customer ON tasks(customer_id);
        CREATE TABLE IF NOT EXISTS ad_daily_metrics (
            ad_id TEXT NOT NULL,
            date DATE NOT NULL,
            spend DOUBLE PRECISION NOT NULL DEFAULT 0,
            impressions BIGINT NOT NULL DEFAULT 0,
            clicks BIGINT NOT NULL DEFAULT 0,
            leads BIGINT NOT NULL DEFAULT 0,
            purchases BIGINT NOT NULL DEFAULT 0,
            synced_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            PRIMARY KEY (ad_id, date)
        )
    ";

    /// Marketing object table, `{table}` is replaced per kind.
    const MARKETING_TABLE: &str = r"
        CREATE TABLE IF NOT EXISTS {table} (
            id TEXT PRIMARY KEY,
            name TEXT,
            status TEXT,
            parent_id TEXT,
            payload JSONB NOT NULL,
            synced_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
    ";

    /// PostgreSQL-backed relational store.
    pub struct PostgresStore {
        /// Connection pool (size one).
        pool: Pool,
        /// Tokio runtime for blocking operations.
        runtime: Arc<TokioRuntime>,
    }

    impl PostgresStore {
        /// Connects, verifies the connection and ensures the schema.
        ///
        /// # Errors
        ///
        /// Returns [`Error::ConnectionUnavailable`] if the server cannot be
        /// reached, or an error if schema creation fails.
        pub fn connect(connection_url: &str) -> Result<Self> {
            let runtime =
                TokioRuntime::new().map_err(|e| Error::failed("create_tokio_runtime", e))?;

            let mut cfg = Config::new();
            cfg.url = Some(connection_url.to_string());
            cfg.manager = Some(ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            });
            cfg.pool = Some(PoolConfig::new(1));

            let pool = cfg
                .create_pool(Some(Runtime::Tokio1), NoTls)
                .map_err(|e| Error::failed("create_postgres_pool", e))?;

            let store = Self {
                pool,
                runtime: Arc::new(runtime),
            };
            store.ping()?;
            store.ensure_schema()?;
            Ok(store)
        }

        /// Creates missing tables.
        fn ensure_schema(&self) -> Result<()> {
            self.runtime.block_on(async {
                let client = self.client().await?;

                let mut batch = SCHEMA.to_string();
                for kind in MarketingKind::ALL {
                    batch.push(';');
                    batch.push_str(&MARKETING_TABLE.replace("{table}", kind.table()));
                }

                client
                    .batch_execute(&batch)
                    .await
                    .map_err(|e| Error::failed("create_relational_schema", e))
            })
        }

        async fn client(&self) -> Result<deadpool_postgres::Object> {
            self.pool
                .get()
                .await
                .map_err(|e| Error::ConnectionUnavailable(e.to_string()))
        }
    }

    fn customer_document(
        customer_id: String,
        profile: Option<Value>,
        intelligence: Option<Value>,
    ) -> Document {
        let mut doc = match profile {
            Some(Value::Object(map)) => map,
            _ => Document::new(),
        };
        doc.insert("customer_id".to_string(), Value::String(customer_id));
        if let Some(intel) = intelligence {
            doc.insert(INTELLIGENCE_KEY.to_string(), intel);
        }
        doc
    }

    impl RelationalStore for PostgresStore {
        fn backend_name(&self) -> &'static str {
            "postgres"
        }

        fn ping(&self) -> Result<()> {
            self.runtime.block_on(async {
                let client = self.client().await?;
                client
                    .simple_query("SELECT 1")
                    .await
                    .map(|_| ())
                    .map_err(|e| Error::ConnectionUnavailable(e.to_string()))
            })
        }

        fn load_intelligence(&self, customer_id: &CustomerId) -> Result<Option<Document>> {
            self.runtime.block_on(async {
                let client = self.client().await?;
                let row = client
                    .query_opt(
                        "SELECT intelligence FROM customers WHERE customer_id = $1",
                        &[&customer_id.as_str()],
                    )
                    .await
                    .map_err(|e| Error::failed("select_intelligence", e))?;

                row.map(|r| {
                    r.try_get::<_, Option<Value>>(0)
                        .map(intelligence_from_value)
                        .map_err(|e| Error::failed("read_intelligence", e))
                })
                .transpose()
            })
        }

        fn store_intelligence(
            &self,
            customer_id: &CustomerId,
            intelligence: &Document,
        ) -> Result<bool> {
            let value = Value::Object(intelligence.clone());
            self.runtime.block_on(async {
                let client = self.client().await?;
                let updated = client
                    .execute(
                        "UPDATE customers SET intelligence = $1, updated_at = NOW() WHERE customer_id = $2",
                        &[&value, &customer_id.as_str()],
                    )
                    .await
                    .map_err(|e| Error::failed("update_intelligence", e))?;
                Ok(updated > 0)
            })
        }

        fn get_customer(&self, customer_id: &CustomerId) -> Result<Option<Document>> {
            self.runtime.block_on(async {
                let client = self.client().await?;
                let row = client
                    .query_opt(
                        "SELECT customer_id, profile, intelligence FROM customers WHERE customer_id = $1",
                        &[&customer_id.as_str()],
                    )
                    .await
                    .map_err(|e| Error::failed("select_customer", e))?;

                Ok(row.map(|r| customer_document(r.get(0), r.get(1), r.get(2))))
            })
        }

        fn list_customers(&self) -> Result<Vec<Document>> {
            self.runtime.block_on(async {
                let client = self.client().await?;
                let rows = client
                    .query(
                        "SELECT customer_id, profile, intelligence FROM customers ORDER BY customer_id",
                        &[],
                    )
                    .await
                    .map_err(|e| Error::failed("list_customers", e))?;

                Ok(rows
                    .iter()
                    .map(|r| customer_document(r.get(0), r.get(1), r.get(2)))
                    .collect())
            })
        }

        fn upsert_customer(&self, customer_id: &CustomerId, document: &Document) -> Result<()> {
            let mut profile = document.clone();
            let intelligence = profile.remove(INTELLIGENCE_KEY);
            let profile = Value::Object(profile);

            self.runtime.block_on(async {
                let client = self.client().await?;
                client
                    .execute(
                        "INSERT INTO customers (customer_id, profile, intelligence)
                         VALUES ($1, $2, $3)
                         ON CONFLICT (customer_id) DO UPDATE SET
                            profile = EXCLUDED.profile,
                            intelligence = COALESCE(EXCLUDED.intelligence, customers.intelligence),
                            updated_at = NOW()",
                        &[&customer_id.as_str(), &profile, &intelligence],
                    )
                    .await
                    .map_err(|e| Error::failed("upsert_customer", e))?;
                Ok(())
            })
        }

        fn touch_conversation(
            &self,
            conversation_id: &ConversationId,
            updated_time: &str,
        ) -> Result<()> {
            self.runtime.block_on(async {
                let client = self.client().await?;
                client
                    .execute(
                        "INSERT INTO conversations (id, updated_at) VALUES ($1, $2::TEXT::timestamptz)
                         ON CONFLICT (id) DO UPDATE SET updated_at = EXCLUDED.updated_at",
                        &[&conversation_id.as_str(), &updated_time],
                    )
                    .await
                    .map_err(|e| Error::failed("upsert_conversation", e))?;
                Ok(())
            })
        }

        fn insert_task(&self, task: &NewTask) -> Result<()> {
            let id = uuid::Uuid::now_v7().to_string();
            let due = task.due_date.map(|d| d.to_rfc3339());

            self.runtime.block_on(async {
                let client = self.client().await?;
                client
                    .execute(
                        "INSERT INTO tasks (id, customer_id, title, description, due_date, status, priority)
                         VALUES ($1, $2, $3, $4, $5::TEXT::timestamptz, $6, $7)",
                        &[
                            &id,
                            &task.customer_id.as_str(),
                            &task.title,
                            &task.description,
                            &due,
                            &task.status().as_str(),
                            &task.priority.as_str(),
                        ],
                    )
                    .await
                    .map_err(|e| Error::failed("insert_task", e))?;
                Ok(())
            })
        }

        fn upsert_marketing(&self, kind: MarketingKind, rows: &[MarketingRow]) -> Result<usize> {
            let sql = format!(
                "INSERT INTO {} (id, name, status, parent_id, payload, synced_at)
                 VALUES ($1, $2, $3, $4, $5, NOW())
                 ON CONFLICT (id) DO UPDATE SET
                    name = EXCLUDED.name,
                    status = EXCLUDED.status,
                    parent_id = EXCLUDED.parent_id,
                    payload = EXCLUDED.payload,
                    synced_at = NOW()",
                kind.table()
            );

            self.runtime.block_on(async {
                let client = self.client().await?;
                let stmt = client
                    .prepare(&sql)
                    .await
                    .map_err(|e| Error::failed("prepare_upsert_marketing", e))?;

                for row in rows {
                    client
                        .execute(
                            &stmt,
                            &[&row.id, &row.name, &row.status, &row.parent_id, &row.payload],
                        )
                        .await
                        .map_err(|e| Error::failed("upsert_marketing", e))?;
                }
                Ok(rows.len())
            })
        }

        fn upsert_ad_daily_metrics(&self, metrics: &[AdDailyMetric]) -> Result<usize> {
            self.runtime.block_on(async {
                let client = self.client().await?;
                let stmt = client
                    .prepare(
                        "INSERT INTO ad_daily_metrics (ad_id, date, spend, impressions, clicks, leads, purchases, synced_at)
                         VALUES ($1, $2::TEXT::date, $3, $4, $5, $6, $7, NOW())
                         ON CONFLICT (ad_id, date) DO UPDATE SET
                            spend = EXCLUDED.spend,
                            impressions = EXCLUDED.impressions,
                            clicks = EXCLUDED.clicks,
                            leads = EXCLUDED.leads,
                            purchases = EXCLUDED.purchases,
                            synced_at = NOW()",
                    )
                    .await
                    .map_err(|e| Error::failed("prepare_upsert_metrics", e))?;

                for m in metrics {
                    let date = m.date.format("%Y-%m-%d").to_string();
                    client
                        .execute(
                            &stmt,
                            &[
                                &m.ad_id,
                                &date,
                                &m.spend,
                                &m.impressions,
                                &m.clicks,
                                &m.leads,
                                &m.purchases,
                            ],
                        )
                        .await
                        .map_err(|e| Error::failed("upsert_ad_daily_metric", e))?;
                }
                Ok(metrics.len())
            })
        }
    }
}

#[cfg(feature = "postgres")]
pub use implementation::PostgresStore;

#[cfg(not(feature = "postgres"))]
mod stub {
    use crate::models::{
        AdDailyMetric, ConversationId, CustomerId, Document, MarketingKind, MarketingRow, NewTask,
    };
    use crate::storage::traits::RelationalStore;
    use crate::{Error, Result};

    /// PostgreSQL store placeholder when the `postgres` feature is disabled.
    pub struct PostgresStore {
        _private: (),
    }

    fn disabled<T>() -> Result<T> {
        Err(Error::FeatureNotEnabled("postgres".to_string()))
    }

    impl PostgresStore {
        /// Always fails: the `postgres` feature is not enabled.
        ///
        /// # Errors
        ///
        /// Always returns [`Error::FeatureNotEnabled`].
        pub fn connect(_connection_url: &str) -> Result<Self> {
            disabled()
        }
    }

    impl RelationalStore for PostgresStore {
        fn backend_name(&self) -> &'static str {
            "postgres"
        }

        fn ping(&self) -> Result<()> {
            disabled()
        }

        fn load_intelligence(&self, _customer_id: &CustomerId) -> Result<Option<Document>> {
            disabled()
        }

        fn store_intelligence(&self, _customer_id: &CustomerId, _intelligence: &Document) -> Result<bool> {
            disabled()
        }

        fn get_customer(&self, _customer_id: &CustomerId) -> Result<Option<Document>> {
            disabled()
        }

        fn list_customers(&self) -> Result<Vec<Document>> {
            disabled()
        }

        fn upsert_customer(&self, _customer_id: &CustomerId, _document: &Document) -> Result<()> {
            disabled()
        }

        fn touch_conversation(&self, _conversation_id: &ConversationId, _updated_time: &str) -> Result<()> {
            disabled()
        }

        fn insert_task(&self, _task: &NewTask) -> Result<()> {
            disabled()
        }

        fn upsert_marketing(&self, _kind: MarketingKind, _rows: &[MarketingRow]) -> Result<usize> {
            disabled()
        }

        fn upsert_ad_daily_metrics(&self, _metrics: &[AdDailyMetric]) -> Result<usize> {
            disabled()
        }
    }
}

#[cfg(not(feature = "postgres"))]
pub use stub::PostgresStore;
