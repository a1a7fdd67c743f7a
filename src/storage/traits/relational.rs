//! Relational store trait.

use crate::models::{
    AdDailyMetric, ConversationId, CustomerId, Document, MarketingKind, MarketingRow, NewTask,
};
use crate::storage::merge::merge_intelligence;
use crate::Result;

/// Statement-level boundary to a SQL database.
///
/// Implementations issue one statement per method (autocommit). Nothing here
/// spans a transaction: [`RelationalStore::merge_intelligence`] is a select
/// followed by an update, and a failure between the two leaves the row as it
/// was.
///
/// "No such row" is reported as `Ok(None)` / `Ok(false)`, never as an error,
/// so callers can tell a definitive miss apart from a failed statement.
pub trait RelationalStore: Send + Sync {
    /// Short backend name for logs (`postgres`, `sqlite`).
    fn backend_name(&self) -> &'static str;

    /// Checks that the connection is usable.
    fn ping(&self) -> Result<()>;

    /// Loads a customer's intelligence document.
    ///
    /// Returns `Ok(None)` when no customer row exists and an empty document
    /// when the row exists with a null intelligence column.
    fn load_intelligence(&self, customer_id: &CustomerId) -> Result<Option<Document>>;

    /// Replaces a customer's intelligence document.
    ///
    /// Returns `Ok(false)` when no row was updated.
    fn store_intelligence(&self, customer_id: &CustomerId, intelligence: &Document)
    -> Result<bool>;

    /// Loads a full customer document.
    fn get_customer(&self, customer_id: &CustomerId) -> Result<Option<Document>>;

    /// Lists all customer documents.
    fn list_customers(&self) -> Result<Vec<Document>>;

    /// Inserts or replaces a customer document keyed by `customer_id`.
    fn upsert_customer(&self, customer_id: &CustomerId, document: &Document) -> Result<()>;

    /// Upserts the conversation's last-updated marker.
    ///
    /// Messages themselves are not stored relationally.
    fn touch_conversation(&self, conversation_id: &ConversationId, updated_time: &str)
    -> Result<()>;

    /// Inserts one task row with status `PENDING`.
    fn insert_task(&self, task: &NewTask) -> Result<()>;

    /// Upserts marketing rows of one kind keyed by external id. Returns rows written.
    fn upsert_marketing(&self, kind: MarketingKind, rows: &[MarketingRow]) -> Result<usize>;

    /// Upserts daily metrics keyed by (`ad_id`, `date`). Returns rows written.
    fn upsert_ad_daily_metrics(&self, metrics: &[AdDailyMetric]) -> Result<usize>;

    /// Merges a patch into a customer's intelligence document.
    ///
    /// Select, merge in memory, update. Returns the merged document, or
    /// `Ok(None)` when the customer row does not exist (no update is issued).
    fn merge_intelligence(
        &self,
        customer_id: &CustomerId,
        patch: &Document,
    ) -> Result<Option<Document>> {
        let Some(mut intelligence) = self.load_intelligence(customer_id)? else {
            return Ok(None);
        };

        merge_intelligence(&mut intelligence, patch, &crate::iso_timestamp());

        if self.store_intelligence(customer_id, &intelligence)? {
            Ok(Some(intelligence))
        } else {
            Ok(None)
        }
    }
}
