//! Bulk ingest of marketing data.
//!
//! A [`MarketingSource`] yields raw campaign, ad set, ad and creative
//! documents plus daily per-ad insights; [`MarketingSyncJob`] writes them
//! through the relational bulk-upsert entry points of the
//! [`MarketingAdapter`](crate::MarketingAdapter).

mod graph_api;
mod job;

pub use graph_api::GraphApiSource;
pub use job::{MarketingSyncJob, SyncCounts, SyncReport, normalize_account_id};

use crate::Result;
use crate::models::{Document, MarketingKind};
use chrono::NaiveDate;
use serde_json::Value;

/// Source of marketing objects for one ad account.
pub trait MarketingSource: Send + Sync {
    /// Source name for logs.
    fn name(&self) -> &'static str;

    /// Fetches every object of `kind` in the account.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or response decoding fails.
    fn fetch(&self, account_id: &str, kind: MarketingKind) -> Result<Vec<Document>>;

    /// Fetches per-ad daily insights for the inclusive date window.
    ///
    /// # Errors
    ///
    /// Returns an error if the request or response decoding fails.
    fn daily_insights(&self, account_id: &str, since: NaiveDate, until: NaiveDate)
    -> Result<Vec<Value>>;
}
