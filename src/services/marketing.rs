//! Marketing adapter: bulk upsert entry points for the ingest job.
//!
//! Relational only. The file backend reports
//! [`OutcomeStatus::Unsupported`](crate::OutcomeStatus::Unsupported).

use super::dispatch::{Dispatcher, Outcome, Served};
use crate::models::{AdDailyMetric, EntityKind, MarketingBundle, MarketingKind, MarketingRow};
use crate::storage::RelationalStore;
use crate::Result;
use std::sync::Arc;
use tracing::instrument;

/// Bulk marketing upserts.
#[derive(Debug, Clone)]
pub struct MarketingAdapter {
    dispatcher: Arc<Dispatcher>,
}

impl MarketingAdapter {
    /// Creates a marketing adapter.
    #[must_use]
    pub const fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Upserts campaigns, ad sets, ads and creatives keyed by external id.
    pub fn upsert_marketing_data(&self, bundle: &MarketingBundle) -> bool {
        self.upsert_marketing_data_outcome(bundle).is_success()
    }

    /// Upserts a marketing bundle, returning the number of rows written.
    #[instrument(skip(self, bundle), fields(records = bundle.len()))]
    pub fn upsert_marketing_data_outcome(&self, bundle: &MarketingBundle) -> Outcome<usize> {
        self.dispatcher.dispatch(
            EntityKind::Marketing,
            "upsert_marketing_data",
            |store| upsert_bundle(store, bundle).map(Served::Applied),
            || Ok(Served::Unsupported),
        )
    }

    /// Upserts daily ad metrics keyed by (`ad_id`, `date`).
    pub fn upsert_ad_daily_metrics(&self, metrics: &[AdDailyMetric]) -> bool {
        self.upsert_ad_daily_metrics_outcome(metrics).is_success()
    }

    /// Upserts daily ad metrics, returning the number of rows written.
    #[instrument(skip(self, metrics), fields(records = metrics.len()))]
    pub fn upsert_ad_daily_metrics_outcome(&self, metrics: &[AdDailyMetric]) -> Outcome<usize> {
        self.dispatcher.dispatch(
            EntityKind::Marketing,
            "upsert_ad_daily_metrics",
            |store| store.upsert_ad_daily_metrics(metrics).map(Served::Applied),
            || Ok(Served::Unsupported),
        )
    }
}

fn upsert_bundle(store: &dyn RelationalStore, bundle: &MarketingBundle) -> Result<usize> {
    let mut written = 0;
    for kind in MarketingKind::ALL {
        let docs = kind.records(bundle);
        let rows: Vec<MarketingRow> = docs
            .iter()
            .filter_map(|doc| MarketingRow::from_document(kind, doc))
            .collect();
        if rows.len() < docs.len() {
            tracing::warn!(
                table = kind.table(),
                skipped = docs.len() - rows.len(),
                "Skipping marketing records without id"
            );
        }
        written += store.upsert_marketing(kind, &rows)?;
    }
    Ok(written)
}
