//! Marketing sync job.

use super::{GraphApiSource, MarketingSource};
use crate::config::MarketingConfig;
use crate::models::{AdDailyMetric, MarketingBundle, MarketingKind};
use crate::observability::{SYNC_RECORDS_TOTAL, SYNC_RUNS_TOTAL};
use crate::services::MarketingAdapter;
use crate::Result;
use chrono::{Days, NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

/// Days of daily insights pulled per run.
pub const DEFAULT_INSIGHT_DAYS: u32 = 7;

/// Prefix the marketing API expects on ad account ids.
const ACCOUNT_PREFIX: &str = "act_";

/// Returns the account id with the `act_` prefix.
#[must_use]
pub fn normalize_account_id(account_id: &str) -> String {
    let trimmed = account_id.trim();
    if trimmed.starts_with(ACCOUNT_PREFIX) {
        trimmed.to_string()
    } else {
        format!("{ACCOUNT_PREFIX}{trimmed}")
    }
}

/// Records fetched and written by one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncCounts {
    /// Campaigns fetched.
    pub campaigns: usize,
    /// Ad sets fetched.
    pub adsets: usize,
    /// Ads fetched.
    pub ads: usize,
    /// Creatives fetched.
    pub creatives: usize,
    /// Daily metric rows upserted.
    pub daily_metrics: usize,
}

/// Result of a sync run, printed as one JSON line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Overall outcome.
    pub success: bool,
    /// Summary on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Failure cause.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Normalised account id, once known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    /// Record counts.
    pub counts: SyncCounts,
}

impl SyncReport {
    fn succeeded(account_id: String, counts: SyncCounts) -> Self {
        Self {
            success: true,
            details: Some("Marketing sync completed successfully".to_string()),
            error: None,
            account_id: Some(account_id),
            counts,
        }
    }

    fn failed(account_id: Option<String>, counts: SyncCounts, error: impl Into<String>) -> Self {
        Self {
            success: false,
            details: None,
            error: Some(error.into()),
            account_id,
            counts,
        }
    }

    /// Serialises the report as a single JSON line.
    #[must_use]
    pub fn to_json_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"success":false}"#.to_string())
    }
}

/// Pulls marketing objects and daily insights and upserts them.
pub struct MarketingSyncJob {
    source: Option<Arc<dyn MarketingSource>>,
    account_id: Option<String>,
    insight_days: u32,
    marketing: MarketingAdapter,
}

impl MarketingSyncJob {
    /// Creates a job around an explicit source.
    #[must_use]
    pub fn new(
        source: Arc<dyn MarketingSource>,
        account_id: impl Into<String>,
        marketing: MarketingAdapter,
    ) -> Self {
        Self {
            source: Some(source),
            account_id: Some(account_id.into()),
            insight_days: DEFAULT_INSIGHT_DAYS,
            marketing,
        }
    }

    /// Creates a job using the Graph API with credentials from `config`.
    ///
    /// Missing credentials are not an error here; [`Self::run`] reports them.
    #[must_use]
    pub fn from_config(config: &MarketingConfig, marketing: MarketingAdapter) -> Self {
        let source = config.access_token.clone().map(|token| {
            let source = GraphApiSource::new(token);
            let source = match &config.api_base {
                Some(base) => source.with_api_base(base.clone()),
                None => source,
            };
            Arc::new(source) as Arc<dyn MarketingSource>
        });

        Self {
            source,
            account_id: config.ad_account_id.clone().filter(|id| !id.trim().is_empty()),
            insight_days: config.insight_days.unwrap_or(DEFAULT_INSIGHT_DAYS),
            marketing,
        }
    }

    /// Sets the insight window length in days.
    #[must_use]
    pub const fn with_insight_days(mut self, days: u32) -> Self {
        self.insight_days = days;
        self
    }

    /// Runs the job with today's date (UTC) closing the insight window.
    pub fn run(&self) -> SyncReport {
        self.run_until(Utc::now().date_naive())
    }

    /// Runs the job with `until` closing the insight window.
    #[instrument(skip(self), fields(insight_days = self.insight_days))]
    pub fn run_until(&self, until: NaiveDate) -> SyncReport {
        let report = self.execute(until);
        let result = if report.success { "success" } else { "failure" };
        metrics::counter!(SYNC_RUNS_TOTAL, "result" => result).increment(1);

        if report.success {
            tracing::info!(counts = ?report.counts, "Marketing sync complete");
        } else {
            tracing::error!(error = report.error.as_deref().unwrap_or(""), "Marketing sync failed");
        }
        report
    }

    fn execute(&self, until: NaiveDate) -> SyncReport {
        let (Some(source), Some(account_id)) = (&self.source, &self.account_id) else {
            return SyncReport::failed(
                None,
                SyncCounts::default(),
                "missing credentials: FB_ACCESS_TOKEN and FB_AD_ACCOUNT_ID are required",
            );
        };
        let account_id = normalize_account_id(account_id);
        let mut counts = SyncCounts::default();

        tracing::info!(source = source.name(), account_id = %account_id, "Fetching marketing data");
        let bundle = match fetch_bundle(source.as_ref(), &account_id) {
            Ok(bundle) => bundle,
            Err(e) => return SyncReport::failed(Some(account_id), counts, e.to_string()),
        };
        counts.campaigns = bundle.campaigns.len();
        counts.adsets = bundle.adsets.len();
        counts.ads = bundle.ads.len();
        counts.creatives = bundle.creatives.len();

        let outcome = self.marketing.upsert_marketing_data_outcome(&bundle);
        if !outcome.is_success() {
            return SyncReport::failed(
                Some(account_id),
                counts,
                format!("failed to save marketing data ({})", outcome.status.as_str()),
            );
        }

        let since = until
            .checked_sub_days(Days::new(u64::from(self.insight_days)))
            .unwrap_or(until);
        let daily = match fetch_metrics(source.as_ref(), &account_id, since, until) {
            Ok(daily) => daily,
            Err(e) => return SyncReport::failed(Some(account_id), counts, e.to_string()),
        };

        if !daily.is_empty() {
            let outcome = self.marketing.upsert_ad_daily_metrics_outcome(&daily);
            if !outcome.is_success() {
                return SyncReport::failed(
                    Some(account_id),
                    counts,
                    format!("failed to save daily metrics ({})", outcome.status.as_str()),
                );
            }
            counts.daily_metrics = daily.len();
        }

        SyncReport::succeeded(account_id, counts)
    }
}

impl std::fmt::Debug for MarketingSyncJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketingSyncJob")
            .field("source", &self.source.as_ref().map(|s| s.name()))
            .field("account_id", &self.account_id)
            .field("insight_days", &self.insight_days)
            .finish_non_exhaustive()
    }
}

fn fetch_bundle(source: &dyn MarketingSource, account_id: &str) -> Result<MarketingBundle> {
    let mut bundle = MarketingBundle::default();
    for kind in MarketingKind::ALL {
        let records = source.fetch(account_id, kind)?;
        tracing::info!(table = kind.table(), count = records.len(), "Fetched marketing records");
        metrics::counter!(SYNC_RECORDS_TOTAL, "kind" => kind.table())
            .increment(records.len() as u64);
        *kind.records_mut(&mut bundle) = records;
    }
    Ok(bundle)
}

fn fetch_metrics(
    source: &dyn MarketingSource,
    account_id: &str,
    since: NaiveDate,
    until: NaiveDate,
) -> Result<Vec<AdDailyMetric>> {
    let insights = source.daily_insights(account_id, since, until)?;
    let metrics: Vec<AdDailyMetric> = insights
        .iter()
        .filter_map(AdDailyMetric::from_insight)
        .collect();

    if metrics.len() < insights.len() {
        tracing::warn!(
            skipped = insights.len() - metrics.len(),
            "Skipping insights without ad_id or date_start"
        );
    }
    Ok(metrics)
}
