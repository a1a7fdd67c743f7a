//! Marketing records produced by the bulk ingest job.
//!
//! Campaign, ad set, ad and creative records are kept as the raw documents the
//! marketing API returns; only the keys needed for upsert (`id`, `name`,
//! `status` and the parent reference) are lifted into columns.

use super::Document;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Collections fetched in one bulk pull.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketingBundle {
    /// Campaigns.
    #[serde(default)]
    pub campaigns: Vec<Document>,
    /// Ad sets.
    #[serde(default)]
    pub adsets: Vec<Document>,
    /// Ads.
    #[serde(default)]
    pub ads: Vec<Document>,
    /// Ad creatives.
    #[serde(default)]
    pub creatives: Vec<Document>,
}

impl MarketingBundle {
    /// Total number of records across all collections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.campaigns.len() + self.adsets.len() + self.ads.len() + self.creatives.len()
    }

    /// Returns true if no collection holds a record.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Kind of marketing object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarketingKind {
    /// Campaign.
    Campaign,
    /// Ad set (child of a campaign).
    AdSet,
    /// Ad (child of an ad set).
    Ad,
    /// Creative.
    Creative,
}

impl MarketingKind {
    /// All kinds in upsert order (parents first).
    pub const ALL: [Self; 4] = [Self::Campaign, Self::AdSet, Self::Ad, Self::Creative];

    /// Table the kind is stored in.
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::Campaign => "ad_campaigns",
            Self::AdSet => "ad_sets",
            Self::Ad => "ads",
            Self::Creative => "ad_creatives",
        }
    }

    /// Key of the parent reference inside the raw document, if any.
    const fn parent_key(self) -> Option<&'static str> {
        match self {
            Self::Campaign | Self::Creative => None,
            Self::AdSet => Some("campaign_id"),
            Self::Ad => Some("adset_id"),
        }
    }

    /// Returns the bundle collection holding this kind.
    #[must_use]
    pub fn records(self, bundle: &MarketingBundle) -> &[Document] {
        match self {
            Self::Campaign => &bundle.campaigns,
            Self::AdSet => &bundle.adsets,
            Self::Ad => &bundle.ads,
            Self::Creative => &bundle.creatives,
        }
    }

    /// Returns the bundle collection holding this kind, mutably.
    pub fn records_mut(self, bundle: &mut MarketingBundle) -> &mut Vec<Document> {
        match self {
            Self::Campaign => &mut bundle.campaigns,
            Self::AdSet => &mut bundle.adsets,
            Self::Ad => &mut bundle.ads,
            Self::Creative => &mut bundle.creatives,
        }
    }
}

/// Upsert row lifted out of a raw marketing document.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketingRow {
    /// External identifier (upsert key).
    pub id: String,
    /// Display name.
    pub name: Option<String>,
    /// Delivery status.
    pub status: Option<String>,
    /// Parent object identifier.
    pub parent_id: Option<String>,
    /// Full raw document.
    pub payload: Value,
}

impl MarketingRow {
    /// Lifts a row from a raw document. Returns `None` when the document has no `id`.
    #[must_use]
    pub fn from_document(kind: MarketingKind, doc: &Document) -> Option<Self> {
        let id = text_field(doc, "id")?;
        let parent_id = kind.parent_key().and_then(|key| text_field(doc, key));
        Some(Self {
            id,
            name: text_field(doc, "name"),
            status: text_field(doc, "status"),
            parent_id,
            payload: Value::Object(doc.clone()),
        })
    }
}

/// Reads a field as text; numeric IDs are rendered as strings.
fn text_field(doc: &Document, key: &str) -> Option<String> {
    doc.get(key).and_then(as_text)
}

/// One ad's performance on one day. Keyed by (`ad_id`, `date`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdDailyMetric {
    /// Ad identifier.
    pub ad_id: String,
    /// Day the metrics cover.
    pub date: NaiveDate,
    /// Amount spent.
    pub spend: f64,
    /// Impressions served.
    pub impressions: i64,
    /// Link clicks.
    pub clicks: i64,
    /// Lead actions.
    pub leads: i64,
    /// Purchase actions.
    pub purchases: i64,
}

impl AdDailyMetric {
    /// Builds a metric from one daily insight row.
    ///
    /// The API reports numbers as strings; both strings and numbers are
    /// accepted. `actions` entries of type `lead` and `purchase` are summed.
    /// Returns `None` when the row has no `ad_id` or no parseable `date_start`.
    #[must_use]
    pub fn from_insight(insight: &Value) -> Option<Self> {
        let ad_id = insight.get("ad_id").and_then(as_text)?;
        let date = insight
            .get("date_start")
            .and_then(Value::as_str)
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())?;

        let actions = insight
            .get("actions")
            .and_then(Value::as_array)
            .map_or(&[][..], Vec::as_slice);

        Some(Self {
            ad_id,
            date,
            spend: insight.get("spend").and_then(as_f64).unwrap_or(0.0),
            impressions: insight.get("impressions").and_then(as_i64).unwrap_or(0),
            clicks: insight.get("clicks").and_then(as_i64).unwrap_or(0),
            leads: sum_actions(actions, "lead"),
            purchases: sum_actions(actions, "purchase"),
        })
    }
}

fn sum_actions(actions: &[Value], action_type: &str) -> i64 {
    actions
        .iter()
        .filter(|a| a.get("action_type").and_then(Value::as_str) == Some(action_type))
        .filter_map(|a| a.get("value").and_then(as_i64))
        .sum()
}

fn as_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
