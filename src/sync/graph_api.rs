//! Marketing API client (Graph API over blocking HTTP).

use super::MarketingSource;
use crate::models::{Document, MarketingKind};
use crate::{Error, Result};
use chrono::NaiveDate;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Page size requested from every collection edge.
const PAGE_LIMIT: &str = "100";

/// Upper bound on followed `paging.next` links per collection.
const MAX_PAGES: usize = 500;

/// [`MarketingSource`] backed by the Graph API.
pub struct GraphApiSource {
    access_token: SecretString,
    api_base: String,
    client: reqwest::blocking::Client,
}

impl GraphApiSource {
    /// Default API base URL.
    pub const DEFAULT_API_BASE: &'static str = "https://graph.facebook.com/v19.0";

    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Creates a client for the default API base.
    #[must_use]
    pub fn new(access_token: SecretString) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Self::DEFAULT_TIMEOUT)
            .build()
            .unwrap_or_else(|err| {
                tracing::warn!("Failed to build marketing HTTP client: {err}");
                reqwest::blocking::Client::new()
            });

        Self {
            access_token,
            api_base: Self::DEFAULT_API_BASE.to_string(),
            client,
        }
    }

    /// Sets the API base URL.
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Returns the API base URL.
    #[must_use]
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// GETs a collection edge and follows `paging.next` until exhausted.
    fn get_all(&self, path: &str, params: &[(&str, String)]) -> Result<Vec<Value>> {
        let mut query: Vec<(&str, String)> = params.to_vec();
        query.push(("limit", PAGE_LIMIT.to_string()));
        query.push(("access_token", self.access_token.expose_secret().to_string()));

        let mut request = self
            .client
            .get(format!("{}/{path}", self.api_base))
            .query(&query);
        let mut items = Vec::new();

        for page_number in 1..=MAX_PAGES {
            let page = self.get_page(request, path)?;
            items.extend(page.data);

            match page.paging.and_then(|p| p.next) {
                Some(next) => {
                    tracing::debug!(edge = path, page = page_number, "Following next page");
                    // `next` already carries the token and cursor.
                    request = self.client.get(next);
                },
                None => return Ok(items),
            }
        }

        tracing::warn!(edge = path, pages = MAX_PAGES, "Page limit reached, result truncated");
        Ok(items)
    }

    fn get_page(&self, request: reqwest::blocking::RequestBuilder, path: &str) -> Result<Page> {
        let response = request
            .send()
            .map_err(|e| Error::failed("marketing_api_request", redact(&e.to_string(), &self.access_token)))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| Error::failed("marketing_api_response", e))?;

        if !status.is_success() {
            return Err(Error::failed(
                "marketing_api_request",
                format!("{path} returned {status}: {}", api_error_message(&body)),
            ));
        }

        serde_json::from_str(&body).map_err(|e| Error::failed("marketing_api_response", e))
    }
}

impl std::fmt::Debug for GraphApiSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphApiSource")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

impl MarketingSource for GraphApiSource {
    fn name(&self) -> &'static str {
        "graph_api"
    }

    fn fetch(&self, account_id: &str, kind: MarketingKind) -> Result<Vec<Document>> {
        let path = format!("{account_id}/{}", edge(kind));
        let items = self.get_all(&path, &[("fields", fields(kind).to_string())])?;

        Ok(items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(doc) => Some(doc),
                _ => None,
            })
            .collect())
    }

    fn daily_insights(
        &self,
        account_id: &str,
        since: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<Value>> {
        let time_range = serde_json::json!({
            "since": since.format("%Y-%m-%d").to_string(),
            "until": until.format("%Y-%m-%d").to_string(),
        });

        self.get_all(
            &format!("{account_id}/insights"),
            &[
                ("fields", "ad_id,spend,impressions,clicks,actions".to_string()),
                ("level", "ad".to_string()),
                ("time_increment", "1".to_string()),
                ("time_range", time_range.to_string()),
            ],
        )
    }
}

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    data: Vec<Value>,
    paging: Option<Paging>,
}

#[derive(Debug, Deserialize)]
struct Paging {
    next: Option<String>,
}

const fn edge(kind: MarketingKind) -> &'static str {
    match kind {
        MarketingKind::Campaign => "campaigns",
        MarketingKind::AdSet => "adsets",
        MarketingKind::Ad => "ads",
        MarketingKind::Creative => "adcreatives",
    }
}

const fn fields(kind: MarketingKind) -> &'static str {
    match kind {
        MarketingKind::Campaign => "id,name,status,objective,start_time",
        MarketingKind::AdSet => "id,name,status,daily_budget,campaign_id,targeting",
        MarketingKind::Ad => "id,name,status,adset_id,creative",
        MarketingKind::Creative => {
            "id,name,body,title,image_url,thumbnail_url,call_to_action_type"
        },
    }
}

/// Extracts `error.message` from an API error body, or returns the body.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.chars().take(200).collect())
}

/// Transport errors echo the URL, which carries the token.
fn redact(message: &str, token: &SecretString) -> String {
    let token = token.expose_secret();
    if token.is_empty() {
        message.to_string()
    } else {
        message.replace(token, "[REDACTED]")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_page_decoding() {
        let page: Page = serde_json::from_str(
            r#"{"data":[{"id":"1"},{"id":"2"}],"paging":{"cursors":{"after":"x"},"next":"https://example.test/next"}}"#,
        )
        .unwrap();
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.paging.unwrap().next.as_deref(), Some("https://example.test/next"));

        let last: Page = serde_json::from_str(r#"{"data":[]}"#).unwrap();
        assert!(last.paging.is_none());
    }

    #[test]
    fn test_edges_and_fields() {
        assert_eq!(edge(MarketingKind::Creative), "adcreatives");
        assert!(fields(MarketingKind::AdSet).contains("campaign_id"));
        assert!(fields(MarketingKind::Ad).contains("adset_id"));
    }

    #[test]
    fn test_api_error_message() {
        let body = r#"{"error":{"message":"Invalid OAuth access token.","code":190}}"#;
        assert_eq!(api_error_message(body), "Invalid OAuth access token.");
        assert_eq!(api_error_message("gateway timeout"), "gateway timeout");
    }

    #[test]
    fn test_redact() {
        let token = SecretString::from("s3cr3t");
        assert_eq!(
            redact("error sending request for url (https://x/?access_token=s3cr3t)", &token),
            "error sending request for url (https://x/?access_token=[REDACTED])"
        );
    }

    #[test]
    fn test_api_base_trims_slash() {
        let source = GraphApiSource::new(SecretString::from("t")).with_api_base("http://localhost:9/v1/");
        assert_eq!(source.api_base(), "http://localhost:9/v1");
        assert!(!format!("{source:?}").contains("access_token"));
    }
}
