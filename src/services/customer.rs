//! Customer adapter.

use super::dispatch::{Dispatcher, Outcome, Served};
use crate::models::{CustomerId, Document, EntityKind};
use crate::storage::{FileCustomerStore, Resolution};
use crate::{Error, Result};
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

/// Customer profile and intelligence operations.
#[derive(Debug, Clone)]
pub struct CustomerAdapter {
    dispatcher: Arc<Dispatcher>,
    files: Arc<FileCustomerStore>,
}

impl CustomerAdapter {
    /// Creates a customer adapter.
    #[must_use]
    pub const fn new(dispatcher: Arc<Dispatcher>, files: Arc<FileCustomerStore>) -> Self {
        Self { dispatcher, files }
    }

    /// Merges `patch` into the customer's intelligence document.
    ///
    /// Returns `true` if the merge was persisted. An identifier that resolves
    /// to nothing returns `false`.
    pub fn update_customer_intelligence(&self, id: impl Into<CustomerId>, patch: &Document) -> bool {
        self.update_customer_intelligence_outcome(&id.into(), patch)
            .is_success()
    }

    /// Merges `patch` into the customer's intelligence document, reporting
    /// which backend served the call. The value is the merged intelligence
    /// document.
    #[instrument(skip(self, patch), fields(customer_id = %id, keys = patch.len()))]
    pub fn update_customer_intelligence_outcome(
        &self,
        id: &CustomerId,
        patch: &Document,
    ) -> Outcome<Document> {
        self.dispatcher.dispatch(
            EntityKind::Customer,
            "update_customer_intelligence",
            |store| {
                Ok(store
                    .merge_intelligence(id, patch)?
                    .map_or(Served::NotFound, Served::Applied))
            },
            || {
                Ok(match self.files.update_intelligence(id, patch)? {
                    Some(record) => Served::Applied(intelligence_of(&record)),
                    None => Served::NotFound,
                })
            },
        )
    }

    /// Loads a customer profile.
    pub fn get_customer(&self, id: impl Into<CustomerId>) -> Option<Document> {
        self.get_customer_outcome(&id.into()).into_value()
    }

    /// Loads a customer profile, reporting which backend served the call.
    #[instrument(skip(self), fields(customer_id = %id))]
    pub fn get_customer_outcome(&self, id: &CustomerId) -> Outcome<Document> {
        self.dispatcher.dispatch(
            EntityKind::Customer,
            "get_customer",
            |store| Ok(store.get_customer(id)?.map_or(Served::NotFound, Served::Applied)),
            || Ok(self.files.get_customer(id)?.map_or(Served::NotFound, Served::Applied)),
        )
    }

    /// Lists all customer profiles. Failures yield an empty list.
    pub fn list_customers(&self) -> Vec<Document> {
        self.list_customers_outcome().into_value().unwrap_or_default()
    }

    /// Lists all customer profiles, reporting which backend served the call.
    #[instrument(skip(self))]
    pub fn list_customers_outcome(&self) -> Outcome<Vec<Document>> {
        self.dispatcher.dispatch(
            EntityKind::Customer,
            "list_customers",
            |store| store.list_customers().map(Served::Applied),
            || self.files.list_customers().map(Served::Applied),
        )
    }

    /// Inserts or replaces a customer profile keyed by its `customer_id` field.
    pub fn upsert_customer(&self, document: &Document) -> bool {
        self.upsert_customer_outcome(document).is_success()
    }

    /// Inserts or replaces a customer profile, reporting which backend served
    /// the call.
    #[instrument(skip(self, document))]
    pub fn upsert_customer_outcome(&self, document: &Document) -> Outcome {
        let id = match customer_id_of(document) {
            Ok(id) => id,
            Err(e) => return self.dispatcher.reject(EntityKind::Customer, "upsert_customer", e),
        };

        self.dispatcher.dispatch(
            EntityKind::Customer,
            "upsert_customer",
            |store| store.upsert_customer(&id, document).map(Served::Applied),
            || self.files.upsert_customer(&id, document).map(Served::Applied),
        )
    }

    /// Resolves an identifier to a profile file (file backend only).
    ///
    /// # Errors
    ///
    /// Returns an error if the record space cannot be listed.
    pub fn resolve(&self, id: impl Into<CustomerId>) -> Result<Option<Resolution>> {
        self.files.resolve(&id.into())
    }
}

fn intelligence_of(record: &Document) -> Document {
    record
        .get(crate::models::INTELLIGENCE_KEY)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

fn customer_id_of(document: &Document) -> Result<CustomerId> {
    match document.get("customer_id") {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(CustomerId::new(s.clone())),
        Some(Value::Number(n)) => Ok(CustomerId::new(n.to_string())),
        _ => Err(Error::InvalidInput(
            "customer document has no customer_id".to_string(),
        )),
    }
}
