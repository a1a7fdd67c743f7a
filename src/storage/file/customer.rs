//! File-backed customer profiles.

use super::layout::{RecordSpace, is_safe_segment, profile_file_name, read_document, write_document};
use super::merger::RecordMerger;
use super::resolver::{IdentifierResolver, MatchFields, Resolution};
use crate::models::{CustomerId, Document};
use crate::{Error, Result};
use std::fs;

/// Customer profiles stored as `<root>/<id>/profile_<id>.json`.
#[derive(Debug)]
pub struct FileCustomerStore {
    resolver: IdentifierResolver,
    merger: RecordMerger,
}

impl FileCustomerStore {
    /// Creates a store over the resolver's record space.
    #[must_use]
    pub const fn new(resolver: IdentifierResolver) -> Self {
        Self {
            resolver,
            merger: RecordMerger::new(),
        }
    }

    /// Returns the resolver.
    #[must_use]
    pub const fn resolver(&self) -> &IdentifierResolver {
        &self.resolver
    }

    /// Returns the record space.
    #[must_use]
    pub const fn space(&self) -> &RecordSpace {
        self.resolver.space()
    }

    /// Resolves an identifier to a profile location.
    ///
    /// # Errors
    ///
    /// Returns an error if the record space cannot be listed.
    pub fn resolve(&self, id: &CustomerId) -> Result<Option<Resolution>> {
        self.resolver.resolve(id)
    }

    /// Merges an intelligence patch into the customer's profile.
    ///
    /// Returns `Ok(None)` when the identifier resolves to nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile cannot be read or written.
    pub fn update_intelligence(&self, id: &CustomerId, patch: &Document) -> Result<Option<Document>> {
        let Some(found) = self.resolver.resolve(id)? else {
            return Ok(None);
        };
        self.merger.try_merge_intelligence(&found.path, patch).map(Some)
    }

    /// Loads a customer's profile.
    ///
    /// Besides the social-platform ID, the profile's own `customer_id` and
    /// `conversation_id` fields are matched.
    ///
    /// # Errors
    ///
    /// Returns an error if the located profile cannot be read.
    pub fn get_customer(&self, id: &CustomerId) -> Result<Option<Document>> {
        match self.resolver.resolve_with(id, MatchFields::Any)? {
            Some(found) => read_document(&found.path).map(Some),
            None => Ok(None),
        }
    }

    /// Lists every readable profile in name order.
    ///
    /// # Errors
    ///
    /// Returns an error if the record space root exists but cannot be listed.
    pub fn list_customers(&self) -> Result<Vec<Document>> {
        let space = self.resolver.space();
        if !space.exists() {
            return Ok(Vec::new());
        }

        let mut customers = Vec::new();
        for entry in space.entries()? {
            let Some(path) = RecordSpace::find_profile(&entry) else {
                continue;
            };
            match read_document(&path) {
                Ok(profile) => customers.push(profile),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable profile");
                },
            }
        }
        Ok(customers)
    }

    /// Writes a profile under its canonical identifier, replacing any
    /// existing one. The entry directory is created as needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the identifier is not a safe path
    /// segment, or an error if the write fails.
    pub fn upsert_customer(&self, id: &CustomerId, document: &Document) -> Result<()> {
        if !is_safe_segment(id.as_str()) {
            return Err(Error::InvalidInput(format!(
                "customer id is not a safe path segment: {id}"
            )));
        }

        let dir = self.space().root().join(id.as_str());
        fs::create_dir_all(&dir).map_err(|e| Error::failed("create_customer_dir", e))?;
        write_document(&dir.join(profile_file_name(id.as_str())), document)?;

        if let Some(index) = self.resolver.alias_index() {
            index.invalidate();
        }
        Ok(())
    }
}
