//! In-memory alternate-identifier index.
//!
//! Maps social-platform identifiers to profile paths so repeated lookups
//! avoid the linear scan. The index is a cache over files other processes
//! may edit, so every hit is re-validated against the profile on disk and
//! any miss or stale hit triggers a rebuild.

use super::layout::{RecordSpace, read_document};
use super::resolver::social_id;
use crate::models::CustomerId;
use crate::observability::RESOLVER_SCAN_ENTRIES_TOTAL;
use crate::{Error, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

/// Lazily built `alias -> profile path` map.
#[derive(Debug, Default)]
pub struct AliasIndex {
    /// `None` until the first build.
    entries: RwLock<Option<HashMap<String, PathBuf>>>,
}

impl AliasIndex {
    /// Creates an empty, unbuilt index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true once the index has been built.
    #[must_use]
    pub fn is_built(&self) -> bool {
        self.entries.read().is_ok_and(|guard| guard.is_some())
    }

    /// Returns the number of indexed aliases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .ok()
            .and_then(|guard| guard.as_ref().map(HashMap::len))
            .unwrap_or(0)
    }

    /// Returns true if nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops the index; the next lookup rebuilds it.
    pub fn invalidate(&self) {
        if let Ok(mut guard) = self.entries.write() {
            *guard = None;
        }
    }

    /// Looks up an identifier, returning a path only if the profile there
    /// still carries the alias.
    ///
    /// Both the verbatim and the prefix-stripped forms are tried; when both
    /// hit, the path that sorts first wins, matching scan order.
    #[must_use]
    pub fn lookup(&self, id: &CustomerId) -> Option<PathBuf> {
        let guard = self.entries.read().ok()?;
        let map = guard.as_ref()?;

        let path = [id.as_str(), id.without_legacy_prefix()]
            .iter()
            .filter_map(|key| map.get(*key))
            .min()?
            .clone();
        drop(guard);

        let still_valid = read_document(&path)
            .ok()
            .and_then(|profile| social_id(&profile))
            .is_some_and(|alias| id.matches_alias(&alias));

        if still_valid {
            Some(path)
        } else {
            tracing::debug!(customer_id = %id, path = %path.display(), "Alias index entry is stale");
            None
        }
    }

    /// Rebuilds the index by scanning the whole record space.
    ///
    /// Unreadable entries are skipped. When two profiles carry the same
    /// alias, the entry that sorts first wins.
    ///
    /// # Errors
    ///
    /// Returns an error if the record space root cannot be listed.
    pub fn rebuild(&self, space: &RecordSpace) -> Result<usize> {
        let mut map = HashMap::new();

        if space.exists() {
            for entry in space.entries()? {
                metrics::counter!(RESOLVER_SCAN_ENTRIES_TOTAL).increment(1);
                let Some(profile_path) = RecordSpace::find_profile(&entry) else {
                    continue;
                };
                match read_document(&profile_path) {
                    Ok(profile) => {
                        if let Some(alias) = social_id(&profile) {
                            map.entry(alias).or_insert(profile_path);
                        }
                    },
                    Err(e) => {
                        tracing::warn!(path = %profile_path.display(), error = %e, "Skipping unreadable profile");
                    },
                }
            }
        }

        let count = map.len();
        let mut guard = self
            .entries
            .write()
            .map_err(|e| Error::failed("lock_alias_index", e))?;
        *guard = Some(map);
        drop(guard);

        tracing::debug!(aliases = count, root = %space.root().display(), "Rebuilt alias index");
        Ok(count)
    }
}
