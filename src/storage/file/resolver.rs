//! Identifier Resolver.
//!
//! Locates the profile file for a customer-facing identifier in the record
//! space. Identifiers arrive from several origin systems (internal IDs,
//! legacy `MSG-` IDs, social-platform IDs) and are normalised at read time:
//!
//! 1. **Direct match**: `<root>/<id>/profile_<id>.json`. No scan.
//! 2. **Alias index** (optional): a re-validated cache of the scan below.
//! 3. **Scan-and-match**: every entry's profile is loaded and its
//!    social-platform ID compared to the identifier verbatim and with the
//!    `MSG-` prefix stripped. First match in name order wins.
//!
//! The scan is linear in the number of entries per miss. That is the scaling
//! limit of the file backend; enable the alias index for large record spaces.
//!
//! A missing record space root is an immediate miss. An entry that cannot be
//! read or parsed is skipped and the scan continues.

use super::alias_index::AliasIndex;
use super::layout::{RecordSpace, read_document};
use crate::Result;
use crate::models::{CustomerId, Document};
use crate::observability::{RESOLVER_LOOKUPS_TOTAL, RESOLVER_SCAN_ENTRIES_TOTAL};
use serde_json::Value;
use std::path::PathBuf;

/// Which tier located a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveTier {
    /// The identifier named the entry directly.
    Direct,
    /// The alias index hit and re-validated.
    Index,
    /// A scan over the record space found it.
    Scan,
}

impl ResolveTier {
    /// Returns the tier name as used in metrics labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Index => "index",
            Self::Scan => "scan",
        }
    }
}

/// Fields a scan compares the identifier against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchFields {
    /// Social-platform ID only. Used by intelligence updates.
    #[default]
    SocialId,
    /// The profile's own `customer_id` and `conversation_id` as well.
    Any,
}

/// A located profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Path of the profile document.
    pub path: PathBuf,
    /// Tier that found it.
    pub tier: ResolveTier,
}

/// Extracts the social-platform identifier from a profile.
///
/// `contact_info.facebook_id` is preferred; the top-level `facebook_id` is
/// used when the former is absent or empty. Numeric IDs are rendered as text.
#[must_use]
pub fn social_id(profile: &Document) -> Option<String> {
    profile
        .get("contact_info")
        .and_then(|c| c.get("facebook_id"))
        .and_then(id_text)
        .or_else(|| profile.get("facebook_id").and_then(id_text))
}

fn id_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn matches_profile(id: &CustomerId, profile: &Document, fields: MatchFields) -> bool {
    if social_id(profile).is_some_and(|alias| id.matches_alias(&alias)) {
        return true;
    }
    match fields {
        MatchFields::SocialId => false,
        MatchFields::Any => ["customer_id", "conversation_id"]
            .iter()
            .filter_map(|key| profile.get(*key).and_then(id_text))
            .any(|value| value == id.as_str()),
    }
}

/// Resolves customer identifiers to profile paths.
#[derive(Debug)]
pub struct IdentifierResolver {
    space: RecordSpace,
    index: Option<AliasIndex>,
}

impl IdentifierResolver {
    /// Creates a resolver without an alias index.
    #[must_use]
    pub const fn new(space: RecordSpace) -> Self {
        Self { space, index: None }
    }

    /// Enables the alias index.
    #[must_use]
    pub fn with_alias_index(mut self) -> Self {
        self.index = Some(AliasIndex::new());
        self
    }

    /// Returns the record space.
    #[must_use]
    pub const fn space(&self) -> &RecordSpace {
        &self.space
    }

    /// Returns the alias index, if enabled.
    #[must_use]
    pub const fn alias_index(&self) -> Option<&AliasIndex> {
        self.index.as_ref()
    }

    /// Resolves an identifier by social-platform ID.
    ///
    /// # Errors
    ///
    /// Returns an error only if the record space root exists but cannot be listed.
    pub fn resolve(&self, id: &CustomerId) -> Result<Option<Resolution>> {
        self.resolve_with(id, MatchFields::SocialId)
    }

    /// Resolves an identifier, choosing which profile fields a scan compares.
    ///
    /// # Errors
    ///
    /// Returns an error only if the record space root exists but cannot be listed.
    pub fn resolve_with(&self, id: &CustomerId, fields: MatchFields) -> Result<Option<Resolution>> {
        if !self.space.exists() {
            tracing::debug!(root = %self.space.root().display(), "Record space root absent");
            return Ok(None);
        }

        if let Some(path) = self.space.direct_profile_path(id).filter(|p| p.is_file()) {
            return Ok(Some(Self::found(id, path, ResolveTier::Direct)));
        }

        if let Some(index) = &self.index {
            if let Some(path) = index.lookup(id) {
                return Ok(Some(Self::found(id, path, ResolveTier::Index)));
            }
            index.rebuild(&self.space)?;
            if let Some(path) = index.lookup(id) {
                return Ok(Some(Self::found(id, path, ResolveTier::Scan)));
            }
            if fields == MatchFields::SocialId {
                return Ok(Self::missed(id));
            }
        }

        self.scan(id, fields)
    }

    /// Linear scan over every entry.
    fn scan(&self, id: &CustomerId, fields: MatchFields) -> Result<Option<Resolution>> {
        for entry in self.space.entries()? {
            metrics::counter!(RESOLVER_SCAN_ENTRIES_TOTAL).increment(1);

            let Some(profile_path) = RecordSpace::find_profile(&entry) else {
                continue;
            };

            let profile = match read_document(&profile_path) {
                Ok(profile) => profile,
                Err(e) => {
                    tracing::warn!(path = %profile_path.display(), error = %e, "Skipping unreadable profile");
                    continue;
                },
            };

            if matches_profile(id, &profile, fields) {
                return Ok(Some(Self::found(id, profile_path, ResolveTier::Scan)));
            }
        }

        Ok(Self::missed(id))
    }

    fn found(id: &CustomerId, path: PathBuf, tier: ResolveTier) -> Resolution {
        metrics::counter!(RESOLVER_LOOKUPS_TOTAL, "tier" => tier.as_str()).increment(1);
        tracing::debug!(customer_id = %id, tier = tier.as_str(), path = %path.display(), "Resolved customer");
        Resolution { path, tier }
    }

    fn missed(id: &CustomerId) -> Option<Resolution> {
        metrics::counter!(RESOLVER_LOOKUPS_TOTAL, "tier" => "miss").increment(1);
        tracing::debug!(customer_id = %id, "Customer not found in record space");
        None
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;
    use test_case::test_case;

    fn write_profile(root: &Path, folder: &str, file_id: &str, body: &Value) -> PathBuf {
        let dir = root.join(folder);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("profile_{file_id}.json"));
        fs::write(&path, serde_json::to_string(body).unwrap()).unwrap();
        path
    }

    fn resolvers(root: &Path) -> [IdentifierResolver; 2] {
        [
            IdentifierResolver::new(RecordSpace::new(root)),
            IdentifierResolver::new(RecordSpace::new(root)).with_alias_index(),
        ]
    }

    #[test]
    fn test_social_id_prefers_contact_info() {
        let profile = json!({"contact_info": {"facebook_id": "A"}, "facebook_id": "B"});
        assert_eq!(social_id(profile.as_object().unwrap()), Some("A".into()));

        let profile = json!({"contact_info": {"facebook_id": ""}, "facebook_id": "B"});
        assert_eq!(social_id(profile.as_object().unwrap()), Some("B".into()));

        let profile = json!({"contact_info": {"phone": "1"}});
        assert_eq!(social_id(profile.as_object().unwrap()), None);
    }

    #[test]
    fn test_direct_match_wins_over_decoy() {
        let dir = TempDir::new().unwrap();
        // Decoy sorts first and carries the same identifier as its social ID.
        write_profile(dir.path(), "AAA", "AAA", &json!({"facebook_id": "CUST-1"}));
        let direct = write_profile(dir.path(), "CUST-1", "CUST-1", &json!({}));

        for resolver in resolvers(dir.path()) {
            let found = resolver.resolve(&CustomerId::new("CUST-1")).unwrap().unwrap();
            assert_eq!(found.path, direct);
            assert_eq!(found.tier, ResolveTier::Direct);
        }
    }

    #[test_case("FB999" ; "plain")]
    #[test_case("MSG-FB999" ; "legacy prefix")]
    fn test_scan_matches_social_id(id: &str) {
        let dir = TempDir::new().unwrap();
        write_profile(dir.path(), "CUST-0", "CUST-0", &json!({"facebook_id": "other"}));
        let target = write_profile(
            dir.path(),
            "CUST-1",
            "CUST-1",
            &json!({"contact_info": {"facebook_id": "FB999"}}),
        );

        for resolver in resolvers(dir.path()) {
            let found = resolver.resolve(&CustomerId::new(id)).unwrap().unwrap();
            assert_eq!(found.path, target);
            assert_eq!(found.tier, ResolveTier::Scan);
        }
    }

    #[test]
    fn test_scan_skips_unreadable_entries() {
        let dir = TempDir::new().unwrap();
        let broken = dir.path().join("AAA");
        fs::create_dir_all(&broken).unwrap();
        fs::write(broken.join("profile_AAA.json"), "{not json").unwrap();
        fs::create_dir_all(dir.path().join("BBB")).unwrap();
        let target = write_profile(dir.path(), "CCC", "CCC", &json!({"facebook_id": "FB1"}));

        for resolver in resolvers(dir.path()) {
            let found = resolver.resolve(&CustomerId::new("FB1")).unwrap().unwrap();
            assert_eq!(found.path, target);
        }
    }

    #[test]
    fn test_missing_root_is_not_found() {
        let dir = TempDir::new().unwrap();
        for resolver in resolvers(&dir.path().join("absent")) {
            assert!(resolver.resolve(&CustomerId::new("FB1")).unwrap().is_none());
        }
    }

    #[test]
    fn test_unknown_identifier_is_not_found() {
        let dir = TempDir::new().unwrap();
        write_profile(dir.path(), "CUST-1", "CUST-1", &json!({"facebook_id": "FB1"}));
        for resolver in resolvers(dir.path()) {
            assert!(resolver.resolve(&CustomerId::new("FB2")).unwrap().is_none());
        }
    }

    #[test]
    fn test_prefix_only_stripped_from_request() {
        let dir = TempDir::new().unwrap();
        write_profile(dir.path(), "CUST-1", "CUST-1", &json!({"facebook_id": "MSG-FB1"}));
        for resolver in resolvers(dir.path()) {
            assert!(resolver.resolve(&CustomerId::new("FB1")).unwrap().is_none());
            assert!(resolver.resolve(&CustomerId::new("MSG-FB1")).unwrap().is_some());
        }
    }

    #[test]
    fn test_any_fields_matches_customer_and_conversation_id() {
        let dir = TempDir::new().unwrap();
        let target = write_profile(
            dir.path(),
            "legacy-folder",
            "legacy",
            &json!({"customer_id": "TVS-CUS-7", "conversation_id": "t_555"}),
        );

        for resolver in resolvers(dir.path()) {
            assert!(resolver.resolve(&CustomerId::new("TVS-CUS-7")).unwrap().is_none());
            let by_customer = resolver
                .resolve_with(&CustomerId::new("TVS-CUS-7"), MatchFields::Any)
                .unwrap()
                .unwrap();
            assert_eq!(by_customer.path, target);
            let by_conversation = resolver
                .resolve_with(&CustomerId::new("t_555"), MatchFields::Any)
                .unwrap()
                .unwrap();
            assert_eq!(by_conversation.path, target);
        }
    }

    #[test]
    fn test_alias_index_hit_after_first_scan() {
        let dir = TempDir::new().unwrap();
        write_profile(dir.path(), "CUST-1", "CUST-1", &json!({"facebook_id": "FB1"}));

        let resolver = IdentifierResolver::new(RecordSpace::new(dir.path())).with_alias_index();
        let id = CustomerId::new("FB1");
        assert_eq!(resolver.resolve(&id).unwrap().unwrap().tier, ResolveTier::Scan);
        assert_eq!(resolver.resolve(&id).unwrap().unwrap().tier, ResolveTier::Index);
    }

    #[test]
    fn test_alias_index_follows_external_edits() {
        let dir = TempDir::new().unwrap();
        let first = write_profile(dir.path(), "CUST-1", "CUST-1", &json!({"facebook_id": "FB1"}));

        let resolver = IdentifierResolver::new(RecordSpace::new(dir.path())).with_alias_index();
        let id = CustomerId::new("FB1");
        assert_eq!(resolver.resolve(&id).unwrap().unwrap().path, first);

        // Alias moves to another profile behind the resolver's back.
        fs::write(&first, r#"{"facebook_id": "FB-old"}"#).unwrap();
        let second = write_profile(dir.path(), "CUST-2", "CUST-2", &json!({"facebook_id": "FB1"}));

        let found = resolver.resolve(&id).unwrap().unwrap();
        assert_eq!(found.path, second);
        assert_eq!(found.tier, ResolveTier::Scan);
    }
}
