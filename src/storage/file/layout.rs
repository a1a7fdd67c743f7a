//! Record space layout.
//!
//! ```text
//! <root>/
//!   <customer_id>/
//!     profile_<customer_id>.json
//!     chathistory/
//!       conv_<conversation_id>.json
//! ```
//!
//! # Security
//!
//! Identifiers used to build paths are checked with [`is_safe_segment`];
//! anything else never becomes a path component.

use crate::models::{ConversationId, CustomerId, Document};
use crate::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Maximum size of a profile or conversation file (16 MiB).
const MAX_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// Name of the per-customer chat history sub-directory.
pub const CHAT_HISTORY_DIR: &str = "chathistory";

/// Prefix and suffix of profile file names.
const PROFILE_PREFIX: &str = "profile_";
const JSON_SUFFIX: &str = ".json";

/// Returns true if `name` can be used as a single path segment.
///
/// Rejects empty names, separators, NUL and names starting with `.` (which
/// covers `.` and `..` as well as hidden entries). Dots, spaces and `@`
/// elsewhere in the name are fine.
#[must_use]
pub fn is_safe_segment(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 255
        && !name.starts_with('.')
        && !name.contains(['/', '\\', '\0'])
}

/// Root of the file-backed record space.
#[derive(Debug, Clone)]
pub struct RecordSpace {
    root: PathBuf,
}

impl RecordSpace {
    /// Creates a record space rooted at `root`. Nothing is created on disk.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns true if the root directory exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }

    /// Returns `<root>/<id>/profile_<id>.json`, or `None` for unsafe IDs.
    #[must_use]
    pub fn direct_profile_path(&self, id: &CustomerId) -> Option<PathBuf> {
        let id = id.as_str();
        is_safe_segment(id).then(|| self.root.join(id).join(profile_file_name(id)))
    }

    /// Lists customer entry directories, sorted by name.
    ///
    /// Hidden entries and non-directories are skipped. Entries whose metadata
    /// cannot be read are skipped as well.
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory cannot be read.
    pub fn entries(&self) -> Result<Vec<PathBuf>> {
        let read_dir = fs::read_dir(&self.root).map_err(|e| Error::failed("read_record_space", e))?;

        let mut entries: Vec<PathBuf> = read_dir
            .filter_map(std::result::Result::ok)
            .filter(|entry| !entry.file_name().to_string_lossy().starts_with('.'))
            .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
            .map(|entry| entry.path())
            .collect();

        entries.sort();
        Ok(entries)
    }

    /// Finds the profile document inside an entry directory.
    ///
    /// Prefers `profile_<dir name>.json`; otherwise the first `profile_*.json`
    /// by name.
    #[must_use]
    pub fn find_profile(entry: &Path) -> Option<PathBuf> {
        if let Some(name) = entry.file_name().and_then(|n| n.to_str()) {
            let canonical = entry.join(profile_file_name(name));
            if canonical.is_file() {
                return Some(canonical);
            }
        }

        let mut candidates: Vec<PathBuf> = fs::read_dir(entry)
            .ok()?
            .filter_map(std::result::Result::ok)
            .filter(|e| {
                let name = e.file_name();
                let name = name.to_string_lossy();
                name.starts_with(PROFILE_PREFIX) && name.ends_with(JSON_SUFFIX)
            })
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect();

        candidates.sort();
        candidates.into_iter().next()
    }

    /// Returns `conv_<id>.json`.
    #[must_use]
    pub fn conversation_file_name(id: &ConversationId) -> String {
        format!("conv_{}{JSON_SUFFIX}", id.as_str())
    }

    /// Returns the legacy `conv_t_<id>.json`, used for reads only.
    #[must_use]
    pub fn legacy_conversation_file_name(id: &ConversationId) -> String {
        format!("conv_t_{}{JSON_SUFFIX}", id.as_str())
    }
}

/// Returns `profile_<id>.json`.
#[must_use]
pub fn profile_file_name(id: &str) -> String {
    format!("{PROFILE_PREFIX}{id}{JSON_SUFFIX}")
}

/// Reads and parses a JSON object document.
///
/// # Errors
///
/// Returns an error if the file is too large, unreadable, not JSON, or not
/// a JSON object.
pub fn read_document(path: &Path) -> Result<Document> {
    let metadata = fs::metadata(path).map_err(|e| Error::failed("read_file_metadata", e))?;
    if metadata.len() > MAX_FILE_SIZE {
        return Err(Error::InvalidInput(format!(
            "record exceeds maximum size of {MAX_FILE_SIZE} bytes: {}",
            path.display()
        )));
    }

    let raw = fs::read_to_string(path).map_err(|e| Error::failed("read_record", e))?;
    match serde_json::from_str(&raw).map_err(|e| Error::failed("parse_record", e))? {
        serde_json::Value::Object(doc) => Ok(doc),
        _ => Err(Error::failed(
            "parse_record",
            format!("{} is not a JSON object", path.display()),
        )),
    }
}

/// Writes a document as pretty JSON, replacing the target in one rename.
///
/// The document is written to a sibling temporary file first; if anything
/// fails the original file is left untouched.
///
/// # Errors
///
/// Returns an error if serialisation, the temporary write or the rename fails.
pub fn write_document(path: &Path, document: &Document) -> Result<()> {
    let json =
        serde_json::to_string_pretty(document).map_err(|e| Error::failed("serialize_record", e))?;

    let parent = path
        .parent()
        .ok_or_else(|| Error::InvalidInput(format!("no parent directory: {}", path.display())))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = parent.join(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4().simple()));

    if let Err(e) = fs::write(&tmp, json) {
        let _ = fs::remove_file(&tmp);
        return Err(Error::failed("write_record", e));
    }

    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        Error::failed("replace_record", e)
    })
}
