//! Configuration management.
//!
//! Configuration is read once at startup and handed to
//! [`crate::PersistenceAdapter`]; nothing below the container reads the
//! environment.
//!
//! # Sources
//!
//! In increasing priority:
//!
//! 1. Built-in defaults (file mode, `./customer` record space)
//! 2. TOML config file (`--config`, or `<config dir>/crmstore/config.toml`)
//! 3. Environment variables (a `.env` file is loaded first when present)
//!
//! | Variable | Meaning |
//! |----------|---------|
//! | `DB_ADAPTER` | `json`/`file` or `prisma`/`postgres`/`sql`/`relational` |
//! | `DATABASE_URL` | `postgres://...`, `sqlite://path` or `sqlite::memory:` |
//! | `CRMSTORE_DATA_DIR` | Record space root |
//! | `CRMSTORE_ALIAS_INDEX` | Enable the in-memory alias index |
//! | `FB_ACCESS_TOKEN` | Marketing API access token |
//! | `FB_AD_ACCOUNT_ID` | Marketing API ad account |

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default record space root, relative to the working directory.
pub const DEFAULT_DATA_DIR: &str = "customer";

/// Which backend operations target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    /// JSON documents in the record space.
    #[default]
    File,
    /// SQL database, with the record space as a safety net.
    Relational,
}

impl BackendMode {
    /// Parses a mode string.
    ///
    /// Accepts the historical adapter names (`json`, `prisma`) as well as
    /// descriptive ones. Unknown values yield `None`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" | "file" | "files" => Some(Self::File),
            "prisma" | "postgres" | "postgresql" | "supabase" | "sql" | "sqlite"
            | "relational" => Some(Self::Relational),
            _ => None,
        }
    }

    /// Returns the mode name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Relational => "relational",
        }
    }
}

/// Marketing API credentials for the bulk ingest job.
#[derive(Debug, Clone, Default)]
pub struct MarketingConfig {
    /// Access token.
    pub access_token: Option<SecretString>,
    /// Ad account identifier, with or without the `act_` prefix.
    pub ad_account_id: Option<String>,
    /// Graph API base URL.
    pub api_base: Option<String>,
    /// Number of days of daily insights to pull.
    pub insight_days: Option<u32>,
}

/// Main configuration for crmstore.
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    /// Backend mode.
    pub backend: BackendMode,
    /// Record space root for the file backend.
    pub data_dir: PathBuf,
    /// Relational connection string.
    pub database_url: Option<SecretString>,
    /// Whether the file resolver keeps an alias index.
    pub alias_index: bool,
    /// Marketing API settings.
    pub marketing: MarketingConfig,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            backend: BackendMode::File,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            database_url: None,
            alias_index: false,
            marketing: MarketingConfig::default(),
        }
    }
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Backend mode.
    pub backend: Option<String>,
    /// Record space root.
    pub data_dir: Option<String>,
    /// Relational connection string.
    pub database_url: Option<String>,
    /// Alias index toggle.
    pub alias_index: Option<bool>,
    /// Marketing section.
    pub marketing: Option<ConfigFileMarketing>,
}

/// Marketing section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileMarketing {
    /// Access token.
    pub access_token: Option<String>,
    /// Ad account identifier.
    pub ad_account_id: Option<String>,
    /// Graph API base URL.
    pub api_base: Option<String>,
    /// Days of insights.
    pub insight_days: Option<u32>,
}

impl AdapterConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from defaults, the default config file and the environment.
    #[must_use]
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::load_default().with_env_overrides()
    }

    /// Loads configuration from a file path, then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file_and_env(path: &Path) -> crate::Result<Self> {
        let _ = dotenvy::dotenv();
        Ok(Self::load_from_file(path)?.with_env_overrides())
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> crate::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::failed("read_config_file", e))?;

        let file: ConfigFile =
            toml::from_str(&contents).map_err(|e| crate::Error::failed("parse_config_file", e))?;

        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the platform config directory.
    ///
    /// Returns defaults if no config file is found or it cannot be parsed.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let path = base_dirs.config_dir().join("crmstore").join("config.toml");
        if path.exists() {
            match Self::load_from_file(&path) {
                Ok(config) => return config,
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "Ignoring config file"),
            }
        }

        Self::default()
    }

    /// Converts a `ConfigFile` to `AdapterConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(mode) = file.backend.as_deref().and_then(BackendMode::parse) {
            config.backend = mode;
        }
        if let Some(data_dir) = file.data_dir {
            config.data_dir = PathBuf::from(data_dir);
        }
        if let Some(url) = file.database_url {
            config.database_url = Some(SecretString::from(url));
        }
        if let Some(v) = file.alias_index {
            config.alias_index = v;
        }
        if let Some(marketing) = file.marketing {
            config.marketing.access_token = marketing.access_token.map(SecretString::from);
            config.marketing.ad_account_id = marketing.ad_account_id;
            config.marketing.api_base = marketing.api_base;
            config.marketing.insight_days = marketing.insight_days;
        }

        config
    }

    /// Applies environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary key lookup.
    ///
    /// Empty values are ignored.
    #[must_use]
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("DB_ADAPTER") {
            match BackendMode::parse(&v) {
                Some(mode) => self.backend = mode,
                None => tracing::warn!(value = %v, "Unknown DB_ADAPTER value, keeping {}", self.backend.as_str()),
            }
        }
        if let Some(v) = get("DATABASE_URL") {
            self.database_url = Some(SecretString::from(v));
        }
        if let Some(v) = get("CRMSTORE_DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
        if let Some(v) = get("CRMSTORE_ALIAS_INDEX") {
            self.alias_index = matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
        if let Some(v) = get("FB_ACCESS_TOKEN") {
            self.marketing.access_token = Some(SecretString::from(v));
        }
        if let Some(v) = get("FB_AD_ACCOUNT_ID") {
            self.marketing.ad_account_id = Some(v);
        }
        if let Some(v) = get("FB_GRAPH_API_BASE") {
            self.marketing.api_base = Some(v);
        }
        self
    }

    /// Sets the backend mode.
    #[must_use]
    pub const fn with_backend(mut self, backend: BackendMode) -> Self {
        self.backend = backend;
        self
    }

    /// Sets the record space root.
    #[must_use]
    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = path.into();
        self
    }

    /// Sets the relational connection string.
    #[must_use]
    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(SecretString::from(url.into()));
        self
    }

    /// Enables or disables the alias index.
    #[must_use]
    pub const fn with_alias_index(mut self, enabled: bool) -> Self {
        self.alias_index = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;
    use test_case::test_case;

    #[test_case("json", Some(BackendMode::File))]
    #[test_case("FILE", Some(BackendMode::File))]
    #[test_case("prisma", Some(BackendMode::Relational))]
    #[test_case("postgres", Some(BackendMode::Relational))]
    #[test_case(" relational ", Some(BackendMode::Relational))]
    #[test_case("mongo", None)]
    fn test_backend_mode_parse(raw: &str, expected: Option<BackendMode>) {
        assert_eq!(BackendMode::parse(raw), expected);
    }

    #[test]
    fn test_defaults() {
        let config = AdapterConfig::default();
        assert_eq!(config.backend, BackendMode::File);
        assert_eq!(config.data_dir, PathBuf::from("customer"));
        assert!(config.database_url.is_none());
        assert!(!config.alias_index);
    }

    #[test]
    fn test_overrides_from_lookup() {
        let env: HashMap<&str, &str> = [
            ("DB_ADAPTER", "prisma"),
            ("DATABASE_URL", "sqlite::memory:"),
            ("CRMSTORE_DATA_DIR", "/srv/crm/customer"),
            ("CRMSTORE_ALIAS_INDEX", "true"),
            ("FB_ACCESS_TOKEN", "token"),
            ("FB_AD_ACCOUNT_ID", "12345"),
        ]
        .into_iter()
        .collect();

        let config =
            AdapterConfig::default().with_overrides_from(|k| env.get(k).map(ToString::to_string));

        assert_eq!(config.backend, BackendMode::Relational);
        assert_eq!(
            config.database_url.as_ref().unwrap().expose_secret(),
            "sqlite::memory:"
        );
        assert_eq!(config.data_dir, PathBuf::from("/srv/crm/customer"));
        assert!(config.alias_index);
        assert_eq!(config.marketing.ad_account_id.as_deref(), Some("12345"));
        assert!(config.marketing.access_token.is_some());
    }

    #[test]
    fn test_unknown_adapter_keeps_mode() {
        let config = AdapterConfig::default()
            .with_backend(BackendMode::Relational)
            .with_overrides_from(|k| (k == "DB_ADAPTER").then(|| "mongo".to_string()));
        assert_eq!(config.backend, BackendMode::Relational);
    }

    #[test]
    fn test_empty_values_ignored() {
        let config = AdapterConfig::default().with_overrides_from(|_| Some("  ".to_string()));
        assert_eq!(config.backend, BackendMode::File);
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
backend = "relational"
data_dir = "/data/customer"
database_url = "postgres://crm@localhost/crm"
alias_index = true

[marketing]
ad_account_id = "act_998877"
insight_days = 14
"#,
        )
        .unwrap();

        let config = AdapterConfig::load_from_file(&path).unwrap();
        assert_eq!(config.backend, BackendMode::Relational);
        assert_eq!(config.data_dir, PathBuf::from("/data/customer"));
        assert!(config.alias_index);
        assert_eq!(config.marketing.insight_days, Some(14));
        assert!(config.marketing.access_token.is_none());
    }

    #[test]
    fn test_load_from_file_invalid() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "backend = [").unwrap();
        assert!(AdapterConfig::load_from_file(&path).is_err());
    }
}
