//! Structured logging configuration.

use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per line.
    Json,
    /// Human-readable multi-line output.
    #[default]
    Pretty,
}

impl LogFormat {
    /// Parses a format name. Unknown names yield `None`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" | "text" => Some(Self::Pretty),
            _ => None,
        }
    }
}

/// Logging configuration.
#[derive(Debug)]
pub struct LoggingConfig {
    /// Level filter.
    pub filter: EnvFilter,
    /// Output format.
    pub format: LogFormat,
    /// Append logs to this file instead of stderr.
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Builds the configuration from the environment.
    ///
    /// `CRMSTORE_LOG` takes precedence over `RUST_LOG`; without either the
    /// level is `warn`, or `debug` when `verbose`. `CRMSTORE_LOG_FORMAT`
    /// selects `json` or `pretty`, `CRMSTORE_LOG_FILE` redirects output.
    #[must_use]
    pub fn from_env(verbose: bool) -> Self {
        Self::from_lookup(verbose, |key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup(verbose: bool, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let directives = lookup("CRMSTORE_LOG")
            .or_else(|| lookup("RUST_LOG"))
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| if verbose { "crmstore=debug" } else { "warn" }.to_string());

        let filter = EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new("warn"));

        let format = lookup("CRMSTORE_LOG_FORMAT")
            .as_deref()
            .and_then(LogFormat::parse)
            .unwrap_or_default();

        let file = lookup("CRMSTORE_LOG_FILE")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Self {
            filter,
            format,
            file,
        }
    }
}
