//! CLI command implementations.
//!
//! Each command runs one adapter operation and yields a [`CommandOutput`]:
//! a JSON object printed as a single line on stdout, plus a success flag
//! that becomes the exit code. Logs go to stderr.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `info` | Configured mode, record space and capability matrix |
//! | `resolve` | Resolve an identifier to a profile file |
//! | `get-customer` | Print a customer profile |
//! | `list-customers` | Print every customer profile |
//! | `update-intelligence` | Merge a JSON patch into a customer's intelligence |
//! | `save-chat` | Replace a conversation's messages |
//! | `load-chat` | Print a conversation's messages, oldest first |
//! | `create-task` | Create a follow-up task |
//! | `sync-marketing` | Pull marketing data and daily metrics |
//!
//! # Example Usage
//!
//! ```bash
//! crmstore update-intelligence FB999 --patch '{"tag":"vip"}'
//! DB_ADAPTER=postgres crmstore create-task CUST-1 "Call back" --priority high
//! crmstore save-chat t_1001 --messages @messages.json
//! ```

mod chat;
mod customer;
mod marketing;
mod task;

use crate::config::{AdapterConfig, BackendMode};
use crate::services::{Outcome, PersistenceAdapter};
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::{Value, json};
use std::path::PathBuf;

/// crmstore - persistence adapter for customer records, chats and tasks.
#[derive(Debug, Parser)]
#[command(name = "crmstore")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "CRMSTORE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Backend mode override (`file` or `relational`).
    #[arg(long, global = true)]
    pub backend: Option<String>,

    /// Record space root override.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Command to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show adapter configuration and capabilities.
    Info,

    /// Resolve an identifier to a profile file.
    Resolve {
        /// Customer id, social id or `MSG-` alias.
        id: String,
    },

    /// Print a customer profile.
    GetCustomer {
        /// Customer id, social id or `MSG-` alias.
        id: String,
    },

    /// Print every customer profile.
    ListCustomers,

    /// Merge a JSON object into a customer's intelligence.
    UpdateIntelligence {
        /// Customer id, social id or `MSG-` alias.
        id: String,

        /// JSON object, or `@path` to read it from a file.
        #[arg(long)]
        patch: String,
    },

    /// Replace a conversation's messages.
    SaveChat {
        /// Conversation id.
        conversation_id: String,

        /// JSON array of messages, or `@path` to read it from a file.
        #[arg(long)]
        messages: String,
    },

    /// Print a conversation's messages, oldest first.
    LoadChat {
        /// Conversation id.
        conversation_id: String,
    },

    /// Create a follow-up task.
    CreateTask {
        /// Customer the task is about.
        customer_id: String,

        /// Short title.
        title: String,

        /// Longer description.
        #[arg(short, long, default_value = "")]
        description: String,

        /// Due date (`YYYY-MM-DD` or RFC 3339).
        #[arg(long)]
        due: Option<String>,

        /// Priority: low, normal, high or urgent.
        #[arg(short, long, default_value = "normal")]
        priority: String,
    },

    /// Pull campaigns, ads and daily metrics from the marketing API.
    SyncMarketing,
}

/// Result of one command.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutput {
    /// Whether the command succeeded.
    pub success: bool,
    /// JSON result object.
    pub body: Value,
}

impl CommandOutput {
    /// Wraps a JSON body.
    #[must_use]
    pub const fn new(success: bool, body: Value) -> Self {
        Self { success, body }
    }

    /// Builds the output of an adapter operation.
    ///
    /// The body carries `success`, `served_by`, `status`, `fallback` and, when
    /// present, the returned value under `key`.
    #[must_use]
    pub fn from_outcome<T: Serialize>(outcome: Outcome<T>, key: &str) -> Self {
        let success = outcome.is_success();
        let mut body = json!({
            "success": success,
            "served_by": outcome.served_by,
            "status": outcome.status,
            "fallback": outcome.fallback,
        });
        if let (Some(value), Value::Object(map)) = (outcome.value, &mut body) {
            map.insert(
                key.to_string(),
                serde_json::to_value(value).unwrap_or(Value::Null),
            );
        }
        Self { success, body }
    }

    /// Serialises the body as a single JSON line.
    #[must_use]
    pub fn to_json_line(&self) -> String {
        self.body.to_string()
    }
}

/// Loads configuration and applies command-line overrides.
///
/// # Errors
///
/// Returns an error if the config file cannot be read or `--backend` is unknown.
pub fn load_config(cli: &Cli) -> Result<AdapterConfig> {
    let mut config = match &cli.config {
        Some(path) => AdapterConfig::from_file_and_env(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => AdapterConfig::from_env(),
    };

    if let Some(raw) = &cli.backend {
        let Some(mode) = BackendMode::parse(raw) else {
            bail!("unknown backend '{raw}' (expected file or relational)");
        };
        config = config.with_backend(mode);
    }
    if let Some(dir) = &cli.data_dir {
        config = config.with_data_dir(dir.clone());
    }
    Ok(config)
}

/// Runs a command against an adapter.
///
/// # Errors
///
/// Returns an error for malformed arguments (bad JSON, unknown priority,
/// unreadable `@file`). Adapter failures are reported in the output instead.
pub fn run(command: &Commands, adapter: &PersistenceAdapter) -> Result<CommandOutput> {
    match command {
        Commands::Info => Ok(CommandOutput::new(
            true,
            serde_json::to_value(adapter.adapter_info())?,
        )),
        Commands::Resolve { id } => customer::resolve(adapter, id),
        Commands::GetCustomer { id } => Ok(customer::get(adapter, id)),
        Commands::ListCustomers => Ok(customer::list(adapter)),
        Commands::UpdateIntelligence { id, patch } => {
            customer::update_intelligence(adapter, id, patch)
        },
        Commands::SaveChat {
            conversation_id,
            messages,
        } => chat::save(adapter, conversation_id, messages),
        Commands::LoadChat { conversation_id } => Ok(chat::load(adapter, conversation_id)),
        Commands::CreateTask {
            customer_id,
            title,
            description,
            due,
            priority,
        } => task::create(adapter, customer_id, title, description, due.as_deref(), priority),
        Commands::SyncMarketing => Ok(marketing::sync(adapter)),
    }
}

/// Reads an inline JSON argument, or the file named by `@path`.
fn read_json_arg(raw: &str) -> Result<Value> {
    let text = match raw.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {path}"))?,
        None => raw.to_string(),
    };
    serde_json::from_str(&text).context("argument is not valid JSON")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::{BackendKind, OutcomeStatus};
    use std::io::Write;

    #[test]
    fn test_parse_create_task() {
        let cli = Cli::try_parse_from([
            "crmstore",
            "--backend",
            "json",
            "create-task",
            "CUST-1",
            "Call back",
            "--priority",
            "high",
        ])
        .unwrap();
        assert_eq!(cli.backend.as_deref(), Some("json"));
        match cli.command {
            Commands::CreateTask {
                customer_id,
                priority,
                due,
                ..
            } => {
                assert_eq!(customer_id, "CUST-1");
                assert_eq!(priority, "high");
                assert!(due.is_none());
            },
            other => unreachable!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let cli = Cli::try_parse_from(["crmstore", "--backend", "mongo", "info"]).unwrap();
        assert!(load_config(&cli).is_err());
    }

    #[test]
    fn test_read_json_arg_inline_and_file() {
        assert_eq!(read_json_arg(r#"{"a":1}"#).unwrap()["a"], 1);
        assert!(read_json_arg("{not json").is_err());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"message":"hi"}}]"#).unwrap();
        let value = read_json_arg(&format!("@{}", file.path().display())).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_from_outcome() {
        let outcome = Outcome {
            served_by: BackendKind::File,
            status: OutcomeStatus::Applied,
            fallback: None,
            value: Some(json!({"tag": "vip"})),
        };
        let output = CommandOutput::from_outcome(outcome, "intelligence");
        assert!(output.success);
        assert_eq!(output.body["served_by"], "file");
        assert_eq!(output.body["status"], "applied");
        assert_eq!(output.body["intelligence"]["tag"], "vip");
        assert!(!output.to_json_line().contains('\n'));
    }
}
