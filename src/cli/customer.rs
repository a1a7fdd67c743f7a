//! Customer commands.

use super::{CommandOutput, read_json_arg};
use crate::models::CustomerId;
use crate::services::PersistenceAdapter;
use anyhow::{Result, bail};
use serde_json::{Value, json};

pub fn resolve(adapter: &PersistenceAdapter, id: &str) -> Result<CommandOutput> {
    let resolution = adapter.customers().resolve(id)?;
    Ok(match resolution {
        Some(found) => CommandOutput::new(
            true,
            json!({
                "success": true,
                "path": found.path,
                "tier": found.tier.as_str(),
            }),
        ),
        None => CommandOutput::new(false, json!({"success": false, "status": "not_found"})),
    })
}

pub fn get(adapter: &PersistenceAdapter, id: &str) -> CommandOutput {
    let outcome = adapter
        .customers()
        .get_customer_outcome(&CustomerId::new(id));
    CommandOutput::from_outcome(outcome, "customer")
}

pub fn list(adapter: &PersistenceAdapter) -> CommandOutput {
    let outcome = adapter.customers().list_customers_outcome();
    CommandOutput::from_outcome(outcome, "customers")
}

pub fn update_intelligence(
    adapter: &PersistenceAdapter,
    id: &str,
    patch: &str,
) -> Result<CommandOutput> {
    let Value::Object(patch) = read_json_arg(patch)? else {
        bail!("--patch must be a JSON object");
    };
    let outcome = adapter
        .customers()
        .update_customer_intelligence_outcome(&CustomerId::new(id), &patch);
    Ok(CommandOutput::from_outcome(outcome, "intelligence"))
}
