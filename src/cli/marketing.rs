//! Marketing sync command.

use super::CommandOutput;
use crate::services::PersistenceAdapter;
use crate::sync::MarketingSyncJob;
use serde_json::Value;

pub fn sync(adapter: &PersistenceAdapter) -> CommandOutput {
    let job = MarketingSyncJob::from_config(&adapter.config().marketing, adapter.marketing().clone());
    let report = job.run();
    CommandOutput::new(
        report.success,
        serde_json::to_value(&report).unwrap_or(Value::Null),
    )
}
