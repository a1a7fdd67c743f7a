//! Metric names and recording helpers.
//!
//! Metrics go through the `metrics` facade. No exporter is installed here;
//! without a recorder the calls are no-ops.

use crate::models::{BackendKind, EntityKind, FallbackReason, OutcomeStatus};

/// Adapter operations by entity, serving backend and status.
pub const STORAGE_OPERATIONS_TOTAL: &str = "storage_operations_total";
/// Relational calls served by the file backend, by entity and reason.
pub const STORAGE_FALLBACK_TOTAL: &str = "storage_fallback_total";
/// Record space entries inspected by scan-and-match.
pub const RESOLVER_SCAN_ENTRIES_TOTAL: &str = "resolver_scan_entries_total";
/// Resolver lookups by tier.
pub const RESOLVER_LOOKUPS_TOTAL: &str = "resolver_lookups_total";
/// Marketing sync runs by result.
pub const SYNC_RUNS_TOTAL: &str = "marketing_sync_runs_total";
/// Marketing records fetched, by kind.
pub const SYNC_RECORDS_TOTAL: &str = "marketing_sync_records_total";
/// Storage events published, by event type.
pub const EVENTS_PUBLISHED_TOTAL: &str = "storage_events_published_total";
/// Storage events published while nobody was subscribed.
pub const EVENTS_DROPPED_TOTAL: &str = "storage_events_dropped_total";
/// Storage events skipped by subscribers that fell behind.
pub const EVENTS_LAGGED_TOTAL: &str = "storage_events_lagged_total";

/// Registers descriptions for every metric.
pub fn describe_metrics() {
    metrics::describe_counter!(
        STORAGE_OPERATIONS_TOTAL,
        "Adapter operations by entity, serving backend and status"
    );
    metrics::describe_counter!(
        STORAGE_FALLBACK_TOTAL,
        "Relational-mode calls served by the file backend"
    );
    metrics::describe_counter!(
        RESOLVER_SCAN_ENTRIES_TOTAL,
        "Record space entries inspected by scan-and-match"
    );
    metrics::describe_counter!(RESOLVER_LOOKUPS_TOTAL, "Resolver lookups by tier");
    metrics::describe_counter!(SYNC_RUNS_TOTAL, "Marketing sync runs by result");
    metrics::describe_counter!(SYNC_RECORDS_TOTAL, "Marketing records fetched by kind");
    metrics::describe_counter!(EVENTS_PUBLISHED_TOTAL, "Storage events published by type");
    metrics::describe_counter!(EVENTS_DROPPED_TOTAL, "Storage events with no subscriber");
    metrics::describe_counter!(EVENTS_LAGGED_TOTAL, "Storage events skipped by slow subscribers");
}

/// Records one completed adapter operation.
pub fn record_operation(entity: EntityKind, backend: BackendKind, status: OutcomeStatus) {
    metrics::counter!(
        STORAGE_OPERATIONS_TOTAL,
        "entity" => entity.as_str(),
        "backend" => backend.as_str(),
        "status" => status.as_str()
    )
    .increment(1);
}

/// Records a fallback from the relational to the file backend.
pub fn record_fallback(entity: EntityKind, reason: &FallbackReason) {
    metrics::counter!(
        STORAGE_FALLBACK_TOTAL,
        "entity" => entity.as_str(),
        "reason" => reason.as_str()
    )
    .increment(1);
}
