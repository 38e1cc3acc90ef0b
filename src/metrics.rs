// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for the catalog sync pipeline.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The embedding process is responsible for choosing the exporter
//! (Prometheus, OTEL, etc.)
//!
//! # Metric Naming Convention
//! - `catalog_sync_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `exchange`: exchange name
//! - `operation`: created, updated, deleted
//! - `outcome`: ack, nack_requeue, reject / hit, miss, degraded
//! - `status`: success, error

use metrics::{counter, gauge, histogram};
use std::time::Duration;

/// Record a publish attempt and its fan-out.
pub fn record_publish(exchange: &str, routed: usize) {
    counter!(
        "catalog_sync_publishes_total",
        "exchange" => exchange.to_string()
    )
    .increment(1);
    histogram!(
        "catalog_sync_publish_fanout",
        "exchange" => exchange.to_string()
    )
    .record(routed as f64);
}

/// Record a publish that was dropped after logging (fire-and-forget path).
pub fn record_publish_dropped(exchange: &str) {
    counter!(
        "catalog_sync_publish_dropped_total",
        "exchange" => exchange.to_string()
    )
    .increment(1);
}

/// Record a message dropped by a full queue.
pub fn record_queue_dropped(queue: &str) {
    counter!(
        "catalog_sync_queue_dropped_total",
        "queue" => queue.to_string()
    )
    .increment(1);
}

/// Record how a delivery was settled (ack, nack_requeue, reject).
pub fn record_delivery_settled(outcome: &str) {
    counter!(
        "catalog_sync_deliveries_settled_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record a consumed change event by operation and processing status.
pub fn record_event_processed(operation: &str, status: &str) {
    counter!(
        "catalog_sync_events_processed_total",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record consumer state transitions (for monitoring the reconnect loop).
pub fn set_consumer_state(state: &str) {
    counter!(
        "catalog_sync_consumer_state_transitions_total",
        "state" => state.to_string()
    )
    .increment(1);
}

/// Record a cache lookup outcome: hit, miss, or degraded (backend error
/// treated as miss).
pub fn record_cache_lookup(outcome: &str) {
    counter!(
        "catalog_sync_cache_lookups_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record a cache write/invalidate by operation and status.
pub fn record_cache_write(operation: &str, status: &str) {
    counter!(
        "catalog_sync_cache_writes_total",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a search query execution.
pub fn record_search_query(backend: &str, status: &str) {
    counter!(
        "catalog_sync_search_queries_total",
        "backend" => backend.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record search query latency.
pub fn record_search_latency(backend: &str, duration: Duration) {
    histogram!(
        "catalog_sync_search_seconds",
        "backend" => backend.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record search result count.
pub fn record_search_results(count: usize) {
    histogram!("catalog_sync_search_results").record(count as f64);
}

/// Record an index apply (upsert/delete against the search index).
pub fn record_index_apply(operation: &str, status: &str) {
    counter!(
        "catalog_sync_index_applies_total",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Set current index document count.
pub fn set_index_documents(count: usize) {
    gauge!("catalog_sync_index_documents").set(count as f64);
}
