//! Metrics emitted by the batch cache.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `batch_query_preloads_total` - Successful preloads
//! - `batch_query_preload_failures_total` - Preloads that returned an error
//! - `batch_query_keys_registered_total` - New keys added to a batch
//! - `batch_query_ticket_counts_cache_total{result}` - Ticket-count lookups by `hit` / `miss`
//! - `batch_query_store_queries_total{query}` - Queries issued by store implementations
//!
//! ## Histograms
//! - `batch_query_preload_duration_seconds` - Time spent in one preload
//! - `batch_query_batch_size` - Number of parents per preload

use metrics::{describe_counter, describe_histogram};

/// Successful preloads.
pub const PRELOADS_TOTAL: &str = "batch_query_preloads_total";
/// Failed preloads.
pub const PRELOAD_FAILURES_TOTAL: &str = "batch_query_preload_failures_total";
/// Newly registered keys.
pub const KEYS_REGISTERED_TOTAL: &str = "batch_query_keys_registered_total";
/// Ticket-count cache lookups, labelled by `result`.
pub const TICKET_COUNTS_CACHE_TOTAL: &str = "batch_query_ticket_counts_cache_total";
/// Store queries, labelled by `query`.
pub const STORE_QUERIES_TOTAL: &str = "batch_query_store_queries_total";
/// Preload latency.
pub const PRELOAD_DURATION_SECONDS: &str = "batch_query_preload_duration_seconds";
/// Parents per preload.
pub const BATCH_SIZE: &str = "batch_query_batch_size";

/// Register all metric descriptions.
///
/// Call once at startup, after installing a recorder.
pub fn register_metrics() {
    describe_counter!(PRELOADS_TOTAL, "Total number of successful batch preloads");
    describe_counter!(
        PRELOAD_FAILURES_TOTAL,
        "Total number of batch preloads that failed"
    );
    describe_counter!(
        KEYS_REGISTERED_TOTAL,
        "Total number of parent ids newly added to a batch"
    );
    describe_counter!(
        TICKET_COUNTS_CACHE_TOTAL,
        "Ticket-count lookups served from the batch cache (hit) or computed directly (miss)"
    );
    describe_counter!(
        STORE_QUERIES_TOTAL,
        "Queries issued against the ticket store, by query (tickets, attendee_counts, ticket_counts)"
    );
    describe_histogram!(
        PRELOAD_DURATION_SECONDS,
        "Time taken to run the consolidated batch queries"
    );
    describe_histogram!(BATCH_SIZE, "Number of parent ids preloaded together");

    tracing::debug!("Batch query metrics registered");
}
