//! Metrics and observability utilities
//!
//! Metrics go through the `metrics` facade; a host process decides whether a
//! recorder/exporter is installed. Without one every call is a no-op.

use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram,
    gauge, histogram, Unit,
};

/// Metrics prefix for all WebRank metrics
pub const METRICS_PREFIX: &str = "webrank";

/// Register all metric descriptions
pub fn register_metrics() {
    // Search metrics
    describe_counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of ranked search queries"
    );

    describe_histogram!(
        format!("{}_search_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Ranked search latency in seconds"
    );

    describe_gauge!(
        format!("{}_search_results_count", METRICS_PREFIX),
        Unit::Count,
        "Number of results returned from the last search"
    );

    describe_counter!(
        format!("{}_search_failures_total", METRICS_PREFIX),
        Unit::Count,
        "Searches that failed because the search service was unavailable"
    );

    describe_counter!(
        format!("{}_suggest_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total prefix completion requests"
    );

    // Authority metrics
    describe_counter!(
        format!("{}_authority_runs_total", METRICS_PREFIX),
        Unit::Count,
        "Authority computations, labelled by convergence"
    );

    describe_gauge!(
        format!("{}_authority_iterations", METRICS_PREFIX),
        Unit::Count,
        "Iterations used by the last authority computation"
    );

    describe_gauge!(
        format!("{}_graph_nodes", METRICS_PREFIX),
        Unit::Count,
        "Nodes in the last link graph"
    );

    // History metrics
    describe_counter!(
        format!("{}_history_appends_total", METRICS_PREFIX),
        Unit::Count,
        "Query history appends, labelled by outcome"
    );

    // Ingestion metrics
    describe_counter!(
        format!("{}_pages_indexed_total", METRICS_PREFIX),
        Unit::Count,
        "Pages accepted by the search service"
    );

    describe_counter!(
        format!("{}_pages_failed_total", METRICS_PREFIX),
        Unit::Count,
        "Pages rejected by the search service"
    );

    tracing::debug!("Metrics registered");
}

/// Helper to record search metrics
pub fn record_search(duration_secs: f64, mode: &str, result_count: usize) {
    counter!(
        format!("{}_search_queries_total", METRICS_PREFIX),
        "mode" => mode.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_search_duration_seconds", METRICS_PREFIX),
        "mode" => mode.to_string()
    )
    .record(duration_secs);

    gauge!(
        format!("{}_search_results_count", METRICS_PREFIX),
        "mode" => mode.to_string()
    )
    .set(result_count as f64);
}

/// Helper to record a search that the service could not answer
pub fn record_search_failure(mode: &str) {
    counter!(
        format!("{}_search_failures_total", METRICS_PREFIX),
        "mode" => mode.to_string()
    )
    .increment(1);
}

/// Helper to record a completion request
pub fn record_suggest(suggestion_count: usize) {
    counter!(format!("{}_suggest_requests_total", METRICS_PREFIX)).increment(1);
    tracing::trace!(suggestion_count, "Suggest recorded");
}

/// Helper to record an authority computation
pub fn record_authority_run(nodes: usize, iterations: usize, converged: bool) {
    let status = if converged { "converged" } else { "capped" };

    counter!(
        format!("{}_authority_runs_total", METRICS_PREFIX),
        "status" => status.to_string()
    )
    .increment(1);

    gauge!(format!("{}_authority_iterations", METRICS_PREFIX)).set(iterations as f64);
    gauge!(format!("{}_graph_nodes", METRICS_PREFIX)).set(nodes as f64);
}

/// Helper to record a history append
pub fn record_history_append(success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_history_appends_total", METRICS_PREFIX),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Helper to record bulk indexing outcome
pub fn record_bulk_index(indexed: usize, failed: usize) {
    counter!(format!("{}_pages_indexed_total", METRICS_PREFIX)).increment(indexed as u64);
    counter!(format!("{}_pages_failed_total", METRICS_PREFIX)).increment(failed as u64);
}
