//! Prometheus metrics for monitoring the arcade server.
//!
//! Metrics are exposed in Prometheus text format on a dedicated listener
//! for scraping by monitoring systems.

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize the Prometheus metrics exporter.
///
/// Sets up a scrape endpoint on the specified address; metrics become
/// available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// Session Metrics
// ============================================================================

/// Increment the sessions-created counter.
pub fn sessions_created_total(game_kind: &str) {
    metrics::counter!("sessions_created_total",
        "game_kind" => game_kind.to_string()
    )
    .increment(1);
}

/// Increment the join counter with an outcome label.
pub fn joins_total(outcome: &str) {
    metrics::counter!("joins_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Increment the score-submission counter.
pub fn score_submissions_total(qualified: bool) {
    metrics::counter!("score_submissions_total",
        "qualified" => qualified.to_string()
    )
    .increment(1);
}

/// Increment the sessions-completed counter.
pub fn sessions_completed_total(has_winner: bool) {
    metrics::counter!("sessions_completed_total",
        "has_winner" => has_winner.to_string()
    )
    .increment(1);
}

// ============================================================================
// Redemption Metrics
// ============================================================================

/// Increment the redemption counter with an outcome label.
pub fn redemptions_total(outcome: &str) {
    metrics::counter!("redemptions_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

// ============================================================================
// WebSocket Metrics
// ============================================================================

/// Set the current number of event-stream subscribers.
pub fn websocket_connections_active(count: usize) {
    metrics::gauge!("websocket_connections_active").set(count as f64);
}
