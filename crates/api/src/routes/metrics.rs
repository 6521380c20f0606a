//! Prometheus metrics endpoint and metric descriptions.

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;

/// Registers help text for the metrics emitted by the document services.
pub fn describe() {
    metrics::describe_counter!(
        "document_operations_total",
        "Document operations started, by operation and kind"
    );
    metrics::describe_counter!(
        "document_operations_failed_total",
        "Document operations that returned an error, by error class"
    );
    metrics::describe_counter!(
        "document_compensations_total",
        "Compensating actions attempted after a failed step"
    );
    metrics::describe_counter!(
        "document_reconciliation_required_total",
        "Operations left needing manual reconciliation"
    );
    metrics::describe_histogram!(
        "document_operation_duration_seconds",
        metrics::Unit::Seconds,
        "Duration of document write operations"
    );
    metrics::describe_histogram!(
        "document_read_duration_seconds",
        metrics::Unit::Seconds,
        "Duration of document reads"
    );
}

/// GET /metrics: returns Prometheus-formatted metrics.
pub async fn get(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        handle.render(),
    )
}
