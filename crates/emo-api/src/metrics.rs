//! Prometheus metrics for the API server.

use std::time::Instant;

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("failed to install Prometheus recorder: {}", e))
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "emo_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "emo_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "emo_http_requests_in_flight";

    // Pipeline metrics
    pub const STAGE_DURATION_SECONDS: &str = "emo_stage_duration_seconds";
    pub const EXTRACTIONS_DEGRADED_TOTAL: &str = "emo_extractions_degraded_total";
    pub const PREDICTIONS_TOTAL: &str = "emo_predictions_total";
    pub const FEEDBACK_FAILURES_TOTAL: &str = "emo_feedback_failures_total";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "emo_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, route: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("route", route.to_string()),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record how long a pipeline stage took.
pub fn record_stage_duration(stage: &'static str, duration_secs: f64) {
    histogram!(names::STAGE_DURATION_SECONDS, "stage" => stage).record(duration_secs);
}

/// Record an extractor falling back to a zero tensor.
pub fn record_degraded_extraction(modality: &'static str) {
    counter!(names::EXTRACTIONS_DEGRADED_TOTAL, "modality" => modality).increment(1);
}

/// Record a completed prediction.
pub fn record_prediction(label: &'static str, is_match: bool) {
    counter!(
        names::PREDICTIONS_TOTAL,
        "label" => label,
        "match" => if is_match { "true" } else { "false" }
    )
    .increment(1);
}

/// Record a failed feedback call.
pub fn record_feedback_failure() {
    counter!(names::FEEDBACK_FAILURES_TOTAL).increment(1);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(route: &str) {
    let labels = [("route", route.to_string())];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Route template for labels; unmatched paths collapse into one series.
pub fn route_label<B>(request: &Request<B>) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string())
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let route = route_label(&request);
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);
    let response = next.run(request).await;
    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    record_http_request(
        &method,
        &route,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmatched_route_label() {
        let request = Request::builder()
            .uri("/some/random/path/123")
            .body(())
            .unwrap();
        assert_eq!(route_label(&request), "unmatched");
    }
}
