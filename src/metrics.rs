//! Prometheus metrics: HTTP request instrumentation plus scheduling
//! gauges refreshed by the stats module.

use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
    routing::get,
};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

static OBSERVABILITY_ENABLED: OnceLock<bool> = OnceLock::new();

/// Check if observability is enabled via OBSERVABILITY_ENABLED env var
pub fn is_observability_enabled() -> bool {
    *OBSERVABILITY_ENABLED.get_or_init(|| {
        std::env::var("OBSERVABILITY_ENABLED")
            .map(|v| v.to_lowercase() != "false" && v != "0")
            .unwrap_or(true)
    })
}

/// Initialize Prometheus metrics exporter with upkeep task.
/// Returns None if observability is disabled.
pub fn init_metrics() -> Option<PrometheusHandle> {
    if !is_observability_enabled() {
        return None;
    }

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            &[
                0.001, 0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0,
            ],
        )
        .expect("Failed to set buckets")
        .install_recorder()
        .expect("Failed to install Prometheus recorder");

    // Upkeep task cleans stale metrics
    let upkeep_handle = handle.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(5)).await;
            upkeep_handle.run_upkeep();
        }
    });

    Some(handle)
}

/// Metrics middleware to track HTTP requests
pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    if !is_observability_enabled() {
        return next.run(req).await;
    }

    let start = Instant::now();
    let method = req.method().as_str().to_owned();
    let uri_path = req.uri().path().to_owned();

    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or(uri_path);

    gauge!("http_requests_active").increment(1.0);

    let response = next.run(req).await;

    let latency = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    counter!("http_requests_total", "method" => method.clone(), "path" => path.clone(), "status" => status).increment(1);
    histogram!("http_request_duration_seconds", "method" => method, "path" => path).record(latency);

    gauge!("http_requests_active").decrement(1.0);

    response
}

/// Router for metrics server
pub fn metrics_app(handle: PrometheusHandle) -> Router {
    Router::new().route("/metrics", get(move || async move { handle.render() }))
}

// Business metrics helpers

pub fn track_room_assigned() {
    if !is_observability_enabled() {
        return;
    }
    counter!("room_assignments_total", "outcome" => "assigned").increment(1);
}

pub fn track_room_unassigned() {
    if !is_observability_enabled() {
        return;
    }
    counter!("room_assignments_total", "outcome" => "unassigned").increment(1);
}

pub fn track_assignment_conflict() {
    if !is_observability_enabled() {
        return;
    }
    counter!("room_assignment_conflicts_total").increment(1);
}

pub fn track_exception_created(kind: &str) {
    if !is_observability_enabled() {
        return;
    }
    counter!("schedule_exceptions_total", "kind" => kind.to_string()).increment(1);
}

/// Refresh the scheduling gauges from a stats snapshot.
pub fn set_schedule_gauges(pending_slots: i64, assigned_slots: i64, assignment_rate: f64) {
    if !is_observability_enabled() {
        return;
    }
    gauge!("schedule_slots_pending").set(pending_slots as f64);
    gauge!("schedule_slots_assigned").set(assigned_slots as f64);
    gauge!("schedule_assignment_rate").set(assignment_rate);
}
