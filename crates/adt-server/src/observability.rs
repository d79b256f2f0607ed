//! Request metrics
//!
//! Metrics are recorded into a recorder owned by [`DeliveryMetrics`] rather
//! than a process-global one, so each server (and each test) sees only its
//! own counters. `/metrics` renders them in the Prometheus text format.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use metrics::{counter, gauge, histogram, with_local_recorder};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};

pub const REQUESTS_TOTAL: &str = "delivery_requests_total";
pub const REQUEST_DURATION: &str = "delivery_request_duration_seconds";
pub const IN_FLIGHT: &str = "delivery_in_flight";
pub const REQUEST_ERRORS: &str = "delivery_request_errors_total";

/// Latency buckets in seconds.
const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// HTTP request metrics for one server instance.
pub struct DeliveryMetrics {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
}

impl DeliveryMetrics {
    pub fn new() -> Self {
        let builder = PrometheusBuilder::new()
            .set_buckets(LATENCY_BUCKETS)
            .unwrap_or_else(|_| PrometheusBuilder::new());
        let recorder = builder.build_recorder();
        let handle = recorder.handle();
        Self { recorder, handle }
    }

    fn request_started(&self) {
        with_local_recorder(&self.recorder, || {
            gauge!(IN_FLIGHT).increment(1.0);
        });
    }

    fn request_finished(&self, status: StatusCode, elapsed: Duration) {
        with_local_recorder(&self.recorder, || {
            histogram!(REQUEST_DURATION).record(elapsed.as_secs_f64());
            counter!(REQUESTS_TOTAL, "code" => status.as_u16().to_string()).increment(1);
        });
    }

    /// Count a rejected request by kind.
    pub fn request_error(&self, kind: &'static str) {
        with_local_recorder(&self.recorder, || {
            counter!(REQUEST_ERRORS, "type" => kind).increment(1);
        });
    }

    /// Prometheus text exposition of everything recorded so far.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

impl Default for DeliveryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements the in-flight gauge even when the request future is dropped.
struct InFlight<'a>(&'a DeliveryMetrics);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        with_local_recorder(&self.0.recorder, || {
            gauge!(IN_FLIGHT).decrement(1.0);
        });
    }
}

/// Middleware recording latency, status code and in-flight count.
pub async fn measure(
    State(metrics): State<Arc<DeliveryMetrics>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    metrics.request_started();
    let _in_flight = InFlight(&metrics);

    let response = next.run(request).await;
    metrics.request_finished(response.status(), start.elapsed());
    response
}
