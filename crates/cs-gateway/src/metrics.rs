//! Metrics infrastructure for the API gateway
//!
//! Provides Prometheus-compatible metrics for:
//! - Request counts by resource/action and route variant
//! - Request latency
//! - Route resolution misses
//! - Dropped usage records

use metrics::{counter, histogram};
use std::time::Duration;

use cs_common::RouteVariant;

/// Record a dispatched request
pub fn record_request(resource: &str, action: &str, variant: RouteVariant, status: u16) {
    counter!(
        "cs_requests_total",
        "resource" => resource.to_string(),
        "action" => action.to_string(),
        "variant" => variant.as_str(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record request latency
pub fn record_request_latency(method: &str, duration: Duration) {
    histogram!(
        "cs_request_duration_seconds",
        "method" => method.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record a request that matched no route
pub fn record_route_not_found(method: &str) {
    counter!(
        "cs_route_not_found_total",
        "method" => method.to_string()
    )
    .increment(1);
}

/// Record a usage record lost to backpressure
pub fn record_usage_dropped() {
    counter!("cs_usage_records_dropped_total").increment(1);
}
