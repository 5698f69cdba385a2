//! Prometheus metrics for posts-service.
//!
//! Exposes page-cache and HTTP collectors and an HTTP handler for the `/metrics` endpoint.

use actix_web::HttpResponse;
use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};

lazy_static! {
    /// Page cache lookups (hit/miss/error).
    pub static ref PAGE_CACHE_EVENTS: IntCounterVec = register_int_counter_vec!(
        "page_cache_events_total",
        "Page cache events segmented by outcome",
        &["event"]
    )
    .expect("failed to register page_cache_events_total");

    /// Page cache write results (success/error).
    pub static ref PAGE_CACHE_WRITE_TOTAL: IntCounterVec = register_int_counter_vec!(
        "page_cache_write_total",
        "Page cache write attempts segmented by outcome",
        &["result"]
    )
    .expect("failed to register page_cache_write_total");

    /// HTTP request latency by method, matched route and status class.
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration segmented by route and status",
        &["method", "route", "status"]
    )
    .expect("failed to register http_request_duration_seconds");

    /// Posts, comments and follows written, by kind.
    pub static ref CONTENT_WRITES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "content_writes_total",
        "Content written segmented by kind",
        &["kind"]
    )
    .expect("failed to register content_writes_total");
}

/// Actix handler that renders Prometheus metrics in text format.
pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
