//! Prometheus metrics for the rig pipeline.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};
use std::sync::{LazyLock, Once};

/// Global metrics registry.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

pub static UPLOADS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("armature_uploads_total", "Model uploads accepted")
        .expect("metric creation failed")
});

pub static UPLOAD_BYTES: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new("armature_upload_bytes", "Size of accepted model uploads in bytes")
            .buckets(vec![
                100_000.0,
                500_000.0,
                1_000_000.0,
                5_000_000.0,
                10_000_000.0,
                25_000_000.0,
                50_000_000.0,
                100_000_000.0,
            ]),
    )
    .expect("metric creation failed")
});

pub static RIGS_STARTED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("armature_rigs_started_total", "Rig attempts started")
        .expect("metric creation failed")
});

pub static RIGS_COMPLETED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "armature_rigs_completed_total",
        "Rig attempts that produced a cached artifact",
    )
    .expect("metric creation failed")
});

pub static RIGS_FAILED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("armature_rigs_failed_total", "Rig attempts that failed")
        .expect("metric creation failed")
});

pub static RIG_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new("armature_rig_duration_seconds", "Wall-clock duration of rig attempts")
            .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1200.0, 1800.0]),
    )
    .expect("metric creation failed")
});

pub static CACHE_HITS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("armature_cache_hits_total", "Rig cache lookups that found a live entry")
        .expect("metric creation failed")
});

pub static CACHE_MISSES: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("armature_cache_misses_total", "Rig cache lookups that found nothing")
        .expect("metric creation failed")
});

pub static CACHE_EVICTIONS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("armature_cache_evictions_total", "Rig cache entries evicted by age")
        .expect("metric creation failed")
});

pub static SAVES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("armature_saves_total", "Cached rigs persisted as durable avatars")
        .expect("metric creation failed")
});

pub static SAVE_FAILURES: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("armature_save_failures_total", "Save attempts that did not persist an avatar")
        .expect("metric creation failed")
});

static REGISTER_ONCE: Once = Once::new();

/// Register all metrics with the registry. Idempotent, so tests and the
/// server entrypoint can both call it.
pub fn register_metrics() {
    REGISTER_ONCE.call_once(|| {
        REGISTRY
            .register(Box::new(UPLOADS_TOTAL.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(UPLOAD_BYTES.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(RIGS_STARTED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(RIGS_COMPLETED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(RIGS_FAILED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(RIG_DURATION.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(CACHE_HITS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(CACHE_MISSES.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(CACHE_EVICTIONS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(SAVES_TOTAL.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(SAVE_FAILURES.clone()))
            .expect("metric registration failed");
    });
}

/// GET /metrics - Prometheus metrics endpoint.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        ),
    }
}
