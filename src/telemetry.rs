//! Observability layer: structured logging and the `/metrics` exporter.

use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec, register_int_gauge, IntCounterVec, IntGauge};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use warp::Filter;

const SERVICE_NAME: &str = "latency-autoscaler";

lazy_static! {
    static ref TICKS_PROCESSED: IntCounterVec = register_int_counter_vec!(
        "autoscaler_ticks_total",
        "Number of control loop ticks processed",
        &["outcome"]
    )
    .expect("failed to register autoscaler_ticks_total");
    static ref ACTUATIONS: IntCounterVec = register_int_counter_vec!(
        "autoscaler_actuations_total",
        "Number of actuations issued, by direction and outcome",
        &["direction", "outcome"]
    )
    .expect("failed to register autoscaler_actuations_total");
    static ref BREACH_COUNT: IntGauge = register_int_gauge!(
        "autoscaler_breach_count",
        "Current consecutive same-direction breach count"
    )
    .expect("failed to register autoscaler_breach_count");
    static ref CURRENT_REPLICAS: IntGauge = register_int_gauge!(
        "autoscaler_current_replicas",
        "Most recently observed replica count"
    )
    .expect("failed to register autoscaler_current_replicas");
}

/// Record that a tick completed, with a coarse outcome label.
pub fn record_tick(outcome: &str) {
    TICKS_PROCESSED.with_label_values(&[outcome]).inc();
}

/// Record an actuation attempt.
pub fn record_actuation(direction: &str, outcome: &str) {
    ACTUATIONS.with_label_values(&[direction, outcome]).inc();
}

/// Update the breach-count gauge.
pub fn set_breach_count(count: u32) {
    BREACH_COUNT.set(i64::from(count));
}

/// Update the current-replicas gauge.
pub fn set_current_replicas(count: u32) {
    CURRENT_REPLICAS.set(i64::from(count));
}

/// Initialize the global tracing subscriber.
///
/// # Panics
/// Panics if a global subscriber has already been installed.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "{}=info,reqwest=warn",
                    SERVICE_NAME.replace('-', "_")
                )
                .into()
            }),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true)
                .with_thread_names(true),
        )
        .init();
}

/// Serve the Prometheus `/metrics` and `/health` routes until cancelled.
pub async fn serve_metrics(addr: SocketAddr) {
    let metrics_route = warp::path("metrics").map(|| {
        use prometheus::{Encoder, TextEncoder};
        let encoder = TextEncoder::new();
        let metric_families = prometheus::gather();
        let mut buffer = Vec::new();
        match encoder.encode(&metric_families, &mut buffer) {
            Ok(()) => String::from_utf8(buffer)
                .unwrap_or_else(|_| "error encoding metrics".to_string()),
            Err(_) => "error gathering metrics".to_string(),
        }
    });

    let health_route = warp::path("health").map(|| "OK");

    let routes = metrics_route.or(health_route);
    warp::serve(routes).run(addr).await;
}
