//! Latency Autoscaling Controller — entrypoint
//!
//! - Tracing initialization
//! - Environment-driven configuration with startup validation
//! - Readiness probing of the metrics backend before the first tick
//! - A single-threaded periodic control loop
//! - Graceful shutdown on Ctrl+C/SIGTERM

use anyhow::{Context, Result};
use latency_autoscaler::actuator::Actuator;
use latency_autoscaler::control_loop::Controller;
use latency_autoscaler::metrics_source::MetricsSource;
use latency_autoscaler::replica_source::ReplicaSource;
use latency_autoscaler::telemetry;
use latency_autoscaler::Policy;
use std::net::SocketAddr;
use tracing::{error, info};

const DEFAULT_PLAYBOOK_PATH: &str = "playbooks/scale.yml";
const DEFAULT_PROJECT_NAME: &str = "autoscale-sim";

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing();

    info!(
        "Starting latency autoscaling controller v{}",
        env!("CARGO_PKG_VERSION")
    );

    let policy = match Policy::from_env() {
        Ok(policy) => policy,
        Err(e) => {
            error!("fatal configuration error: {e}");
            std::process::exit(1);
        }
    };

    let metrics_source =
        MetricsSource::new(policy.prometheus_url.clone(), policy.metric_query.clone());
    let replica_source = ReplicaSource::new(
        std::env::var("PROJECT_NAME").unwrap_or_else(|_| DEFAULT_PROJECT_NAME.to_string()),
        policy.service_name.clone(),
        policy.min_replicas,
    );
    let actuator = Actuator::new(
        policy.service_name.clone(),
        std::env::var("SCALE_PLAYBOOK_PATH").unwrap_or_else(|_| DEFAULT_PLAYBOOK_PATH.to_string()),
    );

    let metrics_addr: SocketAddr = format!("0.0.0.0:{}", policy.metrics_port)
        .parse()
        .context("invalid metrics address")?;

    let mut controller = Controller::new(policy, metrics_source, replica_source, actuator);

    if let Err(e) = controller.await_readiness().await {
        error!("{e}");
        std::process::exit(1);
    }

    tokio::spawn(async move {
        info!("metrics server listening on {metrics_addr}");
        telemetry::serve_metrics(metrics_addr).await;
    });

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(());
    });

    controller.run(shutdown_rx).await;

    info!("controller shutdown complete");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => error!("failed to install SIGTERM handler: {e}"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl+C, initiating graceful shutdown"),
        () = terminate => info!("received SIGTERM, initiating graceful shutdown"),
    }
}
