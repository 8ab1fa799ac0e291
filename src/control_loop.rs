//! The control loop: drives ticks at a fixed cadence, enforces the cooldown
//! gate, and records history. This is the single owner of all mutable
//! controller state — no process-wide globals.

use crate::actuator::Actuator;
use crate::config::{Direction, Policy};
use crate::decision::DecisionEngine;
use crate::error::ControllerError;
use crate::history::{ActionHistory, MetricHistory};
use crate::metrics_source::MetricsSource;
use crate::replica_source::ReplicaSource;
use chrono::{DateTime, Utc};
use std::time::Instant;
use tracing::{error, info, info_span, warn, Instrument};

const READINESS_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_secs(5);
const READINESS_MAX_ATTEMPTS: u32 = 30;

/// All mutable state owned by the control loop across ticks.
pub struct Controller {
    policy: Policy,
    metrics_source: MetricsSource,
    replica_source: ReplicaSource,
    actuator: Actuator,
    engine: DecisionEngine,
    last_action_time: Option<DateTime<Utc>>,
    last_action_direction: Option<Direction>,
    metric_history: MetricHistory,
    action_history: ActionHistory,
}

impl Controller {
    /// Build a new controller from policy and its three adapters.
    #[must_use]
    pub fn new(
        policy: Policy,
        metrics_source: MetricsSource,
        replica_source: ReplicaSource,
        actuator: Actuator,
    ) -> Self {
        Self {
            policy,
            metrics_source,
            replica_source,
            actuator,
            engine: DecisionEngine::default(),
            last_action_time: None,
            last_action_direction: None,
            metric_history: MetricHistory::default(),
            action_history: ActionHistory::default(),
        }
    }

    /// Poll the metrics source's readiness probe every 5 seconds for up to
    /// 30 attempts.
    ///
    /// # Errors
    /// Returns `ControllerError::BackendUnreachable` if the backend never
    /// reports ready within the attempt budget. This is fatal: the caller
    /// is expected to terminate the process.
    pub async fn await_readiness(&self) -> Result<(), ControllerError> {
        for attempt in 1..=READINESS_MAX_ATTEMPTS {
            if self.metrics_source.is_ready().await {
                info!("metrics backend ready after {attempt} attempt(s)");
                return Ok(());
            }
            warn!(
                "metrics backend not ready (attempt {attempt}/{READINESS_MAX_ATTEMPTS}), retrying in {:?}",
                READINESS_POLL_INTERVAL
            );
            tokio::time::sleep(READINESS_POLL_INTERVAL).await;
        }
        Err(ControllerError::BackendUnreachable {
            url: self.policy.prometheus_url.clone(),
            attempts: READINESS_MAX_ATTEMPTS,
        })
    }

    /// Run the control loop until `shutdown` resolves. The loop exits after
    /// the current tick's actuator call has returned (never mid-actuation).
    pub async fn run(&mut self, mut shutdown: tokio::sync::oneshot::Receiver<()>) {
        loop {
            self.tick().instrument(info_span!("scaler_tick")).await;

            tokio::select! {
                () = tokio::time::sleep(self.policy.check_interval) => {}
                _ = &mut shutdown => {
                    info!("shutdown signal received during between-tick sleep, exiting");
                    return;
                }
            }
        }
    }

    /// One iteration of the control loop.
    async fn tick(&mut self) {
        let metric = self.metrics_source.query().await;
        let replicas = self.replica_source.current_replicas().await;
        crate::telemetry::set_current_replicas(replicas);

        if let Some(metric) = metric {
            self.metric_history.record(metric, replicas);
        }

        let target = self.engine.decide(metric, replicas, &self.policy);
        crate::telemetry::set_breach_count(self.engine.breach_count());

        let Some(target) = target else {
            crate::telemetry::record_tick("no_change");
            return;
        };

        let direction = if target > replicas {
            Direction::Up
        } else {
            Direction::Down
        };

        if let Some(last_time) = self.last_action_time {
            if let Some(last_direction) = self.last_action_direction {
                let cooldown = last_direction.cooldown(&self.policy);
                let elapsed = Utc::now().signed_duration_since(last_time);
                if elapsed
                    < chrono::Duration::from_std(cooldown).unwrap_or(chrono::Duration::zero())
                {
                    info!(
                        "cooldown active ({:?} remaining), skipping actuation to {target}",
                        cooldown
                    );
                    crate::telemetry::record_tick("cooldown_gated");
                    return;
                }
            }
        }

        let start = Instant::now();
        let success = self.actuator.apply(target).await;
        let duration = start.elapsed();

        self.action_history.record(target, success, duration);

        let direction_label = match direction {
            Direction::Up => "up",
            Direction::Down => "down",
        };

        if success {
            self.last_action_time = Some(Utc::now());
            self.last_action_direction = Some(direction);
            info!("scaled {replicas} -> {target} ({direction:?})");
            crate::telemetry::record_actuation(direction_label, "success");
            crate::telemetry::record_tick("actuated");
        } else {
            // Actuation failure: cooldown is not armed, so a re-confirmed
            // breach can retry on the next tick.
            error!("actuation to {target} failed; will retry once re-confirmed");
            crate::telemetry::record_actuation(direction_label, "failure");
            crate::telemetry::record_tick("actuation_failed");
        }
    }

    /// Current replica-count-weighted recent average metric, for reporting.
    #[must_use]
    pub fn recent_average_metric(&self) -> Option<f64> {
        self.metric_history.recent_average()
    }

    /// Number of ticks whose metric sample was retained.
    #[must_use]
    pub fn metric_history_len(&self) -> usize {
        self.metric_history.len()
    }

    /// Number of actuation attempts retained.
    #[must_use]
    pub fn action_history_len(&self) -> usize {
        self.action_history.len()
    }

    /// Current breach count, for the `/metrics` exporter.
    #[must_use]
    pub fn breach_count(&self) -> u32 {
        self.engine.breach_count()
    }
}
