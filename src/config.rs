//! Controller configuration
//!
//! `Policy` bundles every threshold, limit, and timing parameter the
//! decision engine and control loop consult. It is built once at startup
//! from environment variables and never mutated afterwards.

use crate::error::ControllerError;
use serde::{Deserialize, Serialize};

const DEFAULT_PROMETHEUS_URL: &str = "http://localhost:9090";
const DEFAULT_SERVICE_NAME: &str = "webapp";
const DEFAULT_SCALE_UP_THRESHOLD: f64 = 0.6;
const DEFAULT_SCALE_DOWN_THRESHOLD: f64 = 0.2;
const DEFAULT_MAX_REPLICAS: u32 = 6;
const DEFAULT_MIN_REPLICAS: u32 = 1;
const DEFAULT_CHECK_INTERVAL_SECS: u64 = 10;
const DEFAULT_SCALE_UP_COOLDOWN_SECS: u64 = 30;
const DEFAULT_SCALE_DOWN_COOLDOWN_SECS: u64 = 60;
const DEFAULT_SCALE_UP_BREACHES_REQUIRED: u32 = 2;
const DEFAULT_SCALE_DOWN_BREACHES_REQUIRED: u32 = 3;
const DEFAULT_METRIC_QUERY: &str = "avg(http_request_duration_seconds)";
const DEFAULT_METRICS_PORT: u16 = 9100;

/// Scaling direction, used both for breach accumulation and for keying cooldowns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Metric is above `scale_up_threshold`
    Up,
    /// Metric is below `scale_down_threshold`
    Down,
}

impl Direction {
    /// Cooldown length that applies when the *previous* action was in this direction.
    #[must_use]
    pub fn cooldown(self, policy: &Policy) -> std::time::Duration {
        match self {
            Direction::Up => policy.scale_up_cooldown,
            Direction::Down => policy.scale_down_cooldown,
        }
    }

    /// Consecutive breaches required before a decision fires in this direction.
    #[must_use]
    pub fn breaches_required(self, policy: &Policy) -> u32 {
        match self {
            Direction::Up => policy.scale_up_breaches_required,
            Direction::Down => policy.scale_down_breaches_required,
        }
    }
}

/// Immutable scaling policy, built once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    /// Latency above which the system is considered overloaded (seconds)
    pub scale_up_threshold: f64,
    /// Latency below which the system is considered underutilized (seconds)
    pub scale_down_threshold: f64,
    /// Floor on replica count
    pub min_replicas: u32,
    /// Ceiling on replica count
    pub max_replicas: u32,
    /// Cadence of the control loop
    pub check_interval: std::time::Duration,
    /// Minimum wall time after a successful scale-up before another actuation
    pub scale_up_cooldown: std::time::Duration,
    /// Minimum wall time after a successful scale-down before another actuation
    pub scale_down_cooldown: std::time::Duration,
    /// Consecutive out-of-band samples required before a scale-up decision
    pub scale_up_breaches_required: u32,
    /// Consecutive out-of-band samples required before a scale-down decision
    pub scale_down_breaches_required: u32,
    /// Base URL of the Prometheus-compatible metrics backend
    pub prometheus_url: String,
    /// Instant query issued against the metrics backend
    pub metric_query: String,
    /// Service identifier passed to the replica and actuator adapters
    pub service_name: String,
    /// Port the `/metrics` exporter listens on
    pub metrics_port: u16,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            scale_up_threshold: DEFAULT_SCALE_UP_THRESHOLD,
            scale_down_threshold: DEFAULT_SCALE_DOWN_THRESHOLD,
            min_replicas: DEFAULT_MIN_REPLICAS,
            max_replicas: DEFAULT_MAX_REPLICAS,
            check_interval: std::time::Duration::from_secs(DEFAULT_CHECK_INTERVAL_SECS),
            scale_up_cooldown: std::time::Duration::from_secs(DEFAULT_SCALE_UP_COOLDOWN_SECS),
            scale_down_cooldown: std::time::Duration::from_secs(DEFAULT_SCALE_DOWN_COOLDOWN_SECS),
            scale_up_breaches_required: DEFAULT_SCALE_UP_BREACHES_REQUIRED,
            scale_down_breaches_required: DEFAULT_SCALE_DOWN_BREACHES_REQUIRED,
            prometheus_url: DEFAULT_PROMETHEUS_URL.to_string(),
            metric_query: DEFAULT_METRIC_QUERY.to_string(),
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            metrics_port: DEFAULT_METRICS_PORT,
        }
    }
}

impl Policy {
    /// Load configuration from environment variables, falling back to defaults.
    ///
    /// # Errors
    /// Returns `ControllerError::Configuration` if a recognized variable is
    /// set but does not parse, or if the resulting policy fails validation.
    pub fn from_env() -> Result<Self, ControllerError> {
        let defaults = Self::default();

        let scale_up_threshold = env_parse("SCALE_UP_THRESHOLD", defaults.scale_up_threshold)?;
        let scale_down_threshold =
            env_parse("SCALE_DOWN_THRESHOLD", defaults.scale_down_threshold)?;
        let min_replicas = env_parse("MIN_REPLICAS", defaults.min_replicas)?;
        let max_replicas = env_parse("MAX_REPLICAS", defaults.max_replicas)?;
        let check_interval_secs = env_parse("CHECK_INTERVAL", DEFAULT_CHECK_INTERVAL_SECS)?;
        let scale_up_cooldown_secs =
            env_parse("SCALE_UP_COOLDOWN", DEFAULT_SCALE_UP_COOLDOWN_SECS)?;
        let scale_down_cooldown_secs =
            env_parse("SCALE_DOWN_COOLDOWN", DEFAULT_SCALE_DOWN_COOLDOWN_SECS)?;
        let scale_up_breaches_required = env_parse(
            "SCALE_UP_BREACHES_REQUIRED",
            defaults.scale_up_breaches_required,
        )?;
        let scale_down_breaches_required = env_parse(
            "SCALE_DOWN_BREACHES_REQUIRED",
            defaults.scale_down_breaches_required,
        )?;
        let metrics_port = env_parse("METRICS_PORT", defaults.metrics_port)?;

        let policy = Self {
            scale_up_threshold,
            scale_down_threshold,
            min_replicas,
            max_replicas,
            check_interval: std::time::Duration::from_secs(check_interval_secs),
            scale_up_cooldown: std::time::Duration::from_secs(scale_up_cooldown_secs),
            scale_down_cooldown: std::time::Duration::from_secs(scale_down_cooldown_secs),
            scale_up_breaches_required,
            scale_down_breaches_required,
            prometheus_url: std::env::var("PROMETHEUS_URL")
                .unwrap_or_else(|_| defaults.prometheus_url.clone()),
            metric_query: std::env::var("METRIC_QUERY")
                .unwrap_or_else(|_| defaults.metric_query.clone()),
            service_name: std::env::var("SERVICE_NAME")
                .unwrap_or_else(|_| defaults.service_name.clone()),
            metrics_port,
        };

        policy.validate()?;
        Ok(policy)
    }

    /// Validate invariants that must hold before the control loop starts.
    ///
    /// # Errors
    /// Returns `ControllerError::Configuration` describing the first
    /// violated invariant found.
    pub fn validate(&self) -> Result<(), ControllerError> {
        if self.min_replicas < 1 {
            return Err(ControllerError::Configuration {
                message: "min_replicas must be at least 1".to_string(),
            });
        }
        if self.min_replicas > self.max_replicas {
            return Err(ControllerError::Configuration {
                message: format!(
                    "min_replicas ({}) must not exceed max_replicas ({})",
                    self.min_replicas, self.max_replicas
                ),
            });
        }
        if !(self.scale_up_threshold > 0.0) {
            return Err(ControllerError::Configuration {
                message: "scale_up_threshold must be positive".to_string(),
            });
        }
        if !(self.scale_down_threshold > 0.0) {
            return Err(ControllerError::Configuration {
                message: "scale_down_threshold must be positive".to_string(),
            });
        }
        if self.scale_down_threshold >= self.scale_up_threshold {
            return Err(ControllerError::Configuration {
                message: format!(
                    "scale_down_threshold ({}) must be less than scale_up_threshold ({})",
                    self.scale_down_threshold, self.scale_up_threshold
                ),
            });
        }
        if self.scale_up_breaches_required < 1 || self.scale_down_breaches_required < 1 {
            return Err(ControllerError::Configuration {
                message: "breaches_required counts must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

fn env_parse<T>(key: &str, default: T) -> Result<T, ControllerError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(val) => val.parse().map_err(|e| ControllerError::Configuration {
            message: format!("invalid {key}: {e}"),
        }),
        Err(_) => {
            tracing::warn!("{key} not set, using default");
            Ok(default)
        }
    }
}
