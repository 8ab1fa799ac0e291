//! Closed-loop latency-driven replica autoscaling controller.
//!
//! Samples an aggregate latency metric from a Prometheus-compatible
//! backend, compares it against configured thresholds, and issues
//! scale-out/scale-in actions through an external actuator — responsive
//! enough to mitigate overload, conservative enough to avoid thrashing.

pub mod actuator;
pub mod config;
pub mod control_loop;
pub mod decision;
pub mod error;
pub mod history;
pub mod metrics_source;
pub mod replica_source;
pub mod telemetry;

pub use config::Policy;
pub use control_loop::Controller;
pub use error::ControllerError;
