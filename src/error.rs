//! Error types for the autoscaling controller

use thiserror::Error;

/// Controller-level error types
#[derive(Error, Debug)]
pub enum ControllerError {
    /// Configuration failed validation at startup
    #[error("invalid configuration: {message}")]
    Configuration {
        /// What about the configuration is invalid
        message: String,
    },

    /// The metrics backend never became ready during the startup probe
    #[error("metrics backend at {url} did not become ready after {attempts} attempts")]
    BackendUnreachable {
        /// Base URL of the metrics backend
        url: String,
        /// Number of readiness attempts made before giving up
        attempts: u32,
    },
}
