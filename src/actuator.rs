//! Actuator Adapter — applies a target replica count via a subprocess
//! invocation of an external, playbook-driven change driver.

use std::time::Duration;
use tokio::process::Command;
use tracing::{error, info};

const ACTUATION_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_COMMAND: &str = "ansible-playbook";

/// Adapter over an external change driver invoked once per actuation.
/// Idempotent w.r.t. `target`: applying the same target twice converges to
/// the same steady state.
pub struct Actuator {
    command: String,
    service_name: String,
    playbook_path: String,
}

impl Actuator {
    /// Build a new actuator adapter that shells out to `ansible-playbook`.
    #[must_use]
    pub fn new(service_name: String, playbook_path: String) -> Self {
        Self {
            command: DEFAULT_COMMAND.to_string(),
            service_name,
            playbook_path,
        }
    }

    /// Build an actuator that shells out to an arbitrary command, for tests
    /// that stand in a fake driver script in place of `ansible-playbook`.
    #[must_use]
    pub fn with_command(command: String, service_name: String, playbook_path: String) -> Self {
        Self {
            command,
            service_name,
            playbook_path,
        }
    }

    /// Apply `target` as the desired replica count. Blocking (from the
    /// caller's perspective, this `.await`s the whole subprocess) with a
    /// hard 120s ceiling. Returns `true` only if the driver reports success.
    pub async fn apply(&self, target: u32) -> bool {
        let invocation = Command::new(&self.command)
            .arg(&self.playbook_path)
            .arg("-e")
            .arg(format!("target_replicas={target}"))
            .arg("-e")
            .arg(format!("service_name={}", self.service_name))
            .arg("-v")
            .output();

        match tokio::time::timeout(ACTUATION_TIMEOUT, invocation).await {
            Ok(Ok(output)) if output.status.success() => {
                info!("actuator applied target_replicas={target} successfully");
                true
            }
            Ok(Ok(output)) => {
                error!(
                    "actuator exited with {:?} applying target_replicas={target}",
                    output.status.code()
                );
                false
            }
            Ok(Err(e)) => {
                error!("actuator invocation failed to spawn: {e}");
                false
            }
            Err(_) => {
                error!("actuator invocation timed out after {ACTUATION_TIMEOUT:?}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_service_name_and_playbook_path() {
        let actuator = Actuator::new("webapp".to_string(), "scale.yml".to_string());
        assert_eq!(actuator.service_name, "webapp");
        assert_eq!(actuator.playbook_path, "scale.yml");
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn succeeding_driver_reports_success() {
        let actuator =
            Actuator::with_command("true".to_string(), "webapp".to_string(), "ignored".to_string());
        assert!(actuator.apply(3).await);
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn failing_driver_reports_failure() {
        let actuator = Actuator::with_command(
            "false".to_string(),
            "webapp".to_string(),
            "ignored".to_string(),
        );
        assert!(!actuator.apply(3).await);
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn missing_driver_reports_failure() {
        let actuator = Actuator::with_command(
            "this-binary-does-not-exist-anywhere".to_string(),
            "webapp".to_string(),
            "ignored".to_string(),
        );
        assert!(!actuator.apply(3).await);
    }
}
