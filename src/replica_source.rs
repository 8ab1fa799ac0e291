//! Replica Source Adapter — reports the count of currently running
//! replicas of the configured service via a subprocess invocation.

use std::time::Duration;
use tokio::process::Command;
use tracing::warn;

const REPLICA_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Adapter that lists running containers filtered by a
/// `{project}_{service}` name prefix and counts the distinct running names.
pub struct ReplicaSource {
    project: String,
    service_name: String,
    /// Conservative fallback returned on any read failure — load-bearing,
    /// not a default to "fix" away.
    min_replicas: u32,
}

impl ReplicaSource {
    /// Build a new adapter.
    #[must_use]
    pub fn new(project: String, service_name: String, min_replicas: u32) -> Self {
        Self {
            project,
            service_name,
            min_replicas,
        }
    }

    /// Current running replica count. Returns `min_replicas` on any failure:
    /// timeout, non-zero exit, or unparseable output. This prevents a broken
    /// adapter from ever requesting scale-down below the floor.
    pub async fn current_replicas(&self) -> u32 {
        let prefix = format!("{}_{}", self.project, self.service_name);

        let invocation = Command::new("docker")
            .args([
                "ps",
                "--filter",
                &format!("name={prefix}"),
                "--filter",
                "status=running",
                "--format",
                "{{.Names}}",
            ])
            .output();

        let output = match tokio::time::timeout(REPLICA_READ_TIMEOUT, invocation).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                warn!("replica source invocation failed to spawn: {e}");
                return self.min_replicas;
            }
            Err(_) => {
                warn!("replica source invocation timed out after {REPLICA_READ_TIMEOUT:?}");
                return self.min_replicas;
            }
        };

        if !output.status.success() {
            warn!(
                "replica source invocation exited with {:?}",
                output.status.code()
            );
            return self.min_replicas;
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let count = count_distinct_names(&stdout);

        u32::try_from(count).unwrap_or_else(|_| {
            warn!("replica count {count} exceeds u32 range, reporting min_replicas");
            self.min_replicas
        })
    }
}

/// Count distinct, non-blank container name lines.
fn count_distinct_names(stdout: &str) -> usize {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<std::collections::HashSet<_>>()
        .len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_distinct_non_blank_names() {
        let stdout = "proj_webapp_1\nproj_webapp_2\nproj_webapp_3\n";
        assert_eq!(count_distinct_names(stdout), 3);
    }

    #[test]
    fn ignores_blank_lines_and_duplicates() {
        let stdout = "proj_webapp_1\n\nproj_webapp_1\n\n";
        assert_eq!(count_distinct_names(stdout), 1);
    }

    #[test]
    fn empty_output_counts_as_zero() {
        assert_eq!(count_distinct_names(""), 0);
    }

    #[test]
    fn conservative_default_is_wired_to_policy_min() {
        let source = ReplicaSource::new("absent_project".to_string(), "absent_svc".to_string(), 3);
        assert_eq!(source.min_replicas, 3);
    }
}
