//! Docker runtime driven through the `docker` CLI.
//!
//! Each operation spawns one `docker` process and classifies its stderr.
//! The command may carry leading arguments (`"docker --context prod"`,
//! `"sudo docker"`); they are split on whitespace.

use async_trait::async_trait;
use sentinel_core::error::OpsError;
use std::process::Output;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::runtime::{ContainerRuntime, LogBundle, LogQuery, WorkloadSummary};

/// Field separator for `docker ps --format`.
const PS_FORMAT: &str = "{{.Names}}\t{{.ID}}\t{{.State}}";

pub struct DockerCli {
    program: String,
    base_args: Vec<String>,
}

impl DockerCli {
    pub fn new(command: &str) -> Self {
        let mut parts = command.split_whitespace().map(String::from);
        let program = parts.next().unwrap_or_else(|| "docker".into());
        Self {
            program,
            base_args: parts.collect(),
        }
    }

    async fn run(&self, args: &[&str]) -> Result<Output, OpsError> {
        debug!(program = %self.program, ?args, "Running container runtime command");

        Command::new(&self.program)
            .args(&self.base_args)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                warn!(program = %self.program, error = %e, "Could not start container runtime");
                OpsError::Unavailable(e.to_string())
            })
    }

    /// Run a command that addresses one workload, mapping failures.
    async fn run_for(&self, workload: &str, args: &[&str]) -> Result<Output, OpsError> {
        if workload.starts_with('-') {
            warn!(workload, "Refusing workload name that looks like a flag");
            return Err(OpsError::NotFound(workload.to_string()));
        }
        let output = self.run(args).await?;
        if output.status.success() {
            Ok(output)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(classify_failure(workload, &stderr))
        }
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new("docker")
    }
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    fn name(&self) -> &str {
        "docker"
    }

    async fn list_workloads(&self) -> Result<Vec<WorkloadSummary>, OpsError> {
        let output = self.run_for("", &["ps", "--format", PS_FORMAT]).await?;
        Ok(parse_ps(&String::from_utf8_lossy(&output.stdout)))
    }

    async fn fetch_logs(&self, query: &LogQuery) -> Result<LogBundle, OpsError> {
        let tail = query.tail.to_string();
        let output = self
            .run_for(&query.workload, &["logs", "--tail", &tail, "--", &query.workload])
            .await?;

        // `docker logs` replays the container's stderr on ours.
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(LogBundle {
            workload: query.workload.clone(),
            text,
        })
    }

    async fn restart(&self, workload: &str) -> Result<(), OpsError> {
        self.run_for(workload, &["restart", "--", workload]).await?;
        Ok(())
    }
}

/// Parse `docker ps` output in [`PS_FORMAT`].
fn parse_ps(stdout: &str) -> Vec<WorkloadSummary> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let mut fields = line.split('\t');
            let name = fields.next()?.trim();
            let id = fields.next()?.trim();
            let status = fields.next().unwrap_or("unknown").trim();
            Some(WorkloadSummary {
                name: name.to_string(),
                short_id: id.chars().take(10).collect(),
                status: status.to_string(),
            })
        })
        .collect()
}

/// Map `docker` stderr onto the runtime error taxonomy.
fn classify_failure(workload: &str, stderr: &str) -> OpsError {
    let lowered = stderr.to_lowercase();
    if lowered.contains("no such container") {
        OpsError::NotFound(workload.to_string())
    } else if lowered.contains("cannot connect to the docker daemon")
        || lowered.contains("error during connect")
        || lowered.contains("docker daemon is not running")
        || lowered.contains("permission denied while trying to connect")
    {
        OpsError::Unavailable(stderr.trim().to_string())
    } else {
        OpsError::CommandFailed(stderr.trim().to_string())
    }
}
