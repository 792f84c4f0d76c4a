//! In-memory runtime with fixed workloads.
//!
//! Backs the `--static` offline mode and the test suites. Restarts are
//! recorded rather than performed.

use async_trait::async_trait;
use sentinel_core::error::OpsError;
use std::sync::Mutex;

use crate::runtime::{ContainerRuntime, LogBundle, LogQuery, WorkloadSummary};

struct StaticWorkload {
    summary: WorkloadSummary,
    logs: String,
}

pub struct StaticRuntime {
    workloads: Vec<StaticWorkload>,
    restarts: Mutex<Vec<String>>,
    available: bool,
}

impl StaticRuntime {
    pub fn new() -> Self {
        Self {
            workloads: Vec::new(),
            restarts: Mutex::new(Vec::new()),
            available: true,
        }
    }

    /// A runtime whose every call fails as if the daemon were down.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Three workloads covering the usual incident shapes.
    pub fn demo() -> Self {
        Self::new()
            .with_workload(
                "chaos-monkey",
                "CRITICAL: Database Connection Refused to 192.168.1.50:5432\n\
                 ERROR: Retrying connection (attempt 3/3)\n",
            )
            .with_workload(
                "frontend-ui",
                "INFO: Rendered page in 20ms.\nINFO: Cache hit.\n",
            )
            .with_workload(
                "worker-node",
                "Error: Java heap space.\njava.lang.OutOfMemoryError\nTerminating process.\n",
            )
    }

    pub fn with_workload(mut self, name: &str, logs: &str) -> Self {
        let short_id = format!("{:0>10x}", self.workloads.len() + 1);
        self.workloads.push(StaticWorkload {
            summary: WorkloadSummary {
                name: name.to_string(),
                short_id,
                status: "running".into(),
            },
            logs: logs.to_string(),
        });
        self
    }

    /// Names passed to successful `restart` calls, in order.
    pub fn restarts(&self) -> Vec<String> {
        self.restarts
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn find(&self, name: &str) -> Result<&StaticWorkload, OpsError> {
        if !self.available {
            return Err(OpsError::Unavailable("static runtime offline".into()));
        }
        self.workloads
            .iter()
            .find(|w| w.summary.name == name || w.summary.short_id == name)
            .ok_or_else(|| OpsError::NotFound(name.to_string()))
    }
}

impl Default for StaticRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContainerRuntime for StaticRuntime {
    fn name(&self) -> &str {
        "static"
    }

    async fn list_workloads(&self) -> Result<Vec<WorkloadSummary>, OpsError> {
        if !self.available {
            return Err(OpsError::Unavailable("static runtime offline".into()));
        }
        Ok(self.workloads.iter().map(|w| w.summary.clone()).collect())
    }

    async fn fetch_logs(&self, query: &LogQuery) -> Result<LogBundle, OpsError> {
        let workload = self.find(&query.workload)?;
        let lines: Vec<&str> = workload.logs.lines().collect();
        let start = lines.len().saturating_sub(query.tail);
        let mut text = lines[start..].join("\n");
        if !text.is_empty() {
            text.push('\n');
        }
        Ok(LogBundle {
            workload: workload.summary.name.clone(),
            text,
        })
    }

    async fn restart(&self, workload: &str) -> Result<(), OpsError> {
        let name = self.find(workload)?.summary.name.clone();
        tracing::info!(workload = %name, "Recording restart");
        if let Ok(mut restarts) = self.restarts.lock() {
            restarts.push(name);
        }
        Ok(())
    }
}
