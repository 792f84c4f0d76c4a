//! Gateway tools handed to the orchestrator.
//!
//! Runtime failures never leave these tools as errors. They come back as
//! unsuccessful results whose text describes what went wrong, so the model
//! can report it. Only malformed arguments produce a `ToolError`.

use async_trait::async_trait;
use sentinel_core::error::{OpsError, ToolError};
use sentinel_core::tool::{Tool, ToolResult};
use std::sync::Arc;
use tracing::{info, warn};

use crate::runtime::{ContainerRuntime, LogQuery};

const UNAVAILABLE: &str = "Error: Docker unavailable.";

fn container_name(arguments: &serde_json::Value) -> Result<&str, ToolError> {
    arguments["container_name"]
        .as_str()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ToolError::InvalidArguments("Missing 'container_name' argument".into()))
}

/// Summary of running workloads.
pub struct ListActiveContainersTool {
    runtime: Arc<dyn ContainerRuntime>,
}

impl ListActiveContainersTool {
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self { runtime }
    }
}

#[async_trait]
impl Tool for ListActiveContainersTool {
    fn name(&self) -> &str {
        "list_active_containers"
    }

    fn description(&self) -> &str {
        "Returns a summary of the running containers: name, short ID and status. Call this first to see what exists."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        match self.runtime.list_workloads().await {
            Ok(workloads) if workloads.is_empty() => Ok(ToolResult::ok("No active containers found.")),
            Ok(workloads) => {
                let mut report = String::from("ACTIVE CONTAINERS:\n");
                for w in &workloads {
                    report.push_str(&format!("- {} (ID: {}): {}\n", w.name, w.short_id, w.status));
                }
                let data = serde_json::to_value(&workloads).unwrap_or_default();
                Ok(ToolResult::ok(report).with_data(data))
            }
            Err(OpsError::Unavailable(reason)) => {
                warn!(%reason, "Runtime unavailable while listing");
                Ok(ToolResult::failed(UNAVAILABLE))
            }
            Err(e) => Ok(ToolResult::failed(format!("Docker Error: {e}"))),
        }
    }
}

/// The last N log lines of one container.
pub struct GetContainerLogsTool {
    runtime: Arc<dyn ContainerRuntime>,
    default_tail: usize,
}

impl GetContainerLogsTool {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, default_tail: usize) -> Self {
        Self {
            runtime,
            default_tail,
        }
    }
}

#[async_trait]
impl Tool for GetContainerLogsTool {
    fn name(&self) -> &str {
        "get_container_logs"
    }

    fn description(&self) -> &str {
        "Fetch the last N lines of logs from a container. Use this to diagnose problems."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "container_name": {
                    "type": "string",
                    "description": "Name or ID of the container"
                },
                "tail": {
                    "type": "integer",
                    "description": "Number of lines to read",
                    "default": self.default_tail
                }
            },
            "required": ["container_name"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let name = container_name(&arguments)?;
        let tail = match &arguments["tail"] {
            serde_json::Value::Null => self.default_tail,
            value => value
                .as_u64()
                .filter(|n| *n > 0)
                .map(|n| n as usize)
                .ok_or_else(|| ToolError::InvalidArguments("'tail' must be a positive integer".into()))?,
        };

        let query = LogQuery::new(name).with_tail(tail);
        match self.runtime.fetch_logs(&query).await {
            Ok(bundle) if bundle.is_empty() => Ok(ToolResult::ok("Logs are empty.")),
            Ok(bundle) => Ok(ToolResult::ok(bundle.text)),
            Err(OpsError::NotFound(_)) => Ok(ToolResult::failed(format!(
                "Error: Container '{name}' not found."
            ))),
            Err(OpsError::Unavailable(_)) => Ok(ToolResult::failed(UNAVAILABLE)),
            Err(e) => Ok(ToolResult::failed(format!("System Error: {e}"))),
        }
    }
}

/// Restart a crashed or stuck container.
pub struct RestartServiceTool {
    runtime: Arc<dyn ContainerRuntime>,
}

impl RestartServiceTool {
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self { runtime }
    }
}

#[async_trait]
impl Tool for RestartServiceTool {
    fn name(&self) -> &str {
        "restart_service"
    }

    fn description(&self) -> &str {
        "Restart a container that has crashed or is stuck. Only use when the expert analysis recommends restart_service."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "container_name": {
                    "type": "string",
                    "description": "Name or ID of the container to restart"
                }
            },
            "required": ["container_name"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let name = container_name(&arguments)?;
        match self.runtime.restart(name).await {
            Ok(()) => {
                info!(workload = %name, "Service restarted");
                Ok(ToolResult::ok(format!("Service '{name}' restarted successfully.")))
            }
            Err(OpsError::Unavailable(_)) => Ok(ToolResult::failed(UNAVAILABLE)),
            Err(e) => {
                warn!(workload = %name, error = %e, "Restart failed");
                Ok(ToolResult::failed(format!("Restart Failed: {e}")))
            }
        }
    }
}
