//! Log/Action gateway for Sentinel.
//!
//! Everything the orchestrator knows about running workloads comes through
//! the [`ContainerRuntime`] trait: listing, reading logs, restarting. The
//! tools in [`tools`] wrap a runtime and turn every runtime failure into
//! text the model can read, so nothing raised here escapes a tool call.

pub mod docker;
pub mod runtime;
pub mod static_runtime;
pub mod tools;

pub use docker::DockerCli;
pub use runtime::{ContainerRuntime, LogBundle, LogQuery, WorkloadSummary};
pub use static_runtime::StaticRuntime;
pub use tools::{GetContainerLogsTool, ListActiveContainersTool, RestartServiceTool};

use sentinel_config::OpsConfig;
use sentinel_core::tool::ToolRegistry;
use std::sync::Arc;

/// Build the runtime selected by `[ops] runtime`.
pub fn runtime_from_config(config: &OpsConfig) -> Arc<dyn ContainerRuntime> {
    match config.runtime.as_str() {
        "static" => Arc::new(StaticRuntime::demo()),
        _ => Arc::new(DockerCli::new(&config.docker_binary)),
    }
}

/// Register the gateway tools on `registry`.
///
/// `restart_service` is only offered when `allow_restart` is set.
pub fn register_ops_tools(
    registry: &mut ToolRegistry,
    runtime: Arc<dyn ContainerRuntime>,
    config: &OpsConfig,
) {
    registry.register(Box::new(ListActiveContainersTool::new(runtime.clone())));
    registry.register(Box::new(GetContainerLogsTool::new(
        runtime.clone(),
        config.default_tail,
    )));
    if config.allow_restart {
        registry.register(Box::new(RestartServiceTool::new(runtime)));
    } else {
        tracing::info!("Restarts disabled, running the gateway read-only");
    }
}
