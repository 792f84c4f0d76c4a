//! The agent orchestrator for Sentinel.
//!
//! Each turn follows a **Plan → Act → Observe** cycle:
//!
//! 1. **Receive** an operator message for a session
//! 2. **Send** the session history and tool definitions to the model
//! 3. **If tool calls**: run them (gateway or policy), append results, loop
//! 4. **If text only**: the turn ends and its report is returned
//!
//! Turns can be aborted through an [`AbortSignal`]; a policy call failure
//! ends the turn with an error instead of being shown to the model.

pub mod abort;
pub mod error;
pub mod orchestrator;
pub mod session;

#[cfg(test)]
mod test_helpers;

pub use abort::{AbortHandle, AbortSignal, abort_pair};
pub use error::AgentError;
pub use orchestrator::{ITERATION_LIMIT_MESSAGE, Orchestrator, ToolInvocation, TurnReport};
pub use session::{Session, SessionHandle, SessionInfo, SessionKey, SessionStore};

use sentinel_config::OpsConfig;
use sentinel_core::tool::ToolRegistry;
use sentinel_ops::ContainerRuntime;
use sentinel_policy::{ConsultExpertTool, DecisionPolicy};
use std::sync::Arc;

/// The orchestrator's tool set: the gateway tools plus the policy expert.
pub fn build_tool_registry(
    runtime: Arc<dyn ContainerRuntime>,
    policy: Arc<DecisionPolicy>,
    ops: &OpsConfig,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    sentinel_ops::register_ops_tools(&mut registry, runtime, ops);
    registry.register(Box::new(ConsultExpertTool::new(policy)));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_ops::StaticRuntime;
    use sentinel_policy::{ExampleSet, ExampleStore, PolicySettings};
    use test_helpers::SequentialMockProvider;

    fn policy() -> Arc<DecisionPolicy> {
        Arc::new(DecisionPolicy::new(
            Arc::new(SequentialMockProvider::new(vec![])),
            Arc::new(ExampleStore::in_memory(ExampleSet::empty())),
            PolicySettings::default(),
        ))
    }

    #[test]
    fn registry_holds_ops_tools_and_expert() {
        let registry = build_tool_registry(
            Arc::new(StaticRuntime::demo()),
            policy(),
            &OpsConfig::default(),
        );
        assert_eq!(
            registry.names(),
            vec![
                "consult_sre_expert",
                "get_container_logs",
                "list_active_containers",
                "restart_service"
            ]
        );
    }

    #[test]
    fn restart_can_be_withheld() {
        let ops = OpsConfig {
            allow_restart: false,
            ..OpsConfig::default()
        };
        let registry = build_tool_registry(Arc::new(StaticRuntime::demo()), policy(), &ops);
        assert!(registry.get("restart_service").is_none());
        assert_eq!(registry.len(), 3);
    }
}
