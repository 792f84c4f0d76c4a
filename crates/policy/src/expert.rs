//! The decision policy exposed to the orchestrator as a tool.

use async_trait::async_trait;
use sentinel_core::error::ToolError;
use sentinel_core::tool::{Tool, ToolResult};
use std::sync::Arc;

use crate::policy::{DecisionPolicy, PolicyOutcome};

pub const TOOL_NAME: &str = "consult_sre_expert";

pub struct ConsultExpertTool {
    policy: Arc<DecisionPolicy>,
}

impl ConsultExpertTool {
    pub fn new(policy: Arc<DecisionPolicy>) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl Tool for ConsultExpertTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Analyze container logs with the trained SRE expert. Returns the analysis, root cause, \
         severity and the recommended action (restart_service, escalate, ignore or none)."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "container_name": {
                    "type": "string",
                    "description": "Name of the service being analyzed"
                },
                "logs": {
                    "type": "string",
                    "description": "Raw log text captured from the container"
                }
            },
            "required": ["container_name", "logs"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let container_name = arguments["container_name"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'container_name' argument".into()))?;
        let logs = arguments["logs"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'logs' argument".into()))?;

        let outcome = self
            .policy
            .assess(container_name, logs)
            .await
            .map_err(|source| ToolError::Fatal {
                tool_name: TOOL_NAME.into(),
                source,
            })?;

        let decision = outcome.decision();
        let mut report = serde_json::json!({
            "analysis": decision.reasoning,
            "root_cause": decision.root_cause,
            "severity": decision.severity.as_str(),
            "recommended_action": decision.suggested_action.as_str(),
        });
        if let PolicyOutcome::FailSafe { violation, .. } = &outcome {
            report["compliance_violation"] = serde_json::json!(violation.to_string());
        }

        Ok(ToolResult::ok(report.to_string()).with_data(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::examples::{ExampleSet, ExampleStore};
    use crate::policy::PolicySettings;
    use crate::test_helpers::{RuleProvider, ScriptedProvider};
    use sentinel_core::Provider;
    use sentinel_core::error::{PolicyError, ProviderError};

    fn tool(provider: Arc<dyn Provider>) -> ConsultExpertTool {
        let store = Arc::new(ExampleStore::in_memory(ExampleSet::empty()));
        ConsultExpertTool::new(Arc::new(DecisionPolicy::new(
            provider,
            store,
            PolicySettings::default(),
        )))
    }

    #[tokio::test]
    async fn reports_original_field_names() {
        let result = tool(Arc::new(RuleProvider))
            .execute(serde_json::json!({
                "container_name": "worker-node",
                "logs": "java.lang.OutOfMemoryError"
            }))
            .await
            .unwrap();
        let data = result.data.unwrap();
        assert_eq!(data["recommended_action"], "restart_service");
        assert_eq!(data["severity"], "HIGH");
        assert_eq!(data["root_cause"], "OOMKilled");
        assert!(data["analysis"].as_str().unwrap().contains("Heap"));
    }

    #[tokio::test]
    async fn violation_is_fail_safe_ignore() {
        let result = tool(Arc::new(RuleProvider))
            .execute(serde_json::json!({
                "container_name": "web",
                "logs": "garbled output"
            }))
            .await
            .unwrap();
        let data = result.data.unwrap();
        assert_eq!(data["recommended_action"], "ignore");
        assert!(data["compliance_violation"].as_str().unwrap().contains("output"));
    }

    #[tokio::test]
    async fn model_failure_is_fatal() {
        let provider = Arc::new(ScriptedProvider::new(vec![Err(ProviderError::Network(
            "reset".into(),
        ))]));
        let err = tool(provider)
            .execute(serde_json::json!({"container_name": "web", "logs": "ERROR"}))
            .await
            .unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(
            err,
            ToolError::Fatal { source: PolicyError::PolicyCall(_), .. }
        ));
    }

    #[tokio::test]
    async fn missing_logs_argument() {
        let err = tool(Arc::new(RuleProvider))
            .execute(serde_json::json!({"container_name": "web"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
