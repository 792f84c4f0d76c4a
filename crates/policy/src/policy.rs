//! The decision policy: logs in, a validated [`Decision`] out.

use chrono::Utc;
use sentinel_config::AppConfig;
use sentinel_core::decision::Decision;
use sentinel_core::error::PolicyError;
use sentinel_core::event::{DomainEvent, EventBus};
use sentinel_core::provider::{Provider, ProviderRequest};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::examples::{ExampleSet, ExampleStore};
use crate::parse::parse_decision;
use crate::signature::{ROOT_CAUSE_ANALYSIS, Signature};

/// Sampling settings for policy calls.
#[derive(Debug, Clone)]
pub struct PolicySettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub json_mode: bool,
}

impl PolicySettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.policy_model().to_string(),
            temperature: config.policy.temperature,
            max_tokens: Some(config.policy.max_tokens),
            json_mode: config.policy.json_mode,
        }
    }
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// A decision together with whether it came from the model as-is.
#[derive(Debug, Clone)]
pub enum PolicyOutcome {
    Compliant(Decision),
    /// The model's reply broke the output contract; `decision` is the
    /// fail-safe substitute.
    FailSafe {
        decision: Decision,
        violation: PolicyError,
    },
}

impl PolicyOutcome {
    pub fn decision(&self) -> &Decision {
        match self {
            Self::Compliant(decision) | Self::FailSafe { decision, .. } => decision,
        }
    }

    pub fn is_compliant(&self) -> bool {
        matches!(self, Self::Compliant(_))
    }

    pub fn into_decision(self) -> Decision {
        match self {
            Self::Compliant(decision) | Self::FailSafe { decision, .. } => decision,
        }
    }
}

pub struct DecisionPolicy {
    provider: Arc<dyn Provider>,
    store: Arc<ExampleStore>,
    settings: PolicySettings,
    signature: Signature,
    event_bus: Option<Arc<EventBus>>,
}

impl DecisionPolicy {
    pub fn new(provider: Arc<dyn Provider>, store: Arc<ExampleStore>, settings: PolicySettings) -> Self {
        Self {
            provider,
            store,
            settings,
            signature: ROOT_CAUSE_ANALYSIS,
            event_bus: None,
        }
    }

    /// Publish a `DecisionMade` event for every decision.
    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn store(&self) -> &Arc<ExampleStore> {
        &self.store
    }

    pub fn settings(&self) -> &PolicySettings {
        &self.settings
    }

    /// Decide with the current example set.
    pub async fn decide(&self, workload: &str, logs: &str) -> Result<Decision, PolicyError> {
        let examples = self.store.snapshot();
        self.decide_with(&examples, workload, logs).await
    }

    /// Decide with an explicit example set. Calibration uses this to run
    /// zero-shot regardless of what the store currently serves.
    pub async fn decide_with(
        &self,
        examples: &ExampleSet,
        workload: &str,
        logs: &str,
    ) -> Result<Decision, PolicyError> {
        let mut request = ProviderRequest::new(
            &self.settings.model,
            self.signature.build_messages(examples, workload, logs),
        );
        request.temperature = self.settings.temperature;
        request.max_tokens = self.settings.max_tokens;
        request.json_mode = self.settings.json_mode;

        debug!(
            workload,
            demonstrations = examples.len(),
            model = %self.settings.model,
            "Consulting decision policy"
        );

        let response = self.provider.complete(request).await.map_err(|e| {
            warn!(workload, error = %e, "Policy call failed");
            PolicyError::PolicyCall(e)
        })?;

        match parse_decision(&response.message.content) {
            Ok(decision) => {
                info!(
                    workload,
                    root_cause = %decision.root_cause,
                    severity = %decision.severity,
                    action = %decision.suggested_action,
                    "Decision made"
                );
                self.publish(workload, &decision, true);
                Ok(decision)
            }
            Err(violation) => {
                warn!(workload, %violation, "Policy reply rejected");
                Err(violation)
            }
        }
    }

    /// Like [`decide`](Self::decide), but a compliance violation becomes the
    /// fail-safe decision instead of an error. Model call failures still
    /// propagate.
    pub async fn assess(&self, workload: &str, logs: &str) -> Result<PolicyOutcome, PolicyError> {
        match self.decide(workload, logs).await {
            Ok(decision) => Ok(PolicyOutcome::Compliant(decision)),
            Err(violation) if violation.is_compliance_violation() => {
                let decision = Decision::fail_safe(&violation);
                self.publish(workload, &decision, false);
                Ok(PolicyOutcome::FailSafe { decision, violation })
            }
            Err(e) => Err(e),
        }
    }

    /// Publish `ExampleSetReplaced` after the store has been swapped.
    pub fn announce_example_set(&self, demonstrations: usize) {
        if let Some(bus) = &self.event_bus {
            bus.publish(DomainEvent::ExampleSetReplaced {
                demonstrations,
                timestamp: Utc::now(),
            });
        }
    }

    fn publish(&self, workload: &str, decision: &Decision, compliant: bool) {
        if let Some(bus) = &self.event_bus {
            bus.publish(DomainEvent::DecisionMade {
                workload: workload.to_string(),
                severity: decision.severity,
                action: decision.suggested_action,
                compliant,
                timestamp: Utc::now(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::examples::Demonstration;
    use crate::test_helpers::{RuleProvider, ScriptedProvider, decision_json};
    use sentinel_core::decision::{Action, Severity};
    use sentinel_core::error::ProviderError;

    fn policy_with(provider: Arc<dyn Provider>) -> DecisionPolicy {
        DecisionPolicy::new(
            provider,
            Arc::new(ExampleStore::in_memory(ExampleSet::empty())),
            PolicySettings::default(),
        )
    }

    #[tokio::test]
    async fn remote_dependency_failure_is_not_restarted() {
        let policy = policy_with(Arc::new(RuleProvider));
        let decision = policy
            .decide("chaos-monkey", "CRITICAL: Database Connection Refused to 192.168.1.50:5432")
            .await
            .unwrap();
        assert!(matches!(
            decision.suggested_action,
            Action::Escalate | Action::Ignore | Action::None
        ));
    }

    #[tokio::test]
    async fn info_only_logs_are_low_and_left_alone() {
        let policy = policy_with(Arc::new(RuleProvider));
        let decision = policy
            .decide("frontend-ui", "INFO: Rendered page in 20ms. INFO: Cache hit.")
            .await
            .unwrap();
        assert_eq!(decision.severity, Severity::Low);
        assert!(!matches!(
            decision.suggested_action,
            Action::RestartService | Action::Escalate
        ));
    }

    #[tokio::test]
    async fn out_of_memory_is_restarted() {
        let policy = policy_with(Arc::new(RuleProvider));
        let decision = policy
            .decide(
                "worker-node",
                "Error: Java heap space. java.lang.OutOfMemoryError. Terminating process.",
            )
            .await
            .unwrap();
        assert_eq!(decision.suggested_action, Action::RestartService);
        assert!(decision.severity >= Severity::High);
    }

    #[tokio::test]
    async fn request_carries_policy_settings() {
        let provider = Arc::new(ScriptedProvider::texts(&[decision_json("r", "c", "LOW", "none").as_str()]));
        let mut settings = PolicySettings::default();
        settings.json_mode = true;
        settings.temperature = 0.0;
        let policy = DecisionPolicy::new(
            provider.clone(),
            Arc::new(ExampleStore::in_memory(ExampleSet::empty())),
            settings,
        );

        policy.decide("web", "INFO").await.unwrap();
        let request = provider.last_request();
        assert!(request.json_mode);
        assert_eq!(request.temperature, 0.0);
        assert!(request.tools.is_empty());
    }

    #[tokio::test]
    async fn current_demonstrations_are_sent() {
        let provider = Arc::new(ScriptedProvider::texts(&[decision_json("r", "c", "LOW", "none").as_str()]));
        let store = Arc::new(ExampleStore::in_memory(ExampleSet::empty()));
        let policy = DecisionPolicy::new(provider.clone(), store.clone(), PolicySettings::default());

        let mut set = ExampleSet::empty();
        set.demonstrations.push(Demonstration {
            workload: "worker-node".into(),
            logs: "java.lang.OutOfMemoryError".into(),
            decision: Decision {
                reasoning: "OOM".into(),
                root_cause: "OOMKilled".into(),
                severity: Severity::High,
                suggested_action: Action::RestartService,
            },
        });
        store.replace(set);

        policy.decide("web", "INFO").await.unwrap();
        assert_eq!(provider.last_request().messages.len(), 4);
    }

    #[tokio::test]
    async fn provider_failure_is_policy_call_error() {
        let provider = Arc::new(ScriptedProvider::new(vec![Err(ProviderError::Timeout(
            "deadline".into(),
        ))]));
        let policy = policy_with(provider.clone());
        let err = policy.assess("web", "ERROR").await.unwrap_err();
        assert!(matches!(err, PolicyError::PolicyCall(ProviderError::Timeout(_))));
        assert_eq!(provider.request_count(), 1);
    }

    #[tokio::test]
    async fn violation_yields_fail_safe_ignore() {
        let bus = Arc::new(EventBus::new(8));
        let mut rx = bus.subscribe();
        let policy = policy_with(Arc::new(ScriptedProvider::texts(&[
            decision_json("r", "c", "HIGH", "reboot_host").as_str(),
        ])))
        .with_event_bus(bus);

        let outcome = policy.assess("web", "ERROR").await.unwrap();
        assert!(!outcome.is_compliant());
        assert_eq!(outcome.decision().suggested_action, Action::Ignore);

        let event = rx.recv().await.unwrap();
        assert!(matches!(
            event.as_ref(),
            DomainEvent::DecisionMade { compliant: false, action: Action::Ignore, .. }
        ));
    }
}
