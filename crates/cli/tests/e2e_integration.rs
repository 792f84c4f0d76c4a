//! End-to-end tests for Sentinel.
//!
//! These exercise the full pipeline from an operator message to the final
//! response: orchestrator, gateway tools over the static runtime, the
//! decision policy, calibration and the HTTP façade.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use sentinel_agent::AbortSignal;
use sentinel_config::AppConfig;
use sentinel_core::decision::{Action, Severity};
use sentinel_core::error::ProviderError;
use sentinel_core::event::DomainEvent;
use sentinel_core::message::{Message, MessageToolCall, Role};
use sentinel_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use sentinel_gateway::{AppServices, build_router};
use sentinel_ops::StaticRuntime;
use sentinel_policy::{Calibrator, ExampleStore, default_trainset};
use tower::ServiceExt;

// ── Mock Provider ────────────────────────────────────────────────────────

/// Serves orchestrator calls (requests carrying tools) and policy calls
/// (requests without tools) from two separate scripts.
struct ScriptedModel {
    agent: Mutex<VecDeque<ProviderResponse>>,
    policy: Mutex<VecDeque<ProviderResponse>>,
    policy_requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedModel {
    fn new(agent: Vec<ProviderResponse>, policy: Vec<ProviderResponse>) -> Self {
        Self {
            agent: Mutex::new(agent.into()),
            policy: Mutex::new(policy.into()),
            policy_requests: Mutex::new(Vec::new()),
        }
    }

    fn last_policy_request(&self) -> ProviderRequest {
        self.policy_requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedModel {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let queue = if request.tools.is_empty() {
            self.policy_requests.lock().unwrap().push(request);
            &self.policy
        } else {
            &self.agent
        };
        let next = queue.lock().unwrap().pop_front();
        next.ok_or_else(|| ProviderError::Network("script exhausted".into()))
    }
}

fn text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock".into(),
    }
}

fn tool_response(name: &str, args: serde_json::Value) -> ProviderResponse {
    let mut message = Message::assistant("");
    message.tool_calls = vec![MessageToolCall {
        id: format!("call_{name}"),
        name: name.to_string(),
        arguments: args.to_string(),
    }];
    ProviderResponse {
        message,
        usage: None,
        model: "mock".into(),
    }
}

fn decision(severity: &str, action: &str) -> ProviderResponse {
    text_response(
        &serde_json::json!({
            "reasoning": "Scripted analysis of the logs.",
            "root_cause": "Scripted",
            "severity": severity,
            "suggested_action": action,
        })
        .to_string(),
    )
}

fn services(model: Arc<ScriptedModel>, runtime: Arc<StaticRuntime>, store: ExampleStore) -> AppServices {
    AppServices::assemble(AppConfig::default(), model, runtime, Arc::new(store))
}

fn in_memory() -> ExampleStore {
    ExampleStore::in_memory(sentinel_policy::ExampleSet::empty())
}

// ── E2E: Incident flows ─────────────────────────────────────────────────

#[tokio::test]
async fn e2e_out_of_memory_is_restarted() {
    let model = Arc::new(ScriptedModel::new(
        vec![
            tool_response(
                "get_container_logs",
                serde_json::json!({"container_name": "worker-node"}),
            ),
            tool_response(
                "consult_sre_expert",
                serde_json::json!({
                    "container_name": "worker-node",
                    "logs": "java.lang.OutOfMemoryError: Java heap space"
                }),
            ),
            tool_response(
                "restart_service",
                serde_json::json!({"container_name": "worker-node"}),
            ),
            text_response("worker-node was out of memory and has been restarted."),
        ],
        vec![decision("HIGH", "restart_service")],
    ));
    let runtime = Arc::new(StaticRuntime::demo());
    let services = services(model, runtime.clone(), in_memory());

    let report = services
        .orchestrator
        .handle(
            &services.sessions,
            "admin_user",
            "live-session-01",
            "worker-node keeps crashing, fix it",
            &AbortSignal::never(),
        )
        .await
        .expect("turn should succeed");

    assert_eq!(report.tool_calls.len(), 3);
    assert!(report.tool_calls.iter().all(|t| t.success));
    assert_eq!(runtime.restarts(), vec!["worker-node".to_string()]);
    assert!(report.response().contains("restarted"));
}

#[tokio::test]
async fn e2e_database_outage_is_escalated() {
    let model = Arc::new(ScriptedModel::new(
        vec![
            tool_response("list_active_containers", serde_json::json!({})),
            tool_response(
                "get_container_logs",
                serde_json::json!({"container_name": "chaos-monkey", "tail": 20}),
            ),
            tool_response(
                "consult_sre_expert",
                serde_json::json!({
                    "container_name": "chaos-monkey",
                    "logs": "CRITICAL: Database Connection Refused to 192.168.1.50:5432"
                }),
            ),
            text_response("chaos-monkey cannot reach its database; escalating to on-call."),
        ],
        vec![decision("CRITICAL", "escalate")],
    ));
    let runtime = Arc::new(StaticRuntime::demo());
    let services = services(model.clone(), runtime.clone(), in_memory());
    let mut events = services.event_bus.subscribe();

    let report = services
        .orchestrator
        .handle(
            &services.sessions,
            "admin_user",
            "live-session-01",
            "Check the cluster",
            &AbortSignal::never(),
        )
        .await
        .unwrap();

    assert!(runtime.restarts().is_empty());
    assert!(report.response().contains("escalating"));

    let prompt = model.last_policy_request();
    assert_eq!(prompt.messages[0].role, Role::System);
    assert!(prompt.messages.last().unwrap().content.contains("192.168.1.50:5432"));

    let mut decisions = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let DomainEvent::DecisionMade { action, severity, .. } = event.as_ref() {
            decisions.push((*severity, *action));
        }
    }
    assert_eq!(decisions, vec![(Severity::Critical, Action::Escalate)]);
}

#[tokio::test]
async fn e2e_unknown_container_is_reported_not_raised() {
    let model = Arc::new(ScriptedModel::new(
        vec![
            tool_response(
                "get_container_logs",
                serde_json::json!({"container_name": "ghost"}),
            ),
            text_response("There is no container called ghost."),
        ],
        vec![],
    ));
    let services = services(model, Arc::new(StaticRuntime::demo()), in_memory());

    let report = services
        .orchestrator
        .handle(&services.sessions, "u", "s", "Logs for ghost?", &AbortSignal::never())
        .await
        .unwrap();

    assert_eq!(report.tool_calls.len(), 1);
    let session = services.sessions.get("u", "s").unwrap();
    let session = session.lock().await;
    let tool_msg = session
        .conversation
        .messages
        .iter()
        .find(|m| m.role == Role::Tool)
        .unwrap();
    assert_eq!(tool_msg.content, "Error: Container 'ghost' not found.");
}

#[tokio::test]
async fn e2e_policy_outage_fails_the_turn() {
    let model = Arc::new(ScriptedModel::new(
        vec![tool_response(
            "consult_sre_expert",
            serde_json::json!({"container_name": "web", "logs": "ERROR"}),
        )],
        vec![],
    ));
    let services = services(model, Arc::new(StaticRuntime::demo()), in_memory());

    let err = services
        .orchestrator
        .handle(&services.sessions, "u", "s", "Check web", &AbortSignal::never())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("script exhausted"));
    let session = services.sessions.get("u", "s").unwrap();
    assert!(session.lock().await.conversation.messages.is_empty());
}

// ── E2E: Calibration feeds the live policy ───────────────────────────────

#[tokio::test]
async fn e2e_calibration_persists_and_steers_policy() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("brain_compiled.json");

    // Built-in set: auth failure, info-only, OOM. The second prediction misses.
    let model = Arc::new(ScriptedModel::new(
        vec![],
        vec![
            decision("CRITICAL", "escalate"),
            decision("MEDIUM", "escalate"),
            decision("HIGH", "restart_service"),
        ],
    ));
    let calibrating = services(model, Arc::new(StaticRuntime::demo()), ExampleStore::open(&path));

    let report = Calibrator::new(&calibrating.policy, 2)
        .run(&default_trainset())
        .await
        .unwrap();
    assert_eq!(report.attempted, 3);
    assert_eq!(report.passed, 2);
    assert_eq!(report.kept, 2);
    assert_eq!(report.persisted_to.as_deref(), Some(path.as_path()));

    // A fresh process picks the saved set up and renders it as few-shot turns.
    let model = Arc::new(ScriptedModel::new(vec![], vec![decision("LOW", "none")]));
    let serving = services(model.clone(), Arc::new(StaticRuntime::demo()), ExampleStore::open(&path));
    assert_eq!(serving.store.summary().mode, "few-shot");

    serving
        .policy
        .decide("frontend-ui", "INFO: Rendered page in 20ms.")
        .await
        .unwrap();
    // System + two demonstrations (user/assistant each) + the case
    assert_eq!(model.last_policy_request().messages.len(), 6);
}

// ── E2E: HTTP façade ─────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_gateway_analyze_and_sessions() {
    let model = Arc::new(ScriptedModel::new(
        vec![
            tool_response("list_active_containers", serde_json::json!({})),
            text_response("Three containers are running."),
        ],
        vec![],
    ));
    let services = Arc::new(services(model, Arc::new(StaticRuntime::demo()), in_memory()));

    let req = Request::builder()
        .method("POST")
        .uri("/analyze")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::json!({"query": "What is running?"}).to_string(),
        ))
        .unwrap();
    let response = build_router(services.clone()).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "success");
    assert_eq!(json["session_id"], "session_001");
    assert_eq!(json["response"], "Three containers are running.");

    let req = Request::builder().uri("/sessions").body(Body::empty()).unwrap();
    let response = build_router(services).oneshot(req).await.unwrap();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["sessions"][0]["session_id"], "session_001");
}

#[tokio::test]
async fn e2e_config_defaults_and_validation() {
    let config = AppConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.gateway.port, 8000);
    assert_eq!(config.agent.repl_user_id, "admin_user");
    assert_eq!(config.agent.repl_session_id, "live-session-01");
    assert_eq!(config.policy.max_bootstrapped_demos, 2);

    let rendered = AppConfig::default_toml();
    assert!(rendered.contains("[gateway]"));
    assert!(rendered.contains("[policy]"));
}
