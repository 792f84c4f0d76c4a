//! Scripted model backends for policy tests.

use async_trait::async_trait;
use sentinel_core::error::ProviderError;
use sentinel_core::message::Message;
use sentinel_core::provider::{Provider, ProviderRequest, ProviderResponse};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replies with queued texts in order and records every request.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String, ProviderError>>>,
    pub requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn texts(replies: &[&str]) -> Self {
        Self::new(replies.iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> ProviderRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::NotConfigured("script exhausted".into())))?;
        Ok(text_response(&request.model, reply))
    }
}

/// Answers by looking at the logs of the case being decided, like a model
/// that has learned a few simple rules.
pub struct RuleProvider;

#[async_trait]
impl Provider for RuleProvider {
    fn name(&self) -> &str {
        "rules"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let case = request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();

        let reply = if case.contains("OutOfMemoryError") {
            decision_json("Heap exhausted; a restart recovers it.", "OOMKilled", "HIGH", "restart_service")
        } else if case.contains("authentication failed") {
            decision_json("Credentials rejected by the database.", "Auth Failure", "CRITICAL", "escalate")
        } else if case.contains("Connection Refused") {
            decision_json("Remote database refuses connections.", "Database Unreachable", "CRITICAL", "escalate")
        } else if case.contains("garbled") {
            "I am not sure what to do here.".to_string()
        } else if case.contains("unreachable-model") {
            return Err(ProviderError::Network("connection reset".into()));
        } else {
            decision_json("Only INFO lines.", "None", "LOW", "none")
        };

        Ok(text_response(&request.model, reply))
    }
}

pub fn decision_json(reasoning: &str, root_cause: &str, severity: &str, action: &str) -> String {
    serde_json::json!({
        "reasoning": reasoning,
        "root_cause": root_cause,
        "severity": severity,
        "suggested_action": action,
    })
    .to_string()
}

fn text_response(model: &str, text: String) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: None,
        model: model.to_string(),
    }
}
