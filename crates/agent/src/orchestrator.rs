//! The orchestrator turn loop.

use chrono::Utc;
use sentinel_core::error::ToolError;
use sentinel_core::event::{DomainEvent, EventBus};
use sentinel_core::message::{Conversation, Message, Role};
use sentinel_core::provider::{Provider, ProviderRequest};
use sentinel_core::tool::{ToolCall, ToolRegistry};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::abort::AbortSignal;
use crate::error::AgentError;
use crate::session::{Session, SessionStore};

/// Final fragment when a turn runs out of tool iterations.
pub const ITERATION_LIMIT_MESSAGE: &str =
    "I've reached the maximum number of tool call iterations. Please provide further guidance.";

/// One tool call made during a turn.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInvocation {
    pub name: String,
    pub success: bool,
}

/// Everything a turn produced.
#[derive(Debug, Clone, Serialize)]
pub struct TurnReport {
    pub session_id: String,
    /// Assistant text in the order it was emitted, including text that
    /// accompanied tool calls.
    pub fragments: Vec<String>,
    pub tool_calls: Vec<ToolInvocation>,
    pub iterations: u32,
    pub hit_iteration_limit: bool,
}

impl TurnReport {
    /// The fragments as one response.
    pub fn response(&self) -> String {
        self.fragments.join("\n")
    }
}

/// Drives model calls and tool execution for one session at a time.
pub struct Orchestrator {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    tools: Arc<ToolRegistry>,
    instruction: String,
    max_iterations: u32,
    event_bus: Arc<EventBus>,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        temperature: f32,
        tools: Arc<ToolRegistry>,
        instruction: impl Into<String>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
            max_tokens: None,
            tools,
            instruction: instruction.into(),
            max_iterations: 25,
            event_bus,
        }
    }

    /// Set the maximum number of tool call iterations.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    /// Set the default max tokens per LLM response.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    /// Create-or-reuse the session and run one turn in it, waiting for any
    /// turn already running there.
    pub async fn handle(
        &self,
        sessions: &SessionStore,
        user_id: &str,
        session_id: &str,
        message: &str,
        abort: &AbortSignal,
    ) -> Result<TurnReport, AgentError> {
        let handle = sessions.create(user_id, session_id);
        let mut session = guarded(abort, async { Ok(handle.lock().await) }).await?;
        self.run_turn(&mut session, message, abort).await
    }

    /// Run one turn: the message goes in, tools run until the model answers
    /// with text only.
    ///
    /// On an error before any tool ran, the session's history is restored
    /// to what it was before the turn. Once a tool has run, the finished
    /// exchange is kept and the turn is closed with an error note so the
    /// next turn sees what already happened.
    pub async fn run_turn(
        &self,
        session: &mut Session,
        message: &str,
        abort: &AbortSignal,
    ) -> Result<TurnReport, AgentError> {
        let checkpoint = session.conversation.messages.len();
        let result = self.turn(session, message, abort).await;

        if let Err(e) = &result {
            let kept = close_failed_turn(&mut session.conversation, checkpoint, e);
            debug!(session_id = %session.id(), kept, "Closed failed turn");
            if e.is_aborted() {
                info!(session_id = %session.id(), "Turn aborted");
            } else {
                warn!(session_id = %session.id(), error = %e, "Turn failed");
                self.event_bus.publish(DomainEvent::ErrorOccurred {
                    context: format!("turn in session {}", session.id()),
                    error_message: e.to_string(),
                    timestamp: Utc::now(),
                });
            }
        }
        result
    }

    async fn turn(
        &self,
        session: &mut Session,
        message: &str,
        abort: &AbortSignal,
    ) -> Result<TurnReport, AgentError> {
        info!(
            session_id = %session.id(),
            user_id = %session.user_id(),
            history = session.conversation.messages.len(),
            "Processing turn"
        );
        self.event_bus.publish(DomainEvent::TurnStarted {
            session_id: session.id().to_string(),
            user_id: session.user_id().to_string(),
            timestamp: Utc::now(),
        });

        let conversation = &mut session.conversation;
        if conversation.messages.first().map(|m| &m.role) != Some(&Role::System) {
            conversation.messages.insert(0, Message::system(&self.instruction));
        }
        conversation.push(Message::user(message));

        let mut report = TurnReport {
            session_id: conversation.id.to_string(),
            fragments: Vec::new(),
            tool_calls: Vec::new(),
            iterations: 0,
            hit_iteration_limit: false,
        };
        let tool_definitions = self.tools.definitions();

        loop {
            if report.iterations >= self.max_iterations {
                warn!(
                    session_id = %report.session_id,
                    iterations = report.iterations,
                    "Max tool iterations reached, ending turn"
                );
                report.hit_iteration_limit = true;
                report.fragments.push(ITERATION_LIMIT_MESSAGE.into());
                conversation.push(Message::assistant(ITERATION_LIMIT_MESSAGE));
                break;
            }
            report.iterations += 1;

            debug!(session_id = %report.session_id, iteration = report.iterations, "Turn iteration");

            let mut request = ProviderRequest::new(&self.model, conversation.messages.clone());
            request.temperature = self.temperature;
            request.max_tokens = self.max_tokens;
            request.tools = tool_definitions.clone();

            let response = guarded(abort, async {
                self.provider.complete(request).await.map_err(AgentError::from)
            })
            .await?;

            if let Some(usage) = &response.usage {
                self.event_bus.publish(DomainEvent::ResponseGenerated {
                    session_id: report.session_id.clone(),
                    model: response.model.clone(),
                    tokens_used: usage.total_tokens,
                    timestamp: Utc::now(),
                });
            }

            let text = response.message.content.trim();
            if !text.is_empty() {
                report.fragments.push(text.to_string());
            }

            if response.message.tool_calls.is_empty() {
                conversation.push(response.message);
                break;
            }

            let tool_calls = response.message.tool_calls.clone();
            conversation.push(response.message);

            for tc in &tool_calls {
                let arguments = match serde_json::from_str::<serde_json::Value>(&tc.arguments) {
                    Ok(value) => value,
                    Err(_) if tc.arguments.trim().is_empty() => serde_json::json!({}),
                    Err(e) => {
                        warn!(tool = %tc.name, error = %e, "Unparseable tool arguments");
                        conversation.push(Message::tool_result(
                            &tc.id,
                            format!("Error: Invalid tool arguments: {e}"),
                        ));
                        report.tool_calls.push(ToolInvocation {
                            name: tc.name.clone(),
                            success: false,
                        });
                        continue;
                    }
                };
                let call = ToolCall {
                    id: tc.id.clone(),
                    name: tc.name.clone(),
                    arguments,
                };

                let start = std::time::Instant::now();
                let result = guarded(abort, async { Ok(self.tools.execute(&call).await) }).await?;
                let duration_ms = start.elapsed().as_millis() as u64;

                let (success, output) = match result {
                    Ok(tool_result) => (tool_result.success, tool_result.output),
                    Err(ToolError::Fatal { tool_name, source }) => {
                        self.event_bus.publish(DomainEvent::ToolExecuted {
                            tool_name: tc.name.clone(),
                            success: false,
                            duration_ms,
                            timestamp: Utc::now(),
                        });
                        return Err(AgentError::Policy { tool_name, source });
                    }
                    Err(e) => {
                        warn!(tool = %tc.name, error = %e, "Tool execution failed");
                        (false, format!("Error: {e}"))
                    }
                };

                debug!(tool = %tc.name, success, duration_ms, "Tool executed");
                self.event_bus.publish(DomainEvent::ToolExecuted {
                    tool_name: tc.name.clone(),
                    success,
                    duration_ms,
                    timestamp: Utc::now(),
                });
                report.tool_calls.push(ToolInvocation {
                    name: tc.name.clone(),
                    success,
                });
                conversation.push(Message::tool_result(&tc.id, output));
            }
        }

        info!(
            session_id = %report.session_id,
            iterations = report.iterations,
            tool_calls = report.tool_calls.len(),
            "Turn complete"
        );
        self.event_bus.publish(DomainEvent::TurnCompleted {
            session_id: report.session_id.clone(),
            iterations: report.iterations,
            tool_calls: report.tool_calls.len(),
            timestamp: Utc::now(),
        });

        Ok(report)
    }
}

/// Settle history after a failed turn. Returns whether the turn's
/// messages were kept.
fn close_failed_turn(conversation: &mut Conversation, checkpoint: usize, error: &AgentError) -> bool {
    let start = checkpoint.min(conversation.messages.len());
    let tool_ran = conversation.messages[start..]
        .iter()
        .any(|m| m.role == Role::Tool);
    if !tool_ran {
        conversation.messages.truncate(checkpoint);
        return false;
    }

    // Every call the model asked for needs a result before the next request.
    let pending: Vec<String> = conversation
        .messages
        .iter()
        .rposition(|m| m.role == Role::Assistant && !m.tool_calls.is_empty())
        .map(|at| {
            let answered: Vec<&str> = conversation.messages[at + 1..]
                .iter()
                .filter_map(|m| m.tool_call_id.as_deref())
                .collect();
            conversation.messages[at]
                .tool_calls
                .iter()
                .filter(|tc| !answered.contains(&tc.id.as_str()))
                .map(|tc| tc.id.clone())
                .collect()
        })
        .unwrap_or_default();

    for id in pending {
        conversation.push(Message::tool_result(id, format!("Error: {error}")));
    }
    conversation.push(Message::assistant(format!("Turn ended early: {error}")));
    true
}

/// Await `fut` unless the signal fires first.
async fn guarded<T>(
    abort: &AbortSignal,
    fut: impl Future<Output = Result<T, AgentError>>,
) -> Result<T, AgentError> {
    if abort.is_aborted() {
        return Err(AgentError::Aborted);
    }
    tokio::select! {
        biased;
        _ = abort.cancelled() => Err(AgentError::Aborted),
        result = fut => result,
    }
}
