use sentinel_core::error::{PolicyError, ProviderError};

/// Why an orchestrator turn did not produce a report.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Model call failed: {0}")]
    Provider(#[from] ProviderError),

    /// A tool reported a failure that must not be handed back to the model.
    #[error("{tool_name} failed: {source}")]
    Policy {
        tool_name: String,
        #[source]
        source: PolicyError,
    },

    #[error("Turn aborted")]
    Aborted,
}

impl AgentError {
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}

impl From<AgentError> for sentinel_core::Error {
    fn from(e: AgentError) -> Self {
        match e {
            AgentError::Provider(e) => Self::Provider(e),
            AgentError::Policy { source, .. } => Self::Policy(source),
            AgentError::Aborted => Self::Internal("turn aborted".into()),
        }
    }
}
