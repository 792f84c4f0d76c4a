//! Error types for the Sentinel domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Sentinel operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Decision policy errors ---
    #[error("Policy error: {0}")]
    Policy(#[from] PolicyError),

    // --- Container runtime errors ---
    #[error("Ops error: {0}")]
    Ops(#[from] OpsError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Failures of the decision policy.
#[derive(Debug, Clone, Error)]
pub enum PolicyError {
    /// The model call itself failed. Not recovered locally.
    #[error("Policy call failed: {0}")]
    PolicyCall(#[from] ProviderError),

    /// The model answered, but outside the output contract.
    #[error("Compliance violation: field '{field}' has invalid value '{value}'")]
    ComplianceViolation { field: String, value: String },
}

impl PolicyError {
    pub fn is_compliance_violation(&self) -> bool {
        matches!(self, Self::ComplianceViolation { .. })
    }
}

/// Failures talking to the container runtime.
#[derive(Debug, Clone, Error)]
pub enum OpsError {
    #[error("Container '{0}' not found")]
    NotFound(String),

    #[error("Container runtime unavailable: {0}")]
    Unavailable(String),

    #[error("Runtime command failed: {0}")]
    CommandFailed(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    /// An error the orchestrator must not hand back to the model:
    /// the turn is aborted and the error surfaces to the caller.
    #[error("Fatal failure in {tool_name}: {source}")]
    Fatal {
        tool_name: String,
        #[source]
        source: PolicyError,
    },
}

impl ToolError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal { .. })
    }
}
