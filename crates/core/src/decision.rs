//! The Decision entity: structured output of the decision policy.
//!
//! A decision is produced once per policy invocation and never mutated
//! afterwards. Its categorical fields are closed enumerations; anything the
//! model emits outside those labels is rejected at parse time as a
//! compliance violation rather than coerced.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PolicyError;

/// How bad the observed fault is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_label(s).to_ascii_uppercase().as_str() {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            "CRITICAL" => Ok(Self::Critical),
            _ => Err(PolicyError::ComplianceViolation {
                field: "severity".into(),
                value: s.to_string(),
            }),
        }
    }
}

/// The remediation the policy recommends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Restart the workload. The only destructive action.
    RestartService,
    /// Hand the incident to a human.
    Escalate,
    /// Known noise, nothing to do.
    Ignore,
    /// Healthy, nothing to do.
    None,
}

impl Action {
    pub const ALL: [Action; 4] = [
        Action::RestartService,
        Action::Escalate,
        Action::Ignore,
        Action::None,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RestartService => "restart_service",
            Self::Escalate => "escalate",
            Self::Ignore => "ignore",
            Self::None => "none",
        }
    }

    /// Whether carrying out this action mutates the workload.
    pub fn is_destructive(&self) -> bool {
        matches!(self, Self::RestartService)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = normalize_label(s)
            .to_ascii_lowercase()
            .replace([' ', '-'], "_");
        match label.as_str() {
            "restart_service" => Ok(Self::RestartService),
            "escalate" => Ok(Self::Escalate),
            "ignore" => Ok(Self::Ignore),
            "none" => Ok(Self::None),
            _ => Err(PolicyError::ComplianceViolation {
                field: "suggested_action".into(),
                value: s.to_string(),
            }),
        }
    }
}

/// Strip the decoration models like to put around labels:
/// whitespace, quotes, backticks and a trailing period.
fn normalize_label(s: &str) -> &str {
    s.trim()
        .trim_matches(|c| matches!(c, '\'' | '"' | '`'))
        .trim_end_matches('.')
        .trim()
}

/// A root-cause decision for one workload's logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Step-by-step analysis, produced before the categorical fields.
    pub reasoning: String,

    /// The specific technical fault (e.g. "OOMKilled", "Auth Failure").
    pub root_cause: String,

    pub severity: Severity,

    pub suggested_action: Action,
}

impl Decision {
    /// The decision substituted when the model's answer breaks the output
    /// contract: never destructive, always `ignore`.
    pub fn fail_safe(violation: &PolicyError) -> Self {
        Self {
            reasoning: format!("Policy output rejected: {violation}"),
            root_cause: "Compliance Violation".into(),
            severity: Severity::Medium,
            suggested_action: Action::Ignore,
        }
    }
}
