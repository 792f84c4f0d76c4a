//! Offline calibration: bootstrap a few-shot example set.
//!
//! Each labeled example is decided zero-shot. A prediction that agrees with
//! the label on severity and action becomes a demonstration, until
//! `max_bootstrapped_demos` are collected. The free-text fields are never
//! compared, so the kept demonstrations carry the model's own reasoning.

use chrono::Utc;
use sentinel_core::decision::{Action, Decision, Severity};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::examples::{Demonstration, ExampleSet, StoreError};
use crate::policy::DecisionPolicy;

/// A case with the decision a human expects for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledExample {
    #[serde(rename = "container_name")]
    pub workload: String,
    pub logs: String,
    #[serde(flatten)]
    pub expected: Decision,
}

impl LabeledExample {
    fn new(
        workload: &str,
        logs: &str,
        reasoning: &str,
        root_cause: &str,
        severity: Severity,
        suggested_action: Action,
    ) -> Self {
        Self {
            workload: workload.into(),
            logs: logs.into(),
            expected: Decision {
                reasoning: reasoning.into(),
                root_cause: root_cause.into(),
                severity,
                suggested_action,
            },
        }
    }
}

/// The built-in training cases: one escalation, one healthy service, one
/// restartable crash.
pub fn default_trainset() -> Vec<LabeledExample> {
    vec![
        LabeledExample::new(
            "production-db",
            "FATAL: Password authentication failed for user 'admin'. Connection closed.",
            "The logs show a clear authentication failure. This is likely a configuration issue in the client, not the DB itself.",
            "Auth Failure",
            Severity::Critical,
            Action::Escalate,
        ),
        LabeledExample::new(
            "frontend-ui",
            "INFO: Rendered page in 20ms. INFO: Cache hit.",
            "All logs are INFO level. No errors detected.",
            "None",
            Severity::Low,
            Action::None,
        ),
        LabeledExample::new(
            "worker-node",
            "Error: Java heap space. java.lang.OutOfMemoryError. Terminating process.",
            "The application ran out of memory and crashed. It needs a restart to recover temporarily.",
            "OOMKilled",
            Severity::High,
            Action::RestartService,
        ),
    ]
}

/// Read a JSON array of labeled examples.
pub fn load_dataset(path: &Path) -> Result<Vec<LabeledExample>, CalibrationError> {
    let content = std::fs::read_to_string(path).map_err(|e| CalibrationError::Dataset {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let examples: Vec<LabeledExample> =
        serde_json::from_str(&content).map_err(|e| CalibrationError::Dataset {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    if examples.is_empty() {
        return Err(CalibrationError::EmptyDataset);
    }
    Ok(examples)
}

/// A prediction passes when severity and action both match the label.
pub fn metric(expected: &Decision, predicted: &Decision) -> bool {
    expected.severity == predicted.severity && expected.suggested_action == predicted.suggested_action
}

#[derive(Debug, thiserror::Error)]
pub enum CalibrationError {
    #[error("Failed to read dataset at {path}: {reason}")]
    Dataset { path: PathBuf, reason: String },

    #[error("Dataset contains no examples")]
    EmptyDataset,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Serialize)]
pub struct CalibrationReport {
    /// Examples sent to the model before the demo budget was reached.
    pub attempted: usize,
    pub passed: usize,
    /// Model failures and compliance violations.
    pub errors: usize,
    pub kept: usize,
    /// Where the new set was written; `None` when nothing was replaced or
    /// the store has no file.
    pub persisted_to: Option<PathBuf>,
    pub replaced: bool,
    pub version: Option<u32>,
}

pub struct Calibrator<'a> {
    policy: &'a DecisionPolicy,
    max_bootstrapped_demos: usize,
}

impl<'a> Calibrator<'a> {
    pub fn new(policy: &'a DecisionPolicy, max_bootstrapped_demos: usize) -> Self {
        Self {
            policy,
            max_bootstrapped_demos,
        }
    }

    /// Bootstrap demonstrations from `trainset` and install them.
    ///
    /// When nothing passes, the store and its file are left untouched.
    pub async fn run(&self, trainset: &[LabeledExample]) -> Result<CalibrationReport, CalibrationError> {
        let zero_shot = ExampleSet::empty();
        let mut report = CalibrationReport {
            attempted: 0,
            passed: 0,
            errors: 0,
            kept: 0,
            persisted_to: None,
            replaced: false,
            version: None,
        };
        let mut kept = Vec::new();

        info!(
            examples = trainset.len(),
            max_demos = self.max_bootstrapped_demos,
            "Starting calibration"
        );

        for example in trainset {
            if kept.len() >= self.max_bootstrapped_demos {
                break;
            }
            report.attempted += 1;

            match self
                .policy
                .decide_with(&zero_shot, &example.workload, &example.logs)
                .await
            {
                Ok(predicted) if metric(&example.expected, &predicted) => {
                    report.passed += 1;
                    debug!(workload = %example.workload, "Example passed, keeping demonstration");
                    kept.push(Demonstration {
                        workload: example.workload.clone(),
                        logs: example.logs.clone(),
                        decision: predicted,
                    });
                }
                Ok(predicted) => {
                    debug!(
                        workload = %example.workload,
                        expected_action = %example.expected.suggested_action,
                        predicted_action = %predicted.suggested_action,
                        "Example failed the metric"
                    );
                }
                Err(e) => {
                    report.errors += 1;
                    warn!(workload = %example.workload, error = %e, "Example errored during calibration");
                }
            }
        }

        report.kept = kept.len();

        if kept.is_empty() {
            warn!(
                attempted = report.attempted,
                errors = report.errors,
                "No demonstration passed; keeping the current example set"
            );
            return Ok(report);
        }

        let store = self.policy.store();
        let version = store.snapshot().version.saturating_add(1);
        let set = ExampleSet {
            version,
            created_at: Utc::now(),
            model: self.policy.settings().model.clone(),
            demonstrations: kept,
        };

        report.persisted_to = store.persist_and_replace(set)?;
        report.replaced = true;
        self.policy.announce_example_set(report.kept);
        report.version = Some(version);

        info!(
            kept = report.kept,
            version,
            path = ?report.persisted_to,
            "Calibration complete"
        );
        Ok(report)
    }
}
