//! The container runtime abstraction and the values that cross it.

use async_trait::async_trait;
use sentinel_core::error::OpsError;
use serde::{Deserialize, Serialize};

/// Number of log lines read when the caller does not ask for a specific tail.
pub const DEFAULT_TAIL: usize = 50;

/// Which workload to read and how much of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogQuery {
    pub workload: String,
    pub tail: usize,
}

impl LogQuery {
    pub fn new(workload: impl Into<String>) -> Self {
        Self {
            workload: workload.into(),
            tail: DEFAULT_TAIL,
        }
    }

    pub fn with_tail(mut self, tail: usize) -> Self {
        self.tail = tail;
        self
    }
}

/// Raw log text of one workload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogBundle {
    pub workload: String,
    pub text: String,
}

impl LogBundle {
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// One row of a workload listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadSummary {
    pub name: String,
    pub short_id: String,
    pub status: String,
}

/// Access to running workloads.
///
/// Implementations report a missing workload as [`OpsError::NotFound`] and
/// an unreachable backend as [`OpsError::Unavailable`]. No retries.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Short backend name for logs and status output.
    fn name(&self) -> &str;

    /// Running workloads, in backend order.
    async fn list_workloads(&self) -> Result<Vec<WorkloadSummary>, OpsError>;

    /// The last `query.tail` lines of a workload's logs.
    async fn fetch_logs(&self, query: &LogQuery) -> Result<LogBundle, OpsError>;

    /// Restart a workload. Every call restarts again.
    async fn restart(&self, workload: &str) -> Result<(), OpsError>;
}
