//! Execution results

use serde::Serialize;
use serde_json::{Map, Value};

use super::evaluator::AssertionOutcome;
use super::state::SessionState;

/// Final status of one case execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseStatus {
    Pass,
    Fail,
}

impl CaseStatus {
    pub fn is_pass(self) -> bool {
        self == Self::Pass
    }
}

impl std::fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Fail => write!(f, "FAIL"),
        }
    }
}

/// Payload or error of one snapshot fetch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotOutcome {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything observed while executing one case
///
/// Built once per execution; re-running a case produces a new result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub case_id: u64,
    pub case_name: String,
    pub status: CaseStatus,
    /// HTTP status code, 0 when no response was received
    pub http_status: u16,
    pub request_url: String,
    /// Resolved request parameters, before auth fields are added
    pub request_body: Map<String, Value>,
    pub response_body: Option<Value>,
    pub validation_results: Vec<AssertionOutcome>,
    pub snapshots: Vec<SnapshotOutcome>,
    /// Session state as it stood when the case finished
    pub state_after: SessionState,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionResult {
    pub fn passed(&self) -> bool {
        self.status.is_pass()
    }

    /// Number of assertions that failed
    pub fn failed_assertions(&self) -> usize {
        self.validation_results.iter().filter(|v| !v.pass).count()
    }
}
