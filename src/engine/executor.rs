//! Single case execution
//!
//! Runs one case against the API: resolve templates, send, parse,
//! normalize, extract state, validate and fetch snapshots. Every failure
//! ends up on the returned [`ExecutionResult`]; nothing escapes as an error.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::evaluator::{all_pass, evaluate_all, AssertionOutcome};
use super::normalizer::{normalize, parse_body};
use super::resolver::{resolve, resolve_object};
use super::result::{CaseStatus, ExecutionResult, SnapshotOutcome};
use super::state::{SessionState, TOKEN_KEY, U_HASH_KEY};
use super::value::{lookup_path, template_string};
use crate::common::config::RunConfig;
use crate::suite::{SnapshotRequest, TestCase};
use crate::transport::{append_query, encode_form, HttpRequest, HttpResponse, Transport};

/// Wire field carrying the case's role marker
pub const ROLE_FIELD: &str = "u_a_role";

/// Field names a case's parameters can never override
const RESERVED_FIELDS: [&str; 3] = [TOKEN_KEY, U_HASH_KEY, ROLE_FIELD];

/// Where and with which configuration values a case runs
#[derive(Debug, Clone)]
pub struct ExecutionEnv {
    /// Prefix for every case URL, without trailing slash
    pub base_url: String,
    /// Values for `<cfg_NAME>` tokens
    pub vars: HashMap<String, String>,
}

/// Result of one execution plus what the caller must apply afterwards
#[derive(Debug, Clone)]
pub struct CaseOutcome {
    pub result: ExecutionResult,
    /// State extracted from a successful response, to merge into the session
    pub delta: SessionState,
    /// Non-fatal upstream warnings
    pub warnings: Vec<String>,
}

/// Executes test cases through a transport
#[derive(Clone)]
pub struct CaseExecutor {
    transport: Arc<dyn Transport>,
    raw_preview_chars: usize,
    actual_preview_chars: usize,
}

/// Mutable parts of a result while the steps run
struct Draft {
    http_status: u16,
    request_url: String,
    request_body: Map<String, Value>,
    response_body: Option<Value>,
    status: CaseStatus,
    validation_results: Vec<AssertionOutcome>,
    snapshots: Vec<SnapshotOutcome>,
    delta: SessionState,
    warnings: Vec<String>,
}

impl CaseExecutor {
    pub fn new(transport: Arc<dyn Transport>, settings: &RunConfig) -> Self {
        Self {
            transport,
            raw_preview_chars: settings.raw_preview_chars,
            actual_preview_chars: settings.actual_preview_chars,
        }
    }

    /// Execute one case against the given session state
    ///
    /// `state` is only read; extracted values come back as the outcome's
    /// delta and are already visible in `result.state_after`.
    pub async fn execute(
        &self,
        case: &TestCase,
        state: &SessionState,
        env: &ExecutionEnv,
    ) -> CaseOutcome {
        let started = Instant::now();
        let mut draft = Draft {
            http_status: 0,
            request_url: String::new(),
            request_body: Map::new(),
            response_body: None,
            status: CaseStatus::Fail,
            validation_results: Vec::new(),
            snapshots: Vec::new(),
            delta: SessionState::new(),
            warnings: Vec::new(),
        };

        let error = match self.run_steps(case, state, env, &mut draft).await {
            Ok(()) => None,
            Err(message) => {
                warn!(case_id = case.id, case = %case.name, error = %message, "Case failed");
                draft.status = CaseStatus::Fail;
                Some(message)
            }
        };

        let mut state_after = state.clone();
        state_after.merge(&draft.delta);

        let result = ExecutionResult {
            case_id: case.id,
            case_name: case.name.clone(),
            status: draft.status,
            http_status: draft.http_status,
            request_url: draft.request_url,
            request_body: draft.request_body,
            response_body: draft.response_body,
            validation_results: draft.validation_results,
            snapshots: draft.snapshots,
            state_after,
            duration_ms: started.elapsed().as_millis() as u64,
            error,
        };

        CaseOutcome {
            result,
            delta: draft.delta,
            warnings: draft.warnings,
        }
    }

    async fn run_steps(
        &self,
        case: &TestCase,
        state: &SessionState,
        env: &ExecutionEnv,
        draft: &mut Draft,
    ) -> Result<(), String> {
        let path = resolve(&case.url, state, &env.vars);
        draft.request_url = format!("{}{}", env.base_url, path);

        let params = parse_params(&resolve(&case.params, state, &env.vars))?;
        draft.request_body = params.clone();

        let fields = wire_fields(&params, case.role, state);
        let response = self
            .send(&case.method, &draft.request_url, &fields)
            .await?;
        draft.http_status = response.status;

        let body = parse_body(&response.text, &case.name, self.raw_preview_chars)?;
        draft.response_body = Some(body.clone());

        let outcome = normalize(&body, &case.name);
        for warning in &outcome.warnings {
            warn!(case_id = case.id, "Upstream warning: {}", warning);
        }
        draft.warnings = outcome.warnings;
        if !outcome.ok {
            return Err(outcome
                .error_text
                .unwrap_or_else(|| format!("{}: request rejected", case.name)));
        }

        for (key, path) in &case.state_save {
            if let Some(value) = lookup_path(&body, path) {
                debug!(case_id = case.id, key = %key, "Saved state from {}", path);
                draft.delta.insert(key.clone(), value.clone());
            }
        }

        draft.validation_results =
            evaluate_all(&case.validations, &body, self.actual_preview_chars);
        draft.status = if all_pass(&draft.validation_results) {
            CaseStatus::Pass
        } else {
            CaseStatus::Fail
        };

        if !case.snapshots.is_empty() {
            let mut view = state.clone();
            view.merge(&draft.delta);
            for snapshot in &case.snapshots {
                let outcome = self.fetch_snapshot(snapshot, &view, env).await;
                draft.snapshots.push(outcome);
            }
        }

        Ok(())
    }

    async fn fetch_snapshot(
        &self,
        snapshot: &SnapshotRequest,
        state: &SessionState,
        env: &ExecutionEnv,
    ) -> SnapshotOutcome {
        let url = format!("{}{}", env.base_url, resolve(&snapshot.url, state, &env.vars));
        let params = resolve_object(&snapshot.params, state, &env.vars);
        let fields = wire_fields(&params, 0, state);
        let method = if snapshot.method.trim().is_empty() {
            "GET"
        } else {
            snapshot.method.as_str()
        };

        let fetched = match self.send(method, &url, &fields).await {
            Ok(response) => parse_body(&response.text, &snapshot.label, self.raw_preview_chars),
            Err(message) => Err(message),
        };

        match fetched {
            Ok(data) => SnapshotOutcome {
                label: snapshot.label.clone(),
                data: Some(data),
                error: None,
            },
            Err(message) => {
                warn!(snapshot = %snapshot.label, error = %message, "Snapshot failed");
                SnapshotOutcome {
                    label: snapshot.label.clone(),
                    data: None,
                    error: Some(message),
                }
            }
        }
    }

    /// Encode fields as a query string for GET and a form body otherwise
    async fn send(
        &self,
        method: &str,
        url: &str,
        fields: &[(String, String)],
    ) -> Result<HttpResponse, String> {
        let method = method.to_uppercase();
        let encoded = encode_form(fields.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        let request = if method == "GET" {
            HttpRequest::new(method, append_query(url, &encoded))
        } else {
            HttpRequest::form(method, url, encoded)
        };

        let started = Instant::now();
        debug!(method = %request.method, url = %request.url, "Sending request");
        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| e.to_string())?;
        debug!(
            status = response.status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Received response"
        );
        Ok(response)
    }
}

/// Parse a resolved parameter template into an object
fn parse_params(text: &str) -> Result<Map<String, Value>, String> {
    if text.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(Value::Null) => Ok(Map::new()),
        Ok(_) => Err("Invalid request parameters: expected a JSON object".to_string()),
        Err(e) => Err(format!("Invalid request parameters: {} in {}", e, text)),
    }
}

/// Auth fields first, then the role marker, then the case's own parameters
///
/// Parameters named like an auth field are dropped so stored credentials
/// always win.
fn wire_fields(params: &Map<String, Value>, role: u32, state: &SessionState) -> Vec<(String, String)> {
    let mut fields = Vec::with_capacity(params.len() + RESERVED_FIELDS.len());
    if let Some(token) = state.token() {
        fields.push((TOKEN_KEY.to_string(), token.to_string()));
    }
    if let Some(u_hash) = state.u_hash() {
        fields.push((U_HASH_KEY.to_string(), u_hash.to_string()));
    }
    if role != 0 {
        fields.push((ROLE_FIELD.to_string(), role.to_string()));
    }
    for (key, value) in params {
        if !RESERVED_FIELDS.contains(&key.as_str()) {
            fields.push((key.clone(), template_string(value)));
        }
    }
    fields
}
