//! Execution engine
//!
//! Threads session state through an ordered chain of dependent HTTP calls:
//! templates are resolved against the state, responses are normalized and
//! validated, and values extracted from successful responses feed the next
//! case. The [`RunController`] owns the state; everything below it only
//! reads it and returns deltas.

mod auth;
mod controller;
mod evaluator;
mod executor;
mod normalizer;
mod resolver;
mod result;
mod state;
mod value;

pub use auth::Authenticator;
pub use controller::{
    NoopObserver, Run, RunController, RunMode, RunObserver, RunState, RunSummary, StartOutcome,
    StopHandle,
};
pub use evaluator::{all_pass, evaluate, evaluate_all, Assertion, AssertionOutcome};
pub use executor::{CaseExecutor, CaseOutcome, ExecutionEnv, ROLE_FIELD};
pub use normalizer::{normalize, parse_body, NormalizedOutcome, SUCCESS_CODE};
pub use resolver::{resolve, resolve_object, CONFIG_PREFIX};
pub use result::{CaseStatus, ExecutionResult, SnapshotOutcome};
pub use state::{SessionState, TOKEN_KEY, U_HASH_KEY, U_ID_KEY};
pub use value::{coerce_number, coerce_string, lookup_path};
