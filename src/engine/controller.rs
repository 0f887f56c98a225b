//! Sequential run controller
//!
//! A run walks an ordered case queue one case at a time:
//!
//! ```text
//! idle -> running -> (paused <-> running) -> finished | stopped
//! ```
//!
//! Auto mode advances by itself with a short pacing delay between cases.
//! Step mode pauses after every case until [`RunController::step_next`] is
//! called. A run object is never reused: starting again builds a new one.

use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::auth::Authenticator;
use super::executor::{CaseExecutor, ExecutionEnv};
use super::result::ExecutionResult;
use super::state::SessionState;
use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::suite::TestCase;
use crate::transport::Transport;

/// How a run advances between cases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Advance automatically until the queue is done
    Auto,
    /// Advance one case per external trigger
    Step,
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "step" => Ok(Self::Step),
            other => Err(format!("unknown run mode '{}', expected 'auto' or 'step'", other)),
        }
    }
}

/// Lifecycle of a run object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Running,
    /// Step mode, waiting for the next trigger
    Paused,
    Finished,
    Stopped,
}

/// One traversal of a case queue
#[derive(Debug)]
pub struct Run {
    pub mode: RunMode,
    pub queue: Vec<TestCase>,
    /// Position of the next case to execute
    pub index: usize,
    pub results: Vec<ExecutionResult>,
    pub passed: usize,
    pub failed: usize,
    pub started_at: Instant,
    pub state: RunState,
    base_url: String,
    cancel: CancellationToken,
}

impl Run {
    pub fn is_active(&self) -> bool {
        matches!(self.state, RunState::Running | RunState::Paused)
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            total: self.queue.len(),
            executed: self.results.len(),
            passed: self.passed,
            failed: self.failed,
            elapsed_ms: self.started_at.elapsed().as_millis() as u64,
            stopped: self.state == RunState::Stopped,
        }
    }
}

/// End-of-run counts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// Cases queued
    pub total: usize,
    /// Cases actually executed
    pub executed: usize,
    pub passed: usize,
    pub failed: usize,
    pub elapsed_ms: u64,
    /// Ended by a stop rather than by reaching the end of the queue
    pub stopped: bool,
}

/// Receives progress as a run executes
pub trait RunObserver: Send {
    /// A case is about to execute (`position` is 1-based)
    fn case_started(&mut self, _case: &TestCase, _position: usize, _total: usize) {}

    fn case_finished(&mut self, _result: &ExecutionResult) {}

    /// Non-fatal upstream warning for a case
    fn notice(&mut self, _case: &TestCase, _message: &str) {}

    /// The run finished or was stopped
    fn run_finished(&mut self, _summary: &RunSummary) {}
}

/// Observer that ignores everything
pub struct NoopObserver;

impl RunObserver for NoopObserver {}

/// Cancels whichever run is current, from outside the controller
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    current: Arc<Mutex<CancellationToken>>,
}

impl StopHandle {
    /// Request the current run to stop before its next case
    pub fn stop(&self) {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel();
    }

    /// Install a fresh token for a new run
    fn arm(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = token.clone();
        token
    }
}

/// Result of a start request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new run was created (and, in auto mode, driven to its end)
    Started,
    /// A run was already active, so the request stopped it instead
    Stopped,
}

/// Owns the session state and drives runs through the case executor
pub struct RunController {
    config: Config,
    executor: CaseExecutor,
    authenticator: Authenticator,
    session: SessionState,
    run: Option<Run>,
    observer: Box<dyn RunObserver>,
    stop: StopHandle,
    pacing: Duration,
}

impl RunController {
    pub fn new(config: Config, transport: Arc<dyn Transport>) -> Self {
        let executor = CaseExecutor::new(transport.clone(), &config.run);
        let authenticator = Authenticator::new(
            transport,
            config.auth.clone(),
            config.run.raw_preview_chars,
        );
        let pacing = Duration::from_millis(config.run.pacing_ms);
        Self {
            config,
            executor,
            authenticator,
            session: SessionState::new(),
            run: None,
            observer: Box::new(NoopObserver),
            stop: StopHandle::default(),
            pacing,
        }
    }

    pub fn set_observer(&mut self, observer: Box<dyn RunObserver>) {
        self.observer = observer;
    }

    /// Handle that can stop the current run from another task
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// The current or most recent run
    pub fn run(&self) -> Option<&Run> {
        self.run.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.run.as_ref().is_some_and(Run::is_active)
    }

    /// Authenticate explicitly against `base_url` (configured one if `None`)
    pub async fn login(&mut self, base_url: Option<&str>) -> Result<()> {
        let base_url = self.base_url(base_url);
        self.authenticator.login(&base_url, &mut self.session).await
    }

    /// Drop all session state, credentials included
    pub fn logout(&mut self) {
        self.session.clear();
        info!("Session cleared");
    }

    /// Start a run over `queue`, or stop the active one
    ///
    /// Authenticates first when the session has no token. In auto mode the
    /// whole queue is executed before this returns.
    pub async fn start(
        &mut self,
        mode: RunMode,
        queue: Vec<TestCase>,
        base_url: Option<&str>,
    ) -> Result<StartOutcome> {
        if self.is_active() {
            self.stop();
            return Ok(StartOutcome::Stopped);
        }
        if queue.is_empty() {
            return Err(Error::NoCasesSelected);
        }

        let base_url = self.base_url(base_url);
        if self.session.token().is_none() {
            self.authenticator.login(&base_url, &mut self.session).await?;
        }

        info!(mode = ?mode, cases = queue.len(), "Starting run");
        self.run = Some(Run {
            mode,
            queue,
            index: 0,
            results: Vec::new(),
            passed: 0,
            failed: 0,
            started_at: Instant::now(),
            state: match mode {
                RunMode::Auto => RunState::Running,
                RunMode::Step => RunState::Paused,
            },
            base_url,
            cancel: self.stop.arm(),
        });

        if mode == RunMode::Auto {
            self.drive().await;
        }
        Ok(StartOutcome::Started)
    }

    /// Execute the next case of an active step-mode run
    ///
    /// A no-op returning `None` when no step-mode run is active.
    pub async fn step_next(&mut self) -> Option<ExecutionResult> {
        let cancel = match &self.run {
            Some(run) if run.is_active() && run.mode == RunMode::Step => run.cancel.clone(),
            _ => return None,
        };
        if cancel.is_cancelled() {
            self.halt();
            return None;
        }
        self.execute_next().await
    }

    /// Stop the active run; returns whether one was active
    pub fn stop(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        if let Some(run) = &self.run {
            run.cancel.cancel();
        }
        self.halt();
        true
    }

    /// Execute a single case outside of the queue order
    ///
    /// Any earlier result for the same case in the current run is replaced.
    pub async fn run_single(
        &mut self,
        case: &TestCase,
        base_url: Option<&str>,
    ) -> Result<ExecutionResult> {
        let base_url = self.base_url(base_url);
        if self.session.token().is_none() {
            self.authenticator.login(&base_url, &mut self.session).await?;
        }

        let env = self.env(base_url);
        self.observer.case_started(case, 1, 1);
        let outcome = self.executor.execute(case, &self.session, &env).await;
        self.session.merge(&outcome.delta);
        for warning in &outcome.warnings {
            self.observer.notice(case, warning);
        }
        self.observer.case_finished(&outcome.result);

        if let Some(run) = &mut self.run {
            run.results.retain(|r| r.case_id != case.id);
            run.results.push(outcome.result.clone());
        }
        Ok(outcome.result)
    }

    /// Auto-mode loop: one case per iteration, stop checked in between
    async fn drive(&mut self) {
        loop {
            let cancel = match &self.run {
                Some(run) if run.is_active() => run.cancel.clone(),
                _ => break,
            };
            if cancel.is_cancelled() {
                self.halt();
                break;
            }

            self.execute_next().await;

            if !self.is_active() {
                break;
            }
            if cancel.is_cancelled() {
                self.halt();
                break;
            }
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(self.pacing) => {}
            }
        }
    }

    async fn execute_next(&mut self) -> Option<ExecutionResult> {
        let (case, base_url, position, total) = {
            let run = self.run.as_mut().filter(|r| r.is_active())?;
            if run.index >= run.queue.len() {
                self.finish();
                return None;
            }
            run.state = RunState::Running;
            (
                run.queue[run.index].clone(),
                run.base_url.clone(),
                run.index + 1,
                run.queue.len(),
            )
        };

        debug!(case_id = case.id, position, total, "Executing case");
        let env = self.env(base_url);
        self.observer.case_started(&case, position, total);
        let outcome = self.executor.execute(&case, &self.session, &env).await;
        self.session.merge(&outcome.delta);
        for warning in &outcome.warnings {
            self.observer.notice(&case, warning);
        }
        self.observer.case_finished(&outcome.result);

        let run = self.run.as_mut()?;
        if outcome.result.passed() {
            run.passed += 1;
        } else {
            run.failed += 1;
        }
        run.results.push(outcome.result.clone());
        run.index += 1;

        if run.index >= run.queue.len() {
            self.finish();
        } else if run.mode == RunMode::Step {
            run.state = RunState::Paused;
        }
        Some(outcome.result)
    }

    fn finish(&mut self) {
        self.end(RunState::Finished);
    }

    fn halt(&mut self) {
        self.end(RunState::Stopped);
    }

    fn end(&mut self, state: RunState) {
        let Some(run) = self.run.as_mut().filter(|r| r.is_active()) else {
            return;
        };
        run.state = state;
        let summary = run.summary();
        info!(
            passed = summary.passed,
            failed = summary.failed,
            executed = summary.executed,
            total = summary.total,
            stopped = summary.stopped,
            "Run ended"
        );
        self.observer.run_finished(&summary);
    }

    fn base_url(&self, base_url: Option<&str>) -> String {
        base_url
            .filter(|url| !url.is_empty())
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| self.config.server.base_url.clone())
    }

    /// Built per case so `cfg_` session values track the current state
    fn env(&self, base_url: String) -> ExecutionEnv {
        let mut vars = self.config.template_vars(&self.session);
        vars.insert("baseUrl".to_string(), base_url.clone());
        ExecutionEnv { base_url, vars }
    }
}
