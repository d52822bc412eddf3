// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The agent plugin contract.
//!
//! An [`Agent`] is a stateless adapter over one external coding tool: it
//! knows how to tell whether its binary is installed (`detect`), whether
//! it's configured enough to run (`is_ready`), how to turn a task into a
//! prompt (`build_prompt`), and how to spawn one invocation (`execute`).
//! Every invocation is independent — no state survives between calls.

pub mod shell;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

use async_trait::async_trait;
use ralph_core::{SessionId, Task};
use std::path::PathBuf;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("agent not ready: {0}")]
    NotReady(String),
    #[error("failed to spawn agent process: {0}")]
    SpawnFailed(String),
    #[error("agent process crashed: {0}")]
    Crashed(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of [`Agent::detect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectResult {
    pub available: bool,
    pub error: Option<String>,
}

impl DetectResult {
    pub fn available() -> Self {
        Self { available: true, error: None }
    }

    pub fn unavailable(error: impl Into<String>) -> Self {
        Self { available: false, error: Some(error.into()) }
    }
}

/// Static identification of an agent plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentMeta {
    pub name: String,
    pub version: Option<String>,
}

/// Session-level context handed to an agent when it builds a prompt or
/// executes — everything the core knows about the run that isn't the task
/// itself. The core never inspects what the agent does with this.
#[derive(Debug, Clone)]
pub struct PromptContext {
    pub session_id: SessionId,
    pub iteration: u64,
    pub model: Option<String>,
    pub epic_id: Option<String>,
    pub prd_path: Option<String>,
}

/// Raw outcome of one agent subprocess, before the iteration controller
/// asks the tracker whether the task is actually done.
#[derive(Debug, Clone)]
pub struct AgentOutcome {
    pub exit_code: i32,
}

/// Handle to a running agent invocation.
///
/// `stdout`/`stderr` stream line-buffered chunks as the subprocess produces
/// them; the agent runner forwards these onto the event bus as
/// `agent:output` events. `wait` resolves once the process exits (or the
/// spawn itself failed before a process existed). `cancel` requests
/// termination; honouring it is the adapter's job — a cancelled run must
/// not resolve `wait` with a "completed" status.
pub struct AgentHandle {
    pub stdout: mpsc::Receiver<String>,
    pub stderr: mpsc::Receiver<String>,
    outcome: oneshot::Receiver<Result<AgentOutcome, AgentError>>,
    cancel: mpsc::Sender<()>,
}

impl AgentHandle {
    pub fn new(
        stdout: mpsc::Receiver<String>,
        stderr: mpsc::Receiver<String>,
        outcome: oneshot::Receiver<Result<AgentOutcome, AgentError>>,
        cancel: mpsc::Sender<()>,
    ) -> Self {
        Self { stdout, stderr, outcome, cancel }
    }

    /// Request cancellation. Non-blocking; the adapter decides how to
    /// honour it (typically: signal, grace window, then force-kill).
    pub fn cancel(&self) {
        let _ = self.cancel.try_send(());
    }

    /// Await the process's final outcome.
    pub async fn wait(self) -> Result<AgentOutcome, AgentError> {
        match self.outcome.await {
            Ok(result) => result,
            Err(_) => Err(AgentError::Crashed("agent task dropped before completion".into())),
        }
    }
}

/// One external coding tool, as consumed by the execution engine's agent
/// runner.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Whether the agent's binary/runtime is present on this host.
    async fn detect(&self) -> DetectResult;

    /// Whether the agent is configured enough to run right now (auth,
    /// model selection, etc.). Cheaper than `detect`; checked every
    /// iteration.
    fn is_ready(&self) -> bool;

    /// Static name/version used in session metadata and logs.
    fn meta(&self) -> AgentMeta;

    /// Turn a task plus session context into the prompt string handed to
    /// `execute`. The core never inspects the result.
    fn build_prompt(&self, task: &Task, context: &PromptContext) -> String;

    /// Spawn one invocation. Returns as soon as the subprocess exists (or
    /// fails fast on a configuration/not-ready error); the caller drives
    /// the returned handle to completion.
    async fn execute(
        &self,
        prompt: String,
        context: PromptContext,
        cwd: PathBuf,
    ) -> Result<AgentHandle, AgentError>;
}
