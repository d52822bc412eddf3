// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Drives one agent invocation to completion.
//!
//! The runner never retries — that policy lives one layer up, in the
//! execution engine. It only: starts the invocation, forwards stdout/stderr
//! chunks onto the event bus, enforces a timeout, and honours a shared
//! cancellation token.

use crate::bus::EventBus;
use ralph_adapters::{Agent, AgentError, PromptContext};
use ralph_core::{ErrorKind, Event, OutputStream, Task};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Bound on the tail of each output stream kept for diagnosis.
const TAIL_MAX_LINES: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentRunStatus {
    Completed,
    Failed,
    Cancelled,
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct AgentResult {
    pub status: AgentRunStatus,
    pub exit_code: i32,
    pub stdout_tail: String,
    pub stderr_tail: String,
    pub error: Option<String>,
    /// The runner's best guess at this failure's category, for the engine's
    /// `classify` policy. `None` when `status == Completed`.
    pub error_kind: Option<ErrorKind>,
}

impl AgentResult {
    pub fn is_success(&self) -> bool {
        matches!(self.status, AgentRunStatus::Completed) && self.exit_code == 0
    }
}

pub struct RunParams<'a> {
    pub cwd: &'a Path,
    pub timeout: Duration,
    pub cancel_token: CancellationToken,
}

/// Wraps a [`ralph_adapters::Agent`] invocation with streaming, timeout and
/// cancellation handling.
pub struct AgentRunner {
    agent: Arc<dyn Agent>,
    bus: EventBus,
}

impl AgentRunner {
    pub fn new(agent: Arc<dyn Agent>, bus: EventBus) -> Self {
        Self { agent, bus }
    }

    pub fn build_prompt(&self, task: &Task, context: &PromptContext) -> String {
        self.agent.build_prompt(task, context)
    }

    pub async fn run(&self, prompt: String, context: PromptContext, params: RunParams<'_>) -> AgentResult {
        let span = tracing::info_span!("agent_runner.run", iteration = context.iteration);
        async {
            let handle = match self.agent.execute(prompt, context, params.cwd.to_path_buf()).await {
                Ok(handle) => handle,
                Err(e) => return Self::spawn_failure(e),
            };

            let mut stdout = handle.stdout;
            let mut stderr = handle.stderr;
            let mut stdout_tail: Vec<String> = Vec::new();
            let mut stderr_tail: Vec<String> = Vec::new();

            let mut stdout_done = false;
            let mut stderr_done = false;
            let mut timed_out = false;
            let mut cancelled = false;

            loop {
                if stdout_done && stderr_done {
                    break;
                }
                tokio::select! {
                    line = stdout.recv(), if !stdout_done => {
                        match line {
                            Some(line) => {
                                Self::push_tail(&mut stdout_tail, line.clone());
                                self.bus.emit(&Event::AgentOutput { stream: OutputStream::Stdout, data: line });
                            }
                            None => stdout_done = true,
                        }
                    }
                    line = stderr.recv(), if !stderr_done => {
                        match line {
                            Some(line) => {
                                Self::push_tail(&mut stderr_tail, line.clone());
                                self.bus.emit(&Event::AgentOutput { stream: OutputStream::Stderr, data: line });
                            }
                            None => stderr_done = true,
                        }
                    }
                    _ = tokio::time::sleep(params.timeout) => {
                        timed_out = true;
                        break;
                    }
                    _ = params.cancel_token.cancelled() => {
                        cancelled = true;
                        break;
                    }
                }
            }

            // Signalling cancel on a handle that already finished naturally
            // (stdout_done && stderr_done) is a harmless no-op: the adapter's
            // channel is already closed on the receiving end.
            if timed_out || cancelled {
                handle.cancel();
            }
            let outcome = handle.wait().await;

            let (exit_code, error) = match &outcome {
                Ok(outcome) => (outcome.exit_code, None),
                Err(e) => (-1, Some(e.to_string())),
            };

            let status = if cancelled {
                AgentRunStatus::Cancelled
            } else if timed_out {
                AgentRunStatus::TimedOut
            } else if outcome.is_ok() && exit_code == 0 {
                AgentRunStatus::Completed
            } else {
                AgentRunStatus::Failed
            };

            let error_kind = match status {
                AgentRunStatus::Completed => None,
                AgentRunStatus::Cancelled => Some(ErrorKind::Cancelled),
                AgentRunStatus::TimedOut => Some(ErrorKind::Transient),
                AgentRunStatus::Failed => Some(
                    outcome.as_ref().err().map(classify_agent_error).unwrap_or(ErrorKind::Transient),
                ),
            };

            AgentResult {
                status,
                exit_code,
                stdout_tail: stdout_tail.join("\n"),
                stderr_tail: stderr_tail.join("\n"),
                error,
                error_kind,
            }
        }
        .instrument(span)
        .await
    }

    fn spawn_failure(error: AgentError) -> AgentResult {
        let error_kind = classify_agent_error(&error);
        AgentResult {
            status: AgentRunStatus::Failed,
            exit_code: -1,
            stdout_tail: String::new(),
            stderr_tail: String::new(),
            error: Some(error.to_string()),
            error_kind: Some(error_kind),
        }
    }

    fn push_tail(tail: &mut Vec<String>, line: String) {
        tail.push(line);
        if tail.len() > TAIL_MAX_LINES {
            tail.remove(0);
        }
    }
}

/// Maps an adapter-level error onto the engine's error taxonomy.
/// `NotReady`/`SpawnFailed` mean the agent plugin itself
/// reports a configuration or environment problem — fatal, never retried.
/// Everything else (a crashed process, an I/O glitch) is transient.
fn classify_agent_error(error: &AgentError) -> ErrorKind {
    match error {
        AgentError::NotReady(_) | AgentError::SpawnFailed(_) => ErrorKind::EnvironmentNotReady,
        AgentError::Crashed(_) | AgentError::Io(_) => ErrorKind::Transient,
    }
}
