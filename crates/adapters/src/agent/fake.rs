// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A scriptable [`Agent`] for engine tests. Every call is recorded; outcomes
//! are consumed from a queue so a test can line up exactly the sequence of
//! successes/failures/hangs it wants to exercise.

use super::{Agent, AgentError, AgentHandle, AgentMeta, AgentOutcome, DetectResult, PromptContext};
use async_trait::async_trait;
use parking_lot::Mutex;
use ralph_core::Task;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, Clone, PartialEq)]
pub enum AgentCall {
    Detect,
    BuildPrompt { task_id: String },
    Execute { task_title: String, cwd: PathBuf },
}

/// A scripted outcome for one `execute` call.
#[derive(Debug, Clone)]
pub enum FakeOutcome {
    /// Resolve immediately with this exit code.
    Exit(i32),
    /// Emit these stdout lines, then resolve with this exit code.
    Output(Vec<String>, i32),
    /// Fail the spawn itself.
    SpawnError(String),
    /// Never resolve on its own; only responds to `cancel()`.
    Hang,
}

#[derive(Default)]
struct State {
    calls: Vec<AgentCall>,
    outcomes: VecDeque<FakeOutcome>,
    detect_result: Option<DetectResult>,
    ready: bool,
}

#[derive(Clone)]
pub struct FakeAgent {
    inner: Arc<Mutex<State>>,
}

impl Default for FakeAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeAgent {
    pub fn new() -> Self {
        Self { inner: Arc::new(Mutex::new(State { ready: true, ..State::default() })) }
    }

    /// Queue the outcome returned by the next `execute` call, in order.
    pub fn push_outcome(&self, outcome: FakeOutcome) {
        self.inner.lock().outcomes.push_back(outcome);
    }

    pub fn set_detect_result(&self, result: DetectResult) {
        self.inner.lock().detect_result = Some(result);
    }

    pub fn set_ready(&self, ready: bool) {
        self.inner.lock().ready = ready;
    }

    pub fn calls(&self) -> Vec<AgentCall> {
        self.inner.lock().calls.clone()
    }
}

#[async_trait]
impl Agent for FakeAgent {
    async fn detect(&self) -> DetectResult {
        let mut state = self.inner.lock();
        state.calls.push(AgentCall::Detect);
        state.detect_result.clone().unwrap_or_else(DetectResult::available)
    }

    fn is_ready(&self) -> bool {
        self.inner.lock().ready
    }

    fn meta(&self) -> AgentMeta {
        AgentMeta { name: "fake".into(), version: Some("test".into()) }
    }

    fn build_prompt(&self, task: &Task, _context: &PromptContext) -> String {
        self.inner.lock().calls.push(AgentCall::BuildPrompt { task_id: task.id.to_string() });
        format!("fake prompt for {}", task.id)
    }

    async fn execute(
        &self,
        _prompt: String,
        _context: PromptContext,
        cwd: PathBuf,
    ) -> Result<AgentHandle, AgentError> {
        let outcome = {
            let mut state = self.inner.lock();
            state.calls.push(AgentCall::Execute { task_title: String::new(), cwd: cwd.clone() });
            state.outcomes.pop_front()
        };
        let outcome = outcome.unwrap_or(FakeOutcome::Exit(0));

        let (stdout_tx, stdout_rx) = mpsc::channel(64);
        let (stderr_rx_tx, stderr_rx) = mpsc::channel(1);
        let (cancel_tx, mut cancel_rx) = mpsc::channel(1);
        let (outcome_tx, outcome_rx) = oneshot::channel();
        drop(stderr_rx_tx);

        match outcome {
            FakeOutcome::SpawnError(message) => return Err(AgentError::SpawnFailed(message)),
            FakeOutcome::Exit(code) => {
                let _ = outcome_tx.send(Ok(AgentOutcome { exit_code: code }));
            }
            FakeOutcome::Output(lines, code) => {
                tokio::spawn(async move {
                    for line in lines {
                        if stdout_tx.send(line).await.is_err() {
                            break;
                        }
                    }
                    let _ = outcome_tx.send(Ok(AgentOutcome { exit_code: code }));
                });
            }
            FakeOutcome::Hang => {
                tokio::spawn(async move {
                    cancel_rx.recv().await;
                    tokio::time::sleep(Duration::from_millis(1)).await;
                    let _ = outcome_tx.send(Ok(AgentOutcome { exit_code: 137 }));
                });
            }
        }

        Ok(AgentHandle::new(stdout_rx, stderr_rx, outcome_rx, cancel_tx))
    }
}
