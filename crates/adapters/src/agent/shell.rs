// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A generic agent that runs an arbitrary external command as the coding
//! tool: `program args... < prompt (stdin)`. This is not a plugin for any
//! particular cloud LLM CLI — those are out of the core's scope — but the
//! thin shim the core needs to drive *some* real subprocess end to end.

use super::{Agent, AgentError, AgentHandle, AgentMeta, AgentOutcome, DetectResult, PromptContext};
use async_trait::async_trait;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use ralph_core::Task;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};

/// Time to wait after SIGTERM before escalating to SIGKILL.
const KILL_GRACE: Duration = Duration::from_secs(2);

const OUTPUT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct ShellAgent {
    pub program: String,
    pub args: Vec<String>,
}

impl ShellAgent {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self { program: program.into(), args }
    }

    fn on_path(program: &str) -> bool {
        if program.contains(std::path::MAIN_SEPARATOR) {
            return std::path::Path::new(program).is_file();
        }
        std::env::var_os("PATH")
            .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
            .unwrap_or(false)
    }
}

#[async_trait]
impl Agent for ShellAgent {
    async fn detect(&self) -> DetectResult {
        if Self::on_path(&self.program) {
            DetectResult::available()
        } else {
            DetectResult::unavailable(format!("{} not found on PATH", self.program))
        }
    }

    fn is_ready(&self) -> bool {
        true
    }

    fn meta(&self) -> AgentMeta {
        AgentMeta { name: self.program.clone(), version: None }
    }

    fn build_prompt(&self, task: &Task, context: &PromptContext) -> String {
        let mut prompt = format!("# Task {}: {}\n\n", task.id, task.title);
        if let Some(model) = &context.model {
            prompt.push_str(&format!("Model: {model}\n"));
        }
        if let Some(epic_id) = &context.epic_id {
            prompt.push_str(&format!("Epic: {epic_id}\n"));
        }
        if let Some(prd_path) = &context.prd_path {
            prompt.push_str(&format!("PRD: {prd_path}\n"));
        }
        prompt.push_str(&format!("Iteration: {}\n", context.iteration));
        prompt
    }

    async fn execute(
        &self,
        prompt: String,
        _context: PromptContext,
        cwd: PathBuf,
    ) -> Result<AgentHandle, AgentError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .current_dir(&cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AgentError::SpawnFailed(format!("{}: {e}", self.program)))?;

        let pid = child.id().map(|raw| raw as i32);

        let mut stdin = child.stdin.take();
        if let Some(stdin) = stdin.as_mut() {
            let _ = stdin.write_all(prompt.as_bytes()).await;
        }
        drop(stdin); // close stdin so the agent sees EOF

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AgentError::SpawnFailed("child process has no stdout pipe".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| AgentError::SpawnFailed("child process has no stderr pipe".into()))?;

        let (stdout_tx, stdout_rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
        let (stderr_tx, stderr_rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
        let (cancel_tx, mut cancel_rx) = mpsc::channel(1);
        let (outcome_tx, outcome_rx) = oneshot::channel();

        tokio::spawn(stream_lines(stdout, stdout_tx));
        tokio::spawn(stream_lines(stderr, stderr_tx));

        tokio::spawn(async move {
            let outcome = tokio::select! {
                status = child.wait() => status.map(|s| AgentOutcome { exit_code: s.code().unwrap_or(-1) })
                    .map_err(|e| AgentError::Crashed(e.to_string())),
                _ = cancel_rx.recv() => {
                    if let Some(pid) = pid {
                        let _ = kill(Pid::from_raw(pid), Signal::SIGTERM);
                    }
                    let status = tokio::select! {
                        status = child.wait() => status,
                        _ = tokio::time::sleep(KILL_GRACE) => {
                            let _ = child.start_kill();
                            child.wait().await
                        }
                    };
                    status
                        .map(|s| AgentOutcome { exit_code: s.code().unwrap_or(-1) })
                        .map_err(|e| AgentError::Crashed(e.to_string()))
                }
            };
            let _ = outcome_tx.send(outcome);
        });

        Ok(AgentHandle::new(stdout_rx, stderr_rx, outcome_rx, cancel_tx))
    }
}

async fn stream_lines(reader: impl tokio::io::AsyncRead + Unpin, tx: mpsc::Sender<String>) {
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if tx.send(line).await.is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(error = %e, "agent output stream read error");
                break;
            }
        }
    }
}
