// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-iteration result record.

use crate::task::Task;
use serde::{Deserialize, Serialize};

/// The outcome of one iteration of the loop: a task was picked, the agent
/// ran, and the tracker's post-run state tells us whether it finished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationResult {
    pub iteration: u64,
    pub task: Task,
    pub task_completed: bool,
    pub duration_ms: u64,
    pub exit_code: i32,
    #[serde(default)]
    pub error: Option<String>,
}

impl IterationResult {
    pub fn success(iteration: u64, task: Task, task_completed: bool, duration_ms: u64, exit_code: i32) -> Self {
        Self { iteration, task, task_completed, duration_ms, exit_code, error: None }
    }

    pub fn failure(iteration: u64, task: Task, duration_ms: u64, exit_code: i32, error: impl Into<String>) -> Self {
        Self {
            iteration,
            task,
            task_completed: false,
            duration_ms,
            exit_code,
            error: Some(error.into()),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}
