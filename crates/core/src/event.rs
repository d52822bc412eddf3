// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Progress events carried on the event bus.
//!
//! This `Event` is a pure progress notification: the event bus is a
//! synchronous, ordered fan-out to observers, not a write-ahead log.
//! Nothing here is replayed; the durable source of truth is [`crate::Session`].

use crate::iteration::IterationResult;
use crate::task::{Task, TaskId};
use crate::error::RecoveryAction;
use serde::{Deserialize, Serialize};

/// Which stream an `agent:output` chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

crate::simple_display! {
    OutputStream {
        Stdout => "stdout",
        Stderr => "stderr",
    }
}

/// Why the execution engine stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    MaxIterations,
    Idle,
    Fatal,
    Interrupted,
    PausedExit,
}

crate::simple_display! {
    TerminationReason {
        MaxIterations => "max_iterations",
        Idle => "idle",
        Fatal => "fatal",
        Interrupted => "interrupted",
        PausedExit => "paused_exit",
    }
}

/// Why task selection found nothing eligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoTasks,
}

crate::simple_display! {
    SkipReason {
        NoTasks => "no_tasks",
    }
}

/// Progress event emitted on the event bus.
///
/// Serializes with `{"type": "engine:started", ...fields}` format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "engine:started")]
    EngineStarted { total_tasks: u64 },

    #[serde(rename = "engine:paused")]
    EnginePaused { current_iteration: u64 },

    #[serde(rename = "engine:resumed")]
    EngineResumed { from_iteration: u64 },

    #[serde(rename = "engine:stopped")]
    EngineStopped {
        reason: TerminationReason,
        total_iterations: u64,
        tasks_completed: u64,
    },

    #[serde(rename = "iteration:started")]
    IterationStarted { iteration: u64, task: Task },

    #[serde(rename = "iteration:completed")]
    IterationCompleted { result: IterationResult },

    #[serde(rename = "iteration:failed")]
    IterationFailed {
        iteration: u64,
        task: Task,
        error: String,
        action: RecoveryAction,
    },

    #[serde(rename = "iteration:retrying")]
    IterationRetrying {
        iteration: u64,
        task: Task,
        retry_attempt: u32,
        max_retries: u32,
        delay_ms: u64,
    },

    #[serde(rename = "iteration:skipped")]
    IterationSkipped {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        task_id: Option<TaskId>,
        reason: SkipReason,
    },

    #[serde(rename = "agent:output")]
    AgentOutput { stream: OutputStream, data: String },

    #[serde(rename = "task:selected")]
    TaskSelected { task: Task, iteration: u64 },

    #[serde(rename = "task:completed")]
    TaskCompleted { task_id: TaskId, iteration: u64 },

    #[serde(rename = "all:complete")]
    AllComplete { total_completed: u64, total_iterations: u64 },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::EngineStarted { .. } => "engine:started",
            Event::EnginePaused { .. } => "engine:paused",
            Event::EngineResumed { .. } => "engine:resumed",
            Event::EngineStopped { .. } => "engine:stopped",
            Event::IterationStarted { .. } => "iteration:started",
            Event::IterationCompleted { .. } => "iteration:completed",
            Event::IterationFailed { .. } => "iteration:failed",
            Event::IterationRetrying { .. } => "iteration:retrying",
            Event::IterationSkipped { .. } => "iteration:skipped",
            Event::AgentOutput { .. } => "agent:output",
            Event::TaskSelected { .. } => "task:selected",
            Event::TaskCompleted { .. } => "task:completed",
            Event::AllComplete { .. } => "all:complete",
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
