// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable session state.
//!
//! A [`Session`] is the one piece of state that survives a crash or an
//! operator interrupt: it is what makes a run resumable. It is mutated only
//! by the Execution Engine between ticks (see `ralph-engine::lifecycle`).

use crate::task::Task;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Stable identifier for one run. Never changes across a resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Top-level status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Running,
    Paused,
    Interrupted,
    Completed,
    Failed,
}

crate::simple_display! {
    SessionStatus {
        Running => "running",
        Paused => "paused",
        Interrupted => "interrupted",
        Completed => "completed",
        Failed => "failed",
    }
}

/// The durable state of one run.
///
/// Invariants (enforced by `ralph-engine::lifecycle`, not by this type
/// alone — constructing a `Session` directly does not re-check them):
/// 1. `tasks_completed <= total_tasks`
/// 2. `current_iteration` is monotone non-decreasing across the lifetime of
///    one `session_id`.
/// 3. `status == Completed` implies `tasks_completed == total_tasks` or the
///    engine reached the `idle` terminal reason.
/// 4. `is_paused` implies the persisted snapshot has `status == Paused`.
/// 5. `session_id` never changes across a resume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: SessionId,
    pub status: SessionStatus,
    pub started_at_epoch_ms: u64,
    pub updated_at_epoch_ms: u64,
    pub agent_plugin: String,
    pub tracker_plugin: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub epic_id: Option<String>,
    #[serde(default)]
    pub prd_path: Option<String>,
    /// 0 = unbounded.
    pub max_iterations: u64,
    /// Number of iterations started.
    pub current_iteration: u64,
    pub tasks_completed: u64,
    pub total_tasks: u64,
    /// Captured at session creation; used to compute progress after resume.
    pub task_snapshot: Vec<Task>,
    pub cwd: PathBuf,
    pub is_paused: bool,
    #[serde(default)]
    pub paused_at_epoch_ms: Option<u64>,
    #[serde(default)]
    pub last_error: Option<String>,
}

impl Session {
    /// Whether this session can be resumed.
    pub fn is_resumable(&self) -> bool {
        matches!(
            self.status,
            SessionStatus::Running | SessionStatus::Paused | SessionStatus::Interrupted
        ) && self.tasks_completed < self.total_tasks
    }

    /// Human-readable progress summary for the resume confirmation prompt.
    pub fn summary(&self) -> String {
        format!(
            "session {} — {} status, iteration {}, {}/{} tasks completed",
            self.session_id, self.status, self.current_iteration, self.tasks_completed, self.total_tasks,
        )
    }
}

crate::builder! {
    pub struct SessionBuilder => Session {
        into {
            agent_plugin: String = "test-agent",
            tracker_plugin: String = "test-tracker",
            cwd: PathBuf = "/tmp/ralph-test",
        }
        set {
            status: SessionStatus = SessionStatus::Running,
            max_iterations: u64 = 0,
            current_iteration: u64 = 0,
            tasks_completed: u64 = 0,
            total_tasks: u64 = 0,
            task_snapshot: Vec<Task> = Vec::new(),
            is_paused: bool = false,
            started_at_epoch_ms: u64 = 0,
            updated_at_epoch_ms: u64 = 0,
        }
        option {
            model: String = None,
            epic_id: String = None,
            prd_path: String = None,
            paused_at_epoch_ms: u64 = None,
            last_error: String = None,
        }
        computed {
            session_id: SessionId = SessionId::new(),
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
