// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task identity and status, as reported by a tracker plugin.
//!
//! A [`Task`] is owned by the tracker; the core treats it as immutable
//! within one iteration and never mutates it directly.

use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a task, as minted by the tracker plugin.
    pub struct TaskId("tsk-");
}

/// Lifecycle status of a task as reported by the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Open,
    InProgress,
    Blocked,
    Completed,
    Cancelled,
}

impl TaskStatus {
    /// Whether a task in this status is eligible for selection by the
    /// iteration controller.
    pub fn is_selectable(self) -> bool {
        matches!(self, TaskStatus::Open | TaskStatus::InProgress)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Cancelled)
    }
}

crate::simple_display! {
    TaskStatus {
        Open => "open",
        InProgress => "in_progress",
        Blocked => "blocked",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

/// A unit of work as reported by the tracker plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub deps: Vec<TaskId>,
}

impl Task {
    pub fn new(id: impl Into<TaskId>, title: impl Into<String>, status: TaskStatus) -> Self {
        Self { id: id.into(), title: title.into(), status, deps: Vec::new() }
    }

    crate::setters! {
        set {
            deps: Vec<TaskId>,
        }
    }

    /// Whether every dependency of this task is present (and completed) in
    /// `completed`. A task with no deps is trivially satisfied.
    pub fn deps_satisfied(&self, completed: &std::collections::HashSet<TaskId>) -> bool {
        self.deps.iter().all(|d| completed.contains(d))
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
