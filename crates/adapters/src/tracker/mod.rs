// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The tracker plugin contract. A [`Tracker`] is the source of truth for
//! task identity and status; the core only reads and requests mutations
//! through this trait, never owns task state directly.

pub mod json;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

use async_trait::async_trait;
use ralph_core::{Task, TaskId, TaskStatus};

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("task not found: {0}")]
    NotFound(TaskId),
    #[error("tracker store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("tracker store is corrupt: {0}")]
    Corrupt(String),
}

/// One backend that enumerates, queries and mutates tasks.
/// Implementations must return a stable, deterministic order from
/// [`Tracker::get_tasks`] over an unchanged dataset — the iteration
/// controller's monotonicity guarantee depends on it.
#[async_trait]
pub trait Tracker: Send + Sync {
    /// List tasks, optionally filtered to the given statuses. No filter
    /// returns everything.
    async fn get_tasks(&self, statuses: Option<&[TaskStatus]>) -> Result<Vec<Task>, TrackerError>;

    /// Transition a task from `open` to `in_progress`. Returns `false`
    /// (not an error) if the task wasn't in a state where that transition
    /// applies — the caller proceeds read-only in that case.
    async fn mark_in_progress(&self, task_id: &TaskId) -> Result<bool, TrackerError>;

    /// Fetch one task by id.
    async fn get(&self, task_id: &TaskId) -> Result<Task, TrackerError>;

    /// Explicitly mark a task completed. Most trackers rely on the agent
    /// itself to close the task and merely report state on re-read, so the
    /// default implementation is a no-op.
    async fn complete(&self, _task_id: &TaskId) -> Result<(), TrackerError> {
        Ok(())
    }
}
