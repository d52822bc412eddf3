// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! An in-memory [`Tracker`] for engine tests, seeded directly from
//! [`ralph_core::Task`] values so a test can set up backlogs, dependency
//! chains and already-blocked tasks without touching disk.

use super::{Tracker, TrackerError};
use async_trait::async_trait;
use parking_lot::Mutex;
use ralph_core::{Task, TaskId, TaskStatus};

#[derive(Default)]
pub struct FakeTracker {
    tasks: Mutex<Vec<Task>>,
    /// When set, `mark_in_progress` returns this instead of mutating.
    mark_in_progress_error: Mutex<Option<String>>,
}

impl FakeTracker {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self { tasks: Mutex::new(tasks), mark_in_progress_error: Mutex::new(None) }
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.lock().clone()
    }

    /// Force the next `mark_in_progress` call to fail with this message.
    pub fn fail_next_mark_in_progress(&self, message: impl Into<String>) {
        *self.mark_in_progress_error.lock() = Some(message.into());
    }

    /// Directly set a task's status, bypassing the trait (for test setup).
    pub fn set_status(&self, task_id: &TaskId, status: TaskStatus) {
        if let Some(task) = self.tasks.lock().iter_mut().find(|t| &t.id == task_id) {
            task.status = status;
        }
    }
}

#[async_trait]
impl Tracker for FakeTracker {
    async fn get_tasks(&self, statuses: Option<&[TaskStatus]>) -> Result<Vec<Task>, TrackerError> {
        let tasks = self.tasks.lock();
        Ok(match statuses {
            Some(statuses) => tasks.iter().filter(|t| statuses.contains(&t.status)).cloned().collect(),
            None => tasks.clone(),
        })
    }

    async fn mark_in_progress(&self, task_id: &TaskId) -> Result<bool, TrackerError> {
        if let Some(message) = self.mark_in_progress_error.lock().take() {
            return Err(TrackerError::Corrupt(message));
        }
        let mut tasks = self.tasks.lock();
        match tasks.iter_mut().find(|t| &t.id == task_id) {
            Some(task) if task.status == TaskStatus::Open => {
                task.status = TaskStatus::InProgress;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(TrackerError::NotFound(task_id.clone())),
        }
    }

    async fn get(&self, task_id: &TaskId) -> Result<Task, TrackerError> {
        self.tasks
            .lock()
            .iter()
            .find(|t| &t.id == task_id)
            .cloned()
            .ok_or_else(|| TrackerError::NotFound(task_id.clone()))
    }

    async fn complete(&self, task_id: &TaskId) -> Result<(), TrackerError> {
        let mut tasks = self.tasks.lock();
        let task = tasks
            .iter_mut()
            .find(|t| &t.id == task_id)
            .ok_or_else(|| TrackerError::NotFound(task_id.clone()))?;
        task.status = TaskStatus::Completed;
        Ok(())
    }
}
