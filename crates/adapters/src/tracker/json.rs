// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A [`Tracker`] backed by a single JSON file containing an array of
//! [`Task`]s. Order in the file is the tracker's order; mutations persist
//! back with the same write-tmp/fsync/rename sequence `ralph-storage` uses
//! for the session snapshot, so a crash mid-write never corrupts the
//! backlog.

use super::{Tracker, TrackerError};
use async_trait::async_trait;
use parking_lot::Mutex;
use ralph_core::{Task, TaskId, TaskStatus};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct JsonTracker {
    path: PathBuf,
    tasks: Mutex<Vec<Task>>,
}

impl JsonTracker {
    /// Load tasks from an existing JSON file.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, TrackerError> {
        let path = path.into();
        let bytes = fs::read(&path)?;
        let tasks: Vec<Task> = serde_json::from_slice(&bytes)
            .map_err(|e| TrackerError::Corrupt(format!("{}: {e}", path.display())))?;
        Ok(Self { path, tasks: Mutex::new(tasks) })
    }

    /// Seed a fresh tracker file with the given tasks, overwriting any
    /// existing content at `path`.
    pub fn init(path: impl Into<PathBuf>, tasks: Vec<Task>) -> Result<Self, TrackerError> {
        let tracker = Self { path: path.into(), tasks: Mutex::new(tasks) };
        tracker.persist()?;
        Ok(tracker)
    }

    fn tmp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone();
        tmp.set_extension("json.tmp");
        tmp
    }

    fn persist(&self) -> Result<(), TrackerError> {
        let span = tracing::info_span!("json_tracker.persist", path = %self.path.display());
        let _enter = span.enter();

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = {
            let tasks = self.tasks.lock();
            serde_json::to_vec_pretty(&*tasks)
                .map_err(|e| TrackerError::Corrupt(format!("serialize: {e}")))?
        };

        let tmp = self.tmp_path();
        {
            let mut file = File::create(&tmp)?;
            file.write_all(&json)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        if let Some(parent) = self.path.parent() {
            if let Ok(dir) = File::open(parent) {
                let _ = dir.sync_all();
            }
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Tracker for JsonTracker {
    async fn get_tasks(&self, statuses: Option<&[TaskStatus]>) -> Result<Vec<Task>, TrackerError> {
        let tasks = self.tasks.lock();
        Ok(match statuses {
            Some(statuses) => tasks.iter().filter(|t| statuses.contains(&t.status)).cloned().collect(),
            None => tasks.clone(),
        })
    }

    async fn mark_in_progress(&self, task_id: &TaskId) -> Result<bool, TrackerError> {
        let changed = {
            let mut tasks = self.tasks.lock();
            match tasks.iter_mut().find(|t| &t.id == task_id) {
                Some(task) if task.status == TaskStatus::Open => {
                    task.status = TaskStatus::InProgress;
                    true
                }
                Some(_) => false,
                None => return Err(TrackerError::NotFound(task_id.clone())),
            }
        };
        if changed {
            self.persist()?;
        }
        Ok(changed)
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
        {
            let mut tasks = self.tasks.lock();
            let task = tasks
                .iter_mut()
                .find(|t| &t.id == task_id)
                .ok_or_else(|| TrackerError::NotFound(task_id.clone()))?;
            task.status = TaskStatus::Completed;
        }
        self.persist()
    }
}
