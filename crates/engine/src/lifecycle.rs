// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builds a session's initial state and folds iteration results back into
//! it.
//!
//! Everything here is a pure function over [`Session`] plus whatever the
//! caller already has in hand — no I/O, no locking. Persisting the result
//! is the execution engine's job, via `ralph_storage::SessionStore`.

use ralph_core::{Clock, IterationResult, Session, SessionId, SessionStatus, Task, TaskStatus};
use std::path::PathBuf;

/// Everything the lifecycle needs to build the first [`Session`] of a run.
pub struct CreateParams {
    pub agent_plugin: String,
    pub tracker_plugin: String,
    pub model: Option<String>,
    pub epic_id: Option<String>,
    pub prd_path: Option<String>,
    pub max_iterations: u64,
    pub cwd: PathBuf,
    /// The tracker's task list at the moment the session is created.
    pub task_snapshot: Vec<Task>,
}

/// Snapshot the tracker's initial task list and initialise counters for a
/// brand-new run.
pub fn create(params: CreateParams, clock: &impl Clock) -> Session {
    let now = clock.epoch_ms();
    let tasks_completed =
        params.task_snapshot.iter().filter(|t| t.status == TaskStatus::Completed).count() as u64;
    let total_tasks = params.task_snapshot.len() as u64;

    Session {
        session_id: SessionId::new(),
        status: SessionStatus::Running,
        started_at_epoch_ms: now,
        updated_at_epoch_ms: now,
        agent_plugin: params.agent_plugin,
        tracker_plugin: params.tracker_plugin,
        model: params.model,
        epic_id: params.epic_id,
        prd_path: params.prd_path,
        max_iterations: params.max_iterations,
        current_iteration: 0,
        tasks_completed,
        total_tasks,
        task_snapshot: params.task_snapshot,
        cwd: params.cwd,
        is_paused: false,
        paused_at_epoch_ms: None,
        last_error: None,
    }
}

/// Fold one tick's result back into `session`: bump `current_iteration`
/// (every tick — retried or not — counts), bump `tasks_completed` if this
/// tick flipped a task to completed, and record or clear the last error.
pub fn fold(session: &mut Session, result: &IterationResult, clock: &impl Clock) {
    session.current_iteration += 1;
    if result.task_completed {
        session.tasks_completed += 1;
    }
    session.last_error = result.error.clone();
    session.updated_at_epoch_ms = clock.epoch_ms();
}

/// Move `session` into `Paused`, recording when.
pub fn pause(session: &mut Session, clock: &impl Clock) {
    session.status = SessionStatus::Paused;
    session.is_paused = true;
    session.paused_at_epoch_ms = Some(clock.epoch_ms());
    session.updated_at_epoch_ms = clock.epoch_ms();
}

/// Move `session` back to `Running`.
pub fn resume(session: &mut Session, clock: &impl Clock) {
    session.status = SessionStatus::Running;
    session.is_paused = false;
    session.paused_at_epoch_ms = None;
    session.updated_at_epoch_ms = clock.epoch_ms();
}

/// Terminal transition for a run that exhausted its backlog or its budget.
pub fn complete(session: &mut Session, clock: &impl Clock) {
    session.status = SessionStatus::Completed;
    session.is_paused = false;
    session.updated_at_epoch_ms = clock.epoch_ms();
}

/// Terminal transition for an operator-confirmed interrupt.
pub fn interrupt(session: &mut Session, clock: &impl Clock) {
    session.status = SessionStatus::Interrupted;
    session.is_paused = false;
    session.updated_at_epoch_ms = clock.epoch_ms();
}

/// Terminal transition for a fatal (abort) classification.
pub fn fail(session: &mut Session, error: impl Into<String>, clock: &impl Clock) {
    session.status = SessionStatus::Failed;
    session.is_paused = false;
    session.last_error = Some(error.into());
    session.updated_at_epoch_ms = clock.epoch_ms();
}

/// Whether `session` can be resumed. Delegates to the invariant the data
/// model itself carries ([`Session::is_resumable`]); kept here so callers
/// thinking in terms of "the lifecycle" don't need to reach into `ralph_core`.
pub fn resumable(session: &Session) -> bool {
    session.is_resumable()
}

/// Human-readable progress summary for the resume confirmation prompt.
pub fn summary(session: &Session) -> String {
    session.summary()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ralph_core::{FakeClock, Task, TaskStatus};

    fn params(tasks: Vec<Task>) -> CreateParams {
        CreateParams {
            agent_plugin: "fake".into(),
            tracker_plugin: "fake".into(),
            model: None,
            epic_id: None,
            prd_path: None,
            max_iterations: 0,
            cwd: PathBuf::from("/tmp/ralph"),
            task_snapshot: tasks,
        }
    }

    #[test]
    fn create_counts_already_completed_tasks_in_snapshot() {
        let clock = FakeClock::new();
        let tasks = vec![
            Task::new("t1", "a", TaskStatus::Completed),
            Task::new("t2", "b", TaskStatus::Open),
        ];
        let session = create(params(tasks), &clock);
        assert_eq!(session.total_tasks, 2);
        assert_eq!(session.tasks_completed, 1);
        assert_eq!(session.current_iteration, 0);
        assert_eq!(session.status, SessionStatus::Running);
    }

    #[test]
    fn fold_advances_iteration_and_counts_completion() {
        let clock = FakeClock::new();
        let mut session = create(params(vec![Task::new("t1", "a", TaskStatus::Open)]), &clock);
        clock.advance(std::time::Duration::from_millis(10));

        let task = Task::new("t1", "a", TaskStatus::Completed);
        let result = IterationResult::success(1, task, true, 5, 0);
        fold(&mut session, &result, &clock);

        assert_eq!(session.current_iteration, 1);
        assert_eq!(session.tasks_completed, 1);
        assert!(session.last_error.is_none());
    }

    #[test]
    fn fold_records_error_without_bumping_completion() {
        let clock = FakeClock::new();
        let mut session = create(params(vec![Task::new("t1", "a", TaskStatus::Open)]), &clock);
        let task = Task::new("t1", "a", TaskStatus::Open);
        let result = IterationResult::failure(1, task, 5, 1, "boom");
        fold(&mut session, &result, &clock);

        assert_eq!(session.current_iteration, 1);
        assert_eq!(session.tasks_completed, 0);
        assert_eq!(session.last_error.as_deref(), Some("boom"));
    }

    #[test]
    fn pause_then_resume_round_trips_status() {
        let clock = FakeClock::new();
        let mut session = create(params(vec![]), &clock);
        pause(&mut session, &clock);
        assert!(session.is_paused);
        assert_eq!(session.status, SessionStatus::Paused);
        assert!(session.paused_at_epoch_ms.is_some());

        resume(&mut session, &clock);
        assert!(!session.is_paused);
        assert_eq!(session.status, SessionStatus::Running);
        assert!(session.paused_at_epoch_ms.is_none());
    }

    #[test]
    fn resumable_reflects_session_invariant() {
        let clock = FakeClock::new();
        let mut session =
            create(params(vec![Task::new("t1", "a", TaskStatus::Open)]), &clock);
        assert!(resumable(&session));
        complete(&mut session, &clock);
        session.tasks_completed = session.total_tasks;
        assert!(!resumable(&session));
    }
}
