// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One tick of the loop: pick a task, run the agent, interpret the outcome
//! against the tracker's post-run state, emit events.

use crate::agent_runner::{AgentRunner, RunParams};
use crate::bus::EventBus;
use ralph_adapters::{PromptContext, Tracker, TrackerError};
use ralph_core::{ErrorKind, Event, IterationResult, SessionId, SkipReason, Task, TaskId, TaskStatus};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// What the execution engine asked for this tick.
pub struct TickParams<'a> {
    pub iteration: u64,
    pub cwd: &'a Path,
    pub session_id: SessionId,
    pub model: Option<String>,
    pub epic_id: Option<String>,
    pub prd_path: Option<String>,
    pub timeout: Duration,
    pub cancel_token: CancellationToken,
    /// Tasks the engine has given up on for this run (retries exhausted),
    /// excluded from selection so a stuck task doesn't starve the rest of
    /// the backlog. Not persisted — a resumed run gives every task a fresh
    /// chance.
    pub excluded: &'a HashSet<TaskId>,
}

/// What the execution engine should do next, based on one tick.
pub enum TickOutcome {
    /// No eligible task was found; `iteration:skipped{reason=no_tasks}` was
    /// already emitted.
    NoEligibleTask,
    /// The agent ran to some conclusion. `action` is set only when the
    /// iteration failed and carries the engine's recommended recovery.
    Ran { result: IterationResult, action: Option<ErrorKind> },
    /// The run was torn down by the interrupt coordinator's cancel token.
    /// Not a failure — the caller folds nothing and moves straight to
    /// `stopping`.
    Cancelled,
}

pub struct IterationController {
    tracker: Arc<dyn Tracker>,
    runner: AgentRunner,
    bus: EventBus,
}

impl IterationController {
    pub fn new(tracker: Arc<dyn Tracker>, runner: AgentRunner, bus: EventBus) -> Self {
        Self { tracker, runner, bus }
    }

    pub async fn tick(&self, params: TickParams<'_>) -> Result<TickOutcome, TrackerError> {
        let Some(task) = self.select_task(params.excluded).await? else {
            self.bus.emit(&Event::IterationSkipped { task_id: None, reason: SkipReason::NoTasks });
            return Ok(TickOutcome::NoEligibleTask);
        };

        self.bus.emit(&Event::TaskSelected { task: task.clone(), iteration: params.iteration });

        // If the tracker rejects the mutation (or the task was already
        // in_progress), we proceed read-only.
        let _ = self.tracker.mark_in_progress(&task.id).await;

        let context = PromptContext {
            session_id: params.session_id,
            iteration: params.iteration,
            model: params.model,
            epic_id: params.epic_id,
            prd_path: params.prd_path,
        };
        let prompt = self.runner.build_prompt(&task, &context);

        self.bus.emit(&Event::IterationStarted { iteration: params.iteration, task: task.clone() });

        let start = Instant::now();
        let run = self
            .runner
            .run(
                prompt,
                context,
                RunParams { cwd: params.cwd, timeout: params.timeout, cancel_token: params.cancel_token.clone() },
            )
            .await;
        let duration_ms = start.elapsed().as_millis() as u64;

        if matches!(run.status, crate::agent_runner::AgentRunStatus::Cancelled) {
            return Ok(TickOutcome::Cancelled);
        }

        // The tracker is the ground truth for completion: the agent may
        // have closed the task itself even if the process exited nonzero.
        let post_run = self.tracker.get(&task.id).await.ok();
        let task_completed = post_run.as_ref().map(|t| t.status == TaskStatus::Completed).unwrap_or(false);

        if run.is_success() {
            let result = IterationResult::success(params.iteration, task.clone(), task_completed, duration_ms, run.exit_code);
            self.bus.emit(&Event::IterationCompleted { result: result.clone() });
            if task_completed {
                self.bus.emit(&Event::TaskCompleted { task_id: task.id, iteration: params.iteration });
            }
            Ok(TickOutcome::Ran { result, action: None })
        } else {
            let kind = match post_run.as_ref().map(|t| t.status) {
                Some(TaskStatus::Blocked) => ErrorKind::Blocked,
                _ => run.error_kind.unwrap_or(ErrorKind::Transient),
            };
            let error = run.error.clone().unwrap_or_else(|| format!("agent exited with code {}", run.exit_code));
            let result = IterationResult::failure(params.iteration, task.clone(), duration_ms, run.exit_code, error.clone());
            self.bus.emit(&Event::IterationFailed {
                iteration: params.iteration,
                task,
                error,
                action: kind.recovery_action(),
            });
            Ok(TickOutcome::Ran { result, action: Some(kind) })
        }
    }

    async fn select_task(&self, excluded: &HashSet<TaskId>) -> Result<Option<Task>, TrackerError> {
        let candidates =
            self.tracker.get_tasks(Some(&[TaskStatus::Open, TaskStatus::InProgress])).await?;
        let completed: HashSet<TaskId> = self
            .tracker
            .get_tasks(Some(&[TaskStatus::Completed]))
            .await?
            .into_iter()
            .map(|t| t.id)
            .collect();
        Ok(candidates
            .into_iter()
            .find(|t| !excluded.contains(&t.id) && t.deps_satisfied(&completed)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ralph_adapters::agent::fake::FakeOutcome;
    use ralph_adapters::{FakeAgent, FakeTracker};
    use ralph_core::TaskId;

    fn controller(agent: Arc<FakeAgent>, tracker: Arc<FakeTracker>) -> IterationController {
        IterationController::new(tracker, AgentRunner::new(agent, EventBus::new()), EventBus::new())
    }

    fn params(iteration: u64, excluded: &HashSet<TaskId>) -> TickParams<'_> {
        TickParams {
            iteration,
            cwd: Path::new("/tmp"),
            session_id: SessionId::new(),
            model: None,
            epic_id: None,
            prd_path: None,
            timeout: Duration::from_secs(5),
            cancel_token: CancellationToken::new(),
            excluded,
        }
    }

    #[tokio::test]
    async fn no_eligible_task_emits_skip_and_returns_sentinel() {
        let agent = Arc::new(FakeAgent::new());
        let tracker = Arc::new(FakeTracker::new(vec![]));
        let controller = controller(agent, tracker);
        let outcome = controller.tick(params(1, &HashSet::new())).await.unwrap();
        assert!(matches!(outcome, TickOutcome::NoEligibleTask));
    }

    #[tokio::test]
    async fn dependency_unmet_task_is_skipped_in_selection() {
        let blocked_dep = TaskId::new();
        let mut task = Task::new("t1", "needs dep", TaskStatus::Open);
        task.deps = vec![blocked_dep];
        let agent = Arc::new(FakeAgent::new());
        let tracker = Arc::new(FakeTracker::new(vec![task]));
        let controller = controller(agent, tracker);
        let outcome = controller.tick(params(1, &HashSet::new())).await.unwrap();
        assert!(matches!(outcome, TickOutcome::NoEligibleTask));
    }

    #[tokio::test]
    async fn excluded_task_is_skipped_in_selection() {
        let task = Task::new("t1", "given up on", TaskStatus::Open);
        let agent = Arc::new(FakeAgent::new());
        let tracker = Arc::new(FakeTracker::new(vec![task.clone()]));
        let controller = controller(agent, tracker);
        let excluded = HashSet::from([task.id]);
        let outcome = controller.tick(params(1, &excluded)).await.unwrap();
        assert!(matches!(outcome, TickOutcome::NoEligibleTask));
    }

    #[tokio::test]
    async fn successful_run_marks_task_completed_and_emits_events() {
        let task = Task::new("t1", "do it", TaskStatus::Open);
        let agent = Arc::new(FakeAgent::new());
        agent.push_outcome(FakeOutcome::Exit(0));
        let tracker = Arc::new(FakeTracker::new(vec![task.clone()]));

        let bus = EventBus::new();
        let names = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let handle = names.clone();
        // The agent itself completes the task out-of-band (a real coding
        // agent does this through the tracker's own CLI, not through this
        // process's `Tracker` handle). Flip status once selection and the
        // in-progress transition have already happened, so the ground-truth
        // check after the run sees it completed.
        let complete_tracker = tracker.clone();
        let task_id = task.id;
        bus.subscribe(move |e| {
            handle.lock().push(e.name().to_string());
            if let Event::IterationStarted { .. } = e {
                complete_tracker.set_status(&task_id, TaskStatus::Completed);
            }
        });

        let controller = IterationController::new(tracker.clone(), AgentRunner::new(agent, EventBus::new()), bus);
        let outcome = controller.tick(params(1, &HashSet::new())).await.unwrap();
        match outcome {
            TickOutcome::Ran { result, action } => {
                assert!(result.task_completed);
                assert!(action.is_none());
            }
            _ => panic!("expected Ran"),
        }
        assert_eq!(
            *names.lock(),
            vec!["task:selected", "iteration:started", "iteration:completed", "task:completed"]
        );
    }

    #[tokio::test]
    async fn failed_run_recommends_retry_for_transient_errors() {
        let task = Task::new("t1", "do it", TaskStatus::Open);
        let agent = Arc::new(FakeAgent::new());
        agent.push_outcome(FakeOutcome::Exit(1));
        let tracker = Arc::new(FakeTracker::new(vec![task]));
        let controller = controller(agent, tracker);
        let outcome = controller.tick(params(1, &HashSet::new())).await.unwrap();
        match outcome {
            TickOutcome::Ran { result, action } => {
                assert!(result.is_failure());
                assert_eq!(action, Some(ErrorKind::Transient));
            }
            _ => panic!("expected Ran"),
        }
    }

    #[tokio::test]
    async fn environment_not_ready_recommends_abort() {
        let task = Task::new("t1", "do it", TaskStatus::Open);
        let agent = Arc::new(FakeAgent::new());
        agent.push_outcome(FakeOutcome::SpawnError("missing binary".into()));
        let tracker = Arc::new(FakeTracker::new(vec![task]));
        let controller = controller(agent, tracker);
        let outcome = controller.tick(params(1, &HashSet::new())).await.unwrap();
        match outcome {
            TickOutcome::Ran { action, .. } => assert_eq!(action, Some(ErrorKind::EnvironmentNotReady)),
            _ => panic!("expected Ran"),
        }
    }

    #[tokio::test]
    async fn cancelled_run_is_not_reported_as_failure() {
        let task = Task::new("t1", "do it", TaskStatus::Open);
        let agent = Arc::new(FakeAgent::new());
        agent.push_outcome(FakeOutcome::Hang);
        let tracker = Arc::new(FakeTracker::new(vec![task]));
        let token = CancellationToken::new();
        let controller = controller(agent, tracker);
        let excluded = HashSet::new();
        let mut p = params(1, &excluded);
        p.cancel_token = token.clone();
        token.cancel();
        let outcome = controller.tick(p).await.unwrap();
        assert!(matches!(outcome, TickOutcome::Cancelled));
    }
}
