// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The top-level loop: budgeting, retry/backoff, pause/resume, termination.
//!
//! Everything below this module is mechanism (one tick, one agent run, one
//! fan-out). This is the policy that decides how many ticks to run, what to
//! do when one fails, and when to stop.

use crate::bus::EventBus;
use crate::iteration::{IterationController, TickOutcome, TickParams};
use crate::lifecycle;
use ralph_adapters::TrackerError;
use ralph_core::{Clock, Event, RecoveryAction, Session, TaskId, TerminationReason};
use ralph_storage::{SessionStore, StoreError};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Tracker(#[from] TrackerError),
}

/// Retry policy: how many attempts a single task gets before the engine
/// gives up on it, and how long to wait between attempts.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub backoff_cap_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_attempts: 3, initial_delay_ms: 1000, backoff_cap_ms: 30_000 }
    }
}

impl RetryConfig {
    /// `min(initial_delay_ms * 2^attempt, cap)`, plus up to 10% jitter.
    ///
    /// `jitter_seed` makes the jitter a deterministic function of the call
    /// site (iteration number, task id) rather than reaching for a `rand`
    /// dependency the rest of the crate has no other use for — the policy
    /// only needs the delay to not be perfectly lockstep across tasks, not
    /// cryptographic unpredictability.
    pub fn backoff(&self, attempt: u32, jitter_seed: u64) -> Duration {
        let exp = self.initial_delay_ms.saturating_mul(1u64 << attempt.min(32));
        let base = exp.min(self.backoff_cap_ms);
        let jitter_range = base / 10;
        let jitter = splitmix(jitter_seed) % jitter_range.max(1);
        Duration::from_millis(base + jitter)
    }
}

/// Cheap, non-cryptographic mix used only to spread retry delays; not a PRNG
/// used anywhere security-sensitive.
fn splitmix(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

pub struct RunConfig {
    pub max_iterations: u64,
    pub iteration_delay_ms: u64,
    pub retry: RetryConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self { max_iterations: 0, iteration_delay_ms: 0, retry: RetryConfig::default() }
    }
}

/// Handle for pausing and resuming a running [`ExecutionEngine::run`] from
/// another task (a signal handler, a keypress listener).
#[derive(Clone)]
pub struct PauseHandle {
    paused: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl PauseHandle {
    fn new() -> Self {
        Self { paused: Arc::new(AtomicBool::new(false)), notify: Arc::new(Notify::new()) }
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Blocks until `resume()` is called or `cancel_token` fires, whichever
    /// comes first. A no-op if not currently paused.
    async fn wait_while_paused(&self, cancel_token: &CancellationToken) {
        while self.is_paused() {
            tokio::select! {
                _ = self.notify.notified() => {}
                _ = cancel_token.cancelled() => return,
            }
        }
    }
}

pub struct RunOutcome {
    pub session: Session,
    pub reason: TerminationReason,
}

/// Drives [`IterationController::tick`] in a loop against `RunConfig`'s
/// budget and retry policy, folding each result into `session` and
/// persisting it, until a termination condition is reached.
pub struct ExecutionEngine {
    controller: IterationController,
    bus: EventBus,
    store: SessionStore,
    clock: Arc<dyn Clock>,
    config: RunConfig,
    pause: PauseHandle,
    cancel_token: CancellationToken,
}

impl ExecutionEngine {
    pub fn new(
        controller: IterationController,
        bus: EventBus,
        store: SessionStore,
        clock: Arc<dyn Clock>,
        config: RunConfig,
        cancel_token: CancellationToken,
    ) -> Self {
        Self { controller, bus, store, clock, config, pause: PauseHandle::new(), cancel_token }
    }

    pub fn pause_handle(&self) -> PauseHandle {
        self.pause.clone()
    }

    /// Runs `session` to completion, persisting a fold after every tick.
    pub async fn run(&self, mut session: Session, cwd: &Path) -> Result<RunOutcome, EngineError> {
        self.bus.emit(&Event::EngineStarted { total_tasks: session.total_tasks });

        let mut attempts: HashMap<TaskId, u32> = HashMap::new();
        let mut last_task: Option<TaskId> = None;
        // Tasks whose retries were exhausted this run: excluded from
        // selection so a stuck task doesn't starve the rest of the
        // backlog. Not persisted — a resumed run gives every task a fresh
        // chance.
        let mut given_up: HashSet<TaskId> = HashSet::new();

        let reason = loop {
            if self.cancel_token.is_cancelled() {
                // A cancel that caught the session sitting in `Paused` (a
                // checkpoint, not a teardown) exits cleanly without the
                // "graceful shutdown of a running iteration" connotation
                // `Interrupted` carries elsewhere.
                break if self.pause.is_paused() { TerminationReason::PausedExit } else { TerminationReason::Interrupted };
            }

            self.pause.wait_while_paused(&self.cancel_token).await;
            if self.cancel_token.is_cancelled() {
                break if self.pause.is_paused() { TerminationReason::PausedExit } else { TerminationReason::Interrupted };
            }

            if self.config.max_iterations > 0 && session.current_iteration >= self.config.max_iterations {
                break TerminationReason::MaxIterations;
            }

            let iteration = session.current_iteration + 1;
            let outcome = self
                .controller
                .tick(TickParams {
                    iteration,
                    cwd,
                    session_id: session.session_id,
                    model: session.model.clone(),
                    epic_id: session.epic_id.clone(),
                    prd_path: session.prd_path.clone(),
                    timeout: Duration::from_secs(600),
                    cancel_token: self.cancel_token.clone(),
                    excluded: &given_up,
                })
                .await?;

            match outcome {
                TickOutcome::NoEligibleTask => break TerminationReason::Idle,
                TickOutcome::Cancelled => break TerminationReason::Interrupted,
                TickOutcome::Ran { result, action } => {
                    let task_id = result.task.id.clone();
                    if Some(&task_id) != last_task.as_ref() {
                        attempts.remove(&task_id);
                    }
                    last_task = Some(task_id.clone());

                    lifecycle::fold(&mut session, &result, self.clock.as_ref());
                    self.store.save(cwd, &session)?;

                    if let Some(kind) = action {
                        match kind.recovery_action() {
                            RecoveryAction::Retry => {
                                let used = attempts.entry(task_id.clone()).or_insert(0);
                                *used += 1;
                                if *used <= self.config.retry.max_attempts {
                                    // `*used` is 1-based (this is the `*used`-th retry),
                                    // so its backoff exponent is `*used - 1`: the first
                                    // retry waits exactly `initial_delay_ms`.
                                    let seed = iteration ^ ((*used as u64) << 32);
                                    let delay = self.config.retry.backoff(*used - 1, seed);
                                    self.bus.emit(&Event::IterationRetrying {
                                        iteration,
                                        task: result.task.clone(),
                                        retry_attempt: *used,
                                        max_retries: self.config.retry.max_attempts,
                                        delay_ms: delay.as_millis() as u64,
                                    });
                                    if self.sleep_honouring_cancel(delay).await {
                                        break TerminationReason::Interrupted;
                                    }
                                    continue;
                                }
                                // Retries exhausted: give up on this task for the rest
                                // of the run and move on to the next eligible one,
                                // rather than aborting the whole run over one flaky task.
                                given_up.insert(task_id.clone());
                                attempts.remove(&task_id);
                                continue;
                            }
                            RecoveryAction::Skip => continue,
                            RecoveryAction::Abort => break TerminationReason::Fatal,
                        }
                    } else {
                        attempts.remove(&task_id);
                    }
                }
            }

            if self.config.iteration_delay_ms > 0 {
                let delay = Duration::from_millis(self.config.iteration_delay_ms);
                if self.sleep_honouring_cancel(delay).await {
                    break TerminationReason::Interrupted;
                }
            }
        };

        match reason {
            TerminationReason::Idle | TerminationReason::MaxIterations
                if session.tasks_completed >= session.total_tasks =>
            {
                lifecycle::complete(&mut session, self.clock.as_ref());
            }
            TerminationReason::Interrupted => lifecycle::interrupt(&mut session, self.clock.as_ref()),
            TerminationReason::Fatal => {
                lifecycle::fail(&mut session, "aborted after unrecoverable iteration failure", self.clock.as_ref())
            }
            _ => {}
        }

        // A session's on-disk snapshot is destroyed only on a successful
        // `Completed` terminal; every other outcome (budget stop, interrupt,
        // fatal) leaves it behind so the run is resumable.
        if session.status == ralph_core::SessionStatus::Completed {
            self.store.delete(cwd)?;
        } else {
            self.store.save(cwd, &session)?;
        }

        // `all:complete` precedes `engine:stopped` in the event stream
        // (spec's single-task happy-path scenario fixes this order).
        if matches!(reason, TerminationReason::Idle | TerminationReason::MaxIterations)
            && session.total_tasks > 0
            && session.tasks_completed >= session.total_tasks
        {
            self.bus.emit(&Event::AllComplete {
                total_completed: session.tasks_completed,
                total_iterations: session.current_iteration,
            });
        }

        self.bus.emit(&Event::EngineStopped {
            reason,
            total_iterations: session.current_iteration,
            tasks_completed: session.tasks_completed,
        });

        Ok(RunOutcome { session, reason })
    }

    /// Pauses `session` and persists the paused state.
    pub fn pause(&self, session: &mut Session, cwd: &Path) -> Result<(), StoreError> {
        self.pause.pause();
        lifecycle::pause(session, self.clock.as_ref());
        self.store.save(cwd, session)?;
        self.bus.emit(&Event::EnginePaused { current_iteration: session.current_iteration });
        Ok(())
    }

    /// Resumes a paused `session` and persists the running state.
    pub fn resume(&self, session: &mut Session, cwd: &Path) -> Result<(), StoreError> {
        let from_iteration = session.current_iteration;
        lifecycle::resume(session, self.clock.as_ref());
        self.store.save(cwd, session)?;
        self.pause.resume();
        self.bus.emit(&Event::EngineResumed { from_iteration });
        Ok(())
    }

    /// Returns `true` if the sleep was cut short by cancellation.
    async fn sleep_honouring_cancel(&self, delay: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(delay) => false,
            _ = self.cancel_token.cancelled() => true,
        }
    }
}
