// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations.

pub mod resume;
pub mod run;
pub mod stop;

use crate::exit_error::ExitError;
use crate::output::OutputFormat;
use ralph_adapters::{Agent, Tracker};
use ralph_core::{Clock, Event, OutputStream, Session, SessionId, SystemClock};
use ralph_engine::{AgentRunner, EventBus, ExecutionEngine, InterruptConfig, InterruptCoordinator, IterationController, RunOutcome};
use ralph_storage::lock::{AcquireOptions, LockGuard};
use ralph_storage::{AcquireOutcome, LockManager, SessionStore};
use std::io::IsTerminal;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;

/// Engine knobs shared by `run` and `resume` (budget, pacing, retry policy,
/// lock takeover). Flattened into both subcommands' arg structs so they
/// stay in lockstep rather than drifting into two slightly different flag
/// sets.
#[derive(clap::Args, Debug, Clone)]
pub struct EngineArgs {
    /// Maximum number of iterations to run. 0 = unbounded.
    #[arg(long, default_value_t = 0)]
    pub max_iterations: u64,
    /// Delay between iterations, in milliseconds.
    #[arg(long, default_value_t = 0)]
    pub iteration_delay_ms: u64,
    /// Retries a transient failure gets before the task is abandoned.
    #[arg(long, default_value_t = 3)]
    pub retry_max_attempts: u32,
    /// Base delay before the first retry, in milliseconds.
    #[arg(long, default_value_t = 1000)]
    pub retry_initial_delay_ms: u64,
    /// Upper bound on the exponential backoff delay, in milliseconds.
    #[arg(long, default_value_t = 30_000)]
    pub retry_backoff_cap_ms: u64,
    /// Take over the working directory's lock even if another run holds it.
    #[arg(long)]
    pub force: bool,
    /// Fail on a lock conflict instead of prompting interactively.
    #[arg(long)]
    pub non_interactive: bool,
}

impl EngineArgs {
    pub fn run_config(&self) -> ralph_engine::RunConfig {
        ralph_engine::RunConfig {
            max_iterations: self.max_iterations,
            iteration_delay_ms: self.iteration_delay_ms,
            retry: ralph_engine::RetryConfig {
                max_attempts: self.retry_max_attempts,
                initial_delay_ms: self.retry_initial_delay_ms,
                backoff_cap_ms: self.retry_backoff_cap_ms,
            },
        }
    }
}

/// Acquires the working directory's lock for `session_id`, prompting
/// interactively on a live conflict unless `non_interactive` or stdin isn't
/// a terminal.
pub(crate) fn acquire_lock(
    cwd: &Path,
    session_id: SessionId,
    force: bool,
    non_interactive: bool,
) -> Result<LockGuard, ExitError> {
    let mgr = LockManager::new();
    let opts = AcquireOptions { force, non_interactive };
    let outcome = mgr.acquire(cwd, session_id, opts).map_err(|e| ExitError::new(1, format!("lock error: {e}")))?;

    match outcome {
        AcquireOutcome::Acquired => Ok(mgr.register_cleanup(cwd)),
        AcquireOutcome::Conflict { holder, stale } => {
            if non_interactive || !std::io::stdin().is_terminal() {
                return Err(ExitError::new(
                    1,
                    format!(
                        "lock held by pid {} on {} (stale={stale}); pass --force to take over",
                        holder.pid, holder.host
                    ),
                ));
            }
            eprintln!(
                "another run holds the lock (pid {}, host {}, stale={stale}). Take over? [y/N]",
                holder.pid, holder.host
            );
            let mut line = String::new();
            std::io::stdin()
                .read_line(&mut line)
                .map_err(|e| ExitError::new(1, format!("failed to read confirmation: {e}")))?;
            if matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes") {
                mgr.acquire(cwd, session_id, AcquireOptions { force: true, non_interactive })
                    .map_err(|e| ExitError::new(1, format!("failed to take over lock: {e}")))?;
                Ok(mgr.register_cleanup(cwd))
            } else {
                Err(ExitError::new(1, "lock conflict; aborted".to_string()))
            }
        }
    }
}

/// Wires a cancellation token through an [`InterruptCoordinator`] and a
/// SIGINT/SIGTERM listener: one signal commits to graceful shutdown
/// (headless mode — see `ralph_engine::interrupt`), and a second signal of
/// either kind, arriving any time before the first has finished unwinding,
/// force-quits immediately. The coordinator's own double-press window is
/// built for an interactive dialog; a second-signal-anytime rule is the
/// simpler and more predictable contract for a headless process (see
/// `DESIGN.md`).
fn install_signal_handlers(cancel_token: CancellationToken) -> std::io::Result<()> {
    let coordinator = InterruptCoordinator::new(
        InterruptConfig::default(),
        cancel_token,
        || {},
        || {},
        || {
            tracing::warn!("force quit");
            std::process::exit(137);
        },
        || eprintln!("interrupt received, shutting down gracefully (press again to force quit)"),
        || {},
    );

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let already_signalled = Arc::new(AtomicBool::new(false));

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = sigterm.recv() => {}
                _ = sigint.recv() => {}
            }
            if already_signalled.swap(true, Ordering::SeqCst) {
                tracing::warn!("second interrupt received, forcing immediate exit");
                std::process::exit(137);
            }
            coordinator.interrupt(true);
        }
    });
    Ok(())
}

fn install_event_printer(bus: &EventBus, format: OutputFormat) {
    bus.subscribe(move |event| match format {
        OutputFormat::Json => {
            if let Ok(line) = serde_json::to_string(event) {
                println!("{line}");
            }
        }
        OutputFormat::Text => print_event_text(event),
    });
}

fn print_event_text(event: &Event) {
    match event {
        Event::EngineStarted { total_tasks } => println!("ralph: starting run with {total_tasks} task(s)"),
        Event::EnginePaused { current_iteration } => println!("ralph: paused at iteration {current_iteration}"),
        Event::EngineResumed { from_iteration } => println!("ralph: resumed from iteration {from_iteration}"),
        Event::EngineStopped { reason, total_iterations, tasks_completed } => {
            println!("ralph: stopped ({reason}) after {total_iterations} iteration(s), {tasks_completed} completed")
        }
        Event::IterationStarted { iteration, task } => println!("[{iteration}] running agent on {} — {}", task.id, task.title),
        Event::IterationCompleted { result } => {
            if result.task_completed {
                println!("[{}] task completed ({}ms)", result.iteration, result.duration_ms);
            } else {
                println!("[{}] iteration finished, task still open ({}ms)", result.iteration, result.duration_ms);
            }
        }
        Event::IterationFailed { iteration, error, action, .. } => {
            println!("[{iteration}] iteration failed: {error} (action={action})")
        }
        Event::IterationRetrying { iteration, retry_attempt, max_retries, delay_ms, .. } => {
            println!("[{iteration}] retrying ({retry_attempt}/{max_retries}) after {delay_ms}ms")
        }
        Event::IterationSkipped { reason, .. } => println!("ralph: skipped iteration ({reason})"),
        Event::AgentOutput { stream, data } => match stream {
            OutputStream::Stdout => println!("  {data}"),
            OutputStream::Stderr => eprintln!("  {data}"),
        },
        Event::TaskSelected { task, iteration } => println!("[{iteration}] selected {} — {}", task.id, task.title),
        Event::TaskCompleted { task_id, iteration } => println!("[{iteration}] {task_id} -> completed"),
        Event::AllComplete { total_completed, total_iterations } => {
            println!("ralph: all {total_completed} task(s) complete in {total_iterations} iteration(s)")
        }
    }
}

fn exit_code_for(outcome: &RunOutcome) -> i32 {
    use ralph_core::SessionStatus;
    match outcome.session.status {
        SessionStatus::Completed => 0,
        SessionStatus::Failed => 1,
        SessionStatus::Interrupted => 130,
        SessionStatus::Paused | SessionStatus::Running => 0,
    }
}

/// Wires a tracker, an agent and a session into an [`ExecutionEngine`] and
/// drives it to completion. Shared by `run` and `resume` — everything that
/// differs between them (session construction, the lock conflict message)
/// happens before this is called.
pub(crate) async fn drive(
    agent: Arc<dyn Agent>,
    tracker: Arc<dyn Tracker>,
    session: Session,
    engine_args: &EngineArgs,
    cwd: &Path,
    format: OutputFormat,
) -> Result<i32, ExitError> {
    let bus = EventBus::new();
    install_event_printer(&bus, format);

    let runner = AgentRunner::new(agent, bus.clone());
    let controller = IterationController::new(tracker, runner, bus.clone());
    let store = SessionStore::new();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let cancel_token = CancellationToken::new();

    install_signal_handlers(cancel_token.clone())
        .map_err(|e| ExitError::new(1, format!("failed to install signal handlers: {e}")))?;

    let engine = ExecutionEngine::new(controller, bus, store, clock, engine_args.run_config(), cancel_token);

    let outcome = engine.run(session, cwd).await.map_err(|e| ExitError::new(1, format!("run failed: {e}")))?;

    if format == OutputFormat::Text {
        println!("{}", ralph_engine::lifecycle::summary(&outcome.session));
    }

    Ok(exit_code_for(&outcome))
}
