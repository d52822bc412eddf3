// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ralph run` — start a brand-new session against a task backlog.

use super::EngineArgs;
use crate::exit_error::ExitError;
use crate::output::OutputFormat;
use ralph_adapters::agent::shell::ShellAgent;
use ralph_adapters::tracker::json::JsonTracker;
use ralph_adapters::{Agent, Tracker};
use ralph_core::{SessionId, SystemClock};
use ralph_engine::lifecycle;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Program invoked as the coding agent; it reads the prompt on stdin.
    #[arg(long)]
    pub agent: String,
    /// Extra argument passed to the agent program (repeatable).
    #[arg(long = "agent-arg")]
    pub agent_args: Vec<String>,
    /// JSON file holding the task backlog this run tracks progress against.
    #[arg(long, default_value = "tasks.json")]
    pub tracker_file: PathBuf,
    /// Model identifier passed through to the agent's prompt context.
    #[arg(long)]
    pub model: Option<String>,
    #[arg(long)]
    pub epic_id: Option<String>,
    #[arg(long)]
    pub prd_path: Option<String>,
    #[command(flatten)]
    pub engine: EngineArgs,
}

pub async fn handle(args: RunArgs, cwd: &Path, format: OutputFormat) -> Result<i32, ExitError> {
    let tracker_path = cwd.join(&args.tracker_file);
    if !tracker_path.exists() {
        return Err(ExitError::new(
            1,
            format!("tracker file not found: {} — create a JSON task list before starting a run", tracker_path.display()),
        ));
    }
    let tracker: Arc<dyn Tracker> =
        Arc::new(JsonTracker::load(&tracker_path).map_err(|e| ExitError::new(1, format!("failed to load tasks: {e}")))?);

    let session_id = SessionId::new();
    let _lock = super::acquire_lock(cwd, session_id, args.engine.force, args.engine.non_interactive)?;

    let task_snapshot =
        tracker.get_tasks(None).await.map_err(|e| ExitError::new(1, format!("failed to read tasks: {e}")))?;

    let session = lifecycle::create(
        lifecycle::CreateParams {
            agent_plugin: args.agent.clone(),
            tracker_plugin: args.tracker_file.display().to_string(),
            model: args.model.clone(),
            epic_id: args.epic_id.clone(),
            prd_path: args.prd_path.clone(),
            max_iterations: args.engine.max_iterations,
            cwd: cwd.to_path_buf(),
            task_snapshot,
        },
        &SystemClock,
    );

    let agent: Arc<dyn Agent> = Arc::new(ShellAgent::new(args.agent.clone(), args.agent_args.clone()));
    super::drive(agent, tracker, session, &args.engine, cwd, format).await
}
