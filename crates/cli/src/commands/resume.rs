// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ralph resume` — continue a persisted session after a pause, an
//! interrupt, or a crash.

use super::EngineArgs;
use crate::exit_error::ExitError;
use crate::output::OutputFormat;
use ralph_adapters::agent::shell::ShellAgent;
use ralph_adapters::tracker::json::JsonTracker;
use ralph_adapters::{Agent, Tracker};
use ralph_core::SystemClock;
use ralph_engine::lifecycle;
use ralph_storage::SessionStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(clap::Args, Debug)]
pub struct ResumeArgs {
    /// Program invoked as the coding agent; must match the interrupted run.
    #[arg(long)]
    pub agent: String,
    /// Extra argument passed to the agent program (repeatable).
    #[arg(long = "agent-arg")]
    pub agent_args: Vec<String>,
    /// JSON file holding the task backlog this run tracks progress against.
    #[arg(long, default_value = "tasks.json")]
    pub tracker_file: PathBuf,
    #[command(flatten)]
    pub engine: EngineArgs,
}

pub async fn handle(args: ResumeArgs, cwd: &Path, format: OutputFormat) -> Result<i32, ExitError> {
    let store = SessionStore::new();
    let mut session = store
        .load(cwd)
        .map_err(|e| ExitError::new(1, format!("failed to read session state: {e}")))?
        .ok_or_else(|| ExitError::new(1, "no persisted session found in this directory".to_string()))?;

    if !session.is_resumable() {
        return Err(ExitError::new(
            1,
            format!("session {} is not resumable ({:?})", session.session_id, session.status),
        ));
    }

    let tracker_path = cwd.join(&args.tracker_file);
    let tracker: Arc<dyn Tracker> =
        Arc::new(JsonTracker::load(&tracker_path).map_err(|e| ExitError::new(1, format!("failed to load tasks: {e}")))?);

    let _lock = super::acquire_lock(cwd, session.session_id, args.engine.force, args.engine.non_interactive)?;

    if format == OutputFormat::Text {
        println!("{}", lifecycle::summary(&session));
    }

    lifecycle::resume(&mut session, &SystemClock);

    let agent: Arc<dyn Agent> = Arc::new(ShellAgent::new(args.agent.clone(), args.agent_args.clone()));
    super::drive(agent, tracker, session, &args.engine, cwd, format).await
}
