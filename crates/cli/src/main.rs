// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ralph` — the agent-loop orchestrator's command-line entry point.
//!
//! Three verbs, matching the core's CLI surface (see `DESIGN.md`):
//! `run` starts a brand-new session, `resume` continues a persisted one,
//! `stop` best-effort-signals whichever process currently holds the
//! working directory's lock. Everything else — the event loop, retry
//! policy, persistence — lives in `ralph-engine` and `ralph-storage`;
//! this binary only parses arguments, wires up logging, and translates an
//! `ExitError` into a process exit code.

mod commands;
mod exit_error;
mod logging;
mod output;

use clap::Parser;
use commands::{resume, run, stop};
use exit_error::ExitError;
use output::OutputFormat;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "ralph", version, about = "Autonomous agent-loop orchestrator")]
struct Cli {
    /// Working directory the session, lock, and tracker files live under.
    /// Defaults to the process's current directory.
    #[arg(long, global = true)]
    cwd: Option<PathBuf>,
    /// Output format for progress events and the final summary.
    #[arg(long, value_enum, global = true, default_value = "text")]
    format: OutputFormat,
    /// Increase log verbosity (`-v` = info, `-vv` = debug, `-vvv` = trace).
    /// Overridden by the `RALPH_LOG` env var when set.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Start a new session against a task backlog.
    Run(run::RunArgs),
    /// Continue a persisted session after a pause, an interrupt, or a crash.
    Resume(resume::ResumeArgs),
    /// Best-effort signal to the live holder of this directory's lock.
    Stop(stop::StopArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let cwd = match resolve_cwd(cli.cwd) {
        Ok(cwd) => cwd,
        Err(e) => return exit_with(ExitError::new(1, format!("failed to resolve working directory: {e}"))),
    };

    let result = match cli.command {
        Command::Run(args) => run::handle(args, &cwd, cli.format).await,
        Command::Resume(args) => resume::handle(args, &cwd, cli.format).await,
        Command::Stop(args) => stop::handle(args, &cwd).await,
    };

    match result {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => exit_with(e),
    }
}

fn resolve_cwd(cwd: Option<PathBuf>) -> std::io::Result<PathBuf> {
    match cwd {
        Some(path) => path.canonicalize(),
        None => std::env::current_dir(),
    }
}

fn exit_with(e: ExitError) -> ExitCode {
    eprintln!("ralph: error: {e}");
    ExitCode::from(e.code as u8)
}
