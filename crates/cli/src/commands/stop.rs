// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ralph stop` — best-effort signal to the live holder of this working
//! directory's lock. Does not itself wait for the other process to exit;
//! that process's own interrupt coordinator decides how to wind down.

use crate::exit_error::ExitError;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use ralph_storage::LockManager;
use std::path::Path;

#[derive(clap::Args, Debug)]
pub struct StopArgs {}

pub async fn handle(_args: StopArgs, cwd: &Path) -> Result<i32, ExitError> {
    let mgr = LockManager::new();
    let holder = mgr
        .read(cwd)
        .map_err(|e| ExitError::new(1, format!("lock error: {e}")))?
        .ok_or_else(|| ExitError::new(1, "no run is holding this working directory's lock".to_string()))?;

    match kill(Pid::from_raw(holder.pid as i32), Signal::SIGTERM) {
        Ok(()) => {
            println!("sent SIGTERM to pid {} (session {})", holder.pid, holder.session_id);
            Ok(0)
        }
        Err(nix::errno::Errno::ESRCH) => {
            println!("lock holder pid {} is not running; nothing to stop (stale lock)", holder.pid);
            Ok(0)
        }
        Err(e) => Err(ExitError::new(1, format!("failed to signal pid {}: {e}", holder.pid))),
    }
}
