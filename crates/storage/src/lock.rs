// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-writer cooperative lock over a working directory.
//!
//! The lock file at `.ralph-tui/lock` names its holder's pid, session id,
//! acquisition time, and host. A lock is stale when its pid is not running
//! on the current host: the next run may then take it over without
//! `--force`. A lock whose pid is alive but whose host differs from the
//! current one is never treated as stale by pid-liveness alone — cross-host
//! takeover is not a supported scenario (see `DESIGN.md`).

use nix::sys::signal::kill;
use nix::unistd::Pid;
use ralph_core::{Clock, LockInfo, SessionId, SystemClock};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("io error at {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("malformed lock file at {path}: {source}")]
    Deserialize { path: PathBuf, source: serde_json::Error },
    #[error("failed to serialize lock: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Caller-supplied knobs for [`LockManager::acquire`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AcquireOptions {
    /// Take the lock even if a live holder is using the same directory.
    pub force: bool,
    /// Headless mode: a conflict is a hard error rather than an interactive prompt.
    pub non_interactive: bool,
}

/// Outcome of an [`LockManager::acquire`] attempt.
#[derive(Debug)]
pub enum AcquireOutcome {
    /// The lock was written; the caller now owns it.
    Acquired,
    /// Another live holder owns the lock and `force` was not set.
    Conflict { holder: LockInfo, stale: bool },
}

/// Whether the pid named by `info` is alive *on this host*. Always `false`
/// for a lock recorded by a different host — liveness cannot be checked
/// remotely, so a foreign-host lock is never auto-reclaimed.
fn is_stale(info: &LockInfo) -> bool {
    if info.host != crate::host::current_host() {
        return false;
    }
    !pid_is_alive(info.pid)
}

/// Signal-0 probe: `ESRCH` means the pid is gone, anything else (including
/// `EPERM`, meaning the pid exists but isn't ours) means it's still alive.
fn pid_is_alive(pid: u32) -> bool {
    match kill(Pid::from_raw(pid as i32), None) {
        Err(nix::errno::Errno::ESRCH) => false,
        _ => true,
    }
}

/// Acquires and releases the `.ralph-tui/lock` file for one working directory.
#[derive(Debug, Clone, Default)]
pub struct LockManager;

impl LockManager {
    pub fn new() -> Self {
        Self
    }

    fn lock_path(cwd: &Path) -> PathBuf {
        cwd.join(crate::STATE_DIR).join("lock")
    }

    /// Read the current lock contents, if any.
    pub fn read(&self, cwd: &Path) -> Result<Option<LockInfo>, LockError> {
        let path = Self::lock_path(cwd);
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(LockError::Io { path, source }),
        };
        let info = serde_json::from_slice(&bytes)
            .map_err(|source| LockError::Deserialize { path: path.clone(), source })?;
        Ok(Some(info))
    }

    /// Attempt to take the lock for `session_id`.
    ///
    /// Succeeds immediately if no lock file exists, if the existing holder
    /// is stale, or if `opts.force` is set. Otherwise reports a `Conflict`
    /// carrying the live holder so the caller can prompt (interactive) or
    /// fail hard (`non_interactive`).
    pub fn acquire(
        &self,
        cwd: &Path,
        session_id: SessionId,
        opts: AcquireOptions,
    ) -> Result<AcquireOutcome, LockError> {
        if let Some(existing) = self.read(cwd)? {
            let stale = is_stale(&existing);
            if !stale && !opts.force {
                return Ok(AcquireOutcome::Conflict { holder: existing, stale });
            }
        }
        self.write(cwd, session_id)?;
        Ok(AcquireOutcome::Acquired)
    }

    fn write(&self, cwd: &Path, session_id: SessionId) -> Result<(), LockError> {
        let dir = cwd.join(crate::STATE_DIR);
        fs::create_dir_all(&dir).map_err(|source| LockError::Io { path: dir.clone(), source })?;

        let info = LockInfo::new(
            std::process::id(),
            session_id,
            SystemClock.epoch_ms(),
            crate::host::current_host(),
        );
        let json = serde_json::to_vec_pretty(&info).map_err(LockError::Serialize)?;

        let path = Self::lock_path(cwd);
        fs::write(&path, json).map_err(|source| LockError::Io { path, source })
    }

    /// Release the lock. Idempotent: releasing an already-released (or
    /// never-acquired) lock is not an error.
    pub fn release(&self, cwd: &Path) -> Result<(), LockError> {
        let path = Self::lock_path(cwd);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(LockError::Io { path, source }),
        }
    }

    /// Install a cleanup that releases the lock when the returned guard
    /// drops — on normal return, on an early `?`-propagated error, or on a
    /// graceful shutdown. A force-quit bypasses this entirely (the process
    /// is reaped by the OS); the next `acquire` recovers via stale-pid
    /// detection rather than relying on any exit-time cleanup.
    pub fn register_cleanup(&self, cwd: &Path) -> LockGuard {
        LockGuard { cwd: cwd.to_path_buf(), manager: self.clone() }
    }
}

/// RAII guard that releases its working directory's lock on drop.
pub struct LockGuard {
    cwd: PathBuf,
    manager: LockManager,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(e) = self.manager.release(&self.cwd) {
            tracing::warn!(error = %e, cwd = %self.cwd.display(), "failed to release lock on cleanup");
        }
    }
}
