// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic durable read/write of the session snapshot.
//!
//! `save` never leaves a partially-written `session.json` visible to a
//! concurrent reader: the new content lands in a sibling `.tmp` file first,
//! is fsynced, then renamed over the target. A crash between those two steps
//! leaves the previous snapshot intact and an orphaned `.tmp` file that the
//! next startup is free to ignore.

use ralph_core::Session;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error at {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("malformed session snapshot at {path}: {source}")]
    Deserialize { path: PathBuf, source: serde_json::Error },
    #[error("failed to serialize session: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Reads and writes the single `session.json` snapshot for one working
/// directory.
#[derive(Debug, Clone, Default)]
pub struct SessionStore;

impl SessionStore {
    pub fn new() -> Self {
        Self
    }

    fn state_dir(cwd: &Path) -> PathBuf {
        cwd.join(crate::STATE_DIR)
    }

    fn session_path(cwd: &Path) -> PathBuf {
        Self::state_dir(cwd).join("session.json")
    }

    fn tmp_path(cwd: &Path) -> PathBuf {
        Self::state_dir(cwd).join("session.json.tmp")
    }

    /// Whether a session snapshot exists for this working directory.
    pub fn has_persisted(&self, cwd: &Path) -> bool {
        Self::session_path(cwd).is_file()
    }

    /// Load the persisted session, if any.
    pub fn load(&self, cwd: &Path) -> Result<Option<Session>, StoreError> {
        let path = Self::session_path(cwd);
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        let session = serde_json::from_slice(&bytes)
            .map_err(|source| StoreError::Deserialize { path: path.clone(), source })?;
        Ok(Some(session))
    }

    /// Atomically persist `session` to `cwd`'s state directory.
    ///
    /// Sequence: create the state dir if needed, write the full snapshot to
    /// `session.json.tmp`, fsync the file, fsync the directory, then rename
    /// the tmp file over `session.json`. The rename is atomic on every
    /// platform this crate ships for.
    pub fn save(&self, cwd: &Path, session: &Session) -> Result<(), StoreError> {
        let span = tracing::info_span!("session_store.save", session_id = %session.session_id);
        let _enter = span.enter();
        let start = std::time::Instant::now();

        let dir = Self::state_dir(cwd);
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io { path: dir.clone(), source })?;

        let tmp = Self::tmp_path(cwd);
        let json = serde_json::to_vec_pretty(session).map_err(StoreError::Serialize)?;

        {
            let mut file =
                File::create(&tmp).map_err(|source| StoreError::Io { path: tmp.clone(), source })?;
            file.write_all(&json).map_err(|source| StoreError::Io { path: tmp.clone(), source })?;
            file.sync_all().map_err(|source| StoreError::Io { path: tmp.clone(), source })?;
        }

        let target = Self::session_path(cwd);
        fs::rename(&tmp, &target)
            .map_err(|source| StoreError::Io { path: target.clone(), source })?;

        // Best-effort: fsync the containing directory so the rename itself
        // is durable, not just the file contents. Not fatal if unsupported.
        if let Ok(dir_file) = File::open(&dir) {
            let _ = dir_file.sync_all();
        }

        tracing::debug!(elapsed_ms = start.elapsed().as_millis() as u64, "session saved");
        Ok(())
    }

    /// Delete the persisted session. Idempotent.
    pub fn delete(&self, cwd: &Path) -> Result<(), StoreError> {
        let path = Self::session_path(cwd);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
