//! Test helpers for behavioral specifications.
//!
//! Black-box DSL for driving the `ralph` binary against a throwaway working
//! directory: a [`Project`] owns a tempdir, seeds `tasks.json`, and hands
//! back a [`CliBuilder`] pre-wired with `--cwd`.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Resolves the built `ralph` binary, mirroring the way the test binary
/// itself is laid out relative to `target/debug`.
fn binary_path() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));

    let llvm_cov_path = manifest_dir.join("target/llvm-cov-target/debug/ralph");
    if llvm_cov_path.exists() {
        return llvm_cov_path;
    }

    let standard = manifest_dir.join("target/debug/ralph");
    if standard.exists() {
        return standard;
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join("ralph");
            if fallback.exists() {
                return fallback;
            }
        }
    }

    standard
}

/// Create a CLI builder for `ralph` commands.
pub fn ralph() -> CliBuilder {
    CliBuilder::new()
}

pub struct CliBuilder {
    args: Vec<String>,
    dir: Option<PathBuf>,
}

impl CliBuilder {
    fn new() -> Self {
        Self { args: Vec::new(), dir: None }
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    pub fn pwd(mut self, path: impl Into<PathBuf>) -> Self {
        self.dir = Some(path.into());
        self
    }

    fn command(self) -> Command {
        let mut cmd = Command::new(binary_path());
        cmd.args(&self.args);
        if let Some(dir) = self.dir {
            cmd.current_dir(dir);
        }
        // Our own tests never want an interactive lock-conflict prompt; the
        // binary already falls back to non-interactive behaviour when
        // stdin isn't a terminal, which is always true for `Command::output`.
        cmd
    }

    pub fn passes(self) -> RunAssert {
        let mut cmd = self.command();
        let output = cmd.output().expect("ralph should run");
        assert!(
            output.status.success(),
            "expected ralph to pass, got exit code {:?}\nstdout: {}\nstderr: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }

    pub fn fails(self) -> RunAssert {
        let mut cmd = self.command();
        let output = cmd.output().expect("ralph should run");
        assert!(
            !output.status.success(),
            "expected ralph to fail, but it passed\nstdout: {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }

    pub fn run(self) -> RunAssert {
        let mut cmd = self.command();
        let output = cmd.output().expect("ralph should run");
        RunAssert { output }
    }
}

pub struct RunAssert {
    output: Output,
}

impl RunAssert {
    pub fn code(&self) -> Option<i32> {
        self.output.status.code()
    }

    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    pub fn stdout_has(self, expected: &str) -> Self {
        let stdout = self.stdout();
        assert!(stdout.contains(expected), "stdout does not contain '{expected}'\nstdout: {stdout}");
        self
    }

    pub fn stderr_has(self, expected: &str) -> Self {
        let stderr = self.stderr();
        assert!(stderr.contains(expected), "stderr does not contain '{expected}'\nstderr: {stderr}");
        self
    }

    pub fn code_eq(self, expected: i32) -> Self {
        assert_eq!(self.code(), Some(expected));
        self
    }
}

/// A throwaway working directory seeded with a `tasks.json` backlog.
pub struct Project {
    dir: tempfile::TempDir,
}

impl Project {
    pub fn empty() -> Self {
        Self { dir: tempfile::tempdir().expect("tempdir") }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn ralph(&self) -> CliBuilder {
        ralph().pwd(self.path())
    }

    /// Write `tasks.json` with `n` open tasks titled `task 1`, `task 2`, ….
    pub fn seed_tasks(&self, n: usize) -> Vec<String> {
        let ids: Vec<String> = (1..=n).map(|i| format!("tsk-{i:04}")).collect();
        let tasks: Vec<_> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| json!({ "id": id, "title": format!("task {}", i + 1), "status": "open", "deps": [] }))
            .collect();
        self.write_tasks(&tasks);
        ids
    }

    /// Overwrite `tasks.json` with an arbitrary JSON array of task objects.
    pub fn write_tasks(&self, tasks: &[serde_json::Value]) {
        std::fs::write(self.path().join("tasks.json"), serde_json::to_vec_pretty(tasks).expect("serialize"))
            .expect("write tasks.json");
    }

    pub fn read_tasks(&self) -> serde_json::Value {
        let bytes = std::fs::read(self.path().join("tasks.json")).expect("read tasks.json");
        serde_json::from_slice(&bytes).expect("parse tasks.json")
    }

    pub fn session_path(&self) -> PathBuf {
        self.path().join(".ralph-tui/session.json")
    }

    pub fn has_session(&self) -> bool {
        self.session_path().is_file()
    }

    pub fn session(&self) -> serde_json::Value {
        let bytes = std::fs::read(self.session_path()).expect("read session.json");
        serde_json::from_slice(&bytes).expect("parse session.json")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.path().join(".ralph-tui/lock")
    }

    /// Write a synthetic `.ralph-tui/lock` naming `pid` as the holder. Using
    /// the current test process's own pid (always alive) simulates a live
    /// conflict without needing to race a second real subprocess; an
    /// unrealistic pid simulates a stale lock left behind by a crash.
    pub fn write_lock(&self, pid: u32, host: &str) {
        std::fs::create_dir_all(self.path().join(".ralph-tui")).expect("mkdir state dir");
        let lock = json!({
            "pid": pid,
            "session_id": uuid::Uuid::new_v4().to_string(),
            "acquired_at_epoch_ms": 0,
            "host": host,
        });
        std::fs::write(self.lock_path(), serde_json::to_vec(&lock).expect("serialize lock")).expect("write lock");
    }

    pub fn write_live_lock(&self) {
        self.write_lock(std::process::id(), &ralph_storage::current_host());
    }

    pub fn write_stale_lock(&self) {
        self.write_lock(999_999, &ralph_storage::current_host());
    }

    /// Write an executable shell script at `name` inside the project
    /// directory and return its absolute path, for use as `--agent`.
    pub fn script(&self, name: &str, body: &str) -> PathBuf {
        let path = self.path().join(name);
        std::fs::write(&path, format!("#!/bin/sh\nset -e\n{body}\n")).expect("write script");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).expect("chmod");
        }
        path
    }
}
