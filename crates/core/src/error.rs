// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy and the recovery action a failure maps to.
//!
//! These are *kinds*, not a single error type: each component (agent runner,
//! tracker, lock manager) has its own `thiserror` error enum and maps its
//! variants onto an [`ErrorKind`] for the engine's `classify` policy.

use serde::{Deserialize, Serialize};

/// Category of failure observed during an iteration, used by the execution
/// engine's retry/skip/abort policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing or invalid plugin selection, unknown model. Fatal before the
    /// loop starts; never retried.
    Configuration,
    /// Agent binary missing, auth failure. Fatal at runtime.
    EnvironmentNotReady,
    /// Network, timeout, I/O glitch, non-deterministic process failure.
    /// Eligible for retry with backoff.
    Transient,
    /// Tracker reports dependencies unmet.
    Blocked,
    /// Induced by the interrupt coordinator; not really an error.
    Cancelled,
}

/// Action the execution engine should take in response to a failed
/// iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    Retry,
    Skip,
    Abort,
}

impl ErrorKind {
    /// The classification policy, expressed as a pure function of
    /// the error's kind alone (the actual retry-budget check — whether
    /// `attempts_for(task) < max_attempts` — lives in the engine, since it
    /// needs mutable per-task state this type doesn't carry).
    pub fn recovery_action(self) -> RecoveryAction {
        match self {
            ErrorKind::Transient => RecoveryAction::Retry,
            ErrorKind::Blocked => RecoveryAction::Skip,
            ErrorKind::Configuration | ErrorKind::EnvironmentNotReady => RecoveryAction::Abort,
            // Cancellation is handled out-of-band by the interrupt coordinator;
            // classify() is never consulted for it, but Abort is the safe default.
            ErrorKind::Cancelled => RecoveryAction::Abort,
        }
    }
}

crate::simple_display! {
    ErrorKind {
        Configuration => "configuration",
        EnvironmentNotReady => "environment_not_ready",
        Transient => "transient",
        Blocked => "blocked",
        Cancelled => "cancelled",
    }
}

crate::simple_display! {
    RecoveryAction {
        Retry => "retry",
        Skip => "skip",
        Abort => "abort",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[yare::parameterized(
        transient = { ErrorKind::Transient, RecoveryAction::Retry },
        blocked = { ErrorKind::Blocked, RecoveryAction::Skip },
        configuration = { ErrorKind::Configuration, RecoveryAction::Abort },
        environment_not_ready = { ErrorKind::EnvironmentNotReady, RecoveryAction::Abort },
        cancelled = { ErrorKind::Cancelled, RecoveryAction::Abort },
    )]
    fn classify_maps_to_recovery_action(kind: ErrorKind, expected: RecoveryAction) {
        assert_eq!(kind.recovery_action(), expected);
    }
}
