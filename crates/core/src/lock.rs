// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk representation of the single-writer lock.
//!
//! The lock itself is acquired/released by `ralph-storage::lock`; this
//! module only defines the data shape stored at `.ralph-tui/lock`.

use crate::session::SessionId;
use serde::{Deserialize, Serialize};

/// Contents of the `.ralph-tui/lock` file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    pub pid: u32,
    pub session_id: SessionId,
    pub acquired_at_epoch_ms: u64,
    pub host: String,
}

impl LockInfo {
    pub fn new(pid: u32, session_id: SessionId, acquired_at_epoch_ms: u64, host: impl Into<String>) -> Self {
        Self { pid, session_id, acquired_at_epoch_ms, host: host.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let info = LockInfo::new(1234, SessionId::new(), 1_700_000_000_000, "host-a");
        let json = serde_json::to_string(&info).unwrap();
        let restored: LockInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(info, restored);
    }
}
