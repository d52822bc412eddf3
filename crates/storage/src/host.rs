// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host identification for the lock file's `host` field.
//!
//! No heavyweight dependency for this: the `HOSTNAME` env var first (set by
//! most shells and all containers worth caring about), falling back to
//! `uname`'s nodename via the `nix` crate we already carry for signal
//! handling.

/// Best-effort identifier for the current host, used to populate
/// [`crate::lock::LockManager`]'s lock records.
pub fn current_host() -> String {
    if let Ok(name) = std::env::var("HOSTNAME") {
        if !name.is_empty() {
            return name;
        }
    }

    if let Ok(uts) = nix::sys::utsname::uname() {
        if let Some(name) = uts.nodename().to_str() {
            if !name.is_empty() {
                return name.to_string();
            }
        }
    }

    "unknown-host".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_empty() {
        assert!(!current_host().is_empty());
    }
}
