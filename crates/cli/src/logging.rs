// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Global `tracing` subscriber setup.
//!
//! Verbosity is gated by `RALPH_LOG` (an `EnvFilter` directive string, e.g.
//! `ralph_engine=debug`) with `-v`/`-vv` raising the default level when the
//! env var isn't set, mirroring the teacher CLI's env-gated log verbosity.

use tracing_subscriber::EnvFilter;

pub fn init(verbosity: u8) {
    let default_directive = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("RALPH_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
