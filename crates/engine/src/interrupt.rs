// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Two-phase, debounced interrupt handling.
//!
//! The coordinator's external surface is a set of callbacks supplied at
//! construction — `on_confirm`, `on_cancel`, `on_force_quit`,
//! `on_show_prompt`, `on_hide_prompt` — rather than fields mutated after the
//! fact by whichever component happens to be wiring up the UI. A single
//! `cancel_token` is shared with the rest of the engine; `on_confirm` and
//! `on_force_quit` both cancel it, so every suspension point downstream
//! (sleeps, the agent runner, persistence) wakes from the same signal.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Pending,
}

pub struct InterruptConfig {
    pub double_press_window_ms: u64,
}

impl Default for InterruptConfig {
    fn default() -> Self {
        Self { double_press_window_ms: 1000 }
    }
}

type Callback = Box<dyn Fn() + Send + Sync>;

/// Signal/keypress-driven two-phase shutdown state machine.
///
/// `Idle --interrupt--> Pending --interrupt (within window)--> ForceQuit`
/// `Pending --confirm--> Confirmed` (graceful shutdown)
/// `Pending --cancel or timer expiry--> Cancelled --> Idle`
pub struct InterruptCoordinator {
    config: InterruptConfig,
    state: Mutex<State>,
    /// Bumped on every transition into `Pending`; a pending-window timer
    /// task compares this against its captured generation so a stale timer
    /// (from an already-resolved `Pending`) never fires spuriously.
    generation: Arc<std::sync::atomic::AtomicU64>,
    cancel_token: CancellationToken,
    on_confirm: Callback,
    on_cancel: Callback,
    on_force_quit: Callback,
    on_show_prompt: Callback,
    on_hide_prompt: Callback,
}

impl InterruptCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: InterruptConfig,
        cancel_token: CancellationToken,
        on_confirm: impl Fn() + Send + Sync + 'static,
        on_cancel: impl Fn() + Send + Sync + 'static,
        on_force_quit: impl Fn() + Send + Sync + 'static,
        on_show_prompt: impl Fn() + Send + Sync + 'static,
        on_hide_prompt: impl Fn() + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            state: Mutex::new(State::Idle),
            generation: Arc::new(std::sync::atomic::AtomicU64::new(0)),
            cancel_token,
            on_confirm: Box::new(on_confirm),
            on_cancel: Box::new(on_cancel),
            on_force_quit: Box::new(on_force_quit),
            on_show_prompt: Box::new(on_show_prompt),
            on_hide_prompt: Box::new(on_hide_prompt),
        })
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Register a signal or keyboard-quit event. In headless mode a single
    /// interrupt commits straight to graceful shutdown (no dialog wait); a
    /// second interrupt within the window is always force-quit regardless
    /// of mode.
    pub fn interrupt(self: &Arc<Self>, headless: bool) {
        let mut state = self.state.lock();
        match *state {
            State::Idle => {
                *state = State::Pending;
                let generation = self.generation.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
                drop(state);
                (self.on_show_prompt)();

                if headless {
                    // Headless: a single interrupt commits to graceful shutdown
                    // immediately; the window below still catches a rapid
                    // second press as force-quit.
                    self.confirm();
                } else {
                    let this = self.clone();
                    let window = Duration::from_millis(self.config.double_press_window_ms);
                    tokio::spawn(async move {
                        tokio::time::sleep(window).await;
                        this.expire(generation);
                    });
                }
            }
            State::Pending => {
                drop(state);
                self.force_quit();
            }
        }
    }

    /// Operator confirmed graceful shutdown (e.g. answered the dialog).
    pub fn confirm(self: &Arc<Self>) {
        let mut state = self.state.lock();
        if *state != State::Pending {
            return;
        }
        *state = State::Idle;
        drop(state);
        self.cancel_token.cancel();
        (self.on_confirm)();
    }

    /// Operator cancelled the pending interrupt (e.g. dismissed the dialog).
    pub fn cancel(self: &Arc<Self>) {
        let mut state = self.state.lock();
        if *state != State::Pending {
            return;
        }
        *state = State::Idle;
        drop(state);
        (self.on_hide_prompt)();
        (self.on_cancel)();
    }

    fn force_quit(self: &Arc<Self>) {
        *self.state.lock() = State::Idle;
        self.cancel_token.cancel();
        (self.on_force_quit)();
    }

    fn expire(self: &Arc<Self>, generation: u64) {
        if self.generation.load(std::sync::atomic::Ordering::SeqCst) != generation {
            return; // a newer interrupt (or a resolution) already moved past this one
        }
        self.cancel();
    }

    #[cfg(test)]
    fn is_pending(&self) -> bool {
        *self.state.lock() == State::Pending
    }
}
