// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The body of the multiplexer's dedicated thread. See [`WaitLoop::wait_once()`].

use super::{HandleSnapshot, ReadyClosures, WaitBackend, WaitFailure, WaitMultiplexerState,
            WaitPhase};
use crate::{Continuation, ScopedRelease};
use std::{sync::Arc, time::Duration};

type SharedState<B> =
    Arc<WaitMultiplexerState<<B as WaitBackend>::Handle, <B as WaitBackend>::Waker>>;

/// Owns the backend on the dedicated thread and runs one wait cycle per
/// [`wait_once()`](Self::wait_once) call.
pub struct WaitLoop<B: WaitBackend> {
    backend: B,
    state: SharedState<B>,
    wait_timeout: Duration,
}

impl<B: WaitBackend> std::fmt::Debug for WaitLoop<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitLoop")
            .field("wait_timeout", &self.wait_timeout)
            .finish_non_exhaustive()
    }
}

impl<B: WaitBackend> WaitLoop<B> {
    pub fn new(backend: B, state: SharedState<B>, wait_timeout: Duration) -> Self {
        Self {
            backend,
            state,
            wait_timeout,
        }
    }

    /// One trip around Idle → Waiting → Draining.
    ///
    /// 1. Idle: block until the registry is non-empty (or terminate is requested), then
    ///    snapshot its handles.
    /// 2. Waiting: release the lock and call [`wait_for_any()`] with the bounded timeout.
    /// 3. Draining: ask [`is_signaled()`] about *every* handle in the snapshot, remove
    ///    the signaled ones under the lock, release it, and invoke their closures.
    ///
    /// Returns [`Continuation::Stop`] on terminate or on a backend error (which is
    /// recorded as the fatal [`WaitFailure`]).
    ///
    /// [`is_signaled()`]: WaitBackend::is_signaled
    /// [`wait_for_any()`]: WaitBackend::wait_for_any
    pub fn wait_once(&mut self) -> Continuation {
        let handles: HandleSnapshot<B::Handle> = {
            let mut registry = self.state.wait_until_not_idle();
            if registry.is_terminate_requested() {
                return Continuation::Stop;
            }
            registry.set_phase(WaitPhase::Waiting);
            registry.snapshot_handles()
        };

        let status = match self.backend.wait_for_any(&handles, self.wait_timeout) {
            Ok(status) => status,
            Err(report) => return self.fail(report),
        };
        tracing::trace!(message = "wait_for_any() returned", ?status, handles = handles.len());

        let mut signaled: HandleSnapshot<B::Handle> = HandleSnapshot::new();
        for handle in handles {
            match self.backend.is_signaled(&handle) {
                Ok(true) => signaled.push(handle),
                Ok(false) => {}
                Err(report) => return self.fail(report),
            }
        }

        let ready: ReadyClosures = {
            let mut registry = self.state.lock_registry();
            registry.set_phase(WaitPhase::Draining);
            let ready = registry.take_signaled(signaled);
            registry.set_phase(WaitPhase::Idle);
            ready
        };

        if !ready.is_empty() {
            tracing::trace!(message = "Invoking completions", count = ready.len());
        }
        for closure in ready {
            closure.run();
        }

        Continuation::Continue
    }

    fn fail(&self, report: miette::Report) -> Continuation {
        tracing::error!(
            message = "Wait primitive failed, wait multiplexer thread is stopping",
            error = %report
        );
        self.state.record_fatal_error(WaitFailure::new(report));
        Continuation::Stop
    }
}

/// Runs [`WaitLoop::wait_once()`] until it returns [`Continuation::Stop`].
///
/// On exit (including unwinding from a panicking completion closure), the registry is
/// closed to new registrations, the closures still registered are dropped without
/// running, and liveness is marked terminated.
pub fn run_wait_loop<B: WaitBackend>(mut wait_loop: WaitLoop<B>) {
    let _termination_guard = ScopedRelease::new({
        let state = Arc::clone(&wait_loop.state);
        move || {
            let never_fired = {
                let mut registry = state.lock_registry();
                registry.set_phase(WaitPhase::Stopped);
                registry.take_all()
            };
            state.liveness.mark_terminated();
            tracing::debug!(
                message = "Wait multiplexer thread exited",
                generation = state.liveness.generation,
                dropped_registrations = never_fired.len()
            );
            drop(never_fired);
        }
    });

    while wait_loop.wait_once() == Continuation::Continue {}
}
