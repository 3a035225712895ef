// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use super::{RegistrationError, WaitBackend, WaitFailure, WaitLoop, WaitMultiplexerConfig,
            WaitMultiplexerError, WaitMultiplexerState, WaitPhase, WaitableHandle,
            run_wait_loop};
use crate::{Closure, Dispatcher, LivenessState};
use std::{fmt::{Debug, Formatter},
          panic,
          sync::Arc,
          thread::{self, JoinHandle}};

/// Turns blocking waits on a dynamic set of handles into closure completions.
///
/// A dedicated thread owns the injected [`WaitBackend`] and loops through the
/// [`WaitPhase`]s: it parks while nothing is registered, waits for any registered handle
/// (bounded by [`WaitMultiplexerConfig::wait_timeout`]), then removes every handle that is
/// actually signaled and invokes its closure with no lock held. A completion closure may
/// therefore register more handlers, or post continuation work to any [`Dispatcher`].
///
/// ```text
/// any thread                          wait multiplexer thread
/// ──────────                          ───────────────────────
/// add_completion_handler(h, c) ──┐
///   insert under lock            │    Idle ── registry non-empty ──► snapshot handles
///   wake (condvar + waker) ──────┴──►   │
///                                     Waiting: wait_for_any(snapshot, timeout)
///                                       │
///                                     Draining: is_signaled(h)? remove → collect c
///                                       │
///                                     invoke collected closures (unlocked)
/// ```
///
/// # Caller contract
///
/// - Register each handle at most once until its completion fires. A second
///   registration replaces the first closure (last write wins, logged as a warning).
/// - Register before the handle can be signaled. A manual-reset handle that was already
///   signaled simply fires on the next cycle; an auto-reset handle that fired before
///   registration is lost.
///
/// # Fatal failure
///
/// If [`wait_for_any()`] or [`is_signaled()`] returns an error, the thread records a
/// [`WaitFailure`] and exits permanently. Registered closures are dropped without
/// running, new registrations fail with [`RegistrationError::MultiplexerStopped`], and
/// [`join()`] returns the failure to the owner.
///
/// [`is_signaled()`]: WaitBackend::is_signaled
/// [`join()`]: WaitMultiplexer::join
/// [`wait_for_any()`]: WaitBackend::wait_for_any
pub struct WaitMultiplexer<B: WaitBackend> {
    state: Arc<WaitMultiplexerState<B::Handle, B::Waker>>,
    thread_name: String,
    join_handle: Option<JoinHandle<()>>,
}

impl<B: WaitBackend> WaitMultiplexer<B> {
    /// Starts the dedicated thread with [`WaitMultiplexerConfig::default()`].
    ///
    /// # Errors
    ///
    /// [`WaitMultiplexerError::ThreadSpawn`] if the OS can't create the thread.
    pub fn new(backend: B) -> Result<Self, WaitMultiplexerError> {
        Self::with_config(backend, WaitMultiplexerConfig::default())
    }

    /// Starts the dedicated thread.
    ///
    /// # Errors
    ///
    /// [`WaitMultiplexerError::ThreadSpawn`] if the OS can't create the thread.
    pub fn with_config(
        backend: B,
        config: WaitMultiplexerConfig,
    ) -> Result<Self, WaitMultiplexerError> {
        let WaitMultiplexerConfig {
            thread_name,
            wait_timeout,
        } = config;

        // Two-phase setup: the waker comes from the backend before it moves away.
        let state = Arc::new(WaitMultiplexerState::new(backend.create_waker()));
        let wait_loop = WaitLoop::new(backend, Arc::clone(&state), wait_timeout);

        let join_handle = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || run_wait_loop(wait_loop))
            .map_err(|source| WaitMultiplexerError::ThreadSpawn {
                name: thread_name.clone(),
                source,
            })?;

        tracing::debug!(
            message = "WaitMultiplexer started",
            name = %thread_name,
            generation = state.liveness.generation,
            ?wait_timeout
        );

        Ok(Self {
            state,
            thread_name,
            join_handle: Some(join_handle),
        })
    }

    /// Registers `closure` to run on the multiplexer thread once `handle` is signaled.
    ///
    /// # Errors
    ///
    /// - [`RegistrationError::InvalidHandle`] if `handle` is not valid.
    /// - [`RegistrationError::EmptyClosure`] if `closure` is empty.
    /// - [`RegistrationError::MultiplexerStopped`] after [`terminate()`] or a fatal
    ///   failure.
    ///
    /// Nothing is registered when an error is returned.
    ///
    /// [`terminate()`]: WaitMultiplexer::terminate
    pub fn add_completion_handler(
        &self,
        handle: B::Handle,
        closure: impl Into<Closure>,
    ) -> Result<(), RegistrationError> {
        if !handle.is_valid() {
            return Err(RegistrationError::InvalidHandle);
        }
        let closure = closure.into();
        if closure.is_empty() {
            return Err(RegistrationError::EmptyClosure);
        }
        self.state.register(handle, closure)
    }

    /// Like [`add_completion_handler()`], except the completion is posted to
    /// `dispatcher`'s loop instead of running on the multiplexer thread. If that loop is
    /// gone by then, the completion is dropped.
    ///
    /// # Errors
    ///
    /// Same as [`add_completion_handler()`].
    ///
    /// [`add_completion_handler()`]: WaitMultiplexer::add_completion_handler
    pub fn add_completion_handler_on(
        &self,
        handle: B::Handle,
        dispatcher: &Dispatcher,
        closure: impl Into<Closure>,
    ) -> Result<(), RegistrationError> {
        let closure = closure.into();
        if closure.is_empty() {
            return Err(RegistrationError::EmptyClosure);
        }
        let dispatcher = dispatcher.clone();
        self.add_completion_handler(handle, move || {
            if !dispatcher.post_task(closure) {
                tracing::debug!(
                    message = "Completion dropped, target loop is gone",
                    target_thread = ?dispatcher.target_thread_id()
                );
            }
        })
    }

    #[must_use]
    pub fn liveness(&self) -> LivenessState { self.state.liveness.is_running() }

    #[must_use]
    pub fn phase(&self) -> WaitPhase { self.state.lock_registry().phase() }

    /// How many handles are registered and not yet signaled.
    #[must_use]
    pub fn pending_count(&self) -> usize { self.state.lock_registry().len() }

    #[must_use]
    pub fn is_registered(&self, handle: &B::Handle) -> bool {
        self.state.lock_registry().contains(handle)
    }

    /// The recorded [`WaitFailure`], rendered, if the wait primitive has failed.
    #[must_use]
    pub fn fatal_error(&self) -> Option<String> { self.state.fatal_error_message() }

    #[must_use]
    pub fn thread_name(&self) -> &str { &self.thread_name }

    /// Asks the thread to exit after its current cycle and wakes it. Completions that
    /// have not fired yet never will. Calling this more than once has no further effect.
    pub fn terminate(&self) {
        tracing::debug!(message = "WaitMultiplexer::terminate()", name = %self.thread_name);
        self.state.request_terminate();
    }

    /// Waits for the thread to exit. Call [`terminate()`] first, unless the intent is to
    /// wait for a fatal failure.
    ///
    /// # Errors
    ///
    /// The [`WaitFailure`] if the thread stopped because the wait primitive failed.
    ///
    /// # Panics
    ///
    /// Resumes the panic if the thread panicked (a completion closure panicked, or the
    /// registry invariant was violated).
    ///
    /// [`terminate()`]: WaitMultiplexer::terminate
    pub fn join(mut self) -> Result<(), WaitFailure> {
        if let Some(join_handle) = self.join_handle.take() {
            if let Err(payload) = join_handle.join() {
                panic::resume_unwind(payload);
            }
        }
        self.state.take_fatal_error().map_or(Ok(()), Err)
    }
}

impl<B: WaitBackend> Drop for WaitMultiplexer<B> {
    fn drop(&mut self) {
        let Some(join_handle) = self.join_handle.take() else {
            return;
        };
        self.terminate();

        if thread::current().id() == join_handle.thread().id() {
            tracing::warn!(
                message = "WaitMultiplexer dropped on its own thread, detaching",
                name = %self.thread_name
            );
            return;
        }

        if join_handle.join().is_err() {
            tracing::error!(
                message = "WaitMultiplexer thread panicked",
                name = %self.thread_name
            );
        }
        if let Some(failure) = self.state.take_fatal_error() {
            tracing::error!(
                message = "WaitMultiplexer dropped after a fatal wait failure",
                name = %self.thread_name,
                error = %failure
            );
        }
    }
}

impl<B: WaitBackend> Debug for WaitMultiplexer<B> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitMultiplexer")
            .field("thread_name", &self.thread_name)
            .field("liveness", &self.liveness())
            .field("pending_count", &self.pending_count())
            .finish_non_exhaustive()
    }
}
