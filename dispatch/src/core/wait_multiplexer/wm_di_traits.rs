// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The injected capabilities a [`WaitMultiplexer`] is built on. The multiplexer knows
//! nothing about what a handle *is* (a GPU fence, an OS event, a child process); it only
//! needs a blocking wait-for-any, a per-handle signaled check, and a way to interrupt the
//! blocking wait.
//!
//! [`WaitMultiplexer`]: super::WaitMultiplexer

use std::{fmt::Debug, hash::Hash, time::Duration};

/// An opaque, caller-defined token for something that becomes "ready" asynchronously.
///
/// Handles are registry keys, so they must be cheap to [`Clone`] and compare. A handle
/// for which [`is_valid()`] returns `false` is rejected at registration with
/// [`RegistrationError::InvalidHandle`].
///
/// [`RegistrationError::InvalidHandle`]: super::RegistrationError::InvalidHandle
/// [`is_valid()`]: Self::is_valid
pub trait WaitableHandle: Clone + Eq + Hash + Debug + Send + 'static {
    fn is_valid(&self) -> bool { true }
}

/// What a single [`WaitBackend::wait_for_any()`] call observed.
///
/// This is only a hint: after every wait, the multiplexer asks
/// [`WaitBackend::is_signaled()`] about every handle in the snapshot, since a backend
/// may wake for one handle while others are also ready, or report coarser status than
/// requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStatus {
    /// At least one handle is signaled.
    Signaled,
    /// The timeout elapsed with nothing signaled.
    TimedOut,
    /// A [`WaitWaker`] interrupted the wait.
    Woken,
}

/// The blocking wait primitive. Owned exclusively by the multiplexer's dedicated thread.
///
/// # Two-phase setup
///
/// The [`WaitWaker`] must be able to interrupt *this* backend's wait, so it is created
/// from the backend before the backend moves to the dedicated thread:
///
/// ```text
/// WaitMultiplexer::new(backend)
///   ├── backend.create_waker() ──► waker stays shared (registration, terminate)
///   └── spawn(move backend) ─────► dedicated thread calls wait_for_any() in a loop
/// ```
///
/// # Trait Bounds - [`Send`] + `'static`
///
/// - ✓ [`Send`]: moves from the constructing thread to the dedicated thread.
/// - ✓ `'static`: required for [`std::thread::spawn()`].
/// - ✗ No [`Sync`] needed, the dedicated thread is the only user.
pub trait WaitBackend: Send + 'static {
    type Handle: WaitableHandle;

    type Waker: WaitWaker;

    fn create_waker(&self) -> Self::Waker;

    /// Blocks until any of `handles` is signaled, the waker fires, or `timeout` elapses.
    /// `handles` is never empty.
    ///
    /// # Errors
    ///
    /// Any error is treated as unrecoverable: the multiplexer thread records it and
    /// exits permanently.
    fn wait_for_any(
        &mut self,
        handles: &[Self::Handle],
        timeout: Duration,
    ) -> miette::Result<WaitStatus>;

    /// Whether `handle` is signaled right now. Must not block.
    ///
    /// # Errors
    ///
    /// Treated the same as a [`wait_for_any()`](Self::wait_for_any) failure.
    fn is_signaled(&mut self, handle: &Self::Handle) -> miette::Result<bool>;
}

/// Interrupts a blocked [`WaitBackend::wait_for_any()`] so the dedicated thread
/// re-reads the registry (new registration) or observes a terminate request.
///
/// A no-op implementation is acceptable: the bounded wait timeout in
/// [`WaitMultiplexerConfig`] still guarantees progress, only slower.
///
/// [`WaitMultiplexerConfig`]: super::WaitMultiplexerConfig
pub trait WaitWaker: Send + Sync + 'static {
    fn wake_and_unblock_wait_thread(&self);
}
