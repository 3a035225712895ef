// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Thread liveness tracking shared by the dedicated threads in this crate. See
//! [`ThreadLiveness`].

use super::LivenessState;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Counter for thread generations. Incremented each time a [`ThreadLiveness`] is
/// created.
///
/// The actual value has no semantic meaning - it's just a counter that makes thread names
/// and log lines of different incarnations distinguishable.
static THREAD_GENERATION: AtomicU32 = AtomicU32::new(0);

/// A tracker for a dedicated thread's liveness and incarnation generation.
///
/// - [`is_running`]: Current liveness (mutable via [`mark_terminated()`])
/// - [`generation`]: Which incarnation of the thread (immutable)
///
/// # Why [`AtomicBool`] Instead of [`Mutex<bool>`]?
///
/// [`is_running()`] is queried while other locks are held (for example while the
/// [`WaitMultiplexer`] registry lock is held to reject a registration). An atomic never
/// blocks, so the dedicated thread can call [`mark_terminated()`] on its way out without
/// any lock ordering concerns.
///
/// [`Mutex<bool>`]: std::sync::Mutex
/// [`WaitMultiplexer`]: crate::WaitMultiplexer
/// [`generation`]: ThreadLiveness::generation
/// [`is_running()`]: ThreadLiveness::is_running
/// [`is_running`]: ThreadLiveness::is_running
/// [`mark_terminated()`]: ThreadLiveness::mark_terminated
#[derive(Debug)]
pub struct ThreadLiveness {
    is_running: AtomicBool,

    /// Thread generation number. Immutable after creation.
    pub generation: u32,
}

impl ThreadLiveness {
    /// Creates new liveness in the [`Running`] state with a fresh generation.
    ///
    /// [`Running`]: LivenessState::Running
    #[must_use]
    pub fn new() -> Self {
        Self {
            is_running: AtomicBool::new(true),
            generation: THREAD_GENERATION
                .fetch_add(1, Ordering::SeqCst)
                .wrapping_add(1),
        }
    }

    /// Called by the dedicated thread's exit guard. After this call, [`is_running()`]
    /// returns [`LivenessState::Terminated`].
    ///
    /// [`is_running()`]: ThreadLiveness::is_running
    pub fn mark_terminated(&self) { self.is_running.store(false, Ordering::SeqCst); }

    #[must_use]
    pub fn is_running(&self) -> LivenessState {
        if self.is_running.load(Ordering::SeqCst) {
            LivenessState::Running
        } else {
            LivenessState::Terminated
        }
    }
}

impl Default for ThreadLiveness {
    fn default() -> Self { Self::new() }
}
