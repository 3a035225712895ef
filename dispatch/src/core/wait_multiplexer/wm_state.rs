// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use super::{RegistrationError, WaitFailure, WaitPhase, WaitWaker, WaitableHandle};
use crate::{Closure, ThreadLiveness};
use smallvec::SmallVec;
use std::{collections::HashMap,
          sync::{Condvar, Mutex, MutexGuard, PoisonError}};

/// Snapshots up to this many handles without a heap allocation.
pub const INLINE_HANDLE_COUNT: usize = 8;

/// A snapshot of registered handles, or a set of handles found signaled.
pub type HandleSnapshot<H> = SmallVec<[H; INLINE_HANDLE_COUNT]>;

/// Closures collected in one draining pass, invoked after the lock is released.
pub type ReadyClosures = SmallVec<[Closure; INLINE_HANDLE_COUNT]>;

/// The handle → completion map plus the flags the dedicated thread waits on.
#[derive(Debug)]
pub struct WaitRegistry<H: WaitableHandle> {
    entries: HashMap<H, Closure>,
    terminate_requested: bool,
    phase: WaitPhase,
}

impl<H: WaitableHandle> Default for WaitRegistry<H> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            terminate_requested: false,
            phase: WaitPhase::Idle,
        }
    }
}

impl<H: WaitableHandle> WaitRegistry<H> {
    /// Last write wins. Returns the closure that was replaced, for the caller to drop
    /// outside the lock.
    pub fn insert(&mut self, handle: H, closure: Closure) -> Option<Closure> {
        self.entries.insert(handle, closure)
    }

    #[must_use]
    pub fn snapshot_handles(&self) -> HandleSnapshot<H> {
        self.entries.keys().cloned().collect()
    }

    /// Removes each signaled handle and collects its closure.
    ///
    /// # Panics
    ///
    /// If a handle is not registered. Only the dedicated thread removes entries, and it
    /// only checks handles from its own snapshot, so a missing entry means the registry
    /// was corrupted.
    pub fn take_signaled(&mut self, signaled: HandleSnapshot<H>) -> ReadyClosures {
        signaled
            .into_iter()
            .map(|handle| match self.entries.remove(&handle) {
                Some(closure) => closure,
                None => panic!(
                    "Handle {handle:?} was observed signaled but is not in the registry"
                ),
            })
            .collect()
    }

    /// Empties the registry, returning the closures that will never run.
    pub fn take_all(&mut self) -> Vec<Closure> {
        self.entries.drain().map(|(_, closure)| closure).collect()
    }

    #[must_use]
    pub fn contains(&self, handle: &H) -> bool { self.entries.contains_key(handle) }

    #[must_use]
    pub fn len(&self) -> usize { self.entries.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    #[must_use]
    pub fn phase(&self) -> WaitPhase { self.phase }

    pub fn set_phase(&mut self, phase: WaitPhase) { self.phase = phase; }

    #[must_use]
    pub fn is_terminate_requested(&self) -> bool { self.terminate_requested }

    pub fn request_terminate(&mut self) { self.terminate_requested = true; }

    /// Registrations are accepted until terminate is requested or the thread stops.
    #[must_use]
    pub fn is_accepting(&self) -> bool {
        !self.terminate_requested && self.phase != WaitPhase::Stopped
    }
}

/// State shared between the [`WaitMultiplexer`] handle and its dedicated thread.
///
/// # Locking
///
/// One [`Mutex`] guards the [`WaitRegistry`]. It is never held across
/// [`wait_for_any()`] or while completion closures run. The [`Condvar`] parks the
/// dedicated thread while the registry is empty ([`WaitPhase::Idle`]); the [`WaitWaker`]
/// interrupts it while it is blocked in the backend ([`WaitPhase::Waiting`]).
///
/// [`WaitMultiplexer`]: super::WaitMultiplexer
/// [`wait_for_any()`]: super::WaitBackend::wait_for_any
#[allow(missing_debug_implementations)]
pub struct WaitMultiplexerState<H: WaitableHandle, W: WaitWaker> {
    registry: Mutex<WaitRegistry<H>>,
    registry_changed: Condvar,
    pub waker: W,
    pub liveness: ThreadLiveness,
    fatal_error: Mutex<Option<WaitFailure>>,
}

impl<H: WaitableHandle, W: WaitWaker> WaitMultiplexerState<H, W> {
    pub fn new(waker: W) -> Self {
        Self {
            registry: Mutex::new(WaitRegistry::default()),
            registry_changed: Condvar::new(),
            waker,
            liveness: ThreadLiveness::new(),
            fatal_error: Mutex::new(None),
        }
    }

    /// No user code runs under this lock, so a poisoned registry can only come from the
    /// invariant panic in [`WaitRegistry::take_signaled()`], after which the thread is
    /// gone anyway.
    pub fn lock_registry(&self) -> MutexGuard<'_, WaitRegistry<H>> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks while the registry is empty and no terminate was requested.
    pub fn wait_until_not_idle(&self) -> MutexGuard<'_, WaitRegistry<H>> {
        self.registry_changed
            .wait_while(self.lock_registry(), |registry| {
                registry.is_empty() && !registry.is_terminate_requested()
            })
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts under the lock, then wakes the thread whichever way it is blocked.
    ///
    /// # Errors
    ///
    /// [`RegistrationError::MultiplexerStopped`] if no longer accepting.
    pub fn register(&self, handle: H, closure: Closure) -> Result<(), RegistrationError> {
        let replaced = {
            let mut registry = self.lock_registry();
            if !registry.is_accepting() {
                return Err(RegistrationError::MultiplexerStopped {
                    liveness: self.liveness.is_running(),
                });
            }
            let replaced = registry.insert(handle.clone(), closure);
            self.registry_changed.notify_all();
            replaced
        };
        self.waker.wake_and_unblock_wait_thread();

        if let Some(replaced) = replaced {
            tracing::warn!(
                message = "Handle registered twice, previous completion discarded",
                handle = ?handle
            );
            drop(replaced);
        }
        Ok(())
    }

    pub fn request_terminate(&self) {
        {
            let mut registry = self.lock_registry();
            registry.request_terminate();
            self.registry_changed.notify_all();
        }
        self.waker.wake_and_unblock_wait_thread();
    }

    pub fn record_fatal_error(&self, failure: WaitFailure) {
        let mut slot = self.fatal_error.lock().unwrap_or_else(PoisonError::into_inner);
        slot.get_or_insert(failure);
    }

    #[must_use]
    pub fn fatal_error_message(&self) -> Option<String> {
        self.fatal_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(ToString::to_string)
    }

    pub fn take_fatal_error(&self) -> Option<WaitFailure> {
        self.fatal_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}
