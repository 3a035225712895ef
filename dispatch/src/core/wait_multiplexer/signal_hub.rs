// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! An in-process [`WaitBackend`]: manual-reset events that all share one mutex and one
//! condition variable. Useful on its own for coordinating plain threads, and as the
//! reference backend the multiplexer is tested against.

use super::{WaitBackend, WaitStatus, WaitWaker, WaitableHandle};
use std::{collections::HashSet,
          fmt::{Debug, Formatter},
          hash::{Hash, Hasher},
          sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak},
          time::{Duration, Instant}};

#[derive(Debug, Default)]
struct HubState {
    next_id: u64,
    signaled: HashSet<u64>,
    woken: bool,
    fail_next_wait: Option<String>,
}

#[derive(Debug, Default)]
struct HubInner {
    state: Mutex<HubState>,
    changed: Condvar,
}

impl HubInner {
    fn lock_state(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, f: impl FnOnce(&mut HubState)) {
        let mut state = self.lock_state();
        f(&mut state);
        self.changed.notify_all();
    }
}

/// A family of manual-reset events. Clones share the same events.
///
/// ```
/// # use r3bl_dispatch::{SignalHub, WaitBackend, WaitStatus};
/// # use std::time::Duration;
/// let mut hub = SignalHub::new();
/// let handle = hub.create_handle();
/// assert_eq!(
///     hub.wait_for_any(&[handle.clone()], Duration::from_millis(1)).unwrap(),
///     WaitStatus::TimedOut
/// );
/// handle.signal();
/// assert!(hub.is_signaled(&handle).unwrap());
/// ```
#[derive(Debug, Clone, Default)]
pub struct SignalHub {
    inner: Arc<HubInner>,
}

impl SignalHub {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// A new, unsignaled event belonging to this hub.
    #[must_use]
    pub fn create_handle(&self) -> SignalHandle {
        let mut state = self.inner.lock_state();
        state.next_id += 1;
        SignalHandle {
            id: state.next_id,
            hub: Arc::downgrade(&self.inner),
        }
    }

    /// Makes the next [`wait_for_any()`] call (or the one in progress) fail with `message`.
    ///
    /// [`wait_for_any()`]: WaitBackend::wait_for_any
    pub fn fail_next_wait(&self, message: impl Into<String>) {
        let message = message.into();
        self.inner.update(|state| state.fail_next_wait = Some(message));
    }

    fn owns(&self, handle: &SignalHandle) -> bool {
        std::ptr::eq(handle.hub.as_ptr(), Arc::as_ptr(&self.inner))
    }
}

/// One manual-reset event. Stays signaled until [`reset()`](Self::reset).
///
/// A handle is [valid](WaitableHandle::is_valid) as long as its hub is alive.
#[derive(Clone)]
pub struct SignalHandle {
    id: u64,
    hub: Weak<HubInner>,
}

impl SignalHandle {
    /// Does nothing if the hub is gone.
    pub fn signal(&self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.update(|state| {
                state.signaled.insert(self.id);
            });
        }
    }

    pub fn reset(&self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.update(|state| {
                state.signaled.remove(&self.id);
            });
        }
    }

    #[must_use]
    pub fn is_signaled(&self) -> bool {
        self.hub
            .upgrade()
            .is_some_and(|hub| hub.lock_state().signaled.contains(&self.id))
    }
}

impl PartialEq for SignalHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Weak::ptr_eq(&self.hub, &other.hub)
    }
}

impl Eq for SignalHandle {}

impl Hash for SignalHandle {
    fn hash<S: Hasher>(&self, state: &mut S) { self.id.hash(state); }
}

impl Debug for SignalHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SignalHandle({})", self.id)
    }
}

impl WaitableHandle for SignalHandle {
    fn is_valid(&self) -> bool { self.hub.strong_count() > 0 }
}

/// Interrupts a [`SignalHub::wait_for_any()`](WaitBackend::wait_for_any) in progress,
/// or makes the next one return [`WaitStatus::Woken`] immediately.
#[derive(Debug)]
pub struct SignalHubWaker {
    inner: Arc<HubInner>,
}

impl WaitWaker for SignalHubWaker {
    fn wake_and_unblock_wait_thread(&self) { self.inner.update(|state| state.woken = true); }
}

impl WaitBackend for SignalHub {
    type Handle = SignalHandle;
    type Waker = SignalHubWaker;

    fn create_waker(&self) -> Self::Waker {
        SignalHubWaker {
            inner: Arc::clone(&self.inner),
        }
    }

    fn wait_for_any(
        &mut self,
        handles: &[Self::Handle],
        timeout: Duration,
    ) -> miette::Result<WaitStatus> {
        let deadline = Instant::now() + timeout;
        let mut state = self.inner.lock_state();
        loop {
            if let Some(message) = state.fail_next_wait.take() {
                return Err(miette::miette!("{message}"));
            }
            if handles
                .iter()
                .any(|handle| self.owns(handle) && state.signaled.contains(&handle.id))
            {
                return Ok(WaitStatus::Signaled);
            }
            if std::mem::take(&mut state.woken) {
                return Ok(WaitStatus::Woken);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(WaitStatus::TimedOut);
            }
            state = self
                .inner
                .changed
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    fn is_signaled(&mut self, handle: &Self::Handle) -> miette::Result<bool> {
        Ok(self.owns(handle) && self.inner.lock_state().signaled.contains(&handle.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::thread;

    #[test]
    fn test_signal_and_reset() {
        let hub = SignalHub::new();
        let handle = hub.create_handle();
        assert!(!handle.is_signaled());
        handle.signal();
        assert!(handle.is_signaled());
        handle.reset();
        assert!(!handle.is_signaled());
    }

    #[test]
    fn test_handles_are_distinct_and_hub_scoped() {
        let hub_a = SignalHub::new();
        let hub_b = SignalHub::new();
        let first = hub_a.create_handle();
        let second = hub_a.create_handle();
        let foreign = hub_b.create_handle();
        assert_ne!(first, second);
        // Same id, different hub.
        assert_ne!(first, foreign);
        assert_eq!(first, first.clone());

        foreign.signal();
        let mut hub_a = hub_a;
        assert!(!hub_a.is_signaled(&foreign).unwrap());
    }

    #[test]
    fn test_handle_invalid_after_hub_dropped() {
        let hub = SignalHub::new();
        let handle = hub.create_handle();
        assert!(handle.is_valid());
        drop(hub);
        assert!(!handle.is_valid());
        // Harmless.
        handle.signal();
        assert!(!handle.is_signaled());
    }

    #[test]
    fn test_wait_returns_signaled_from_other_thread() {
        let mut hub = SignalHub::new();
        let handle = hub.create_handle();
        let signaler = {
            let handle = handle.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                handle.signal();
            })
        };
        let status = hub.wait_for_any(&[handle], Duration::from_secs(5)).unwrap();
        signaler.join().unwrap();
        assert_eq!(status, WaitStatus::Signaled);
    }

    #[test]
    fn test_waker_interrupts_wait() {
        let mut hub = SignalHub::new();
        let handle = hub.create_handle();
        let waker = hub.create_waker();
        let start = Instant::now();
        let waking = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            waker.wake_and_unblock_wait_thread();
        });
        let status = hub.wait_for_any(&[handle], Duration::from_secs(5)).unwrap();
        waking.join().unwrap();
        assert_eq!(status, WaitStatus::Woken);
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_wait_times_out() {
        let mut hub = SignalHub::new();
        let handle = hub.create_handle();
        let status = hub
            .wait_for_any(&[handle], Duration::from_millis(10))
            .unwrap();
        assert_eq!(status, WaitStatus::TimedOut);
    }

    #[test]
    fn test_injected_failure_fires_once() {
        let mut hub = SignalHub::new();
        let handle = hub.create_handle();
        hub.fail_next_wait("device lost");
        let error = hub
            .wait_for_any(&[handle.clone()], Duration::from_millis(10))
            .unwrap_err();
        assert!(error.to_string().contains("device lost"));
        assert!(hub.wait_for_any(&[handle], Duration::from_millis(1)).is_ok());
    }
}
