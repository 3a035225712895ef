// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! [RAII] guard that runs a [`Closure`] when it leaves scope. See [`ScopedRelease`].
//!
//! [RAII]: https://en.wikipedia.org/wiki/Resource_acquisition_is_initialization

use super::Closure;

/// Runs its [`Closure`] unconditionally when dropped.
///
/// "Unconditionally" includes early returns, `?` propagation, and unwinding from a
/// panic. The dedicated threads in this crate use it to publish their terminated state
/// no matter how their loop exits:
///
/// ```text
/// thread body ──► ScopedRelease::new(mark_terminated)
///      │
///      ├── loop returns normally ──┐
///      ├── loop hits a fatal error ┼──► guard dropped ──► mark_terminated()
///      └── loop panics (unwind) ───┘
/// ```
///
/// ```
/// # use r3bl_dispatch::{Closure, ScopedRelease};
/// # use std::sync::{Arc, atomic::{AtomicBool, Ordering}};
/// let released = Arc::new(AtomicBool::new(false));
/// {
///     let released = Arc::clone(&released);
///     let _guard = ScopedRelease::new(move || released.store(true, Ordering::SeqCst));
/// }
/// assert!(released.load(Ordering::SeqCst));
/// ```
///
/// [RAII]: https://en.wikipedia.org/wiki/Resource_acquisition_is_initialization
#[derive(Debug)]
#[must_use = "dropping the guard immediately runs the release closure"]
pub struct ScopedRelease {
    on_release: Option<Closure>,
}

impl ScopedRelease {
    pub fn new(on_release: impl Into<Closure>) -> Self {
        Self {
            on_release: Some(on_release.into()),
        }
    }
}

impl Drop for ScopedRelease {
    fn drop(&mut self) {
        if let Some(closure) = self.on_release.take() {
            closure.run();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc,
                    atomic::{AtomicUsize, Ordering}};

    fn counting_guard(counter: &Arc<AtomicUsize>) -> ScopedRelease {
        let counter = Arc::clone(counter);
        ScopedRelease::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_runs_on_normal_scope_exit() {
        let counter = Arc::new(AtomicUsize::new(0));
        {
            let _guard = counting_guard(&counter);
            assert_eq!(counter.load(Ordering::SeqCst), 0);
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_runs_on_early_return() {
        fn early_exit(counter: &Arc<AtomicUsize>, bail: bool) -> Option<()> {
            let _guard = counting_guard(counter);
            if bail {
                return None;
            }
            Some(())
        }

        let counter = Arc::new(AtomicUsize::new(0));
        assert!(early_exit(&counter, true).is_none());
        assert!(early_exit(&counter, false).is_some());
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_runs_during_unwind() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = Arc::clone(&counter);
        let join_result = std::thread::spawn(move || {
            let _guard = counting_guard(&counter_clone);
            panic!("deliberate panic for testing");
        })
        .join();

        assert!(join_result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_empty_closure_is_harmless() {
        let guard = ScopedRelease::new(Closure::empty());
        drop(guard);
    }
}
