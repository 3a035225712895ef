// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use super::ControlBlock;
use std::{fmt::{Debug, Formatter},
          sync::{Arc, Weak}};

/// A non-owning reference handed out by a [`WeakPtrFactory`].
///
/// It may be moved to other threads (for example captured by a posted task, so the task
/// can hop back and check it), but it may only be *resolved* on the thread that created
/// the factory. Every method checks the calling thread and panics on any other.
///
/// It resolves only while the factory is alive and has not called
/// [`invalidate_weak_ptrs()`].
///
/// [`WeakPtrFactory`]: super::WeakPtrFactory
/// [`invalidate_weak_ptrs()`]: super::WeakPtrFactory::invalidate_weak_ptrs
pub struct ThreadAffineWeak<T> {
    control_block: Arc<ControlBlock>,
    target: Weak<T>,
}

impl<T> ThreadAffineWeak<T> {
    pub(super) fn new(control_block: Arc<ControlBlock>, target: Weak<T>) -> Self {
        Self {
            control_block,
            target,
        }
    }

    /// # Panics
    ///
    /// If called from a thread other than the factory's.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.control_block.is_valid() && self.target.strong_count() > 0
    }

    /// A strong reference, or [`None`] once invalidated.
    ///
    /// # Panics
    ///
    /// If called from a thread other than the factory's.
    #[must_use]
    pub fn upgrade(&self) -> Option<Arc<T>> {
        if self.control_block.is_valid() {
            self.target.upgrade()
        } else {
            None
        }
    }

    /// Runs `f` on the target if the reference is still valid.
    ///
    /// # Panics
    ///
    /// If called from a thread other than the factory's.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.upgrade().map(|target| f(&target))
    }
}

impl<T> Clone for ThreadAffineWeak<T> {
    fn clone(&self) -> Self {
        Self {
            control_block: Arc::clone(&self.control_block),
            target: Weak::clone(&self.target),
        }
    }
}

impl<T> Debug for ThreadAffineWeak<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadAffineWeak")
            .field("owner_thread_id", &self.control_block.owner_thread_id())
            .finish_non_exhaustive()
    }
}
