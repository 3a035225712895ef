// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::{sync::atomic::{AtomicBool, Ordering},
          thread::{self, ThreadId}};

/// The (thread id, validity flag) pair shared by a [`WeakPtrFactory`] and every
/// [`ThreadAffineWeak`] it hands out.
///
/// The flag is atomic only so the block can be shared through an [`Arc`]; all reads and
/// writes happen on the owner thread, which [`assert_on_owner_thread()`] checks on every
/// access.
///
/// [`Arc`]: std::sync::Arc
/// [`ThreadAffineWeak`]: super::ThreadAffineWeak
/// [`WeakPtrFactory`]: super::WeakPtrFactory
/// [`assert_on_owner_thread()`]: ControlBlock::assert_on_owner_thread
#[derive(Debug)]
pub struct ControlBlock {
    owner_thread_id: ThreadId,
    is_valid: AtomicBool,
}

impl ControlBlock {
    /// A valid block owned by the calling thread.
    #[must_use]
    pub fn new_for_current_thread() -> Self {
        Self {
            owner_thread_id: thread::current().id(),
            is_valid: AtomicBool::new(true),
        }
    }

    /// # Panics
    ///
    /// If called from a thread other than the owner.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.assert_on_owner_thread();
        self.is_valid.load(Ordering::Acquire)
    }

    /// # Panics
    ///
    /// If called from a thread other than the owner.
    pub fn invalidate(&self) {
        self.assert_on_owner_thread();
        self.is_valid.store(false, Ordering::Release);
    }

    #[must_use]
    pub fn owner_thread_id(&self) -> ThreadId { self.owner_thread_id }

    /// # Panics
    ///
    /// If called from a thread other than the owner.
    pub fn assert_on_owner_thread(&self) {
        assert!(
            thread::current().id() == self.owner_thread_id,
            "Thread-affine weak reference used on {:?}, but it belongs to {:?}",
            thread::current().id(),
            self.owner_thread_id
        );
    }
}
