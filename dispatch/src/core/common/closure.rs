// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Deferred units of work: [`Closure`] and [`CopyableClosure`].
//!
//! A [`Closure`] is what every [`Dispatcher`] accepts and what the [`WaitMultiplexer`]
//! invokes on completion. It takes no arguments, returns nothing, and may capture
//! move-only resources. Some interfaces need to hand the same unit of work to several
//! owners (for example a callback slot that is [`Clone`]); [`CopyableClosure`] adapts a
//! move-only [`Closure`] for those cases.
//!
//! [`Dispatcher`]: crate::Dispatcher
//! [`WaitMultiplexer`]: crate::WaitMultiplexer

use std::{fmt::{Debug, Formatter},
          sync::{Arc, Mutex}};

/// The boxed callable stored inside a [`Closure`].
pub type BoxedTask = Box<dyn FnOnce() + Send + 'static>;

/// A movable, argument-less unit of deferred work.
///
/// A [`Closure`] can be *empty* ([`Closure::empty()`], [`Default`]). Posting an empty
/// closure is a caller-input error: [`Dispatcher::post_task()`] rejects it and returns
/// `false`, and [`WaitMultiplexer::add_completion_handler()`] returns
/// [`RegistrationError::EmptyClosure`].
///
/// Running consumes the closure, so the subsystem can never invoke the same instance
/// twice.
///
/// ```
/// # use r3bl_dispatch::Closure;
/// # use std::sync::{Arc, atomic::{AtomicBool, Ordering}};
/// let flag = Arc::new(AtomicBool::new(false));
/// let closure = Closure::new({
///     let flag = Arc::clone(&flag);
///     move || flag.store(true, Ordering::SeqCst)
/// });
/// assert!(!closure.is_empty());
/// closure.run();
/// assert!(flag.load(Ordering::SeqCst));
/// ```
///
/// [`Dispatcher::post_task()`]: crate::Dispatcher::post_task
/// [`RegistrationError::EmptyClosure`]: crate::RegistrationError::EmptyClosure
/// [`WaitMultiplexer::add_completion_handler()`]: crate::WaitMultiplexer::add_completion_handler
#[derive(Default)]
pub struct Closure {
    task: Option<BoxedTask>,
}

impl Closure {
    pub fn new(task: impl FnOnce() + Send + 'static) -> Self {
        Self {
            task: Some(Box::new(task)),
        }
    }

    /// A closure that holds no work.
    #[must_use]
    pub const fn empty() -> Self { Self { task: None } }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.task.is_none() }

    /// Runs the work, if any. Returns `true` if something was executed.
    pub fn run(self) -> bool {
        match self.task {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }
}

impl Debug for Closure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Closure")
            .field("is_empty", &self.is_empty())
            .finish()
    }
}

impl<F> From<F> for Closure
where
    F: FnOnce() + Send + 'static,
{
    fn from(task: F) -> Self { Self::new(task) }
}

/// Adapts a move-only [`Closure`] so it can be cloned.
///
/// All clones share one slot. The first [`run()`] among all the clones takes the work out
/// of the slot and executes it; every later call finds the slot empty and returns
/// `false`. This mirrors the "run at most once" contract of [`Closure`] while satisfying
/// interfaces that demand [`Clone`].
///
/// [`run()`]: CopyableClosure::run
#[derive(Clone, Default)]
pub struct CopyableClosure {
    slot: Arc<Mutex<Option<BoxedTask>>>,
}

impl CopyableClosure {
    pub fn new(closure: Closure) -> Self {
        Self {
            slot: Arc::new(Mutex::new(closure.task)),
        }
    }

    /// Whether the shared work has already been taken (or was never there).
    #[must_use]
    pub fn is_spent(&self) -> bool {
        self.slot.lock().map(|slot| slot.is_none()).unwrap_or(true)
    }

    /// Runs the shared work if no clone has run it yet.
    ///
    /// The work executes with the slot lock released, so the work may itself clone or
    /// drop this [`CopyableClosure`].
    pub fn run(&self) -> bool {
        let maybe_task = match self.slot.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };
        match maybe_task {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }
}

impl Debug for CopyableClosure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CopyableClosure")
            .field("is_spent", &self.is_spent())
            .field("shared_by", &Arc::strong_count(&self.slot))
            .finish()
    }
}

impl From<Closure> for CopyableClosure {
    fn from(closure: Closure) -> Self { Self::new(closure) }
}

impl From<CopyableClosure> for Closure {
    fn from(copyable: CopyableClosure) -> Self {
        Closure::new(move || {
            copyable.run();
        })
    }
}
