// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Per-thread run loops and the thread-safe handles used to post work onto them.
//!
//! - [`EventLoop`]: one per thread, drains its [`TaskQueue`] on the owning thread.
//! - [`Dispatcher`]: clonable, [`Send`] + [`Sync`] handle that posts [`Closure`]s onto a
//!   specific loop from any thread.
//! - [`TaskQueue`]: the lock-protected FIFO between them.
//!
//! ```
//! # use r3bl_dispatch::{EventLoop, RunOutcome};
//! # use std::sync::{Arc, Mutex};
//! let event_loop = EventLoop::for_current_thread();
//! let dispatcher = event_loop.dispatcher();
//! let log = Arc::new(Mutex::new(Vec::new()));
//!
//! for it in ["a", "b", "c"] {
//!     let log = Arc::clone(&log);
//!     assert!(dispatcher.post_task(move || log.lock().unwrap().push(it)));
//! }
//! assert!(dispatcher.post_task(|| EventLoop::for_current_thread().terminate()));
//!
//! assert_eq!(event_loop.run(), RunOutcome::Terminated);
//! assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
//! ```
//!
//! [`Closure`]: crate::Closure

// Attach sources.
mod dispatcher;
mod event_loop_impl;
mod task_queue;

#[cfg(test)]
mod tests;

// Re-export.
pub use dispatcher::*;
pub use event_loop_impl::*;
pub use task_queue::*;
