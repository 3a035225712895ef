// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! # r3bl_dispatch
//!
//! Cross-thread task dispatch. Any thread can post a [`Closure`] onto any other thread
//! that runs an [`EventLoop`], and blocking waits on many handles are folded into a
//! single dedicated thread that turns each signal into a closure completion.
//!
//! # Table of contents
//!
//! <!-- TOC -->
//! - [Architecture](#architecture)
//! - [Posting work to another thread](#posting-work-to-another-thread)
//! - [Waiting on handles](#waiting-on-handles)
//! - [Logging](#logging)
//! <!-- /TOC -->
//!
//! # Architecture
//!
//! ```text
//!   any thread                          owner thread
//! ┌─────────────┐  post_task(closure)  ┌────────────┐   run() / flush_tasks_now()
//! │ Dispatcher  │ ───────────────────► │ TaskQueue  │ ─────────────────────────►  closures
//! │ (Weak, Send)│                      │ (Mutex +   │                             run here
//! └─────────────┘                      │  Condvar)  │ ◄── owned by EventLoop
//!                                      └────────────┘
//!
//!   WaitMultiplexer thread
//! ┌──────────────────────────────┐ signaled ┌───────────────────────┐
//! │ backend.wait_for_any(handles)│ ───────► │ completion closure    │ ── optionally
//! │ (woken on new registrations) │          │ (runs on this thread) │    posted to a
//! └──────────────────────────────┘          └───────────────────────┘    Dispatcher
//! ```
//!
//! | Piece                      | Role                                                      |
//! | :------------------------- | :-------------------------------------------------------- |
//! | [`EventLoop`]              | one per thread, drains posted tasks in FIFO order         |
//! | [`Dispatcher`]             | `Send + Sync` handle that posts onto one loop             |
//! | [`WorkerThread`]           | a named thread running its own loop; joined on drop       |
//! | [`WaitMultiplexer`]        | one thread waiting on many [`WaitableHandle`]s            |
//! | [`WeakPtrFactory`]         | hands out [`ThreadAffineWeak`] references                 |
//! | [`RefCountedPeer`]         | manual ref counting for objects crossing an FFI boundary  |
//!
//! # Posting work to another thread
//!
//! ```
//! # use r3bl_dispatch::{EventLoop, RunOutcome, WorkerThread};
//! # use std::sync::{Arc, Mutex};
//! let worker = WorkerThread::new("render").unwrap();
//! let main_loop = EventLoop::for_current_thread();
//! let seen = Arc::new(Mutex::new(Vec::new()));
//!
//! let posted = worker.dispatcher().post_task_and_reply(
//!     {
//!         let seen = Arc::clone(&seen);
//!         move || seen.lock().unwrap().push("on worker")
//!     },
//!     {
//!         let seen = Arc::clone(&seen);
//!         move || {
//!             seen.lock().unwrap().push("back on main");
//!             EventLoop::for_current_thread().terminate();
//!         }
//!     },
//! );
//! assert!(posted);
//! assert_eq!(main_loop.run(), RunOutcome::Terminated);
//! assert_eq!(*seen.lock().unwrap(), vec!["on worker", "back on main"]);
//! ```
//!
//! # Waiting on handles
//!
//! [`WaitMultiplexer`] is generic over a [`WaitBackend`]. [`SignalHub`] is the
//! in-process backend; see the [`wait_multiplexer`] module for an example.
//!
//! # Logging
//!
//! Everything logs through [`tracing`]. Install a subscriber with [`TracingConfig`]:
//!
//! ```
//! # use r3bl_dispatch::TracingConfig;
//! # use tracing_core::LevelFilter;
//! let _guard = TracingConfig::new_display(LevelFilter::DEBUG)
//!     .install_thread_local()
//!     .unwrap();
//! ```

// Enforce strict error handling in production library code only. Tests are allowed to
// use .unwrap() (workspace `Cargo.toml` config allows it).
#![cfg_attr(not(test), deny(clippy::unwrap_in_result))]

// Attach modules (re-exported below to provide clean public API).
pub mod core;

// Re-export.
pub use core::*;
