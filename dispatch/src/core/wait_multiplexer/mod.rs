// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! A dedicated thread that multiplexes blocking waits into closure completions. See
//! [`WaitMultiplexer`].
//!
//! The wait itself is injected ([`WaitBackend`], [`WaitWaker`], [`WaitableHandle`]), so
//! the same machinery serves GPU fences, OS events, or anything else with a blocking
//! wait-for-any. [`SignalHub`] is an in-process backend built on a mutex and a condition
//! variable.
//!
//! ```
//! # use r3bl_dispatch::{SignalHub, WaitMultiplexer};
//! # use std::{sync::mpsc, time::Duration};
//! let hub = SignalHub::new();
//! let handle = hub.create_handle();
//! let multiplexer = WaitMultiplexer::new(hub.clone()).unwrap();
//!
//! let (tx, rx) = mpsc::channel();
//! multiplexer
//!     .add_completion_handler(handle.clone(), move || tx.send("done").unwrap())
//!     .unwrap();
//!
//! handle.signal();
//! assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), "done");
//!
//! multiplexer.terminate();
//! multiplexer.join().unwrap();
//! ```

// Attach sources.
mod signal_hub;
mod wait_multiplexer_impl;
mod wm_di_traits;
mod wm_loop;
mod wm_state;
mod wm_types;

#[cfg(test)]
mod tests;

// Re-export.
pub use signal_hub::*;
pub use wait_multiplexer_impl::*;
pub use wm_di_traits::*;
pub use wm_loop::*;
pub use wm_state::*;
pub use wm_types::*;
