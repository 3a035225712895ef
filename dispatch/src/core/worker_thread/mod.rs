// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! A dedicated OS thread running one [`EventLoop`] to completion. See [`WorkerThread`].
//!
//! [`EventLoop`]: crate::EventLoop

// Attach sources.
mod worker_thread_impl;
mod worker_thread_types;

#[cfg(test)]
mod tests;

// Re-export.
pub use worker_thread_impl::*;
pub use worker_thread_types::*;
