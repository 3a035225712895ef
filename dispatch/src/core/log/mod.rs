// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Subscriber setup for the structured [`tracing`] events emitted by the dispatch
//! subsystem. Nothing in the crate requires a subscriber; install one with
//! [`TracingConfig::install_global()`] or, in tests,
//! [`TracingConfig::install_thread_local()`].

// Attach sources.
pub mod rolling_file_appender_impl;
pub mod tracing_config;
pub mod tracing_init;

// Re-export.
pub use tracing_config::*;
pub use tracing_init::*;
