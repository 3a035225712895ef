// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// Connect to source file.
pub mod common;
pub mod event_loop;
pub mod ffi_peer;
pub mod log;
pub mod thread_affine;
pub mod wait_multiplexer;
pub mod worker_thread;

// Re-export.
pub use common::*;
pub use event_loop::*;
pub use ffi_peer::*;
pub use log::*;
pub use thread_affine::*;
pub use wait_multiplexer::*;
pub use worker_thread::*;
