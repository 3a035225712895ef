// Copyright (c) 2023-2025 R3BL LLC. Licensed under Apache License, Version 2.0.

/// Control flow signal for loops and threads.
///
/// A unified type for indicating whether a loop or thread should continue processing or
/// stop. Used across:
/// - [`EventLoop::run()`] drain cycles.
/// - The [`WaitMultiplexer`] thread (one wait cycle at a time).
///
/// [`EventLoop::run()`]: crate::EventLoop::run
/// [`WaitMultiplexer`]: crate::WaitMultiplexer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Continuation {
    /// Continue to the next iteration.
    #[default]
    Continue,

    /// Stop processing and exit the loop/thread.
    Stop,
}

/// An indication of whether a dedicated thread is running or terminated.
///
/// # Why Not Just `bool`?
///
/// `bool` requires remembering what `true` means. With this enum:
/// - [`LivenessState::Running`] is unambiguous
/// - Pattern matching catches all cases
/// - Code reads like documentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessState {
    /// The dedicated thread is running and processing work.
    Running,
    /// The dedicated thread has exited (normally, on a fatal error, or by panicking).
    Terminated,
}
