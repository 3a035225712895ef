// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

/// Default OS thread name for a [`WorkerThread`].
///
/// [`WorkerThread`]: super::WorkerThread
pub const DEFAULT_WORKER_THREAD_NAME: &str = "dispatch-worker";

/// Configuration for [`WorkerThread::with_options()`].
///
/// [`WorkerThread::with_options()`]: super::WorkerThread::with_options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerThreadOptions {
    /// Name given to the OS thread. Shows up in debuggers, panic messages, and the
    /// thread name field of log lines.
    pub thread_name: String,
}

impl Default for WorkerThreadOptions {
    fn default() -> Self {
        Self {
            thread_name: DEFAULT_WORKER_THREAD_NAME.into(),
        }
    }
}

impl From<&str> for WorkerThreadOptions {
    fn from(thread_name: &str) -> Self {
        Self {
            thread_name: thread_name.into(),
        }
    }
}

/// Errors from creating or joining a [`WorkerThread`].
///
/// [`WorkerThread`]: super::WorkerThread
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum WorkerThreadError {
    /// The OS refused to create the thread.
    #[error("Failed to spawn worker thread '{name}'")]
    #[diagnostic(
        code(r3bl_dispatch::worker_thread::spawn),
        help("Check OS thread limits, eg: `ulimit -u` on Linux.")
    )]
    ThreadSpawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// The spawned thread exited (or panicked) before publishing its dispatcher.
    #[error("Worker thread '{name}' exited before handing off its dispatcher")]
    #[diagnostic(code(r3bl_dispatch::worker_thread::handoff))]
    HandoffFailed { name: String },

    /// A task running on the worker panicked, which unwound out of the run loop.
    #[error("Worker thread '{name}' panicked")]
    #[diagnostic(
        code(r3bl_dispatch::worker_thread::panicked),
        help("The panic message was printed to stderr by the default panic hook.")
    )]
    Panicked { name: String },
}
