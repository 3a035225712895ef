// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::LivenessState;
use std::time::Duration;

/// Default OS thread name for a [`WaitMultiplexer`].
///
/// [`WaitMultiplexer`]: super::WaitMultiplexer
pub const DEFAULT_WAIT_THREAD_NAME: &str = "wait-multiplexer";

/// Default upper bound on a single [`wait_for_any()`] call.
///
/// [`wait_for_any()`]: super::WaitBackend::wait_for_any
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_millis(50);

/// Configuration for [`WaitMultiplexer::with_config()`].
///
/// [`WaitMultiplexer::with_config()`]: super::WaitMultiplexer::with_config
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitMultiplexerConfig {
    pub thread_name: String,
    /// Bounds every blocking wait, so the thread re-observes terminate requests and new
    /// registrations even if the backend's waker does nothing.
    pub wait_timeout: Duration,
}

impl Default for WaitMultiplexerConfig {
    fn default() -> Self {
        Self {
            thread_name: DEFAULT_WAIT_THREAD_NAME.into(),
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
        }
    }
}

/// Where the dedicated thread is in its cycle.
///
/// ```text
///         ┌──────────── registry non-empty ───────────┐
///         │                                            ▼
///       Idle ◄──── registry empty ──── Draining ◄── Waiting
///         │                               │            ▲
///         │                               └── else ────┘
///         └─ terminate / fatal error ──► Stopped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitPhase {
    /// Registry empty, blocked until a registration (or terminate) arrives.
    #[default]
    Idle,
    /// Blocked in [`wait_for_any()`] over a snapshot of the registry.
    ///
    /// [`wait_for_any()`]: super::WaitBackend::wait_for_any
    Waiting,
    /// Checking which handles are signaled, and collecting their closures.
    Draining,
    /// The thread has exited. Registrations are rejected.
    Stopped,
}

/// Why [`WaitMultiplexer::add_completion_handler()`] rejected a registration. No state
/// was changed.
///
/// [`WaitMultiplexer::add_completion_handler()`]: super::WaitMultiplexer::add_completion_handler
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, miette::Diagnostic)]
pub enum RegistrationError {
    #[error("The waitable handle is not valid")]
    #[diagnostic(code(r3bl_dispatch::wait_multiplexer::invalid_handle))]
    InvalidHandle,

    #[error("The completion closure is empty")]
    #[diagnostic(code(r3bl_dispatch::wait_multiplexer::empty_closure))]
    EmptyClosure,

    #[error("The wait multiplexer is not accepting registrations ({liveness:?})")]
    #[diagnostic(
        code(r3bl_dispatch::wait_multiplexer::stopped),
        help(
            "The multiplexer was terminated, or its wait primitive failed. \
             Check WaitMultiplexer::fatal_error()."
        )
    )]
    MultiplexerStopped { liveness: LivenessState },
}

/// Errors from creating a [`WaitMultiplexer`].
///
/// [`WaitMultiplexer`]: super::WaitMultiplexer
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum WaitMultiplexerError {
    #[error("Failed to spawn wait multiplexer thread '{name}'")]
    #[diagnostic(code(r3bl_dispatch::wait_multiplexer::thread_spawn))]
    #[cfg_attr(
        target_os = "linux",
        diagnostic(help(
            "The system may have reached its thread limit - \
             check `ulimit -u` for per-user limit, \
             `cat /proc/sys/kernel/threads-max` for system-wide limit"
        ))
    )]
    ThreadSpawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// The fatal condition recorded when the injected wait primitive fails. After this, the
/// multiplexer's thread is gone for good: no pending or future completion will fire.
///
/// The inner [`miette::Report`] preserves the backend's full error chain.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
#[error("Wait multiplexer thread stopped, the wait primitive failed: {report}")]
#[diagnostic(
    code(r3bl_dispatch::wait_multiplexer::wait_failed),
    help(
        "Completions registered on this instance will never fire. \
         Create a new WaitMultiplexer to recover."
    )
)]
pub struct WaitFailure {
    pub report: miette::Report,
}

impl WaitFailure {
    #[must_use]
    pub fn new(report: miette::Report) -> Self { Self { report } }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = WaitMultiplexerConfig::default();
        assert_eq!(config.thread_name, "wait-multiplexer");
        assert_eq!(config.wait_timeout, Duration::from_millis(50));
    }

    #[test]
    fn test_wait_failure_message_includes_backend_report() {
        let failure = WaitFailure::new(miette::miette!("device lost"));
        assert!(failure.to_string().contains("device lost"));
    }
}
