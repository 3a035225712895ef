// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use super::{WorkerThreadError, WorkerThreadOptions};
use crate::{Dispatcher, EventLoop, LivenessState, ScopedRelease, ThreadLiveness};
use std::{sync::{Arc,
                 atomic::{AtomicBool, Ordering},
                 mpsc},
          thread::{self, JoinHandle, ThreadId}};

/// Owns one OS thread that runs [`EventLoop::run()`] until terminated.
///
/// # Lifecycle
///
/// ```text
/// creating thread                          worker thread
/// ───────────────                          ─────────────
/// WorkerThread::new("name")
///   ├── spawn ───────────────────────────► EventLoop::for_current_thread()
///   │                                       ├── guard: mark_terminated on exit
///   ├── block on one-shot handoff ◄──────── ├── send(dispatcher)
///   └── return (dispatcher usable)          └── run() ... executes posted tasks
///
/// terminate() ── post(terminate own loop) ─► run() returns
/// drop / join() ── join ◄──────────────────── thread exits, loop dropped
/// ```
///
/// When construction returns, [`dispatcher()`] already posts successfully: the handoff
/// only completes after the worker's loop exists.
///
/// Dropping a [`WorkerThread`] calls [`terminate()`] and joins, so by the time the drop
/// finishes the worker's loop state is gone. Tasks still queued at that point are dropped
/// without running.
///
/// [`dispatcher()`]: WorkerThread::dispatcher
/// [`terminate()`]: WorkerThread::terminate
#[derive(Debug)]
pub struct WorkerThread {
    name: String,
    thread_id: ThreadId,
    dispatcher: Dispatcher,
    liveness: Arc<ThreadLiveness>,
    terminate_requested: AtomicBool,
    join_handle: Option<JoinHandle<()>>,
}

impl WorkerThread {
    /// Spawns a worker with the given OS thread name.
    ///
    /// # Errors
    ///
    /// See [`with_options()`](WorkerThread::with_options).
    pub fn new(thread_name: &str) -> Result<Self, WorkerThreadError> {
        Self::with_options(WorkerThreadOptions::from(thread_name))
    }

    /// Spawns a worker and blocks until it has published its [`Dispatcher`].
    ///
    /// # Errors
    ///
    /// - [`WorkerThreadError::ThreadSpawn`] if the OS can't create the thread.
    /// - [`WorkerThreadError::HandoffFailed`] if the thread dies before the handoff.
    pub fn with_options(options: WorkerThreadOptions) -> Result<Self, WorkerThreadError> {
        let WorkerThreadOptions { thread_name: name } = options;
        let liveness = Arc::new(ThreadLiveness::new());
        let (handoff_tx, handoff_rx) = mpsc::sync_channel::<Dispatcher>(1);

        let join_handle = thread::Builder::new()
            .name(name.clone())
            .spawn({
                let liveness = Arc::clone(&liveness);
                move || run_worker_loop(&handoff_tx, liveness)
            })
            .map_err(|source| WorkerThreadError::ThreadSpawn {
                name: name.clone(),
                source,
            })?;

        let Ok(dispatcher) = handoff_rx.recv() else {
            // The sender was dropped without sending, so the thread is already on its
            // way out. Reap it before reporting.
            drop(join_handle.join());
            return Err(WorkerThreadError::HandoffFailed { name });
        };

        let thread_id = join_handle.thread().id();
        tracing::debug!(
            message = "WorkerThread started",
            name = %name,
            thread = ?thread_id,
            generation = liveness.generation
        );

        Ok(Self {
            name,
            thread_id,
            dispatcher,
            liveness,
            terminate_requested: AtomicBool::new(false),
            join_handle: Some(join_handle),
        })
    }

    /// The worker loop's [`Dispatcher`]. Clone it to post from other threads.
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher { &self.dispatcher }

    #[must_use]
    pub fn name(&self) -> &str { &self.name }

    #[must_use]
    pub fn thread_id(&self) -> ThreadId { self.thread_id }

    /// [`LivenessState::Terminated`] once the worker's run loop has exited, for any
    /// reason.
    #[must_use]
    pub fn liveness(&self) -> LivenessState { self.liveness.is_running() }

    /// Posts a task that terminates the worker's own loop. Tasks already queued ahead of
    /// it still run. Calling this more than once has no further effect.
    pub fn terminate(&self) {
        if self.terminate_requested.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::debug!(message = "WorkerThread::terminate()", name = %self.name);
        let posted = self
            .dispatcher
            .post_task(|| EventLoop::for_current_thread().terminate());
        if !posted {
            tracing::trace!(
                message = "WorkerThread loop already gone at terminate()",
                name = %self.name
            );
        }
    }

    /// Waits for the worker thread to exit. This does not call [`terminate()`]; some
    /// task has to stop the loop, or this blocks forever.
    ///
    /// # Errors
    ///
    /// [`WorkerThreadError::Panicked`] if a task panicked on the worker.
    ///
    /// [`terminate()`]: WorkerThread::terminate
    pub fn join(mut self) -> Result<(), WorkerThreadError> { self.join_impl() }

    fn join_impl(&mut self) -> Result<(), WorkerThreadError> {
        let Some(join_handle) = self.join_handle.take() else {
            return Ok(());
        };
        join_handle
            .join()
            .map_err(|_| WorkerThreadError::Panicked {
                name: self.name.clone(),
            })
    }
}

impl Drop for WorkerThread {
    fn drop(&mut self) {
        if self.join_handle.is_none() {
            return;
        }
        self.terminate();

        if thread::current().id() == self.thread_id {
            // Dropped from one of its own tasks. Joining here would wait on ourselves;
            // the posted terminate still stops the loop once this task returns.
            tracing::warn!(
                message = "WorkerThread dropped on its own thread, detaching",
                name = %self.name
            );
            drop(self.join_handle.take());
            return;
        }

        if let Err(error) = self.join_impl() {
            tracing::error!(message = "WorkerThread exited abnormally", error = %error);
        }
    }
}

/// The worker thread's body. Creates the loop, hands its dispatcher back to the
/// creator, then runs until terminated.
fn run_worker_loop(handoff_tx: &mpsc::SyncSender<Dispatcher>, liveness: Arc<ThreadLiveness>) {
    let _termination_guard = ScopedRelease::new(move || {
        liveness.mark_terminated();
        tracing::debug!(message = "WorkerThread exiting", generation = liveness.generation);
    });

    let event_loop = EventLoop::for_current_thread();
    if handoff_tx.send(event_loop.dispatcher()).is_err() {
        return;
    }
    event_loop.run();
}
