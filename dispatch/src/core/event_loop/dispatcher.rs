// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use super::{EventLoop, PushOutcome, TaskQueue};
use crate::Closure;
use std::{sync::{Arc, Weak},
          thread::{self, ThreadId}};
use tokio::sync::oneshot;

/// A thread-safe handle that posts [`Closure`]s onto one specific [`EventLoop`].
///
/// Obtain one with [`EventLoop::dispatcher()`] on the target thread, or from
/// [`WorkerThread::dispatcher()`], then clone it freely and hand it to any thread.
///
/// # Outliving the loop
///
/// A [`Dispatcher`] only holds a [`Weak`] reference to the loop's [`TaskQueue`]. Once
/// the [`EventLoop`] is dropped (its thread exited), [`post_task()`] returns `false` and
/// drops the closure without running it. There is never a crash and never a task that
/// is silently queued forever.
///
/// ```text
/// ┌─────────────── thread T ───────────────┐
/// │ EventLoop ──Arc──► TaskQueue           │
/// └────────────────────────▲───────────────┘
///                          │ Weak
///        Dispatcher (clone on thread A), Dispatcher (clone on thread B), ...
/// ```
///
/// # Identity
///
/// Every clone of the dispatcher of one loop compares equal with [`PartialEq`], so the
/// handle returned by [`EventLoop::dispatcher()`] has a stable identity for the loop's
/// lifetime.
///
/// [`WorkerThread::dispatcher()`]: crate::WorkerThread::dispatcher
/// [`post_task()`]: Dispatcher::post_task
#[derive(Debug, Clone)]
pub struct Dispatcher {
    task_queue: Weak<TaskQueue>,
    target_thread_id: ThreadId,
}

impl Dispatcher {
    pub(super) fn new(task_queue: &Arc<TaskQueue>, target_thread_id: ThreadId) -> Self {
        Self {
            task_queue: Arc::downgrade(task_queue),
            target_thread_id,
        }
    }

    /// Enqueues `task` on the target loop and wakes it.
    ///
    /// Returns `false` and performs no work if `task` is empty, or if the target loop no
    /// longer exists. Safe to call from any thread, including the target thread itself
    /// (from inside a running task).
    #[must_use]
    pub fn post_task(&self, task: impl Into<Closure>) -> bool {
        let task = task.into();
        if task.is_empty() {
            tracing::debug!(
                message = "Dispatcher::post_task() rejected an empty closure",
                target_thread = ?self.target_thread_id
            );
            return false;
        }

        let Some(task_queue) = self.task_queue.upgrade() else {
            tracing::trace!(
                message = "Dispatcher::post_task() target loop is gone",
                target_thread = ?self.target_thread_id
            );
            return false;
        };

        match task_queue.push(task) {
            PushOutcome::Queued => true,
            PushOutcome::Closed => {
                tracing::trace!(
                    message = "Dispatcher::post_task() target loop is shutting down",
                    target_thread = ?self.target_thread_id
                );
                false
            }
        }
    }

    /// Runs `task` on the target loop, then posts `reply` back to the loop of the thread
    /// that called this method.
    ///
    /// The calling thread's [`EventLoop`] is created if it doesn't exist yet; the caller
    /// is responsible for running or flushing it so the reply executes. Returns `false`
    /// without running anything if either closure is empty or if `task` can't be posted.
    /// If the calling thread's loop is gone by the time `task` finishes, `reply` is
    /// dropped.
    #[must_use]
    pub fn post_task_and_reply(
        &self,
        task: impl Into<Closure>,
        reply: impl Into<Closure>,
    ) -> bool {
        let (task, reply) = (task.into(), reply.into());
        if task.is_empty() || reply.is_empty() {
            return false;
        }

        let reply_to = EventLoop::for_current_thread().dispatcher();
        self.post_task(move || {
            task.run();
            if !reply_to.post_task(reply) {
                tracing::debug!(
                    message = "Reply dropped, origin loop is gone",
                    origin_thread = ?reply_to.target_thread_id()
                );
            }
        })
    }

    /// Runs `f` on the target loop and delivers its return value through a
    /// [`oneshot`] channel, so async code can `.await` work done on a dedicated thread.
    ///
    /// Returns [`None`] if the task could not be posted. If the target loop stops before
    /// running `f`, the sender is dropped and awaiting the receiver yields an error.
    #[must_use]
    pub fn post_task_with_result<R, F>(&self, f: F) -> Option<oneshot::Receiver<R>>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        let posted = self.post_task(move || {
            if sender.send(f()).is_err() {
                tracing::trace!(message = "Result receiver was dropped before completion");
            }
        });
        posted.then_some(receiver)
    }

    /// Whether the target loop still exists and accepts tasks.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.task_queue
            .upgrade()
            .is_some_and(|task_queue| !task_queue.is_closed())
    }

    #[must_use]
    pub fn runs_tasks_on_current_thread(&self) -> bool {
        thread::current().id() == self.target_thread_id
    }

    #[must_use]
    pub fn target_thread_id(&self) -> ThreadId { self.target_thread_id }
}

impl PartialEq for Dispatcher {
    fn eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.task_queue, &other.task_queue)
            && self.target_thread_id == other.target_thread_id
    }
}

impl Eq for Dispatcher {}
