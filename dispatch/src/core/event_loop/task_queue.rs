// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The synchronized FIFO that connects producers ([`Dispatcher`]s on any thread) to the
//! single consumer (the owning thread's [`EventLoop`]). See [`TaskQueue`].
//!
//! [`Dispatcher`]: super::Dispatcher
//! [`EventLoop`]: super::EventLoop

use crate::Closure;
use std::{collections::VecDeque,
          mem,
          sync::{Condvar, Mutex, MutexGuard, PoisonError}};

/// A batch of tasks swapped out of the queue in one go.
pub type TaskBatch = VecDeque<Closure>;

/// Whether [`TaskQueue::push()`] accepted a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Queued,
    /// The owning [`EventLoop`] is gone; the task was dropped without running.
    ///
    /// [`EventLoop`]: super::EventLoop
    Closed,
}

/// Whether [`TaskQueue::start_running()`] flipped the running flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    WasAlreadyRunning,
}

#[derive(Debug, Default)]
struct TaskQueueState {
    pending: TaskBatch,
    /// The owning loop's running flag. Lives under the same lock as `pending` so the
    /// wait predicate in [`TaskQueue::wait_and_take_all()`] can never miss a wake.
    is_running: bool,
    /// Set once when the owning loop is dropped. No task is accepted afterwards.
    is_closed: bool,
}

/// Synchronized queue of [`Closure`]s plus the wait/notify primitive used to park the
/// owning thread.
///
/// # Ownership
///
/// ```text
/// EventLoop ──Arc (owning)──────► TaskQueue ◄──Weak (non-owning)── Dispatcher (× N)
/// ```
///
/// Only the [`EventLoop`] holds a strong reference. [`Dispatcher`]s hold a
/// [`Weak`](std::sync::Weak) so they can outlive the loop; once the loop is dropped their
/// posts fail silently. The [`is_closed`] flag closes the window where a dispatcher has
/// upgraded its weak reference just as the loop is being torn down.
///
/// # Locking
///
/// Every access to the pending tasks happens under one [`Mutex`]. Tasks are never
/// *executed* under the lock: consumers swap the entire pending sequence out and run it
/// unlocked, so a task may post more tasks without deadlocking.
///
/// [`Dispatcher`]: super::Dispatcher
/// [`EventLoop`]: super::EventLoop
/// [`is_closed`]: TaskQueue::is_closed
#[derive(Debug, Default)]
pub struct TaskQueue {
    state: Mutex<TaskQueueState>,
    task_available: Condvar,
}

impl TaskQueue {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Poisoning can only come from a panic while the lock is held, and no user code
    /// ever runs under this lock, so the state is always consistent.
    fn lock_state(&self) -> MutexGuard<'_, TaskQueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends `task` and wakes one waiting consumer.
    pub fn push(&self, task: Closure) -> PushOutcome {
        let mut state = self.lock_state();
        if state.is_closed {
            drop(state);
            // Dropped here, outside the lock, since its captures may post again.
            drop(task);
            return PushOutcome::Closed;
        }
        state.pending.push_back(task);
        self.task_available.notify_one();
        PushOutcome::Queued
    }

    /// Blocks until at least one task is queued while the running flag is set, then
    /// swaps out and returns the entire pending sequence.
    ///
    /// Returns [`None`] once the running flag is cleared (by [`request_stop()`]), even if
    /// tasks remain queued.
    ///
    /// [`request_stop()`]: TaskQueue::request_stop
    pub fn wait_and_take_all(&self) -> Option<TaskBatch> {
        let mut state = self
            .task_available
            .wait_while(self.lock_state(), |state| {
                state.is_running && state.pending.is_empty()
            })
            .unwrap_or_else(PoisonError::into_inner);

        if !state.is_running {
            return None;
        }
        Some(mem::take(&mut state.pending))
    }

    /// Swaps out whatever is queued right now, without blocking.
    pub fn take_all(&self) -> TaskBatch { mem::take(&mut self.lock_state().pending) }

    /// Puts tasks that were taken but not executed back at the *front* of the queue,
    /// ahead of anything posted in the meantime, preserving their relative order.
    pub fn requeue_front(&self, mut not_executed: TaskBatch) {
        if not_executed.is_empty() {
            return;
        }
        let mut state = self.lock_state();
        not_executed.append(&mut state.pending);
        state.pending = not_executed;
    }

    pub fn start_running(&self) -> StartOutcome {
        let mut state = self.lock_state();
        if state.is_running {
            return StartOutcome::WasAlreadyRunning;
        }
        state.is_running = true;
        StartOutcome::Started
    }

    /// Clears the running flag and wakes every waiter so a blocked consumer observes it.
    pub fn request_stop(&self) {
        let mut state = self.lock_state();
        state.is_running = false;
        self.task_available.notify_all();
    }

    #[must_use]
    pub fn is_running(&self) -> bool { self.lock_state().is_running }

    #[must_use]
    pub fn is_closed(&self) -> bool { self.lock_state().is_closed }

    #[must_use]
    pub fn len(&self) -> usize { self.lock_state().pending.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.lock_state().pending.is_empty() }

    /// Rejects all future pushes and returns the tasks that never ran. The caller drops
    /// them outside the lock.
    pub fn close(&self) -> TaskBatch {
        let mut state = self.lock_state();
        state.is_closed = true;
        state.is_running = false;
        self.task_available.notify_all();
        mem::take(&mut state.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::{sync::{Arc, mpsc},
              thread,
              time::Duration};

    fn recording_task(tx: &mpsc::Sender<u32>, id: u32) -> Closure {
        let tx = tx.clone();
        Closure::new(move || tx.send(id).unwrap())
    }

    fn run_batch(batch: TaskBatch) {
        for task in batch {
            task.run();
        }
    }

    #[test]
    fn test_take_all_preserves_fifo_order() {
        let queue = TaskQueue::new();
        let (tx, rx) = mpsc::channel();
        for id in 0..5 {
            assert_eq!(queue.push(recording_task(&tx, id)), PushOutcome::Queued);
        }
        assert_eq!(queue.len(), 5);

        run_batch(queue.take_all());
        assert!(queue.is_empty());
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_requeue_front_goes_ahead_of_new_tasks() {
        let queue = TaskQueue::new();
        let (tx, rx) = mpsc::channel();
        queue.push(recording_task(&tx, 1));
        queue.push(recording_task(&tx, 2));
        let batch = queue.take_all();

        queue.push(recording_task(&tx, 3));
        queue.requeue_front(batch);

        run_batch(queue.take_all());
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_closed_queue_rejects_push() {
        let queue = TaskQueue::new();
        let (tx, rx) = mpsc::channel();
        queue.push(recording_task(&tx, 1));

        let never_ran = queue.close();
        assert_eq!(never_ran.len(), 1);
        drop(never_ran);

        assert_eq!(queue.push(recording_task(&tx, 2)), PushOutcome::Closed);
        assert!(queue.is_closed());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_wait_returns_none_when_not_running() {
        let queue = TaskQueue::new();
        let (tx, _rx) = mpsc::channel();
        queue.push(recording_task(&tx, 1));
        // Never started, so the queued task is not handed out.
        assert!(queue.wait_and_take_all().is_none());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_start_running_is_idempotent() {
        let queue = TaskQueue::new();
        assert_eq!(queue.start_running(), StartOutcome::Started);
        assert_eq!(queue.start_running(), StartOutcome::WasAlreadyRunning);
        queue.request_stop();
        assert!(!queue.is_running());
    }

    #[test]
    fn test_push_from_other_thread_wakes_waiter() {
        let queue = Arc::new(TaskQueue::new());
        queue.start_running();
        let (tx, rx) = mpsc::channel();

        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                queue.push(recording_task(&tx, 42));
            })
        };

        let batch = queue.wait_and_take_all().unwrap();
        run_batch(batch);
        producer.join().unwrap();
        assert_eq!(rx.recv().unwrap(), 42);
    }

    #[test]
    fn test_request_stop_wakes_blocked_waiter() {
        let queue = Arc::new(TaskQueue::new());
        queue.start_running();

        let waiter = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.wait_and_take_all().is_none())
        };

        thread::sleep(Duration::from_millis(20));
        queue.request_stop();
        assert!(waiter.join().unwrap());
    }
}
