// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use super::{Dispatcher, TaskBatch, TaskQueue};
use crate::Continuation;
use std::{cell::Cell,
          marker::PhantomData,
          rc::Rc,
          sync::Arc,
          thread::{self, ThreadId}};

thread_local! {
    /// Lazily created on first access from each thread. Dropped by the thread-local
    /// destructors when the thread exits, which closes the loop's queue. The main
    /// thread's loop is never dropped.
    static CURRENT_EVENT_LOOP: Rc<EventLoop> = Rc::new(EventLoop::new_for_current_thread());
}

/// How [`EventLoop::run()`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// [`EventLoop::terminate()`] was observed.
    Terminated,
    /// The loop was already inside [`EventLoop::run()`] (a task called it re-entrantly);
    /// this call returned immediately without blocking again.
    AlreadyRunning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DrainMode {
    /// Check the running flag before every task; stop as soon as it's cleared.
    UntilTerminated,
    /// Execute the whole batch.
    Everything,
}

/// A per-thread cooperative scheduler that drains a [`TaskQueue`] in FIFO order.
///
/// There is exactly one [`EventLoop`] per thread, created on first call to
/// [`for_current_thread()`]. It is `!Send`, so it can only be driven from the thread it
/// belongs to. Other threads interact with it through its [`Dispatcher`].
///
/// # Run loop
///
/// ```text
///            ┌─────────────────────────────────────────────┐
///            ▼                                             │
/// wait until (queue non-empty AND running) ──► swap out whole queue
///            │                                 (lock released)
///            │ running == false                        │
///            ▼                                         ▼
///     return Terminated ◄── terminate() seen ── run tasks in order
/// ```
///
/// Tasks run with no lock held, so a task may post more tasks (to this or any loop)
/// without deadlocking. If a task calls [`terminate()`], the rest of its batch is not
/// executed; those tasks go back to the front of the queue in order, and they only run
/// if the loop is run again. Otherwise they are dropped with the loop.
///
/// [`for_current_thread()`]: EventLoop::for_current_thread
/// [`terminate()`]: EventLoop::terminate
#[derive(Debug)]
pub struct EventLoop {
    owner_thread_id: ThreadId,
    task_queue: Arc<TaskQueue>,
    dispatcher: Dispatcher,
    is_inside_run: Cell<bool>,
    _not_send: PhantomData<*const ()>,
}

impl EventLoop {
    fn new_for_current_thread() -> Self {
        let owner_thread_id = thread::current().id();
        let task_queue = Arc::new(TaskQueue::new());
        let dispatcher = Dispatcher::new(&task_queue, owner_thread_id);
        tracing::trace!(message = "EventLoop created", thread = ?owner_thread_id);
        Self {
            owner_thread_id,
            task_queue,
            dispatcher,
            is_inside_run: Cell::new(false),
            _not_send: PhantomData,
        }
    }

    /// Returns the calling thread's loop, creating it on first call.
    ///
    /// # Panics
    ///
    /// If called from a thread-local destructor after this thread's loop was already
    /// destroyed.
    #[must_use]
    pub fn for_current_thread() -> Rc<EventLoop> { CURRENT_EVENT_LOOP.with(Rc::clone) }

    /// The loop's [`Dispatcher`]. Every call returns a clone of the same handle.
    #[must_use]
    pub fn dispatcher(&self) -> Dispatcher { self.dispatcher.clone() }

    /// Blocks the owning thread, executing posted tasks until [`terminate()`] is called.
    ///
    /// Calling this from a task that is already running inside [`run()`] returns
    /// [`RunOutcome::AlreadyRunning`] immediately.
    ///
    /// # Panics
    ///
    /// If called from a thread other than the owner.
    ///
    /// [`run()`]: EventLoop::run
    /// [`terminate()`]: EventLoop::terminate
    pub fn run(&self) -> RunOutcome {
        self.assert_on_owner_thread("run");
        if self.is_inside_run.replace(true) {
            tracing::debug!(message = "EventLoop::run() is already running");
            return RunOutcome::AlreadyRunning;
        }
        let _run_scope = RunScope { event_loop: self };

        self.task_queue.start_running();
        tracing::debug!(message = "EventLoop::run() started", thread = ?self.owner_thread_id);

        while let Some(batch) = self.task_queue.wait_and_take_all() {
            let (_, continuation) = self.execute(batch, DrainMode::UntilTerminated);
            if continuation == Continuation::Stop {
                break;
            }
        }

        tracing::debug!(
            message = "EventLoop::run() exited",
            thread = ?self.owner_thread_id,
            still_queued = self.task_queue.len()
        );
        RunOutcome::Terminated
    }

    /// Executes whatever is queued right now, without blocking. Tasks posted while the
    /// flush is in progress are left for the next drain. Returns how many tasks ran.
    ///
    /// # Panics
    ///
    /// If called from a thread other than the owner.
    pub fn flush_tasks_now(&self) -> usize {
        self.assert_on_owner_thread("flush_tasks_now");
        let (executed, _) = self.execute(self.task_queue.take_all(), DrainMode::Everything);
        executed
    }

    /// Clears the running flag and wakes the loop, so a blocked [`run()`] returns. No
    /// task is executed after the flag flips.
    ///
    /// # Panics
    ///
    /// If called from a thread other than the owner. To stop a loop from another thread,
    /// post a task that calls this.
    ///
    /// [`run()`]: EventLoop::run
    pub fn terminate(&self) {
        self.assert_on_owner_thread("terminate");
        tracing::debug!(message = "EventLoop::terminate()", thread = ?self.owner_thread_id);
        self.task_queue.request_stop();
    }

    #[must_use]
    pub fn is_running(&self) -> bool { self.task_queue.is_running() }

    #[must_use]
    pub fn pending_task_count(&self) -> usize { self.task_queue.len() }

    #[must_use]
    pub fn owner_thread_id(&self) -> ThreadId { self.owner_thread_id }

    fn execute(&self, mut batch: TaskBatch, mode: DrainMode) -> (usize, Continuation) {
        let mut executed = 0;
        while let Some(task) = batch.pop_front() {
            if mode == DrainMode::UntilTerminated && !self.task_queue.is_running() {
                batch.push_front(task);
                tracing::debug!(
                    message = "Terminated mid-batch, requeueing the rest",
                    requeued = batch.len()
                );
                self.task_queue.requeue_front(batch);
                return (executed, Continuation::Stop);
            }
            task.run();
            executed += 1;
        }
        (executed, Continuation::Continue)
    }

    fn assert_on_owner_thread(&self, operation: &str) {
        let current_thread_id = thread::current().id();
        assert_eq!(
            current_thread_id, self.owner_thread_id,
            "EventLoop::{operation}() must be called on the thread that owns the loop"
        );
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        let never_ran = self.task_queue.close();
        if !never_ran.is_empty() {
            tracing::debug!(
                message = "EventLoop dropped with tasks that never ran",
                thread = ?self.owner_thread_id,
                dropped = never_ran.len()
            );
        }
        drop(never_ran);
    }
}

/// Resets the re-entrancy flag and clears the running flag when [`EventLoop::run()`]
/// exits, including by unwinding out of a panicking task.
struct RunScope<'a> {
    event_loop: &'a EventLoop,
}

impl Drop for RunScope<'_> {
    fn drop(&mut self) {
        self.event_loop.is_inside_run.set(false);
        self.event_loop.task_queue.request_stop();
    }
}
