// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Termination while blocked, requeueing after a mid-batch terminate, and what happens to
//! tasks and dispatchers once a loop is gone.

use super::super::*;
use crate::{Closure, ScopedRelease};
use pretty_assertions::assert_eq;
use std::{sync::{Arc, Mutex,
                 atomic::{AtomicBool, Ordering},
                 mpsc},
          thread,
          time::{Duration, Instant}};

fn terminate_task() -> Closure { Closure::new(|| EventLoop::for_current_thread().terminate()) }

#[test]
fn test_terminate_unblocks_run_from_another_thread() {
    let event_loop = EventLoop::for_current_thread();
    let dispatcher = event_loop.dispatcher();
    let ran_after_terminate = Arc::new(AtomicBool::new(false));

    let producer = {
        let ran_after_terminate = Arc::clone(&ran_after_terminate);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            assert!(dispatcher.post_task(terminate_task()));
            assert!(dispatcher.post_task(move || {
                ran_after_terminate.store(true, Ordering::SeqCst);
            }));
        })
    };

    let start = Instant::now();
    assert_eq!(event_loop.run(), RunOutcome::Terminated);
    producer.join().unwrap();

    assert!(start.elapsed() >= Duration::from_millis(50));
    assert!(!ran_after_terminate.load(Ordering::SeqCst));
    assert_eq!(event_loop.pending_task_count(), 1);
    // Still queued. Only an explicit drain runs it.
    assert_eq!(event_loop.flush_tasks_now(), 1);
    assert!(ran_after_terminate.load(Ordering::SeqCst));
}

#[test]
fn test_terminate_mid_batch_requeues_rest_in_order() {
    let event_loop = EventLoop::for_current_thread();
    let dispatcher = event_loop.dispatcher();
    let log: Arc<Mutex<Vec<&'static str>>> = Arc::default();

    let append = |item: &'static str| {
        let log = Arc::clone(&log);
        Closure::new(move || log.lock().unwrap().push(item))
    };

    assert!(dispatcher.post_task(append("a")));
    assert!(dispatcher.post_task(terminate_task()));
    assert!(dispatcher.post_task(append("b")));
    assert!(dispatcher.post_task(append("c")));

    assert_eq!(event_loop.run(), RunOutcome::Terminated);
    assert_eq!(*log.lock().unwrap(), vec!["a"]);
    assert_eq!(event_loop.pending_task_count(), 2);

    // Running again picks up exactly where the first run stopped.
    assert!(dispatcher.post_task(append("d")));
    assert!(dispatcher.post_task(terminate_task()));
    assert_eq!(event_loop.run(), RunOutcome::Terminated);
    assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c", "d"]);
    assert_eq!(event_loop.pending_task_count(), 0);
}

#[test]
fn test_destroyed_loop_drops_pending_tasks_without_running_them() {
    let ran = Arc::new(AtomicBool::new(false));
    let released = Arc::new(AtomicBool::new(false));

    let dispatcher = {
        let ran = Arc::clone(&ran);
        let released = Arc::clone(&released);
        thread::spawn(move || {
            let dispatcher = EventLoop::for_current_thread().dispatcher();
            let guard = ScopedRelease::new(move || released.store(true, Ordering::SeqCst));
            assert!(dispatcher.post_task(move || {
                let _guard = guard;
                ran.store(true, Ordering::SeqCst);
            }));
            dispatcher
            // The loop is never run; the thread exits with one pending task.
        })
        .join()
        .unwrap()
    };

    assert!(!ran.load(Ordering::SeqCst));
    assert!(released.load(Ordering::SeqCst));
    assert!(!dispatcher.is_alive());
    assert!(!dispatcher.post_task(|| {}));
}

#[test]
fn test_terminate_before_any_task_posted() {
    let (dispatcher_tx, dispatcher_rx) = mpsc::channel();
    let worker = thread::spawn(move || {
        let event_loop = EventLoop::for_current_thread();
        dispatcher_tx.send(event_loop.dispatcher()).unwrap();
        event_loop.run()
    });

    let dispatcher: Dispatcher = dispatcher_rx.recv().unwrap();
    assert!(dispatcher.post_task(terminate_task()));
    assert_eq!(worker.join().unwrap(), RunOutcome::Terminated);

    // The worker thread is gone, so is its loop.
    assert!(!dispatcher.post_task(|| {}));
}
