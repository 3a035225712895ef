// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Which closures fire, where they run, and what stays registered.

use super::{super::*, test_backends::*};
use crate::{Closure, EventLoop, RunOutcome, WorkerThread};
use pretty_assertions::assert_eq;
use std::{collections::HashSet,
          sync::{Arc, mpsc},
          thread,
          time::Duration};

#[test]
fn test_only_signaled_handle_fires_other_stays_registered() {
    let hub = SignalHub::new();
    let first = hub.create_handle();
    let second = hub.create_handle();
    let multiplexer = WaitMultiplexer::new(hub.clone()).unwrap();

    let (tx, rx) = mpsc::channel();
    for (name, handle) in [("first", &first), ("second", &second)] {
        let tx = tx.clone();
        multiplexer
            .add_completion_handler(handle.clone(), move || tx.send(name).unwrap())
            .unwrap();
    }
    assert_eq!(multiplexer.pending_count(), 2);

    second.signal();
    assert_eq!(rx.recv_timeout(RECV_TIMEOUT).unwrap(), "second");

    // Give the thread a few more cycles to misbehave, if it's going to.
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
    assert!(multiplexer.is_registered(&first));
    assert!(!multiplexer.is_registered(&second));
    assert_eq!(multiplexer.pending_count(), 1);
}

#[test]
fn test_many_handles_each_fire_exactly_once() {
    const COUNT: usize = 20;
    let hub = SignalHub::new();
    let multiplexer = WaitMultiplexer::new(hub.clone()).unwrap();
    let handles: Vec<_> = (0..COUNT).map(|_| hub.create_handle()).collect();

    let (tx, rx) = mpsc::channel();
    for (index, handle) in handles.iter().enumerate() {
        let tx = tx.clone();
        multiplexer
            .add_completion_handler(handle.clone(), move || tx.send(index).unwrap())
            .unwrap();
    }
    for handle in &handles {
        handle.signal();
    }

    let fired: HashSet<usize> = (0..COUNT)
        .map(|_| rx.recv_timeout(RECV_TIMEOUT).unwrap())
        .collect();
    assert_eq!(fired, (0..COUNT).collect());
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
    assert_eq!(multiplexer.pending_count(), 0);
}

#[test]
fn test_completion_runs_on_multiplexer_thread() {
    let hub = SignalHub::new();
    let handle = hub.create_handle();
    let multiplexer = WaitMultiplexer::with_config(
        hub,
        WaitMultiplexerConfig {
            thread_name: "fence-waiter".into(),
            ..WaitMultiplexerConfig::default()
        },
    )
    .unwrap();

    let (tx, rx) = mpsc::channel();
    multiplexer
        .add_completion_handler(handle.clone(), move || {
            tx.send(thread::current().name().map(String::from)).unwrap();
        })
        .unwrap();
    handle.signal();

    assert_eq!(
        rx.recv_timeout(RECV_TIMEOUT).unwrap().as_deref(),
        Some("fence-waiter")
    );
    assert_eq!(multiplexer.thread_name(), "fence-waiter");
}

#[test]
fn test_completion_can_register_another_handler() {
    let hub = SignalHub::new();
    let first = hub.create_handle();
    let second = hub.create_handle();
    let multiplexer = Arc::new(WaitMultiplexer::new(hub.clone()).unwrap());

    let (tx, rx) = mpsc::channel();
    let chained = {
        let multiplexer = Arc::clone(&multiplexer);
        let second = second.clone();
        let tx = tx.clone();
        move || {
            tx.send("first").unwrap();
            multiplexer
                .add_completion_handler(second, move || tx.send("second").unwrap())
                .unwrap();
        }
    };
    multiplexer.add_completion_handler(first.clone(), chained).unwrap();

    first.signal();
    assert_eq!(rx.recv_timeout(RECV_TIMEOUT).unwrap(), "first");
    second.signal();
    assert_eq!(rx.recv_timeout(RECV_TIMEOUT).unwrap(), "second");

}

#[test]
fn test_completion_posted_to_dispatcher_runs_on_that_loop() {
    let hub = SignalHub::new();
    let handle = hub.create_handle();
    let multiplexer = WaitMultiplexer::new(hub).unwrap();
    let worker = WorkerThread::new("render").unwrap();

    let (tx, rx) = mpsc::channel();
    multiplexer
        .add_completion_handler_on(handle.clone(), worker.dispatcher(), move || {
            tx.send(thread::current().id()).unwrap();
        })
        .unwrap();
    handle.signal();

    assert_eq!(rx.recv_timeout(RECV_TIMEOUT).unwrap(), worker.thread_id());
}

#[test]
fn test_completion_posted_back_to_current_thread_loop() {
    let hub = SignalHub::new();
    let handle = hub.create_handle();
    let multiplexer = WaitMultiplexer::new(hub).unwrap();
    let event_loop = EventLoop::for_current_thread();

    let here = thread::current().id();
    multiplexer
        .add_completion_handler_on(handle.clone(), &event_loop.dispatcher(), move || {
            assert_eq!(thread::current().id(), here);
            EventLoop::for_current_thread().terminate();
        })
        .unwrap();
    handle.signal();

    assert_eq!(event_loop.run(), RunOutcome::Terminated);
}

#[test]
fn test_registration_while_waiting_is_picked_up_by_waker() {
    let hub = SignalHub::new();
    let early = hub.create_handle();
    let late = hub.create_handle();
    // With a timeout this long, only the waker can make the thread see `late` in time.
    let multiplexer = WaitMultiplexer::with_config(
        hub,
        WaitMultiplexerConfig {
            wait_timeout: Duration::from_secs(60),
            ..WaitMultiplexerConfig::default()
        },
    )
    .unwrap();

    multiplexer.add_completion_handler(early, || {}).unwrap();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(multiplexer.phase(), WaitPhase::Waiting);

    let (tx, rx) = mpsc::channel();
    multiplexer
        .add_completion_handler(late.clone(), move || tx.send(()).unwrap())
        .unwrap();
    late.signal();
    assert!(rx.recv_timeout(RECV_TIMEOUT).is_ok());
}

#[test]
fn test_noop_waker_still_makes_progress_through_timeout() {
    let backend = PollingHub::default();
    let handle = backend.hub.create_handle();
    let wait_calls = Arc::clone(&backend.wait_calls);
    let multiplexer = WaitMultiplexer::with_config(
        backend.clone(),
        WaitMultiplexerConfig {
            wait_timeout: Duration::from_millis(10),
            ..WaitMultiplexerConfig::default()
        },
    )
    .unwrap();

    let (tx, rx) = mpsc::channel();
    multiplexer
        .add_completion_handler(handle.clone(), move || tx.send(()).unwrap())
        .unwrap();
    thread::sleep(Duration::from_millis(50));
    handle.signal();

    assert!(rx.recv_timeout(RECV_TIMEOUT).is_ok());
    assert!(wait_calls.load(std::sync::atomic::Ordering::SeqCst) >= 2);

    // Terminate is also observed within a timeout period.
    multiplexer.terminate();
    multiplexer.join().unwrap();
}

#[test]
fn test_duplicate_registration_last_write_wins() {
    let hub = SignalHub::new();
    let handle = hub.create_handle();
    let multiplexer = WaitMultiplexer::new(hub).unwrap();

    let (tx, rx) = mpsc::channel();
    let tx_first = tx.clone();
    multiplexer
        .add_completion_handler(handle.clone(), move || tx_first.send("first").unwrap())
        .unwrap();
    multiplexer
        .add_completion_handler(handle.clone(), move || tx.send("second").unwrap())
        .unwrap();
    assert_eq!(multiplexer.pending_count(), 1);

    handle.signal();
    assert_eq!(rx.recv_timeout(RECV_TIMEOUT).unwrap(), "second");
    // The replaced closure was dropped, and with it the last other sender.
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
}

#[test]
fn test_invalid_handle_and_empty_closure_are_rejected() {
    let hub = SignalHub::new();
    let multiplexer = WaitMultiplexer::new(hub.clone()).unwrap();

    let orphan = {
        let other_hub = SignalHub::new();
        other_hub.create_handle()
    };
    assert_eq!(
        multiplexer.add_completion_handler(orphan, || {}),
        Err(RegistrationError::InvalidHandle)
    );
    assert_eq!(
        multiplexer.add_completion_handler(hub.create_handle(), Closure::empty()),
        Err(RegistrationError::EmptyClosure)
    );
    let dispatcher = EventLoop::for_current_thread().dispatcher();
    assert_eq!(
        multiplexer.add_completion_handler_on(
            hub.create_handle(),
            &dispatcher,
            Closure::empty()
        ),
        Err(RegistrationError::EmptyClosure)
    );
    assert_eq!(multiplexer.pending_count(), 0);
}
