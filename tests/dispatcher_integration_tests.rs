//! Integration tests for CommandDispatcher
//!
//! These tests verify:
//! - Commands reach the executor once each, in submission order, never overlapping
//! - Every submission gets exactly one callback, after its execution returned
//! - Callbacks run on the main loop thread, never on the worker
//! - `submit` returns promptly while the executor is blocked
//! - Quit policies: signal only vs. dropping queued commands

use ffmpeg_play::dispatcher::{CommandDispatcher, MainLoop};
use ffmpeg_play::models::{AVERROR_EXIT, ExecutionResult, QuitPolicy};
use ffmpeg_play::native::{NativeExecutor, SurfaceHandle};
use mockall::predicate::eq;
use mockall::{Sequence, mock};
use proptest::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

const WAIT: Duration = Duration::from_secs(5);

mock! {
    pub Executor {}

    impl NativeExecutor for Executor {
        fn execute(&self, command: &str) -> i32;
        fn bind_surface(&self, surface: SurfaceHandle);
        fn send_key(&self, key: u8);
    }
}

/// Fake executor that records what it runs
///
/// Commands starting with `block` wait until the gate is opened, either by
/// `release()` or by the quit key. Commands containing `fail` return -22.
#[derive(Default)]
struct GatedExecutor {
    log: Mutex<Vec<String>>,
    threads: Mutex<Vec<ThreadId>>,
    keys: Mutex<Vec<u8>>,
    in_flight: AtomicBool,
    overlapped: AtomicBool,
    open: Mutex<bool>,
    gate: Condvar,
}

impl GatedExecutor {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn release(&self) {
        *self.open.lock().unwrap() = true;
        self.gate.notify_all();
    }

    fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn started(&self) -> Vec<String> {
        self.log()
            .into_iter()
            .filter_map(|entry| entry.strip_prefix("start ").map(str::to_string))
            .collect()
    }

    fn wait_until_started(&self, command: &str) {
        let deadline = Instant::now() + WAIT;
        while !self.started().iter().any(|c| c == command) {
            assert!(Instant::now() < deadline, "{} never started", command);
            thread::sleep(Duration::from_millis(5));
        }
    }
}

impl NativeExecutor for GatedExecutor {
    fn execute(&self, command: &str) -> i32 {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.overlapped.store(true, Ordering::SeqCst);
        }
        self.threads.lock().unwrap().push(thread::current().id());
        self.log.lock().unwrap().push(format!("start {}", command));

        if command.starts_with("block") {
            let mut open = self.open.lock().unwrap();
            while !*open {
                open = self.gate.wait(open).unwrap();
            }
        }

        let status = if command.contains("fail") { -22 } else { 0 };

        self.log.lock().unwrap().push(format!("end {}", command));
        self.in_flight.store(false, Ordering::SeqCst);
        status
    }

    fn bind_surface(&self, _surface: SurfaceHandle) {}

    fn send_key(&self, key: u8) {
        self.keys.lock().unwrap().push(key);
        if key == b'q' {
            self.release();
        }
    }
}

type Results = Arc<Mutex<Vec<ExecutionResult>>>;

fn collector() -> Results {
    Arc::new(Mutex::new(Vec::new()))
}

fn submit_collecting(dispatcher: &CommandDispatcher, command: &str, results: &Results) {
    let results = results.clone();
    dispatcher.submit(command, move |result| results.lock().unwrap().push(result));
}

#[test]
fn test_noop_success_and_failure_statuses() {
    let mut executor = MockExecutor::new();
    let mut seq = Sequence::new();
    executor
        .expect_execute()
        .withf(|command| command.to_string() == "noop-success")
        .times(1)
        .in_sequence(&mut seq)
        .return_const(0);
    executor
        .expect_execute()
        .withf(|command| command.to_string() == "noop-fail")
        .times(1)
        .in_sequence(&mut seq)
        .return_const(-22);

    let mut main_loop = MainLoop::new().unwrap();
    let dispatcher = CommandDispatcher::new(Arc::new(executor), Arc::new(main_loop.handle()));
    let results = collector();

    submit_collecting(&dispatcher, "noop-success", &results);
    submit_collecting(&dispatcher, "noop-fail", &results);

    assert_eq!(main_loop.run_for(2, WAIT), 2);

    let received: Vec<(String, i32)> = results
        .lock()
        .unwrap()
        .iter()
        .map(|r| (r.command.clone(), r.status))
        .collect();
    assert_eq!(
        received,
        vec![
            ("noop-success".to_string(), 0),
            ("noop-fail".to_string(), -22)
        ]
    );

    dispatcher.shutdown();
}

#[test]
fn test_bind_surface_forwarded_to_executor() {
    let mut executor = MockExecutor::new();
    executor
        .expect_bind_surface()
        .with(eq(SurfaceHandle::from_raw(42)))
        .times(1)
        .return_const(());
    executor.expect_execute().times(0);

    let main_loop = MainLoop::new().unwrap();
    let dispatcher = CommandDispatcher::new(Arc::new(executor), Arc::new(main_loop.handle()));

    dispatcher.bind_surface(SurfaceHandle::from_raw(42));
    dispatcher.shutdown();
}

#[test]
fn test_quit_sends_stop_key() {
    let mut executor = MockExecutor::new();
    executor
        .expect_send_key()
        .with(eq(b'q'))
        .times(1)
        .return_const(());

    let main_loop = MainLoop::new().unwrap();
    let dispatcher = CommandDispatcher::new(Arc::new(executor), Arc::new(main_loop.handle()));

    dispatcher.quit();
    dispatcher.shutdown();
}

#[test]
fn test_callback_runs_after_execution_returned() {
    let executor = GatedExecutor::new();
    let mut main_loop = MainLoop::new().unwrap();
    let dispatcher = CommandDispatcher::new(executor.clone(), Arc::new(main_loop.handle()));

    for command in ["one", "two-fail", "three"] {
        let executor = executor.clone();
        dispatcher.submit(command, move |result| {
            executor
                .log
                .lock()
                .unwrap()
                .push(format!("done {} {}", result.command, result.status));
        });
    }

    assert_eq!(main_loop.run_for(3, WAIT), 3);

    let log = executor.log();
    for (command, status) in [("one", 0), ("two-fail", -22), ("three", 0)] {
        let end = log.iter().position(|e| *e == format!("end {}", command));
        let done = log
            .iter()
            .position(|e| *e == format!("done {} {}", command, status));
        assert!(end.is_some() && done.is_some(), "missing entries in {:?}", log);
        assert!(end < done, "callback before execution returned: {:?}", log);
    }
    assert_eq!(log.iter().filter(|e| e.starts_with("done")).count(), 3);

    dispatcher.shutdown();
}

#[test]
fn test_callbacks_run_on_main_loop_thread() {
    let executor = GatedExecutor::new();
    let mut main_loop = MainLoop::new().unwrap();
    let dispatcher = CommandDispatcher::new(executor.clone(), Arc::new(main_loop.handle()));

    let callback_threads = Arc::new(Mutex::new(Vec::new()));
    for command in ["a", "b"] {
        let callback_threads = callback_threads.clone();
        dispatcher.submit(command, move |_| {
            callback_threads.lock().unwrap().push(thread::current().id());
        });
    }

    assert_eq!(main_loop.run_for(2, WAIT), 2);

    let main_thread = thread::current().id();
    let worker_threads = executor.threads.lock().unwrap().clone();
    assert_eq!(worker_threads.len(), 2);
    assert!(worker_threads.iter().all(|id| *id != main_thread));
    // One dedicated worker
    assert_eq!(worker_threads[0], worker_threads[1]);
    assert_eq!(*callback_threads.lock().unwrap(), vec![main_thread, main_thread]);

    dispatcher.shutdown();
}

#[test]
fn test_submit_does_not_block_on_running_command() {
    let executor = GatedExecutor::new();
    let mut main_loop = MainLoop::new().unwrap();
    let dispatcher = CommandDispatcher::new(executor.clone(), Arc::new(main_loop.handle()));
    let results = collector();

    let start = Instant::now();
    submit_collecting(&dispatcher, "block-forever", &results);
    executor.wait_until_started("block-forever");

    let submit_start = Instant::now();
    for i in 0..10 {
        submit_collecting(&dispatcher, &format!("queued-{}", i), &results);
    }
    assert!(submit_start.elapsed() < Duration::from_millis(500));
    assert!(start.elapsed() < WAIT);
    assert_eq!(dispatcher.pending(), 11);

    // Nothing completes while the first command is blocked
    assert_eq!(main_loop.run_for(1, Duration::from_millis(100)), 0);

    executor.release();
    assert_eq!(main_loop.run_for(11, WAIT), 11);
    assert_eq!(dispatcher.pending(), 0);

    dispatcher.shutdown();
}

#[test]
fn test_second_command_waits_for_first() {
    let executor = GatedExecutor::new();
    let mut main_loop = MainLoop::new().unwrap();
    let dispatcher = CommandDispatcher::new(executor.clone(), Arc::new(main_loop.handle()));
    let results = collector();

    submit_collecting(&dispatcher, "block-A", &results);
    submit_collecting(&dispatcher, "B", &results);

    executor.wait_until_started("block-A");
    thread::sleep(Duration::from_millis(100));
    assert_eq!(executor.started(), vec!["block-A"]);

    executor.release();
    assert_eq!(main_loop.run_for(2, WAIT), 2);

    assert_eq!(
        executor.log(),
        vec!["start block-A", "end block-A", "start B", "end B"]
    );
    let order: Vec<String> = results
        .lock()
        .unwrap()
        .iter()
        .map(|r| r.command.clone())
        .collect();
    assert_eq!(order, vec!["block-A", "B"]);
    assert!(!executor.overlapped.load(Ordering::SeqCst));

    dispatcher.shutdown();
}

#[test]
fn test_quit_signal_only_keeps_draining() {
    let executor = GatedExecutor::new();
    let mut main_loop = MainLoop::new().unwrap();
    let dispatcher = CommandDispatcher::with_policy(
        executor.clone(),
        Arc::new(main_loop.handle()),
        QuitPolicy::SignalOnly,
    );
    let results = collector();

    submit_collecting(&dispatcher, "block-stream", &results);
    submit_collecting(&dispatcher, "after", &results);
    executor.wait_until_started("block-stream");

    dispatcher.quit();

    assert_eq!(main_loop.run_for(2, WAIT), 2);
    let results = results.lock().unwrap();
    assert_eq!(results[0].command, "block-stream");
    assert_eq!(results[1].command, "after");
    assert!(results.iter().all(|r| !r.cancelled && r.status == 0));
    assert_eq!(*executor.keys.lock().unwrap(), vec![b'q']);
    assert_eq!(executor.started(), vec!["block-stream", "after"]);

    dispatcher.shutdown();
}

#[test]
fn test_quit_drop_queued_cancels_waiting_commands() {
    let executor = GatedExecutor::new();
    let mut main_loop = MainLoop::new().unwrap();
    let dispatcher = CommandDispatcher::with_policy(
        executor.clone(),
        Arc::new(main_loop.handle()),
        QuitPolicy::DropQueued,
    );
    let results = collector();

    submit_collecting(&dispatcher, "block-stream", &results);
    submit_collecting(&dispatcher, "queued-1", &results);
    submit_collecting(&dispatcher, "queued-2", &results);
    executor.wait_until_started("block-stream");

    dispatcher.quit();
    submit_collecting(&dispatcher, "after-quit", &results);

    assert_eq!(main_loop.run_for(4, WAIT), 4);

    let results = results.lock().unwrap();
    let summary: Vec<(&str, i32, bool)> = results
        .iter()
        .map(|r| (r.command.as_str(), r.status, r.cancelled))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("block-stream", 0, false),
            ("queued-1", AVERROR_EXIT, true),
            ("queued-2", AVERROR_EXIT, true),
            ("after-quit", 0, false),
        ]
    );
    assert_eq!(executor.started(), vec!["block-stream", "after-quit"]);
    assert_eq!(
        dispatcher.metrics().commands_cancelled.load(Ordering::Relaxed),
        2
    );

    dispatcher.shutdown();
}

#[test]
fn test_wait_idle_times_out_until_commands_finish() {
    let executor = GatedExecutor::new();
    let mut main_loop = MainLoop::new().unwrap();
    let dispatcher = CommandDispatcher::new(executor.clone(), Arc::new(main_loop.handle()));
    let results = collector();

    assert!(dispatcher.wait_idle(Duration::ZERO));

    submit_collecting(&dispatcher, "block-stream", &results);
    submit_collecting(&dispatcher, "after", &results);
    executor.wait_until_started("block-stream");

    assert!(!dispatcher.wait_idle(Duration::from_millis(100)));
    assert_eq!(dispatcher.pending(), 2);

    dispatcher.quit();
    assert!(dispatcher.wait_idle(WAIT));
    assert_eq!(dispatcher.pending(), 0);

    // Both completions are still waiting for the main thread
    assert!(results.lock().unwrap().is_empty());
    assert_eq!(main_loop.run_for(2, WAIT), 2);
    assert_eq!(results.lock().unwrap().len(), 2);

    dispatcher.shutdown();
}

#[test]
fn test_metrics_track_outcomes() {
    let executor = GatedExecutor::new();
    let mut main_loop = MainLoop::new().unwrap();
    let dispatcher = CommandDispatcher::new(executor, Arc::new(main_loop.handle()));

    dispatcher.submit("ok", |_| {});
    dispatcher.submit("fail", |_| {});
    assert_eq!(main_loop.run_for(2, WAIT), 2);

    let metrics = dispatcher.metrics();
    assert_eq!(metrics.commands_submitted.load(Ordering::Relaxed), 2);
    assert_eq!(metrics.commands_succeeded.load(Ordering::Relaxed), 1);
    assert_eq!(metrics.commands_failed.load(Ordering::Relaxed), 1);

    dispatcher.shutdown();
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_commands_run_once_in_submission_order(
        commands in prop::collection::vec("cmd-[a-z]{1,8}( [a-z0-9:-]{1,6}){0,3}", 0..20)
    ) {
        let executor = GatedExecutor::new();
        let mut main_loop = MainLoop::new().unwrap();
        let dispatcher = CommandDispatcher::new(executor.clone(), Arc::new(main_loop.handle()));
        let results = collector();

        for command in &commands {
            submit_collecting(&dispatcher, command, &results);
        }

        prop_assert_eq!(main_loop.run_for(commands.len(), WAIT), commands.len());
        dispatcher.shutdown();

        prop_assert_eq!(executor.started(), commands.clone());
        let delivered: Vec<String> = results
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.command.clone())
            .collect();
        prop_assert_eq!(delivered, commands);
        prop_assert!(!executor.overlapped.load(Ordering::SeqCst));
        prop_assert_eq!(main_loop.run_pending(), 0);
    }
}
