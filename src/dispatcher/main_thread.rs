// Main-thread abstraction
//
// The dispatcher never calls completion callbacks itself. It hands them to a
// MainThread, which runs them on whatever single-threaded context owns the UI:
// the Slint event loop in the GUI, or a MainLoop pumped by the host (tests,
// headless tools).

use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// A unit of work to run on the main thread
pub type MainTask = Box<dyn FnOnce() + Send + 'static>;

/// "Run this on the main thread" primitive injected into the dispatcher
///
/// Implementations must run posted tasks one at a time, in posting order, on a
/// single thread.
pub trait MainThread: Send + Sync {
    fn post(&self, task: MainTask);
}

/// Channel-backed main loop pumped by its owner
///
/// Tasks posted through a [`MainLoopHandle`] run on whichever thread calls
/// [`run_pending`](Self::run_pending) or [`run_for`](Self::run_for).
///
/// # Example
/// ```ignore
/// let mut main_loop = MainLoop::new()?;
/// let dispatcher = CommandDispatcher::new(executor, Arc::new(main_loop.handle()));
///
/// dispatcher.submit("ffmpeg -version", |result| println!("ret {}", result.status));
/// main_loop.run_for(1, Duration::from_secs(5));
/// ```
pub struct MainLoop {
    tx: mpsc::UnboundedSender<MainTask>,
    rx: mpsc::UnboundedReceiver<MainTask>,
    timer: tokio::runtime::Runtime,
}

impl MainLoop {
    pub fn new() -> std::io::Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        // Only drives the timeout in run_for; tasks never run on it
        let timer = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;
        Ok(Self { tx, rx, timer })
    }

    pub fn handle(&self) -> MainLoopHandle {
        MainLoopHandle {
            tx: self.tx.clone(),
        }
    }

    /// Run every task already posted, without waiting. Returns how many ran.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.rx.try_recv() {
            task();
            ran += 1;
        }
        ran
    }

    /// Run tasks as they arrive until `count` have run or `timeout` elapses.
    /// Returns how many ran.
    pub fn run_for(&mut self, count: usize, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let mut ran = 0;

        while ran < count {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let rx = &mut self.rx;
            let next = self
                .timer
                .block_on(async { tokio::time::timeout(remaining, rx.recv()).await });

            match next {
                Ok(Some(task)) => {
                    task();
                    ran += 1;
                }
                // Unreachable while self holds a sender
                Ok(None) => break,
                Err(_) => {
                    tracing::debug!("Main loop timed out after {} of {} tasks", ran, count);
                    break;
                }
            }
        }

        ran
    }
}

/// Cloneable poster for a [`MainLoop`]
#[derive(Clone)]
pub struct MainLoopHandle {
    tx: mpsc::UnboundedSender<MainTask>,
}

impl MainThread for MainLoopHandle {
    fn post(&self, task: MainTask) {
        if self.tx.send(task).is_err() {
            tracing::warn!("Main loop has stopped - dropping posted task");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::thread;

    #[test]
    fn test_run_pending_in_order() {
        let mut main_loop = MainLoop::new().unwrap();
        let handle = main_loop.handle();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let seen = seen.clone();
            handle.post(Box::new(move || seen.lock().unwrap().push(i)));
        }

        assert_eq!(main_loop.run_pending(), 3);
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
        assert_eq!(main_loop.run_pending(), 0);
    }

    #[test]
    fn test_tasks_run_on_pumping_thread() {
        let mut main_loop = MainLoop::new().unwrap();
        let handle = main_loop.handle();
        let ran_on = Arc::new(Mutex::new(None));

        let ran_on_clone = ran_on.clone();
        thread::spawn(move || {
            handle.post(Box::new(move || {
                *ran_on_clone.lock().unwrap() = Some(thread::current().id());
            }));
        })
        .join()
        .unwrap();

        assert_eq!(main_loop.run_for(1, Duration::from_secs(5)), 1);
        assert_eq!(*ran_on.lock().unwrap(), Some(thread::current().id()));
    }

    #[test]
    fn test_run_for_times_out() {
        let mut main_loop = MainLoop::new().unwrap();
        let start = Instant::now();

        assert_eq!(main_loop.run_for(1, Duration::from_millis(50)), 0);
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
