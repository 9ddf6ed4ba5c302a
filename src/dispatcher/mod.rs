//! Command dispatcher - runs FFmpeg commands off the UI thread.
//!
//! [`CommandDispatcher`] owns one dedicated worker thread fed by an unbounded
//! FIFO queue, so at most one command is inside the [`NativeExecutor`] at any
//! time. When a command returns, its [`ExecutionResult`] is posted to the
//! injected [`MainThread`] and the completion callback runs there, never on
//! the worker.
//!
//! # Threading
//!
//! - **Caller / UI thread**: `submit`, `bind_surface` and `quit` return
//!   immediately
//! - **Worker thread** (`ffmpeg-worker`): blocks inside the executor for the full
//!   duration of each command, which may be unbounded (live camera streaming)
//! - **Main thread**: runs completion callbacks in completion order, which is
//!   submission order
//!
//! # Quit
//!
//! `quit` always forwards FFmpeg's stop key to the running command. What
//! happens to commands still waiting in the queue depends on [`QuitPolicy`].
//! Either way every submission gets exactly one callback.

pub mod main_thread;

pub use main_thread::{MainLoop, MainLoopHandle, MainTask, MainThread};

use crate::metrics::Metrics;
use crate::models::{ExecutionResult, QuitPolicy};
use crate::native::{NativeExecutor, SurfaceHandle};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Single-use completion callback
pub type Completion = Box<dyn FnOnce(ExecutionResult) + Send + 'static>;

struct Job {
    command: String,
    /// Quit epoch at submission time
    epoch: u64,
    on_complete: Completion,
}

/// State shared between the dispatcher handle and its worker
struct Shared {
    /// Bumped by `quit` under `QuitPolicy::DropQueued`; jobs from older epochs are skipped
    quit_epoch: AtomicU64,
    pending: AtomicUsize,
    metrics: Metrics,
}

/// Serializes FFmpeg commands onto a single background worker
///
/// Constructed explicitly and passed to whoever needs it; there is no global
/// instance. Dropping the dispatcher closes the queue: the worker finishes the
/// commands already queued and exits on its own. Use
/// [`shutdown`](Self::shutdown) to wait for it.
pub struct CommandDispatcher {
    executor: Arc<dyn NativeExecutor>,
    main_thread: Arc<dyn MainThread>,
    job_tx: Option<mpsc::UnboundedSender<Job>>,
    worker: Option<JoinHandle<()>>,
    shared: Arc<Shared>,
    policy: QuitPolicy,
}

impl CommandDispatcher {
    /// Create a dispatcher with [`QuitPolicy::SignalOnly`]
    pub fn new(executor: Arc<dyn NativeExecutor>, main_thread: Arc<dyn MainThread>) -> Self {
        Self::with_policy(executor, main_thread, QuitPolicy::default())
    }

    /// Create a dispatcher and spawn its worker thread
    ///
    /// # Panics
    ///
    /// Panics if the OS refuses to spawn the worker thread, like `std::thread::spawn`.
    pub fn with_policy(
        executor: Arc<dyn NativeExecutor>,
        main_thread: Arc<dyn MainThread>,
        policy: QuitPolicy,
    ) -> Self {
        let (job_tx, job_rx) = mpsc::unbounded_channel::<Job>();
        let shared = Arc::new(Shared {
            quit_epoch: AtomicU64::new(0),
            pending: AtomicUsize::new(0),
            metrics: Metrics::new(),
        });

        let worker = {
            let executor = Arc::clone(&executor);
            let main_thread = Arc::clone(&main_thread);
            let shared = Arc::clone(&shared);
            std::thread::Builder::new()
                .name("ffmpeg-worker".to_string())
                .spawn(move || run_worker(job_rx, executor, main_thread, shared))
                .expect("failed to spawn ffmpeg worker thread")
        };

        tracing::info!("Command dispatcher started (quit policy: {:?})", policy);

        Self {
            executor,
            main_thread,
            job_tx: Some(job_tx),
            worker: Some(worker),
            shared,
            policy,
        }
    }

    /// Queue `command` for execution and return immediately
    ///
    /// `on_complete` runs exactly once, on the main thread, after the command's
    /// execution has returned (or after it was dropped by a quit).
    pub fn submit<F>(&self, command: impl Into<String>, on_complete: F)
    where
        F: FnOnce(ExecutionResult) + Send + 'static,
    {
        let command = command.into();
        tracing::info!("run cmd {}", command);

        self.shared.metrics.record_submitted();
        self.shared.pending.fetch_add(1, Ordering::SeqCst);

        let job = Job {
            command,
            epoch: self.shared.quit_epoch.load(Ordering::SeqCst),
            on_complete: Box::new(on_complete),
        };

        let Some(job_tx) = self.job_tx.as_ref() else {
            self.reject(job);
            return;
        };

        if let Err(mpsc::error::SendError(job)) = job_tx.send(job) {
            tracing::error!("Worker thread has stopped - command will not run");
            self.reject(job);
        }
    }

    /// Forward a decode surface to the executor on the calling thread
    ///
    /// Call before submitting the command that renders to it. The dispatcher
    /// does not keep the handle.
    pub fn bind_surface(&self, surface: SurfaceHandle) {
        tracing::info!("set surface");
        self.executor.bind_surface(surface);
    }

    /// Ask the running command to stop; fire-and-forget
    ///
    /// Under [`QuitPolicy::DropQueued`] every command queued before this call
    /// is skipped and reported with [`AVERROR_EXIT`](crate::models::AVERROR_EXIT).
    pub fn quit(&self) {
        self.shared.metrics.record_quit();

        if self.policy == QuitPolicy::DropQueued {
            let epoch = self.shared.quit_epoch.fetch_add(1, Ordering::SeqCst) + 1;
            tracing::info!("Quit requested - dropping queued commands (epoch {})", epoch);
        } else {
            tracing::info!("Quit requested - signalling running command");
        }

        self.executor.quit();
    }

    /// Forward a keystroke to the running command
    pub fn send_key(&self, key: u8) {
        self.executor.send_key(key);
    }

    /// Number of submitted commands whose execution has not finished yet
    pub fn pending(&self) -> usize {
        self.shared.pending.load(Ordering::SeqCst)
    }

    /// Wait up to `timeout` for every submitted command to finish executing
    ///
    /// Returns `false` on timeout. Completions may still be waiting on the main
    /// thread when this returns `true`.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.pending() > 0 {
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        true
    }

    pub fn metrics(&self) -> &Metrics {
        &self.shared.metrics
    }

    /// Stop accepting commands, let the worker drain the queue and wait for it
    ///
    /// Blocks for as long as the queued commands take to run.
    pub fn shutdown(mut self) {
        self.job_tx.take();

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("ffmpeg worker thread panicked");
            }
        }

        self.shared.metrics.log_summary();
    }

    /// Report a job that never reached the worker as cancelled
    fn reject(&self, job: Job) {
        let result = ExecutionResult::cancelled(job.command);
        finish(&self.shared, self.main_thread.as_ref(), job.on_complete, result);
    }
}

impl Drop for CommandDispatcher {
    fn drop(&mut self) {
        // Closing the queue lets the worker exit once it has drained
        self.job_tx.take();
    }
}

fn run_worker(
    mut job_rx: mpsc::UnboundedReceiver<Job>,
    executor: Arc<dyn NativeExecutor>,
    main_thread: Arc<dyn MainThread>,
    shared: Arc<Shared>,
) {
    tracing::debug!("ffmpeg worker started");

    while let Some(job) = job_rx.blocking_recv() {
        let result = if job.epoch < shared.quit_epoch.load(Ordering::SeqCst) {
            tracing::info!("Skipping queued cmd after quit: {}", job.command);
            ExecutionResult::cancelled(job.command)
        } else {
            let start = Instant::now();
            let status = executor.execute(&job.command);
            ExecutionResult::new(job.command, status, start.elapsed())
        };

        tracing::debug!(
            "cmd finished with ret {} in {:.2}s",
            result.status,
            result.duration.as_secs_f32()
        );

        finish(&shared, main_thread.as_ref(), job.on_complete, result);
    }

    tracing::debug!("ffmpeg worker terminated");
}

fn finish(
    shared: &Shared,
    main_thread: &dyn MainThread,
    on_complete: Completion,
    result: ExecutionResult,
) {
    shared.metrics.record_result(&result);
    shared.pending.fetch_sub(1, Ordering::SeqCst);
    main_thread.post(Box::new(move || on_complete(result)));
}
