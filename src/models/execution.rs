use std::time::Duration;

/// FFmpeg's `AVERROR_EXIT`, reported for commands that never ran because a quit
/// dropped them from the queue.
pub const AVERROR_EXIT: i32 = -0x5449_5845;

/// Status used when a command could not be handed to FFmpeg at all
/// (empty command line, spawn failure, killed by a signal).
pub const STATUS_INVALID: i32 = -1;

/// Outcome of one submitted command
///
/// Produced by the dispatcher's worker and handed, unchanged, to the
/// completion callback on the main thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub command: String,
    pub status: i32,
    pub duration: Duration,
    pub cancelled: bool,
}

impl ExecutionResult {
    pub fn new(command: impl Into<String>, status: i32, duration: Duration) -> Self {
        Self {
            command: command.into(),
            status,
            duration,
            cancelled: false,
        }
    }

    /// A command that was dropped from the queue without reaching the executor
    pub fn cancelled(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            status: AVERROR_EXIT,
            duration: Duration::ZERO,
            cancelled: true,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == 0
    }
}
