//! Native execution boundary.
//!
//! FFmpeg itself is an external collaborator. Everything this crate needs from it
//! goes through [`NativeExecutor`]: run a command line to completion and get an
//! FFmpeg-style status back, bind a decode surface, and feed the interactive
//! keyboard that FFmpeg polls while a command runs (`q` stops it).
//!
//! [`ProcessExecutor`] is the shipped implementation. It drives an `ffmpeg`
//! binary as a child process.

pub mod process;

pub use process::{ExecutorError, ProcessExecutor};

use std::sync::atomic::{AtomicU64, Ordering};

/// Key FFmpeg treats as "stop the current command"
pub const QUIT_KEY: u8 = b'q';

/// Entry points of the external FFmpeg engine
///
/// Implementations are shared between the UI thread (surface binding, keys) and
/// the dispatcher's worker (execution), hence `Send + Sync`.
pub trait NativeExecutor: Send + Sync {
    /// Run `command` to completion on the calling thread and return its status
    /// (0 = success, negative = FFmpeg error). Never fails otherwise.
    fn execute(&self, command: &str) -> i32;

    /// Register the display target for subsequent decode output, replacing any
    /// previously bound one.
    fn bind_surface(&self, surface: SurfaceHandle);

    /// Queue a keystroke for the running command.
    fn send_key(&self, key: u8);

    /// Ask the running command to stop. Fire-and-forget.
    fn quit(&self) {
        self.send_key(QUIT_KEY);
    }
}

/// Opaque reference to a display/decode target
///
/// The handle is only forwarded; whoever created the target owns its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceHandle(u64);

impl SurfaceHandle {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_raw(&self) -> u64 {
        self.0
    }
}

static NEXT_SURFACE_ID: AtomicU64 = AtomicU64::new(1);

/// Caller-owned decode target used by the transcode workflow
///
/// Created before the command is submitted, bound through the dispatcher and
/// released by the completion callback.
#[derive(Debug)]
pub struct DecodeSurface {
    handle: SurfaceHandle,
}

impl DecodeSurface {
    pub fn create() -> Self {
        let handle = SurfaceHandle(NEXT_SURFACE_ID.fetch_add(1, Ordering::Relaxed));
        tracing::debug!("Created decode surface {}", handle.as_raw());
        Self { handle }
    }

    pub fn handle(&self) -> SurfaceHandle {
        self.handle
    }

    pub fn release(self) {
        tracing::debug!("Released decode surface {}", self.handle.as_raw());
    }
}
