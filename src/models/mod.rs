//! Data models for FFmpeg Play.
//!
//! - [`UserConfig`]: settings loaded from `FFmpegPlay Config.yaml` (ffmpeg binary,
//!   transcode and camera command parameters, presets, quit policy)
//! - [`ExecutionResult`]: a submitted command paired with the status FFmpeg returned
//! - [`QuitPolicy`]: how the quit action treats commands still waiting in the queue

pub mod config;
pub mod execution;

pub use config::{CameraSettings, FFmpegSettings, QuitPolicy, TranscodeSettings, UserConfig};
pub use execution::{AVERROR_EXIT, ExecutionResult, STATUS_INVALID};
