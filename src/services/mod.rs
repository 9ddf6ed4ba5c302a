//! Services module - command line construction for the UI actions.
//!
//! The builders here are framework-agnostic: they turn configuration into the
//! command strings the dispatcher runs, and turn results into status text.
//!
//! - [`transcode_command`]: re-encode a picked video to mp4
//! - [`camera_command`]: capture a camera and stream it over RTP multicast
//! - [`status_running`] / [`status_finished`]: status display text

pub mod commands;

pub use commands::{
    camera_command, status_finished, status_running, transcode_command, transcode_output_path,
};
