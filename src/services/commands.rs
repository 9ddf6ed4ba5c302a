use crate::models::{CameraSettings, ExecutionResult, TranscodeSettings};
use camino::{Utf8Path, Utf8PathBuf};

/// Quote an argument for the executor's tokenizer when it contains whitespace
fn quote_arg(arg: &str) -> String {
    if arg.chars().any(char::is_whitespace) {
        format!("\"{}\"", arg)
    } else {
        arg.to_string()
    }
}

/// Where the transcode action writes its output
pub fn transcode_output_path(settings: &TranscodeSettings) -> Utf8PathBuf {
    Utf8Path::new(&settings.output_dir).join(&settings.output_file)
}

/// Build the "transcode a picked video" command
///
/// Decodes with the configured hwaccel, drops audio, re-encodes video and
/// overwrites the mp4 output.
pub fn transcode_command(settings: &TranscodeSettings, input: &Utf8Path) -> String {
    format!(
        "ffmpeg -hwaccel {} -i {} -an -c:v {} -f mp4 -y {}",
        settings.hwaccel,
        quote_arg(input.as_str()),
        settings.video_codec,
        quote_arg(transcode_output_path(settings).as_str())
    )
}

/// Build the camera capture -> RTP multicast streaming command
///
/// Runs until the stream is stopped with the quit action.
pub fn camera_command(settings: &CameraSettings) -> String {
    format!(
        "ffmpeg -v debug -video_size {} -framerate {} -f {} -i {} -c:v {} -g {} -b:v {} -f rtp_mpegts {}",
        settings.video_size,
        settings.framerate,
        settings.input_format,
        quote_arg(&settings.device),
        settings.video_codec,
        settings.gop,
        settings.bitrate,
        settings.rtp_url
    )
}

/// Status line shown while a command is queued or running
pub fn status_running(command: &str) -> String {
    format!("Run FFmpeg cmd: {} ...", command)
}

/// Status line shown once a command has returned
pub fn status_finished(result: &ExecutionResult) -> String {
    if result.cancelled {
        format!("Run FFmpeg cmd: {} cancelled", result.command)
    } else {
        format!("Run FFmpeg cmd: {} ret {}", result.command, result.status)
    }
}
