use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// User configuration from `FFmpegPlay Config.yaml`
///
/// Every section falls back to its defaults when missing, so an empty file is a
/// valid configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(rename = "FFmpeg", default)]
    pub ffmpeg: FFmpegSettings,

    #[serde(rename = "Transcode", default)]
    pub transcode: TranscodeSettings,

    #[serde(rename = "Camera", default)]
    pub camera: CameraSettings,

    /// Named command lines offered by the preset picker, in display order
    #[serde(rename = "Presets", default = "default_presets")]
    pub presets: IndexMap<String, String>,

    #[serde(rename = "Quit Policy", default)]
    pub quit_policy: QuitPolicy,

    #[serde(rename = "Debug Mode", default)]
    pub debug_mode: bool,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            ffmpeg: FFmpegSettings::default(),
            transcode: TranscodeSettings::default(),
            camera: CameraSettings::default(),
            presets: default_presets(),
            quit_policy: QuitPolicy::default(),
            debug_mode: false,
        }
    }
}

/// Location of the ffmpeg executable that backs the execution boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FFmpegSettings {
    /// Replaces a leading `ffmpeg` token in every command. A bare name is
    /// resolved through `PATH`.
    #[serde(rename = "Binary Path", default = "default_binary_path")]
    pub binary_path: String,
}

impl Default for FFmpegSettings {
    fn default() -> Self {
        Self {
            binary_path: default_binary_path(),
        }
    }
}

/// Settings for the "transcode a picked video" action
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscodeSettings {
    #[serde(rename = "Hwaccel")]
    pub hwaccel: String,

    #[serde(rename = "Video Codec")]
    pub video_codec: String,

    #[serde(rename = "Output Directory")]
    pub output_dir: String,

    #[serde(rename = "Output File")]
    pub output_file: String,
}

impl Default for TranscodeSettings {
    fn default() -> Self {
        Self {
            hwaccel: "auto".to_string(),
            video_codec: "libx264".to_string(),
            output_dir: "output".to_string(),
            output_file: "video.mp4".to_string(),
        }
    }
}

/// Settings for the camera capture -> RTP streaming action
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    #[serde(rename = "Video Size")]
    pub video_size: String,

    #[serde(rename = "Frame Rate")]
    pub framerate: u32,

    /// Capture demuxer (`v4l2`, `avfoundation`, `dshow`, ...)
    #[serde(rename = "Input Format")]
    pub input_format: String,

    #[serde(rename = "Device")]
    pub device: String,

    #[serde(rename = "Video Codec")]
    pub video_codec: String,

    #[serde(rename = "GOP Size")]
    pub gop: u32,

    #[serde(rename = "Bitrate")]
    pub bitrate: u64,

    #[serde(rename = "RTP URL")]
    pub rtp_url: String,
}

impl Default for CameraSettings {
    fn default() -> Self {
        let (input_format, device) = default_capture_device();
        Self {
            video_size: "1280x720".to_string(),
            framerate: 30,
            input_format: input_format.to_string(),
            device: device.to_string(),
            video_codec: "libx264".to_string(),
            gop: 60,
            bitrate: 500_000,
            rtp_url: "rtp://224.0.0.1:8888".to_string(),
        }
    }
}

/// What the quit action does to commands that are still waiting in the queue
///
/// The running command is always asked to stop through the execution boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuitPolicy {
    /// Only the running command is signalled; queued commands keep draining
    #[default]
    SignalOnly,

    /// Commands queued at the time of the quit are skipped and reported as cancelled
    DropQueued,
}

fn default_binary_path() -> String {
    "ffmpeg".to_string()
}

fn default_capture_device() -> (&'static str, &'static str) {
    if cfg!(target_os = "windows") {
        ("dshow", "video=Integrated Camera")
    } else if cfg!(target_os = "macos") {
        ("avfoundation", "0")
    } else {
        ("v4l2", "/dev/video0")
    }
}

fn default_presets() -> IndexMap<String, String> {
    let mut presets = IndexMap::new();
    presets.insert("Version".to_string(), "ffmpeg -hide_banner -version".to_string());
    presets.insert(
        "Hardware accels".to_string(),
        "ffmpeg -hide_banner -hwaccels".to_string(),
    );
    presets.insert(
        "Test pattern".to_string(),
        "ffmpeg -hide_banner -f lavfi -i testsrc=duration=5:size=640x360:rate=30 -f null -"
            .to_string(),
    );
    presets
}
