//! FFmpeg Play - type or trigger an FFmpeg command line and watch its status.
//!
//! Main entry point for the GUI application.
//!
//! # Overview
//!
//! This binary crate provides the Slint GUI frontend. It initializes:
//! - Configuration loading ([`ConfigManager`])
//! - Logging infrastructure (file rotation + console output)
//! - Tokio runtime (drives ffmpeg child processes and their I/O)
//! - The FFmpeg execution boundary ([`ProcessExecutor`])
//! - The command dispatcher ([`CommandDispatcher`], one worker thread)
//! - GUI controller ([`GuiController`] - wires Slint callbacks to the dispatcher)
//!
//! # Threading
//!
//! - **Main thread**: runs the Slint event loop and every completion callback
//! - **ffmpeg-worker**: runs one command at a time, blocking for its duration
//! - **Tokio workers**: child process I/O (stdin keys, stderr logging)
//!
//! # Configuration Files
//!
//! Expected in `FFmpegPlay Data/`:
//! - `FFmpegPlay Config.yaml`: ffmpeg binary, transcode/camera parameters,
//!   presets, quit policy (optional, defaults apply when missing)

use anyhow::{Context, Result};
use ffmpeg_play::ui::{EventLoopPoster, GuiController};
use ffmpeg_play::{APP_NAME, CommandDispatcher, ConfigManager, ProcessExecutor, VERSION};
use std::sync::Arc;
use std::time::Duration;

fn main() -> Result<()> {
    let config_manager = ConfigManager::new("FFmpegPlay Data")?;
    let user_config = Arc::new(config_manager.load_user_config()?);

    let _log_guard =
        ffmpeg_play::logging::setup_logging("logs", APP_NAME, user_config.debug_mode, true)?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .thread_name("ffmpeg-play-io")
        .build()?;

    let executor = Arc::new(ProcessExecutor::new(
        user_config.ffmpeg.binary_path.clone(),
        runtime.handle().clone(),
    ));
    executor
        .probe()
        .with_context(|| format!("FFmpeg binary '{}' is not usable", executor.binary()))?;
    tracing::info!("Using ffmpeg binary: {}", executor.binary());

    let dispatcher = Arc::new(CommandDispatcher::with_policy(
        executor,
        Arc::new(EventLoopPoster),
        user_config.quit_policy,
    ));

    let gui_controller = GuiController::new(Arc::clone(&user_config), Arc::clone(&dispatcher))?;

    tracing::info!("GUI controller initialized, launching window");

    // Blocks until the window is closed
    let result = gui_controller.run();

    tracing::info!("GUI closed, shutting down");

    if dispatcher.pending() > 0 {
        tracing::warn!(
            "Window closed with {} command(s) pending - stopping",
            dispatcher.pending()
        );
        dispatcher.quit();
        // Completions posted from here on are dropped; the event loop is gone
        if !dispatcher.wait_idle(Duration::from_secs(5)) {
            tracing::warn!(
                "{} command(s) still running after quit - abandoning",
                dispatcher.pending()
            );
        }
    }
    dispatcher.metrics().log_summary();

    // The worker is detached; a command that ignores quit dies with the process
    drop(dispatcher);
    runtime.shutdown_timeout(Duration::from_secs(5));

    tracing::info!("Application shutdown complete");

    result.map_err(|e| {
        tracing::error!("GUI error: {}", e);
        anyhow::anyhow!("GUI error: {}", e)
    })
}
