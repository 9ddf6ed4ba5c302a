// GUI Controller - Bridges the Slint UI with the command dispatcher
//
// This module contains the GuiController which coordinates between:
// - Slint UI (MainWindow)
// - CommandDispatcher (serialized FFmpeg execution)
// - Command builders (transcode, camera streaming)
//
// It handles:
// - Run / camera / preset actions -> dispatcher submissions
// - Transcode: file picker, input handle and decode surface, released on completion
// - Quit -> stop key for the running command
// - Status display and transient notices

use crate::dispatcher::CommandDispatcher;
use crate::models::{ExecutionResult, UserConfig};
use crate::native::DecodeSurface;
use crate::services::{
    camera_command, status_finished, status_running, transcode_command, transcode_output_path,
};
use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use slint::{ComponentHandle, ModelRc, SharedString, VecModel};
use std::fs;
use std::sync::Arc;
use std::time::Duration;

// Include the generated Slint code
slint::include_modules!();

/// How long a transient notice stays visible
const TOAST_DURATION: Duration = Duration::from_millis(3500);

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "mov", "avi", "webm", "ts", "flv", "3gp"];

/// GUI Controller that wires up the Slint UI with the command dispatcher
///
/// Every action runs on the Slint event loop thread. Commands go to the
/// dispatcher, and their completion callbacks come back to the same thread
/// through [`EventLoopPoster`](crate::ui::EventLoopPoster), so they can
/// touch the UI directly.
///
/// # Example
/// ```ignore
/// let dispatcher = Arc::new(CommandDispatcher::new(executor, Arc::new(EventLoopPoster)));
/// let controller = GuiController::new(Arc::new(user_config), dispatcher)?;
/// controller.run()?;  // Blocks until window is closed
/// ```
pub struct GuiController {
    /// The Slint UI window; its callbacks own the dispatcher handles
    ui: MainWindow,
}

impl GuiController {
    pub fn new(config: Arc<UserConfig>, dispatcher: Arc<CommandDispatcher>) -> Result<Self> {
        let ui = MainWindow::new().context("Failed to create Slint UI")?;

        let preset_names: Vec<SharedString> = config
            .presets
            .keys()
            .map(|name| SharedString::from(name.as_str()))
            .collect();
        ui.set_preset_names(ModelRc::new(VecModel::from(preset_names)));

        Self::setup_callbacks(&ui, &config, &dispatcher);

        tracing::info!("GUI controller initialized");

        Ok(Self { ui })
    }

    /// Run the GUI (blocks until window is closed)
    pub fn run(self) -> Result<(), slint::PlatformError> {
        tracing::info!("Starting GUI event loop");
        self.ui.run()
    }

    /// Set up Slint UI callbacks
    fn setup_callbacks(
        ui: &MainWindow,
        config: &Arc<UserConfig>,
        dispatcher: &Arc<CommandDispatcher>,
    ) {
        let dispatcher_clone = Arc::clone(dispatcher);
        let ui_weak = ui.as_weak();

        // Run whatever is in the command field
        ui.on_run_ffmpeg(move || {
            let Some(ui) = ui_weak.upgrade() else {
                return;
            };
            let command = ui.get_ffmpeg_cmd().to_string();
            Self::run_command(&ui, &dispatcher_clone, command);
        });

        let dispatcher_clone = Arc::clone(dispatcher);
        let config_clone = Arc::clone(config);
        let ui_weak = ui.as_weak();

        // Pick a video and transcode it
        ui.on_transcode(move || {
            tracing::debug!("Transcode clicked");
            if let Some(ui) = ui_weak.upgrade() {
                Self::transcode(&ui, &dispatcher_clone, &config_clone);
            }
        });

        let dispatcher_clone = Arc::clone(dispatcher);
        let config_clone = Arc::clone(config);
        let ui_weak = ui.as_weak();

        // Camera capture streamed over RTP
        ui.on_camera(move || {
            let Some(ui) = ui_weak.upgrade() else {
                return;
            };
            let command = camera_command(&config_clone.camera);
            ui.set_ffmpeg_cmd(command.as_str().into());
            Self::run_command(&ui, &dispatcher_clone, command);
        });

        let dispatcher_clone = Arc::clone(dispatcher);

        ui.on_quit(move || {
            tracing::info!("Quit clicked");
            dispatcher_clone.quit();
        });

        let config_clone = Arc::clone(config);
        let ui_weak = ui.as_weak();

        // Preset picked - fill the command field, don't run yet
        ui.on_preset_selected(move |name| {
            let Some(command) = config_clone.presets.get(name.as_str()) else {
                tracing::warn!("Unknown preset selected: {}", name);
                return;
            };
            if let Some(ui) = ui_weak.upgrade() {
                ui.set_ffmpeg_cmd(command.as_str().into());
            }
        });

        let dispatcher_clone = Arc::clone(dispatcher);

        // A streaming command would otherwise outlive the window
        ui.window().on_close_requested(move || {
            if dispatcher_clone.pending() > 0 {
                tracing::info!("Close requested with commands pending - sending quit");
                dispatcher_clone.quit();
            }
            slint::CloseRequestResponse::HideWindow
        });

        tracing::debug!("UI callbacks configured");
    }

    /// Submit `command` and show its status once it returns
    fn run_command(ui: &MainWindow, dispatcher: &CommandDispatcher, command: String) {
        ui.set_status_text(status_running(&command).into());
        ui.set_pending_commands(ui.get_pending_commands() + 1);

        let ui_weak = ui.as_weak();
        dispatcher.submit(command, move |result| {
            Self::on_ffmpeg_result(&ui_weak, &result);
        });
    }

    /// Transcode workflow
    ///
    /// The picked file stays open and the decode surface stays bound until the
    /// command returns; the completion callback releases both.
    fn transcode(ui: &MainWindow, dispatcher: &CommandDispatcher, config: &UserConfig) {
        let filters = vec![("Video files", VIDEO_EXTENSIONS)];
        let Some(input) = Self::show_file_picker("Select Video", filters) else {
            tracing::debug!("No video selected");
            return;
        };

        let input_handle = match fs::File::open(&input) {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!("Could not open '{}': {}", input, e);
                Self::show_toast(ui, "File not found.");
                return;
            }
        };

        let output = transcode_output_path(&config.transcode);
        if let Some(dir) = output.parent().filter(|dir| !dir.as_str().is_empty()) {
            if let Err(e) = fs::create_dir_all(dir) {
                tracing::warn!("Could not create output directory '{}': {}", dir, e);
                Self::show_toast(ui, "Output directory not writable.");
                return;
            }
        }

        let command = transcode_command(&config.transcode, &input);
        ui.set_ffmpeg_cmd(format!("Transcode with {}", command).into());
        ui.set_status_text(status_running(&command).into());
        ui.set_pending_commands(ui.get_pending_commands() + 1);

        let surface = DecodeSurface::create();
        dispatcher.bind_surface(surface.handle());

        let ui_weak = ui.as_weak();
        dispatcher.submit(command, move |result| {
            surface.release();
            drop(input_handle);
            Self::on_ffmpeg_result(&ui_weak, &result);
        });
    }

    fn on_ffmpeg_result(ui_weak: &slint::Weak<MainWindow>, result: &ExecutionResult) {
        tracing::info!("{}", status_finished(result));

        if let Some(ui) = ui_weak.upgrade() {
            ui.set_status_text(status_finished(result).into());
            ui.set_pending_commands((ui.get_pending_commands() - 1).max(0));
        }
    }

    /// Show a transient notice at the bottom of the window
    fn show_toast(ui: &MainWindow, text: &str) {
        ui.set_toast_text(text.into());
        ui.set_show_toast(true);

        let ui_weak = ui.as_weak();
        slint::Timer::single_shot(TOAST_DURATION, move || {
            if let Some(ui) = ui_weak.upgrade() {
                ui.set_show_toast(false);
            }
        });
    }

    /// Show a native file picker dialog
    ///
    /// # Returns
    /// The selected file path, or None if cancelled
    fn show_file_picker(title: &str, filters: Vec<(&str, &[&str])>) -> Option<Utf8PathBuf> {
        use rfd::FileDialog;

        let mut dialog = FileDialog::new().set_title(title);

        for (name, extensions) in filters {
            dialog = dialog.add_filter(name, extensions);
        }

        dialog.pick_file().and_then(|path| {
            Utf8PathBuf::try_from(path)
                .map_err(|e| {
                    tracing::error!("Failed to convert path to UTF-8: {}", e);
                    e
                })
                .ok()
        })
    }
}
