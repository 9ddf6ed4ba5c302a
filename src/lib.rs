// FFmpeg Play - Run FFmpeg command lines from a small GUI playground
//
// This is the library crate containing the command dispatcher, the FFmpeg
// execution boundary and configuration. The binary crate (main.rs) provides
// the GUI entry point.

pub mod config;
pub mod dispatcher;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod native;
pub mod services;
pub mod ui;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use dispatcher::{CommandDispatcher, MainLoop, MainThread};
pub use models::{ExecutionResult, QuitPolicy, UserConfig};
pub use native::{NativeExecutor, ProcessExecutor, SurfaceHandle};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
