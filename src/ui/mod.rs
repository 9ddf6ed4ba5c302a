// UI module - GUI logic and event loop bridge
//
// This module contains:
// - EventLoopPoster: MainThread implementation that runs tasks on the Slint event loop
// - GuiController: Main controller that wires up the UI with the command dispatcher

pub mod bridge;
pub mod controller;

pub use bridge::EventLoopPoster;
pub use controller::GuiController;
