// Event loop bridge - Delivers work from background threads to the Slint event loop
//
// Slint's GUI event loop is single-threaded. The command dispatcher's worker
// finishes commands on its own thread, so completion callbacks have to be
// marshalled back before they touch any UI component.
//
// EventLoopPoster is the dispatcher's MainThread for the GUI, backed by
// slint::invoke_from_event_loop.

use crate::dispatcher::{MainTask, MainThread};

/// Posts tasks to the Slint event loop
///
/// Tasks run in posting order on the event loop thread. Posting before the
/// loop starts is fine, they run once it does.
///
/// Once the event loop has exited, posted tasks are dropped with a warning, so
/// completions of commands that finish after the window closed never run.
/// `main` quits and waits for the queue to go idle before exiting, but those
/// late completions are still only logged.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventLoopPoster;

impl MainThread for EventLoopPoster {
    fn post(&self, task: MainTask) {
        if let Err(e) = slint::invoke_from_event_loop(task) {
            tracing::warn!("Failed to queue task to event loop: {:?}", e);
        }
    }
}
