pub mod stub;

use std::path::Path;

use anyhow::Result;

use crate::error::{CaptureError, ExecutorError};
use crate::types::*;

/// Handle to a specific OS window, providing capture.
pub trait WindowHandle: Send {
    fn id(&self) -> WindowId;
    fn title(&self) -> &str;
    fn region(&self) -> Option<Region>;
    /// Capture `rect` (window-relative), or the whole window for `None`.
    fn capture(&mut self, rect: Option<CaptureRect>) -> Result<Capture, CaptureError>;
}

/// The input-simulation side: performs a key press in a window.
pub trait Executor: Send {
    fn dispatch(&mut self, window_id: WindowId, key: &str) -> Result<(), ExecutorError>;
}

/// Platform-level operations (window enumeration, factories).
pub trait Platform: Send + Sync {
    fn get_instances(&self, pattern: &str) -> Vec<(WindowId, String)>;
    fn create_window(&self, window_id: WindowId) -> Box<dyn WindowHandle>;
    /// Open a channel to the executor. May fail while it is not running.
    fn connect_executor(&self) -> Result<Box<dyn Executor>, ExecutorError>;
}

/// Create the platform. Only the replaying stub ships; OS back-ends plug in
/// through the traits above.
pub fn create_platform(replay: Option<&Path>) -> Result<stub::StubPlatform> {
    let platform = stub::StubPlatform::new();
    if let Some(path) = replay {
        platform.set_frame(crate::dump::load_dump(path)?);
    }
    Ok(platform)
}
