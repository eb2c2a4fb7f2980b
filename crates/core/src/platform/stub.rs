use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use regex::RegexBuilder;

use crate::error::{CaptureError, ExecutorError};
use crate::logger;
use crate::types::*;
use super::{Executor, Platform, WindowHandle};

const WINDOWS: &[(WindowId, &str)] = &[
    (10001, "Tibia - Knight"),
    (10002, "Tibia - Druid"),
    (30001, "Notepad"),
];

/// In-process platform: serves one shared frame (usually replayed from a
/// raw dump) to every window and records key presses instead of sending
/// them. Clones share state, so a test can keep one to inspect.
#[derive(Clone)]
pub struct StubPlatform {
    frame: Arc<Mutex<Option<Arc<Capture>>>>,
    dispatched: Arc<Mutex<Vec<(WindowId, String)>>>,
    online: Arc<AtomicBool>,
}

impl Default for StubPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl StubPlatform {
    pub fn new() -> Self {
        Self {
            frame: Arc::new(Mutex::new(None)),
            dispatched: Arc::new(Mutex::new(Vec::new())),
            online: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Replace the frame every window captures from.
    pub fn set_frame(&self, frame: Capture) {
        *self.frame.lock().unwrap_or_else(|e| e.into_inner()) = Some(Arc::new(frame));
    }

    pub fn clear_frame(&self) {
        *self.frame.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Take the executor down (or bring it back).
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Every key press so far, in dispatch order.
    pub fn dispatched(&self) -> Vec<(WindowId, String)> {
        self.dispatched.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Platform for StubPlatform {
    fn get_instances(&self, pattern: &str) -> Vec<(WindowId, String)> {
        let re = match RegexBuilder::new(pattern).case_insensitive(true).build() {
            Ok(r) => r,
            Err(e) => {
                logger::error_p("stub", &format!("invalid pattern '{}': {}", pattern, e));
                return Vec::new();
            }
        };
        WINDOWS
            .iter()
            .filter(|(_, title)| re.is_match(title))
            .map(|(id, title)| (*id, title.to_string()))
            .collect()
    }

    fn create_window(&self, window_id: WindowId) -> Box<dyn WindowHandle> {
        let title = WINDOWS
            .iter()
            .find(|(id, _)| *id == window_id)
            .map_or_else(|| format!("Stub-{}", window_id), |(_, t)| t.to_string());
        Box::new(StubWindow { window_id, title, frame: Arc::clone(&self.frame) })
    }

    fn connect_executor(&self) -> Result<Box<dyn Executor>, ExecutorError> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(ExecutorError::Unavailable("stub executor offline".into()));
        }
        logger::info_p("stub", "executor connected");
        Ok(Box::new(StubExecutor {
            dispatched: Arc::clone(&self.dispatched),
            online: Arc::clone(&self.online),
        }))
    }
}

struct StubWindow {
    window_id: WindowId,
    title: String,
    frame: Arc<Mutex<Option<Arc<Capture>>>>,
}

impl WindowHandle for StubWindow {
    fn id(&self) -> WindowId { self.window_id }
    fn title(&self) -> &str { &self.title }

    fn region(&self) -> Option<Region> {
        let frame = self.frame.lock().unwrap_or_else(|e| e.into_inner());
        frame.as_ref().map(|f| Region { l: 0, t: 0, w: f.width as i32, h: f.height as i32 })
    }

    fn capture(&mut self, rect: Option<CaptureRect>) -> Result<Capture, CaptureError> {
        // Clone the Arc out so the crop runs without holding the lock.
        let frame = self.frame.lock().unwrap_or_else(|e| e.into_inner()).clone();
        let frame = frame.ok_or_else(|| CaptureError::Unavailable(self.title.clone()))?;
        match rect {
            Some(r) => frame.crop(r),
            None => Ok(frame.as_ref().clone()),
        }
    }
}

struct StubExecutor {
    dispatched: Arc<Mutex<Vec<(WindowId, String)>>>,
    online: Arc<AtomicBool>,
}

impl Executor for StubExecutor {
    fn dispatch(&mut self, window_id: WindowId, key: &str) -> Result<(), ExecutorError> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(ExecutorError::Unavailable("stub executor offline".into()));
        }
        logger::info_p("stub", &format!("win({}).tap(\"{}\")", window_id, key));
        self.dispatched
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((window_id, key.to_string()));
        Ok(())
    }
}
