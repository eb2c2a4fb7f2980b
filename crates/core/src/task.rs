use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::logger;

/// A named loop running `tick` on its own thread at a fixed period.
///
/// Ticks never overlap: a slow tick delays the next one instead of
/// stacking. Dropping or cancelling the handle stops the loop without
/// waiting out the current period.
pub struct Task {
    name: String,
    stop_tx: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Task {
    pub fn every<F>(name: impl Into<String>, interval: Duration, mut tick: F) -> Task
    where
        F: FnMut() + Send + 'static,
    {
        let name = name.into();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let thread_name = name.clone();

        let handle = thread::Builder::new().name(thread_name.clone()).spawn(move || {
            let mut next = Instant::now();
            loop {
                let wait = next.saturating_duration_since(Instant::now());
                match stop_rx.recv_timeout(wait) {
                    Err(RecvTimeoutError::Timeout) => {}
                    // Stop request or handle dropped
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
                tick();
                next += interval;
                // Fell behind: restart the cadence from now rather than burst.
                let now = Instant::now();
                if next < now {
                    next = now;
                }
            }
        });

        let handle = match handle {
            Ok(h) => Some(h),
            Err(e) => {
                logger::error(&format!("failed to spawn task {}: {}", thread_name, e));
                None
            }
        };

        Task { name, stop_tx: Some(stop_tx), handle }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the loop and wait for an in-progress tick to finish.
    pub fn cancel(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            tx.send(()).ok();
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                logger::error(&format!("task {} panicked", self.name));
            }
        }
    }
}

impl Drop for Task {
    fn drop(&mut self) {
        self.shutdown();
    }
}
