use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::ExecutorError;
use crate::logger;
use crate::platform::Executor;
use crate::sleep;
use crate::types::WindowId;

/// One key press to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    pub window_id: WindowId,
    pub key: String,
    /// Rule that asked for it, for logs.
    pub source: String,
}

/// Opens a fresh executor channel.
pub type Connector = Box<dyn Fn() -> Result<Box<dyn Executor>, ExecutorError> + Send + Sync>;

/// Outcome of one submitted request.
pub struct Receipt(Receiver<Result<(), ExecutorError>>);

impl Receipt {
    /// Block until the request was dispatched or failed.
    pub fn wait(self) -> Result<(), ExecutorError> {
        self.0.recv().unwrap_or_else(|_| Err(dropped()))
    }

    /// The outcome if it is already known. Never blocks.
    pub fn poll(&self) -> Option<Result<(), ExecutorError>> {
        match self.0.try_recv() {
            Ok(r) => Some(r),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(dropped())),
        }
    }

    pub fn wait_timeout(self, timeout: Duration) -> Option<Result<(), ExecutorError>> {
        match self.0.recv_timeout(timeout) {
            Ok(r) => Some(r),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(dropped())),
        }
    }
}

fn dropped() -> ExecutorError {
    ExecutorError::Unavailable("request dropped by executor channel".into())
}

struct Job {
    request: ActionRequest,
    reply: Sender<Result<(), ExecutorError>>,
}

#[derive(Default)]
struct Channel {
    tx: Option<Sender<Job>>,
    alive: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

/// Serializes key presses from every rule into one outbound stream.
///
/// Requests go out in submission order, one at a time, with at least
/// `min_delay` between the end of one dispatch and the start of the next.
/// If the executor goes away, everything queued fails at once and the next
/// submission reconnects.
pub struct ActionGate {
    connect: Connector,
    min_delay: Duration,
    jitter: f64,
    // Survives reconnects so a restart cannot shortcut the delay.
    last_dispatch: Arc<Mutex<Option<Instant>>>,
    closed: Arc<AtomicBool>,
    channel: Mutex<Channel>,
}

impl ActionGate {
    pub fn new(connect: Connector, min_delay: Duration) -> Self {
        Self {
            connect,
            min_delay,
            jitter: 0.0,
            last_dispatch: Arc::new(Mutex::new(None)),
            closed: Arc::new(AtomicBool::new(false)),
            channel: Mutex::new(Channel::default()),
        }
    }

    /// Add up to `spread * min_delay` of random extra delay per request.
    pub fn with_jitter(mut self, spread: f64) -> Self {
        self.jitter = spread.max(0.0);
        self
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }

    /// Queue a request. Fails immediately when the gate is shut down or the
    /// executor cannot be reached.
    pub fn submit(&self, request: ActionRequest) -> Result<Receipt, ExecutorError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ExecutorError::Cancelled);
        }

        let mut channel = self.channel.lock().unwrap_or_else(|e| e.into_inner());
        // Shutdown may have run while we waited for the lock.
        if self.closed.load(Ordering::SeqCst) {
            return Err(ExecutorError::Cancelled);
        }
        if !channel.alive.load(Ordering::SeqCst) {
            self.restart(&mut channel)?;
        }

        let (reply, receipt) = mpsc::channel();
        let tx = channel.tx.as_ref().ok_or_else(dropped)?;
        if tx.send(Job { request, reply }).is_err() {
            // Worker exited between the liveness check and the send.
            channel.alive.store(false, Ordering::SeqCst);
            return Err(dropped());
        }
        Ok(Receipt(receipt))
    }

    fn restart(&self, channel: &mut Channel) -> Result<(), ExecutorError> {
        // Old worker has already drained its queue and is exiting.
        channel.tx = None;
        if let Some(old) = channel.worker.take() {
            old.join().ok();
        }

        let executor = (self.connect)().map_err(|e| {
            logger::warn_p("gate", &format!("executor unavailable: {}", e));
            e
        })?;

        let (tx, rx) = mpsc::channel::<Job>();
        let alive = Arc::new(AtomicBool::new(true));
        let worker = Worker {
            executor,
            rx,
            alive: Arc::clone(&alive),
            closed: Arc::clone(&self.closed),
            last_dispatch: Arc::clone(&self.last_dispatch),
            min_delay: self.min_delay,
            jitter: self.jitter,
        };

        let handle = thread::Builder::new()
            .name("action-gate".into())
            .spawn(move || worker.run())
            .map_err(|e| ExecutorError::Unavailable(format!("cannot spawn gate worker: {}", e)))?;

        logger::info_p("gate", "executor channel open");
        *channel = Channel { tx: Some(tx), alive, worker: Some(handle) };
        Ok(())
    }

    /// Stop admitting requests. Queued requests fail with `Cancelled`; a
    /// dispatch already in flight completes. Blocks until the worker exits.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut channel = self.channel.lock().unwrap_or_else(|e| e.into_inner());
        channel.tx = None;
        if let Some(worker) = channel.worker.take() {
            worker.join().ok();
        }
        channel.alive.store(false, Ordering::SeqCst);
        logger::info_p("gate", "shut down");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Drop for ActionGate {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Worker {
    executor: Box<dyn Executor>,
    rx: Receiver<Job>,
    alive: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
    last_dispatch: Arc<Mutex<Option<Instant>>>,
    min_delay: Duration,
    jitter: f64,
}

impl Worker {
    fn run(mut self) {
        while let Ok(job) = self.rx.recv() {
            if self.closed.load(Ordering::SeqCst) {
                job.reply.send(Err(ExecutorError::Cancelled)).ok();
                continue;
            }

            let last = *self.last_dispatch.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(last) = last {
                sleep::sleep_until(last + sleep::jitter(self.min_delay, self.jitter));
            }
            if self.closed.load(Ordering::SeqCst) {
                job.reply.send(Err(ExecutorError::Cancelled)).ok();
                continue;
            }

            let Job { request, reply } = job;
            let result = self.executor.dispatch(request.window_id, &request.key);
            *self.last_dispatch.lock().unwrap_or_else(|e| e.into_inner()) = Some(Instant::now());

            match &result {
                Ok(()) => {
                    logger::info_p("gate", &format!("{} -> {} ({})", request.key, request.window_id, request.source));
                }
                Err(ExecutorError::Unavailable(reason)) => {
                    logger::warn_p("gate", &format!("executor lost: {}", reason));
                    self.alive.store(false, Ordering::SeqCst);
                    reply.send(result.clone()).ok();
                    self.fail_queued(ExecutorError::Unavailable(reason.clone()));
                    return;
                }
                Err(e) => {
                    logger::warn_p("gate", &format!("{} failed for {}: {}", request.key, request.source, e));
                }
            }
            reply.send(result).ok();
        }
        self.alive.store(false, Ordering::SeqCst);
    }

    fn fail_queued(&self, err: ExecutorError) {
        while let Ok(job) = self.rx.try_recv() {
            job.reply.send(Err(err.clone())).ok();
        }
    }
}
