use thiserror::Error;

use crate::types::CaptureRect;

/// Malformed signature set or rule. Rejected at load; the affected rule
/// never starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("signature \"{0}\" has no colors")]
    EmptySequence(String),
    #[error("readout refers to unknown signature \"{0}\"")]
    UnknownSignature(String),
    #[error("rule \"{id}\": {reason}")]
    InvalidRule { id: String, reason: String },
    #[error("malformed rule: {0}")]
    MalformedRule(#[source] serde_json::Error),
    #[error("invalid settings: {0}")]
    Settings(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Region unavailable or short read. The scan cycle is skipped and the
/// last known signals are kept.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("window {0} is not capturable")]
    Unavailable(String),
    #[error("short pixel buffer: expected {expected} bytes, got {got}")]
    ShortRead { expected: usize, got: usize },
    #[error("rect {rect:?} outside {width}x{height} buffer")]
    OutOfBounds { rect: CaptureRect, width: u32, height: u32 },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Action dispatch failed. Reported to the submitter; retrying is the
/// submitter's call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutorError {
    #[error("executor unavailable: {0}")]
    Unavailable(String),
    #[error("dispatch failed: {0}")]
    Failed(String),
    #[error("action gate cancelled")]
    Cancelled,
}
