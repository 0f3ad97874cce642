use std::io::Error as IoError;
use std::path::PathBuf;

use thiserror::Error;

use crate::probe::ProbeError;

/// Errors that abort a monitoring run before it starts, or that the caller
/// must see when finalizing it.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Probe mechanism unavailable: {0}")]
    ProbeCapability(#[from] ProbeError),

    #[error("Cannot open drop log {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: IoError,
    },

    #[error("Report path {path} is not writable: {reason}")]
    ReportPath { path: PathBuf, reason: String },

    #[error("Failed to write report {path}: {source}")]
    ReportWrite {
        path: PathBuf,
        #[source]
        source: IoError,
    },

    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Pingwatch result type
pub type Result<T> = std::result::Result<T, MonitorError>;
