use std::io::Error as IoError;

use pingwatch::MonitorError;
use thiserror::Error;

use crate::config;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0:#}")]
    Io(#[from] IoError),
    #[error("Configuration error: {0}")]
    Config(#[from] config::Error),
    #[error(transparent)]
    Monitor(#[from] MonitorError),
    #[error("Run finished but its output is incomplete, see the warnings above")]
    IncompleteOutput,
}
