//! Pingwatch - continuous reachability monitoring for a single target
//!
//! This library probes one host at a fixed cadence, classifies failed probes
//! into drop events, keeps running statistics for the run and turns the
//! final state into a drop log and a summary report.

pub mod config;
pub mod error;
pub mod monitor;
pub mod probe;
pub mod recorder;
pub mod report;
pub mod scheduler;
pub mod stats;
pub mod tracker;
pub mod validation;

// Re-export main types
pub use config::{MonitorConfig, MonitorConfigBuilder, TimeBasis};
pub use error::{MonitorError, Result};
pub use monitor::{Monitor, RunSummary};
pub use probe::{ProbeError, ProbeMethod, ProbeOutcome, Prober};
pub use recorder::Recorder;
pub use report::{ReportFormat, ReportGenerator, RunReport, SuccessBand};
pub use scheduler::{CancelHandle, CancelSignal, ProgressSnapshot, Scheduler, StopReason};
pub use stats::{RunStats, StatsAccumulator};
pub use tracker::{DropEvent, DropTracker, LinkState, TrackerSignal};

/// Default probe target when none is configured
pub const DEFAULT_TARGET: &str = "8.8.8.8";

/// Platform identifier written into the drop log header and the report
pub fn platform() -> String {
    format!("{} {}", std::env::consts::OS, std::env::consts::ARCH)
}
