//! Append-only drop log.
//!
//! Written incrementally during the run: one header, then one line per drop
//! event transition. Each line is written straight to the file so a crash
//! mid-run still leaves everything up to the last transition on disk.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use crate::config::TimeBasis;
use crate::error::{MonitorError, Result};
use crate::tracker::{DropEvent, TrackerSignal};

/// Header fields written once at the top of the log
#[derive(Debug, Clone)]
pub struct LogHeader<'a> {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub target: &'a str,
    pub platform: &'a str,
}

/// Writer for the drop log file
pub struct DropLog {
    path: PathBuf,
    file: File,
    time_basis: TimeBasis,
    write_failures: u64,
}

impl DropLog {
    /// Create (truncating) the log at `path` and write the header
    pub fn create(path: &Path, header: &LogHeader<'_>, time_basis: TimeBasis) -> Result<Self> {
        let log_error = |source| MonitorError::LogFile { path: path.to_path_buf(), source };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(log_error)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .map_err(log_error)?;

        write_header(&mut file, header, time_basis).map_err(log_error)?;

        Ok(Self { path: path.to_path_buf(), file, time_basis, write_failures: 0 })
    }

    /// Wrap an already open file, header not written
    #[cfg(test)]
    pub(crate) fn from_file(path: &Path, file: File, time_basis: TimeBasis) -> Self {
        Self { path: path.to_path_buf(), file, time_basis, write_failures: 0 }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of lines that could not be written
    pub fn write_failures(&self) -> u64 {
        self.write_failures
    }

    /// Record a tracker transition. Continuing drops of an already open
    /// event are not logged; only the open and the close are.
    pub fn record(&mut self, signal: &TrackerSignal) {
        if let Some(line) = signal_line(signal, self.time_basis) {
            self.append(&line);
        }
    }

    /// Record an event the run ended on before it recovered
    pub fn record_unresolved(&mut self, event: &DropEvent) {
        let line = unresolved_line(event, self.time_basis);
        self.append(&line);
    }

    fn append(&mut self, line: &str) {
        let result = writeln!(self.file, "{line}").and_then(|_| self.file.flush());
        if let Err(e) = result {
            self.write_failures += 1;
            warn!(path = %self.path.display(), "Failed to append to drop log: {}", e);
        }
    }
}

fn write_header(out: &mut impl Write, header: &LogHeader<'_>, time_basis: TimeBasis) -> io::Result<()> {
    writeln!(out, "Ping Monitor Started - {}", time_basis.timestamp(header.started_at))?;
    writeln!(out, "Target: {}", header.target)?;
    writeln!(out, "System: {}", header.platform)?;
    writeln!(out, "Run: {}", header.run_id)?;
    writeln!(out, "{}", "-".repeat(50))?;
    out.flush()
}

/// `<timestamp> - <description>` line for a transition, `None` for
/// continuing drops
pub(crate) fn signal_line(signal: &TrackerSignal, time_basis: TimeBasis) -> Option<String> {
    match signal {
        TrackerSignal::DropDetected { at, consecutive_count: 1 } => {
            Some(format!("{} - Packet drop detected (consecutive: 1)", time_basis.timestamp(*at)))
        }
        TrackerSignal::DropDetected { .. } => None,
        TrackerSignal::Recovered { event } => {
            let end = event.end_time.unwrap_or(event.start_time);
            Some(format!(
                "{} - Connection restored after {} drops",
                time_basis.timestamp(end),
                event.consecutive_count
            ))
        }
    }
}

fn unresolved_line(event: &DropEvent, time_basis: TimeBasis) -> String {
    let end = event.end_time.unwrap_or(event.start_time);
    format!(
        "{} - Monitoring ended during outage, unresolved (consecutive: {})",
        time_basis.timestamp(end),
        event.consecutive_count
    )
}
