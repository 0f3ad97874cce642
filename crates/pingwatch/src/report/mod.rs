/// Report module - turns the final run state into output
///
/// This module is responsible for:
/// - The append-only drop log written during the run
/// - The `RunReport` data structure built at shutdown
/// - Rendering that structure as HTML, plain text or JSON
pub mod drop_log;
pub mod html;
pub mod text;

use std::fmt;
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{MonitorConfig, TimeBasis};
use crate::error::{MonitorError, Result};
use crate::probe::ProbeMethod;
use crate::scheduler::StopReason;
use crate::stats::RunStats;
use crate::tracker::DropEvent;

pub use drop_log::{DropLog, LogHeader};

/// Success-rate classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SuccessBand {
    /// >= 99.9%
    Excellent,
    /// >= 99.0%
    Good,
    /// >= 95.0%
    NoticeableIssues,
    /// < 95.0%
    SignificantIssues,
}

impl SuccessBand {
    /// Classify from raw counts; `None` when nothing was probed. Integer
    /// comparisons keep the thresholds exact.
    pub fn from_counts(total_probes: u64, total_drops: u64) -> Option<Self> {
        if total_probes == 0 {
            return None;
        }
        let total = total_probes as u128;
        let ok = total_probes.saturating_sub(total_drops) as u128;

        let band = if ok * 1000 >= total * 999 {
            SuccessBand::Excellent
        } else if ok * 100 >= total * 99 {
            SuccessBand::Good
        } else if ok * 20 >= total * 19 {
            SuccessBand::NoticeableIssues
        } else {
            SuccessBand::SignificantIssues
        };
        Some(band)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SuccessBand::Excellent => "Excellent",
            SuccessBand::Good => "Good",
            SuccessBand::NoticeableIssues => "Noticeable issues",
            SuccessBand::SignificantIssues => "Significant issues",
        }
    }

    /// Recommended action for the band
    pub fn recommendation(&self) -> &'static str {
        match self {
            SuccessBand::Excellent => "Connection is performing well. No action required.",
            SuccessBand::Good => {
                "Minor packet loss observed. Keep monitoring and re-test if symptoms persist."
            }
            SuccessBand::NoticeableIssues => {
                "Noticeable connectivity issues. Share this report with your ISP and request a line check."
            }
            SuccessBand::SignificantIssues => {
                "Significant connectivity issues affecting normal use. Contact your ISP with this \
                 report and request escalation."
            }
        }
    }
}

impl fmt::Display for SuccessBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Drops within one hour of the day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyDrops {
    pub hour: u8,
    pub drops: u64,
}

/// Round-trip summary in milliseconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencySummary {
    pub min_ms: f64,
    pub avg_ms: f64,
    pub max_ms: f64,
}

/// Everything the summary report is rendered from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub target: String,
    pub method: ProbeMethod,
    pub platform: String,
    pub probe_interval_ms: u64,
    pub max_duration_secs: Option<u64>,
    pub time_basis: TimeBasis,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub stop_reason: StopReason,
    pub total_probes: u64,
    pub total_drops: u64,
    /// `None` when no probe completed
    pub success_rate: Option<f64>,
    pub band: Option<SuccessBand>,
    pub longest_streak: u32,
    /// Non-zero hours only, ascending
    pub hourly: Vec<HourlyDrops>,
    pub events: Vec<DropEvent>,
    pub latency: Option<LatencySummary>,
    pub conclusion: String,
    pub warnings: Vec<String>,
}

impl RunReport {
    pub fn duration(&self) -> Duration {
        (self.ended_at - self.started_at).to_std().unwrap_or_default()
    }

    pub fn has_data(&self) -> bool {
        self.total_probes > 0
    }

    /// Loss in percent, `None` when no probe completed
    pub fn loss_percent(&self) -> Option<f64> {
        self.success_rate.map(|rate| (1.0 - rate) * 100.0)
    }

    /// Render a timestamp on the report's clock
    pub fn timestamp(&self, at: DateTime<Utc>) -> String {
        self.time_basis.timestamp(at)
    }
}

/// Builds a [`RunReport`] from the final state of a run
pub struct ReportGenerator<'a> {
    config: &'a MonitorConfig,
    run_id: Uuid,
    platform: String,
}

impl<'a> ReportGenerator<'a> {
    pub fn new(config: &'a MonitorConfig, run_id: Uuid, platform: impl Into<String>) -> Self {
        Self { config, run_id, platform: platform.into() }
    }

    pub fn build(
        &self,
        stats: &RunStats,
        events: &[DropEvent],
        stop_reason: StopReason,
        warnings: Vec<String>,
    ) -> RunReport {
        let has_data = stats.total_probes > 0;
        let band = SuccessBand::from_counts(stats.total_probes, stats.total_drops);

        let hourly = stats
            .nonzero_hours()
            .map(|(hour, drops)| HourlyDrops { hour: hour as u8, drops })
            .collect();

        let latency = match (stats.latency.min, stats.latency.avg(), stats.latency.max) {
            (Some(min), Some(avg), Some(max)) => Some(LatencySummary {
                min_ms: as_millis_f64(min),
                avg_ms: as_millis_f64(avg),
                max_ms: as_millis_f64(max),
            }),
            _ => None,
        };

        RunReport {
            run_id: self.run_id,
            target: self.config.target_address.clone(),
            method: self.config.method,
            platform: self.platform.clone(),
            probe_interval_ms: self.config.probe_interval.as_millis() as u64,
            max_duration_secs: self.config.max_duration.map(|d| d.as_secs()),
            time_basis: self.config.time_basis,
            started_at: stats.start_time,
            ended_at: stats.end_time.unwrap_or_else(Utc::now),
            stop_reason,
            total_probes: stats.total_probes,
            total_drops: stats.total_drops,
            success_rate: has_data.then(|| stats.success_rate()),
            band,
            longest_streak: stats.longest_streak,
            hourly,
            events: events.to_vec(),
            latency,
            conclusion: conclusion(stats, band),
            warnings,
        }
    }
}

fn conclusion(stats: &RunStats, band: Option<SuccessBand>) -> String {
    match band {
        None => "No data collected: the run ended before any probe completed.".to_string(),
        Some(band) if stats.total_drops == 0 => {
            format!("No drops detected across {} probes. {}", stats.total_probes, band.recommendation())
        }
        Some(band) => format!(
            "{} of {} probes dropped ({}). {}",
            stats.total_drops,
            stats.total_probes,
            band.label(),
            band.recommendation()
        ),
    }
}

fn as_millis_f64(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// `HH:MM:SS` rendering of a duration; hours are not wrapped
pub fn fmt_hms(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Output format of the summary report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Html,
    Json,
    Text,
}

impl ReportFormat {
    /// Pick the format from the report path's extension
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase).as_deref() {
            Some("html") | Some("htm") => ReportFormat::Html,
            Some("json") => ReportFormat::Json,
            _ => ReportFormat::Text,
        }
    }

    pub fn render(&self, report: &RunReport) -> Result<String> {
        match self {
            ReportFormat::Html => Ok(html::render(report)),
            ReportFormat::Json => Ok(serde_json::to_string_pretty(report)?),
            ReportFormat::Text => Ok(text::render(report)),
        }
    }
}

/// Check that `path` can take the report before the run starts. The file
/// is opened for writing so ownership and ACLs are honored; a file that did
/// not exist before is removed again.
pub fn check_report_path(path: &Path) -> Result<()> {
    let path_error = |reason: String| MonitorError::ReportPath { path: path.to_path_buf(), reason };

    if path.is_dir() {
        return Err(path_error("path is a directory".to_string()));
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| path_error(e.to_string()))?;
    }

    let existed = path.exists();
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| path_error(e.to_string()))?;

    if !existed {
        fs::remove_file(path).map_err(|e| path_error(e.to_string()))?;
    }

    Ok(())
}

/// Render `report` in the format implied by `path` and write it
pub fn write_report(report: &RunReport, path: &Path) -> Result<()> {
    let rendered = ReportFormat::from_path(path).render(report)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|source| MonitorError::ReportWrite { path: path.to_path_buf(), source })?;
    }

    fs::write(path, rendered).map_err(|source| MonitorError::ReportWrite { path: path.to_path_buf(), source })
}
