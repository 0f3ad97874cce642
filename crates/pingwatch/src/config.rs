//! Monitor configuration.
//!
//! `MonitorConfig` is handed to the core by whatever front end collected the
//! options and stays immutable for the whole run.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Local, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, Result};
use crate::probe::ProbeMethod;
use crate::validation;
use crate::DEFAULT_TARGET;

const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_secs(60);
const MAX_DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Clock used for hour bucketing and for rendering timestamps
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeBasis {
    #[default]
    Local,
    Utc,
}

impl TimeBasis {
    /// Hour of day (0-23) of `at` on this clock
    pub fn hour_of(&self, at: DateTime<Utc>) -> usize {
        match self {
            TimeBasis::Local => at.with_timezone(&Local).hour() as usize,
            TimeBasis::Utc => at.hour() as usize,
        }
    }

    /// Format `at` on this clock with a chrono format string
    pub fn format(&self, at: DateTime<Utc>, fmt: &str) -> String {
        match self {
            TimeBasis::Local => at.with_timezone(&Local).format(fmt).to_string(),
            TimeBasis::Utc => at.format(fmt).to_string(),
        }
    }

    /// `YYYY-MM-DD HH:MM:SS` rendering used by the drop log and reports
    pub fn timestamp(&self, at: DateTime<Utc>) -> String {
        match self {
            TimeBasis::Local => self.format(at, "%Y-%m-%d %H:%M:%S"),
            TimeBasis::Utc => self.format(at, "%Y-%m-%d %H:%M:%S UTC"),
        }
    }
}

impl fmt::Display for TimeBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeBasis::Local => write!(f, "local"),
            TimeBasis::Utc => write!(f, "utc"),
        }
    }
}

impl FromStr for TimeBasis {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(TimeBasis::Local),
            "utc" => Ok(TimeBasis::Utc),
            other => Err(MonitorError::InvalidConfig(format!("unknown time basis: {other}"))),
        }
    }
}

/// Configuration for a single monitoring run
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Host, IP, `host:port` or URL depending on `method`
    pub target_address: String,

    /// Probe mechanism
    pub method: ProbeMethod,

    /// Fixed cadence between probes
    pub probe_interval: Duration,

    /// Upper bound for a single probe, see [`MonitorConfig::effective_timeout`]
    pub probe_timeout: Option<Duration>,

    /// Run length; `None` runs until cancelled
    pub max_duration: Option<Duration>,

    /// Cadence of progress snapshots for external display
    pub progress_interval: Duration,

    /// Append-only drop log
    pub log_path: PathBuf,

    /// Summary report written at shutdown
    pub report_path: PathBuf,

    /// Clock for hourly buckets and rendered timestamps
    pub time_basis: TimeBasis,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            target_address: DEFAULT_TARGET.to_string(),
            method: ProbeMethod::default(),
            probe_interval: DEFAULT_INTERVAL,
            probe_timeout: None,
            max_duration: None,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            log_path: PathBuf::from("ping_drops.log"),
            report_path: PathBuf::from("ping_report.html"),
            time_basis: TimeBasis::default(),
        }
    }
}

impl MonitorConfig {
    /// Create a new configuration builder for `target`
    pub fn builder(target: impl Into<String>) -> MonitorConfigBuilder {
        MonitorConfigBuilder {
            config: MonitorConfig { target_address: target.into(), ..Default::default() },
        }
    }

    /// Probe timeout actually applied: the configured one, or 3s capped at
    /// 90% of the interval so a stuck probe never spills into the next tick.
    pub fn effective_timeout(&self) -> Duration {
        self.probe_timeout
            .unwrap_or_else(|| MAX_DEFAULT_TIMEOUT.min(self.probe_interval * 9 / 10))
    }

    /// Check the configuration before any file or socket is touched
    pub fn validate(&self) -> Result<()> {
        validation::validate_target(&self.target_address, self.method)?;
        validation::validate_interval(self.probe_interval)?;
        validation::validate_timeout(self.effective_timeout(), self.probe_interval)?;

        if let Some(max) = self.max_duration {
            if max.is_zero() {
                return Err(MonitorError::InvalidConfig(
                    "max duration must be positive".to_string(),
                ));
            }
        }

        if self.progress_interval.is_zero() {
            return Err(MonitorError::InvalidConfig(
                "progress interval must be positive".to_string(),
            ));
        }

        if self.log_path.as_os_str().is_empty() || self.report_path.as_os_str().is_empty() {
            return Err(MonitorError::InvalidConfig("log and report paths are required".to_string()));
        }

        if self.log_path == self.report_path {
            return Err(MonitorError::InvalidConfig(
                "log and report must be written to different files".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for MonitorConfig
pub struct MonitorConfigBuilder {
    config: MonitorConfig,
}

impl MonitorConfigBuilder {
    /// Build the configuration
    pub fn build(self) -> MonitorConfig {
        self.config
    }

    /// Set probe mechanism
    pub fn method(mut self, method: ProbeMethod) -> Self {
        self.config.method = method;
        self
    }

    /// Set probe interval
    pub fn probe_interval(mut self, interval: Duration) -> Self {
        self.config.probe_interval = interval;
        self
    }

    /// Set probe timeout
    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.config.probe_timeout = Some(timeout);
        self
    }

    /// Bound the run length
    pub fn max_duration(mut self, duration: Duration) -> Self {
        self.config.max_duration = Some(duration);
        self
    }

    /// Set progress snapshot cadence
    pub fn progress_interval(mut self, interval: Duration) -> Self {
        self.config.progress_interval = interval;
        self
    }

    /// Set drop log path
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.log_path = path.into();
        self
    }

    /// Set report path
    pub fn report_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.report_path = path.into();
        self
    }

    /// Set clock basis
    pub fn time_basis(mut self, basis: TimeBasis) -> Self {
        self.config.time_basis = basis;
        self
    }
}
