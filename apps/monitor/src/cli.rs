use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};
use pingwatch::{MonitorConfig, ProbeMethod, TimeBasis};

use crate::duration::parse_duration;

/// Continuous packet-drop monitor producing an ISP-ready report
#[derive(Parser, Debug, Clone)]
#[command(name = "pingwatch")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Host to monitor (IP or hostname; host:port for tcp, URL for http)
    pub target: Option<String>,

    /// Probe interval (e.g. 1s, 500ms)
    #[arg(short = 'i', long = "interval", value_parser = parse_duration)]
    pub interval: Option<Duration>,

    /// Stop after this long (e.g. 90, 15m, 2h, 1h30m); runs until interrupted if unset
    #[arg(short = 'd', long = "duration", value_parser = parse_duration)]
    pub duration: Option<Duration>,

    /// Per-probe timeout, must be shorter than the interval
    #[arg(long = "timeout", value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// Probe method (system, icmp, tcp, http)
    #[arg(short = 'm', long = "method")]
    pub method: Option<ProbeMethod>,

    /// Drop log file
    #[arg(long = "log")]
    pub log: Option<PathBuf>,

    /// Report file; .html, .json or anything else for plain text
    #[arg(long = "report")]
    pub report: Option<PathBuf>,

    /// How often to print a status line
    #[arg(long = "progress", value_parser = parse_duration)]
    pub progress: Option<Duration>,

    /// Use UTC instead of local time for timestamps and hourly buckets
    #[arg(long = "utc")]
    pub utc: bool,

    /// Config file (default: $XDG_CONFIG_HOME/pingwatch/config.toml)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Print the effective configuration and exit
    #[arg(long = "show-config")]
    pub show_config: bool,

    /// More diagnostic output (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Override file values with whatever was given on the command line
    pub fn apply(&self, config: &mut MonitorConfig) {
        if let Some(target) = &self.target {
            config.target_address = target.clone();
        }
        if let Some(method) = self.method {
            config.method = method;
        }
        if let Some(interval) = self.interval {
            config.probe_interval = interval;
        }
        if let Some(duration) = self.duration {
            config.max_duration = Some(duration);
        }
        if let Some(timeout) = self.timeout {
            config.probe_timeout = Some(timeout);
        }
        if let Some(log) = &self.log {
            config.log_path = log.clone();
        }
        if let Some(report) = &self.report {
            config.report_path = report.clone();
        }
        if let Some(progress) = self.progress {
            config.progress_interval = progress;
        }
        if self.utc {
            config.time_basis = TimeBasis::Utc;
        }
    }
}
