/// Probe module - issues one reachability check per call
///
/// Ordinary network failures (timeouts, unreachable hosts, failed name
/// resolution) come back as failed [`ProbeOutcome`]s. Only a missing local
/// capability surfaces as a [`ProbeError`], and only from
/// [`Prober::preflight`], before the monitoring loop starts.
pub mod http;
pub mod icmp;
pub mod system;
pub mod tcp;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::MonitorConfig;
use crate::error::MonitorError;

pub use http::HttpProber;
pub use icmp::IcmpProber;
pub use system::SystemPingProber;
pub use tcp::TcpProber;

/// Local failure that makes probing impossible
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("{0}")]
    Unavailable(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("failed to initialize probe client: {0}")]
    Client(String),
}

/// Mechanism used to probe the target
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeMethod {
    /// Platform `ping` binary, one echo request per probe
    #[default]
    System,
    /// Native ICMP echo
    Icmp,
    /// TCP connect to `host:port`
    Tcp,
    /// HTTP GET, 2xx/3xx counts as reachable
    Http,
}

impl fmt::Display for ProbeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeMethod::System => write!(f, "system"),
            ProbeMethod::Icmp => write!(f, "icmp"),
            ProbeMethod::Tcp => write!(f, "tcp"),
            ProbeMethod::Http => write!(f, "http"),
        }
    }
}

impl FromStr for ProbeMethod {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "system" | "ping" => Ok(ProbeMethod::System),
            "icmp" => Ok(ProbeMethod::Icmp),
            "tcp" => Ok(ProbeMethod::Tcp),
            "http" | "https" => Ok(ProbeMethod::Http),
            other => Err(MonitorError::InvalidConfig(format!("unknown probe method: {other}"))),
        }
    }
}

/// Result of one probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeOutcome {
    /// When the probe was issued
    pub timestamp: DateTime<Utc>,

    /// Whether the target answered
    pub succeeded: bool,

    /// Round-trip time, when the target answered
    pub latency: Option<Duration>,

    /// Why the probe failed
    pub detail: Option<String>,
}

impl ProbeOutcome {
    /// Reachable outcome with round-trip time
    pub fn success(timestamp: DateTime<Utc>, latency: Duration) -> Self {
        Self { timestamp, succeeded: true, latency: Some(latency), detail: None }
    }

    /// Failed outcome with reason
    pub fn failure(timestamp: DateTime<Utc>, detail: impl Into<String>) -> Self {
        Self { timestamp, succeeded: false, latency: None, detail: Some(detail.into()) }
    }
}

/// Prober trait for the different probe mechanisms
#[async_trait::async_trait]
pub trait Prober: Send + Sync {
    /// Issue exactly one probe against `target`. Never retries.
    async fn probe(&self, target: &str) -> ProbeOutcome;

    /// Verify the local probe capability before the run starts
    async fn preflight(&self) -> Result<(), ProbeError> {
        Ok(())
    }

    /// Short name used in logs and reports
    fn name(&self) -> &'static str;
}

/// Build the prober for `config.method`, bounded by the configured timeout
pub fn build_prober(config: &MonitorConfig) -> Result<Box<dyn Prober>, ProbeError> {
    let timeout = config.effective_timeout();
    let prober: Box<dyn Prober> = match config.method {
        ProbeMethod::System => Box::new(SystemPingProber::new(timeout)),
        ProbeMethod::Icmp => Box::new(IcmpProber::new(timeout)?),
        ProbeMethod::Tcp => Box::new(TcpProber::new(timeout)),
        ProbeMethod::Http => Box::new(HttpProber::new(timeout)?),
    };
    Ok(prober)
}
