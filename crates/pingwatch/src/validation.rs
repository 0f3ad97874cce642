//! Target and timing validation.
//!
//! Everything here runs before the monitoring loop starts, so a bad target or
//! an impossible cadence is rejected without creating any output file.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use url::Url;

use crate::error::{MonitorError, Result};
use crate::probe::ProbeMethod;

const MIN_INTERVAL: Duration = Duration::from_millis(100);
const MAX_INTERVAL: Duration = Duration::from_secs(3600);
const MIN_TIMEOUT: Duration = Duration::from_millis(10);

/// Validates a probe target based on the probe mechanism
pub fn validate_target(target: &str, method: ProbeMethod) -> Result<()> {
    match method {
        ProbeMethod::System | ProbeMethod::Icmp => validate_host(target),
        ProbeMethod::Tcp => validate_tcp_target(target),
        ProbeMethod::Http => validate_http_target(target),
    }
}

/// Validate a bare hostname or IP address
pub fn validate_host(target: &str) -> Result<()> {
    if target.is_empty() {
        return Err(MonitorError::InvalidTarget("target is empty".to_string()));
    }

    // Never let a target be read as a command-line option by `ping`
    if target.starts_with('-') {
        return Err(MonitorError::InvalidTarget(format!("target may not start with '-': {target}")));
    }

    if target.parse::<IpAddr>().is_ok() {
        return Ok(());
    }

    let hostname = target.strip_suffix('.').unwrap_or(target);
    if hostname.is_empty() || hostname.len() > 253 {
        return Err(MonitorError::InvalidTarget(format!("invalid hostname length: {target}")));
    }

    for label in hostname.split('.') {
        let valid = !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(MonitorError::InvalidTarget(format!("invalid hostname: {target}")));
        }
    }

    Ok(())
}

/// Validate TCP target
fn validate_tcp_target(target: &str) -> Result<()> {
    if let Ok(addr) = target.parse::<SocketAddr>() {
        return validate_port(addr.port());
    }

    // Expected format: host:port
    let (host, port) = target
        .rsplit_once(':')
        .ok_or_else(|| MonitorError::InvalidTarget("TCP target must be in format host:port".to_string()))?;

    let port: u16 = port
        .parse()
        .map_err(|_| MonitorError::InvalidTarget(format!("invalid port number in {target}")))?;

    validate_host(host)?;
    validate_port(port)
}

/// Validate HTTP/HTTPS target
fn validate_http_target(target: &str) -> Result<()> {
    let url = Url::parse(target).map_err(|e| MonitorError::InvalidTarget(format!("invalid URL: {e}")))?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(MonitorError::InvalidTarget(format!(
                "invalid scheme for HTTP probe: {other}"
            )));
        }
    }

    if url.host_str().is_none() {
        return Err(MonitorError::InvalidTarget(format!("URL has no host: {target}")));
    }

    if let Some(port) = url.port() {
        validate_port(port)?;
    }

    Ok(())
}

/// Validate port is in valid range
fn validate_port(port: u16) -> Result<()> {
    if port == 0 {
        return Err(MonitorError::InvalidTarget("port 0 is not valid".to_string()));
    }
    Ok(())
}

/// Validate probe interval
pub fn validate_interval(interval: Duration) -> Result<()> {
    if interval < MIN_INTERVAL {
        return Err(MonitorError::InvalidConfig(format!(
            "probe interval too short: {:?} (minimum: {:?})",
            interval, MIN_INTERVAL
        )));
    }

    if interval > MAX_INTERVAL {
        return Err(MonitorError::InvalidConfig(format!(
            "probe interval too long: {:?} (maximum: {:?})",
            interval, MAX_INTERVAL
        )));
    }

    Ok(())
}

/// Validate the probe timeout against the interval it must fit into
pub fn validate_timeout(timeout: Duration, interval: Duration) -> Result<()> {
    if timeout < MIN_TIMEOUT {
        return Err(MonitorError::InvalidConfig(format!(
            "probe timeout too short: {:?} (minimum: {:?})",
            timeout, MIN_TIMEOUT
        )));
    }

    if timeout >= interval {
        return Err(MonitorError::InvalidConfig(format!(
            "probe timeout {:?} must be shorter than the probe interval {:?}",
            timeout, interval
        )));
    }

    Ok(())
}
