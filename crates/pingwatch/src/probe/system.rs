use std::env;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::process::Command;
use tokio::time::timeout;

use super::{ProbeError, ProbeOutcome, Prober};

#[cfg(windows)]
const PING_BINARY: &str = "ping.exe";
#[cfg(not(windows))]
const PING_BINARY: &str = "ping";

/// Prober backed by the platform `ping` binary
///
/// Sends a single echo request per probe. The child process is killed when
/// the timeout fires so a hung `ping` cannot stall the schedule.
pub struct SystemPingProber {
    timeout: Duration,
}

impl SystemPingProber {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn command(&self, target: &str) -> Command {
        let mut cmd = Command::new(PING_BINARY);
        cmd.args(ping_args(target, self.timeout))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

/// Arguments for one echo request with a per-reply wait
fn ping_args(target: &str, wait: Duration) -> Vec<String> {
    let wait_ms = wait.as_millis().max(1);
    if cfg!(windows) {
        vec!["-n".into(), "1".into(), "-w".into(), wait_ms.to_string(), target.into()]
    } else if cfg!(target_os = "macos") {
        // macOS takes -W in milliseconds
        vec!["-c".into(), "1".into(), "-W".into(), wait_ms.to_string(), target.into()]
    } else {
        // Linux iputils takes whole seconds
        let wait_secs = wait.as_secs().max(1);
        vec!["-c".into(), "1".into(), "-W".into(), wait_secs.to_string(), target.into()]
    }
}

/// Extract the round-trip time from ping output (`time=12.3 ms`, `time<1ms`)
pub(crate) fn parse_rtt(output: &str) -> Option<Duration> {
    let start = output.find("time=").map(|i| i + 5).or_else(|| output.find("time<").map(|i| i + 5))?;
    let number: String = output[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let millis: f64 = number.parse().ok()?;
    Some(Duration::from_secs_f64(millis / 1000.0))
}

fn find_in_path(binary: &str) -> Option<PathBuf> {
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths).map(|dir| dir.join(binary)).find(|candidate| candidate.is_file())
}

#[async_trait::async_trait]
impl Prober for SystemPingProber {
    async fn probe(&self, target: &str) -> ProbeOutcome {
        let timestamp = Utc::now();
        let start = Instant::now();

        match timeout(self.timeout, self.command(target).output()).await {
            Ok(Ok(output)) if output.status.success() => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let rtt = parse_rtt(&stdout).unwrap_or_else(|| start.elapsed());
                ProbeOutcome::success(timestamp, rtt)
            }
            Ok(Ok(output)) => ProbeOutcome::failure(timestamp, format!("ping exited with {}", output.status)),
            Ok(Err(e)) => ProbeOutcome::failure(timestamp, format!("failed to run ping: {e}")),
            Err(_) => ProbeOutcome::failure(timestamp, "ping timed out"),
        }
    }

    async fn preflight(&self) -> Result<(), ProbeError> {
        match find_in_path(PING_BINARY) {
            Some(_) => Ok(()),
            None => Err(ProbeError::Unavailable(format!("`{PING_BINARY}` was not found on PATH"))),
        }
    }

    fn name(&self) -> &'static str {
        "system"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rtt_linux() {
        let out = "64 bytes from 8.8.8.8: icmp_seq=1 ttl=117 time=12.4 ms\n";
        let rtt = parse_rtt(out).unwrap();
        assert!((rtt.as_secs_f64() * 1000.0 - 12.4).abs() < 0.001);
    }

    #[test]
    fn test_parse_rtt_windows_sub_millisecond() {
        let out = "Reply from 192.168.1.1: bytes=32 time<1ms TTL=64";
        let rtt = parse_rtt(out).unwrap();
        assert!((rtt.as_secs_f64() * 1000.0 - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_parse_rtt_missing() {
        assert_eq!(parse_rtt("Request timed out."), None);
    }

    #[test]
    fn test_ping_args_single_request() {
        let args = ping_args("8.8.8.8", Duration::from_millis(900));
        assert_eq!(args.last().map(String::as_str), Some("8.8.8.8"));
        assert!(args.iter().any(|a| a == "1"));
    }
}
