//! Integration tests for full monitoring runs
//!
//! These run the real scheduler on tokio's paused clock with a scripted
//! prober, so cadence and duration behavior is deterministic.

use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use pingwatch::{
    Monitor, MonitorConfig, MonitorError, ProbeError, ProbeOutcome, Prober, StopReason, TimeBasis,
};
use tempfile::{TempDir, tempdir};

/// Replays a fixed sequence of outcomes, then repeats `fallback`
struct ScriptedProber {
    script: Mutex<VecDeque<bool>>,
    fallback: bool,
    calls: AtomicUsize,
}

impl ScriptedProber {
    fn new(script: &[bool], fallback: bool) -> Self {
        Self {
            script: Mutex::new(script.iter().copied().collect()),
            fallback,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, _target: &str) -> ProbeOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let succeeded = self.script.lock().unwrap().pop_front().unwrap_or(self.fallback);
        if succeeded {
            ProbeOutcome::success(Utc::now(), Duration::from_millis(15))
        } else {
            ProbeOutcome::failure(Utc::now(), "scripted drop")
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Never answers within any sane timeout
struct StuckProber;

#[async_trait::async_trait]
impl Prober for StuckProber {
    async fn probe(&self, _target: &str) -> ProbeOutcome {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        ProbeOutcome::success(Utc::now(), Duration::from_secs(3600))
    }

    fn name(&self) -> &'static str {
        "stuck"
    }
}

/// Fails its capability check
struct UnavailableProber;

#[async_trait::async_trait]
impl Prober for UnavailableProber {
    async fn probe(&self, _target: &str) -> ProbeOutcome {
        unreachable!("probe must not run when preflight fails")
    }

    async fn preflight(&self) -> Result<(), ProbeError> {
        Err(ProbeError::Unavailable("no ping here".to_string()))
    }

    fn name(&self) -> &'static str {
        "unavailable"
    }
}

fn config(dir: &TempDir, max_duration: Option<Duration>) -> MonitorConfig {
    let mut builder = MonitorConfig::builder("192.0.2.1")
        .probe_interval(Duration::from_secs(1))
        .probe_timeout(Duration::from_millis(500))
        .log_path(dir.path().join("drops.log"))
        .report_path(dir.path().join("report.json"))
        .time_basis(TimeBasis::Utc);
    if let Some(max) = max_duration {
        builder = builder.max_duration(max);
    }
    builder.build()
}

/// Transition lines after the header separator
fn log_lines(path: &Path) -> Vec<String> {
    let contents = fs::read_to_string(path).unwrap();
    contents
        .lines()
        .skip_while(|line| !line.starts_with("-----"))
        .skip(1)
        .map(str::to_string)
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_drop_and_recovery_scenario() -> Result<()> {
    let dir = tempdir()?;
    let config = config(&dir, Some(Duration::from_secs(5)));
    let prober = ScriptedProber::new(&[true, true, false, false, true], true);

    let summary = Monitor::with_prober(config, Box::new(prober))?.run().await?;
    let report = &summary.report;

    assert_eq!(report.stop_reason, StopReason::DurationElapsed);
    assert_eq!(report.total_probes, 5);
    assert_eq!(report.total_drops, 2);
    assert_eq!(report.longest_streak, 2);
    assert!((report.success_rate.unwrap() - 0.6).abs() < 1e-9);
    assert_eq!(report.events.len(), 1);
    assert_eq!(report.events[0].consecutive_count, 2);
    assert!(!report.events[0].unresolved);

    let lines = log_lines(&summary.log_path);
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("Packet drop detected (consecutive: 1)"));
    assert!(lines[1].ends_with("Connection restored after 2 drops"));

    assert!(summary.report_written);
    assert!(summary.is_complete());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_duration_bound_ends_open_outage() -> Result<()> {
    let dir = tempdir()?;
    let config = config(&dir, Some(Duration::from_secs(2)));
    let prober = ScriptedProber::new(&[], false);

    let summary = Monitor::with_prober(config, Box::new(prober))?.run().await?;
    let report = &summary.report;

    assert_eq!(report.stop_reason, StopReason::DurationElapsed);
    assert_eq!(report.total_probes, 2);
    assert_eq!(report.total_drops, 2);
    assert_eq!(report.events.len(), 1);
    assert!(report.events[0].unresolved);
    assert!(report.events[0].end_time.is_some());

    let lines = log_lines(&summary.log_path);
    assert_eq!(lines.len(), 2);
    assert!(lines[1].contains("unresolved (consecutive: 2)"));

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&summary.report_path)?)?;
    assert_eq!(json["events"][0]["unresolved"], true);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_mid_interval_finalizes() -> Result<()> {
    let dir = tempdir()?;
    let config = config(&dir, None);
    let monitor = Monitor::with_prober(config, Box::new(ScriptedProber::new(&[], true)))?;

    let cancel = monitor.cancel_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(2500)).await;
        cancel.cancel();
    });

    let summary = monitor.run().await?;
    let report = &summary.report;

    assert_eq!(report.stop_reason, StopReason::Cancelled);
    assert_eq!(report.total_probes, 3);
    assert_eq!(report.total_drops, 0);
    assert!(report.conclusion.starts_with("No drops detected"));
    assert!(summary.report_path.exists());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_cancel_before_first_probe_reports_no_data() -> Result<()> {
    let dir = tempdir()?;
    let config = config(&dir, None);
    let monitor = Monitor::with_prober(config, Box::new(ScriptedProber::new(&[], true)))?;

    assert!(monitor.cancel_handle().cancel());
    let summary = monitor.run().await?;

    assert_eq!(summary.report.total_probes, 0);
    assert_eq!(summary.report.success_rate, None);
    assert!(summary.report.conclusion.starts_with("No data collected"));
    assert!(summary.report_written);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_stuck_probe_counts_as_drop() -> Result<()> {
    let dir = tempdir()?;
    let config = config(&dir, Some(Duration::from_secs(3)));

    let summary = Monitor::with_prober(config, Box::new(StuckProber))?.run().await?;
    let report = &summary.report;

    assert_eq!(report.total_probes, 3);
    assert_eq!(report.total_drops, 3);
    assert_eq!(report.longest_streak, 3);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_progress_snapshot_after_run() -> Result<()> {
    let dir = tempdir()?;
    let mut config = config(&dir, Some(Duration::from_secs(5)));
    config.progress_interval = Duration::from_secs(2);

    let monitor = Monitor::with_prober(config, Box::new(ScriptedProber::new(&[false], true)))?;
    let progress = monitor.subscribe_progress();
    monitor.run().await?;

    let snapshot = *progress.borrow();
    assert_eq!(snapshot.probes, 5);
    assert_eq!(snapshot.drops, 1);
    assert!((snapshot.success_rate - 0.8).abs() < 1e-9);
    assert_eq!(snapshot.remaining, Some(Duration::ZERO));
    Ok(())
}

#[tokio::test]
async fn test_report_directory_is_fatal_before_log() -> Result<()> {
    let dir = tempdir()?;
    let mut config = config(&dir, Some(Duration::from_secs(1)));
    config.report_path = dir.path().to_path_buf();

    let prober = ScriptedProber::new(&[], true);
    let result = Monitor::with_prober(config.clone(), Box::new(prober))?.run().await;

    assert!(matches!(result, Err(MonitorError::ReportPath { .. })));
    assert!(!config.log_path.exists());
    Ok(())
}

#[tokio::test]
async fn test_missing_probe_capability_is_fatal() -> Result<()> {
    let dir = tempdir()?;
    let config = config(&dir, Some(Duration::from_secs(1)));

    let result = Monitor::with_prober(config.clone(), Box::new(UnavailableProber))?.run().await;

    assert!(matches!(result, Err(MonitorError::ProbeCapability(_))));
    assert!(!config.log_path.exists());
    assert!(!config.report_path.exists());
    Ok(())
}

#[test]
fn test_invalid_target_rejected_up_front() {
    let dir = tempdir().unwrap();
    let mut config = config(&dir, None);
    config.target_address = "-f 8.8.8.8".to_string();

    let result = Monitor::with_prober(config, Box::new(ScriptedProber::new(&[], true)));
    assert!(matches!(result, Err(MonitorError::InvalidTarget(_))));
}

#[cfg(unix)]
#[tokio::test(start_paused = true)]
async fn test_unwritable_report_directory_is_fatal_before_loop() -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir()?;
    let locked = dir.path().join("locked");
    fs::create_dir(&locked)?;
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o555))?;

    // Privileged users write through mode bits; nothing to check then
    if fs::write(locked.join("canary"), "").is_ok() {
        return Ok(());
    }

    let mut config = config(&dir, Some(Duration::from_secs(3)));
    config.report_path = locked.join("report.json");
    let prober = ScriptedProber::new(&[], true);

    let result = Monitor::with_prober(config.clone(), Box::new(prober))?.run().await;
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755))?;

    assert!(matches!(result, Err(MonitorError::ReportPath { .. })));
    assert!(!config.log_path.exists());
    Ok(())
}

#[tokio::test]
async fn test_new_rejects_target_before_opening_sockets() {
    let dir = tempdir().unwrap();
    let mut config = config(&dir, None);
    config.target_address = "-c 1 example.com".to_string();
    config.method = pingwatch::ProbeMethod::Icmp;

    // Validation runs first, so no ICMP socket privileges are needed here
    let result = Monitor::new(config);
    assert!(matches!(result, Err(MonitorError::InvalidTarget(_))));
}
