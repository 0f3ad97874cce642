//! Sampling loop.
//!
//! One probe per tick at a fixed cadence. Ticks missed because a probe ran
//! long are skipped, never queued. Cancellation and duration expiry are only
//! observed between probes, and both end the loop through the same return
//! path so the caller always finalizes.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior, interval, sleep_until, timeout};
use tracing::{debug, info};

use crate::config::MonitorConfig;
use crate::probe::{ProbeOutcome, Prober};
use crate::recorder::Recorder;
use crate::stats::RunStats;

/// Why the sampling loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    DurationElapsed,
    Cancelled,
}

/// Requests graceful cancellation of a run. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request cancellation. Returns `true` only for the first request.
    pub fn cancel(&self) -> bool {
        !self.tx.send_replace(true)
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Receiving side for the sampling loop
    pub fn signal(&self) -> CancelSignal {
        CancelSignal { rx: self.tx.subscribe() }
    }
}

/// Receiving side of a [`CancelHandle`]
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// Resolves once cancellation has been requested
    pub async fn cancelled(&mut self) {
        let result = self.rx.wait_for(|cancelled| *cancelled).await.map(|_| ());
        if result.is_err() {
            // Every handle is gone, nobody can cancel any more
            std::future::pending::<()>().await;
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }
}

/// Progress view for an external display
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProgressSnapshot {
    pub probes: u64,
    pub drops: u64,
    pub success_rate: f64,
    pub current_streak: u32,
    pub elapsed: Duration,
    /// `None` for unbounded runs
    pub remaining: Option<Duration>,
}

impl ProgressSnapshot {
    fn from_stats(stats: &RunStats, elapsed: Duration, max_duration: Option<Duration>) -> Self {
        Self {
            probes: stats.total_probes,
            drops: stats.total_drops,
            success_rate: stats.success_rate(),
            current_streak: stats.current_streak,
            elapsed,
            remaining: max_duration.map(|max| max.saturating_sub(elapsed)),
        }
    }
}

/// Drives the probe loop for one run
pub struct Scheduler {
    interval: Duration,
    max_duration: Option<Duration>,
    probe_timeout: Duration,
    progress_interval: Duration,
    cancel: CancelSignal,
    progress_tx: watch::Sender<ProgressSnapshot>,
}

impl Scheduler {
    pub fn new(config: &MonitorConfig, cancel: CancelSignal) -> Self {
        let (progress_tx, _rx) = watch::channel(ProgressSnapshot {
            success_rate: 1.0,
            remaining: config.max_duration,
            ..Default::default()
        });

        Self {
            interval: config.probe_interval,
            max_duration: config.max_duration,
            probe_timeout: config.effective_timeout(),
            progress_interval: config.progress_interval,
            cancel,
            progress_tx,
        }
    }

    /// Progress snapshots, published every `progress_interval` and once more
    /// when the loop ends. Reading never blocks the loop.
    pub fn subscribe_progress(&self) -> watch::Receiver<ProgressSnapshot> {
        self.progress_tx.subscribe()
    }

    /// Run until the duration expires or cancellation is requested
    pub async fn run(&mut self, prober: &dyn Prober, target: &str, recorder: &mut Recorder) -> StopReason {
        let started = Instant::now();
        let deadline = self.max_duration.map(|max| started + max);
        let mut last_progress = started;

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let reason = loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break StopReason::Cancelled,
                _ = wait_for_deadline(deadline) => break StopReason::DurationElapsed,
                _ = ticker.tick() => {}
            }

            let outcome = self.probe_once(prober, target).await;
            recorder.record(&outcome);

            if last_progress.elapsed() >= self.progress_interval {
                self.publish(recorder.stats(), started.elapsed());
                last_progress = Instant::now();
            }
        };

        self.publish(recorder.stats(), started.elapsed());
        info!(
            ?reason,
            probes = recorder.stats().total_probes,
            drops = recorder.stats().total_drops,
            "Monitoring loop finished"
        );
        reason
    }

    /// One probe, bounded by the probe timeout. A probe that overruns is a
    /// failed sample.
    async fn probe_once(&self, prober: &dyn Prober, target: &str) -> ProbeOutcome {
        let issued_at = Utc::now();
        match timeout(self.probe_timeout, prober.probe(target)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                debug!(prober = prober.name(), "Probe exceeded its timeout");
                ProbeOutcome::failure(issued_at, format!("no reply within {:?}", self.probe_timeout))
            }
        }
    }

    fn publish(&self, stats: &RunStats, elapsed: Duration) {
        self.progress_tx.send_replace(ProgressSnapshot::from_stats(stats, elapsed, self.max_duration));
    }
}

async fn wait_for_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_reports_first_request_only() {
        let handle = CancelHandle::new();
        let signal = handle.signal();

        assert!(!handle.is_cancelled());
        assert!(handle.cancel());
        assert!(!handle.cancel());
        assert!(handle.is_cancelled());
        assert!(signal.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_resolves_after_cancel() {
        let handle = CancelHandle::new();
        let mut signal = handle.signal();

        let waiter = tokio::spawn(async move { signal.cancelled().await });
        handle.cancel();

        tokio::time::timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
    }

    #[test]
    fn test_progress_remaining_saturates() {
        let stats = crate::stats::StatsAccumulator::new(Utc::now(), crate::config::TimeBasis::Utc).snapshot();
        let snapshot = ProgressSnapshot::from_stats(
            &stats,
            Duration::from_secs(90),
            Some(Duration::from_secs(60)),
        );
        assert_eq!(snapshot.remaining, Some(Duration::ZERO));
        assert_eq!(snapshot.success_rate, 1.0);
    }

    /// First probe overruns the interval, the rest answer at once
    struct SlowStartProber {
        delays: std::sync::Mutex<std::collections::VecDeque<Duration>>,
        issued: std::sync::Mutex<Vec<Duration>>,
        origin: Instant,
    }

    #[async_trait::async_trait]
    impl Prober for SlowStartProber {
        async fn probe(&self, _target: &str) -> ProbeOutcome {
            self.issued.lock().unwrap().push(self.origin.elapsed());
            let delay = self.delays.lock().unwrap().pop_front().unwrap_or_default();
            tokio::time::sleep(delay).await;
            ProbeOutcome::success(Utc::now(), delay)
        }

        fn name(&self) -> &'static str {
            "slow-start"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_missed_ticks_are_skipped_not_replayed() {
        // Timeout above the interval so the overrun is not cut short
        let config = MonitorConfig::builder("192.0.2.1")
            .probe_interval(Duration::from_secs(1))
            .probe_timeout(Duration::from_secs(10))
            .max_duration(Duration::from_secs(10))
            .build();
        let prober = SlowStartProber {
            delays: std::sync::Mutex::new([Duration::from_millis(3500)].into_iter().collect()),
            issued: std::sync::Mutex::new(Vec::new()),
            origin: Instant::now(),
        };
        let mut recorder = Recorder::new(Utc::now(), crate::config::TimeBasis::Utc, None);
        let mut scheduler = Scheduler::new(&config, CancelHandle::new().signal());

        let reason = scheduler.run(&prober, "192.0.2.1", &mut recorder).await;
        assert_eq!(reason, StopReason::DurationElapsed);

        // One late tick at 3.5s, then back on the 1s grid: 0, 3.5, 4 ..= 9.
        // Replaying the ticks missed at 1s, 2s and 3s would give 10 probes.
        let issued = prober.issued.lock().unwrap().clone();
        assert_eq!(recorder.stats().total_probes, 8);
        assert_eq!(issued.len(), 8);
        assert!(issued[1] >= Duration::from_millis(3500));
        for pair in issued.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(400), "probes bunched: {issued:?}");
        }
    }
}
