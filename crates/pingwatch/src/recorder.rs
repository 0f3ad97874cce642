//! Per-tick pipeline: outcome -> DropTracker -> StatsAccumulator -> drop log.
//!
//! One outcome is fully tracked, accumulated and logged before the next
//! probe is issued, so nothing here needs locking.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::TimeBasis;
use crate::probe::ProbeOutcome;
use crate::report::DropLog;
use crate::stats::{RunStats, StatsAccumulator};
use crate::tracker::{DropEvent, DropTracker, TrackerSignal};

/// Final state handed to the report generator
#[derive(Debug)]
pub struct RecordedRun {
    pub stats: RunStats,
    pub events: Vec<DropEvent>,
    pub log_write_failures: u64,
}

/// Owns the tracker, the accumulator and the drop log for one run
pub struct Recorder {
    tracker: DropTracker,
    stats: StatsAccumulator,
    log: Option<DropLog>,
}

impl Recorder {
    pub fn new(start_time: DateTime<Utc>, time_basis: TimeBasis, log: Option<DropLog>) -> Self {
        Self {
            tracker: DropTracker::new(),
            stats: StatsAccumulator::new(start_time, time_basis),
            log,
        }
    }

    /// Route one outcome through the pipeline
    pub fn record(&mut self, outcome: &ProbeOutcome) -> Option<TrackerSignal> {
        let signal = self.tracker.observe(outcome);
        self.stats.record(outcome, signal.as_ref());

        match &signal {
            Some(TrackerSignal::DropDetected { consecutive_count: 1, .. }) => {
                warn!(
                    reason = outcome.detail.as_deref().unwrap_or("unknown"),
                    "Packet drop detected (consecutive: 1)"
                );
            }
            Some(TrackerSignal::DropDetected { consecutive_count, .. }) => {
                debug!(
                    reason = outcome.detail.as_deref().unwrap_or("unknown"),
                    "Packet drop continues (consecutive: {})", consecutive_count
                );
            }
            Some(TrackerSignal::Recovered { event }) => {
                info!("Connection restored after {} drops", event.consecutive_count);
            }
            None => {
                debug!(latency = ?outcome.latency, "Probe succeeded");
            }
        }

        if let (Some(log), Some(signal)) = (self.log.as_mut(), signal.as_ref()) {
            log.record(signal);
        }

        signal
    }

    pub fn stats(&self) -> &RunStats {
        self.stats.stats()
    }

    pub fn tracker(&self) -> &DropTracker {
        &self.tracker
    }

    /// Close the run at `end_time`: an open drop event becomes unresolved
    pub fn finish(self, end_time: DateTime<Utc>) -> RecordedRun {
        let Recorder { tracker, stats, mut log } = self;
        let events = tracker.finish(end_time);

        if let Some(last) = events.last().filter(|event| event.unresolved) {
            warn!(
                "Monitoring ended during an outage ({} consecutive drops)",
                last.consecutive_count
            );
            if let Some(log) = log.as_mut() {
                log.record_unresolved(last);
            }
        }

        RecordedRun {
            stats: stats.finish(end_time),
            events,
            log_write_failures: log.as_ref().map_or(0, DropLog::write_failures),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    fn at(sec: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, sec).unwrap()
    }

    #[test]
    fn test_scenario_ok_ok_fail_fail_ok() {
        let mut recorder = Recorder::new(at(0), TimeBasis::Utc, None);
        let pattern = [true, true, false, false, true];

        let signals: Vec<_> = pattern
            .iter()
            .enumerate()
            .map(|(i, &succeeded)| {
                let ts = at(i as u32);
                let outcome = if succeeded {
                    ProbeOutcome::success(ts, Duration::from_millis(20))
                } else {
                    ProbeOutcome::failure(ts, "timeout")
                };
                recorder.record(&outcome)
            })
            .collect();

        assert!(signals[0].is_none());
        assert!(signals[2].as_ref().is_some_and(TrackerSignal::opens_event));
        assert!(matches!(
            &signals[4],
            Some(TrackerSignal::Recovered { event }) if event.consecutive_count == 2
        ));

        let run = recorder.finish(at(5));
        assert_eq!(run.stats.total_probes, 5);
        assert_eq!(run.stats.total_drops, 2);
        assert_eq!(run.stats.longest_streak, 2);
        assert!((run.stats.success_rate() - 0.6).abs() < 1e-9);
        assert_eq!(run.events.len(), 1);
        assert_eq!(run.events[0].start_time, at(2));
        assert_eq!(run.events[0].end_time, Some(at(4)));
    }

    #[test]
    fn test_finish_during_outage() {
        let mut recorder = Recorder::new(at(0), TimeBasis::Utc, None);
        recorder.record(&ProbeOutcome::failure(at(0), "timeout"));
        recorder.record(&ProbeOutcome::failure(at(1), "timeout"));

        let run = recorder.finish(at(2));
        assert_eq!(run.events.len(), 1);
        assert!(run.events[0].unresolved);
        assert_eq!(run.stats.current_streak, 2);
        assert_eq!(run.stats.longest_streak, 2);
    }
}
